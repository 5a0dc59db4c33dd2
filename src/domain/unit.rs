//! Compiled code units
//!
//! A compiled unit is one library's compiled output as delivered by the
//! upstream dependency collector. The planner only reads it.

use serde::Serialize;

use crate::domain::ModuleId;

/// Index of a unit inside its [`PackageableCollection`](super::PackageableCollection)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UnitId(pub(crate) u32);

impl UnitId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named compiled-code artifact owned by one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUnit {
    /// Stable identity of the unit, e.g. `//java/com/example/core:core`
    pub target: String,
    pub module: ModuleId,
    /// Compiled jar; `None` when the library has nothing to compile
    pub output: Option<String>,
    /// Upstream weight estimate, at least 1
    pub weight_estimate: u64,
    pub desugar_enabled: bool,
    pub interface_methods_desugar: bool,
    pub desugar_deps: Vec<String>,
}

impl CompiledUnit {
    pub fn new(target: impl Into<String>, module: ModuleId, output: Option<String>) -> Self {
        Self {
            target: target.into(),
            module,
            output,
            weight_estimate: 1,
            desugar_enabled: false,
            interface_methods_desugar: false,
            desugar_deps: Vec::new(),
        }
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Desugar dependencies handed to the dexer
    ///
    /// Only libraries that desugar interface methods need them; the result is
    /// sorted and deduplicated so the action payload is order-independent.
    pub fn effective_desugar_deps(&self) -> Vec<String> {
        if !(self.desugar_enabled && self.interface_methods_desugar) {
            return Vec::new();
        }
        let mut deps = self.desugar_deps.clone();
        deps.sort();
        deps.dedup();
        deps
    }
}
