//! Application module graph
//!
//! Modules live in an arena and are referenced by [`ModuleId`]. Exactly one
//! module is the root; every other module is a feature module that may be
//! delivered separately. Dependency edges only matter for packaging
//! placement and never influence dex grouping order.
//!
//! ## Validation
//!
//! [`ModuleGraph::new`] rejects:
//! - empty or duplicate names
//! - zero or several root modules
//! - edges to undeclared modules
//! - dependency cycles (DFS with three-colour marking)

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::error::{DexGraphError, Result, circular_dependency, config_invalid, module_not_found};

/// Name of the root module when the app declares no modules
pub const DEFAULT_ROOT_MODULE: &str = "dex";

/// Index of a module inside its [`ModuleGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ModuleId(pub(crate) u32);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Declaration of one module, as read from the app description
#[derive(Debug, Clone, Default)]
pub struct ModuleSpec {
    pub name: String,
    pub root: bool,
    pub deps: Vec<String>,
}

impl ModuleSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn root(mut self) -> Self {
        self.root = true;
        self
    }

    #[must_use]
    pub fn depends_on(mut self, dep: impl Into<String>) -> Self {
        self.deps.push(dep.into());
        self
    }
}

/// A named partition of the app's code, resources and assets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    pub name: String,
    pub is_root: bool,
    #[serde(skip)]
    pub deps: Vec<ModuleId>,
}

/// Immutable module graph with one designated root
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    root: ModuleId,
    by_name: HashMap<String, ModuleId>,
}

impl ModuleGraph {
    /// Build a graph holding only the default root module
    pub fn single_root() -> Self {
        let root = Module {
            name: DEFAULT_ROOT_MODULE.to_string(),
            is_root: true,
            deps: Vec::new(),
        };
        let mut by_name = HashMap::new();
        by_name.insert(root.name.clone(), ModuleId(0));
        Self {
            modules: vec![root],
            root: ModuleId(0),
            by_name,
        }
    }

    /// Build and validate a module graph from declarations
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate names, a root count other than one,
    /// unknown dependency names, or cycles.
    pub fn new(specs: Vec<ModuleSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Ok(Self::single_root());
        }

        let mut by_name = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            if spec.name.trim().is_empty() {
                return Err(config_invalid("module names cannot be empty"));
            }
            if spec.name.chars().any(|c| c.is_whitespace() || c == '/') {
                return Err(config_invalid(format!(
                    "module name '{}' must not contain whitespace or '/'",
                    spec.name
                )));
            }
            let id = ModuleId(u32::try_from(i).map_err(|_| config_invalid("too many modules"))?);
            if by_name.insert(spec.name.clone(), id).is_some() {
                return Err(DexGraphError::DuplicateModule {
                    name: spec.name.clone(),
                });
            }
        }

        let roots: Vec<usize> = specs
            .iter()
            .enumerate()
            .filter(|(_, s)| s.root)
            .map(|(i, _)| i)
            .collect();
        if roots.len() != 1 {
            return Err(DexGraphError::RootModule { count: roots.len() });
        }

        let mut modules = Vec::with_capacity(specs.len());
        for spec in &specs {
            let mut deps = Vec::with_capacity(spec.deps.len());
            for dep in &spec.deps {
                let id = by_name.get(dep).copied().ok_or_else(|| module_not_found(dep))?;
                if !deps.contains(&id) {
                    deps.push(id);
                }
            }
            modules.push(Module {
                name: spec.name.clone(),
                is_root: spec.root,
                deps,
            });
        }

        let graph = Self {
            modules,
            root: ModuleId(u32::try_from(roots[0]).map_err(|_| config_invalid("too many modules"))?),
            by_name,
        };
        graph.dependency_order()?;
        Ok(graph)
    }

    pub fn root(&self) -> ModuleId {
        self.root
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    pub fn name(&self, id: ModuleId) -> &str {
        &self.modules[id.index()].name
    }

    pub fn is_root(&self, id: ModuleId) -> bool {
        id == self.root
    }

    /// Look up a module by name
    ///
    /// # Errors
    ///
    /// Returns [`DexGraphError::ModuleNotFound`] for undeclared names.
    pub fn find(&self, name: &str) -> Result<ModuleId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| module_not_found(name))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module ids in declaration order
    pub fn ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        (0..self.modules.len()).map(|i| ModuleId(i as u32))
    }

    /// Name-sorted map of each module to the names of its direct dependencies
    pub fn outgoing_edges_map(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.modules
            .iter()
            .map(|m| {
                let deps = m
                    .deps
                    .iter()
                    .map(|d| self.modules[d.index()].name.clone())
                    .collect();
                (m.name.clone(), deps)
            })
            .collect()
    }

    /// Modules with dependencies before dependents
    ///
    /// Declaration order is preserved between independent modules.
    ///
    /// # Errors
    ///
    /// Returns [`DexGraphError::CircularDependency`] if the edges form a cycle.
    pub fn dependency_order(&self) -> Result<Vec<ModuleId>> {
        let mut visited = HashSet::new();
        let mut in_progress = Vec::new();
        let mut result = Vec::with_capacity(self.modules.len());
        for id in self.ids() {
            self.visit(id, &mut visited, &mut in_progress, &mut result)?;
        }
        Ok(result)
    }

    fn visit(
        &self,
        id: ModuleId,
        visited: &mut HashSet<ModuleId>,
        in_progress: &mut Vec<ModuleId>,
        result: &mut Vec<ModuleId>,
    ) -> Result<()> {
        if let Some(pos) = in_progress.iter().position(|m| *m == id) {
            let mut chain: Vec<&str> = in_progress[pos..].iter().map(|m| self.name(*m)).collect();
            chain.push(self.name(id));
            return Err(circular_dependency(chain.join(" -> ")));
        }
        if visited.contains(&id) {
            return Ok(());
        }

        in_progress.push(id);
        for dep in &self.modules[id.index()].deps {
            self.visit(*dep, visited, in_progress, result)?;
        }
        in_progress.pop();

        visited.insert(id);
        result.push(id);
        Ok(())
    }
}
