//! App description (`app.yaml`) data structures

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dex::{DexStore, Obfuscation};
use crate::domain::BuildConfigField;
use crate::enhancer::{BinaryType, PackageType};
use crate::error::{Result, config_invalid, config_parse_failed, config_read_failed};

/// Everything the planner needs to know about one app
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Target of the app, e.g. `//apps/sample:app`
    pub name: String,

    #[serde(default)]
    pub package_type: PackageType,

    #[serde(default)]
    pub binary_type: BinaryType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_sdk_version: Option<u32>,

    /// Omit to get a single root module named `dex`
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,

    #[serde(default)]
    pub units: Vec<UnitConfig>,

    #[serde(default)]
    pub excluded_from_dex: Vec<ExcludedConfig>,

    /// Jars to dex that no unit produces, such as prebuilt libraries
    #[serde(default)]
    pub classpath_entries_to_dex: Vec<ClasspathEntryConfig>,

    #[serde(default)]
    pub proguard_configs: Vec<String>,

    #[serde(default)]
    pub dex: DexConfig,

    #[serde(default)]
    pub obfuscation: Obfuscation,

    #[serde(default)]
    pub resources: ResourcesConfig,

    /// Build config fragments keyed by Java package
    #[serde(default)]
    pub build_configs: BTreeMap<String, Vec<BuildConfigField>>,

    #[serde(default)]
    pub build_config_values: Vec<BuildConfigField>,

    /// Lowercase names: `secondary_dex`, `native_library`, `resources`,
    /// `modules`, `arch64`
    #[serde(default)]
    pub exopackage_modes: Vec<String>,

    #[serde(default)]
    pub native: NativeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    pub name: String,
    #[serde(default)]
    pub root: bool,
    #[serde(default)]
    pub deps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitConfig {
    pub target: String,
    /// Owning module; the root module when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: u64,
    #[serde(default)]
    pub desugar: bool,
    #[serde(default)]
    pub desugar_interface_methods: bool,
    #[serde(default)]
    pub desugar_deps: Vec<String>,
}

fn default_weight() -> u64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExcludedConfig {
    pub target: String,
    #[serde(default)]
    pub classpath: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClasspathEntryConfig {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

/// Dex splitting options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DexConfig {
    pub use_split_dex: bool,
    pub minimize_primary_dex_size: bool,
    /// Defaults to `jar` with secondary dex exopackage, `raw` otherwise
    pub dex_compression: Option<DexStore>,
    pub dex_group_lib_limit: usize,
    pub secondary_dex_weight_limit: Option<u64>,
    pub linear_alloc_hard_limit: Option<u64>,
    pub method_ref_count_buffer_space: u64,
    pub field_ref_count_buffer_space: u64,
    pub primary_dex_patterns: Vec<String>,
    pub allow_r_dot_java_in_secondary_dex: bool,
    pub disable_pre_dex: bool,
    pub r_dot_java_weight_factor: Option<u64>,
    pub trim_resource_ids: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourcesConfig {
    pub r_dot_java_dir: Option<String>,
    pub types: Vec<String>,
    /// Module name to resource types owned by that module
    pub module_types: BTreeMap<String, Vec<String>>,
    pub packages_to_exclude: Vec<String>,
    pub aapt_proguard_configs: Vec<String>,
    pub ignore_aapt_proguard_config: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NativeConfig {
    /// Module name to native libraries
    pub libraries: BTreeMap<String, Vec<String>>,
    pub exopackage_stub_bundle: Option<String>,
}

impl AppConfig {
    /// Parse an app description from YAML
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML, unknown keys, or an empty app name.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse an app description file
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DexGraphError::ConfigReadFailed`] or
    /// [`crate::error::DexGraphError::ConfigParseFailed`] naming `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| config_read_failed(&display, e.to_string()))?;
        let config: Self =
            serde_yaml::from_str(&yaml).map_err(|e| config_parse_failed(&display, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(config_invalid("app name cannot be empty"));
        }
        if let Some(unit) = self.units.iter().find(|u| u.target.trim().is_empty()) {
            return Err(config_invalid(format!(
                "unit with output {:?} has an empty target",
                unit.output
            )));
        }
        if self.dex.r_dot_java_weight_factor == Some(0) {
            return Err(config_invalid("r_dot_java_weight_factor must be at least 1"));
        }
        Ok(())
    }
}
