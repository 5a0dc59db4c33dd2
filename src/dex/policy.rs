//! Dex policy
//!
//! Immutable description of how compiled code is split into dex files.
//! Built once from the app description and validated before planning.

use serde::{Deserialize, Serialize, Serializer};
use wax::{CandidatePath, Glob, Pattern};

use crate::error::{Result, config::invalid_pattern, config_invalid};

/// Which side of the primary/secondary split gets the slack
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DexStrategy {
    /// Fill `classes.dex` as far as the linear-alloc budget allows
    #[default]
    MaximizePrimary,
    /// Put only forced-primary code into `classes.dex`
    MinimizePrimary,
}

/// On-disk container format of secondary dex files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DexStore {
    #[default]
    Raw,
    Jar,
    /// Jars concatenated and compressed with a shared index
    #[serde(alias = "jar_with_shared_index")]
    Xzs,
}

impl DexStore {
    /// File extension of one secondary container
    pub fn extension(self) -> &'static str {
        match self {
            DexStore::Raw => ".dex",
            DexStore::Jar => ".dex.jar",
            DexStore::Xzs => ".dex.jar.xzs",
        }
    }
}

impl std::fmt::Display for DexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DexStore::Raw => "raw",
            DexStore::Jar => "jar",
            DexStore::Xzs => "xzs",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DexPolicy {
    pub split_enabled: bool,
    pub strategy: DexStrategy,
    pub store: DexStore,
    /// Maximum artifacts per merge group; 0 means one group per module
    pub group_artifact_limit: usize,
    /// Maximum summed weight of one secondary container
    pub weight_limit: u64,
    pub linear_alloc_hard_limit: u64,
    pub method_ref_count_buffer_space: u64,
    pub field_ref_count_buffer_space: u64,
    pub allow_resource_code_in_secondary: bool,
    pub(crate) primary_dex_patterns: PrimaryDexPatterns,
}

impl Default for DexPolicy {
    fn default() -> Self {
        Self {
            split_enabled: false,
            strategy: DexStrategy::default(),
            store: DexStore::default(),
            group_artifact_limit: 0,
            weight_limit: Self::DEFAULT_WEIGHT_LIMIT,
            linear_alloc_hard_limit: Self::DEFAULT_LINEAR_ALLOC_HARD_LIMIT,
            method_ref_count_buffer_space: 0,
            field_ref_count_buffer_space: 0,
            allow_resource_code_in_secondary: false,
            primary_dex_patterns: PrimaryDexPatterns::default(),
        }
    }
}

impl DexPolicy {
    pub const DEFAULT_WEIGHT_LIMIT: u64 = 12 * 1024 * 1024;
    pub const DEFAULT_LINEAR_ALLOC_HARD_LIMIT: u64 = 4 * 1024 * 1024;

    /// Set the primary dex patterns, compiling each once to reject bad globs
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DexGraphError::InvalidPattern`] for a pattern
    /// that does not compile.
    pub fn with_primary_dex_patterns(mut self, patterns: Vec<String>) -> Result<Self> {
        let mut globs = Vec::with_capacity(patterns.len());
        for pattern in &patterns {
            let glob = Glob::new(normalize(pattern)).map_err(|e| invalid_pattern(pattern, e.to_string()))?;
            globs.push(glob.into_owned());
        }
        self.primary_dex_patterns = PrimaryDexPatterns {
            sources: patterns,
            globs,
        };
        Ok(self)
    }

    /// Check the numeric limits
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a limit makes packing impossible.
    pub fn validate(&self) -> Result<()> {
        if self.weight_limit == 0 {
            return Err(config_invalid("secondary_dex_weight_limit must be positive"));
        }
        if self.split_enabled && self.primary_budget() == 0 {
            return Err(config_invalid(
                "linear_alloc_hard_limit leaves no room after the reference buffer space",
            ));
        }
        Ok(())
    }

    pub fn primary_dex_patterns(&self) -> &[String] {
        &self.primary_dex_patterns.sources
    }

    /// Whether a module's artifacts may be split over several merge groups
    pub fn allows_multiple_groups(&self) -> bool {
        self.store == DexStore::Jar && self.group_artifact_limit > 0
    }

    /// Weight available to `classes.dex` once the reference buffers are reserved
    pub fn primary_budget(&self) -> u64 {
        self.linear_alloc_hard_limit
            .saturating_sub(self.method_ref_count_buffer_space)
            .saturating_sub(self.field_ref_count_buffer_space)
    }

    /// Whether a unit target is forced into the primary dex
    pub fn is_primary_dex_target(&self, target: &str) -> bool {
        let candidate = CandidatePath::from(normalize(target));
        self.primary_dex_patterns
            .globs
            .iter()
            .any(|glob| glob.matched(&candidate).is_some())
    }
}

/// Primary dex globs, compiled once; compared and serialized as written
#[derive(Debug, Clone, Default)]
pub struct PrimaryDexPatterns {
    sources: Vec<String>,
    globs: Vec<Glob<'static>>,
}

impl PartialEq for PrimaryDexPatterns {
    fn eq(&self, other: &Self) -> bool {
        self.sources == other.sources
    }
}

impl Eq for PrimaryDexPatterns {}

impl Serialize for PrimaryDexPatterns {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.sources.serialize(serializer)
    }
}

/// Targets are written `//path:name`; globs match them without the leading slashes
fn normalize(value: &str) -> &str {
    value.trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = DexPolicy::default();
        assert!(!policy.split_enabled);
        assert_eq!(policy.store, DexStore::Raw);
        assert_eq!(policy.weight_limit, 12 * 1024 * 1024);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_multiple_groups_only_for_jar_store() {
        let mut policy = DexPolicy {
            store: DexStore::Jar,
            group_artifact_limit: 3,
            ..DexPolicy::default()
        };
        assert!(policy.allows_multiple_groups());

        policy.store = DexStore::Raw;
        assert!(!policy.allows_multiple_groups());
        policy.store = DexStore::Xzs;
        assert!(!policy.allows_multiple_groups());

        policy.store = DexStore::Jar;
        policy.group_artifact_limit = 0;
        assert!(!policy.allows_multiple_groups());
    }

    #[test]
    fn test_store_extensions() {
        assert_eq!(DexStore::Raw.extension(), ".dex");
        assert_eq!(DexStore::Jar.extension(), ".dex.jar");
        assert_eq!(DexStore::Xzs.extension(), ".dex.jar.xzs");
    }

    #[test]
    fn test_primary_dex_patterns_match_targets() {
        let policy = DexPolicy::default()
            .with_primary_dex_patterns(vec!["//app/**".into(), "lib:bootstrap".into()])
            .unwrap();
        assert!(policy.is_primary_dex_target("//app/core:core"));
        assert!(policy.is_primary_dex_target("//lib:bootstrap"));
        assert!(!policy.is_primary_dex_target("//lib:other"));
    }

    #[test]
    fn test_primary_dex_patterns_compare_and_serialize_as_written() {
        let a = DexPolicy::default()
            .with_primary_dex_patterns(vec!["//app/**".into()])
            .unwrap();
        let b = DexPolicy::default()
            .with_primary_dex_patterns(vec!["//app/**".into()])
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, DexPolicy::default());
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["primary_dex_patterns"], serde_json::json!(["//app/**"]));
    }

    #[test]
    fn test_zero_weight_limit_rejected() {
        let policy = DexPolicy {
            weight_limit: 0,
            ..DexPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_primary_budget_subtracts_buffers() {
        let policy = DexPolicy {
            linear_alloc_hard_limit: 100,
            method_ref_count_buffer_space: 30,
            field_ref_count_buffer_space: 20,
            ..DexPolicy::default()
        };
        assert_eq!(policy.primary_budget(), 50);
    }

    #[test]
    fn test_store_accepts_long_alias() {
        let store: DexStore = serde_yaml::from_str("jar_with_shared_index").unwrap();
        assert_eq!(store, DexStore::Xzs);
    }
}
