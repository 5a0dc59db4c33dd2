//! Action payloads
//!
//! Each node of the action graph carries one [`Action`]. Payloads only
//! describe what a downstream tool invocation receives; nothing here runs a
//! tool.

use serde::Serialize;

use crate::dex::NonPreDexedInputs;
use crate::domain::BuildConfigFields;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Generate and compile `BuildConfig` for one Java package
    BuildConfig {
        java_package: String,
        fields: BuildConfigFields,
    },

    /// Convert one jar into one dex artifact
    Dex {
        input: String,
        weight_factor: u64,
        desugar_deps: Vec<String>,
        min_sdk: Option<u32>,
    },

    /// Trim the generated resource sources to identifiers in use
    TrimResourceCode {
        r_dot_java_dir: Option<String>,
        filter_by_users: bool,
    },

    /// Compile the trimmed resource sources into one jar
    CompileResourceCode { classes_to_remove: Vec<String> },

    /// Split the compiled resource jar by resource type
    SplitResourceCode { shards: Vec<String> },

    /// Expose one split resource jar as a library
    PrebuiltJar { shard: String },

    /// Merge one group of dex artifacts into secondary containers
    DexGroupMerge {
        module: String,
        index: Option<u32>,
        artifacts: Vec<String>,
        /// Members that must land in `classes.dex`
        primary_artifacts: Vec<String>,
        weight_limit: u64,
    },

    /// Final merge over all groups of a split build
    SplitDexMerge { groups: Vec<String> },

    /// Whole-program merge into a single dex
    SingleDexMerge { artifacts: Vec<String> },

    /// Desugar, obfuscate and dex the whole program in one step
    NonPreDexedDex(Box<NonPreDexedInputs>),

    /// Text outputs of the obfuscation step
    ProguardTextOutput,
}

impl Action {
    /// Short label used in listings
    pub fn label(&self) -> &'static str {
        match self {
            Action::BuildConfig { .. } => "build_config",
            Action::Dex { .. } => "dex",
            Action::TrimResourceCode { .. } => "trim_resource_code",
            Action::CompileResourceCode { .. } => "compile_resource_code",
            Action::SplitResourceCode { .. } => "split_resource_code",
            Action::PrebuiltJar { .. } => "prebuilt_jar",
            Action::DexGroupMerge { .. } => "dex_group_merge",
            Action::SplitDexMerge { .. } => "split_dex_merge",
            Action::SingleDexMerge { .. } => "single_dex_merge",
            Action::NonPreDexedDex(_) => "non_predexed_dex",
            Action::ProguardTextOutput => "proguard_text_output",
        }
    }
}
