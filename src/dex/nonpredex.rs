//! Whole-program dexing inputs
//!
//! When obfuscation or class post-processing runs, nothing is predexed.
//! One action desugars, obfuscates and dexes the program; this module only
//! assembles its inputs, in an order that is stable across passes.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::dex::policy::{DexPolicy, DexStore};
use crate::dex::predex::append_flavors;
use crate::domain::{ModuleGraph, PackageableCollection};
use crate::error::Result;
use crate::graph::{Action, ActionGraph, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NonPreDexedInputs {
    /// Classpath of excluded libraries, needed to resolve symbols only
    pub additional_jars: Vec<String>,
    /// Jars to dex, deduplicated in first-seen order, resource code last
    pub classpath_entries: Vec<String>,
    pub module_classpath_entries: BTreeMap<String, Vec<String>>,
    pub proguard_configs: Vec<String>,
    pub module_dependencies: BTreeMap<String, BTreeSet<String>>,
    pub root_module: String,
    pub split: bool,
    pub store: DexStore,
    pub should_proguard: bool,
    pub min_sdk: Option<u32>,
}

/// Obfuscation keep rules: the collection's own, then the resource
/// compiler's unless ignored
pub fn collect_proguard_configs(collection: &PackageableCollection, ignore_aapt: bool) -> Vec<String> {
    let mut configs = collection.proguard_configs.clone();
    if !ignore_aapt {
        configs.extend(collection.resources.aapt_proguard_configs.iter().cloned());
    }
    configs
}

/// Borrowed context for assembling [`NonPreDexedInputs`]
pub struct NonPreDexedContext<'a> {
    pub modules: &'a ModuleGraph,
    pub collection: &'a PackageableCollection,
    pub policy: &'a DexPolicy,
    /// Outputs of synthesized libraries, appended after the collection's entries
    pub extra_entries: &'a [String],
    pub compiled_resource_code: &'a str,
    pub proguard_configs: Vec<String>,
    pub should_proguard: bool,
    pub min_sdk: Option<u32>,
}

impl NonPreDexedContext<'_> {
    pub fn assemble(self) -> NonPreDexedInputs {
        let additional_jars: BTreeSet<String> = self
            .collection
            .excluded_libraries()
            .iter()
            .flat_map(|lib| lib.immediate_classpath.iter().cloned())
            .collect();

        let mut classpath_entries: Vec<String> = Vec::new();
        let all = self
            .collection
            .classpath_entries_to_dex()
            .iter()
            .chain(self.extra_entries)
            .map(String::as_str)
            .chain(std::iter::once(self.compiled_resource_code));
        for entry in all {
            if !classpath_entries.iter().any(|e| e == entry) {
                classpath_entries.push(entry.to_string());
            }
        }

        let module_classpath_entries = self
            .collection
            .module_classpath_entries()
            .iter()
            .map(|(module, entries)| (self.modules.name(*module).to_string(), entries.clone()))
            .collect();

        NonPreDexedInputs {
            additional_jars: additional_jars.into_iter().collect(),
            classpath_entries,
            module_classpath_entries,
            proguard_configs: self.proguard_configs,
            module_dependencies: self.modules.outgoing_edges_map(),
            root_module: self.modules.name(self.modules.root()).to_string(),
            split: self.policy.split_enabled,
            store: self.policy.store,
            should_proguard: self.should_proguard,
            min_sdk: self.min_sdk,
        }
    }
}

/// Register the whole-program step and, with obfuscation, its text outputs
///
/// # Errors
///
/// Fails on duplicate node keys.
pub fn register_non_predexed(
    graph: &mut ActionGraph,
    app_target: &str,
    inputs: NonPreDexedInputs,
    deps: Vec<NodeId>,
) -> Result<(NodeId, Option<NodeId>)> {
    let should_proguard = inputs.should_proguard;
    let dex = graph.add(
        append_flavors(app_target, &["class_file_to_dex_processing"]),
        Action::NonPreDexedDex(Box::new(inputs)),
        deps,
    )?;
    let text = if should_proguard {
        Some(graph.add(
            append_flavors(app_target, &["proguard_text_output"]),
            Action::ProguardTextOutput,
            vec![dex],
        )?)
    } else {
        None
    };
    Ok((dex, text))
}
