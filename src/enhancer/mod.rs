//! Graph enhancer
//!
//! Composes one enhancement pass: validates the policy, plans packaging,
//! synthesizes build configs, picks the merge mode, then registers the
//! per-unit dexing, resource code and merge nodes of that mode.
//!
//! ## Registration order
//!
//! The split path registers unit dexing and unit groups before the resource
//! code chain, because trimming reads the groups. Resource-code groups come
//! last so their index follows every unit group of their module.
//!
//! ```text
//! units ─► dex ─► groups ─┬─────────────► split merge
//!                         ▼                   ▲
//!                  trim ─► compile ─► split ─► shard dex ─► r groups
//! ```

pub mod build_config;
pub mod options;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::dex::layout::{
    MergeResult, forced_primary, layout_non_predexed, layout_single, layout_split, primary_set,
};
use crate::dex::merge::{
    MergeMode, indexed_groups, register_group, register_single_merge, register_split_merge,
    resource_code_groups, select_merge_mode, single_groups_per_module, validate_group_indices,
};
use crate::dex::nonpredex::{NonPreDexedContext, collect_proguard_configs, register_non_predexed};
use crate::dex::predex::{ArtifactId, DexArtifactRegistry, PreDexInput, PreDexer};
use crate::dex::rclass::{ResourceCodeBuilder, ResourceCodeChain, plan_shards};
use crate::dex::{DexGroup, DexPolicy};
use crate::domain::{ModuleGraph, PackageableCollection};
use crate::error::Result;
use crate::graph::{ActionGraph, NodeId};
use crate::packaging::PackagePlan;

use build_config::{BuildConfigUnit, add_build_config_units};
pub use options::{BinaryType, EnhancerOptions, ExopackageModes, PackageType};

/// Merge nodes of the selected mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DexMergePlan {
    PreDexSplit {
        groups: Vec<DexGroup>,
        merge: NodeId,
    },
    PreDexSingle {
        artifacts: Vec<ArtifactId>,
        merge: NodeId,
    },
    NonPreDexed {
        dex: NodeId,
        proguard_text_output: Option<NodeId>,
    },
}

impl DexMergePlan {
    pub fn mode(&self) -> MergeMode {
        match self {
            DexMergePlan::PreDexSplit { .. } => MergeMode::PreDexSplit,
            DexMergePlan::PreDexSingle { .. } => MergeMode::PreDexSingle,
            DexMergePlan::NonPreDexed { .. } => MergeMode::NonPreDexed,
        }
    }

    /// Node whose completion means every dex output exists
    pub fn merge_root(&self) -> NodeId {
        match self {
            DexMergePlan::PreDexSplit { merge, .. } | DexMergePlan::PreDexSingle { merge, .. } => {
                *merge
            }
            DexMergePlan::NonPreDexed { dex, .. } => *dex,
        }
    }

    /// Merge groups of a split build; empty otherwise
    pub fn groups(&self) -> &[DexGroup] {
        match self {
            DexMergePlan::PreDexSplit { groups, .. } => groups,
            _ => &[],
        }
    }
}

/// Everything an enhancement pass hands to packaging
#[derive(Debug, Clone)]
pub struct EnhancementResult {
    pub graph: ActionGraph,
    pub artifacts: DexArtifactRegistry,
    pub plan: DexMergePlan,
    pub merge_result: MergeResult,
    /// Collection entries followed by synthesized build config jars
    pub classpath_entries_to_dex: Vec<String>,
    /// Module name to the targets whose code it carries
    pub module_units: BTreeMap<String, Vec<String>>,
    pub resource_code: ResourceCodeChain,
    pub packaging: PackagePlan,
}

impl EnhancementResult {
    pub fn mode(&self) -> MergeMode {
        self.plan.mode()
    }
}

/// One enhancement pass over borrowed inputs
pub struct GraphEnhancer<'a> {
    pub modules: &'a ModuleGraph,
    pub collection: &'a PackageableCollection,
    pub policy: &'a DexPolicy,
    pub options: &'a EnhancerOptions,
}

impl<'a> GraphEnhancer<'a> {
    pub fn new(
        modules: &'a ModuleGraph,
        collection: &'a PackageableCollection,
        policy: &'a DexPolicy,
        options: &'a EnhancerOptions,
    ) -> Self {
        Self {
            modules,
            collection,
            policy,
            options,
        }
    }

    /// Build the action graph
    ///
    /// # Errors
    ///
    /// Fails on an invalid policy, a missing platform resource, an excluded
    /// library in the dex input, or a group index collision.
    pub fn enhance(&self) -> Result<EnhancementResult> {
        self.policy.validate()?;
        let packaging = PackagePlan::build(self.modules, self.collection, self.options)?;

        let mut graph = ActionGraph::new();
        let build_configs =
            add_build_config_units(&mut graph, self.options, self.modules.root(), self.collection)?;

        let mut classpath_entries_to_dex = self.collection.classpath_entries_to_dex().to_vec();
        for bc in &build_configs {
            if let Some(output) = &bc.unit.output {
                if !classpath_entries_to_dex.contains(output) {
                    classpath_entries_to_dex.push(output.clone());
                }
            }
        }
        let module_units = self.module_units(&build_configs);

        let mode = select_merge_mode(
            self.policy,
            &self.options.obfuscation,
            self.options.disable_pre_dex,
        );
        let mut artifacts = DexArtifactRegistry::new();
        let (plan, merge_result, resource_code) = match mode {
            MergeMode::NonPreDexed => {
                self.non_predexed(&mut graph, &build_configs, &classpath_entries_to_dex)?
            }
            MergeMode::PreDexSplit | MergeMode::PreDexSingle => {
                let unit_artifacts = self.predex(&mut graph, &mut artifacts, &build_configs)?;
                if mode == MergeMode::PreDexSplit {
                    self.split(&mut graph, &mut artifacts, &unit_artifacts)?
                } else {
                    self.single(&mut graph, &mut artifacts, unit_artifacts)?
                }
            }
        };

        info!(
            %mode,
            nodes = graph.len(),
            artifacts = artifacts.len(),
            "Enhanced action graph"
        );
        Ok(EnhancementResult {
            graph,
            artifacts,
            plan,
            merge_result,
            classpath_entries_to_dex,
            module_units,
            resource_code,
            packaging,
        })
    }

    fn resource_builder(&self) -> ResourceCodeBuilder<'_> {
        ResourceCodeBuilder {
            app_target: &self.options.app_target,
            resources: &self.collection.resources,
            policy: self.policy,
            trim_resource_ids: self.options.trim_resource_ids,
            weight_factor: self.options.r_dot_java_weight_factor,
            min_sdk: self.options.min_sdk,
        }
    }

    fn module_units(&self, build_configs: &[BuildConfigUnit]) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = self
            .modules
            .ids()
            .map(|id| (self.modules.name(id).to_string(), Vec::new()))
            .collect();
        let units = self
            .collection
            .units_to_dex()
            .map(|(_, u)| u)
            .chain(build_configs.iter().map(|bc| &bc.unit))
            .filter(|u| u.has_output());
        for unit in units {
            map.entry(self.modules.name(unit.module).to_string())
                .or_default()
                .push(unit.target.clone());
        }
        map
    }

    fn predex(
        &self,
        graph: &mut ActionGraph,
        registry: &mut DexArtifactRegistry,
        build_configs: &[BuildConfigUnit],
    ) -> Result<Vec<ArtifactId>> {
        let collection = self.collection;
        let mut dexer = PreDexer {
            graph,
            registry,
            min_sdk: self.options.min_sdk,
            is_excluded: |target: &str| collection.is_excluded(target),
        };
        let inputs = collection
            .units_to_dex()
            .map(|(_, unit)| PreDexInput {
                unit,
                producer: None,
            })
            .chain(build_configs.iter().map(|bc| PreDexInput {
                unit: &bc.unit,
                producer: Some(bc.node),
            }));
        dexer.dex_all(inputs)
    }

    fn split(
        &self,
        graph: &mut ActionGraph,
        registry: &mut DexArtifactRegistry,
        unit_artifacts: &[ArtifactId],
    ) -> Result<(DexMergePlan, MergeResult, ResourceCodeChain)> {
        let app = self.options.app_target.as_str();
        let shards = plan_shards(&self.collection.resources, self.modules, self.policy, true);
        let builder = self.resource_builder();

        let (groups, group_nodes, chain, primary) = if self.policy.allows_multiple_groups() {
            let mut groups = indexed_groups(
                self.modules,
                registry,
                unit_artifacts,
                self.policy.group_artifact_limit,
            );
            let reserve = builder.primary_reserve(self.modules, &shards);
            let mut primary = primary_set(self.modules, self.policy, registry, &groups, reserve);
            let mut group_nodes = Vec::with_capacity(groups.len() + 1);
            for group in &groups {
                group_nodes.push(register_group(
                    graph, registry, self.modules, self.policy, app, group, &primary,
                )?);
            }

            let chain = builder.build(graph, registry, &group_nodes, &shards)?;
            let r_groups = resource_code_groups(self.modules, registry, &groups, &chain.artifacts);
            primary.extend(forced_primary(self.modules, self.policy, registry, &r_groups));
            for group in &r_groups {
                group_nodes.push(register_group(
                    graph, registry, self.modules, self.policy, app, group, &primary,
                )?);
            }
            groups.extend(r_groups);
            (groups, group_nodes, chain, primary)
        } else {
            if self.policy.group_artifact_limit > 0 {
                info!(
                    store = %self.policy.store,
                    limit = self.policy.group_artifact_limit,
                    "Dex group limit only applies to the jar store, using one group per module"
                );
            }
            let users: Vec<NodeId> = unit_artifacts
                .iter()
                .map(|id| registry.artifact(*id).node)
                .collect();
            let chain = builder.build(graph, registry, &users, &shards)?;
            let groups =
                single_groups_per_module(self.modules, registry, unit_artifacts, &chain.artifacts);
            let primary = primary_set(self.modules, self.policy, registry, &groups, 0);
            let mut group_nodes = Vec::with_capacity(groups.len());
            for group in &groups {
                group_nodes.push(register_group(
                    graph, registry, self.modules, self.policy, app, group, &primary,
                )?);
            }
            (groups, group_nodes, chain, primary)
        };

        validate_group_indices(self.modules, &groups)?;
        let merge = register_split_merge(graph, app, &groups, group_nodes)?;
        let layout = layout_split(self.modules, self.policy, registry, &groups, &primary);
        debug!(groups = groups.len(), "Registered split dex merge");
        Ok((DexMergePlan::PreDexSplit { groups, merge }, layout, chain))
    }

    fn single(
        &self,
        graph: &mut ActionGraph,
        registry: &mut DexArtifactRegistry,
        mut artifacts: Vec<ArtifactId>,
    ) -> Result<(DexMergePlan, MergeResult, ResourceCodeChain)> {
        let app = self.options.app_target.as_str();
        let shards = plan_shards(&self.collection.resources, self.modules, self.policy, false);
        let users: Vec<NodeId> = artifacts.iter().map(|id| registry.artifact(*id).node).collect();
        let chain = self.resource_builder().build(graph, registry, &users, &shards)?;
        artifacts.extend(chain.artifacts.iter().copied());

        let merge = register_single_merge(graph, registry, app, &artifacts)?;
        let root = self.modules.name(self.modules.root());
        let layout = layout_single(registry, root, &artifacts);
        Ok((DexMergePlan::PreDexSingle { artifacts, merge }, layout, chain))
    }

    fn non_predexed(
        &self,
        graph: &mut ActionGraph,
        build_configs: &[BuildConfigUnit],
        classpath_entries_to_dex: &[String],
    ) -> Result<(DexMergePlan, MergeResult, ResourceCodeChain)> {
        let chain = self.resource_builder().trim_and_compile(graph, &[])?;
        let extra_entries: Vec<String> = classpath_entries_to_dex
            .iter()
            .skip(self.collection.classpath_entries_to_dex().len())
            .cloned()
            .collect();
        let should_proguard = self.options.obfuscation.should_proguard();
        let inputs = NonPreDexedContext {
            modules: self.modules,
            collection: self.collection,
            policy: self.policy,
            extra_entries: &extra_entries,
            compiled_resource_code: &chain.compiled_output,
            proguard_configs: collect_proguard_configs(
                self.collection,
                self.options.ignore_aapt_proguard_config,
            ),
            should_proguard,
            min_sdk: self.options.min_sdk,
        }
        .assemble();

        let mut deps: Vec<NodeId> = build_configs.iter().map(|bc| bc.node).collect();
        deps.push(chain.compile);
        let (dex, proguard_text_output) =
            register_non_predexed(graph, &self.options.app_target, inputs, deps)?;
        let layout = layout_non_predexed(self.modules, self.policy.split_enabled);
        Ok((
            DexMergePlan::NonPreDexed {
                dex,
                proguard_text_output,
            },
            layout,
            chain,
        ))
    }
}
