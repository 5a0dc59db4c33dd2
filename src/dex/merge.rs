//! Merge stage
//!
//! Chooses how dex artifacts are merged and builds the merge groups of a
//! split build. The choice is made once per pass:
//!
//! | obfuscation or post-processing | `disable_pre_dex` | split | mode           |
//! |--------------------------------|-------------------|-------|----------------|
//! | no                             | no                | yes   | `PreDexSplit`  |
//! | no                             | no                | no    | `PreDexSingle` |
//! | yes                            | any               | any   | `NonPreDexed`  |
//! | any                            | yes               | any   | `NonPreDexed`  |
//!
//! Split builds only partition a module into several groups with the JAR
//! store and a positive group limit. Every other combination yields one
//! group per module, with all resource code in the root module's group.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dex::grouping::{DexGroup, group_artifacts, group_prefix, partition_by_module};
use crate::dex::policy::DexPolicy;
use crate::dex::predex::{ArtifactId, ArtifactSource, DexArtifact, DexArtifactRegistry, append_flavors};
use crate::dex::rclass::PRIMARY_DEX_SHARD;
use crate::domain::{ModuleGraph, ModuleId};
use crate::error::{Result, group_index_collision};
use crate::graph::{Action, ActionGraph, NodeId};

/// Android SDK keep rules applied during obfuscation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SdkProguardConfig {
    Default,
    Optimized,
    #[default]
    None,
}

/// Obfuscation and custom class post-processing settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Obfuscation {
    pub proguard_config: Option<String>,
    pub sdk_proguard_config: SdkProguardConfig,
    pub preprocess_java_classes_bash: Option<String>,
    pub preprocess_java_classes_cmd: Option<String>,
}

impl Obfuscation {
    pub fn should_proguard(&self) -> bool {
        self.proguard_config.is_some() || self.sdk_proguard_config != SdkProguardConfig::None
    }

    pub fn has_post_processing(&self) -> bool {
        self.preprocess_java_classes_bash.is_some() || self.preprocess_java_classes_cmd.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    PreDexSplit,
    PreDexSingle,
    NonPreDexed,
}

impl std::fmt::Display for MergeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MergeMode::PreDexSplit => "pre_dex_split",
            MergeMode::PreDexSingle => "pre_dex_single",
            MergeMode::NonPreDexed => "non_pre_dexed",
        };
        f.write_str(name)
    }
}

/// Pick the merge mode of a pass; obfuscation always wins over predexing
pub fn select_merge_mode(
    policy: &DexPolicy,
    obfuscation: &Obfuscation,
    disable_pre_dex: bool,
) -> MergeMode {
    let mode = if disable_pre_dex {
        info!("Predexing disabled by policy");
        MergeMode::NonPreDexed
    } else if obfuscation.should_proguard() {
        info!("Obfuscation configured, dexing the whole program after it");
        MergeMode::NonPreDexed
    } else if obfuscation.has_post_processing() {
        info!("Class post-processing configured, dexing the whole program after it");
        MergeMode::NonPreDexed
    } else if policy.split_enabled {
        MergeMode::PreDexSplit
    } else {
        MergeMode::PreDexSingle
    };
    debug!(%mode, split = policy.split_enabled, "Selected merge mode");
    mode
}

/// Name of a resource-code group
pub const RESOURCE_CODE_GROUP: &str = "r_dot_java_dex";

/// One group per module holding every artifact, resource code in the root
///
/// Used for non-JAR stores and for a group limit of 0.
pub fn single_groups_per_module(
    modules: &ModuleGraph,
    registry: &DexArtifactRegistry,
    unit_artifacts: &[ArtifactId],
    resource_artifacts: &[ArtifactId],
) -> Vec<DexGroup> {
    let root = modules.root();
    let tagged = unit_artifacts
        .iter()
        .map(|id| (registry.artifact(*id).module, *id))
        .chain(resource_artifacts.iter().map(|id| (root, *id)));
    partition_by_module(tagged, |(module, _)| *module)
        .into_iter()
        .map(|(module, items)| DexGroup {
            module,
            index: None,
            name: format!(
                "{}pre_dex_group",
                group_prefix(modules.name(module), modules.is_root(module))
            ),
            artifacts: items.into_iter().map(|(_, id)| id).collect(),
            resource_code: module == root && !resource_artifacts.is_empty(),
        })
        .collect()
}

/// Count-bounded groups per module, numbered from 1
pub fn indexed_groups(
    modules: &ModuleGraph,
    registry: &DexArtifactRegistry,
    unit_artifacts: &[ArtifactId],
    limit: usize,
) -> Vec<DexGroup> {
    let mut groups = Vec::new();
    let buckets = partition_by_module(unit_artifacts.iter().copied(), |id| {
        registry.artifact(*id).module
    });
    for (module, artifacts) in buckets {
        let prefix = group_prefix(modules.name(module), modules.is_root(module));
        let chunks = group_artifacts(&artifacts, limit);
        debug!(
            module = modules.name(module),
            artifacts = artifacts.len(),
            groups = chunks.len(),
            "Grouped dex artifacts"
        );
        for (i, chunk) in chunks.into_iter().enumerate() {
            let index = i as u32 + 1;
            groups.push(DexGroup {
                module,
                index: Some(index),
                name: format!("{prefix}pre_dex_group_{index}"),
                artifacts: chunk,
                resource_code: false,
            });
        }
    }
    groups
}

/// Resource-code groups of an indexed split build
///
/// Each owning module gets one extra group whose index follows the module's
/// last unit group, so it can never overwrite an existing secondary dex.
pub fn resource_code_groups(
    modules: &ModuleGraph,
    registry: &DexArtifactRegistry,
    unit_groups: &[DexGroup],
    resource_artifacts: &[ArtifactId],
) -> Vec<DexGroup> {
    let buckets = partition_by_module(resource_artifacts.iter().copied(), |id| {
        registry.artifact(*id).module
    });
    buckets
        .into_iter()
        .map(|(module, artifacts)| {
            let existing = unit_groups.iter().filter(|g| g.module == module).count();
            let index = existing as u32 + 1;
            DexGroup {
                module,
                index: Some(index),
                name: format!(
                    "{}{RESOURCE_CODE_GROUP}",
                    group_prefix(modules.name(module), modules.is_root(module))
                ),
                artifacts,
                resource_code: true,
            }
        })
        .collect()
}

/// Check that no two groups of a module share an index and that the root
/// resource-code group is numbered after every other root group
///
/// # Errors
///
/// Returns [`crate::error::DexGraphError::GroupIndexCollision`] on the first
/// violation.
pub fn validate_group_indices(modules: &ModuleGraph, groups: &[DexGroup]) -> Result<()> {
    let mut seen: BTreeMap<ModuleId, BTreeSet<u32>> = BTreeMap::new();
    for group in groups {
        if let Some(index) = group.index {
            if !seen.entry(group.module).or_default().insert(index) {
                return Err(group_index_collision(modules.name(group.module), index, index));
            }
        }
    }

    let root = modules.root();
    let reserved = groups
        .iter()
        .filter(|g| g.module == root && g.resource_code)
        .find_map(|g| g.index);
    if let Some(reserved) = reserved {
        let clash = groups
            .iter()
            .filter(|g| g.module == root && !g.resource_code)
            .filter_map(|g| g.index)
            .find(|index| *index >= reserved);
        if let Some(index) = clash {
            return Err(group_index_collision(modules.name(root), index, reserved));
        }
    }
    Ok(())
}

/// Whether an artifact must be placed in `classes.dex`
///
/// Only artifacts merged into the root module qualify.
pub fn is_forced_primary(policy: &DexPolicy, artifact: &DexArtifact, in_root: bool) -> bool {
    if !in_root {
        return false;
    }
    match &artifact.source {
        ArtifactSource::Unit { target } => policy.is_primary_dex_target(target),
        ArtifactSource::ResourceShard { rtype } => {
            rtype == PRIMARY_DEX_SHARD || !policy.allow_resource_code_in_secondary
        }
    }
}

/// Register the final merge over every group node of a split build
///
/// # Errors
///
/// Fails on duplicate node keys.
pub fn register_split_merge(
    graph: &mut ActionGraph,
    app_target: &str,
    groups: &[DexGroup],
    group_nodes: Vec<NodeId>,
) -> Result<NodeId> {
    graph.add(
        append_flavors(app_target, &["split_dex_merge", "d8"]),
        Action::SplitDexMerge {
            groups: groups.iter().map(|g| g.name.clone()).collect(),
        },
        group_nodes,
    )
}

/// Register the merge node of one group
///
/// `primary` is the pass-wide `classes.dex` content; members found in it
/// are recorded as the group's primary artifacts.
///
/// # Errors
///
/// Fails on duplicate node keys.
pub fn register_group(
    graph: &mut ActionGraph,
    registry: &DexArtifactRegistry,
    modules: &ModuleGraph,
    policy: &DexPolicy,
    app_target: &str,
    group: &DexGroup,
    primary: &[ArtifactId],
) -> Result<NodeId> {
    let members: Vec<&DexArtifact> = group.artifacts.iter().map(|id| registry.artifact(*id)).collect();
    graph.add(
        append_flavors(app_target, &[&group.name]),
        Action::DexGroupMerge {
            module: modules.name(group.module).to_string(),
            index: group.index,
            artifacts: members.iter().map(|a| a.key.clone()).collect(),
            primary_artifacts: members
                .iter()
                .filter(|a| primary.contains(&a.id))
                .map(|a| a.key.clone())
                .collect(),
            weight_limit: policy.weight_limit,
        },
        members.iter().map(|a| a.node).collect(),
    )
}

/// Register the whole-program merge of a non-split build
///
/// # Errors
///
/// Fails on duplicate node keys.
pub fn register_single_merge(
    graph: &mut ActionGraph,
    registry: &DexArtifactRegistry,
    app_target: &str,
    artifacts: &[ArtifactId],
) -> Result<NodeId> {
    let members: Vec<&DexArtifact> = artifacts.iter().map(|id| registry.artifact(*id)).collect();
    graph.add(
        append_flavors(app_target, &["single_dex_merge", "d8"]),
        Action::SingleDexMerge {
            artifacts: members.iter().map(|a| a.key.clone()).collect(),
        },
        members.iter().map(|a| a.node).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::policy::DexStore;
    use crate::domain::ModuleSpec;
    use crate::error::DexGraphError;

    fn modules() -> ModuleGraph {
        ModuleGraph::new(vec![
            ModuleSpec::new("dex").root(),
            ModuleSpec::new("video").depends_on("dex"),
        ])
        .unwrap()
    }

    fn push(
        graph: &mut ActionGraph,
        registry: &mut DexArtifactRegistry,
        source: ArtifactSource,
        module: ModuleId,
    ) -> ArtifactId {
        let key = format!("{}#d8", graph.len());
        let node = graph.add(key.clone(), Action::ProguardTextOutput, vec![]).unwrap();
        registry
            .get_or_insert_with(&key, |id| {
                Ok(DexArtifact {
                    id,
                    key: key.clone(),
                    node,
                    source,
                    module,
                    weight: 1,
                    weight_factor: 1,
                })
            })
            .unwrap()
    }

    fn unit(target: &str) -> ArtifactSource {
        ArtifactSource::Unit {
            target: target.to_string(),
        }
    }

    fn registry_with(
        modules: &ModuleGraph,
        specs: &[(&str, &str)],
    ) -> (ActionGraph, DexArtifactRegistry, Vec<ArtifactId>) {
        let mut graph = ActionGraph::new();
        let mut registry = DexArtifactRegistry::new();
        let ids = specs
            .iter()
            .map(|(target, module)| {
                let module = modules.find(module).unwrap();
                push(&mut graph, &mut registry, unit(target), module)
            })
            .collect();
        (graph, registry, ids)
    }

    #[test]
    fn test_obfuscation_wins_over_split() {
        let policy = DexPolicy {
            split_enabled: true,
            ..DexPolicy::default()
        };
        let obfuscation = Obfuscation {
            proguard_config: Some("proguard.cfg".into()),
            ..Obfuscation::default()
        };
        assert_eq!(
            select_merge_mode(&policy, &obfuscation, false),
            MergeMode::NonPreDexed
        );
        assert_eq!(
            select_merge_mode(&policy, &Obfuscation::default(), false),
            MergeMode::PreDexSplit
        );
    }

    #[test]
    fn test_mode_selection_table() {
        let single = DexPolicy::default();
        assert_eq!(
            select_merge_mode(&single, &Obfuscation::default(), false),
            MergeMode::PreDexSingle
        );
        assert_eq!(
            select_merge_mode(&single, &Obfuscation::default(), true),
            MergeMode::NonPreDexed
        );
        let sdk = Obfuscation {
            sdk_proguard_config: SdkProguardConfig::Optimized,
            ..Obfuscation::default()
        };
        assert_eq!(select_merge_mode(&single, &sdk, false), MergeMode::NonPreDexed);
        let preprocess = Obfuscation {
            preprocess_java_classes_cmd: Some("//tools:rewrite".into()),
            ..Obfuscation::default()
        };
        assert_eq!(
            select_merge_mode(&single, &preprocess, false),
            MergeMode::NonPreDexed
        );
    }

    #[test]
    fn test_indexed_groups_names_and_indices() {
        let modules = modules();
        let (_, registry, ids) = registry_with(
            &modules,
            &[
                ("//a", "dex"),
                ("//b", "dex"),
                ("//c", "dex"),
                ("//v", "video"),
            ],
        );
        let groups = indexed_groups(&modules, &registry, &ids, 2);
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["pre_dex_group_1", "pre_dex_group_2", "video_pre_dex_group_1"]
        );
        assert_eq!(groups[1].index, Some(2));
        assert_eq!(groups[2].index, Some(1));
    }

    #[test]
    fn test_resource_group_index_follows_root_groups() {
        let modules = modules();
        let (mut graph, mut registry, ids) =
            registry_with(&modules, &[("//a", "dex"), ("//b", "dex"), ("//c", "dex")]);
        let r = push(
            &mut graph,
            &mut registry,
            ArtifactSource::ResourceShard {
                rtype: "string".into(),
            },
            modules.root(),
        );
        let unit_groups = indexed_groups(&modules, &registry, &ids, 2);
        let r_groups = resource_code_groups(&modules, &registry, &unit_groups, &[r]);
        assert_eq!(r_groups.len(), 1);
        assert_eq!(r_groups[0].name, "r_dot_java_dex");
        assert_eq!(r_groups[0].index, Some(3));

        let mut all = unit_groups;
        all.extend(r_groups);
        assert!(validate_group_indices(&modules, &all).is_ok());
    }

    #[test]
    fn test_single_groups_put_resource_code_in_root() {
        let modules = modules();
        let (_, registry, ids) =
            registry_with(&modules, &[("//v", "video"), ("//a", "dex"), ("//r", "video")]);
        let groups = single_groups_per_module(&modules, &registry, &ids[..2], &ids[2..]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "video_pre_dex_group");
        assert_eq!(groups[0].artifacts, vec![ids[0]]);
        assert_eq!(groups[1].name, "pre_dex_group");
        assert_eq!(groups[1].artifacts, vec![ids[1], ids[2]]);
        assert!(groups.iter().all(|g| g.index.is_none()));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let modules = modules();
        let group = |index: u32, resource_code: bool| DexGroup {
            module: modules.root(),
            index: Some(index),
            name: format!("g{index}"),
            artifacts: Vec::new(),
            resource_code,
        };
        let err = validate_group_indices(&modules, &[group(1, false), group(1, false)]).unwrap_err();
        assert!(matches!(err, DexGraphError::GroupIndexCollision { index: 1, .. }));

        let err = validate_group_indices(&modules, &[group(2, true), group(3, false)]).unwrap_err();
        match err {
            DexGraphError::GroupIndexCollision {
                index, reserved, ..
            } => {
                assert_eq!(index, 3);
                assert_eq!(reserved, 2);
            }
            other => panic!("Expected GroupIndexCollision, got {other:?}"),
        }
    }

    #[test]
    fn test_forced_primary_rules() {
        let modules = modules();
        let (_, registry, ids) = registry_with(&modules, &[("//app/core:core", "dex")]);
        let policy = DexPolicy {
            store: DexStore::Jar,
            ..DexPolicy::default()
        }
        .with_primary_dex_patterns(vec!["//app/**".into()])
        .unwrap();
        let artifact = registry.artifact(ids[0]);
        assert!(is_forced_primary(&policy, artifact, true));
        assert!(!is_forced_primary(&policy, artifact, false));
    }
}
