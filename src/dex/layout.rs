//! Planned dex output layout
//!
//! Turns the merge plan into the concrete containers the packaging stage
//! will find on disk. Artifacts of each group are packed sequentially into
//! secondary containers whose summed weight stays within the policy's
//! weight limit; an artifact heavier than the limit gets a container of its
//! own.
//!
//! The root module also owns `classes.dex`. It receives every forced-primary
//! artifact and, under [`DexStrategy::MaximizePrimary`], the leading
//! artifacts of the first root group while the primary budget holds.

use serde::Serialize;
use tracing::warn;

use crate::dex::grouping::DexGroup;
use crate::dex::merge::is_forced_primary;
use crate::dex::policy::{DexPolicy, DexStrategy};
use crate::dex::predex::{ArtifactId, DexArtifactRegistry};
use crate::domain::ModuleGraph;

pub const PRIMARY_DEX: &str = "classes.dex";
pub const ROOT_SECONDARY_DEX_DIR: &str = "assets/secondary-program-dex-jars";

/// Directory holding a module's secondary dex containers
pub fn secondary_dex_dir(module: &str, is_root: bool) -> String {
    if is_root {
        ROOT_SECONDARY_DEX_DIR.to_string()
    } else {
        format!("assets/{module}")
    }
}

/// Relative path of one secondary container
///
/// `number` counts from 1 within the group.
pub fn container_path(
    module: &str,
    is_root: bool,
    group: Option<u32>,
    number: usize,
    extension: &str,
) -> String {
    let group = group.map(|g| format!("{g}_")).unwrap_or_default();
    let stem = if is_root { "secondary" } else { module };
    format!(
        "{}/{stem}-{group}{number}{extension}",
        secondary_dex_dir(module, is_root)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DexOutputKind {
    Primary,
    Secondary,
    /// Contents decided by a whole-program step at build time
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DexOutput {
    pub path: String,
    pub kind: DexOutputKind,
    /// Labels of the member artifacts
    pub artifacts: Vec<String>,
    pub weight: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDexOutputs {
    pub module: String,
    pub is_root: bool,
    pub outputs: Vec<DexOutput>,
}

/// Module to ordered dex containers, root module first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeResult {
    pub modules: Vec<ModuleDexOutputs>,
}

impl MergeResult {
    pub fn module(&self, name: &str) -> Option<&ModuleDexOutputs> {
        self.modules.iter().find(|m| m.module == name)
    }

    /// All containers in module then group order
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &DexOutput)> {
        self.modules
            .iter()
            .flat_map(|m| m.outputs.iter().map(move |o| (m.module.as_str(), o)))
    }

    fn entry(&mut self, name: &str, is_root: bool) -> &mut ModuleDexOutputs {
        let pos = match self.modules.iter().position(|m| m.module == name) {
            Some(pos) => pos,
            None => {
                self.modules.push(ModuleDexOutputs {
                    module: name.to_string(),
                    is_root,
                    outputs: Vec::new(),
                });
                self.modules.len() - 1
            }
        };
        &mut self.modules[pos]
    }
}

/// Forced-primary artifacts of the root module's groups, in group order
pub fn forced_primary(
    modules: &ModuleGraph,
    policy: &DexPolicy,
    registry: &DexArtifactRegistry,
    groups: &[DexGroup],
) -> Vec<ArtifactId> {
    groups
        .iter()
        .filter(|g| modules.is_root(g.module))
        .flat_map(|g| g.artifacts.iter().copied())
        .filter(|id| is_forced_primary(policy, registry.artifact(*id), true))
        .collect()
}

/// Artifacts merged into `classes.dex`: forced ones first, then under
/// [`DexStrategy::MaximizePrimary`] the leading artifacts of the first root
/// group while the budget holds
///
/// `reserved` is primary weight already claimed by forced artifacts that
/// are not part of `groups` yet.
pub fn primary_set(
    modules: &ModuleGraph,
    policy: &DexPolicy,
    registry: &DexArtifactRegistry,
    groups: &[DexGroup],
    reserved: u64,
) -> Vec<ArtifactId> {
    let mut primary = forced_primary(modules, policy, registry, groups);
    let mut primary_weight = registry.total_weight(&primary) + reserved;
    let budget = policy.primary_budget();
    if primary_weight > budget {
        warn!(
            weight = primary_weight,
            budget, "Forced primary dex content exceeds the linear alloc budget"
        );
    }

    if policy.strategy == DexStrategy::MaximizePrimary {
        if let Some(first) = groups.iter().find(|g| modules.is_root(g.module)) {
            for id in &first.artifacts {
                if primary.contains(id) {
                    continue;
                }
                let weight = registry.artifact(*id).weight;
                if primary_weight + weight > budget {
                    break;
                }
                primary_weight += weight;
                primary.push(*id);
            }
        }
    }
    primary
}

/// Plan the containers of a split build
///
/// `primary` is the `classes.dex` content from [`primary_set`]; the same
/// set is recorded on the root group merge nodes.
pub fn layout_split(
    modules: &ModuleGraph,
    policy: &DexPolicy,
    registry: &DexArtifactRegistry,
    groups: &[DexGroup],
    primary: &[ArtifactId],
) -> MergeResult {
    let root = modules.root();
    let mut result = MergeResult::default();

    result.entry(modules.name(root), true).outputs.push(DexOutput {
        path: PRIMARY_DEX.to_string(),
        kind: DexOutputKind::Primary,
        artifacts: labels(registry, primary),
        weight: registry.total_weight(primary),
    });

    for group in groups {
        let name = modules.name(group.module);
        let is_root = group.module == root;
        let remaining: Vec<ArtifactId> = group
            .artifacts
            .iter()
            .copied()
            .filter(|id| !is_root || !primary.contains(id))
            .collect();
        let containers = pack_by_weight(registry, &remaining, policy.weight_limit);
        let entry = result.entry(name, is_root);
        for (n, members) in containers.iter().enumerate() {
            entry.outputs.push(DexOutput {
                path: container_path(name, is_root, group.index, n + 1, policy.store.extension()),
                kind: DexOutputKind::Secondary,
                artifacts: labels(registry, members),
                weight: registry.total_weight(members),
            });
        }
    }
    result
}

/// Plan the single `classes.dex` of a non-split build
pub fn layout_single(registry: &DexArtifactRegistry, root: &str, artifacts: &[ArtifactId]) -> MergeResult {
    MergeResult {
        modules: vec![ModuleDexOutputs {
            module: root.to_string(),
            is_root: true,
            outputs: vec![DexOutput {
                path: PRIMARY_DEX.to_string(),
                kind: DexOutputKind::Primary,
                artifacts: labels(registry, artifacts),
                weight: registry.total_weight(artifacts),
            }],
        }],
    }
}

/// Plan the outputs of the whole-program step
///
/// Member lists are unknown until the step runs; split builds expose each
/// module's secondary directory.
pub fn layout_non_predexed(modules: &ModuleGraph, split: bool) -> MergeResult {
    let mut result = MergeResult::default();
    let root = modules.root();
    result.entry(modules.name(root), true).outputs.push(DexOutput {
        path: PRIMARY_DEX.to_string(),
        kind: DexOutputKind::Primary,
        artifacts: Vec::new(),
        weight: 0,
    });
    if split {
        let ordered = std::iter::once(root).chain(modules.ids().filter(|id| *id != root));
        for id in ordered {
            let name = modules.name(id);
            let is_root = id == root;
            result.entry(name, is_root).outputs.push(DexOutput {
                path: secondary_dex_dir(name, is_root),
                kind: DexOutputKind::Directory,
                artifacts: Vec::new(),
                weight: 0,
            });
        }
    }
    result
}

/// Sequential packing by weight, order preserved
pub fn pack_by_weight(
    registry: &DexArtifactRegistry,
    artifacts: &[ArtifactId],
    limit: u64,
) -> Vec<Vec<ArtifactId>> {
    let mut containers: Vec<Vec<ArtifactId>> = Vec::new();
    let mut current_weight = 0u64;
    for id in artifacts {
        let weight = registry.artifact(*id).weight;
        let fits = containers
            .last()
            .is_some_and(|c| !c.is_empty() && current_weight + weight <= limit);
        if !fits {
            containers.push(Vec::new());
            current_weight = 0;
        }
        current_weight += weight;
        if let Some(current) = containers.last_mut() {
            current.push(*id);
        }
    }
    containers
}

fn labels(registry: &DexArtifactRegistry, ids: &[ArtifactId]) -> Vec<String> {
    ids.iter()
        .map(|id| registry.artifact(*id).label().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::policy::DexStore;
    use crate::dex::predex::{ArtifactSource, DexArtifact};
    use crate::domain::ModuleSpec;
    use crate::graph::{Action, ActionGraph};

    struct Fixture {
        modules: ModuleGraph,
        graph: ActionGraph,
        registry: DexArtifactRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                modules: ModuleGraph::new(vec![
                    ModuleSpec::new("dex").root(),
                    ModuleSpec::new("video").depends_on("dex"),
                ])
                .unwrap(),
                graph: ActionGraph::new(),
                registry: DexArtifactRegistry::new(),
            }
        }

        fn unit(&mut self, target: &str, module: &str, weight: u64) -> ArtifactId {
            let module = self.modules.find(module).unwrap();
            let key = format!("{target}#d8");
            let node = self
                .graph
                .add(key.clone(), Action::ProguardTextOutput, vec![])
                .unwrap();
            self.registry
                .get_or_insert_with(&key, |id| {
                    Ok(DexArtifact {
                        id,
                        key: key.clone(),
                        node,
                        source: ArtifactSource::Unit {
                            target: target.to_string(),
                        },
                        module,
                        weight,
                        weight_factor: 1,
                    })
                })
                .unwrap()
        }

        fn group(&self, module: &str, index: Option<u32>, artifacts: Vec<ArtifactId>) -> DexGroup {
            DexGroup {
                module: self.modules.find(module).unwrap(),
                index,
                name: String::new(),
                artifacts,
                resource_code: false,
            }
        }
    }

    #[test]
    fn test_container_paths() {
        assert_eq!(
            container_path("dex", true, Some(1), 2, ".dex.jar"),
            "assets/secondary-program-dex-jars/secondary-1_2.dex.jar"
        );
        assert_eq!(
            container_path("dex", true, None, 1, ".dex"),
            "assets/secondary-program-dex-jars/secondary-1.dex"
        );
        assert_eq!(
            container_path("video", false, Some(2), 1, ".dex.jar.xzs"),
            "assets/video/video-2_1.dex.jar.xzs"
        );
    }

    #[test]
    fn test_pack_by_weight_respects_limit() {
        let mut f = Fixture::new();
        let a = f.unit("//a", "dex", 4);
        let b = f.unit("//b", "dex", 4);
        let c = f.unit("//c", "dex", 20);
        let d = f.unit("//d", "dex", 1);
        let packed = pack_by_weight(&f.registry, &[a, b, c, d], 10);
        assert_eq!(packed, vec![vec![a, b], vec![c], vec![d]]);
    }

    #[test]
    fn test_minimize_primary_keeps_only_forced() {
        let mut f = Fixture::new();
        let core = f.unit("//app/core:core", "dex", 5);
        let other = f.unit("//lib:other", "dex", 5);
        let video = f.unit("//video:video", "video", 5);
        let policy = DexPolicy {
            split_enabled: true,
            strategy: DexStrategy::MinimizePrimary,
            store: DexStore::Jar,
            ..DexPolicy::default()
        }
        .with_primary_dex_patterns(vec!["//app/**".into()])
        .unwrap();
        let groups = vec![
            f.group("dex", Some(1), vec![core, other]),
            f.group("video", Some(1), vec![video]),
        ];

        let primary = primary_set(&f.modules, &policy, &f.registry, &groups, 0);
        let result = layout_split(&f.modules, &policy, &f.registry, &groups, &primary);
        let root = result.module("dex").unwrap();
        assert_eq!(root.outputs[0].path, "classes.dex");
        assert_eq!(root.outputs[0].artifacts, vec!["//app/core:core"]);
        assert_eq!(
            root.outputs[1].path,
            "assets/secondary-program-dex-jars/secondary-1_1.dex.jar"
        );
        assert_eq!(root.outputs[1].artifacts, vec!["//lib:other"]);
        let video_outputs = &result.module("video").unwrap().outputs;
        assert_eq!(video_outputs[0].path, "assets/video/video-1_1.dex.jar");
    }

    #[test]
    fn test_maximize_primary_fills_budget() {
        let mut f = Fixture::new();
        let a = f.unit("//a", "dex", 40);
        let b = f.unit("//b", "dex", 40);
        let c = f.unit("//c", "dex", 40);
        let policy = DexPolicy {
            split_enabled: true,
            linear_alloc_hard_limit: 100,
            ..DexPolicy::default()
        };
        let groups = vec![f.group("dex", None, vec![a, b, c])];

        let primary = primary_set(&f.modules, &policy, &f.registry, &groups, 0);
        let result = layout_split(&f.modules, &policy, &f.registry, &groups, &primary);
        let root = result.module("dex").unwrap();
        assert_eq!(root.outputs[0].artifacts, vec!["//a", "//b"]);
        assert_eq!(root.outputs[0].weight, 80);
        assert_eq!(root.outputs[1].artifacts, vec!["//c"]);
        assert_eq!(
            root.outputs[1].path,
            "assets/secondary-program-dex-jars/secondary-1.dex"
        );
    }

    #[test]
    fn test_reserved_weight_shrinks_fill() {
        let mut f = Fixture::new();
        let a = f.unit("//a", "dex", 40);
        let b = f.unit("//b", "dex", 40);
        let policy = DexPolicy {
            split_enabled: true,
            linear_alloc_hard_limit: 100,
            ..DexPolicy::default()
        };
        let groups = vec![f.group("dex", Some(1), vec![a, b])];

        assert_eq!(primary_set(&f.modules, &policy, &f.registry, &groups, 0), vec![a, b]);
        assert_eq!(primary_set(&f.modules, &policy, &f.registry, &groups, 30), vec![a]);
    }

    #[test]
    fn test_single_layout() {
        let mut f = Fixture::new();
        let a = f.unit("//a", "dex", 2);
        let v = f.unit("//v", "video", 3);
        let result = layout_single(&f.registry, "dex", &[a, v]);
        let outputs: Vec<_> = result.outputs().collect();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].1.weight, 5);
    }

    #[test]
    fn test_non_predexed_layout_lists_directories() {
        let f = Fixture::new();
        let result = layout_non_predexed(&f.modules, true);
        let paths: Vec<&str> = result.outputs().map(|(_, o)| o.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["classes.dex", "assets/secondary-program-dex-jars", "assets/video"]
        );
        assert_eq!(layout_non_predexed(&f.modules, false).outputs().count(), 1);
    }
}
