//! Generated resource code
//!
//! The app-wide resource accessor classes are trimmed, compiled once, split
//! into shards by resource type and dexed shard by shard:
//!
//! ```text
//! trim_uber_r_dot_java -> compile_uber_r_dot_java -> split_uber_r_dot_java_jar
//!     -> prebuilt_jar,rtype_<shard> -> dexing,rtype_<shard>,d8
//! ```
//!
//! Accessor classes declare many constant fields for very little code, so
//! shards placed in secondary dexes have their weight scaled by a factor.

use tracing::debug;

use crate::dex::policy::DexPolicy;
use crate::dex::predex::{
    ArtifactId, ArtifactSource, DexArtifact, DexArtifactRegistry, append_flavors, d8_key,
};
use crate::domain::{ModuleGraph, ModuleId, ResourceInputs};
use crate::error::Result;
use crate::graph::{Action, ActionGraph, NodeId, output_path};

/// Shard holding the accessors that must stay in the primary dex
pub const PRIMARY_DEX_SHARD: &str = "_primarydex";
/// Shard used when no resource type is declared
pub const OTHER_SHARD: &str = "_other";
/// Only shard of a non-split build
pub const ALL_SHARD: &str = "all";

/// One split jar of the compiled resource code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCodeShard {
    pub name: String,
    pub module: ModuleId,
}

impl ResourceCodeShard {
    pub fn is_primary(&self) -> bool {
        self.name == PRIMARY_DEX_SHARD
    }
}

/// Decide the shards of the compiled resource jar
///
/// Split builds get `_primarydex` when primary dex patterns exist, then one
/// shard per declared type (sorted), then one per module-owned type. When
/// resource code may not live in secondary dexes every shard is owned by
/// the root module.
pub fn plan_shards(
    resources: &ResourceInputs,
    modules: &ModuleGraph,
    policy: &DexPolicy,
    split: bool,
) -> Vec<ResourceCodeShard> {
    let root = modules.root();
    if !split {
        return vec![ResourceCodeShard {
            name: ALL_SHARD.to_string(),
            module: root,
        }];
    }

    let owner = |module: ModuleId| {
        if policy.allow_resource_code_in_secondary {
            module
        } else {
            root
        }
    };

    let mut shards = Vec::new();
    if !policy.primary_dex_patterns().is_empty() {
        shards.push(ResourceCodeShard {
            name: PRIMARY_DEX_SHARD.to_string(),
            module: root,
        });
    }
    let mut root_types = resources.types.clone();
    if let Some(types) = resources.module_types.get(&root) {
        debug!(module = modules.name(root), types = types.len(), "Folding root module resource types");
        root_types.extend(types.iter().cloned());
    }
    for rtype in sorted_unique(&root_types) {
        shards.push(ResourceCodeShard {
            name: rtype,
            module: root,
        });
    }
    for (module, types) in &resources.module_types {
        if *module == root {
            continue;
        }
        for rtype in sorted_unique(types) {
            shards.push(ResourceCodeShard {
                name: format!("{}_{rtype}", modules.name(*module)),
                module: owner(*module),
            });
        }
    }
    if shards.is_empty() {
        shards.push(ResourceCodeShard {
            name: OTHER_SHARD.to_string(),
            module: root,
        });
    }
    shards
}

fn sorted_unique(values: &[String]) -> Vec<String> {
    let mut values = values.to_vec();
    values.sort();
    values.dedup();
    values
}

/// Class-removal pattern for the `R` classes of one Java package
pub fn exclusion_pattern(package: &str) -> String {
    format!("^{}[.]R([$].*)?$", package.replace('.', "[.]"))
}

/// Nodes and artifacts produced for the resource code
#[derive(Debug, Clone)]
pub struct ResourceCodeChain {
    pub trim: NodeId,
    pub compile: NodeId,
    /// Jar produced by the compile step
    pub compiled_output: String,
    pub split: Option<NodeId>,
    pub artifacts: Vec<ArtifactId>,
}

pub struct ResourceCodeBuilder<'a> {
    pub app_target: &'a str,
    pub resources: &'a ResourceInputs,
    pub policy: &'a DexPolicy,
    pub trim_resource_ids: bool,
    pub weight_factor: u64,
    pub min_sdk: Option<u32>,
}

impl ResourceCodeBuilder<'_> {
    /// Weight factor of one shard
    pub fn shard_weight_factor(&self, shard: &ResourceCodeShard) -> u64 {
        if !self.policy.allow_resource_code_in_secondary || shard.is_primary() {
            1
        } else {
            self.weight_factor.max(1)
        }
    }

    /// Weight the shards will claim in `classes.dex` once dexed
    ///
    /// Lets the primary dex be planned before the shards exist.
    pub fn primary_reserve(&self, modules: &ModuleGraph, shards: &[ResourceCodeShard]) -> u64 {
        shards
            .iter()
            .filter(|s| modules.is_root(s.module))
            .filter(|s| s.is_primary() || !self.policy.allow_resource_code_in_secondary)
            .map(|s| self.shard_weight_factor(s))
            .sum()
    }

    /// Register the trim and compile steps
    ///
    /// `users` are the nodes whose resource references drive trimming; they
    /// become dependencies only when trimming is enabled.
    ///
    /// # Errors
    ///
    /// Fails if the nodes were already registered in this graph.
    pub fn trim_and_compile(
        &self,
        graph: &mut ActionGraph,
        users: &[NodeId],
    ) -> Result<ResourceCodeChain> {
        let trim_deps = if self.trim_resource_ids {
            users.to_vec()
        } else {
            Vec::new()
        };
        let trim = graph.add(
            append_flavors(self.app_target, &["trim_uber_r_dot_java"]),
            Action::TrimResourceCode {
                r_dot_java_dir: self.resources.r_dot_java_dir.clone(),
                filter_by_users: self.trim_resource_ids,
            },
            trim_deps,
        )?;

        let compile_key = append_flavors(self.app_target, &["compile_uber_r_dot_java"]);
        let compiled_output = output_path(&compile_key, "uber_r_dot_java.jar");
        let compile = graph.add(
            compile_key,
            Action::CompileResourceCode {
                classes_to_remove: self
                    .resources
                    .packages_to_exclude
                    .iter()
                    .map(|pkg| exclusion_pattern(pkg))
                    .collect(),
            },
            vec![trim],
        )?;

        Ok(ResourceCodeChain {
            trim,
            compile,
            compiled_output,
            split: None,
            artifacts: Vec::new(),
        })
    }

    /// Register the full chain and dex every shard
    ///
    /// # Errors
    ///
    /// Fails on duplicate registration.
    pub fn build(
        &self,
        graph: &mut ActionGraph,
        registry: &mut DexArtifactRegistry,
        users: &[NodeId],
        shards: &[ResourceCodeShard],
    ) -> Result<ResourceCodeChain> {
        let mut chain = self.trim_and_compile(graph, users)?;

        let split_key = append_flavors(self.app_target, &["split_uber_r_dot_java_jar"]);
        let split = graph.add(
            split_key.clone(),
            Action::SplitResourceCode {
                shards: shards.iter().map(|s| s.name.clone()).collect(),
            },
            vec![chain.compile],
        )?;
        chain.split = Some(split);

        for shard in shards {
            let rtype_flavor = format!("rtype_{}", shard.name);
            let prebuilt = graph.add(
                append_flavors(&split_key, &["prebuilt_jar", &rtype_flavor]),
                Action::PrebuiltJar {
                    shard: shard.name.clone(),
                },
                vec![split],
            )?;

            let weight_factor = self.shard_weight_factor(shard);
            debug!(shard = %shard.name, weight_factor, "Weighting resource code shard");

            let dex_key = d8_key(
                &append_flavors(&split_key, &["dexing", &rtype_flavor]),
                self.min_sdk,
            );
            let input = output_path(&split_key, &format!("{}.jar", shard.name));
            let node = graph.add(
                dex_key.clone(),
                Action::Dex {
                    input,
                    weight_factor,
                    desugar_deps: Vec::new(),
                    min_sdk: self.min_sdk,
                },
                vec![prebuilt],
            )?;
            let id = registry.get_or_insert_with(&dex_key, |id| {
                Ok(DexArtifact {
                    id,
                    key: dex_key.clone(),
                    node,
                    source: ArtifactSource::ResourceShard {
                        rtype: shard.name.clone(),
                    },
                    module: shard.module,
                    weight: weight_factor,
                    weight_factor,
                })
            })?;
            chain.artifacts.push(id);
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModuleSpec;

    fn modules() -> ModuleGraph {
        ModuleGraph::new(vec![
            ModuleSpec::new("dex").root(),
            ModuleSpec::new("video").depends_on("dex"),
        ])
        .unwrap()
    }

    fn resources(modules: &ModuleGraph) -> ResourceInputs {
        let mut inputs = ResourceInputs {
            types: vec!["string".into(), "id".into(), "string".into()],
            packages_to_exclude: vec!["com.example.lib".into()],
            ..ResourceInputs::default()
        };
        inputs
            .module_types
            .insert(modules.find("video").unwrap(), vec!["raw".into()]);
        inputs
    }

    #[test]
    fn test_exclusion_pattern() {
        assert_eq!(
            exclusion_pattern("com.example.lib"),
            "^com[.]example[.]lib[.]R([$].*)?$"
        );
    }

    #[test]
    fn test_plan_shards_split() {
        let modules = modules();
        let policy = DexPolicy {
            allow_resource_code_in_secondary: true,
            ..DexPolicy::default()
        }
        .with_primary_dex_patterns(vec!["//app/**".into()])
        .unwrap();
        let shards = plan_shards(&resources(&modules), &modules, &policy, true);
        let names: Vec<&str> = shards.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["_primarydex", "id", "string", "video_raw"]);
        assert_eq!(shards[3].module, modules.find("video").unwrap());
    }

    #[test]
    fn test_plan_shards_folds_into_root_without_secondary_placement() {
        let modules = modules();
        let shards = plan_shards(&resources(&modules), &modules, &DexPolicy::default(), true);
        assert!(shards.iter().all(|s| s.module == modules.root()));
    }

    #[test]
    fn test_plan_shards_folds_root_module_types() {
        let modules = modules();
        let mut inputs = ResourceInputs {
            types: vec!["string".into()],
            ..ResourceInputs::default()
        };
        inputs
            .module_types
            .insert(modules.root(), vec!["layout".into(), "string".into()]);
        let shards = plan_shards(&inputs, &modules, &DexPolicy::default(), true);
        let names: Vec<&str> = shards.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["layout", "string"]);
    }

    #[test]
    fn test_primary_reserve_counts_root_forced_shards() {
        let modules = modules();
        let resources = resources(&modules);
        let shared = DexPolicy::default();
        let builder = ResourceCodeBuilder {
            app_target: "//app:app",
            resources: &resources,
            policy: &shared,
            trim_resource_ids: false,
            weight_factor: 10,
            min_sdk: None,
        };
        let shards = plan_shards(&resources, &modules, &shared, true);
        assert_eq!(builder.primary_reserve(&modules, &shards), 3);

        let spread = DexPolicy {
            allow_resource_code_in_secondary: true,
            ..DexPolicy::default()
        }
        .with_primary_dex_patterns(vec!["//app/**".into()])
        .unwrap();
        let builder = ResourceCodeBuilder {
            policy: &spread,
            ..builder
        };
        let shards = plan_shards(&resources, &modules, &spread, true);
        assert_eq!(builder.primary_reserve(&modules, &shards), 1);
    }

    #[test]
    fn test_plan_shards_other_and_all() {
        let modules = modules();
        let empty = ResourceInputs::default();
        let split = plan_shards(&empty, &modules, &DexPolicy::default(), true);
        assert_eq!(split[0].name, OTHER_SHARD);
        let single = plan_shards(&resources(&modules), &modules, &DexPolicy::default(), false);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].name, ALL_SHARD);
    }

    #[test]
    fn test_weight_factor_rules() {
        let resources = ResourceInputs::default();
        let mut policy = DexPolicy {
            allow_resource_code_in_secondary: true,
            ..DexPolicy::default()
        };
        let shard = |name: &str| ResourceCodeShard {
            name: name.to_string(),
            module: ModuleId(0),
        };
        {
            let builder = ResourceCodeBuilder {
                app_target: "//app:app",
                resources: &resources,
                policy: &policy,
                trim_resource_ids: false,
                weight_factor: 10,
                min_sdk: None,
            };
            assert_eq!(builder.shard_weight_factor(&shard("string")), 10);
            assert_eq!(builder.shard_weight_factor(&shard(PRIMARY_DEX_SHARD)), 1);
        }
        policy.allow_resource_code_in_secondary = false;
        let builder = ResourceCodeBuilder {
            app_target: "//app:app",
            resources: &resources,
            policy: &policy,
            trim_resource_ids: false,
            weight_factor: 10,
            min_sdk: None,
        };
        assert_eq!(builder.shard_weight_factor(&shard("string")), 1);
    }

    #[test]
    fn test_chain_nodes_and_trim_dependencies() {
        let modules = modules();
        let resources = resources(&modules);
        let policy = DexPolicy::default();
        let mut graph = ActionGraph::new();
        let mut registry = DexArtifactRegistry::new();
        let user = graph.add("//lib:a#d8", Action::ProguardTextOutput, vec![]).unwrap();

        let builder = ResourceCodeBuilder {
            app_target: "//app:app",
            resources: &resources,
            policy: &policy,
            trim_resource_ids: true,
            weight_factor: 10,
            min_sdk: Some(21),
        };
        let shards = plan_shards(&resources, &modules, &policy, true);
        let chain = builder
            .build(&mut graph, &mut registry, &[user], &shards)
            .unwrap();

        assert_eq!(graph.dep_keys(chain.trim), vec!["//lib:a#d8"]);
        assert!(graph.contains("//app:app#compile_uber_r_dot_java"));
        assert!(graph.contains("//app:app#split_uber_r_dot_java_jar,prebuilt_jar,rtype_string"));
        assert!(graph.contains("//app:app#split_uber_r_dot_java_jar,dexing,rtype_string,d8,min-api-21"));
        assert_eq!(chain.artifacts.len(), shards.len());
        assert!(registry.artifact(chain.artifacts[0]).is_resource_code());
        match &graph.node(chain.compile).action {
            Action::CompileResourceCode { classes_to_remove } => {
                assert_eq!(classes_to_remove.len(), 1);
            }
            other => panic!("Expected compile action, got {other:?}"),
        }
    }

    #[test]
    fn test_trim_without_users_when_disabled() {
        let resources = ResourceInputs::default();
        let policy = DexPolicy::default();
        let mut graph = ActionGraph::new();
        let user = graph.add("//lib:a#d8", Action::ProguardTextOutput, vec![]).unwrap();
        let builder = ResourceCodeBuilder {
            app_target: "//app:app",
            resources: &resources,
            policy: &policy,
            trim_resource_ids: false,
            weight_factor: 10,
            min_sdk: None,
        };
        let chain = builder.trim_and_compile(&mut graph, &[user]).unwrap();
        assert!(graph.dep_keys(chain.trim).is_empty());
        assert_eq!(
            chain.compiled_output,
            "gen/app:app#compile_uber_r_dot_java/uber_r_dot_java.jar"
        );
    }
}
