//! Conversion of an app description into planner inputs

use tracing::debug;

use crate::config::app::AppConfig;
use crate::dex::{DexPolicy, DexStore, DexStrategy};
use crate::domain::{
    BuildConfigFields, CompiledUnit, ExcludedLibrary, ModuleGraph, ModuleId, ModuleSpec,
    PackageableCollection,
};
use crate::enhancer::{EnhancerOptions, ExopackageModes};
use crate::error::Result;

/// Validated inputs of one enhancement pass
#[derive(Debug, Clone)]
pub struct PlannerInputs {
    pub modules: ModuleGraph,
    pub collection: PackageableCollection,
    pub policy: DexPolicy,
    pub options: EnhancerOptions,
}

impl AppConfig {
    /// Validate the description and build the planner inputs
    ///
    /// # Errors
    ///
    /// Fails for invalid modules, references to undeclared modules, unknown
    /// exopackage modes, or primary dex patterns that are not valid globs.
    pub fn into_inputs(self) -> Result<PlannerInputs> {
        let modules = ModuleGraph::new(
            self.modules
                .into_iter()
                .map(|m| ModuleSpec {
                    name: m.name,
                    root: m.root,
                    deps: m.deps,
                })
                .collect(),
        )?;
        let module_of = |name: Option<&str>| -> Result<ModuleId> {
            name.map_or(Ok(modules.root()), |n| modules.find(n))
        };

        let mut collection = PackageableCollection::new();
        for unit in self.units {
            let mut compiled = CompiledUnit::new(unit.target, module_of(unit.module.as_deref())?, unit.output);
            compiled.weight_estimate = unit.weight.max(1);
            compiled.desugar_enabled = unit.desugar;
            compiled.interface_methods_desugar = unit.desugar_interface_methods;
            compiled.desugar_deps = unit.desugar_deps;
            collection.add_unit(compiled);
        }
        for entry in self.classpath_entries_to_dex {
            collection.add_classpath_entry(module_of(entry.module.as_deref())?, entry.path);
        }
        for excluded in self.excluded_from_dex {
            collection.add_excluded(ExcludedLibrary {
                target: excluded.target,
                immediate_classpath: excluded.classpath,
            });
        }
        collection.proguard_configs = self.proguard_configs;

        let resources = &mut collection.resources;
        resources.r_dot_java_dir = self.resources.r_dot_java_dir;
        resources.types = self.resources.types;
        resources.packages_to_exclude = self.resources.packages_to_exclude;
        resources.aapt_proguard_configs = self.resources.aapt_proguard_configs;
        for (name, types) in self.resources.module_types {
            resources.module_types.insert(modules.find(&name)?, types);
        }
        for (name, libs) in self.native.libraries {
            collection.native_libraries.insert(modules.find(&name)?, libs);
        }
        collection.build_configs = self
            .build_configs
            .into_iter()
            .map(|(pkg, fields)| (pkg, BuildConfigFields::from_fields(fields)))
            .collect();

        let exopackage_modes = ExopackageModes::from_names(self.exopackage_modes.as_slice())?;
        let dex = self.dex;
        let store = dex.dex_compression.unwrap_or(
            if exopackage_modes.contains(ExopackageModes::SECONDARY_DEX) {
                DexStore::Jar
            } else {
                DexStore::Raw
            },
        );
        let policy = DexPolicy {
            split_enabled: dex.use_split_dex,
            strategy: if dex.minimize_primary_dex_size {
                DexStrategy::MinimizePrimary
            } else {
                DexStrategy::MaximizePrimary
            },
            store,
            group_artifact_limit: dex.dex_group_lib_limit,
            weight_limit: dex
                .secondary_dex_weight_limit
                .unwrap_or(DexPolicy::DEFAULT_WEIGHT_LIMIT),
            linear_alloc_hard_limit: dex
                .linear_alloc_hard_limit
                .unwrap_or(DexPolicy::DEFAULT_LINEAR_ALLOC_HARD_LIMIT),
            method_ref_count_buffer_space: dex.method_ref_count_buffer_space,
            field_ref_count_buffer_space: dex.field_ref_count_buffer_space,
            allow_resource_code_in_secondary: dex.allow_r_dot_java_in_secondary_dex,
            ..DexPolicy::default()
        }
        .with_primary_dex_patterns(dex.primary_dex_patterns)?;

        let mut options = EnhancerOptions::new(self.name);
        options.package_type = self.package_type;
        options.binary_type = self.binary_type;
        options.exopackage_modes = exopackage_modes;
        options.trim_resource_ids = dex.trim_resource_ids;
        if let Some(factor) = dex.r_dot_java_weight_factor {
            options.r_dot_java_weight_factor = factor;
        }
        options.min_sdk = self.min_sdk_version;
        options.obfuscation = self.obfuscation;
        options.disable_pre_dex = dex.disable_pre_dex;
        options.ignore_aapt_proguard_config = self.resources.ignore_aapt_proguard_config;
        options.build_config_values = BuildConfigFields::from_fields(self.build_config_values);
        options.native_stub_bundle = self.native.exopackage_stub_bundle;

        debug!(
            app = %options.app_target,
            modules = modules.len(),
            units = collection.unit_count(),
            %store,
            "Loaded app description"
        );
        Ok(PlannerInputs {
            modules,
            collection,
            policy,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::dex::{DexStore, DexStrategy};
    use crate::error::DexGraphError;

    const APP: &str = r"
name: //apps/sample:app
min_sdk_version: 21
modules:
  - name: dex
    root: true
  - name: video
    deps: [dex]
units:
  - target: //lib:core
    output: out/core.jar
  - target: //video:player
    module: video
    output: out/player.jar
    weight: 0
excluded_from_dex:
  - target: //third_party:annotations
    classpath: [out/annotations.jar]
resources:
  types: [string]
  module_types:
    video: [raw]
dex:
  use_split_dex: true
  minimize_primary_dex_size: true
  r_dot_java_weight_factor: 4
exopackage_modes: [secondary_dex]
native:
  libraries:
    video: [libplayer.so]
";

    #[test]
    fn test_into_inputs() {
        let inputs = AppConfig::from_yaml(APP).unwrap().into_inputs().unwrap();
        let video = inputs.modules.find("video").unwrap();

        assert_eq!(inputs.collection.unit_count(), 2);
        let (_, player) = inputs.collection.units_to_dex().nth(1).unwrap();
        assert_eq!(player.module, video);
        assert_eq!(player.weight_estimate, 1);
        assert!(inputs.collection.is_excluded("//third_party:annotations"));
        assert_eq!(inputs.collection.resources.module_types[&video], vec!["raw"]);
        assert_eq!(inputs.collection.native_libraries[&video], vec!["libplayer.so"]);

        assert_eq!(inputs.policy.store, DexStore::Jar);
        assert_eq!(inputs.policy.strategy, DexStrategy::MinimizePrimary);
        assert_eq!(inputs.options.r_dot_java_weight_factor, 4);
        assert_eq!(inputs.options.min_sdk, Some(21));
    }

    #[test]
    fn test_store_defaults_to_raw() {
        let inputs = AppConfig::from_yaml("name: app\n")
            .unwrap()
            .into_inputs()
            .unwrap();
        assert_eq!(inputs.policy.store, DexStore::Raw);
        assert_eq!(inputs.modules.name(inputs.modules.root()), "dex");
    }

    #[test]
    fn test_unknown_module_reference() {
        let yaml = "name: app\nunits:\n  - target: //lib:a\n    module: camera\n";
        let err = AppConfig::from_yaml(yaml).unwrap().into_inputs().unwrap_err();
        assert!(matches!(err, DexGraphError::ModuleNotFound { .. }));
    }

    #[test]
    fn test_bad_primary_pattern() {
        let yaml = "name: app\ndex:\n  primary_dex_patterns: ['//lib/[']\n";
        let err = AppConfig::from_yaml(yaml).unwrap().into_inputs().unwrap_err();
        assert!(matches!(err, DexGraphError::InvalidPattern { .. }));
    }

    #[test]
    fn test_unknown_exopackage_mode() {
        let yaml = "name: app\nexopackage_modes: [everything]\n";
        let err = AppConfig::from_yaml(yaml).unwrap().into_inputs().unwrap_err();
        assert!(matches!(err, DexGraphError::ConfigInvalid { .. }));
    }
}
