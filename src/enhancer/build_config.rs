//! Build config synthesis
//!
//! Every `BuildConfig` fragment in the collection becomes one generated
//! library owned by the root module. Its fields are layered, later layers
//! winning: fragment fields, app-level values, then the package constants.
//! Instrumented packages get none, since the package under test already
//! carries its `BuildConfig` classes.

use tracing::debug;

use crate::dex::predex::append_flavors;
use crate::domain::{BuildConfigField, BuildConfigFields, CompiledUnit, ModuleId, PackageableCollection};
use crate::enhancer::options::{EnhancerOptions, ExopackageModes, PackageType};
use crate::error::Result;
use crate::graph::{Action, ActionGraph, NodeId, output_path};

pub const DEBUG_CONSTANT: &str = "DEBUG";
pub const IS_EXOPACKAGE_CONSTANT: &str = "IS_EXOPACKAGE";
pub const EXOPACKAGE_FLAGS_CONSTANT: &str = "EXOPACKAGE_FLAGS";

/// A generated build config library
#[derive(Debug, Clone)]
pub struct BuildConfigUnit {
    pub java_package: String,
    pub node: NodeId,
    pub unit: CompiledUnit,
}

/// Constants that always override user values
pub fn constants(package_type: PackageType, modes: ExopackageModes) -> BuildConfigFields {
    BuildConfigFields::from_fields([
        BuildConfigField::new(
            "boolean",
            DEBUG_CONSTANT,
            (package_type != PackageType::Release).to_string(),
        ),
        BuildConfigField::new("boolean", IS_EXOPACKAGE_CONSTANT, (!modes.is_empty()).to_string()),
        BuildConfigField::new("int", EXOPACKAGE_FLAGS_CONSTANT, modes.bitmask().to_string()),
    ])
}

/// Flavor naming the build config of one Java package
pub fn flavor(java_package: &str) -> String {
    format!("buildconfig_{}", java_package.replace('.', "_"))
}

/// Register one build config node per fragment, in package order
///
/// # Errors
///
/// Fails on duplicate node keys.
pub fn add_build_config_units(
    graph: &mut ActionGraph,
    options: &EnhancerOptions,
    root: ModuleId,
    collection: &PackageableCollection,
) -> Result<Vec<BuildConfigUnit>> {
    if options.package_type == PackageType::Instrumented {
        debug!("Skipping build configs for instrumented package");
        return Ok(Vec::new());
    }

    let constants = constants(options.package_type, options.exopackage_modes);
    let mut units = Vec::with_capacity(collection.build_configs.len());
    for (java_package, fields) in &collection.build_configs {
        let total = BuildConfigFields::default()
            .put_all(fields)
            .put_all(&options.build_config_values)
            .put_all(&constants);

        let key = append_flavors(&options.app_target, &[&flavor(java_package)]);
        let output = output_path(&key, "lib.jar");
        let node = graph.add(
            key.clone(),
            Action::BuildConfig {
                java_package: java_package.clone(),
                fields: total,
            },
            Vec::new(),
        )?;
        units.push(BuildConfigUnit {
            java_package: java_package.clone(),
            node,
            unit: CompiledUnit::new(key, root, Some(output)),
        });
    }
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> PackageableCollection {
        let mut collection = PackageableCollection::new();
        collection.build_configs.insert(
            "com.example.app".into(),
            BuildConfigFields::from_fields([
                BuildConfigField::new("boolean", "DEBUG", "false"),
                BuildConfigField::new("String", "FLAVOR", "\"free\""),
                BuildConfigField::new("int", "LEVEL", "1"),
            ]),
        );
        collection
    }

    fn fields_of(graph: &ActionGraph, node: NodeId) -> BuildConfigFields {
        match &graph.node(node).action {
            Action::BuildConfig { fields, .. } => fields.clone(),
            other => panic!("Expected BuildConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_constants_override_values() {
        let mut graph = ActionGraph::new();
        let mut options = EnhancerOptions::new("//apps/sample:app");
        options.package_type = PackageType::Release;
        options.exopackage_modes = ExopackageModes::SECONDARY_DEX | ExopackageModes::MODULES;
        options.build_config_values = BuildConfigFields::from_fields([
            BuildConfigField::new("int", "LEVEL", "2"),
            BuildConfigField::new("boolean", "DEBUG", "true"),
        ]);

        let units = add_build_config_units(&mut graph, &options, ModuleId(0), &collection()).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(
            units[0].unit.target,
            "//apps/sample:app#buildconfig_com_example_app"
        );

        let fields = fields_of(&graph, units[0].node);
        assert_eq!(fields.get("DEBUG").unwrap().value, "false");
        assert_eq!(fields.get("LEVEL").unwrap().value, "2");
        assert_eq!(fields.get("FLAVOR").unwrap().value, "\"free\"");
        assert_eq!(fields.get("IS_EXOPACKAGE").unwrap().value, "true");
        assert_eq!(fields.get("EXOPACKAGE_FLAGS").unwrap().value, "9");
    }

    #[test]
    fn test_instrumented_has_no_build_configs() {
        let mut graph = ActionGraph::new();
        let mut options = EnhancerOptions::new("//apps/sample:app");
        options.package_type = PackageType::Instrumented;
        let units = add_build_config_units(&mut graph, &options, ModuleId(0), &collection()).unwrap();
        assert!(units.is_empty());
        assert!(graph.is_empty());
    }

    #[test]
    fn test_debug_constant_for_debug_package() {
        let fields = constants(PackageType::Debug, ExopackageModes::empty());
        assert_eq!(fields.get("DEBUG").unwrap().value, "true");
        assert_eq!(fields.get("IS_EXOPACKAGE").unwrap().value, "false");
        assert_eq!(fields.get("EXOPACKAGE_FLAGS").unwrap().value, "0");
    }
}
