//! Packaging layout
//!
//! Where each module's dex and native-library outputs go inside the final
//! package. Feature modules of an AAB keep their native libraries under
//! their own module directory; everything else lands in the base package.

use serde::Serialize;
use tracing::debug;

use crate::dex::layout::secondary_dex_dir;
use crate::domain::{ModuleGraph, PackageableCollection};
use crate::enhancer::options::{BinaryType, EnhancerOptions, ExopackageModes};
use crate::error::{Result, missing_platform_resource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModulePackaging {
    pub module: String,
    pub is_root: bool,
    pub dex_dir: String,
    pub native_library_dir: String,
    /// Listing of the native libraries stored as assets
    pub native_library_listing: String,
    /// Packaged inside an AAB feature rather than the base package
    pub in_bundle: bool,
    pub native_libraries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagePlan {
    pub binary_type: BinaryType,
    pub modules: Vec<ModulePackaging>,
    /// Extra archives merged into the package
    pub zip_inputs: Vec<String>,
}

impl PackagePlan {
    /// Plan the package layout of every module
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DexGraphError::MissingPlatformResource`] when
    /// native-library exopackage without 64-bit support has no stub bundle.
    pub fn build(
        modules: &ModuleGraph,
        collection: &PackageableCollection,
        options: &EnhancerOptions,
    ) -> Result<Self> {
        let mut zip_inputs = Vec::new();
        if needs_native_stub(options.exopackage_modes) {
            let stub = options.native_stub_bundle.as_ref().ok_or_else(|| {
                missing_platform_resource(
                    "native exopackage stub bundle",
                    "exopackage mode 'native_library' without 'arch64' needs \
                     `native.exopackage_stub_bundle` so the app runs as 32-bit",
                )
            })?;
            zip_inputs.push(stub.clone());
        }

        let plans = modules
            .ids()
            .map(|id| {
                let name = modules.name(id);
                let is_root = modules.is_root(id);
                let in_bundle = !(is_root || options.binary_type == BinaryType::Apk);
                let lib_dir = format!("assets/{}", if is_root { "lib" } else { name });
                let native_library_dir = if in_bundle {
                    format!("{name}/{lib_dir}")
                } else {
                    lib_dir
                };
                let listing = if is_root { "metadata.txt" } else { "libs.txt" };
                ModulePackaging {
                    module: name.to_string(),
                    is_root,
                    dex_dir: secondary_dex_dir(name, is_root),
                    native_library_listing: format!("{native_library_dir}/{listing}"),
                    native_library_dir,
                    in_bundle,
                    native_libraries: collection
                        .native_libraries
                        .get(&id)
                        .cloned()
                        .unwrap_or_default(),
                }
            })
            .collect();
        debug!(modules = modules.len(), "Planned package layout");

        Ok(Self {
            binary_type: options.binary_type,
            modules: plans,
            zip_inputs,
        })
    }

    pub fn module(&self, name: &str) -> Option<&ModulePackaging> {
        self.modules.iter().find(|m| m.module == name)
    }
}

/// Native exopackage on 32-bit needs dummy libraries in the package
pub fn needs_native_stub(modes: ExopackageModes) -> bool {
    modes.contains(ExopackageModes::NATIVE_LIBRARY) && !modes.contains(ExopackageModes::ARCH64)
}
