//! App-level options of an enhancement pass

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::dex::Obfuscation;
use crate::domain::BuildConfigFields;
use crate::error::{Result, config_invalid};

/// Default scale applied to resource code placed in secondary dexes
pub const DEFAULT_R_DOT_JAVA_WEIGHT_FACTOR: u64 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    #[default]
    Debug,
    Release,
    Instrumented,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryType {
    #[default]
    Apk,
    Aab,
}

bitflags! {
    /// Parts of the app installed incrementally instead of from the package
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ExopackageModes: u32 {
        const SECONDARY_DEX = 1;
        const NATIVE_LIBRARY = 2;
        const RESOURCES = 4;
        const MODULES = 8;
        const ARCH64 = 16;
    }
}

impl ExopackageModes {
    /// Parse lowercase mode names such as `secondary_dex`
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown name.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut modes = Self::empty();
        for name in names {
            let name = name.as_ref();
            let flag = Self::from_name(&name.to_ascii_uppercase())
                .ok_or_else(|| config_invalid(format!("unknown exopackage mode '{name}'")))?;
            modes |= flag;
        }
        Ok(modes)
    }

    /// Bitmask written into `BuildConfig.EXOPACKAGE_FLAGS`
    pub fn bitmask(self) -> u32 {
        self.bits()
    }
}

#[derive(Debug, Clone)]
pub struct EnhancerOptions {
    /// Target of the app, used as the prefix of every node key
    pub app_target: String,
    pub package_type: PackageType,
    pub binary_type: BinaryType,
    pub exopackage_modes: ExopackageModes,
    pub trim_resource_ids: bool,
    pub r_dot_java_weight_factor: u64,
    pub min_sdk: Option<u32>,
    pub obfuscation: Obfuscation,
    pub disable_pre_dex: bool,
    pub ignore_aapt_proguard_config: bool,
    /// App-level overrides applied to every build config
    pub build_config_values: BuildConfigFields,
    pub native_stub_bundle: Option<String>,
}

impl EnhancerOptions {
    pub fn new(app_target: impl Into<String>) -> Self {
        Self {
            app_target: app_target.into(),
            package_type: PackageType::default(),
            binary_type: BinaryType::default(),
            exopackage_modes: ExopackageModes::empty(),
            trim_resource_ids: false,
            r_dot_java_weight_factor: DEFAULT_R_DOT_JAVA_WEIGHT_FACTOR,
            min_sdk: None,
            obfuscation: Obfuscation::default(),
            disable_pre_dex: false,
            ignore_aapt_proguard_config: false,
            build_config_values: BuildConfigFields::default(),
            native_stub_bundle: None,
        }
    }
}
