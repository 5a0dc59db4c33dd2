//! Dex planning errors
//!
//! These signal violated upstream invariants or missing platform inputs and
//! always abort the enhancement pass.

use super::DexGraphError;

/// Creates an error for an excluded library that reached per-unit dexing
pub fn excluded_unit(target: impl Into<String>) -> DexGraphError {
    DexGraphError::ExcludedUnitInDexInput {
        target: target.into(),
    }
}

/// Creates a dex group index collision error
pub fn group_index_collision(module: impl Into<String>, index: u32, reserved: u32) -> DexGraphError {
    DexGraphError::GroupIndexCollision {
        module: module.into(),
        index,
        reserved,
    }
}

/// Creates a missing platform resource error
///
/// `requirement` should name the flag or mode that made the resource necessary.
pub fn missing_platform_resource(
    resource: impl Into<String>,
    requirement: impl Into<String>,
) -> DexGraphError {
    DexGraphError::MissingPlatformResource {
        resource: resource.into(),
        requirement: requirement.into(),
    }
}
