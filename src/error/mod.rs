//! Error types and handling for dexgraph
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`config`]: App description and policy errors
//! - [`graph`]: Module graph and action graph errors
//! - [`dex`]: Internal-consistency errors raised while planning dex merges
//! - [`fs`]: File system errors

pub mod config;
pub mod dex;
pub mod fs;
pub mod graph;

pub use config::{
    invalid as config_invalid, parse_failed as config_parse_failed,
    read_failed as config_read_failed,
};
pub use dex::{excluded_unit, group_index_collision, missing_platform_resource};
pub use fs::{not_found as file_not_found, read_failed as file_read_failed};
pub use graph::{circular as circular_dependency, module_not_found};

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for dexgraph operations
#[derive(Error, Diagnostic, Debug)]
pub enum DexGraphError {
    // Configuration errors
    #[error("Failed to read app description: {path}")]
    #[diagnostic(code(dexgraph::config::read_failed))]
    ConfigReadFailed { path: String, reason: String },

    #[error("Failed to parse app description {path}: {reason}")]
    #[diagnostic(
        code(dexgraph::config::parse_failed),
        help("Check the YAML syntax and that every key is a recognized option")
    )]
    ConfigParseFailed { path: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(dexgraph::config::invalid))]
    ConfigInvalid { message: String },

    #[error("Invalid primary dex pattern '{pattern}': {reason}")]
    #[diagnostic(
        code(dexgraph::config::invalid_pattern),
        help("Primary dex patterns are globs matched against unit targets, e.g. '//app/core/**'")
    )]
    InvalidPattern { pattern: String, reason: String },

    #[error("Required platform resource '{resource}' is not configured")]
    #[diagnostic(
        code(dexgraph::config::missing_platform_resource),
        help("{requirement}")
    )]
    MissingPlatformResource {
        resource: String,
        requirement: String,
    },

    // Module graph errors
    #[error("Module not found: {name}")]
    #[diagnostic(code(dexgraph::graph::module_not_found))]
    ModuleNotFound { name: String },

    #[error("Module declared more than once: {name}")]
    #[diagnostic(code(dexgraph::graph::duplicate_module))]
    DuplicateModule { name: String },

    #[error("Expected exactly one root module, found {count}")]
    #[diagnostic(
        code(dexgraph::graph::root_module),
        help("Mark exactly one module with `root: true`, or omit `modules` to use the default root")
    )]
    RootModule { count: usize },

    #[error("Circular dependency detected: {chain}")]
    #[diagnostic(
        code(dexgraph::graph::circular),
        help("Remove the cycle from the module dependency declarations")
    )]
    CircularDependency { chain: String },

    // Action graph errors
    #[error("Action '{key}' was registered twice")]
    #[diagnostic(code(dexgraph::graph::duplicate_action))]
    DuplicateAction { key: String },

    #[error("Action node {index} does not exist")]
    #[diagnostic(code(dexgraph::graph::unknown_node))]
    UnknownNode { index: usize },

    // Dex planning errors
    #[error("Library '{target}' is excluded from dex but was passed to per-unit dexing")]
    #[diagnostic(
        code(dexgraph::dex::excluded_unit),
        help("The packageable collection must drop excluded libraries before dexing")
    )]
    ExcludedUnitInDexInput { target: String },

    #[error("Dex group index {index} of module '{module}' collides with reserved index {reserved}")]
    #[diagnostic(code(dexgraph::dex::group_index_collision))]
    GroupIndexCollision {
        module: String,
        index: u32,
        reserved: u32,
    },

    // File system errors
    #[error("File not found: {path}")]
    #[diagnostic(code(dexgraph::fs::not_found))]
    FileNotFound { path: String },

    #[error("Failed to read file: {path}")]
    #[diagnostic(code(dexgraph::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}")]
    #[diagnostic(code(dexgraph::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("Manifest does not match outputs: {message}")]
    #[diagnostic(
        code(dexgraph::fs::manifest_mismatch),
        help("Rebuild the dex outputs or regenerate the manifest")
    )]
    ManifestMismatch { message: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(dexgraph::fs::io_error))]
    IoError { message: String },
}

impl From<std::io::Error> for DexGraphError {
    fn from(err: std::io::Error) -> Self {
        DexGraphError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for DexGraphError {
    fn from(err: serde_yaml::Error) -> Self {
        DexGraphError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for DexGraphError {
    fn from(err: serde_json::Error) -> Self {
        DexGraphError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, DexGraphError>;
