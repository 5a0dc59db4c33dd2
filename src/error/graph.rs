//! Module graph and action graph errors

use super::DexGraphError;

/// Creates a circular dependency error
pub fn circular(chain: impl Into<String>) -> DexGraphError {
    DexGraphError::CircularDependency {
        chain: chain.into(),
    }
}

/// Creates a module not found error
pub fn module_not_found(name: impl Into<String>) -> DexGraphError {
    DexGraphError::ModuleNotFound { name: name.into() }
}

/// Creates a duplicate action error
pub fn duplicate_action(key: impl Into<String>) -> DexGraphError {
    DexGraphError::DuplicateAction { key: key.into() }
}
