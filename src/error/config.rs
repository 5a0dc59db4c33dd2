//! Configuration errors

use super::DexGraphError;

/// Creates a config parse failed error
pub fn parse_failed(path: impl Into<String>, reason: impl Into<String>) -> DexGraphError {
    DexGraphError::ConfigParseFailed {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates an invalid config error
pub fn invalid(message: impl Into<String>) -> DexGraphError {
    DexGraphError::ConfigInvalid {
        message: message.into(),
    }
}

/// Creates a config read failed error
pub fn read_failed(path: impl Into<String>, reason: impl Into<String>) -> DexGraphError {
    DexGraphError::ConfigReadFailed {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates an invalid pattern error
pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> DexGraphError {
    DexGraphError::InvalidPattern {
        pattern: pattern.into(),
        reason: reason.into(),
    }
}
