//! File system errors

use super::DexGraphError;

/// Creates a file not found error
pub fn not_found(path: impl Into<String>) -> DexGraphError {
    DexGraphError::FileNotFound { path: path.into() }
}

/// Creates a file read failed error
pub fn read_failed(path: impl Into<String>, reason: impl Into<String>) -> DexGraphError {
    DexGraphError::FileReadFailed {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates a file write failed error
pub fn write_failed(path: impl Into<String>, reason: impl Into<String>) -> DexGraphError {
    DexGraphError::FileWriteFailed {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates a manifest mismatch error
pub fn manifest_mismatch(message: impl Into<String>) -> DexGraphError {
    DexGraphError::ManifestMismatch {
        message: message.into(),
    }
}
