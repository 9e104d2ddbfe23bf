//! Store error types.

use std::path::PathBuf;

/// Errors that can occur while resolving, hashing, or caching packages.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A hash algorithm outside the supported set was requested.
    #[error("unsupported hash algorithm: '{name}' (expected SHA256 or SHA512)")]
    UnsupportedHashAlgorithm { name: String },

    /// Package id or version is empty or blank.
    #[error("invalid package key: {detail}")]
    InvalidPackageKey { detail: String },

    /// A hash sidecar file does not contain a base64 digest.
    #[error("malformed hash file {path}: {detail}")]
    MalformedSidecar { path: PathBuf, detail: String },

    /// Cache I/O error.
    #[error("cache error at {path}: {detail}")]
    CacheError { path: PathBuf, detail: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
