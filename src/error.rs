//! Error types for scancache
//!
//! Cache internals return `CacheResult<T>`; everything above the cache
//! layer uses `ScanResult<T>`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Result type alias for scanner operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Failures raised by a cache and its backends
#[derive(Error, Debug)]
pub enum CacheError {
    // Recoverable: the caller recomputes
    #[error("No cached value for key {key}")]
    NoCachedValue { key: String },

    #[error("Invalid cached value: {reason}")]
    InvalidValue { reason: String },

    // Structural: the cache cannot provide its guarantees
    #[error("Failed to initialize cache directory at {path}: {source}")]
    DirectoryInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to purge cache directory at {path}: {source}")]
    Purge {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Persistence
    #[error("Failed to write cache entry {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize cache value: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Timed out after {waited:?} waiting for lock on {path}")]
    LockTimeout { path: PathBuf, waited: Duration },

    #[error("Lock operation failed on {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    /// Create a miss for the given key
    pub fn miss(key: impl Into<String>) -> Self {
        Self::NoCachedValue { key: key.into() }
    }

    /// Create an invalid value error
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            reason: reason.into(),
        }
    }

    /// Miss and invalid values are handled by recomputing
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoCachedValue { .. } | Self::InvalidValue { .. })
    }

    /// The cache instance can no longer be trusted
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::DirectoryInit { .. } | Self::Purge { .. })
    }
}

/// All errors that can occur in the scanner front end
#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Intelligence feed errors
    #[error("A license key is required to download signatures")]
    LicenseRequired,

    #[error("No signature source configured")]
    NoSignatureSource,

    #[error("Signature feed request to {url} failed: {reason}")]
    FeedRequest { url: String, reason: String },

    #[error("Malformed signature feed: {0}")]
    FeedMalformed(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    User(String),
}

impl ScanError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::LicenseRequired => {
                Some("Set [license] key in the config file or pass --license")
            }
            Self::NoSignatureSource => {
                Some("Pass --source or set [signatures] source in the config file")
            }
            Self::Cache(e) if e.is_structural() => {
                Some("Check permissions on the cache directory or run with --no-cache")
            }
            Self::Cache(CacheError::LockTimeout { .. }) => {
                Some("Another scancache process may be stuck; retry or raise lock_timeout_secs")
            }
            _ => None,
        }
    }
}
