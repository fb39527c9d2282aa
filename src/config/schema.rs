//! Configuration schema for scancache
//!
//! Configuration is stored at `~/.config/scancache/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache settings
    pub cache: CacheConfig,

    /// License settings
    pub license: LicenseConfig,

    /// Signature feed settings
    pub signatures: SignaturesConfig,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Use the on-disk cache; when false results only live for one run
    pub enabled: bool,

    /// Cache directory, `~` is expanded
    pub directory: PathBuf,

    /// Seconds a downloaded signature set stays fresh
    pub signature_max_age_secs: u64,

    /// Give up waiting on a cache file lock after this many seconds.
    /// Unset waits forever.
    pub lock_timeout_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_cache_dir(),
            signature_max_age_secs: 86400,
            lock_timeout_secs: None,
        }
    }
}

/// License configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    /// License key used for the signature feed
    pub key: Option<String>,
}

/// Signature feed configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignaturesConfig {
    /// Feed URL or path to a saved pattern feed
    pub source: Option<String>,

    /// Only use these signature identifiers
    pub include: Vec<u64>,

    /// Never use these signature identifiers
    pub exclude: Vec<u64>,
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scancache")
}
