//! Scanner-side cache wiring
//!
//! Chooses a cache for the run, binds cached intel to the active license,
//! and resolves the signature set through it.

use crate::cache::{Cache, CacheDirectory, Cacheable, LockWait, RuntimeCache};
use crate::config::{expand_home, Config};
use crate::error::ScanResult;
use crate::intel::{cacheable_types, license_filter, License, SignatureSet, SignatureSource};
use std::time::Duration;
use tracing::{debug, warn};

/// Cache key for the downloaded signature set
pub const SIGNATURES_KEY: &str = "signatures";

/// Per-run state shared by commands that need cached intel
pub struct ScanContext {
    cache: Box<dyn Cache>,
    signature_max_age: Duration,
    include: Vec<u64>,
    exclude: Vec<u64>,
}

impl ScanContext {
    /// Build the context, falling back to an in-memory cache if the cache
    /// directory is unusable
    pub fn new(config: &Config, license: Option<License>) -> Self {
        let cache = open_cache(config);
        Self::with_cache(cache, config, license)
    }

    /// Build the context around an existing cache
    pub fn with_cache(mut cache: Box<dyn Cache>, config: &Config, license: Option<License>) -> Self {
        cache.add_filter(license_filter(license));
        debug!("Using {}", cache.describe());
        Self {
            cache,
            signature_max_age: Duration::from_secs(config.cache.signature_max_age_secs),
            include: config.signatures.include.clone(),
            exclude: config.signatures.exclude.clone(),
        }
    }

    pub fn cache(&mut self) -> &mut dyn Cache {
        self.cache.as_mut()
    }

    pub fn purge_cache(&mut self) -> ScanResult<()> {
        self.cache.purge()?;
        Ok(())
    }

    /// Resolve the signature set through the cache, then apply the
    /// include/exclude lists
    pub fn signatures(&mut self, source: &dyn SignatureSource) -> ScanResult<SignatureSet> {
        let cacheable = Cacheable::new(SIGNATURES_KEY, || source.fetch())
            .with_max_age(self.signature_max_age);
        let mut signatures = cacheable.get(self.cache.as_mut())?;
        self.filter_signatures(&mut signatures);
        Ok(signatures)
    }

    fn filter_signatures(&self, signatures: &mut SignatureSet) {
        if !self.include.is_empty() {
            let unlisted: Vec<u64> = signatures
                .signatures
                .keys()
                .filter(|id| !self.include.contains(id))
                .copied()
                .collect();
            for id in unlisted {
                signatures.remove_signature(id);
            }
            for id in &self.include {
                if signatures.get_signature(*id).is_some() {
                    debug!("Including signature: {}", id);
                } else {
                    warn!("Signature {} was not found and could not be included", id);
                }
            }
        }

        for id in &self.exclude {
            if signatures.remove_signature(*id) {
                debug!("Excluded signature {}", id);
            } else {
                warn!(
                    "Signature {} is not in the existing set. It will not be used in the scan.",
                    id
                );
            }
        }

        debug!("Filtered signature count: {}", signatures.len());
    }
}

fn open_cache(config: &Config) -> Box<dyn Cache> {
    if config.cache.enabled {
        let path = expand_home(&config.cache.directory);
        match CacheDirectory::new(path, Some(cacheable_types())) {
            Ok(cache) => {
                let wait = LockWait::from_secs(config.cache.lock_timeout_secs);
                return Box::new(cache.with_lock_wait(wait));
            }
            Err(e) => warn!("Failed to initialize cache directory: {}", e),
        }
    }
    Box::new(RuntimeCache::new())
}
