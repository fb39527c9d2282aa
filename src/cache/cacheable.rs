//! Compute-once values resolved through a cache

use super::{Cache, Cached};
use crate::error::CacheError;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, warn};

/// A named value, its initializer, and how stale a cached copy may be.
///
/// A `Cacheable` holds no state between calls and can be resolved
/// against any number of caches.
pub struct Cacheable<T, F> {
    key: String,
    initializer: F,
    max_age: Option<Duration>,
    _value: PhantomData<fn() -> T>,
}

impl<T, F, E> Cacheable<T, F>
where
    T: Cached,
    F: Fn() -> Result<T, E>,
    E: From<CacheError>,
{
    pub fn new(key: impl Into<String>, initializer: F) -> Self {
        Self {
            key: key.into(),
            initializer,
            max_age: None,
            _value: PhantomData,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Return the cached value, or compute, store and return it.
    ///
    /// The initializer runs at most once per call. Structural cache
    /// failures propagate; a failure to store the fresh value does not.
    pub fn get(&self, cache: &mut dyn Cache) -> Result<T, E> {
        match cache
            .get(&self.key, self.max_age)
            .and_then(T::from_value)
        {
            Ok(value) => {
                debug!("Using cached value for {}", self.key);
                return Ok(value);
            }
            Err(CacheError::NoCachedValue { .. }) => {
                debug!("No cached value for {}, computing", self.key);
            }
            Err(CacheError::InvalidValue { reason }) => {
                warn!("Discarding cached value for {}: {}", self.key, reason);
            }
            Err(e) => return Err(e.into()),
        }

        let value = (self.initializer)()?;
        if let Err(e) = cache.put(&self.key, value.to_value()) {
            warn!("Failed to cache value for {}: {}", self.key, e);
        }
        Ok(value)
    }
}

impl<T, F> std::fmt::Debug for Cacheable<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cacheable")
            .field("key", &self.key)
            .field("max_age", &self.max_age)
            .finish()
    }
}
