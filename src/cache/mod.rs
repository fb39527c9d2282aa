//! Caching for expensive scanner inputs
//!
//! Signature feeds, license checks and similar results are resolved
//! through a [`Cache`], either the in-process [`RuntimeCache`] or a
//! [`CacheDirectory`] shared by every scancache process of the user.
//!
//! # Failure Model
//!
//! | Condition | Error | Handling |
//! |-----------|-------|----------|
//! | Miss | `NoCachedValue` | Recompute |
//! | Invalid | `InvalidValue` | Log, recompute |
//! | Structural | `DirectoryInit` / `Purge` | Propagate to caller |
//!
//! A cache only ever slows things down when it fails. The value a
//! [`Cacheable`] returns is the same whether it came from storage or was
//! freshly computed.

pub mod cacheable;
pub mod directory;
pub mod lock;
pub mod runtime;
pub mod serialization;
pub mod value;

pub use cacheable::Cacheable;
pub use directory::{decode_key, encode_key, CacheDirectory, EntryInfo};
pub use lock::{FileLock, LockMode, LockWait};
pub use runtime::RuntimeCache;
pub use serialization::AllowList;
pub use value::{Cached, Record, Value};

use crate::error::CacheResult;
use std::time::Duration;

/// Read-side transform applied to every value returned by [`Cache::get`]
pub type Filter = Box<dyn Fn(Value) -> CacheResult<Value> + Send + Sync>;

/// Uniform key/value contract over a storage backend
pub trait Cache {
    /// Store `value` under `key`, replacing any previous entry
    fn put(&mut self, key: &str, value: Value) -> CacheResult<()>;

    /// Load the value for `key`, passed through the filter pipeline.
    ///
    /// Entries older than `max_age` are treated as absent by backends
    /// that track age.
    fn get(&mut self, key: &str, max_age: Option<Duration>) -> CacheResult<Value>;

    /// Discard every entry
    fn purge(&mut self) -> CacheResult<()>;

    /// Append a filter; later filters see the output of earlier ones
    fn add_filter(&mut self, filter: Filter);

    /// Human-readable description of the backend
    fn describe(&self) -> String;
}

/// Ordered list of filters shared by the backends
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn apply(&self, value: Value) -> CacheResult<Value> {
        self.filters.iter().try_fold(value, |value, filter| filter(value))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("len", &self.filters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;

    #[test]
    fn filters_apply_in_registration_order() {
        let mut chain = FilterChain::default();
        chain.push(Box::new(|v| match v {
            Value::Int(i) => Ok(Value::Int(i + 1)),
            other => Ok(other),
        }));
        chain.push(Box::new(|v| match v {
            Value::Int(i) => Ok(Value::Int(i * 10)),
            other => Ok(other),
        }));

        // (2 + 1) * 10, not 2 * 10 + 1
        assert_eq!(chain.apply(Value::Int(2)).unwrap(), Value::Int(30));
    }

    #[test]
    fn filter_rejection_stops_the_chain() {
        let mut chain = FilterChain::default();
        chain.push(Box::new(|_| Err(CacheError::invalid("rejected"))));
        chain.push(Box::new(|_| panic!("must not run")));

        assert!(chain.apply(Value::Null).unwrap_err().is_recoverable());
    }

    #[test]
    fn empty_chain_is_identity() {
        let chain = FilterChain::default();
        assert!(chain.is_empty());
        assert_eq!(chain.apply(Value::Bool(true)).unwrap(), Value::Bool(true));
    }
}
