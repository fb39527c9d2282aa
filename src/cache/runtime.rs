//! In-process cache

use super::{Cache, Filter, FilterChain, Value};
use crate::error::{CacheError, CacheResult};
use std::collections::HashMap;
use std::time::Duration;

/// Cache that lives as long as the process and is never persisted.
///
/// Values are stored as given, without a serialization round trip.
#[derive(Debug, Default)]
pub struct RuntimeCache {
    items: HashMap<String, Value>,
    filters: FilterChain,
}

impl RuntimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Cache for RuntimeCache {
    fn put(&mut self, key: &str, value: Value) -> CacheResult<()> {
        self.items.insert(key.to_string(), value);
        Ok(())
    }

    fn get(&mut self, key: &str, _max_age: Option<Duration>) -> CacheResult<Value> {
        let value = self
            .items
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::miss(key))?;
        self.filters.apply(value)
    }

    fn purge(&mut self) -> CacheResult<()> {
        self.items = HashMap::new();
        Ok(())
    }

    fn add_filter(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    fn describe(&self) -> String {
        format!("runtime cache ({} entries)", self.items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_returns_value() {
        let mut cache = RuntimeCache::new();
        cache.put("k", Value::Str("v".into())).unwrap();
        assert_eq!(cache.get("k", None).unwrap(), Value::Str("v".into()));
    }

    #[test]
    fn absent_key_is_a_miss() {
        let mut cache = RuntimeCache::new();
        let err = cache.get("nope", None).unwrap_err();
        assert!(matches!(err, CacheError::NoCachedValue { .. }));
    }

    #[test]
    fn max_age_is_ignored() {
        let mut cache = RuntimeCache::new();
        cache.put("k", Value::Int(1)).unwrap();
        assert_eq!(
            cache.get("k", Some(Duration::ZERO)).unwrap(),
            Value::Int(1)
        );
    }

    #[test]
    fn purge_empties_then_accepts_new_entries() {
        let mut cache = RuntimeCache::new();
        cache.put("a", Value::Int(1)).unwrap();
        cache.put("b", Value::Int(2)).unwrap();
        cache.purge().unwrap();

        assert!(cache.is_empty());
        assert!(cache.get("a", None).is_err());
        cache.put("a", Value::Int(3)).unwrap();
        assert_eq!(cache.get("a", None).unwrap(), Value::Int(3));
    }

    #[test]
    fn filters_do_not_touch_stored_value() {
        let mut cache = RuntimeCache::new();
        cache.add_filter(Box::new(|v| match v {
            Value::Null => Ok(Value::Str("default".into())),
            other => Ok(other),
        }));
        cache.put("k", Value::Null).unwrap();

        assert_eq!(cache.get("k", None).unwrap(), Value::Str("default".into()));
        assert_eq!(cache.items.get("k"), Some(&Value::Null));
    }
}
