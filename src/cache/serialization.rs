//! Restricted (de)serialization of cache payloads
//!
//! Cache files may have been written by someone other than us. Bytes are
//! only ever parsed into the inert [`Value`] tree, and every [`Record`]
//! in that tree must name a type on the [`AllowList`] before the value is
//! released to a caller. Nothing outside the permitted shapes can be
//! produced from a payload.

use super::value::{Record, Value};
use crate::error::{CacheError, CacheResult};
use std::collections::BTreeSet;

/// Record type names permitted during reconstruction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    types: BTreeSet<String>,
}

impl AllowList {
    /// Primitives, lists and maps only
    pub fn primitives() -> Self {
        Self::default()
    }

    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, type_name: &str) -> bool {
        self.types.contains(type_name)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Encode a value for storage
pub fn serialize(value: &Value) -> CacheResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(CacheError::Serialize)
}

/// Decode a stored payload, rejecting any record type not on `allowed`
pub fn restricted_deserialize(bytes: &[u8], allowed: &AllowList) -> CacheResult<Value> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| CacheError::invalid(format!("malformed cache payload: {}", e)))?;
    check_allowed(&value, allowed)?;
    Ok(value)
}

fn check_allowed(value: &Value, allowed: &AllowList) -> CacheResult<()> {
    match value {
        Value::List(items) => items.iter().try_for_each(|v| check_allowed(v, allowed)),
        Value::Map(entries) => entries.values().try_for_each(|v| check_allowed(v, allowed)),
        Value::Record(record) => check_record(record, allowed),
        _ => Ok(()),
    }
}

fn check_record(record: &Record, allowed: &AllowList) -> CacheResult<()> {
    if !allowed.allows(&record.type_name) {
        return Err(CacheError::invalid(format!(
            "type {} is not allowed",
            record.type_name
        )));
    }
    record
        .fields
        .values()
        .try_for_each(|v| check_allowed(v, allowed))
}
