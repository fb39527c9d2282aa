//! Value shapes a cache is able to hold
//!
//! Only the variants of [`Value`] can cross the cache boundary. Domain
//! types convert to and from `Value` through [`Cached`], and only
//! [`Record`] carries a type name, which is what the allow-list checks.

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A cacheable value tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(#[serde(with = "float_repr")] f64),
    Str(String),
    Bytes(#[serde(with = "hex")] Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Record(Record),
}

impl Value {
    /// Short name of the shape, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
        }
    }

    /// Unwrap a record of the expected type
    pub fn into_record(self, type_name: &str) -> CacheResult<Record> {
        match self {
            Self::Record(record) if record.type_name == type_name => Ok(record),
            Self::Record(record) => Err(CacheError::invalid(format!(
                "expected record {}, found {}",
                type_name, record.type_name
            ))),
            other => Err(mismatch(type_name, &other)),
        }
    }

    /// Borrow the record if this value is one
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }
}

/// A named structure of fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub type_name: String,
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion
    pub fn with(mut self, name: &str, value: impl Cached) -> Self {
        self.fields.insert(name.to_string(), value.to_value());
        self
    }

    /// Remove a field and convert it, failing if absent or mis-shaped
    pub fn take<T: Cached>(&mut self, name: &str) -> CacheResult<T> {
        let value = self.fields.remove(name).ok_or_else(|| {
            CacheError::invalid(format!("record {} is missing field {}", self.type_name, name))
        })?;
        T::from_value(value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn into_value(self) -> Value {
        Value::Record(self)
    }
}

/// Largest integer magnitude an `f64` holds exactly (2^53)
const MAX_EXACT_INT: u64 = 1 << 53;

/// JSON has no NaN or infinity, so those are stored as strings
mod float_repr {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    const NAN: &str = "NaN";
    const INFINITY: &str = "inf";
    const NEG_INFINITY: &str = "-inf";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str(INFINITY)
        } else if value.is_infinite() {
            serializer.serialize_str(NEG_INFINITY)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Special(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Special(s) => match s.as_str() {
                NAN => Ok(f64::NAN),
                INFINITY => Ok(f64::INFINITY),
                NEG_INFINITY => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid float {:?}", other))),
            },
        }
    }
}

fn mismatch(expected: &str, found: &Value) -> CacheError {
    CacheError::invalid(format!("expected {}, found {}", expected, found.kind()))
}

/// Conversion between a Rust type and a [`Value`]
///
/// `from_value` must reject any shape it does not recognise with
/// [`CacheError::InvalidValue`]; a cache treats that as a reason to
/// recompute rather than a failure.
pub trait Cached: Sized {
    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> CacheResult<Self>;
}

impl Cached for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> CacheResult<Self> {
        Ok(value)
    }
}

impl Cached for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> CacheResult<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl Cached for i64 {
    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> CacheResult<Self> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(mismatch("int", &other)),
        }
    }
}

impl Cached for u64 {
    fn to_value(&self) -> Value {
        // Values above i64::MAX are stored as their decimal string
        match i64::try_from(*self) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Str(self.to_string()),
        }
    }

    fn from_value(value: Value) -> CacheResult<Self> {
        match value {
            Value::Int(i) => u64::try_from(i)
                .map_err(|_| CacheError::invalid(format!("negative value {} for u64", i))),
            Value::Str(s) => s
                .parse()
                .map_err(|_| CacheError::invalid(format!("{:?} is not a u64", s))),
            other => Err(mismatch("u64", &other)),
        }
    }
}

impl Cached for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> CacheResult<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) if i.unsigned_abs() <= MAX_EXACT_INT => Ok(i as f64),
            Value::Int(i) => Err(CacheError::invalid(format!(
                "int {} has no exact float representation",
                i
            ))),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl Cached for String {
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> CacheResult<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(mismatch("str", &other)),
        }
    }
}

impl<T: Cached> Cached for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> CacheResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Cached> Cached for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Cached::to_value).collect())
    }

    fn from_value(value: Value) -> CacheResult<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("list", &other)),
        }
    }
}

impl<T: Cached> Cached for BTreeMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> CacheResult<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                .collect(),
            other => Err(mismatch("map", &other)),
        }
    }
}
