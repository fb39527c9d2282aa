//! Malware signature sets

use super::license::LICENSE_FIELD;
use crate::cache::{Cached, Record, Value};
use crate::error::{CacheError, CacheResult};
use std::collections::BTreeMap;

pub const COMMON_STRING_TYPE: &str = "intel.CommonString";
pub const SIGNATURE_TYPE: &str = "intel.Signature";
pub const SIGNATURE_SET_TYPE: &str = "intel.SignatureSet";

/// Record types a signature cache may reconstruct
pub const CACHEABLE_TYPES: &[&str] = &[SIGNATURE_SET_TYPE, SIGNATURE_TYPE, COMMON_STRING_TYPE];

/// A literal string shared by several signatures, used for prefiltering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonString {
    pub string: String,
    pub signature_ids: Vec<u64>,
}

impl CommonString {
    pub fn new(string: impl Into<String>) -> Self {
        Self {
            string: string.into(),
            signature_ids: Vec::new(),
        }
    }
}

/// A single detection rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub identifier: u64,
    pub rule: String,
    pub name: String,
    pub description: String,
    /// Indices into [`SignatureSet::common_strings`]
    pub common_strings: Vec<u64>,
}

impl Signature {
    pub fn has_common_strings(&self) -> bool {
        !self.common_strings.is_empty()
    }
}

/// Signatures plus their shared common strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureSet {
    pub common_strings: Vec<CommonString>,
    pub signatures: BTreeMap<u64, Signature>,
    /// Fingerprint of the license the set was fetched under
    pub license_fingerprint: Option<String>,
}

impl SignatureSet {
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn get_signature(&self, identifier: u64) -> Option<&Signature> {
        self.signatures.get(&identifier)
    }

    /// Remove a signature and its common string associations.
    /// Returns false if it was not in the set.
    pub fn remove_signature(&mut self, identifier: u64) -> bool {
        let Some(signature) = self.signatures.remove(&identifier) else {
            return false;
        };
        for index in signature.common_strings {
            if let Some(common) = usize::try_from(index)
                .ok()
                .and_then(|i| self.common_strings.get_mut(i))
            {
                common.signature_ids.retain(|id| *id != identifier);
            }
        }
        true
    }
}

impl Cached for CommonString {
    fn to_value(&self) -> Value {
        Record::new(COMMON_STRING_TYPE)
            .with("string", self.string.clone())
            .with("signature_ids", self.signature_ids.clone())
            .into_value()
    }

    fn from_value(value: Value) -> CacheResult<Self> {
        let mut record = value.into_record(COMMON_STRING_TYPE)?;
        Ok(Self {
            string: record.take("string")?,
            signature_ids: record.take("signature_ids")?,
        })
    }
}

impl Cached for Signature {
    fn to_value(&self) -> Value {
        Record::new(SIGNATURE_TYPE)
            .with("identifier", self.identifier)
            .with("rule", self.rule.clone())
            .with("name", self.name.clone())
            .with("description", self.description.clone())
            .with("common_strings", self.common_strings.clone())
            .into_value()
    }

    fn from_value(value: Value) -> CacheResult<Self> {
        let mut record = value.into_record(SIGNATURE_TYPE)?;
        Ok(Self {
            identifier: record.take("identifier")?,
            rule: record.take("rule")?,
            name: record.take("name")?,
            description: record.take("description")?,
            common_strings: record.take("common_strings")?,
        })
    }
}

impl Cached for SignatureSet {
    fn to_value(&self) -> Value {
        let signatures: Vec<Signature> = self.signatures.values().cloned().collect();
        Record::new(SIGNATURE_SET_TYPE)
            .with("common_strings", self.common_strings.clone())
            .with("signatures", signatures)
            .with(LICENSE_FIELD, self.license_fingerprint.clone())
            .into_value()
    }

    fn from_value(value: Value) -> CacheResult<Self> {
        let mut record = value.into_record(SIGNATURE_SET_TYPE)?;
        let common_strings: Vec<CommonString> = record.take("common_strings")?;
        let list: Vec<Signature> = record.take("signatures")?;

        let mut signatures = BTreeMap::new();
        for signature in list {
            let id = signature.identifier;
            if signatures.insert(id, signature).is_some() {
                return Err(CacheError::invalid(format!("duplicate signature {}", id)));
            }
        }

        Ok(Self {
            common_strings,
            signatures,
            license_fingerprint: record.take(LICENSE_FIELD)?,
        })
    }
}
