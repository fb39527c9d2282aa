//! License keys and license-bound cache entries

use crate::cache::{Filter, Value};
use crate::error::CacheError;
use sha2::{Digest, Sha256};
use std::fmt;

/// Field that marks a record as fetched under a particular license
pub const LICENSE_FIELD: &str = "license_fingerprint";

/// A scanner license key
#[derive(Clone, PartialEq, Eq)]
pub struct License {
    key: String,
}

impl License {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// SHA-256 of the key, hex encoded. This is what gets cached, never the key.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.key.as_bytes()))
    }
}

impl fmt::Debug for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("License")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Reject cached records that were fetched under a different license.
///
/// Records without a license fingerprint, and non-record values, pass
/// through unchanged.
pub fn license_filter(license: Option<License>) -> Filter {
    let expected = license.map(|l| l.fingerprint());
    Box::new(move |value: Value| {
        let bound = value
            .as_record()
            .and_then(|record| record.get(LICENSE_FIELD))
            .cloned();

        match (bound, &expected) {
            (None, _) | (Some(Value::Null), _) => Ok(value),
            (Some(Value::Str(found)), Some(expected)) if &found == expected => Ok(value),
            (Some(Value::Str(_)), Some(_)) => {
                Err(CacheError::invalid("cached value belongs to a different license"))
            }
            (Some(Value::Str(_)), None) => {
                Err(CacheError::invalid("cached value requires a license"))
            }
            (Some(other), _) => Err(CacheError::invalid(format!(
                "license fingerprint has unexpected shape {}",
                other.kind()
            ))),
        }
    })
}
