//! Threat intelligence the scanner caches between runs

pub mod feed;
pub mod license;
pub mod signatures;
pub mod source;

pub use feed::parse_pattern_feed;
pub use license::{license_filter, License, LICENSE_FIELD};
pub use signatures::{CommonString, Signature, SignatureSet, CACHEABLE_TYPES};
pub use source::{source_for, FileSource, HttpSource, SignatureSource};

use crate::cache::AllowList;

/// Allow-list covering every intel record type
pub fn cacheable_types() -> AllowList {
    AllowList::new(CACHEABLE_TYPES.iter().copied())
}
