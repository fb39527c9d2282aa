//! Pattern feed parsing
//!
//! The feed is a JSON object with a `commonStrings` array and a `rules`
//! array of positional records:
//!
//! | Index | Field |
//! |-------|-------|
//! | 0 | identifier |
//! | 2 | rule (PCRE) |
//! | 3 | description |
//! | 5 | disabled flag, non-zero rules are skipped |
//! | 7 | name |
//! | 8 | indices into `commonStrings` |

use super::license::License;
use super::signatures::{CommonString, Signature, SignatureSet};
use crate::error::{ScanError, ScanResult};
use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct PatternFeed {
    #[serde(rename = "commonStrings")]
    common_strings: Vec<String>,
    rules: Vec<Vec<Json>>,
}

/// Parse a pattern feed into a signature set bound to `license`
pub fn parse_pattern_feed(body: &str, license: Option<&License>) -> ScanResult<SignatureSet> {
    let feed: PatternFeed = serde_json::from_str(body)
        .map_err(|e| ScanError::FeedMalformed(format!("invalid pattern document: {}", e)))?;

    let mut common_strings: Vec<CommonString> =
        feed.common_strings.into_iter().map(CommonString::new).collect();
    let mut signatures = BTreeMap::new();
    let mut skipped = 0usize;

    for record in &feed.rules {
        if int_at(record, 5)? != 0 {
            skipped += 1;
            continue;
        }
        let identifier = u64_at(record, 0)?;
        let indices = indices_at(record, 8)?;

        for index in &indices {
            let common = usize::try_from(*index)
                .ok()
                .and_then(|i| common_strings.get_mut(i))
                .ok_or_else(|| {
                    ScanError::FeedMalformed(format!(
                        "rule {} references missing common string {}",
                        identifier, index
                    ))
                })?;
            common.signature_ids.push(identifier);
        }

        signatures.insert(
            identifier,
            Signature {
                identifier,
                rule: str_at(record, 2)?,
                name: str_at(record, 7)?,
                description: str_at(record, 3)?,
                common_strings: indices,
            },
        );
    }

    debug!(
        "Parsed {} signatures ({} disabled, {} common strings)",
        signatures.len(),
        skipped,
        common_strings.len()
    );

    Ok(SignatureSet {
        common_strings,
        signatures,
        license_fingerprint: license.map(License::fingerprint),
    })
}

fn field(record: &[Json], index: usize) -> ScanResult<&Json> {
    record
        .get(index)
        .ok_or_else(|| ScanError::FeedMalformed(format!("rule record has no field {}", index)))
}

fn malformed(index: usize, expected: &str) -> ScanError {
    ScanError::FeedMalformed(format!("rule field {} is not {}", index, expected))
}

fn int_at(record: &[Json], index: usize) -> ScanResult<i64> {
    field(record, index)?
        .as_i64()
        .ok_or_else(|| malformed(index, "an integer"))
}

fn u64_at(record: &[Json], index: usize) -> ScanResult<u64> {
    field(record, index)?
        .as_u64()
        .ok_or_else(|| malformed(index, "an unsigned integer"))
}

fn str_at(record: &[Json], index: usize) -> ScanResult<String> {
    field(record, index)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| malformed(index, "a string"))
}

fn indices_at(record: &[Json], index: usize) -> ScanResult<Vec<u64>> {
    field(record, index)?
        .as_array()
        .ok_or_else(|| malformed(index, "an array"))?
        .iter()
        .map(|v| v.as_u64().ok_or_else(|| malformed(index, "a list of indices")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"{
        "commonStrings": ["eval(", "base64_decode"],
        "rules": [
            [10, 0, "eval\\(\\$_POST", "Evaluates POST data", 0, 0, 0, "PostEval", [0]],
            [11, 0, "base64_decode\\(", "Decodes payload", 0, 0, 0, "B64", [0, 1]],
            [12, 0, "disabled", "Off", 0, 1, 0, "Disabled", [1]]
        ]
    }"#;

    #[test]
    fn parses_enabled_rules() {
        let set = parse_pattern_feed(FEED, None).unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.get_signature(12).is_none());
        assert_eq!(set.get_signature(10).unwrap().name, "PostEval");
        assert_eq!(set.common_strings[0].signature_ids, vec![10, 11]);
        assert_eq!(set.common_strings[1].signature_ids, vec![11]);
        assert_eq!(set.license_fingerprint, None);
    }

    #[test]
    fn binds_license_fingerprint() {
        let license = License::new("key");
        let set = parse_pattern_feed(FEED, Some(&license)).unwrap();
        assert_eq!(set.license_fingerprint, Some(license.fingerprint()));
    }

    #[test]
    fn missing_common_string_is_malformed() {
        let feed = r#"{"commonStrings": [], "rules": [[1, 0, "r", "d", 0, 0, 0, "n", [3]]]}"#;
        let err = parse_pattern_feed(feed, None).unwrap_err();
        assert!(err.to_string().contains("missing common string 3"));
    }

    #[test]
    fn short_record_is_malformed() {
        let feed = r#"{"commonStrings": [], "rules": [[1, 0, "r"]]}"#;
        assert!(matches!(
            parse_pattern_feed(feed, None),
            Err(ScanError::FeedMalformed(_))
        ));
    }

    #[test]
    fn not_a_feed() {
        assert!(parse_pattern_feed("[]", None).is_err());
    }
}
