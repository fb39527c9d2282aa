//! Where signature sets come from

use super::feed::parse_pattern_feed;
use super::license::License;
use super::signatures::SignatureSet;
use crate::error::{ScanError, ScanResult};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Something that can produce a fresh signature set, usually slowly
pub trait SignatureSource {
    fn fetch(&self) -> ScanResult<SignatureSet>;

    fn describe(&self) -> String;
}

/// A pattern feed saved on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    license: Option<License>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, license: Option<License>) -> Self {
        Self {
            path: path.into(),
            license,
        }
    }
}

impl SignatureSource for FileSource {
    fn fetch(&self) -> ScanResult<SignatureSet> {
        info!("Loading signatures from {}", self.path.display());
        let body = fs::read_to_string(&self.path).map_err(|e| {
            ScanError::io(format!("reading signature feed {}", self.path.display()), e)
        })?;
        parse_pattern_feed(&body, self.license.as_ref())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// The licensed pattern feed served over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    license: License,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, license: License) -> Self {
        Self {
            url: url.into(),
            license,
        }
    }
}

impl SignatureSource for HttpSource {
    fn fetch(&self) -> ScanResult<SignatureSet> {
        info!("Downloading signatures from {}", self.url);
        let request_err = |e: ureq::Error| ScanError::FeedRequest {
            url: self.url.clone(),
            reason: e.to_string(),
        };

        let mut response = ureq::get(&self.url)
            .query("action", "get_patterns")
            .query("k", self.license.key())
            .call()
            .map_err(request_err)?;
        let body = response.body_mut().read_to_string().map_err(request_err)?;

        parse_pattern_feed(&body, Some(&self.license))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Pick a source for `location`: URLs need a license, anything else is a path
pub fn source_for(location: &str, license: Option<License>) -> ScanResult<Box<dyn SignatureSource>> {
    if location.starts_with("https://") || location.starts_with("http://") {
        let license = license.ok_or(ScanError::LicenseRequired)?;
        Ok(Box::new(HttpSource::new(location, license)))
    } else {
        Ok(Box::new(FileSource::new(location, license)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn url_without_license_is_rejected() {
        let err = source_for("https://example.invalid/feed", None).err().unwrap();
        assert!(matches!(err, ScanError::LicenseRequired));
    }

    #[test]
    fn url_with_license_is_http() {
        let source = source_for("https://example.invalid/feed", Some(License::new("k"))).unwrap();
        assert_eq!(source.describe(), "https://example.invalid/feed");
    }

    #[test]
    fn file_source_reads_feed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.json");
        fs::write(
            &path,
            r#"{"commonStrings": [], "rules": [[1, 0, "r", "d", 0, 0, 0, "n", []]]}"#,
        )
        .unwrap();

        let set = source_for(path.to_str().unwrap(), None).unwrap().fetch().unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let source = FileSource::new("/nonexistent/feed.json", None);
        assert!(matches!(source.fetch(), Err(ScanError::Io { .. })));
    }
}
