//! Integration tests for scancache

mod concurrency;

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const FEED: &str = r#"{
        "commonStrings": ["eval("],
        "rules": [
            [101, 0, "eval\\(\\$_GET", "GET eval", 0, 0, 0, "GetEval", [0]],
            [102, 0, "eval\\(\\$_POST", "POST eval", 0, 0, 0, "PostEval", [0]]
        ]
    }"#;

    /// Command isolated from the user's config and cache
    fn scancache(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("scancache");
        cmd.env("SCANCACHE_CONFIG", temp.path().join("config.toml"))
            .env("SCANCACHE_CACHE_DIRECTORY", temp.path().join("cache"))
            .env_remove("SCANCACHE_LICENSE");
        cmd
    }

    fn write_feed(temp: &TempDir) -> std::path::PathBuf {
        let path = temp.path().join("feed.json");
        fs::write(&path, FEED).unwrap();
        path
    }

    fn source_arg(path: &Path) -> String {
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        scancache(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cached threat intelligence"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        scancache(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("scancache"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        scancache(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        scancache(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"));
    }

    #[test]
    fn signatures_without_source_fails_with_hint() {
        let temp = TempDir::new().unwrap();
        scancache(&temp)
            .arg("signatures")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No signature source configured"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn second_run_is_served_from_cache() {
        let temp = TempDir::new().unwrap();
        let feed = write_feed(&temp);

        scancache(&temp)
            .args(["signatures", "--source", &source_arg(&feed)])
            .assert()
            .success()
            .stdout(predicate::str::contains("PostEval"));

        // The feed is gone; only the cache can answer now
        fs::remove_file(&feed).unwrap();

        scancache(&temp)
            .args(["signatures", "--format", "plain", "--source", &source_arg(&feed)])
            .assert()
            .success()
            .stdout(predicate::str::contains("101"))
            .stdout(predicate::str::contains("102"));
    }

    #[test]
    fn purge_cache_forces_refetch() {
        let temp = TempDir::new().unwrap();
        let feed = write_feed(&temp);

        scancache(&temp)
            .args(["signatures", "--source", &source_arg(&feed)])
            .assert()
            .success();
        fs::remove_file(&feed).unwrap();

        scancache(&temp)
            .args(["signatures", "--purge-cache", "--source", &source_arg(&feed)])
            .assert()
            .failure()
            .stderr(predicate::str::contains("reading signature feed"));
    }

    #[test]
    fn no_cache_always_fetches() {
        let temp = TempDir::new().unwrap();
        let feed = write_feed(&temp);

        scancache(&temp)
            .args(["--no-cache", "signatures", "--source", &source_arg(&feed)])
            .assert()
            .success();

        assert!(!temp.path().join("cache").exists());
    }

    #[test]
    fn exclude_signatures_filters_output() {
        let temp = TempDir::new().unwrap();
        let feed = write_feed(&temp);

        scancache(&temp)
            .args([
                "signatures",
                "--format",
                "plain",
                "--exclude-signatures",
                "101",
                "--source",
                &source_arg(&feed),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("102"))
            .stdout(predicate::str::contains("101").not());
    }

    #[test]
    fn cache_info_lists_entries() {
        let temp = TempDir::new().unwrap();
        let feed = write_feed(&temp);

        scancache(&temp)
            .args(["cache", "info"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached entries"));

        scancache(&temp)
            .args(["signatures", "--source", &source_arg(&feed)])
            .assert()
            .success();

        scancache(&temp)
            .args(["cache", "info", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::diff("signatures\n"));
    }

    #[test]
    fn cache_show_prints_value() {
        let temp = TempDir::new().unwrap();
        let feed = write_feed(&temp);

        scancache(&temp)
            .args(["signatures", "--source", &source_arg(&feed)])
            .assert()
            .success();

        scancache(&temp)
            .args(["cache", "show", "signatures"])
            .assert()
            .success()
            .stdout(predicate::str::contains("intel.SignatureSet"));
    }

    #[test]
    fn cache_show_missing_key_fails() {
        let temp = TempDir::new().unwrap();
        scancache(&temp)
            .args(["cache", "show", "nothing-here"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No cached value"));
    }

    #[test]
    fn tampered_entry_is_replaced() {
        let temp = TempDir::new().unwrap();
        let feed = write_feed(&temp);
        let cache_dir = temp.path().join("cache");
        fs::create_dir_all(&cache_dir).unwrap();

        let entry = cache_dir.join(hex_upper("signatures"));
        fs::write(
            &entry,
            r#"{"kind":"record","data":{"type_name":"std.process.Command","fields":{}}}"#,
        )
        .unwrap();

        scancache(&temp)
            .args(["signatures", "--source", &source_arg(&feed)])
            .assert()
            .success()
            .stdout(predicate::str::contains("GetEval"))
            .stderr(predicate::str::contains("std.process.Command"));

        let rewritten = fs::read_to_string(&entry).unwrap();
        assert!(rewritten.contains("intel.SignatureSet"));
    }

    #[test]
    fn cache_purge_empties_directory() {
        let temp = TempDir::new().unwrap();
        let feed = write_feed(&temp);

        scancache(&temp)
            .args(["signatures", "--source", &source_arg(&feed)])
            .assert()
            .success();

        scancache(&temp)
            .args(["cache", "purge"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Purged"));

        let remaining = fs::read_dir(temp.path().join("cache")).unwrap().count();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn feed_url_requires_license() {
        let temp = TempDir::new().unwrap();
        scancache(&temp)
            .args(["signatures", "--source", "https://example.invalid/feed"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("license key is required"));
    }

    fn hex_upper(key: &str) -> String {
        key.bytes().map(|b| format!("{:02X}", b)).collect()
    }
}
