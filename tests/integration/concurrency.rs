//! Concurrent access to one cache directory

use assert_cmd::cargo::cargo_bin_cmd;
use scancache::cache::{Cache, CacheDirectory, Cached, Value};
use scancache::context::SIGNATURES_KEY;
use scancache::intel::{cacheable_types, SignatureSet};
use scancache::CacheError;
use std::process::{Command, Stdio};
use std::thread;
use tempfile::TempDir;

fn payload(fill: char) -> Value {
    Value::Str(fill.to_string().repeat(512 * 1024))
}

fn is_whole(value: &Value) -> bool {
    match value {
        Value::Str(s) => {
            s.len() == 512 * 1024
                && (s.chars().all(|c| c == 'a') || s.chars().all(|c| c == 'b'))
        }
        _ => false,
    }
}

#[test]
fn concurrent_writers_never_tear() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().to_path_buf();

    let writers: Vec<_> = ['a', 'b']
        .into_iter()
        .map(|fill| {
            let path = path.clone();
            thread::spawn(move || {
                let mut cache = CacheDirectory::new(&path, None).unwrap();
                for _ in 0..20 {
                    cache.put("shared", payload(fill)).unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let path = path.clone();
        thread::spawn(move || {
            let mut cache = CacheDirectory::new(&path, None).unwrap();
            for _ in 0..50 {
                match cache.get("shared", None) {
                    Ok(value) => assert!(is_whole(&value), "observed a torn write"),
                    Err(CacheError::NoCachedValue { .. }) => {}
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    reader.join().unwrap();

    let mut cache = CacheDirectory::new(&path, None).unwrap();
    assert!(is_whole(&cache.get("shared", None).unwrap()));
}

#[test]
fn different_keys_do_not_contend() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().to_path_buf();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let path = path.clone();
            thread::spawn(move || {
                let mut cache = CacheDirectory::new(&path, None).unwrap();
                cache.put(&format!("key-{}", i), Value::Int(i)).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut cache = CacheDirectory::new(&path, None).unwrap();
    for i in 0..8 {
        assert_eq!(cache.get(&format!("key-{}", i), None).unwrap(), Value::Int(i));
    }
}

/// Child process isolated from the user's config, cache and license
fn scancache_process(temp: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_scancache"));
    cmd.env("SCANCACHE_CONFIG", temp.path().join("config.toml"))
        .env("SCANCACHE_CACHE_DIRECTORY", temp.path().join("cache"))
        .env_remove("SCANCACHE_LICENSE");
    cmd
}

#[test]
fn concurrent_processes_leave_a_whole_entry() {
    let temp = TempDir::new().unwrap();
    let feed = temp.path().join("feed.json");
    let rules: Vec<String> = (1..=200)
        .map(|id| format!(r#"[{}, 0, "rule{}", "d", 0, 0, 0, "Sig{}", []]"#, id, id, id))
        .collect();
    std::fs::write(
        &feed,
        format!(r#"{{"commonStrings": [], "rules": [{}]}}"#, rules.join(",")),
    )
    .unwrap();

    let children: Vec<_> = (0..4)
        .map(|_| {
            scancache_process(&temp)
                .args(["signatures", "--format", "plain", "--source"])
                .arg(&feed)
                .stdout(Stdio::null())
                .spawn()
                .unwrap()
        })
        .collect();

    for mut child in children {
        assert!(child.wait().unwrap().success());
    }

    let mut cache =
        CacheDirectory::new(temp.path().join("cache"), Some(cacheable_types())).unwrap();
    let stored = cache.get(SIGNATURES_KEY, None).unwrap();
    let signatures = SignatureSet::from_value(stored).unwrap();
    assert_eq!(signatures.len(), 200);
    assert!(signatures.license_fingerprint.is_none());
    assert_eq!(signatures.get_signature(200).unwrap().name, "Sig200");

    cargo_bin_cmd!("scancache")
        .env("SCANCACHE_CONFIG", temp.path().join("config.toml"))
        .env("SCANCACHE_CACHE_DIRECTORY", temp.path().join("cache"))
        .env_remove("SCANCACHE_LICENSE")
        .args(["cache", "show", "signatures"])
        .assert()
        .success();
}
