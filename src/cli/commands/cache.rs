//! Cache command - inspect or purge the cache directory

use crate::cache::{Cache, CacheDirectory, EntryInfo, LockWait};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::{expand_home, Config};
use crate::error::{ScanError, ScanResult};
use crate::intel::cacheable_types;
use chrono::Utc;
use console::style;

/// Execute the cache command
pub fn execute(args: CacheArgs, config: &Config) -> ScanResult<()> {
    let mut cache = open_directory(config)?;

    match args.action {
        CacheAction::Info { format } => show_info(&cache, format),
        CacheAction::Purge => purge(&mut cache),
        CacheAction::Show { key } => show_entry(&mut cache, &key),
    }
}

fn open_directory(config: &Config) -> ScanResult<CacheDirectory> {
    if !config.cache.enabled {
        return Err(ScanError::User(
            "The cache is disabled (--no-cache or [cache] enabled = false)".to_string(),
        ));
    }
    let cache = CacheDirectory::new(
        expand_home(&config.cache.directory),
        Some(cacheable_types()),
    )?;
    Ok(cache.with_lock_wait(LockWait::from_secs(config.cache.lock_timeout_secs)))
}

fn show_info(cache: &CacheDirectory, format: OutputFormat) -> ScanResult<()> {
    let entries = cache.entries().map_err(|e| {
        ScanError::io(format!("reading cache directory {}", cache.path().display()), e)
    })?;

    match format {
        OutputFormat::Table => print_entry_table(cache, &entries),
        OutputFormat::Json => print_entry_json(&entries)?,
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.key);
            }
        }
    }
    Ok(())
}

fn print_entry_table(cache: &CacheDirectory, entries: &[EntryInfo]) {
    println!("Cache directory: {}", cache.path().display());
    println!();

    if entries.is_empty() {
        println!("No cached entries.");
        return;
    }

    println!("{:<30} {:>12} {:<20}", "KEY", "SIZE", "AGE");
    println!("{}", "-".repeat(64));

    let now = Utc::now();
    for entry in entries {
        let age = now.signed_duration_since(entry.modified);
        println!(
            "{:<30} {:>12} {:<20}",
            entry.key,
            entry.size,
            format_age(age.num_seconds())
        );
    }

    println!();
    println!("Total: {} entries", entries.len());
}

fn print_entry_json(entries: &[EntryInfo]) -> ScanResult<()> {
    #[derive(serde::Serialize)]
    struct EntryJson<'a> {
        key: &'a str,
        file: String,
        size: u64,
        modified: String,
    }

    let json: Vec<EntryJson> = entries
        .iter()
        .map(|e| EntryJson {
            key: &e.key,
            file: e.path.display().to_string(),
            size: e.size,
            modified: e.modified.to_rfc3339(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn purge(cache: &mut CacheDirectory) -> ScanResult<()> {
    cache.purge()?;
    println!(
        "{} Purged {}",
        style("[OK]").green(),
        cache.path().display()
    );
    Ok(())
}

fn show_entry(cache: &mut CacheDirectory, key: &str) -> ScanResult<()> {
    let value = cache.get(key, None)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn format_age(secs: i64) -> String {
    let secs = secs.max(0);
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86400 => format!("{}h {}m", s / 3600, (s % 3600) / 60),
        s => format!("{}d {}h", s / 86400, (s % 86400) / 3600),
    }
}
