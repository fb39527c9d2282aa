//! Signatures command - load the signature set through the cache

use crate::cli::args::{OutputFormat, SignaturesArgs};
use crate::config::Config;
use crate::context::ScanContext;
use crate::error::{ScanError, ScanResult};
use crate::intel::{source_for, License, SignatureSet};
use console::style;
use tracing::info;

/// Execute the signatures command
pub fn execute(args: SignaturesArgs, config: &Config) -> ScanResult<()> {
    let mut config = config.clone();
    if !args.include_signatures.is_empty() {
        config.signatures.include = args.include_signatures;
    }
    if !args.exclude_signatures.is_empty() {
        config.signatures.exclude = args.exclude_signatures;
    }

    let license = args
        .license
        .or_else(|| config.license.key.clone())
        .map(License::new);
    let location = args
        .source
        .or_else(|| config.signatures.source.clone())
        .ok_or(ScanError::NoSignatureSource)?;
    let source = source_for(&location, license.clone())?;

    let mut ctx = ScanContext::new(&config, license);
    if args.purge_cache {
        ctx.purge_cache()?;
        info!("Cache purged");
    }

    let signatures = ctx.signatures(source.as_ref())?;

    match args.format {
        OutputFormat::Table => print_table(&signatures, &source.describe()),
        OutputFormat::Json => print_json(&signatures)?,
        OutputFormat::Plain => print_plain(&signatures),
    }
    Ok(())
}

fn print_table(signatures: &SignatureSet, source: &str) {
    println!("{:<10} {:<40} {:<8}", "ID", "NAME", "STRINGS");
    println!("{}", "-".repeat(60));

    for signature in signatures.signatures.values() {
        println!(
            "{:<10} {:<40} {:<8}",
            signature.identifier,
            signature.name,
            signature.common_strings.len()
        );
    }

    println!();
    println!(
        "Total: {} signature(s) from {}",
        style(signatures.len()).bold(),
        source
    );
}

fn print_json(signatures: &SignatureSet) -> ScanResult<()> {
    #[derive(serde::Serialize)]
    struct SignatureJson<'a> {
        id: u64,
        name: &'a str,
        description: &'a str,
        rule: &'a str,
        common_strings: Vec<&'a str>,
    }

    let json: Vec<SignatureJson> = signatures
        .signatures
        .values()
        .map(|s| SignatureJson {
            id: s.identifier,
            name: &s.name,
            description: &s.description,
            rule: &s.rule,
            common_strings: s
                .common_strings
                .iter()
                .filter_map(|i| usize::try_from(*i).ok())
                .filter_map(|i| signatures.common_strings.get(i))
                .map(|c| c.string.as_str())
                .collect(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn print_plain(signatures: &SignatureSet) {
    for id in signatures.signatures.keys() {
        println!("{}", id);
    }
}
