//! scancache - CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use scancache::cli::{Cli, Commands};
use scancache::config::ConfigManager;
use scancache::error::ScanResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> ScanResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("scancache=warn"),
        1 => EnvFilter::new("scancache=info"),
        _ => EnvFilter::new("scancache=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let mut config = config_manager.load()?;

    if let Some(dir) = cli.cache_directory {
        debug!("Cache directory overridden: {}", dir.display());
        config.cache.directory = dir;
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }

    match cli.command {
        Commands::Signatures(args) => scancache::cli::commands::signatures(args, &config),
        Commands::Cache(args) => scancache::cli::commands::cache(args, &config),
        Commands::Config(args) => scancache::cli::commands::config(args, &config, &config_manager),
    }
}
