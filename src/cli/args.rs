//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// scancache - cached threat intelligence for the malware scanner
///
/// Downloads, validates and caches signature sets so repeated and
/// concurrent scans don't refetch them.
#[derive(Parser, Debug)]
#[command(name = "scancache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SCANCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for cache files
    #[arg(long, global = true, env = "SCANCACHE_CACHE_DIRECTORY")]
    pub cache_directory: Option<PathBuf>,

    /// Keep results in memory only for this run
    #[arg(long, global = true)]
    pub no_cache: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the signature set, from cache when fresh
    Signatures(SignaturesArgs),

    /// Inspect or purge the cache
    Cache(CacheArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Arguments for the signatures command
#[derive(Parser, Debug)]
pub struct SignaturesArgs {
    /// Feed URL or path to a saved pattern feed
    #[arg(short, long)]
    pub source: Option<String>,

    /// License key for the feed
    #[arg(long, env = "SCANCACHE_LICENSE", hide_env_values = true)]
    pub license: Option<String>,

    /// Only use these signature IDs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub include_signatures: Vec<u64>,

    /// Skip these signature IDs (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude_signatures: Vec<u64>,

    /// Purge the cache before loading
    #[arg(long)]
    pub purge_cache: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached entries
    Info {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Delete every cached entry
    Purge,

    /// Print a cached value
    Show {
        /// Cache key
        key: String,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Plain,
}
