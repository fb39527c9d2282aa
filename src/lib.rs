//! scancache - cached threat intelligence for a malware scanner
//!
//! Expensive scanner inputs (signature feeds, license-bound data) are
//! resolved through a cache that is safe to share between concurrently
//! running processes and never trusts what it reads back from disk.

pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod intel;

pub use error::{CacheError, CacheResult, ScanError, ScanResult};
