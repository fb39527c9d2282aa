//! CLI command implementations

pub mod cache;
pub mod config;
pub mod signatures;

pub use cache::execute as cache;
pub use config::execute as config;
pub use signatures::execute as signatures;
