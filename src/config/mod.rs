//! Configuration loading and validation
//!
//! Configuration comes from a TOML file with three sections:
//!
//! - `[harvest]`: worker count, fetch timeout, registry base URL
//! - `[cache]`: where the store snapshot lives
//! - `[contests]`: which contest years to harvest
//!
//! A SHA-256 hash of the file content is computed at load time so runs can
//! log whether the configuration changed since the snapshot was written.

mod loader;
mod types;

pub use loader::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{CacheConfig, Config, ContestsConfig, HarvestConfig};
