use crate::types::Phase;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub contests: ContestsConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Number of concurrent fetch workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-request timeout in seconds
    #[serde(rename = "fetch-timeout", default = "default_fetch_timeout")]
    pub fetch_timeout: u64,

    /// Base URL of the registry; overridable for testing
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            fetch_timeout: default_fetch_timeout(),
            base_url: default_base_url(),
        }
    }
}

/// Snapshot cache configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Where the store snapshot is read from and written to. Unset disables
    /// caching (every run starts empty and nothing is persisted).
    #[serde(rename = "snapshot-path")]
    pub snapshot_path: Option<PathBuf>,
}

impl CacheConfig {
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }
}

/// Which contests a run should cover
#[derive(Debug, Clone, Deserialize)]
pub struct ContestsConfig {
    /// Contest years to harvest
    pub years: Vec<u16>,

    /// Phase numbers (1 to 3) to harvest per year; empty means all three
    #[serde(default)]
    pub phases: Vec<u8>,
}

impl ContestsConfig {
    /// The configured phases as typed values, defaulting to all three.
    /// Validation rejects numbers outside 1..=3, so unknown codes are
    /// silently skipped here.
    pub fn phases(&self) -> Vec<Phase> {
        if self.phases.is_empty() {
            return Phase::ALL.to_vec();
        }
        self.phases
            .iter()
            .filter_map(|&code| Phase::from_server_code(code))
            .collect()
    }
}

fn default_workers() -> usize {
    8
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_base_url() -> String {
    "https://www.dges.gov.pt/coloc".to_string()
}
