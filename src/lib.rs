//! DGES Harvester: an incremental crawler for Portugal's public higher
//! education placement registry
//!
//! The registry is organized as contest -> school -> course -> candidate.
//! This crate walks that hierarchy in three concurrent fan-out stages,
//! caches every completed page in a tri-state hierarchical store, and
//! checkpoints the store to disk so an interrupted or repeated run never
//! refetches data it already has.

pub mod config;
pub mod filter;
pub mod harvester;
pub mod output;
pub mod pages;
pub mod requests;
pub mod store;
pub mod types;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {target}: {source}")]
    Http {
        target: String,
        source: reqwest::Error,
    },

    #[error("Request timeout for {target}")]
    Timeout { target: String },

    #[error("HTTP status {status} for {target}")]
    Status { target: String, status: u16 },

    #[error("Failed to extract data from {target}: {source}")]
    Page { target: String, source: PageError },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error(
        "the filter does not enumerate contests; a live harvest needs an explicit contest list"
    )]
    UnboundedFilter,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while extracting typed records from a fetched page
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Unrecognized page structure: {0}")]
    InvalidPage(String),

    #[error("Server reported too many requests")]
    TooManyRequests,

    #[error("Expected rows missing from page: {0}")]
    EmptyResult(String),
}

/// Errors raised by the hierarchical store and its snapshot layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing parent node for {path}")]
    MissingParent { path: String },

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Corrupt snapshot at {path:?}: {source}")]
    CorruptSnapshot {
        path: PathBuf,
        source: rmp_serde::decode::Error,
    },

    #[error("Failed to read snapshot from {path:?}: {source}")]
    SnapshotRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "Failed to write snapshot to {path:?} (a fallback copy was saved to {fallback:?}): {source}"
    )]
    SnapshotFellBack {
        path: PathBuf,
        fallback: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write snapshot to both {path:?} and fallback {fallback:?}: {source}")]
    SnapshotWrite {
        path: PathBuf,
        fallback: PathBuf,
        source: std::io::Error,
    },
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// Re-export commonly used types
pub use config::Config;
pub use filter::{ContestFilter, UniversalFilter};
pub use store::Store;
pub use types::{CandidateEntry, Contest, Course, Phase, School, SchoolType};
