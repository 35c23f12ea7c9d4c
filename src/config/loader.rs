use crate::config::types::Config;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use url::Url;

/// Loads, parses and validates a configuration file
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content, used to log
/// whether the configuration changed between runs against the same snapshot
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its content hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.harvest.workers == 0 {
        return Err(ConfigError::Validation(
            "harvest.workers must be at least 1".to_string(),
        ));
    }

    if config.harvest.fetch_timeout == 0 {
        return Err(ConfigError::Validation(
            "harvest.fetch-timeout must be at least 1 second".to_string(),
        ));
    }

    if Url::parse(&config.harvest.base_url).is_err() {
        return Err(ConfigError::Validation(format!(
            "harvest.base-url is not a valid URL: {}",
            config.harvest.base_url
        )));
    }

    if config.contests.years.is_empty() {
        return Err(ConfigError::Validation(
            "contests.years must list at least one year".to_string(),
        ));
    }

    // The registry starts in the late seventies; anything outside a sane
    // range is a typo, not a request
    if let Some(year) = config
        .contests
        .years
        .iter()
        .find(|&&year| !(1977..=2100).contains(&year))
    {
        return Err(ConfigError::Validation(format!(
            "contests.years contains an implausible year: {year}"
        )));
    }

    if let Some(phase) = config
        .contests
        .phases
        .iter()
        .find(|&&phase| !(1..=3).contains(&phase))
    {
        return Err(ConfigError::Validation(format!(
            "contests.phases must be between 1 and 3, got {phase}"
        )));
    }

    Ok(())
}
