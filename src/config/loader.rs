//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Bind address override.
pub const ENV_BIND_ADDRESS: &str = "GATEWAY_BIND_ADDRESS";
/// Remote mapping store URL override.
pub const ENV_STORE_URL: &str = "MAPPING_STORE_URL";
/// Remote mapping store database override.
pub const ENV_STORE_NAME: &str = "MAPPING_STORE_NAME";
/// Legacy names for the two store overrides, used when the new ones are unset.
pub const ENV_LEGACY_STORE_URL: &str = "MONGO_URL";
pub const ENV_LEGACY_STORE_NAME: &str = "MONGO_NAME";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
}

/// Parse a TOML document without touching the environment.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load a TOML file, apply environment overrides, then validate.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    finish(config)
}

/// Defaults plus environment overrides, validated.
pub fn default_config() -> Result<GatewayConfig, ConfigError> {
    finish(GatewayConfig::default())
}

fn finish(mut config: GatewayConfig) -> Result<GatewayConfig, ConfigError> {
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply overrides from `lookup`, skipping keys that resolve to empty values.
pub fn apply_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(bind) = get(ENV_BIND_ADDRESS) {
        config.listener.bind_address = bind;
    }
    if let Some(url) = get(ENV_STORE_URL).or_else(|| get(ENV_LEGACY_STORE_URL)) {
        config.mapping_store.url = url;
    }
    if let Some(name) = get(ENV_STORE_NAME).or_else(|| get(ENV_LEGACY_STORE_NAME)) {
        config.mapping_store.database = name;
    }
}
