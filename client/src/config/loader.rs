//! Configuration loading utilities.

use std::path::Path;

use eyre::WrapErr as _;
use tokio::fs;
use tracing::debug;

use crate::config::{ClientConfig, DEFAULT_CONFIG_FILE, resolve_config_relative_paths};

/// Reads and parses the client config from a TOML file.
///
/// The storage path is resolved relative to the config file.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed.
pub async fn load<P: AsRef<Path>>(path: P) -> eyre::Result<ClientConfig> {
    let path_ref = path.as_ref();
    let content = fs::read_to_string(path_ref).await.wrap_err(format!(
        "Failed to read config file at: {}",
        path_ref.display()
    ))?;
    let mut config: ClientConfig = toml::from_str(&content).wrap_err(format!(
        "Failed to parse config as TOML at: {}",
        path_ref.display()
    ))?;
    config.storage.path = resolve_config_relative_paths(path_ref, &config.storage.path);
    Ok(config)
}

/// Loads the config named on the command line, or [`DEFAULT_CONFIG_FILE`] when present.
///
/// Without an explicit path and without a default file, built-in defaults are used.
///
/// # Errors
///
/// Returns an error if an existing config file cannot be read or parsed.
pub async fn load_or_default(explicit: Option<&Path>) -> eyre::Result<ClientConfig> {
    if let Some(path) = explicit {
        return load(path).await;
    }
    if fs::try_exists(DEFAULT_CONFIG_FILE).await.unwrap_or(false) {
        return load(DEFAULT_CONFIG_FILE).await;
    }
    debug!("No {DEFAULT_CONFIG_FILE} found, using built-in defaults");
    Ok(ClientConfig::default())
}
