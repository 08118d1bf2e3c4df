//! Configuration data types for the client.
//!
//! Every section and field has a default so an empty (or absent) file yields a working setup
//! against a local API server.

use core::time::Duration;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "devicehub.toml";

/// Top-level client configuration.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub device: DeviceDefaults,
    pub inference: InferenceConfig,
}

/// Remote REST API connection settings.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every request path is appended to.
    pub base_url: String,
    /// Per-request timeout. `0` means the default.
    pub timeout_secs: u64,
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    /// Per-request timeout. Zero falls back to the default.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        let secs = if self.timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            self.timeout_secs
        };
        Duration::from_secs(secs)
    }
}

/// Where session and device state are persisted between runs.
///
/// `path` is interpreted relative to the config file when not absolute.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
    /// Prefix of the keys in the state document.
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./devicehub_state.json"),
            namespace: "devicehub".to_owned(),
        }
    }
}

/// Attributes given to a newly provisioned device.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DeviceDefaults {
    pub status: String,
    pub hourly_rate: f64,
    pub location: String,
}

impl Default for DeviceDefaults {
    fn default() -> Self {
        Self {
            status: "ACTIVE".to_owned(),
            hourly_rate: 10.5,
            location: "Server Room A".to_owned(),
        }
    }
}

/// Local inference container used by the background-removal command.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct InferenceConfig {
    pub endpoint: String,
    pub image: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5000".to_owned(),
            image: "jamesdev1507/rmbg-app".to_owned(),
        }
    }
}

/// Resolves a path relative to the directory containing the config file.
///
/// Absolute paths are returned unchanged (apart from normalization).
#[must_use]
pub fn resolve_config_relative_paths(config_path: &Path, relative_path: &Path) -> PathBuf {
    let resolved = if relative_path.is_absolute() {
        relative_path.to_path_buf()
    } else {
        config_path
            .parent()
            .map_or_else(|| relative_path.to_path_buf(), |d| d.join(relative_path))
    };

    // canonicalize() would require the file to exist already
    normalize_path(&resolved)
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        use Component as C;
        match component {
            C::Normal(c) => {
                result.push(c);
            }
            C::ParentDir => {
                result.pop();
            }
            C::CurDir => {}
            C::RootDir | C::Prefix(_) => {
                result.push(component);
            }
        }
    }
    result
}
