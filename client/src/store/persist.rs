//! Persistence of the session and device list between runs.
//!
//! The state document is a JSON object with one entry per persisted slice, keyed
//! `"<namespace>:auth"` and `"<namespace>:home"`. Loading/error flags are never written.

use std::{
    io,
    path::{Path, PathBuf},
};

use devicehub_common::{Device, Session};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error as ThisError;
use tokio::{fs, io::AsyncWriteExt as _};
use tracing::debug;

/// Errors reading or writing the state document.
#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("Failed to access state file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("State file {} is not valid", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The slices that survive a restart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub session: Option<Session>,
    pub devices: Vec<Device>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedAuth {
    #[serde(default)]
    session: Option<Session>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedHome {
    #[serde(default)]
    devices: Vec<Device>,
}

/// Reads and writes [`PersistedState`] at a fixed location.
#[derive(Debug, Clone)]
pub struct Persistor {
    path: PathBuf,
    namespace: String,
}

impl Persistor {
    pub fn new(path: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            namespace: namespace.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn auth_key(&self) -> String {
        format!("{}:auth", self.namespace)
    }

    fn home_key(&self) -> String {
        format!("{}:home", self.namespace)
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn format_err(&self, source: serde_json::Error) -> StoreError {
        StoreError::Format {
            path: self.path.clone(),
            source,
        }
    }

    /// Loads the persisted slices. A missing file yields empty state.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<PersistedState, StoreError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No state file yet");
                return Ok(PersistedState::default());
            }
            Err(e) => return Err(self.io_err(e)),
        };
        let mut document: Map<String, Value> =
            serde_json::from_str(&content).map_err(|e| self.format_err(e))?;

        let auth: PersistedAuth = document
            .remove(&self.auth_key())
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| self.format_err(e))?
            .unwrap_or_default();
        let home: PersistedHome = document
            .remove(&self.home_key())
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| self.format_err(e))?
            .unwrap_or_default();

        Ok(PersistedState {
            session: auth.session,
            devices: home.devices,
        })
    }

    /// Writes the persisted slices, replacing the previous document atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub async fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        let mut document = Map::new();
        document.insert(
            self.auth_key(),
            serde_json::to_value(PersistedAuth {
                session: state.session.clone(),
            })
            .map_err(|e| self.format_err(e))?,
        );
        document.insert(
            self.home_key(),
            serde_json::to_value(PersistedHome {
                devices: state.devices.clone(),
            })
            .map_err(|e| self.format_err(e))?,
        );
        let content = serde_json::to_vec_pretty(&document).map_err(|e| self.format_err(e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| self.io_err(e))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        // A leftover from an interrupted save may have any mode
        match fs::remove_file(&tmp).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(self.io_err(e)),
            _ => {}
        }
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        // The session holds bearer tokens
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&tmp).await.map_err(|e| self.io_err(e))?;
        file.write_all(&content).await.map_err(|e| self.io_err(e))?;
        file.sync_all().await.map_err(|e| self.io_err(e))?;
        drop(file);

        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_err(e))?;
        debug!(path = %self.path.display(), "State saved");
        Ok(())
    }
}
