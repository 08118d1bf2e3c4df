//! Errors raised by host bridge calls.

use std::{io, path::PathBuf};

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum BridgeError {
    #[error("Docker is not running and could not be started: {0}")]
    DockerUnavailable(String),
    #[error("Docker API call failed")]
    Docker(#[from] bollard::errors::Error),
    #[error("Failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited unsuccessfully: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("Failed to read file {}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Host call did not complete")]
    Join(#[from] tokio::task::JoinError),
}
