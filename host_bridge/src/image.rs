//! Reading image files for display.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::BridgeError;

/// Reads the file at `path` and returns its contents base64-encoded.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub async fn read_image_file<P: AsRef<Path>>(path: P) -> Result<String, BridgeError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| BridgeError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(STANDARD.encode(bytes))
}
