//! Background removal through the local inference container.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use devicehub_host_bridge::{
    ProgressUpdate, container::container_name_for, copy_from_container, pull_and_run_image,
    read_image_file,
};
use eyre::{WrapErr as _, eyre};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use crate::api::ensure_crypto_provider;
use crate::config::InferenceConfig;

#[derive(Debug, Serialize)]
struct RemoveBgRequest<'url> {
    url: &'url str,
}

#[derive(Debug, Deserialize)]
struct RemoveBgResponse {
    output_path: String,
}

/// Asks the inference server to cut out the background of the image at `url`.
///
/// Returns the path of the result inside the container.
///
/// # Errors
///
/// Returns an error if the server is unreachable or answers with something unexpected.
pub async fn remove_background(
    http: &reqwest::Client,
    endpoint: &str,
    url: &str,
) -> eyre::Result<String> {
    let response = http
        .post(format!("{}/remove-bg", endpoint.trim_end_matches('/')))
        .json(&RemoveBgRequest { url })
        .send()
        .await
        .wrap_err("Inference server unreachable")?
        .error_for_status()
        .wrap_err("Inference server rejected the request")?;
    let body: RemoveBgResponse = response
        .json()
        .await
        .wrap_err("Inference server returned an unexpected body")?;
    if body.output_path.is_empty() {
        return Err(eyre!("Inference server returned no output path"));
    }
    Ok(body.output_path)
}

/// Runs the whole demo: container up, inference call, result copied to `out`.
///
/// # Errors
///
/// Returns an error if any step fails. Nothing is retried.
pub async fn run_remove_background(
    config: &InferenceConfig,
    url: &str,
    out: &Path,
    progress: Option<&mpsc::UnboundedSender<ProgressUpdate>>,
) -> eyre::Result<()> {
    pull_and_run_image(&config.image, progress)
        .await
        .wrap_err_with(|| format!("Failed to start {}", config.image))?;

    ensure_crypto_provider();
    let http = reqwest::Client::new();
    let output_path = remove_background(&http, &config.endpoint, url).await?;
    info!(%output_path, "Background removed");

    let container = container_name_for(&config.image);
    let local = copy_from_container(&container, &output_path).await?;
    let encoded = read_image_file(&local).await?;
    let bytes = STANDARD
        .decode(encoded)
        .wrap_err("Result image is not valid base64")?;
    tokio::fs::write(out, bytes)
        .await
        .wrap_err_with(|| format!("Failed to write {}", out.display()))?;
    Ok(())
}
