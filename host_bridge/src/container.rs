//! Container lifecycle for the background-removal demo.
//!
//! Containers and images are driven through the docker API with `bollard`. Starting the
//! daemon and `docker cp` go through the command line.

use alloc::collections::BTreeMap;
use core::time::Duration;
use std::{collections::HashMap, env, path::PathBuf};

use bollard::{
    Docker,
    container::{Config, CreateContainerOptions, ListContainersOptions, StartContainerOptions},
    image::CreateImageOptions,
    models::{ContainerSummary, CreateImageInfo, HostConfig, PortBinding},
};
use futures::StreamExt as _;
use tokio::{process::Command, sync::mpsc, time::sleep};
use tracing::{debug, info, warn};

use crate::error::BridgeError;

/// How long to wait for the docker daemon after asking the OS to start it.
const DAEMON_START_ATTEMPTS: u32 = 10;

/// Port the inference images listen on, published 1:1 on the host.
pub const INFERENCE_PORT: u16 = 5000;

/// A progress notification emitted while a container is being prepared.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub message: String,
    pub percentage: f32,
}

/// Sender side of a progress stream. Sending is best-effort.
pub type ProgressTx = mpsc::UnboundedSender<ProgressUpdate>;

fn report(progress: Option<&ProgressTx>, message: &str, percentage: f32) {
    debug!(percentage, "{message}");
    if let Some(tx) = progress {
        // The receiver going away only means nobody is watching anymore.
        drop(tx.send(ProgressUpdate {
            message: message.to_owned(),
            percentage,
        }));
    }
}

/// Deterministic container name derived from the image reference.
#[must_use]
pub fn container_name_for(image: &str) -> String {
    format!("{}_container", image.replace([':', '/'], "_"))
}

/// Runs the `docker` CLI with `args` and returns trimmed stdout.
async fn docker_cli(args: &[&str]) -> Result<String, BridgeError> {
    let command = format!("docker {}", args.join(" "));
    let output = Command::new("docker")
        .args(args)
        .output()
        .await
        .map_err(|source| BridgeError::Spawn {
            command: command.clone(),
            source,
        })?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    } else {
        Err(BridgeError::CommandFailed {
            command,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}

async fn daemon_answers() -> bool {
    docker_cli(&["info"]).await.is_ok()
}

/// Makes sure the docker daemon answers, asking the OS to start it when it does not.
async fn ensure_daemon() -> Result<(), BridgeError> {
    if daemon_answers().await {
        return Ok(());
    }
    warn!("Docker daemon not answering, trying to start it");

    #[cfg(target_os = "linux")]
    let mut start = Command::new("systemctl");
    #[cfg(target_os = "linux")]
    start.args(["start", "docker"]);
    #[cfg(target_os = "macos")]
    let mut start = Command::new("open");
    #[cfg(target_os = "macos")]
    start.args(["-a", "Docker"]);
    #[cfg(target_os = "windows")]
    let mut start = Command::new("powershell");
    #[cfg(target_os = "windows")]
    start.args([
        "Start-Process",
        r#""C:\Program Files\Docker\Docker\Docker Desktop.exe""#,
    ]);
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return Err(BridgeError::DockerUnavailable(
        "no known way to start docker on this platform".to_owned(),
    ));

    #[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
    {
        match start.status().await {
            Ok(status) if status.success() => {}
            Ok(status) => {
                return Err(BridgeError::DockerUnavailable(format!(
                    "start command exited with {status}"
                )));
            }
            Err(e) => return Err(BridgeError::DockerUnavailable(e.to_string())),
        }
        for _ in 0..DAEMON_START_ATTEMPTS {
            if daemon_answers().await {
                return Ok(());
            }
            sleep(Duration::from_secs(1)).await;
        }
        Err(BridgeError::DockerUnavailable(
            "daemon did not come up in time".to_owned(),
        ))
    }
}

/// Looks up a container by exact name, returning `(id, state)`.
async fn find_container(
    docker: &Docker,
    name: &str,
) -> Result<Option<(String, Option<String>)>, BridgeError> {
    let options = ListContainersOptions::<String> {
        all: true,
        filters: HashMap::from([("name".to_owned(), vec![format!("^/{name}$")])]),
        ..Default::default()
    };
    let containers = docker.list_containers(Some(options)).await?;
    Ok(matching_container(&containers, name))
}

/// Picks the summary whose names include `/<name>`.
fn matching_container(
    containers: &[ContainerSummary],
    name: &str,
) -> Option<(String, Option<String>)> {
    let wanted = format!("/{name}");
    containers.iter().find_map(|container| {
        let names = container.names.as_ref()?;
        let id = container.id.as_ref()?;
        names
            .contains(&wanted)
            .then(|| (id.clone(), container.state.clone()))
    })
}

/// Turns the image pull stream into overall progress between 30 % and 80 %.
///
/// Byte counts are tracked per layer; a layer reported as done counts as fully
/// downloaded even when the daemon never sent its sizes.
#[derive(Debug, Default)]
struct PullProgress {
    layers: BTreeMap<String, (i64, i64)>,
}

impl PullProgress {
    const START: f32 = 30.0;
    const END: f32 = 80.0;

    fn observe(&mut self, info: &CreateImageInfo) -> Option<ProgressUpdate> {
        let id = info.id.as_ref()?;
        let status = info.status.as_deref().unwrap_or_default();
        let entry = self.layers.entry(id.clone()).or_insert((0, 0));

        if matches!(status, "Download complete" | "Pull complete" | "Already exists") {
            let total = entry.1.max(1);
            *entry = (total, total);
        } else if let Some((Some(current), Some(total))) = info
            .progress_detail
            .as_ref()
            .map(|detail| (detail.current, detail.total))
        {
            if total <= 0 {
                return None;
            }
            *entry = (current.clamp(0, total), total);
        } else {
            return None;
        }

        let (current, total) = self
            .layers
            .values()
            .fold((0_i64, 0_i64), |(c, t), &(lc, lt)| (c + lc, t + lt));
        Some(ProgressUpdate {
            message: format!("Pulling: {current} of {total}"),
            percentage: Self::START + fraction(current, total) * (Self::END - Self::START),
        })
    }
}

#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    reason = "only used for a progress percentage"
)]
fn fraction(current: i64, total: i64) -> f32 {
    if total <= 0 {
        return 0.0;
    }
    (current as f64 / total as f64).clamp(0.0, 1.0) as f32
}

/// Ensures a container for `image` is running and returns its id.
///
/// An existing container with the derived name is reused (and started when stopped);
/// otherwise the image is pulled, reporting per-layer download progress, and a fresh
/// container is created with the inference port published.
///
/// # Errors
///
/// Returns an error if docker is unavailable or any docker call fails.
#[tracing::instrument(skip(progress))]
pub async fn pull_and_run_image(
    image: &str,
    progress: Option<&ProgressTx>,
) -> Result<String, BridgeError> {
    ensure_daemon().await?;
    let docker = Docker::connect_with_local_defaults()?;

    report(progress, "Checking existing containers...", 0.0);
    let name = container_name_for(image);

    if let Some((id, state)) = find_container(&docker, &name).await? {
        if state.as_deref() != Some("running") {
            report(progress, "Starting existing container...", 50.0);
            docker
                .start_container(&id, None::<StartContainerOptions<String>>)
                .await?;
        }
        report(progress, "Container ready", 100.0);
        info!(container = %name, "Reusing existing container");
        return Ok(id);
    }

    report(progress, "Pulling image...", PullProgress::START);
    let options = CreateImageOptions {
        from_image: image.to_owned(),
        ..Default::default()
    };
    let mut stream = docker.create_image(Some(options), None, None);
    let mut pull = PullProgress::default();
    while let Some(info) = stream.next().await {
        let info = info?;
        if let Some(update) = pull.observe(&info) {
            report(progress, &update.message, update.percentage);
        }
    }
    report(progress, "Pull complete", PullProgress::END);

    report(progress, "Creating container...", 85.0);
    let port = format!("{INFERENCE_PORT}/tcp");
    let host_config = HostConfig {
        port_bindings: Some(HashMap::from([(
            port.clone(),
            Some(vec![PortBinding {
                host_ip: Some("0.0.0.0".to_owned()),
                host_port: Some(INFERENCE_PORT.to_string()),
            }]),
        )])),
        ..Default::default()
    };
    let config = Config {
        image: Some(image.to_owned()),
        tty: Some(true),
        exposed_ports: Some(HashMap::from([(port, HashMap::new())])),
        host_config: Some(host_config),
        ..Default::default()
    };
    let created = docker
        .create_container(
            Some(CreateContainerOptions {
                name: name.clone(),
                platform: None,
            }),
            config,
        )
        .await?;
    for warning in &created.warnings {
        warn!(container = %name, "{warning}");
    }

    report(progress, "Starting container...", 95.0);
    docker
        .start_container(&created.id, None::<StartContainerOptions<String>>)
        .await?;

    report(progress, "Container ready", 100.0);
    info!(container = %name, id = %created.id, "Container started");
    Ok(created.id)
}

/// Copies `container_path` out of `container` into the temp dir and returns the host path.
///
/// # Errors
///
/// Returns an error if `docker cp` fails.
#[tracing::instrument]
pub async fn copy_from_container(
    container: &str,
    container_path: &str,
) -> Result<PathBuf, BridgeError> {
    let file_name = container_path
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("output.png");
    let output_path = env::temp_dir().join(file_name);
    let source = format!("{container}:{container_path}");
    docker_cli(&["cp", &source, &output_path.to_string_lossy()]).await?;
    Ok(output_path)
}
