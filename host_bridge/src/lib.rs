//! Host bridge for the `devicehub` client.
//!
//! Exposes the handful of OS facilities the client needs (log sink, hardware snapshot,
//! container control, file reads) both as a library used in-process and as a small CLI for
//! poking at a machine by hand.

extern crate alloc;
extern crate core;

pub mod container;
pub mod error;
pub mod gpu;
pub mod image;
pub mod log;
pub mod system_info;

use std::{path::PathBuf, sync::Once};

use clap::{Parser, Subcommand, ValueEnum};
use eyre::{Result, WrapErr as _};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

pub use container::{ProgressUpdate, copy_from_container, pull_and_run_image};
pub use error::BridgeError;
pub use image::read_image_file;
pub use log::log_message;
pub use system_info::get_system_info;

static INIT_TRACING: Once = Once::new();

/// Top-level CLI parser for host_bridge.
#[derive(Debug, Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    /// Format of diagnostic output on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
    Pretty,
}

/// Subcommands available for host_bridge execution.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print a hardware snapshot of this machine as JSON.
    SystemInfo,

    /// Record a message in the application log.
    Log { message: String },

    /// Make sure a container for the given image is running.
    RunImage {
        #[arg(default_value = "jamesdev1507/rmbg-app")]
        image: String,
    },

    /// Copy a file out of a container into the temp directory.
    CopyFromContainer { container: String, path: String },

    /// Print a file's contents base64-encoded.
    ReadImage { path: PathBuf },
}

/// Installs the global tracing subscriber once per process.
pub fn init_tracing(format: LogFormat) {
    INIT_TRACING.call_once(move || {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .with_timer(ChronoLocal::rfc_3339());

        match format {
            LogFormat::Compact => builder.compact().init(),
            LogFormat::Json => builder.json().init(),
            LogFormat::Pretty => builder.pretty().init(),
        }
    });
}

/// The host bridge's main function; can be called from a shim binary.
///
/// # Errors
///
/// Returns an error if the selected host call fails.
pub async fn inner_main(invocation: Cli) -> Result<()> {
    init_tracing(invocation.log_format);

    match invocation.command {
        Command::SystemInfo => {
            let info = tokio::task::spawn_blocking(get_system_info)
                .await
                .wrap_err("System info collection panicked")?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Log { message } => {
            println!("{}", log_message(&message));
        }
        Command::RunImage { image } => {
            let (tx, mut rx) = mpsc::unbounded_channel::<ProgressUpdate>();
            let printer = tokio::spawn(async move {
                while let Some(update) = rx.recv().await {
                    eprintln!("[{:>5.1}%] {}", update.percentage, update.message);
                }
            });
            let id = pull_and_run_image(&image, Some(&tx))
                .await
                .wrap_err_with(|| format!("Failed to run image {image}"))?;
            drop(tx);
            printer.await.wrap_err("Progress printer panicked")?;
            println!("{id}");
        }
        Command::CopyFromContainer { container, path } => {
            let output = copy_from_container(&container, &path).await?;
            println!("{}", output.display());
        }
        Command::ReadImage { path } => {
            println!("{}", read_image_file(&path).await?);
        }
    }
    Ok(())
}
