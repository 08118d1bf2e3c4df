//! Command-line interface definitions for the client.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
pub use devicehub_host_bridge::LogFormat;

/// Top-level command-line interface definition.
#[derive(Debug, Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    /// Path to the configuration file (defaults to ./devicehub.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Format of diagnostic output on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in, then register this machine if it is not registered yet.
    Login(LoginArgs),

    /// Create an account and sign in with it.
    Register(RegisterArgs),

    /// Forget the stored session.
    Logout,

    /// Register this machine and its hardware for the signed-in user.
    Provision {
        /// Provision even if a device was already created from this machine.
        #[arg(long)]
        force: bool,
    },

    /// Show the stored session and known devices.
    Status,

    /// Print a hardware snapshot of this machine.
    SystemInfo,

    /// Remove the background of an image with the local inference container.
    RemoveBackground {
        /// URL of the source image.
        #[arg(long)]
        url: String,
        /// Where to write the resulting PNG.
        #[arg(long, default_value = "./output.png")]
        out: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long, env = "DEVICEHUB_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// Do not register this machine after signing in.
    #[arg(long)]
    pub no_provision: bool,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub age: u32,
    #[arg(long)]
    pub email: String,
    #[arg(long, default_value = "")]
    pub address: String,
    #[arg(long, default_value_t = 0)]
    pub phone_number: u64,
    #[arg(long, env = "DEVICEHUB_PASSWORD", hide_env_values = true)]
    pub password: String,
}
