//! Library entry for the `devicehub` client.
//!
//! Exposes `inner_main` so the workspace-level shim binary can call into the client logic,
//! plus the building blocks (API client, services, store, provisioning) for integration tests.

extern crate alloc;
extern crate core;

pub mod api;
pub mod app;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod inference;
pub mod provision;
pub mod reporter;
pub mod services;
pub mod store;

use alloc::sync::Arc;

use devicehub_common::{RegisterPayload, Role};
use devicehub_host_bridge::{ProgressUpdate, init_tracing};
use eyre::{Result, WrapErr as _, eyre};
use secrecy::SecretString;
use tokio::sync::mpsc;
use tracing::info;

use app::{AppContext, ProvisionRefusal};
use bridge::LocalBridge;
use cli::{Cli, Command};

/// Runs provisioning with a progress reporter attached and prints the outcome.
async fn provision_and_report(ctx: &AppContext, force: bool) -> Result<()> {
    let reporter = reporter::spawn(ctx.store().subscribe());
    let outcome = ctx.provision(force).await;
    reporter.finish().await;
    match outcome {
        Ok(report) => {
            println!("{report}");
            Ok(())
        }
        Err(refusal @ ProvisionRefusal::AlreadyProvisioned { .. }) => {
            println!("{refusal} (use `provision --force` to register it again)");
            Ok(())
        }
        Err(refusal) => Err(eyre!(refusal)),
    }
}

/// The client's main function; can be called from a shim binary.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the selected command fails.
pub async fn inner_main(invocation: Cli) -> Result<()> {
    init_tracing(invocation.log_format);

    let config = config::load_or_default(invocation.config.as_deref()).await?;
    let ctx = AppContext::init(config, Arc::new(LocalBridge)).await?;

    match invocation.command {
        Command::Login(args) => {
            let session = ctx
                .login(&args.email, SecretString::from(args.password))
                .await
                .wrap_err("Login failed")?;
            println!("Signed in as {} (user {})", session.user.name, session.user.id);
            if !args.no_provision {
                provision_and_report(&ctx, false).await?;
            }
        }
        Command::Register(args) => {
            let session = ctx
                .register(RegisterPayload {
                    name: args.name,
                    age: args.age,
                    email: args.email,
                    address: args.address,
                    role: Role::User,
                    password: SecretString::from(args.password),
                    balance: 0.0,
                    phone_number: args.phone_number,
                })
                .await
                .wrap_err("Registration failed")?;
            println!("Registered {} (user {})", session.user.name, session.user.id);
        }
        Command::Logout => {
            ctx.logout().await;
            println!("Signed out");
        }
        Command::Provision { force } => provision_and_report(&ctx, force).await?,
        Command::Status => {
            let state = ctx.store().snapshot();
            match state.auth.session {
                Some(ref session) => println!(
                    "Signed in as {} <{}> (user {})",
                    session.user.name, session.user.email, session.user.id
                ),
                None => println!("Not signed in"),
            }
            for device in &state.home.devices {
                println!(
                    "device {} owner {} {} @ {} ({}/h, last active {})",
                    device.id,
                    device.owner_id,
                    device.status,
                    device.location,
                    device.hourly_rate,
                    device.last_active
                );
            }
        }
        Command::SystemInfo => {
            let info = ctx.system_info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::RemoveBackground { url, out } => {
            let (tx, mut rx) = mpsc::unbounded_channel::<ProgressUpdate>();
            let printer = tokio::spawn(async move {
                while let Some(update) = rx.recv().await {
                    eprintln!("[{:>5.1}%] {}", update.percentage, update.message);
                }
            });
            let result =
                inference::run_remove_background(&ctx.config().inference, &url, &out, Some(&tx))
                    .await;
            drop(tx);
            printer.await.wrap_err("Progress printer panicked")?;
            result?;
            info!(out = %out.display(), "Result written");
            println!("{}", out.display());
        }
    }
    Ok(())
}
