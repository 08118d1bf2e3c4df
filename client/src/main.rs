//! Shim binary that calls into the `devicehub_client` library's `inner_main`.
use clap::Parser as _;
use eyre::Result;

use devicehub_client::{cli::Cli, inner_main};

#[tokio::main]
async fn main() -> Result<()> {
    inner_main(Cli::parse()).await
}
