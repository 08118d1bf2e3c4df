//! Shim binary that calls into the `host_bridge` library's `inner_main`.
use clap::Parser as _;
use eyre::Result;

use devicehub_host_bridge::{Cli, inner_main};

#[tokio::main]
async fn main() -> Result<()> {
    inner_main(Cli::parse()).await
}
