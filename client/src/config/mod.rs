//! Configuration management for the client: data types and loading of the TOML config file.

mod loader;
mod types;

pub use loader::*;
pub use types::*;
