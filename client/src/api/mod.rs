//! REST API access.

mod client;

pub use client::{ApiClient, ensure_crypto_provider};
pub use reqwest::Method;
