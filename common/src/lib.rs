//! Wire types shared by the devicehub client and host bridge.
//!
//! This crate provides:
//! - The uniform [`ApiEnvelope`] every REST call is normalized to
//! - Session, device, hardware component and link records
//! - The [`SystemInfo`] contract exposed by the host bridge
#![expect(
    clippy::missing_errors_doc,
    reason = "The situation it maps to errors should be obvious."
)]

extern crate alloc;
extern crate core;

mod envelope;
mod model;
mod system;

pub use envelope::*;
pub use model::*;
pub use system::*;
