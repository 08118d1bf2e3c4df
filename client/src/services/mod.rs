//! Resource services: domain operations expressed as API calls.
//!
//! Services never return `Err`; every outcome, including transport failures, is an
//! [`ApiEnvelope`](devicehub_common::ApiEnvelope).

mod auth;
mod device;

pub use auth::AuthService;
pub use device::DeviceService;
