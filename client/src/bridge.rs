//! The client's view of the host bridge.
//!
//! Services and the provisioning orchestrator only ever talk to the host through
//! [`HostBridge`], so tests can swap in a recording fake.

use alloc::sync::Arc;

use devicehub_common::SystemInfo;
use devicehub_host_bridge::{BridgeError, get_system_info, log_message};
use futures::{FutureExt as _, future::BoxFuture};

/// OS facilities the client core needs from the host.
pub trait HostBridge: Send + Sync {
    /// Writes an application log line and returns it as recorded.
    fn log_message<'call>(&'call self, message: &'call str)
    -> BoxFuture<'call, Result<String, BridgeError>>;

    /// Takes a hardware snapshot of the local machine.
    fn get_system_info(&self) -> BoxFuture<'_, Result<SystemInfo, BridgeError>>;
}

/// Shared handle to the bridge used across the application context.
pub type SharedBridge = Arc<dyn HostBridge>;

/// Calls the host bridge crate in-process.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBridge;

impl HostBridge for LocalBridge {
    fn log_message<'call>(
        &'call self,
        message: &'call str,
    ) -> BoxFuture<'call, Result<String, BridgeError>> {
        let line = log_message(message);
        async move { Ok(line) }.boxed()
    }

    fn get_system_info(&self) -> BoxFuture<'_, Result<SystemInfo, BridgeError>> {
        async { Ok(tokio::task::spawn_blocking(get_system_info).await?) }.boxed()
    }
}

/// Records a line through the bridge, best-effort.
///
/// A failing bridge is noted at debug level and otherwise ignored.
pub async fn log_best_effort(bridge: &dyn HostBridge, message: &str) {
    if let Err(e) = bridge.log_message(message).await {
        tracing::debug!("Host bridge log failed: {e}");
    }
}
