//! Prints provisioning progress by watching store snapshots.

use alloc::sync::Arc;

use devicehub_common::ComponentKind;
use tokio::{sync::oneshot, task::JoinHandle};

use crate::store::{ResourceSlot, StoreRx, StoreState};

/// Handle of a running progress printer.
pub struct Reporter {
    done: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Reporter {
    /// Prints whatever is still pending and stops the printer.
    pub async fn finish(self) {
        // The task may already have stopped because the store went away
        drop(self.done.send(()));
        if let Err(e) = self.task.await {
            tracing::debug!("Progress reporter ended abnormally: {e}");
        }
    }
}

/// Spawns a task printing one line per settled provisioning step.
///
/// Snapshots are coalesced by the watch channel, so a slow printer may merge steps.
#[must_use]
pub fn spawn(mut rx: StoreRx) -> Reporter {
    let (done, mut done_rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        let mut previous = Arc::clone(&rx.borrow_and_update());
        loop {
            let stop = tokio::select! {
                changed = rx.changed() => changed.is_err(),
                _ = &mut done_rx => true,
            };
            let current = Arc::clone(&rx.borrow_and_update());
            for line in transitions(&previous, &current) {
                eprintln!("{line}");
            }
            previous = current;
            if stop {
                break;
            }
        }
    });
    Reporter { done, task }
}

fn settled<T: PartialEq>(
    label: &str,
    before: Option<&ResourceSlot<T>>,
    after: Option<&ResourceSlot<T>>,
    id: impl Fn(&T) -> i64,
) -> Option<String> {
    let after = after?;
    let unchanged = before.is_some_and(|b| b.error == after.error && b.result == after.result);
    if after.loading || unchanged {
        return None;
    }
    if let Some(ref error) = after.error {
        return Some(format!("  {label}: failed ({error})"));
    }
    after
        .result
        .as_ref()
        .map(|result| format!("  {label}: ok (id {})", id(result)))
}

/// Lines describing what finished between two snapshots.
fn transitions(before: &StoreState, after: &StoreState) -> Vec<String> {
    let mut lines = Vec::new();
    if !before.home.provisioning && after.home.provisioning {
        lines.push("Provisioning this machine...".to_owned());
    }
    lines.extend(settled(
        "device",
        Some(&before.home.device),
        Some(&after.home.device),
        |d| d.id,
    ));
    for kind in ComponentKind::ALL {
        lines.extend(settled(
            &kind.to_string(),
            before.home.component(kind),
            after.home.component(kind),
            devicehub_common::ComponentRecord::id,
        ));
        lines.extend(settled(
            &format!("{kind} link"),
            before.home.link(kind),
            after.home.link(kind),
            |l| l.id,
        ));
    }
    if before.home.provisioning && !after.home.provisioning {
        lines.push("Provisioning finished.".to_owned());
    }
    lines
}
