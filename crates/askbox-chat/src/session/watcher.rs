//! Background inactivity check.

use std::sync::Arc;

use askbox_common::ExpiryTrigger;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::manager::ChatSession;

/// Handle to the periodic expiry task. Dropping it stops the task.
pub struct ExpiryWatcher {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ExpiryWatcher {
    /// Stop the task and wait for it to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Expiry watcher ended abnormally");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for ExpiryWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl ChatSession {
    /// Spawn a task that runs `check_expiry(Tick)` every check interval.
    ///
    /// The task only holds a weak reference, so it ends on its own once
    /// every `ChatSession` handle is gone. Must be called inside a tokio
    /// runtime.
    pub fn spawn_expiry_watcher(&self) -> ExpiryWatcher {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.settings.check_interval;
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let Some(inner) = weak.upgrade() else {
                            debug!("Session dropped, stopping expiry watcher");
                            break;
                        };
                        let session = ChatSession { inner };
                        if let Err(e) = session.check_expiry(ExpiryTrigger::Tick) {
                            warn!(error = %e, "Expiry check failed");
                        }
                    }
                }
            }
            debug!("Expiry watcher stopped");
        });

        ExpiryWatcher {
            cancel,
            handle: Some(handle),
        }
    }
}
