use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::notice::{Notice, Notifier};

/// Repeats one notice forever, first send immediately, until cancelled.
pub struct ReminderEngine {
    notifier: Arc<dyn Notifier>,
    notice: Notice,
    interval: Duration,
}

impl ReminderEngine {
    pub fn new(notifier: Arc<dyn Notifier>, notice: Notice, interval: Duration) -> Self {
        Self {
            notifier,
            notice,
            interval,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!("Reminders started for {}", self.notice.record());
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                res = self.notifier.notify(&self.notice) => {
                    if let Err(e) = res {
                        error!("Failed to send reminder: {}", e);
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!("Reminders stopped");
    }
}
