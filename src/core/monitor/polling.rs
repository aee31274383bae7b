use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::classifier::Status;
use super::context::MonitorContext;
use super::dedup::DedupTracker;
use super::notice::{Notice, Notifier};
use super::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Stopped,
}

impl PollState {
    pub fn as_str(self) -> &'static str {
        match self {
            PollState::Idle => "idle",
            PollState::Polling => "polling",
            PollState::Stopped => "stopped",
        }
    }
}

/// Why [`PollingEngine::run`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollExit {
    Cancelled,
    /// This record got a grade; the caller should start reminding about it.
    Checked(Record),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum CycleOutcome {
    Continue,
    Cancelled,
    Checked(Record),
}

/// One monitoring session: fetch, classify, notify, sleep, repeat.
pub struct PollingEngine {
    ctx: MonitorContext,
    notifier: Arc<dyn Notifier>,
    dedup: DedupTracker,
    interval: Duration,
    state: watch::Sender<PollState>,
}

impl PollingEngine {
    pub fn new(
        ctx: MonitorContext,
        notifier: Arc<dyn Notifier>,
        dedup: DedupTracker,
        interval: Duration,
        state: watch::Sender<PollState>,
    ) -> Self {
        Self {
            ctx,
            notifier,
            dedup,
            interval,
            state,
        }
    }

    pub fn dedup(&self) -> &DedupTracker {
        &self.dedup
    }

    /// Run until cancelled or until a tracked record is graded. The first
    /// cycle starts immediately.
    ///
    /// State is only published while `cancel` is live. Whoever cancels the
    /// engine owns the channel from then on.
    pub async fn run(mut self, cancel: CancellationToken) -> PollExit {
        self.dedup.reset();
        self.publish(&cancel, PollState::Polling);
        info!("Monitoring started");

        loop {
            match self.cycle(&cancel).await {
                CycleOutcome::Checked(record) => {
                    self.publish(&cancel, PollState::Stopped);
                    info!("{} graded - monitoring stopped", record);
                    return PollExit::Checked(record);
                }
                CycleOutcome::Cancelled => break,
                CycleOutcome::Continue => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Monitoring cancelled");
        PollExit::Cancelled
    }

    /// Cancellation is checked under the channel's write lock, so a
    /// canceller publishing through `send_modify` always has the last word.
    fn publish(&self, cancel: &CancellationToken, next: PollState) {
        self.state.send_if_modified(|state| {
            if cancel.is_cancelled() {
                return false;
            }
            *state = next;
            true
        });
    }

    /// One pass over the watch-list. Processing ends at the first graded
    /// record.
    pub(super) async fn cycle(&mut self, cancel: &CancellationToken) -> CycleOutcome {
        let records = self.ctx.store.load().await;
        if records.is_empty() {
            info!("No entries to monitor");
            return CycleOutcome::Continue;
        }

        let sheets = tokio::select! {
            _ = cancel.cancelled() => return CycleOutcome::Cancelled,
            sheets = self.ctx.fetch_all() => sheets,
        };

        for record in records {
            if cancel.is_cancelled() {
                return CycleOutcome::Cancelled;
            }
            let status = self
                .ctx
                .classifier
                .classify(sheets.iter().map(Vec::as_slice), &record);
            match status {
                Status::OnReview => {
                    if self.dedup.should_notify_on_review(&record.key())
                        && !self.deliver(cancel, Notice::OnReview(record)).await
                    {
                        return CycleOutcome::Cancelled;
                    }
                }
                Status::Checked => {
                    if !self.deliver(cancel, Notice::Checked(record.clone())).await {
                        return CycleOutcome::Cancelled;
                    }
                    return CycleOutcome::Checked(record);
                }
                Status::Exists | Status::NotFound => {
                    debug!("{} is {}", record, status);
                }
            }
        }
        CycleOutcome::Continue
    }

    /// Returns `false` when cancelled mid-send; the celebration is skipped
    /// then.
    async fn deliver(&self, cancel: &CancellationToken, notice: Notice) -> bool {
        let sent = tokio::select! {
            _ = cancel.cancelled() => return false,
            sent = self.notifier.notify(&notice) => sent,
        };
        match sent {
            Ok(()) => info!("Sent '{}' notification for {}", notice.kind(), notice.record()),
            Err(e) => error!("Failed to send '{}' notification: {}", notice.kind(), e),
        }
        self.ctx.celebrate();
        true
    }
}
