use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::classifier::Status;
use super::context::MonitorContext;
use super::dedup::DedupTracker;
use super::notice::{Notice, Notifier};
use super::polling::{PollExit, PollState, PollingEngine};
use super::record::Record;
use super::reminder::ReminderEngine;
use crate::core::error::PersistError;
use crate::core::lifecycle::LifecycleComponent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Tracked now; carries the remote status (`Exists` or `OnReview`).
    Added(Status),
    AlreadyTracked,
    NotFoundRemotely,
    AlreadyChecked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub polling: bool,
    pub reminding: bool,
    pub state: PollState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorTiming {
    pub poll_interval: Duration,
    pub reminder_interval: Duration,
}

impl Default for MonitorTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            reminder_interval: Duration::from_secs(30),
        }
    }
}

struct TaskSlot {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl TaskSlot {
    fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

#[derive(Default)]
struct Slots {
    polling: Option<TaskSlot>,
    reminder: Option<TaskSlot>,
}

struct Inner {
    ctx: MonitorContext,
    timing: MonitorTiming,
    slots: Mutex<Slots>,
    state: watch::Sender<PollState>,
}

/// Owner of the monitoring session: at most one polling task and one
/// reminder task at a time. Also the entry point for watch-list edits.
#[derive(Clone)]
pub struct MonitorController {
    inner: Arc<Inner>,
}

impl MonitorController {
    pub fn new(ctx: MonitorContext, timing: MonitorTiming) -> Self {
        let (state, _) = watch::channel(PollState::Idle);
        Self {
            inner: Arc::new(Inner {
                ctx,
                timing,
                slots: Mutex::new(Slots::default()),
                state,
            }),
        }
    }

    /// Start a polling session that reports through `notifier`. A session
    /// whose task already ended (graded or cancelled) does not count as
    /// running.
    pub async fn start(&self, notifier: Arc<dyn Notifier>) -> StartOutcome {
        let mut slots = self.inner.slots.lock().await;
        if slots.polling.as_ref().is_some_and(TaskSlot::is_active) {
            return StartOutcome::AlreadyRunning;
        }

        let cancel = CancellationToken::new();
        let engine = PollingEngine::new(
            self.inner.ctx.clone(),
            notifier.clone(),
            DedupTracker::new(),
            self.inner.timing.poll_interval,
            self.inner.state.clone(),
        );
        let inner = Arc::clone(&self.inner);
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            if let PollExit::Checked(record) = engine.run(token.clone()).await {
                inner.hand_off(record, notifier, &token).await;
            }
        });

        slots.polling = Some(TaskSlot { handle, cancel });
        StartOutcome::Started
    }

    /// Cancel polling and reminders and publish `Idle`. Tasks wind down at
    /// their next suspension point; this does not wait for them.
    pub async fn stop(&self) -> StopOutcome {
        let mut slots = self.inner.slots.lock().await;
        let mut was_active = false;
        self.inner.state.send_modify(|state| {
            for slot in [slots.polling.take(), slots.reminder.take()]
                .into_iter()
                .flatten()
            {
                was_active |= slot.is_active();
                slot.cancel.cancel();
            }
            *state = PollState::Idle;
        });

        if was_active {
            info!("Monitoring and reminders stopped");
            StopOutcome::Stopped
        } else {
            StopOutcome::NotRunning
        }
    }

    pub async fn status(&self) -> SessionStatus {
        let slots = self.inner.slots.lock().await;
        SessionStatus {
            polling: slots.polling.as_ref().is_some_and(TaskSlot::is_active),
            reminding: slots.reminder.as_ref().is_some_and(TaskSlot::is_active),
            state: *self.inner.state.borrow(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.inner.state.subscribe()
    }

    pub async fn check(&self, record: &Record) -> Status {
        self.inner.ctx.check(record).await
    }

    /// Validate against the sheets, then track. Nothing is written unless the
    /// submission exists remotely and is not graded yet.
    pub async fn add(&self, record: Record) -> Result<AddOutcome, PersistError> {
        let status = self.check(&record).await;
        match status {
            Status::NotFound => Ok(AddOutcome::NotFoundRemotely),
            Status::Checked => Ok(AddOutcome::AlreadyChecked),
            Status::Exists | Status::OnReview => {
                if self.inner.ctx.store.add(record).await? {
                    Ok(AddOutcome::Added(status))
                } else {
                    Ok(AddOutcome::AlreadyTracked)
                }
            }
        }
    }

    pub async fn remove(&self, record: &Record) -> Result<RemoveOutcome, PersistError> {
        if self.inner.ctx.store.remove(record).await? {
            Ok(RemoveOutcome::Removed)
        } else {
            Ok(RemoveOutcome::NotFound)
        }
    }

    pub async fn list(&self) -> Vec<Record> {
        self.inner.ctx.store.load().await
    }
}

impl Inner {
    /// Polling ended on a graded record: replace any running reminder with
    /// one for this record, unless a stop arrived in the meantime.
    async fn hand_off(
        &self,
        record: Record,
        notifier: Arc<dyn Notifier>,
        polling_token: &CancellationToken,
    ) {
        let mut slots = self.slots.lock().await;
        if polling_token.is_cancelled() {
            info!("Session stopped before reminders for {} could start", record);
            return;
        }
        if let Some(previous) = slots.reminder.take() {
            previous.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let engine = ReminderEngine::new(
            notifier,
            Notice::Reminder(record),
            self.timing.reminder_interval,
        );
        let handle = tokio::spawn(engine.run(cancel.clone()));
        slots.reminder = Some(TaskSlot { handle, cancel });
    }
}

#[async_trait]
impl LifecycleComponent for MonitorController {
    async fn on_init(&mut self) -> Result<()> {
        info!(
            "Monitor initializing ({} tracked entries)...",
            self.list().await.len()
        );
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("Monitor shutting down...");
        self.stop().await;
        Ok(())
    }
}
