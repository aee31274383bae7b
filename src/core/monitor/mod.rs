//! Submission tracking: watch-list, status classification and the polling /
//! reminder loops that turn spreadsheet changes into chat notifications.

mod celebration;
mod classifier;
mod context;
mod controller;
mod dedup;
mod notice;
mod polling;
mod record;
mod reminder;
mod source;
mod store;

#[cfg(test)]
mod tests;

pub use celebration::{Celebration, ImageCelebration, NoCelebration};
pub use classifier::{Status, StatusClassifier};
pub use context::MonitorContext;
pub use controller::{
    AddOutcome, MonitorController, MonitorTiming, RemoveOutcome, SessionStatus, StartOutcome,
    StopOutcome,
};
pub use dedup::DedupTracker;
pub use notice::{Notice, Notifier};
pub use polling::{PollExit, PollState, PollingEngine};
pub use record::{Record, RemoteRow};
pub use reminder::ReminderEngine;
pub use source::{GoogleSheetSource, RowSource, parse_csv};
pub use store::{EntryPersistence, JsonFilePersistence, RecordStore};
