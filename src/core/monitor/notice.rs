use async_trait::async_trait;

use super::record::Record;
use crate::core::error::NotifyError;

/// Something the engines want the user to hear about. Rendering is up to the
/// notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A reviewer picked the submission up.
    OnReview(Record),
    /// The submission got a grade; polling stops.
    Checked(Record),
    /// Repeated nudge after grading, until the user sends a stop.
    Reminder(Record),
}

impl Notice {
    pub fn record(&self) -> &Record {
        match self {
            Notice::OnReview(record) | Notice::Checked(record) | Notice::Reminder(record) => {
                record
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notice::OnReview(_) => "on_review",
            Notice::Checked(_) => "checked",
            Notice::Reminder(_) => "reminder",
        }
    }

    /// Plain-text rendering for logs and terminals.
    pub fn text(&self) -> String {
        match self {
            Notice::OnReview(r) => format!("Submission {} for {} is on review!", r.task, r.name),
            Notice::Checked(r) => format!(
                "Submission {} for {} has been graded! Monitoring stopped.",
                r.task, r.name
            ),
            Notice::Reminder(r) => format!("Submission '{}' for {} has been graded!", r.task, r.name),
        }
    }
}

/// Delivery channel for notices. Implementations must be cheap to share
/// between the polling and reminder tasks.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError>;
}
