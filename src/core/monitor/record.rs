use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One submission on the watch-list. Identity is the exact triple; there is
/// no surrogate id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: String,
    pub name: String,
    pub task: String,
}

impl Record {
    pub fn new(
        timestamp: impl Into<String>,
        name: impl Into<String>,
        task: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            name: name.into(),
            task: task.into(),
        }
    }

    /// Dedup key, `timestamp|name|task`.
    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.timestamp, self.name, self.task)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.timestamp, self.name, self.task)
    }
}

/// A fetched spreadsheet row, column header to cell value.
pub type RemoteRow = HashMap<String, String>;
