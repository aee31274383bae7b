use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::{Record, RemoteRow};
use crate::core::config::ColumnMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NotFound,
    Exists,
    OnReview,
    Checked,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::NotFound => "not_found",
            Status::Exists => "exists",
            Status::OnReview => "on_review",
            Status::Checked => "checked",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Matches records against fetched rows by exact, case-sensitive equality on
/// the timestamp, name and task columns.
#[derive(Debug, Clone, Default)]
pub struct StatusClassifier {
    columns: ColumnMap,
}

impl StatusClassifier {
    pub fn new(columns: ColumnMap) -> Self {
        Self { columns }
    }

    pub fn find_row<'a>(&self, rows: &'a [RemoteRow], record: &Record) -> Option<&'a RemoteRow> {
        rows.iter().find(|row| {
            cell(row, &self.columns.timestamp) == record.timestamp
                && cell(row, &self.columns.name) == record.name
                && cell(row, &self.columns.task) == record.task
        })
    }

    /// Grade is tested before reviewer: a graded row has been reviewed too.
    pub fn classify_row(&self, row: &RemoteRow) -> Status {
        if !cell(row, &self.columns.grade).is_empty() {
            Status::Checked
        } else if !cell(row, &self.columns.reviewer).is_empty() {
            Status::OnReview
        } else {
            Status::Exists
        }
    }

    /// Classify against several sheets in priority order. The first sheet
    /// with a matching row decides; later sheets are not consulted.
    pub fn classify<'a, I>(&self, sheets: I, record: &Record) -> Status
    where
        I: IntoIterator<Item = &'a [RemoteRow]>,
    {
        sheets
            .into_iter()
            .find_map(|rows| self.find_row(rows, record))
            .map(|row| self.classify_row(row))
            .unwrap_or(Status::NotFound)
    }
}

/// Missing columns read as empty cells.
fn cell<'a>(row: &'a RemoteRow, column: &str) -> &'a str {
    row.get(column).map(String::as_str).unwrap_or("")
}
