use std::sync::Arc;
use tracing::{debug, error};

use super::celebration::Celebration;
use super::classifier::{Status, StatusClassifier};
use super::record::{Record, RemoteRow};
use super::source::RowSource;
use super::store::RecordStore;

/// Collaborators shared by the polling engine and the controller.
#[derive(Clone)]
pub struct MonitorContext {
    pub store: Arc<RecordStore>,
    pub source: Arc<dyn RowSource>,
    pub sheets: Vec<String>,
    pub classifier: StatusClassifier,
    pub celebration: Arc<dyn Celebration>,
}

impl MonitorContext {
    pub fn new(
        store: Arc<RecordStore>,
        source: Arc<dyn RowSource>,
        sheets: Vec<String>,
        classifier: StatusClassifier,
        celebration: Arc<dyn Celebration>,
    ) -> Self {
        Self {
            store,
            source,
            sheets,
            classifier,
            celebration,
        }
    }

    /// Fetch every configured sheet once, in priority order. Sheets that fail
    /// are logged and left out of the result.
    pub async fn fetch_all(&self) -> Vec<Vec<RemoteRow>> {
        let mut fetched = Vec::with_capacity(self.sheets.len());
        for sheet in &self.sheets {
            match self.source.fetch(sheet).await {
                Ok(rows) => fetched.push(rows),
                Err(e) => error!("Error fetching sheet {}: {}", sheet, e),
            }
        }
        fetched
    }

    /// One-off status lookup. Sheets are fetched lazily and the scan stops at
    /// the first sheet holding the record.
    pub async fn check(&self, record: &Record) -> Status {
        for sheet in &self.sheets {
            match self.source.fetch(sheet).await {
                Ok(rows) => {
                    if let Some(row) = self.classifier.find_row(&rows, record) {
                        let status = self.classifier.classify_row(row);
                        debug!("{} is {} in sheet {}", record, status, sheet);
                        return status;
                    }
                }
                Err(e) => error!("Error checking entry in sheet {}: {}", sheet, e),
            }
        }
        Status::NotFound
    }

    pub fn celebrate(&self) {
        if let Err(e) = self.celebration.celebrate() {
            error!("Celebration hook failed: {}", e);
        }
    }
}
