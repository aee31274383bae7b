use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::record::RemoteRow;
use crate::core::error::FetchError;

/// Anything that can hand back the current rows of one sheet. An empty sheet
/// is `Ok(vec![])`, never an error.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch(&self, sheet: &str) -> Result<Vec<RemoteRow>, FetchError>;
}

/// Reads sheets through the public Google Sheets CSV export.
pub struct GoogleSheetSource {
    client: reqwest::Client,
    spreadsheet_id: String,
}

impl GoogleSheetSource {
    pub fn new(spreadsheet_id: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            spreadsheet_id: spreadsheet_id.into(),
        })
    }

    pub fn export_url(&self, gid: &str) -> String {
        format!(
            "https://docs.google.com/spreadsheets/d/{}/export?format=csv&gid={}",
            self.spreadsheet_id, gid
        )
    }
}

#[async_trait]
impl RowSource for GoogleSheetSource {
    async fn fetch(&self, sheet: &str) -> Result<Vec<RemoteRow>, FetchError> {
        let url = self.export_url(sheet);
        let request_error = |e: reqwest::Error| FetchError::Request {
            sheet: sheet.to_string(),
            message: e.to_string(),
        };

        let res = self.client.get(&url).send().await.map_err(request_error)?;
        if !res.status().is_success() {
            return Err(FetchError::Status {
                sheet: sheet.to_string(),
                status: res.status().as_u16(),
            });
        }
        let body = res.bytes().await.map_err(request_error)?;
        let rows = parse_csv(sheet, &body)?;
        debug!("Fetched {} rows from sheet {}", rows.len(), sheet);
        Ok(rows)
    }
}

/// Parse a CSV document whose first line is the header row. Short rows leave
/// the trailing columns out; when a header repeats, the rightmost cell wins.
pub fn parse_csv(sheet: &str, body: &[u8]) -> Result<Vec<RemoteRow>, FetchError> {
    let parse_error = |e: csv::Error| FetchError::Parse {
        sheet: sheet.to_string(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body);
    let headers = reader.headers().map_err(parse_error)?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(parse_error)?;
        let row: RemoteRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}
