//! Error taxonomy for the monitoring subsystem.
//!
//! None of these are fatal to the process: fetch and notify failures are
//! logged and retried on the next tick, persistence failures are surfaced to
//! whoever asked for the mutation.

use std::path::PathBuf;

/// A data source could not be fetched or parsed for this cycle.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request for sheet {sheet} failed: {message}")]
    Request { sheet: String, message: String },

    #[error("sheet {sheet} returned HTTP {status}")]
    Status { sheet: String, status: u16 },

    #[error("sheet {sheet} is not valid CSV: {message}")]
    Parse { sheet: String, message: String },
}

/// The watch-list could not be written (or read, for callers that care).
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("entries file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("entries file encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A chat message could not be delivered.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// The best-effort celebration side effect failed.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("could not open {path}: {message}")]
    Launch { path: PathBuf, message: String },
}

/// Configuration could not be loaded. Only ever fatal at boot.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
