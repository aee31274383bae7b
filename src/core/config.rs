use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

use crate::core::error::ConfigError;

pub const CONFIG_FILE: &str = "config.toml";
pub const TOKEN_FILE: &str = "bot_token.txt";
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_spreadsheet_id")]
    pub spreadsheet_id: String,

    /// Sheet tabs to scan, in priority order. The first tab holding a
    /// matching row decides the status of a record.
    #[serde(default = "default_sheet_gids")]
    pub sheet_gids: Vec<String>,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_reminder_interval_secs")]
    pub reminder_interval_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Relative paths resolve against the data directory.
    #[serde(default = "default_entries_file")]
    pub entries_file: PathBuf,

    /// Image opened when a submission goes on review or gets graded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_token: Option<String>,

    #[serde(default)]
    pub columns: ColumnMap,
}

/// Header names of the five columns the classifier reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub timestamp: String,
    pub name: String,
    pub task: String,
    pub reviewer: String,
    pub grade: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            timestamp: "Метка времени".to_string(),
            name: "ФИО".to_string(),
            task: "Задание".to_string(),
            reviewer: "Проверяющий".to_string(),
            grade: "Оценка".to_string(),
        }
    }
}

fn default_spreadsheet_id() -> String {
    "1PlQVDjbfnTrUBmgltN2JwDnq3ZUjs8l4ei_MkaGzL1A".to_string()
}
fn default_sheet_gids() -> Vec<String> {
    vec!["730603969".to_string(), "928911897".to_string()]
}
fn default_poll_interval_secs() -> u64 {
    10
}
fn default_reminder_interval_secs() -> u64 {
    30
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_entries_file() -> PathBuf {
    PathBuf::from("entries.json")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: default_spreadsheet_id(),
            sheet_gids: default_sheet_gids(),
            poll_interval_secs: default_poll_interval_secs(),
            reminder_interval_secs: default_reminder_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            entries_file: default_entries_file(),
            image_path: None,
            log_level: default_log_level(),
            log_file: None,
            telegram_token: None,
            columns: ColumnMap::default(),
        }
    }
}

impl MonitorConfig {
    /// Defaults when the data dir has no `config.toml`; see [`Self::exists_in`].
    pub async fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self, ConfigError> {
        let config_path = data_dir.as_ref().join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(&config_path)
            .await
            .map_err(|source| ConfigError::Read {
                path: config_path.clone(),
                source,
            })?;
        Self::parse(&content)
    }

    pub fn exists_in(data_dir: &Path) -> bool {
        data_dir.join(CONFIG_FILE).exists()
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(ConfigError::Invalid("spreadsheet_id is empty".into()));
        }
        if self.sheet_gids.is_empty() {
            return Err(ConfigError::Invalid(
                "sheet_gids must list at least one sheet".into(),
            ));
        }
        if self.poll_interval_secs == 0 || self.reminder_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs and reminder_interval_secs must be positive".into(),
            ));
        }
        self.level()?;
        Ok(())
    }

    pub fn level(&self) -> Result<Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log_level '{}'", self.log_level)))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn reminder_interval(&self) -> Duration {
        Duration::from_secs(self.reminder_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn entries_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.entries_file)
    }

    pub fn log_path(&self, data_dir: &Path) -> Option<PathBuf> {
        self.log_file.as_ref().map(|file| data_dir.join(file))
    }

    /// Token lookup order: environment, config file, then a `bot_token.txt`
    /// next to the config.
    pub fn resolve_telegram_token(&self, data_dir: &Path) -> Option<String> {
        if let Ok(token) = std::env::var(TOKEN_ENV)
            && !token.trim().is_empty()
        {
            return Some(token.trim().to_string());
        }
        if let Some(token) = &self.telegram_token
            && !token.trim().is_empty()
        {
            return Some(token.trim().to_string());
        }
        std::fs::read_to_string(data_dir.join(TOKEN_FILE))
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    /// Copy safe to print: the bot token is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(token) = &copy.telegram_token {
            copy.telegram_token = Some(mask(token));
        }
        copy
    }
}

fn mask(secret: &str) -> String {
    if secret.chars().count() <= 4 {
        "*".repeat(secret.chars().count())
    } else {
        let prefix: String = secret.chars().take(4).collect();
        format!("{}****", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = MonitorConfig::parse("").unwrap();
        assert_eq!(config.sheet_gids, vec!["730603969", "928911897"]);
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.reminder_interval(), Duration::from_secs(30));
        assert_eq!(config.columns, ColumnMap::default());
        assert!(config.image_path.is_none());
    }

    #[test]
    fn partial_columns_keep_remaining_defaults() {
        let config = MonitorConfig::parse(
            r#"
            poll_interval_secs = 600

            [columns]
            grade = "Grade"
            reviewer = "Reviewer"
            "#,
        )
        .unwrap();
        assert_eq!(config.poll_interval_secs, 600);
        assert_eq!(config.columns.grade, "Grade");
        assert_eq!(config.columns.reviewer, "Reviewer");
        assert_eq!(config.columns.name, "ФИО");
    }

    #[test]
    fn rejects_empty_sheet_list() {
        let err = MonitorConfig::parse("sheet_gids = []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_interval() {
        let err = MonitorConfig::parse("reminder_interval_secs = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = MonitorConfig::parse("log_level = \"chatty\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = MonitorConfig::parse("poll_interval_secs = \"ten\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn relative_paths_resolve_against_data_dir() {
        let config = MonitorConfig::parse("log_file = \"logs/gw.log\"").unwrap();
        let dir = Path::new("/srv/gw");
        assert_eq!(config.entries_path(dir), dir.join("entries.json"));
        assert_eq!(config.log_path(dir), Some(dir.join("logs/gw.log")));
    }

    #[test]
    fn token_falls_back_to_token_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TOKEN_FILE), "  123:abc \n").unwrap();
        let config = MonitorConfig::default();
        if std::env::var(TOKEN_ENV).is_err() {
            assert_eq!(
                config.resolve_telegram_token(dir.path()),
                Some("123:abc".to_string())
            );
        }
    }

    #[test]
    fn redacted_masks_token() {
        let config = MonitorConfig {
            telegram_token: Some("123456:secret".to_string()),
            ..MonitorConfig::default()
        };
        assert_eq!(
            config.redacted().telegram_token.as_deref(),
            Some("1234****")
        );
    }
}
