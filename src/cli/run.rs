use anyhow::{Context, Result, anyhow};
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::core::config::{CONFIG_FILE, MonitorConfig, TOKEN_ENV, TOKEN_FILE};
use crate::core::lifecycle::LifecycleManager;
use crate::core::monitor::{
    Celebration, GoogleSheetSource, ImageCelebration, JsonFilePersistence, MonitorContext,
    MonitorController, MonitorTiming, NoCelebration, Record, RecordStore, Status,
    StatusClassifier,
};
use crate::core::terminal::{self, GuideSection};
use crate::interfaces::telegram::TelegramInterface;
use crate::logging;
use crate::platform::{NativePlatform, Platform};

pub(crate) fn build_controller(config: &MonitorConfig, data_dir: &Path) -> Result<MonitorController> {
    let persistence = JsonFilePersistence::new(config.entries_path(data_dir));
    let store = Arc::new(RecordStore::new(Arc::new(persistence)));

    let source = GoogleSheetSource::new(config.spreadsheet_id.clone(), config.request_timeout())
        .context("Failed to build HTTP client")?;

    let celebration: Arc<dyn Celebration> = match &config.image_path {
        Some(path) => Arc::new(ImageCelebration::new(data_dir.join(path))),
        None => Arc::new(NoCelebration),
    };

    let ctx = MonitorContext::new(
        store,
        Arc::new(source),
        config.sheet_gids.clone(),
        StatusClassifier::new(config.columns.clone()),
        celebration,
    );
    let timing = MonitorTiming {
        poll_interval: config.poll_interval(),
        reminder_interval: config.reminder_interval(),
    };
    Ok(MonitorController::new(ctx, timing))
}

/// Installs the logger. Runs for every command, not just `run`.
pub(crate) fn init_logging(config: &MonitorConfig, data_dir: &Path) -> Result<()> {
    let log_path = config.log_path(data_dir);
    logging::init(config.level()?, log_path.as_deref())?;
    if !MonitorConfig::exists_in(data_dir) {
        info!("No {} in {}, using defaults.", CONFIG_FILE, data_dir.display());
    }
    Ok(())
}

pub(crate) async fn run_bot(config: MonitorConfig, data_dir: PathBuf) -> Result<()> {
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    NativePlatform::restrict_dir_permissions(&data_dir);

    let token = config.resolve_telegram_token(&data_dir).ok_or_else(|| {
        anyhow!(
            "No Telegram bot token. Set {}, telegram_token in config.toml, or {}/{}",
            TOKEN_ENV,
            data_dir.display(),
            TOKEN_FILE
        )
    })?;

    let controller = build_controller(&config, &data_dir)?;

    let mut lifecycle = LifecycleManager::new();
    lifecycle.attach(Arc::new(Mutex::new(controller.clone())));
    lifecycle.attach(Arc::new(Mutex::new(TelegramInterface::new(
        token, controller,
    ))));

    terminal::print_banner();
    lifecycle.start().await?;

    GuideSection::new("Bot")
        .status("Data dir", &data_dir.display().to_string())
        .status("Sheets", &config.sheet_gids.join(", "))
        .status(
            "Intervals",
            &format!(
                "poll {}s, reminder {}s",
                config.poll_interval_secs, config.reminder_interval_secs
            ),
        )
        .blank()
        .status(
            "Press Ctrl+C to stop the bot.",
            &format!("{}", style("Ctrl+C").bold().yellow()),
        )
        .print();
    println!();

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");
    lifecycle.shutdown().await?;
    terminal::print_goodbye();
    Ok(())
}

pub(crate) async fn run_check(
    config: &MonitorConfig,
    data_dir: &Path,
    record: Record,
) -> Result<()> {
    let controller = build_controller(config, data_dir)?;
    terminal::print_info(&format!("Checking {}", record));
    let status = controller.check(&record).await;
    let line = format!("{}: {}", record, status);
    match status {
        Status::Checked => terminal::print_success(&line),
        Status::OnReview | Status::Exists => terminal::print_status("Status", &line),
        Status::NotFound => terminal::print_warn(&line),
    }
    Ok(())
}

pub(crate) async fn run_list(config: &MonitorConfig, data_dir: &Path) -> Result<()> {
    let controller = build_controller(config, data_dir)?;
    let entries = controller.list().await;
    if entries.is_empty() {
        terminal::print_info("No tracked submissions.");
        return Ok(());
    }
    let mut section = GuideSection::new("Tracked submissions");
    for (i, record) in entries.iter().enumerate() {
        section = section.text(&format!("{}. {}", i + 1, record));
    }
    section.print();
    Ok(())
}

pub(crate) fn print_config(config: &MonitorConfig, data_dir: &Path) -> Result<()> {
    let rendered = toml::to_string_pretty(&config.redacted())?;
    GuideSection::new("Configuration")
        .status("Data dir", &data_dir.display().to_string())
        .status(
            "Token",
            if config.resolve_telegram_token(data_dir).is_some() {
                "found"
            } else {
                "missing"
            },
        )
        .print();
    println!("\n{}", rendered);
    Ok(())
}
