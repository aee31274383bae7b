use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode, UserId};
use teloxide::utils::markdown::{code_block, code_inline, escape};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::core::error::NotifyError;
use crate::core::lifecycle::LifecycleComponent;
use crate::core::monitor::{
    AddOutcome, MonitorController, Notice, Notifier, Record, RemoveOutcome,
    StartOutcome, Status, StopOutcome,
};

const ENTRY_EXAMPLE: &str = "25.05.2025 18:39:30\nСоляник Егор Юрьевич\nsocow-vector";

const HELP_TEXT: &str = "\
gradewatch bot

Available commands:
/monitor - Start monitoring
/stop - Stop monitoring and reminders
/addentry - Track a new submission
/delentry - Stop tracking a submission
/listentries - Show tracked submissions
/status - Show monitoring status
/info - About this bot
/help - Show this help";

const INFO_TEXT: &str = "\
gradewatch bot
Version: 0.1.0

Watches the course grading spreadsheet and tells you when your submission \
is picked up for review and when it gets a grade.";

/// Which multi-line reply a sender owes us after /addentry or /delentry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingInput {
    Add,
    Delete,
}

/// Chat plus sender. Messages without a sender (channel posts) share the
/// chat-wide slot.
type PendingKey = (ChatId, Option<UserId>);

#[derive(Debug, Default)]
struct PendingInputs {
    waiting: HashMap<PendingKey, PendingInput>,
}

impl PendingInputs {
    fn wait_for(&mut self, key: PendingKey, input: PendingInput) {
        self.waiting.insert(key, input);
    }

    fn get(&self, key: &PendingKey) -> Option<PendingInput> {
        self.waiting.get(key).copied()
    }

    fn clear(&mut self, key: &PendingKey) {
        self.waiting.remove(key);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryParseError {
    #[error("expected exactly three lines (timestamp, name, task), got {0}")]
    LineCount(usize),
    #[error("line {0} is empty")]
    EmptyLine(usize),
}

/// Parse the three-line `timestamp / name / task` reply. Lines are trimmed.
pub fn parse_entry_lines(text: &str) -> Result<Record, EntryParseError> {
    let lines: Vec<&str> = text.trim().lines().map(str::trim).collect();
    if lines.len() != 3 {
        return Err(EntryParseError::LineCount(lines.len()));
    }
    if let Some(pos) = lines.iter().position(|line| line.is_empty()) {
        return Err(EntryParseError::EmptyLine(pos + 1));
    }
    Ok(Record::new(lines[0], lines[1], lines[2]))
}

/// MarkdownV2 rendering of a notice.
pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::OnReview(r) => format!(
            "Submission {} for {} is on review{}",
            code_inline(&r.task),
            code_inline(&r.name),
            escape("!")
        ),
        Notice::Checked(r) => format!(
            "Submission {} for {} has been graded{} Monitoring stopped{}",
            code_inline(&r.task),
            code_inline(&r.name),
            escape("!"),
            escape(".")
        ),
        Notice::Reminder(_) => escape(&notice.text()),
    }
}

fn entry_block(record: &Record) -> String {
    code_block(&format!("{}\n{}\n{}", record.timestamp, record.name, record.task))
}

/// Sends notices to the chat that started monitoring.
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError> {
        self.bot
            .send_message(self.chat_id, render_notice(notice))
            .parse_mode(ParseMode::MarkdownV2)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        Ok(())
    }
}

pub struct TelegramInterface {
    token: String,
    controller: MonitorController,
    pending: Arc<Mutex<PendingInputs>>,
}

impl TelegramInterface {
    pub fn new(token: String, controller: MonitorController) -> Self {
        Self {
            token,
            controller,
            pending: Arc::new(Mutex::new(PendingInputs::default())),
        }
    }

    async fn start_bot(&self) -> Result<()> {
        let bot_client = Bot::new(&self.token);

        let commands = vec![
            teloxide::types::BotCommand::new("monitor", "Start monitoring"),
            teloxide::types::BotCommand::new("stop", "Stop monitoring and reminders"),
            teloxide::types::BotCommand::new("addentry", "Track a new submission"),
            teloxide::types::BotCommand::new("delentry", "Stop tracking a submission"),
            teloxide::types::BotCommand::new("listentries", "Show tracked submissions"),
            teloxide::types::BotCommand::new("status", "Show monitoring status"),
            teloxide::types::BotCommand::new("info", "About this bot"),
            teloxide::types::BotCommand::new("help", "Show all available commands"),
        ];
        if let Err(e) = bot_client.set_my_commands(commands).await {
            error!("Failed to set telegram bot commands: {}", e);
        }

        let controller = self.controller.clone();
        let pending = self.pending.clone();

        tokio::spawn(async move {
            teloxide::repl(bot_client, move |bot: Bot, msg: Message| {
                let controller = controller.clone();
                let pending = pending.clone();
                async move {
                    let key = (msg.chat.id, msg.from.as_ref().map(|user| user.id));
                    if let Some(text) = msg.text()
                        && let Err(e) = handle_text(&bot, key, text, &controller, &pending).await
                    {
                        error!("Failed to handle telegram message: {}", e);
                    }
                    Ok(())
                }
            })
            .await;
        });
        Ok(())
    }
}

/// Strips the `@botname` suffix Telegram appends in group chats.
fn command_name(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    if !first.starts_with('/') {
        return None;
    }
    Some(first.split('@').next().unwrap_or(first))
}

async fn handle_text(
    bot: &Bot,
    key: PendingKey,
    text: &str,
    controller: &MonitorController,
    pending: &Mutex<PendingInputs>,
) -> Result<()> {
    let chat_id = key.0;
    match command_name(text) {
        Some("/start") | Some("/help") => reply(bot, chat_id, HELP_TEXT).await,
        Some("/info") => reply(bot, chat_id, INFO_TEXT).await,
        Some("/monitor") => {
            let notifier = Arc::new(TelegramNotifier::new(bot.clone(), chat_id));
            match controller.start(notifier).await {
                StartOutcome::Started => {
                    info!("Monitoring started by chat {}", chat_id);
                    reply(bot, chat_id, "Monitoring started!").await
                }
                StartOutcome::AlreadyRunning => {
                    reply(bot, chat_id, "Monitoring is already running.").await
                }
            }
        }
        Some("/stop") => match controller.stop().await {
            StopOutcome::Stopped => {
                info!("Monitoring and reminders stopped by chat {}", chat_id);
                reply(bot, chat_id, "Monitoring and reminders stopped.").await
            }
            StopOutcome::NotRunning => reply(bot, chat_id, "Monitoring is not running.").await,
        },
        Some("/addentry") => {
            pending.lock().await.wait_for(key, PendingInput::Add);
            reply(
                bot,
                chat_id,
                "Send exactly three lines: timestamp, name, task.\nExample:",
            )
            .await?;
            reply_markdown(bot, chat_id, &code_block(ENTRY_EXAMPLE)).await
        }
        Some("/delentry") => {
            if controller.list().await.is_empty() {
                return reply(bot, chat_id, "No tracked submissions to delete.").await;
            }
            pending.lock().await.wait_for(key, PendingInput::Delete);
            reply(
                bot,
                chat_id,
                "Send the submission to delete (three lines: timestamp, name, task):",
            )
            .await
        }
        Some("/listentries") => {
            let entries = controller.list().await;
            if entries.is_empty() {
                return reply(bot, chat_id, "No tracked submissions.").await;
            }
            reply(bot, chat_id, "Currently tracked submissions:").await?;
            let blocks: Vec<String> = entries.iter().map(entry_block).collect();
            reply_markdown(bot, chat_id, &blocks.join("\n")).await
        }
        Some("/status") => {
            let status = controller.status().await;
            let text = format!(
                "Polling: {}\nReminders: {}\nState: {}\nTracked: {}",
                if status.polling { "running" } else { "off" },
                if status.reminding { "running" } else { "off" },
                status.state.as_str(),
                controller.list().await.len()
            );
            reply(bot, chat_id, &text).await
        }
        _ => {
            let waiting = pending.lock().await.get(&key);
            match waiting {
                Some(PendingInput::Delete) => {
                    pending.lock().await.clear(&key);
                    handle_delete(bot, chat_id, text, controller).await
                }
                Some(PendingInput::Add) => handle_add(bot, key, text, controller, pending).await,
                None => Ok(()),
            }
        }
    }
}

async fn handle_add(
    bot: &Bot,
    key: PendingKey,
    text: &str,
    controller: &MonitorController,
    pending: &Mutex<PendingInputs>,
) -> Result<()> {
    let chat_id = key.0;
    let record = match parse_entry_lines(text) {
        Ok(record) => record,
        Err(e) => {
            reply(bot, chat_id, &format!("Error: {}.\nExample:", e)).await?;
            return reply_markdown(bot, chat_id, &code_block(ENTRY_EXAMPLE)).await;
        }
    };

    reply(bot, chat_id, "Checking the sheets...").await?;
    let outcome = controller.add(record).await;
    pending.lock().await.clear(&key);

    let text = match outcome {
        Ok(AddOutcome::Added(Status::OnReview)) => {
            "This submission is already on review; it is now tracked."
        }
        Ok(AddOutcome::Added(_)) => "Submission added to monitoring.",
        Ok(AddOutcome::AlreadyTracked) => "This submission is already tracked.",
        Ok(AddOutcome::NotFoundRemotely) => {
            "This submission is not in any of the sheets. Nothing added."
        }
        Ok(AddOutcome::AlreadyChecked) => "This submission is already graded. Nothing added.",
        Err(e) => {
            error!("Failed to save tracked entries: {}", e);
            "Could not save the watch-list. Try again later."
        }
    };
    reply(bot, chat_id, text).await
}

async fn handle_delete(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    controller: &MonitorController,
) -> Result<()> {
    let record = match parse_entry_lines(text) {
        Ok(record) => record,
        Err(e) => return reply(bot, chat_id, &format!("Error: {}.", e)).await,
    };

    match controller.remove(&record).await {
        Ok(RemoveOutcome::Removed) => {
            reply(bot, chat_id, "Submission removed:").await?;
            reply_markdown(bot, chat_id, &entry_block(&record)).await
        }
        Ok(RemoveOutcome::NotFound) => {
            reply(bot, chat_id, "That submission is not in the tracked list.").await
        }
        Err(e) => {
            error!("Failed to save tracked entries: {}", e);
            reply(bot, chat_id, "Could not save the watch-list. Try again later.").await
        }
    }
}

async fn reply(bot: &Bot, chat_id: ChatId, text: &str) -> Result<()> {
    reply_markdown(bot, chat_id, &escape(text)).await
}

async fn reply_markdown(bot: &Bot, chat_id: ChatId, markdown: &str) -> Result<()> {
    bot.send_message(chat_id, markdown)
        .parse_mode(ParseMode::MarkdownV2)
        .await?;
    Ok(())
}

#[async_trait]
impl LifecycleComponent for TelegramInterface {
    async fn on_init(&mut self) -> Result<()> {
        info!("Telegram Interface initializing...");
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        info!("Telegram Interface starting...");
        if let Err(e) = self.start_bot().await {
            error!("Telegram Bot crashed: {}", e);
        }
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("Telegram Interface shutting down...");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_trimmed_lines() {
        let record =
            parse_entry_lines("  25.05.2025 18:39:30 \r\n Соляник Егор Юрьевич\nsocow-vector\n")
                .unwrap();
        assert_eq!(
            record,
            Record::new("25.05.2025 18:39:30", "Соляник Егор Юрьевич", "socow-vector")
        );
    }

    #[test]
    fn rejects_wrong_line_count() {
        assert_eq!(
            parse_entry_lines("one\ntwo"),
            Err(EntryParseError::LineCount(2))
        );
        assert_eq!(
            parse_entry_lines("a\nb\nc\nd"),
            Err(EntryParseError::LineCount(4))
        );
    }

    #[test]
    fn rejects_blank_middle_line() {
        assert_eq!(
            parse_entry_lines("a\n   \nc"),
            Err(EntryParseError::EmptyLine(2))
        );
    }

    #[test]
    fn pending_input_belongs_to_its_sender() {
        let chat = ChatId(-100);
        let alice = (chat, Some(UserId(1)));
        let bob = (chat, Some(UserId(2)));
        let mut pending = PendingInputs::default();

        pending.wait_for(alice, PendingInput::Add);
        assert_eq!(pending.get(&alice), Some(PendingInput::Add));
        assert_eq!(pending.get(&bob), None);
        assert_eq!(pending.get(&(ChatId(7), Some(UserId(1)))), None);

        pending.wait_for(bob, PendingInput::Delete);
        pending.clear(&alice);
        assert_eq!(pending.get(&alice), None);
        assert_eq!(pending.get(&bob), Some(PendingInput::Delete));
    }

    #[test]
    fn command_name_strips_bot_suffix() {
        assert_eq!(command_name("/monitor@gradewatch_bot"), Some("/monitor"));
        assert_eq!(command_name("  /stop now"), Some("/stop"));
        assert_eq!(command_name("25.05.2025 18:39:30"), None);
        assert_eq!(command_name(""), None);
    }

    #[test]
    fn on_review_notice_escapes_markdown() {
        let record = Record::new("t", "A. Name", "task-1");
        assert_eq!(
            render_notice(&Notice::OnReview(record)),
            "Submission `task-1` for `A. Name` is on review\\!"
        );
    }

    #[test]
    fn checked_notice_mentions_stop() {
        let record = Record::new("t", "A. Name", "task-1");
        assert_eq!(
            render_notice(&Notice::Checked(record)),
            "Submission `task-1` for `A. Name` has been graded\\! Monitoring stopped\\."
        );
    }

    #[test]
    fn reminder_notice_is_fully_escaped() {
        let record = Record::new("t", "A. Name", "task-1");
        assert_eq!(
            render_notice(&Notice::Reminder(record)),
            "Submission 'task\\-1' for A\\. Name has been graded\\!"
        );
    }
}
