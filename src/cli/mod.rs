mod run;

use anyhow::Result;
use console::style;

use crate::core::config::MonitorConfig;
use crate::core::monitor::Record;
use crate::core::terminal::{self, GuideSection, print_error};
use crate::platform::{NativePlatform, Platform};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Core")
        .command("run", "Start the Telegram bot (default)")
        .command("check", "Look up one submission in the sheets")
        .print();

    GuideSection::new("Watch-list")
        .command("list", "Show tracked submissions")
        .print();

    GuideSection::new("Diagnostics")
        .command("config", "Print the resolved configuration")
        .command("help", "Show this help")
        .print();

    println!(
        "\n {} {} <command> [flags]\n",
        style("Usage:").bold(),
        style("gradewatch").green()
    );
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CheckCommandArgs {
    pub timestamp: Option<String>,
    pub name: Option<String>,
    pub task: Option<String>,
}

impl CheckCommandArgs {
    /// All three fields, or the first missing flag.
    pub(crate) fn record(&self) -> Result<Record, &'static str> {
        match (&self.timestamp, &self.name, &self.task) {
            (None, _, _) => Err("--timestamp"),
            (_, None, _) => Err("--name"),
            (_, _, None) => Err("--task"),
            (Some(timestamp), Some(name), Some(task)) => {
                Ok(Record::new(timestamp.as_str(), name.as_str(), task.as_str()))
            }
        }
    }
}

pub(crate) fn parse_check_command_args(args: &[String], start: usize) -> CheckCommandArgs {
    let mut parsed = CheckCommandArgs::default();
    let mut i = start;
    while i < args.len() {
        let slot = match args[i].as_str() {
            "--timestamp" | "-t" => Some(&mut parsed.timestamp),
            "--name" | "-n" => Some(&mut parsed.name),
            "--task" | "-k" => Some(&mut parsed.task),
            _ => None,
        };
        match slot {
            Some(slot) if i + 1 < args.len() => {
                *slot = Some(args[i + 1].trim().to_string());
                i += 2;
            }
            _ => i += 1,
        }
    }
    parsed
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let data_dir = NativePlatform::data_dir();
    let cmd = args.get(1).map(String::as_str).unwrap_or("run");

    if matches!(cmd, "help" | "--help" | "-h") {
        print_help();
        return Ok(());
    }

    let config = MonitorConfig::load(&data_dir).await?;
    run::init_logging(&config, &data_dir)?;

    match cmd {
        "run" => run::run_bot(config, data_dir).await,
        "check" => {
            let parsed = parse_check_command_args(&args, 2);
            match parsed.record() {
                Ok(record) => run::run_check(&config, &data_dir, record).await,
                Err(flag) => {
                    print_error(&format!("Error: {} is required for check.", flag));
                    print_help();
                    Ok(())
                }
            }
        }
        "list" => run::run_list(&config, &data_dir).await,
        "config" => run::print_config(&config, &data_dir),
        other => {
            print_error(&format!("Unknown command '{}'.", other));
            print_help();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn check_args_collect_all_three_fields() {
        let parsed = parse_check_command_args(
            &args(&[
                "gradewatch",
                "check",
                "--timestamp",
                "2025-05-25 18:39:30",
                "-n",
                " A. Name ",
                "--task",
                "task-1",
            ]),
            2,
        );
        assert_eq!(
            parsed.record(),
            Ok(Record::new("2025-05-25 18:39:30", "A. Name", "task-1"))
        );
    }

    #[test]
    fn check_args_report_first_missing_flag() {
        let parsed = parse_check_command_args(&args(&["gradewatch", "check", "--task", "t"]), 2);
        assert_eq!(parsed.record(), Err("--timestamp"));

        let parsed = parse_check_command_args(
            &args(&["gradewatch", "check", "--timestamp", "x", "--task", "t"]),
            2,
        );
        assert_eq!(parsed.record(), Err("--name"));
    }

    #[test]
    fn dangling_flag_is_ignored() {
        let parsed = parse_check_command_args(&args(&["gradewatch", "check", "--name"]), 2);
        assert_eq!(parsed, CheckCommandArgs::default());
    }

    #[test]
    fn unknown_flags_are_skipped() {
        let parsed = parse_check_command_args(
            &args(&["gradewatch", "check", "--verbose", "-k", "task-2"]),
            2,
        );
        assert_eq!(parsed.task.as_deref(), Some("task-2"));
        assert!(parsed.name.is_none());
    }
}
