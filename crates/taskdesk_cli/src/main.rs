//! `taskdesk` command-line front end.
//!
//! # Responsibility
//! - Parse user actions and dispatch them into `taskdesk_core`.
//! - Render results as translated text or JSON.
//!
//! # Invariants
//! - Every failure is printed to stderr and exits with status 1.
//! - Flags override environment configuration.

mod commands;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use taskdesk_core::model::task::{parse_deadline, parse_tag_list};
use taskdesk_core::{translate, AppConfig, Difficulty, Language, Priority, TaskStatus};

#[derive(Parser)]
#[command(name = "taskdesk", author, version, about = "Workspace/category task manager")]
pub struct Cli {
    /// SQLite database file (overrides TASKDESK_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// Output language: `en` or `ru` (overrides TASKDESK_LANG)
    #[arg(long, global = true, value_parser = parse_language)]
    pub lang: Option<Language>,
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage workspaces
    Workspace {
        #[command(subcommand)]
        command: WorkspaceCommand,
    },
    /// Manage categories inside a workspace
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },
    /// Manage active tasks
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Browse and manage completed tasks
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },
    /// Tag queries
    Tags {
        #[command(subcommand)]
        command: TagsCommand,
    },
    /// Show tasks whose deadline falls inside the notice window
    Notifications {
        /// Scan date in dd-MM-yyyy form (defaults to the local date)
        #[arg(long, value_parser = parse_date)]
        today: Option<NaiveDate>,
        /// Window in days; 0 reports tasks due today only
        #[arg(long)]
        days: Option<u32>,
    },
}

#[derive(Subcommand)]
pub enum WorkspaceCommand {
    /// Create a workspace
    Add { name: String },
    /// Rename a workspace
    Rename { name: String, new_name: String },
    /// Delete a workspace with all of its categories and tasks
    Remove { name: String },
    /// List workspaces and their categories
    List,
}

#[derive(Subcommand)]
pub enum CategoryCommand {
    /// Create a category in a workspace
    Add { workspace: String, name: String },
    /// Rename a category
    Rename {
        workspace: String,
        name: String,
        new_name: String,
    },
    /// Delete a category with all of its tasks
    Remove { workspace: String, name: String },
}

/// Comma-separated tag argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagList(pub Vec<String>);

/// Workspace and category addressing one category.
#[derive(Args)]
pub struct CategoryPath {
    pub workspace: String,
    pub category: String,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Add a pending task
    Add {
        #[command(flatten)]
        path: CategoryPath,
        description: String,
        /// Comma-separated tags
        #[arg(long, value_parser = parse_tags)]
        tags: Option<TagList>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long, value_parser = parse_difficulty)]
        difficulty: Option<Difficulty>,
        /// Deadline in dd-MM-yyyy form
        #[arg(long, value_parser = parse_date)]
        deadline: Option<NaiveDate>,
    },
    /// Edit fields of an active task
    Edit {
        #[command(flatten)]
        path: CategoryPath,
        id: i64,
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated tags; replaces the current list
        #[arg(long, value_parser = parse_tags)]
        tags: Option<TagList>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long, value_parser = parse_difficulty)]
        difficulty: Option<Difficulty>,
        #[arg(long, value_parser = parse_date, conflicts_with = "clear_deadline")]
        deadline: Option<NaiveDate>,
        /// Remove the deadline
        #[arg(long)]
        clear_deadline: bool,
    },
    /// Change status; `Completed` moves the task into history
    Status {
        #[command(flatten)]
        path: CategoryPath,
        id: i64,
        #[arg(value_parser = parse_status)]
        status: TaskStatus,
    },
    /// Delete a task without keeping history
    Remove {
        #[command(flatten)]
        path: CategoryPath,
        id: i64,
    },
    /// List active tasks
    List {
        #[arg(long)]
        workspace: Option<String>,
        #[arg(long, requires = "workspace")]
        category: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommand {
    /// List completed tasks
    List,
    /// Re-create a history entry as a pending task
    Restore {
        id: i64,
        #[command(flatten)]
        path: CategoryPath,
    },
    /// Delete a history entry permanently
    Remove { id: i64 },
}

#[derive(Subcommand)]
pub enum TagsCommand {
    /// Find workspace/category pairs holding any of the tags
    Search {
        /// Tags; each value may itself be comma-separated
        #[arg(required = true)]
        tags: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let fallback_language = cli.lang.unwrap_or_default();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}: {err}", translate("Error", fallback_language));
            return ExitCode::FAILURE;
        }
    };
    let config = apply_flags(config, &cli);
    let language = config.language;

    match commands::run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_command module=cli status=error error={err}");
            eprintln!(
                "{}: {}",
                translate("Error", language),
                err.localized(language)
            );
            ExitCode::FAILURE
        }
    }
}

fn apply_flags(mut config: AppConfig, cli: &Cli) -> AppConfig {
    if let Some(db) = cli.db.as_ref() {
        config.db_path = db.clone();
    }
    if let Some(language) = cli.lang {
        config.language = language;
    }
    if let Command::Notifications {
        days: Some(days), ..
    } = &cli.command
    {
        config.notify_within_days = *days;
    }
    config
}

fn parse_language(value: &str) -> Result<Language, String> {
    Language::parse(value).ok_or_else(|| format!("expected `en` or `ru`, got `{value}`"))
}

fn parse_status(value: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(value)
        .ok_or_else(|| format!("expected Pending|In Progress|Completed, got `{value}`"))
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::parse(value).ok_or_else(|| format!("expected Low|Medium|High, got `{value}`"))
}

fn parse_difficulty(value: &str) -> Result<Difficulty, String> {
    Difficulty::parse(value).ok_or_else(|| format!("expected Easy|Medium|Hard, got `{value}`"))
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    match parse_deadline(value) {
        Ok(Some(date)) => Ok(date),
        Ok(None) => Err("date must not be blank".to_string()),
        Err(err) => Err(format!("expected dd-MM-yyyy, got `{value}`: {err}")),
    }
}

fn parse_tags(value: &str) -> Result<TagList, String> {
    Ok(TagList(parse_tag_list(value)))
}
