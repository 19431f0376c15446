//! Command dispatch and output rendering.

use crate::{
    CategoryCommand, CategoryPath, Cli, Command, HistoryCommand, TagsCommand, TaskCommand,
    WorkspaceCommand,
};
use chrono::{Local, NaiveDate};
use log::info;
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use taskdesk_core::model::task::parse_tag_list;
use taskdesk_core::{
    init_logging, open_db, translate, AppConfig, BoardError, DbError, HistoryEntry, Language,
    NotificationCenter, RepoError, SqliteStore, StatusChange, Task, TaskBoard, TaskChanges,
    TaskDraft,
};

/// Failure of one CLI invocation.
#[derive(Debug)]
pub enum CliError {
    Logging(String),
    Db(DbError),
    Board(BoardError),
    Output(serde_json::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(message) => write!(f, "logging setup failed: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Board(err) => write!(f, "{err}"),
            Self::Output(err) => write!(f, "failed to render output: {err}"),
        }
    }
}

impl CliError {
    /// User-facing message. Board errors follow the UI language.
    pub fn localized(&self, language: Language) -> String {
        match self {
            Self::Board(err) => err.localized(language),
            other => other.to_string(),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Logging(_) => None,
            Self::Db(err) => Some(err),
            Self::Board(err) => Some(err),
            Self::Output(err) => Some(err),
        }
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<BoardError> for CliError {
    fn from(value: BoardError) -> Self {
        Self::Board(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Board(value.into())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

type CliResult = Result<(), CliError>;

/// Opens the store, loads the board and runs the parsed command.
pub fn run(cli: &Cli, config: &AppConfig) -> CliResult {
    if let Some(log_dir) = config.log_dir.as_ref() {
        init_logging(&config.log_level, log_dir).map_err(CliError::Logging)?;
    }

    let conn = open_db(&config.db_path)?;
    let store = SqliteStore::try_new(&conn)?;
    let mut board = TaskBoard::load(store)?;
    let out = Output {
        language: config.language,
        json: cli.json,
    };

    match &cli.command {
        Command::Workspace { command } => run_workspace(&mut board, command, &out),
        Command::Category { command } => run_category(&mut board, command, &out),
        Command::Task { command } => run_task(&mut board, command, &out),
        Command::History { command } => run_history(&mut board, command, &out),
        Command::Tags { command } => run_tags(&board, command, &out),
        Command::Notifications { today, .. } => {
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            run_notifications(&board, config, today, &out)
        }
    }
}

type Board<'conn> = TaskBoard<SqliteStore<'conn>>;

fn run_workspace(board: &mut Board<'_>, command: &WorkspaceCommand, out: &Output) -> CliResult {
    match command {
        WorkspaceCommand::Add { name } => {
            let id = board.create_workspace(name)?;
            log_command("workspace_add");
            out.done("Workspace created", json!({ "id": id }))
        }
        WorkspaceCommand::Rename { name, new_name } => {
            board.rename_workspace(name.trim(), new_name)?;
            log_command("workspace_rename");
            out.done("Workspace renamed", Value::Null)
        }
        WorkspaceCommand::Remove { name } => {
            let removed = board.delete_workspace(name.trim())?;
            log_command("workspace_remove");
            out.done(
                "Workspace deleted",
                json!({ "id": removed.id, "tasks_removed": removed.task_count() }),
            )
        }
        WorkspaceCommand::List => {
            if out.json {
                let workspaces = board.workspaces().collect::<Vec<_>>();
                return out.print_json(&json!(workspaces));
            }
            if board.workspaces().next().is_none() {
                out.line(translate("No workspaces", out.language));
                return Ok(());
            }
            for workspace in board.workspaces() {
                out.line(&workspace.name);
                for category in workspace.categories() {
                    out.line(&format!("  {} ({})", category.name, category.tasks().len()));
                }
            }
            Ok(())
        }
    }
}

fn run_category(board: &mut Board<'_>, command: &CategoryCommand, out: &Output) -> CliResult {
    match command {
        CategoryCommand::Add { workspace, name } => {
            let id = board.create_category(workspace.trim(), name)?;
            log_command("category_add");
            out.done("Category created", json!({ "id": id }))
        }
        CategoryCommand::Rename {
            workspace,
            name,
            new_name,
        } => {
            board.rename_category(workspace.trim(), name.trim(), new_name)?;
            log_command("category_rename");
            out.done("Category renamed", Value::Null)
        }
        CategoryCommand::Remove { workspace, name } => {
            let removed = board.delete_category(workspace.trim(), name.trim())?;
            log_command("category_remove");
            out.done(
                "Category deleted",
                json!({ "id": removed.id, "tasks_removed": removed.tasks().len() }),
            )
        }
    }
}

fn run_task(board: &mut Board<'_>, command: &TaskCommand, out: &Output) -> CliResult {
    match command {
        TaskCommand::Add {
            path,
            description,
            tags,
            priority,
            difficulty,
            deadline,
        } => {
            let mut draft = TaskDraft::new(description.as_str());
            if let Some(tags) = tags {
                draft = draft.with_tags(tags.0.iter().cloned());
            }
            if let Some(priority) = priority {
                draft = draft.with_priority(*priority);
            }
            if let Some(difficulty) = difficulty {
                draft = draft.with_difficulty(*difficulty);
            }
            if let Some(deadline) = deadline {
                draft = draft.with_deadline(*deadline);
            }
            let (workspace, category) = path.trimmed();
            let id = board.add_task(workspace, category, &draft)?;
            log_command("task_add");
            out.done("Task added", json!({ "id": id }))
        }
        TaskCommand::Edit {
            path,
            id,
            description,
            tags,
            priority,
            difficulty,
            deadline,
            clear_deadline,
        } => {
            let changes = TaskChanges {
                description: description.clone(),
                tags: tags.as_ref().map(|tags| tags.0.clone()),
                difficulty: *difficulty,
                priority: *priority,
                deadline: if *clear_deadline {
                    Some(None)
                } else {
                    deadline.map(Some)
                },
            };
            let (workspace, category) = path.trimmed();
            board.update_task(workspace, category, *id, &changes)?;
            log_command("task_edit");
            out.done("Task updated", json!({ "id": id }))
        }
        TaskCommand::Status { path, id, status } => {
            let (workspace, category) = path.trimmed();
            let change = board.change_task_status(workspace, category, *id, *status)?;
            log_command("task_status");
            match change {
                StatusChange::Unchanged => out.done("Status unchanged", json!({ "id": id })),
                StatusChange::Updated { from, to } => out.done(
                    "Status changed",
                    json!({ "id": id, "from": from, "to": to }),
                ),
                StatusChange::Archived(history_id) => out.done(
                    "Task moved to history",
                    json!({ "id": id, "history_id": history_id }),
                ),
            }
        }
        TaskCommand::Remove { path, id } => {
            let (workspace, category) = path.trimmed();
            board.delete_task(workspace, category, *id)?;
            log_command("task_remove");
            out.done("Task deleted", json!({ "id": id }))
        }
        TaskCommand::List {
            workspace,
            category,
        } => {
            let workspace = workspace.as_deref().map(str::trim);
            let category = category.as_deref().map(str::trim);
            if let Some(name) = workspace {
                if board.workspace(name).is_none() {
                    return Err(BoardError::WorkspaceNotFound(name.to_string()).into());
                }
                if let Some(category) = category {
                    if board.category(name, category).is_none() {
                        return Err(BoardError::CategoryNotFound {
                            workspace: name.to_string(),
                            category: category.to_string(),
                        }
                        .into());
                    }
                }
            }

            let rows = board
                .tasks()
                .filter(|(ws, _, _)| workspace.map_or(true, |name| ws.name == name))
                .filter(|(_, cat, _)| category.map_or(true, |name| cat.name == name))
                .collect::<Vec<_>>();
            if out.json {
                let rows = rows
                    .iter()
                    .map(|(ws, cat, task)| {
                        json!({ "workspace": ws.name, "category": cat.name, "task": task })
                    })
                    .collect::<Vec<_>>();
                return out.print_json(&Value::Array(rows));
            }
            if rows.is_empty() {
                out.line(translate("No matches", out.language));
            }
            for (ws, cat, task) in rows {
                out.line(&format!("{} / {}", ws.name, cat.name));
                out.line(&format!("  {}", out.task_line(task)));
            }
            Ok(())
        }
    }
}

fn run_history(board: &mut Board<'_>, command: &HistoryCommand, out: &Output) -> CliResult {
    match command {
        HistoryCommand::List => {
            if out.json {
                return out.print_json(&json!(board.history()));
            }
            if board.history().is_empty() {
                out.line(translate("History is empty", out.language));
            }
            for entry in board.history() {
                out.line(&out.history_line(entry));
            }
            Ok(())
        }
        HistoryCommand::Restore { id, path } => {
            let (workspace, category) = path.trimmed();
            let task_id = board.restore_from_history(*id, workspace, category)?;
            log_command("history_restore");
            out.done("Task restored", json!({ "id": task_id }))
        }
        HistoryCommand::Remove { id } => {
            board.delete_from_history(*id)?;
            log_command("history_remove");
            out.done("Task permanently deleted", json!({ "id": id }))
        }
    }
}

fn run_tags(board: &Board<'_>, command: &TagsCommand, out: &Output) -> CliResult {
    match command {
        TagsCommand::Search { tags } => {
            let wanted = tags
                .iter()
                .flat_map(|value| parse_tag_list(value))
                .collect::<Vec<_>>();
            let pairs = board.search_by_tags(&wanted);
            if out.json {
                let pairs = pairs
                    .iter()
                    .map(|(workspace, category)| {
                        json!({ "workspace": workspace, "category": category })
                    })
                    .collect::<Vec<_>>();
                return out.print_json(&Value::Array(pairs));
            }
            if pairs.is_empty() {
                out.line(translate("No matches", out.language));
            }
            for (workspace, category) in pairs {
                out.line(&format!("{workspace} / {category}"));
            }
            Ok(())
        }
    }
}

fn run_notifications(
    board: &Board<'_>,
    config: &AppConfig,
    today: NaiveDate,
    out: &Output,
) -> CliResult {
    let mut center = NotificationCenter::new(config.language, config.notify_within_days);
    center.check_deadlines(board, today);
    if out.json {
        return out.print_json(&json!(center.notices()));
    }
    if center.is_empty() {
        out.line(translate("No new notifications", out.language));
    }
    for notice in center.unviewed() {
        out.line(&notice.message);
    }
    center.mark_all_viewed();
    Ok(())
}

fn log_command(command: &'static str) {
    info!("event=cli_command module=cli status=ok command={command}");
}

impl CategoryPath {
    fn trimmed(&self) -> (&str, &str) {
        (self.workspace.trim(), self.category.trim())
    }
}

/// Rendering settings for one invocation.
struct Output {
    language: Language,
    json: bool,
}

impl Output {
    fn line(&self, text: &str) {
        println!("{text}");
    }

    fn print_json(&self, value: &Value) -> CliResult {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Confirms a mutation: a translated phrase, or `payload` in JSON mode.
    fn done(&self, phrase: &str, payload: Value) -> CliResult {
        if self.json {
            let mut body = json!({ "status": "ok" });
            if let (Value::Object(fields), Value::Object(extra)) = (&mut body, payload) {
                fields.extend(extra);
            }
            return self.print_json(&body);
        }
        self.line(translate(phrase, self.language));
        Ok(())
    }

    fn label(&self, phrase: &str) -> String {
        translate(phrase, self.language).to_string()
    }

    fn task_line(&self, task: &Task) -> String {
        let mut line = format!(
            "[{}] {} | {}: {} | {}: {} | {}: {}",
            task.id,
            task.description,
            self.label("Status"),
            self.label(task.status.label()),
            self.label("Priority"),
            self.label(task.priority.label()),
            self.label("Difficulty"),
            self.label(task.difficulty.label()),
        );
        if task.deadline.is_some() {
            line.push_str(&format!(
                " | {}: {}",
                self.label("Deadline"),
                task.deadline_text()
            ));
        }
        if !task.tags.is_empty() {
            line.push_str(&format!(" | {}: {}", self.label("Tags"), task.tags.join(", ")));
        }
        line
    }

    fn history_line(&self, entry: &HistoryEntry) -> String {
        let mut line = format!(
            "[{}] {} | {} / {} | {}: {}",
            entry.id,
            entry.description,
            entry.workspace_name,
            entry.category_name,
            self.label("Completed at"),
            entry.completed_at,
        );
        if !entry.tags.is_empty() {
            line.push_str(&format!(" | {}: {}", self.label("Tags"), entry.tags.join(", ")));
        }
        line
    }
}
