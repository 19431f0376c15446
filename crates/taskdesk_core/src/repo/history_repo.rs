//! Completed-task history repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Move tasks into `TaskHistory` on completion.
//! - Restore history entries as new active tasks, or delete them for good.
//!
//! # Invariants
//! - Archive and restore are single transactions: the row exists in exactly
//!   one of `Tasks`/`TaskHistory` at every commit point.
//! - History tags live in `TaskHistoryTags`, never in `TaskTags`.

use crate::model::board::{CategoryId, HistoryEntry, HistoryId};
use crate::model::task::{format_deadline, Task, TaskStatus};
use crate::repo::task_repo::insert_task;
use crate::repo::workspace_repo::ensure_row_exists;
use crate::repo::{
    parse_difficulty, parse_priority, parse_status, parse_stored_deadline, RepoResult,
    SqliteStore,
};
use log::info;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;

const HISTORY_SELECT_SQL: &str = "SELECT
    id,
    category_id,
    workspace_name,
    category_name,
    description,
    difficulty,
    priority,
    status,
    deadline,
    completed_at
FROM TaskHistory";

/// Where an archived task used to live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOrigin<'a> {
    pub category_id: CategoryId,
    pub workspace_name: &'a str,
    pub category_name: &'a str,
}

/// Repository interface for task history.
pub trait HistoryRepository {
    /// Snapshots `task` as completed and deletes the active row and its tags.
    fn archive_task(&self, task: &Task, origin: ArchiveOrigin<'_>) -> RepoResult<HistoryEntry>;
    /// Lists history in completion order.
    fn list_history(&self) -> RepoResult<Vec<HistoryEntry>>;
    /// Re-creates the entry as a `Pending` task in `category_id` and removes
    /// the entry. Returns the new active task.
    fn restore_history_entry(&self, id: HistoryId, category_id: CategoryId) -> RepoResult<Task>;
    /// Permanently deletes the entry and its tags.
    fn delete_history_entry(&self, id: HistoryId) -> RepoResult<()>;
}

impl HistoryRepository for SqliteStore<'_> {
    fn archive_task(&self, task: &Task, origin: ArchiveOrigin<'_>) -> RepoResult<HistoryEntry> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_row_exists(&tx, "Tasks", "task", task.id)?;

        tx.execute(
            "INSERT INTO TaskHistory (
                description,
                category_id,
                workspace_name,
                category_name,
                difficulty,
                priority,
                status,
                deadline
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                task.description.as_str(),
                origin.category_id,
                origin.workspace_name,
                origin.category_name,
                task.difficulty.label(),
                task.priority.label(),
                TaskStatus::Completed.label(),
                task.deadline.map(format_deadline),
            ],
        )?;
        let history_id = tx.last_insert_rowid();
        {
            let mut stmt =
                tx.prepare("INSERT INTO TaskHistoryTags (history_id, tag) VALUES (?1, ?2);")?;
            for tag in &task.tags {
                stmt.execute(params![history_id, tag.as_str()])?;
            }
        }

        tx.execute("DELETE FROM TaskTags WHERE task_id = ?1;", [task.id])?;
        tx.execute("DELETE FROM Tasks WHERE id = ?1;", [task.id])?;

        let entry = load_history_entry(&tx, history_id)?;
        tx.commit()?;

        info!(
            "event=task_complete module=repo status=ok task_id={} history_id={history_id}",
            task.id
        );
        Ok(entry)
    }

    fn list_history(&self) -> RepoResult<Vec<HistoryEntry>> {
        let mut tags = load_history_tags(self.conn, None)?;
        let mut stmt = self
            .conn
            .prepare(&format!("{HISTORY_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let mut entry = parse_history_row(row)?;
            entry.tags = tags.remove(&entry.id).unwrap_or_default();
            entries.push(entry);
        }
        Ok(entries)
    }

    fn restore_history_entry(&self, id: HistoryId, category_id: CategoryId) -> RepoResult<Task> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let entry = load_history_entry(&tx, id)?;
        ensure_row_exists(&tx, "Categories", "category", category_id)?;

        let task = insert_task(&tx, category_id, &entry.to_draft(), TaskStatus::Pending)?;
        tx.execute("DELETE FROM TaskHistoryTags WHERE history_id = ?1;", [id])?;
        tx.execute("DELETE FROM TaskHistory WHERE id = ?1;", [id])?;
        tx.commit()?;

        info!(
            "event=history_restore module=repo status=ok history_id={id} task_id={} category_id={category_id}",
            task.id
        );
        Ok(task)
    }

    fn delete_history_entry(&self, id: HistoryId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_row_exists(&tx, "TaskHistory", "history entry", id)?;
        tx.execute("DELETE FROM TaskHistoryTags WHERE history_id = ?1;", [id])?;
        tx.execute("DELETE FROM TaskHistory WHERE id = ?1;", [id])?;
        tx.commit()?;

        info!("event=history_delete module=repo status=ok history_id={id}");
        Ok(())
    }
}

fn load_history_entry(conn: &Connection, id: HistoryId) -> RepoResult<HistoryEntry> {
    ensure_row_exists(conn, "TaskHistory", "history entry", id)?;
    let mut entry = conn.query_row(
        &format!("{HISTORY_SELECT_SQL} WHERE id = ?1;"),
        [id],
        |row| Ok(parse_history_row(row)),
    )??;
    entry.tags = load_history_tags(conn, Some(id))?
        .remove(&id)
        .unwrap_or_default();
    Ok(entry)
}

fn load_history_tags(
    conn: &Connection,
    only: Option<HistoryId>,
) -> RepoResult<HashMap<HistoryId, Vec<String>>> {
    let mut stmt = conn.prepare(
        "SELECT history_id, tag
         FROM TaskHistoryTags
         WHERE ?1 IS NULL OR history_id = ?1
         ORDER BY id ASC;",
    )?;
    let mut rows = stmt.query([only])?;
    let mut tags: HashMap<HistoryId, Vec<String>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let history_id: HistoryId = row.get(0)?;
        tags.entry(history_id).or_default().push(row.get(1)?);
    }
    Ok(tags)
}

fn parse_history_row(row: &Row<'_>) -> RepoResult<HistoryEntry> {
    let difficulty: String = row.get("difficulty")?;
    let priority: String = row.get("priority")?;
    let status: String = row.get("status")?;

    Ok(HistoryEntry {
        id: row.get("id")?,
        category_id: row.get("category_id")?,
        workspace_name: row.get("workspace_name")?,
        category_name: row.get("category_name")?,
        description: row.get("description")?,
        tags: Vec::new(),
        difficulty: parse_difficulty(&difficulty, "TaskHistory.difficulty")?,
        priority: parse_priority(&priority, "TaskHistory.priority")?,
        status: parse_status(&status, "TaskHistory.status")?,
        deadline: parse_stored_deadline(row.get("deadline")?, "TaskHistory.deadline")?,
        completed_at: row.get("completed_at")?,
    })
}
