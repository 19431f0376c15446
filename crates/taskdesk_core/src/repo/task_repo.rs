//! Active task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist `Tasks` rows together with their `TaskTags`.
//! - Load every active task in one pass for board rebuilds.
//!
//! # Invariants
//! - Write paths normalize and validate input before SQL mutations.
//! - Tag sets are replaced wholesale inside the same transaction as the row.
//! - `Completed` is never written here; completion goes through
//!   `HistoryRepository::archive_task`.

use crate::model::board::CategoryId;
use crate::model::task::{format_deadline, Task, TaskDraft, TaskId, TaskStatus};
use crate::repo::workspace_repo::ensure_row_exists;
use crate::repo::{
    parse_difficulty, parse_priority, parse_status, parse_stored_deadline, RepoError, RepoResult,
    SqliteStore,
};
use log::info;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::collections::HashMap;

/// Active task with its owning category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub category_id: CategoryId,
    pub task: Task,
}

/// Repository interface for active tasks.
pub trait TaskRepository {
    /// Inserts a `Pending` task and its tags; returns the stored task.
    fn create_task(&self, category_id: CategoryId, draft: &TaskDraft) -> RepoResult<Task>;
    /// Rewrites all editable fields and the full tag set of `task`.
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    /// Switches between `Pending` and `InProgress`.
    fn set_task_status(&self, id: TaskId, status: TaskStatus) -> RepoResult<()>;
    /// Deletes one task and its tags.
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    /// Lists every active task ordered by `id ASC`.
    fn list_tasks(&self) -> RepoResult<Vec<TaskRecord>>;
}

impl TaskRepository for SqliteStore<'_> {
    fn create_task(&self, category_id: CategoryId, draft: &TaskDraft) -> RepoResult<Task> {
        let draft = draft.normalized()?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_row_exists(&tx, "Categories", "category", category_id)?;

        let task = insert_task(&tx, category_id, &draft, TaskStatus::Pending)?;
        tx.commit()?;

        info!(
            "event=task_create module=repo status=ok category_id={category_id} task_id={} tags={}",
            task.id,
            task.tags.len()
        );
        Ok(task)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        if task.status.is_completed() {
            return Err(RepoError::InvalidData(format!(
                "task {} cannot be stored as completed; archive it instead",
                task.id
            )));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE Tasks
             SET
                description = ?2,
                difficulty = ?3,
                priority = ?4,
                status = ?5,
                deadline = ?6
             WHERE id = ?1;",
            params![
                task.id,
                task.description.as_str(),
                task.difficulty.label(),
                task.priority.label(),
                task.status.label(),
                task.deadline.map(format_deadline),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "task",
                id: task.id,
            });
        }

        tx.execute("DELETE FROM TaskTags WHERE task_id = ?1;", [task.id])?;
        insert_task_tags(&tx, task.id, &task.tags)?;
        tx.commit()?;

        info!("event=task_update module=repo status=ok task_id={}", task.id);
        Ok(())
    }

    fn set_task_status(&self, id: TaskId, status: TaskStatus) -> RepoResult<()> {
        if status.is_completed() {
            return Err(RepoError::InvalidData(format!(
                "task {id} cannot be stored as completed; archive it instead"
            )));
        }

        let changed = self.conn.execute(
            "UPDATE Tasks SET status = ?2 WHERE id = ?1;",
            params![id, status.label()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "task", id });
        }

        info!(
            "event=task_status module=repo status=ok task_id={id} new_status={}",
            status.label()
        );
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_row_exists(&tx, "Tasks", "task", id)?;
        tx.execute("DELETE FROM TaskTags WHERE task_id = ?1;", [id])?;
        tx.execute("DELETE FROM Tasks WHERE id = ?1;", [id])?;
        tx.commit()?;

        info!("event=task_delete module=repo status=ok task_id={id}");
        Ok(())
    }

    fn list_tasks(&self) -> RepoResult<Vec<TaskRecord>> {
        let mut tags = load_all_task_tags(self.conn)?;
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                description,
                category_id,
                difficulty,
                priority,
                status,
                deadline
             FROM Tasks
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let id: TaskId = row.get("id")?;
            let difficulty: String = row.get("difficulty")?;
            let priority: String = row.get("priority")?;
            let status: String = row.get("status")?;
            let task = Task {
                id,
                description: row.get("description")?,
                tags: tags.remove(&id).unwrap_or_default(),
                difficulty: parse_difficulty(&difficulty, "Tasks.difficulty")?,
                priority: parse_priority(&priority, "Tasks.priority")?,
                status: parse_status(&status, "Tasks.status")?,
                deadline: parse_stored_deadline(row.get("deadline")?, "Tasks.deadline")?,
            };
            records.push(TaskRecord {
                category_id: row.get("category_id")?,
                task,
            });
        }
        Ok(records)
    }
}

/// Inserts one task row plus tags; caller owns the transaction.
pub(crate) fn insert_task(
    conn: &Connection,
    category_id: CategoryId,
    draft: &TaskDraft,
    status: TaskStatus,
) -> RepoResult<Task> {
    conn.execute(
        "INSERT INTO Tasks (
            description,
            category_id,
            difficulty,
            priority,
            status,
            deadline
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            draft.description.as_str(),
            category_id,
            draft.difficulty.label(),
            draft.priority.label(),
            status.label(),
            draft.deadline.map(format_deadline),
        ],
    )?;
    let id = conn.last_insert_rowid();
    insert_task_tags(conn, id, &draft.tags)?;

    Ok(Task {
        id,
        description: draft.description.clone(),
        tags: draft.tags.clone(),
        difficulty: draft.difficulty,
        priority: draft.priority,
        status,
        deadline: draft.deadline,
    })
}

fn insert_task_tags(conn: &Connection, task_id: TaskId, tags: &[String]) -> RepoResult<()> {
    let mut stmt = conn.prepare("INSERT INTO TaskTags (task_id, tag) VALUES (?1, ?2);")?;
    for tag in tags {
        stmt.execute(params![task_id, tag.as_str()])?;
    }
    Ok(())
}

fn load_all_task_tags(conn: &Connection) -> RepoResult<HashMap<TaskId, Vec<String>>> {
    let mut stmt = conn.prepare("SELECT task_id, tag FROM TaskTags ORDER BY id ASC;")?;
    let mut rows = stmt.query([])?;
    let mut tags: HashMap<TaskId, Vec<String>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let task_id: TaskId = row.get(0)?;
        tags.entry(task_id).or_default().push(row.get(1)?);
    }
    Ok(tags)
}
