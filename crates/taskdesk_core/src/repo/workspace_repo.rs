//! Workspace/category repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist workspace and category rows.
//! - Own cascading deletes (workspace -> categories -> tasks -> tags).
//!
//! # Invariants
//! - Cascades delete children before parents inside one transaction, so a
//!   failure leaves no partial deletion behind.
//! - Listing is deterministic: `id ASC`.

use crate::model::board::{CategoryId, WorkspaceId};
use crate::repo::{RepoError, RepoResult, SqliteStore};
use log::info;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};

/// Workspace row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceRecord {
    pub id: WorkspaceId,
    pub name: String,
}

/// Category row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub id: CategoryId,
    pub workspace_id: WorkspaceId,
    pub name: String,
}

/// Repository interface for the workspace/category hierarchy.
pub trait WorkspaceRepository {
    fn create_workspace(&self, name: &str) -> RepoResult<WorkspaceRecord>;
    fn rename_workspace(&self, id: WorkspaceId, name: &str) -> RepoResult<()>;
    /// Deletes the workspace with all of its categories, tasks and tags.
    fn delete_workspace(&self, id: WorkspaceId) -> RepoResult<()>;
    fn list_workspaces(&self) -> RepoResult<Vec<WorkspaceRecord>>;
    fn create_category(&self, workspace_id: WorkspaceId, name: &str)
        -> RepoResult<CategoryRecord>;
    fn rename_category(&self, id: CategoryId, name: &str) -> RepoResult<()>;
    /// Deletes the category with all of its tasks and tags.
    fn delete_category(&self, id: CategoryId) -> RepoResult<()>;
    fn list_categories(&self) -> RepoResult<Vec<CategoryRecord>>;
}

impl WorkspaceRepository for SqliteStore<'_> {
    fn create_workspace(&self, name: &str) -> RepoResult<WorkspaceRecord> {
        self.conn
            .execute("INSERT INTO Workspaces (name) VALUES (?1);", [name])?;
        let id = self.conn.last_insert_rowid();
        info!("event=workspace_create module=repo status=ok workspace_id={id}");
        Ok(WorkspaceRecord {
            id,
            name: name.to_string(),
        })
    }

    fn rename_workspace(&self, id: WorkspaceId, name: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE Workspaces SET name = ?2 WHERE id = ?1;",
            params![id, name],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "workspace",
                id,
            });
        }
        Ok(())
    }

    fn delete_workspace(&self, id: WorkspaceId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_row_exists(&tx, "Workspaces", "workspace", id)?;

        let tags = tx.execute(
            "DELETE FROM TaskTags
             WHERE task_id IN (
                SELECT t.id
                FROM Tasks t
                INNER JOIN Categories c ON c.id = t.category_id
                WHERE c.workspace_id = ?1
             );",
            [id],
        )?;
        let tasks = tx.execute(
            "DELETE FROM Tasks
             WHERE category_id IN (SELECT id FROM Categories WHERE workspace_id = ?1);",
            [id],
        )?;
        let categories = tx.execute("DELETE FROM Categories WHERE workspace_id = ?1;", [id])?;
        tx.execute("DELETE FROM Workspaces WHERE id = ?1;", [id])?;
        tx.commit()?;

        info!(
            "event=workspace_delete module=repo status=ok workspace_id={id} categories={categories} tasks={tasks} tags={tags}"
        );
        Ok(())
    }

    fn list_workspaces(&self) -> RepoResult<Vec<WorkspaceRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM Workspaces ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut workspaces = Vec::new();
        while let Some(row) = rows.next()? {
            workspaces.push(WorkspaceRecord {
                id: row.get("id")?,
                name: row.get("name")?,
            });
        }
        Ok(workspaces)
    }

    fn create_category(
        &self,
        workspace_id: WorkspaceId,
        name: &str,
    ) -> RepoResult<CategoryRecord> {
        ensure_row_exists(self.conn, "Workspaces", "workspace", workspace_id)?;
        self.conn.execute(
            "INSERT INTO Categories (name, workspace_id) VALUES (?1, ?2);",
            params![name, workspace_id],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(
            "event=category_create module=repo status=ok workspace_id={workspace_id} category_id={id}"
        );
        Ok(CategoryRecord {
            id,
            workspace_id,
            name: name.to_string(),
        })
    }

    fn rename_category(&self, id: CategoryId, name: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE Categories SET name = ?2 WHERE id = ?1;",
            params![id, name],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "category",
                id,
            });
        }
        Ok(())
    }

    fn delete_category(&self, id: CategoryId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_row_exists(&tx, "Categories", "category", id)?;

        let tags = tx.execute(
            "DELETE FROM TaskTags
             WHERE task_id IN (SELECT id FROM Tasks WHERE category_id = ?1);",
            [id],
        )?;
        let tasks = tx.execute("DELETE FROM Tasks WHERE category_id = ?1;", [id])?;
        tx.execute("DELETE FROM Categories WHERE id = ?1;", [id])?;
        tx.commit()?;

        info!(
            "event=category_delete module=repo status=ok category_id={id} tasks={tasks} tags={tags}"
        );
        Ok(())
    }

    fn list_categories(&self) -> RepoResult<Vec<CategoryRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, workspace_id, name FROM Categories ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(CategoryRecord {
                id: row.get("id")?,
                workspace_id: row.get("workspace_id")?,
                name: row.get("name")?,
            });
        }
        Ok(categories)
    }
}

/// Fails with `NotFound` when no row with `id` exists in `table`.
///
/// `table` is always a crate constant, never user input.
pub(crate) fn ensure_row_exists(
    conn: &Connection,
    table: &'static str,
    entity: &'static str,
    id: i64,
) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
        [id],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(RepoError::NotFound { entity, id })
    }
}
