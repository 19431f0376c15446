//! Repository layer over the task store.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for workspaces,
//!   categories, tasks and history.
//! - Isolate SQLite query details from the in-memory board.
//!
//! # Invariants
//! - Every multi-statement mutation (cascading delete, completion, restore)
//!   runs inside one immediate transaction.
//! - Read paths reject invalid persisted state instead of masking it.
//! - All SQL is parameterized.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::task::{
    parse_deadline, Difficulty, Priority, TaskStatus, TaskValidationError,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod history_repo;
pub mod task_repo;
pub mod workspace_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task store persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Validation(TaskValidationError),
    /// Target row does not exist.
    NotFound { entity: &'static str, id: i64 },
    /// Persisted data cannot be converted into a valid record.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "task store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "task store requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidData(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

const REQUIRED_TABLES: [&str; 6] = [
    "Workspaces",
    "Categories",
    "Tasks",
    "TaskTags",
    "TaskHistory",
    "TaskHistoryTags",
];

/// SQLite-backed task store.
///
/// Implements [`workspace_repo::WorkspaceRepository`],
/// [`task_repo::TaskRepository`] and [`history_repo::HistoryRepository`].
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    /// Creates a store from a connection returned by `open_db*`.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` when the schema was tampered with.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn parse_status(value: &str, column: &'static str) -> RepoResult<TaskStatus> {
    TaskStatus::parse(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid status `{value}` in {column}")))
}

pub(crate) fn parse_priority(value: &str, column: &'static str) -> RepoResult<Priority> {
    Priority::parse(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid priority `{value}` in {column}")))
}

pub(crate) fn parse_difficulty(value: &str, column: &'static str) -> RepoResult<Difficulty> {
    Difficulty::parse(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid difficulty `{value}` in {column}"))
    })
}

pub(crate) fn parse_stored_deadline(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<NaiveDate>> {
    match value {
        None => Ok(None),
        Some(text) => parse_deadline(&text).map_err(|_| {
            RepoError::InvalidData(format!("invalid deadline `{text}` in {column}"))
        }),
    }
}
