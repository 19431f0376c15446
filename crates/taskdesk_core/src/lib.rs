//! Core domain logic for TaskDesk.
//! This crate is the single source of truth for board invariants.

pub mod config;
pub mod db;
pub mod i18n;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use i18n::{deadline_message, translate, Language};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::board::{Category, CategoryId, HistoryEntry, HistoryId, Workspace, WorkspaceId};
pub use model::task::{
    Difficulty, Priority, Task, TaskChanges, TaskDraft, TaskId, TaskStatus, TaskValidationError,
};
pub use repo::history_repo::{ArchiveOrigin, HistoryRepository};
pub use repo::task_repo::{TaskRecord, TaskRepository};
pub use repo::workspace_repo::{CategoryRecord, WorkspaceRecord, WorkspaceRepository};
pub use repo::{RepoError, RepoResult, SqliteStore};
pub use service::board::{BoardError, BoardStore, StatusChange, TaskBoard, TaskLocation};
pub use service::notifications::{Notice, NotificationCenter};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
