//! In-memory task board synchronized with the task store.
//!
//! # Responsibility
//! - Rebuild the workspace -> category -> task tree and history from storage.
//! - Apply every user action to the store first, then to the tree.
//! - Answer tree queries (tag search, description lookup, iteration).
//!
//! # Invariants
//! - The tree is mutated only after the store write succeeded; a failed
//!   write leaves the tree untouched.
//! - Workspace names are unique; category names are unique per workspace.
//! - Tasks are addressed by id. Description lookup is a search helper only,
//!   since descriptions are not unique.

use crate::i18n::{translate, Language};
use crate::model::board::{Category, CategoryId, HistoryEntry, HistoryId, Workspace, WorkspaceId};
use crate::model::task::{Task, TaskChanges, TaskDraft, TaskId, TaskStatus, TaskValidationError};
use crate::repo::history_repo::{ArchiveOrigin, HistoryRepository};
use crate::repo::task_repo::TaskRepository;
use crate::repo::workspace_repo::WorkspaceRepository;
use crate::repo::RepoError;
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Everything the board needs from storage.
pub trait BoardStore: WorkspaceRepository + TaskRepository + HistoryRepository {}

impl<T> BoardStore for T where T: WorkspaceRepository + TaskRepository + HistoryRepository {}

/// Errors from board operations.
#[derive(Debug)]
pub enum BoardError {
    /// Workspace/category name is blank after trim.
    InvalidName,
    DuplicateWorkspace(String),
    DuplicateCategory { workspace: String, category: String },
    WorkspaceNotFound(String),
    CategoryNotFound { workspace: String, category: String },
    TaskNotFound(TaskId),
    HistoryEntryNotFound(HistoryId),
    Validation(TaskValidationError),
    /// Storage failure; the action was abandoned.
    Repo(RepoError),
}

impl Display for BoardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "name must not be blank"),
            Self::DuplicateWorkspace(name) => write!(f, "workspace already exists: {name}"),
            Self::DuplicateCategory {
                workspace,
                category,
            } => write!(
                f,
                "category already exists in workspace {workspace}: {category}"
            ),
            Self::WorkspaceNotFound(name) => write!(f, "workspace not found: {name}"),
            Self::CategoryNotFound {
                workspace,
                category,
            } => write!(f, "category not found in workspace {workspace}: {category}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::HistoryEntryNotFound(id) => write!(f, "task not found in history: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl BoardError {
    /// Message in `language`. Names and ids are kept verbatim; storage
    /// failures stay in English.
    pub fn localized(&self, language: Language) -> String {
        match self {
            Self::InvalidName => translate("name must not be blank", language).to_string(),
            Self::DuplicateWorkspace(name) => {
                format!("{}: {name}", translate("workspace already exists", language))
            }
            Self::DuplicateCategory {
                workspace,
                category,
            } => format!(
                "{} {workspace}: {category}",
                translate("category already exists in workspace", language)
            ),
            Self::WorkspaceNotFound(name) => {
                format!("{}: {name}", translate("workspace not found", language))
            }
            Self::CategoryNotFound {
                workspace,
                category,
            } => format!(
                "{} {workspace}: {category}",
                translate("category not found in workspace", language)
            ),
            Self::TaskNotFound(id) => format!("{}: {id}", translate("task not found", language)),
            Self::HistoryEntryNotFound(id) => {
                format!("{}: {id}", translate("task not found in history", language))
            }
            Self::Validation(err) => translate(&err.to_string(), language).to_string(),
            Self::Repo(err) => err.to_string(),
        }
    }
}

impl Error for BoardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for BoardError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity: "task", id } => Self::TaskNotFound(id),
            RepoError::NotFound {
                entity: "history entry",
                id,
            } => Self::HistoryEntryNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<TaskValidationError> for BoardError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Outcome of [`TaskBoard::change_task_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// The task already had the requested status.
    Unchanged,
    Updated { from: TaskStatus, to: TaskStatus },
    /// The task was completed and moved into history.
    Archived(HistoryId),
}

/// Position of one active task in the tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaskLocation {
    pub workspace: String,
    pub category: String,
    pub task_id: TaskId,
}

/// Workspace -> category -> task tree plus history, mirrored from a store.
pub struct TaskBoard<R: BoardStore> {
    repo: R,
    workspaces: BTreeMap<String, Workspace>,
    history: Vec<HistoryEntry>,
}

impl<R: BoardStore> TaskBoard<R> {
    /// Loads the full tree and history from `repo`.
    ///
    /// # Errors
    /// - `Repo(InvalidData)` when a category or task points at a missing
    ///   parent row.
    pub fn load(repo: R) -> Result<Self, BoardError> {
        let started_at = Instant::now();
        let mut workspaces = BTreeMap::new();
        let mut workspace_names = HashMap::new();
        for record in repo.list_workspaces()? {
            workspace_names.insert(record.id, record.name.clone());
            workspaces.insert(record.name.clone(), Workspace::new(record.id, record.name));
        }

        let mut category_paths = HashMap::new();
        for record in repo.list_categories()? {
            let workspace_name = workspace_names.get(&record.workspace_id).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "category {} references missing workspace {}",
                    record.id, record.workspace_id
                ))
            })?;
            category_paths.insert(record.id, (workspace_name.clone(), record.name.clone()));
            if let Some(workspace) = workspaces.get_mut(workspace_name) {
                workspace.insert_category(Category::new(
                    record.id,
                    record.workspace_id,
                    record.name,
                ));
            }
        }

        let mut task_count = 0usize;
        for record in repo.list_tasks()? {
            let category = category_paths
                .get(&record.category_id)
                .and_then(|(workspace, category)| {
                    workspaces.get_mut(workspace)?.category_mut(category)
                })
                .ok_or_else(|| {
                    RepoError::InvalidData(format!(
                        "task {} references missing category {}",
                        record.task.id, record.category_id
                    ))
                })?;
            category.push_task(record.task);
            task_count += 1;
        }

        let history = repo.list_history()?;
        info!(
            "event=board_load module=board status=ok workspaces={} categories={} tasks={} history={} duration_ms={}",
            workspaces.len(),
            category_paths.len(),
            task_count,
            history.len(),
            started_at.elapsed().as_millis()
        );

        Ok(Self {
            repo,
            workspaces,
            history,
        })
    }

    /// Workspaces ordered by name.
    pub fn workspaces(&self) -> impl Iterator<Item = &Workspace> {
        self.workspaces.values()
    }

    /// Looks a workspace up by name; the name is normalized first.
    pub fn workspace(&self, name: &str) -> Option<&Workspace> {
        self.workspaces.get(&name_key(name)?)
    }

    pub fn category(&self, workspace: &str, category: &str) -> Option<&Category> {
        self.workspace(workspace)?.category(&name_key(category)?)
    }

    pub fn task(&self, workspace: &str, category: &str, id: TaskId) -> Option<&Task> {
        self.category(workspace, category)?.task(id)
    }

    /// Every active task with its workspace and category.
    pub fn tasks(&self) -> impl Iterator<Item = (&Workspace, &Category, &Task)> {
        self.workspaces.values().flat_map(|workspace| {
            workspace.categories().flat_map(move |category| {
                category
                    .tasks()
                    .iter()
                    .map(move |task| (workspace, category, task))
            })
        })
    }

    /// Completed-task snapshots in completion order.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn history_entry(&self, id: HistoryId) -> Option<&HistoryEntry> {
        self.history.iter().find(|entry| entry.id == id)
    }

    pub fn create_workspace(&mut self, name: &str) -> Result<WorkspaceId, BoardError> {
        let name = normalize_name(name)?;
        if self.workspaces.contains_key(&name) {
            return Err(BoardError::DuplicateWorkspace(name));
        }

        let record = self
            .repo
            .create_workspace(&name)
            .map_err(|err| store_failure("workspace_create", err))?;
        self.workspaces
            .insert(name.clone(), Workspace::new(record.id, name));
        Ok(record.id)
    }

    pub fn rename_workspace(&mut self, name: &str, new_name: &str) -> Result<(), BoardError> {
        let new_name = normalize_name(new_name)?;
        let (id, old_name) = {
            let current = self.require_workspace(name)?;
            (current.id, current.name.clone())
        };
        if new_name == old_name {
            return Ok(());
        }
        if self.workspaces.contains_key(&new_name) {
            return Err(BoardError::DuplicateWorkspace(new_name));
        }

        self.repo
            .rename_workspace(id, &new_name)
            .map_err(|err| store_failure("workspace_rename", err))?;
        if let Some(mut workspace) = self.workspaces.remove(&old_name) {
            workspace.name = new_name.clone();
            self.workspaces.insert(new_name, workspace);
        }
        Ok(())
    }

    /// Deletes a workspace with all of its categories and tasks.
    ///
    /// Returns the removed subtree.
    pub fn delete_workspace(&mut self, name: &str) -> Result<Workspace, BoardError> {
        let (id, key, category_ids) = {
            let current = self.require_workspace(name)?;
            let ids = current
                .categories()
                .map(|category| category.id)
                .collect::<Vec<_>>();
            (current.id, current.name.clone(), ids)
        };
        self.repo
            .delete_workspace(id)
            .map_err(|err| store_failure("workspace_delete", err))?;
        self.detach_history(&category_ids);
        self.workspaces
            .remove(&key)
            .ok_or_else(|| BoardError::WorkspaceNotFound(name.to_string()))
    }

    pub fn create_category(
        &mut self,
        workspace: &str,
        name: &str,
    ) -> Result<CategoryId, BoardError> {
        let name = normalize_name(name)?;
        let workspace_id = {
            let current = self.require_workspace(workspace)?;
            if current.contains_category(&name) {
                return Err(BoardError::DuplicateCategory {
                    workspace: workspace.to_string(),
                    category: name,
                });
            }
            current.id
        };

        let record = self
            .repo
            .create_category(workspace_id, &name)
            .map_err(|err| store_failure("category_create", err))?;
        self.require_workspace_mut(workspace)?
            .insert_category(Category::new(record.id, workspace_id, name));
        Ok(record.id)
    }

    pub fn rename_category(
        &mut self,
        workspace: &str,
        name: &str,
        new_name: &str,
    ) -> Result<(), BoardError> {
        let new_name = normalize_name(new_name)?;
        let (id, old_name) = {
            let current = self.require_category(workspace, name)?;
            (current.id, current.name.clone())
        };
        if new_name == old_name {
            return Ok(());
        }
        if self.require_workspace(workspace)?.contains_category(&new_name) {
            return Err(BoardError::DuplicateCategory {
                workspace: workspace.to_string(),
                category: new_name,
            });
        }

        self.repo
            .rename_category(id, &new_name)
            .map_err(|err| store_failure("category_rename", err))?;
        let current = self.require_workspace_mut(workspace)?;
        if let Some(mut category) = current.remove_category(&old_name) {
            category.name = new_name;
            current.insert_category(category);
        }
        Ok(())
    }

    /// Deletes a category with all of its tasks. Returns the removed subtree.
    pub fn delete_category(&mut self, workspace: &str, name: &str) -> Result<Category, BoardError> {
        let (id, key) = {
            let current = self.require_category(workspace, name)?;
            (current.id, current.name.clone())
        };
        self.repo
            .delete_category(id)
            .map_err(|err| store_failure("category_delete", err))?;
        self.detach_history(&[id]);
        self.require_workspace_mut(workspace)?
            .remove_category(&key)
            .ok_or_else(|| BoardError::CategoryNotFound {
                workspace: workspace.to_string(),
                category: name.to_string(),
            })
    }

    /// Adds a `Pending` task to a category.
    pub fn add_task(
        &mut self,
        workspace: &str,
        category: &str,
        draft: &TaskDraft,
    ) -> Result<TaskId, BoardError> {
        let draft = draft.normalized()?;
        let category_id = self.require_category(workspace, category)?.id;

        let task = self
            .repo
            .create_task(category_id, &draft)
            .map_err(|err| store_failure("task_create", err))?;
        let id = task.id;
        self.require_category_mut(workspace, category)?
            .push_task(task);
        Ok(id)
    }

    /// Edits description, tags, difficulty, priority or deadline.
    pub fn update_task(
        &mut self,
        workspace: &str,
        category: &str,
        id: TaskId,
        changes: &TaskChanges,
    ) -> Result<(), BoardError> {
        let current = self
            .require_category(workspace, category)?
            .task(id)
            .ok_or(BoardError::TaskNotFound(id))?;
        if changes.is_empty() {
            return Ok(());
        }

        let updated = changes.apply_to(current)?;
        self.repo
            .update_task(&updated)
            .map_err(|err| store_failure("task_update", err))?;
        if let Some(task) = self.require_category_mut(workspace, category)?.task_mut(id) {
            *task = updated;
        }
        Ok(())
    }

    /// Deletes an active task permanently (no history entry).
    pub fn delete_task(
        &mut self,
        workspace: &str,
        category: &str,
        id: TaskId,
    ) -> Result<Task, BoardError> {
        self.require_category(workspace, category)?
            .task(id)
            .ok_or(BoardError::TaskNotFound(id))?;

        self.repo
            .delete_task(id)
            .map_err(|err| store_failure("task_delete", err))?;
        self.require_category_mut(workspace, category)?
            .remove_task(id)
            .ok_or(BoardError::TaskNotFound(id))
    }

    /// Moves a task through its lifecycle.
    ///
    /// `Pending` and `InProgress` switch freely. `Completed` removes the task
    /// from its category and appends one history snapshot.
    pub fn change_task_status(
        &mut self,
        workspace: &str,
        category: &str,
        id: TaskId,
        status: TaskStatus,
    ) -> Result<StatusChange, BoardError> {
        let workspace_name = self.require_workspace(workspace)?.name.clone();
        let (category_id, category_name, task) = {
            let current = self.require_category(workspace, category)?;
            let task = current.task(id).ok_or(BoardError::TaskNotFound(id))?;
            (current.id, current.name.clone(), task.clone())
        };
        if task.status == status {
            return Ok(StatusChange::Unchanged);
        }

        if status.is_completed() {
            let origin = ArchiveOrigin {
                category_id,
                workspace_name: &workspace_name,
                category_name: &category_name,
            };
            let entry = self
                .repo
                .archive_task(&task, origin)
                .map_err(|err| store_failure("task_complete", err))?;
            let history_id = entry.id;
            self.require_category_mut(workspace, category)?
                .remove_task(id);
            self.history.push(entry);
            return Ok(StatusChange::Archived(history_id));
        }

        self.repo
            .set_task_status(id, status)
            .map_err(|err| store_failure("task_status", err))?;
        if let Some(current) = self.require_category_mut(workspace, category)?.task_mut(id) {
            current.status = status;
        }
        Ok(StatusChange::Updated {
            from: task.status,
            to: status,
        })
    }

    /// Re-creates a history entry as a new `Pending` task in the given
    /// category and drops the entry. Returns the new task id.
    pub fn restore_from_history(
        &mut self,
        id: HistoryId,
        workspace: &str,
        category: &str,
    ) -> Result<TaskId, BoardError> {
        let index = self.history_index(id)?;
        let category_id = self.require_category(workspace, category)?.id;

        let task = self
            .repo
            .restore_history_entry(id, category_id)
            .map_err(|err| store_failure("history_restore", err))?;
        let task_id = task.id;
        self.require_category_mut(workspace, category)?
            .push_task(task);
        self.history.remove(index);
        Ok(task_id)
    }

    /// Permanently deletes a history entry.
    pub fn delete_from_history(&mut self, id: HistoryId) -> Result<HistoryEntry, BoardError> {
        let index = self.history_index(id)?;
        self.repo
            .delete_history_entry(id)
            .map_err(|err| store_failure("history_delete", err))?;
        Ok(self.history.remove(index))
    }

    /// History entries whose description equals `text` ignoring case.
    pub fn find_history_by_description(&self, text: &str) -> Vec<&HistoryEntry> {
        let needle = text.trim().to_lowercase();
        self.history
            .iter()
            .filter(|entry| entry.description.to_lowercase() == needle)
            .collect()
    }

    /// Active tasks whose description equals `text` ignoring case.
    pub fn find_tasks_by_description(&self, text: &str) -> Vec<TaskLocation> {
        let needle = text.trim().to_lowercase();
        self.tasks()
            .filter(|(_, _, task)| task.description.to_lowercase() == needle)
            .map(|(workspace, category, task)| TaskLocation {
                workspace: workspace.name.clone(),
                category: category.name.clone(),
                task_id: task.id,
            })
            .collect()
    }

    /// (workspace, category) pairs holding a task tagged with any of `tags`.
    ///
    /// Matching is exact after trim and ignores case; blank query tags are
    /// skipped.
    pub fn search_by_tags(&self, tags: &[String]) -> BTreeSet<(String, String)> {
        self.tasks_with_tags(tags)
            .into_iter()
            .map(|location| (location.workspace, location.category))
            .collect()
    }

    /// Every active task tagged with any of `tags`.
    pub fn tasks_with_tags(&self, tags: &[String]) -> Vec<TaskLocation> {
        let wanted = tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .collect::<Vec<_>>();
        if wanted.is_empty() {
            return Vec::new();
        }

        self.tasks()
            .filter(|(_, _, task)| wanted.iter().any(|tag| task.has_tag(tag)))
            .map(|(workspace, category, task)| TaskLocation {
                workspace: workspace.name.clone(),
                category: category.name.clone(),
                task_id: task.id,
            })
            .collect()
    }

    fn require_workspace(&self, name: &str) -> Result<&Workspace, BoardError> {
        self.workspace(name)
            .ok_or_else(|| BoardError::WorkspaceNotFound(name.to_string()))
    }

    fn require_workspace_mut(&mut self, name: &str) -> Result<&mut Workspace, BoardError> {
        name_key(name)
            .and_then(|key| self.workspaces.get_mut(&key))
            .ok_or_else(|| BoardError::WorkspaceNotFound(name.to_string()))
    }

    fn require_category(&self, workspace: &str, category: &str) -> Result<&Category, BoardError> {
        self.category(workspace, category)
            .ok_or_else(|| BoardError::CategoryNotFound {
                workspace: workspace.to_string(),
                category: category.to_string(),
            })
    }

    fn require_category_mut(
        &mut self,
        workspace: &str,
        category: &str,
    ) -> Result<&mut Category, BoardError> {
        let current = self.require_workspace_mut(workspace)?;
        name_key(category)
            .and_then(|key| current.category_mut(&key))
            .ok_or_else(|| BoardError::CategoryNotFound {
                workspace: workspace.to_string(),
                category: category.to_string(),
            })
    }

    /// Mirrors `ON DELETE SET NULL` on `TaskHistory.category_id`.
    fn detach_history(&mut self, category_ids: &[CategoryId]) {
        for entry in self.history.iter_mut() {
            if entry
                .category_id
                .is_some_and(|id| category_ids.contains(&id))
            {
                entry.category_id = None;
            }
        }
    }

    fn history_index(&self, id: HistoryId) -> Result<usize, BoardError> {
        self.history
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(BoardError::HistoryEntryNotFound(id))
    }
}

/// Trims and collapses inner whitespace of a workspace/category name.
pub fn normalize_name(value: &str) -> Result<String, BoardError> {
    let collapsed = WHITESPACE_RE.replace_all(value.trim(), " ");
    if collapsed.is_empty() {
        return Err(BoardError::InvalidName);
    }
    Ok(collapsed.into_owned())
}

/// Map key for a caller-supplied name; blank names match nothing.
fn name_key(value: &str) -> Option<String> {
    normalize_name(value).ok()
}

fn store_failure(event: &'static str, err: RepoError) -> BoardError {
    error!("event={event} module=board status=error error={err}");
    err.into()
}
