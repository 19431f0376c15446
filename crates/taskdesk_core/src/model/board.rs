//! Workspace/category tree and history records.
//!
//! # Responsibility
//! - Hold the in-memory mirror of `Workspaces`, `Categories` and `TaskHistory`.
//! - Provide keyed access by name (workspaces, categories) and id (tasks).
//!
//! # Invariants
//! - Category names are unique within a workspace (map key == `name`).
//! - Tasks inside one category keep insertion order.

use crate::model::task::{Difficulty, Priority, Task, TaskDraft, TaskId, TaskStatus};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

pub type WorkspaceId = i64;
pub type CategoryId = i64;
pub type HistoryId = i64;

/// Top-level grouping of categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    categories: BTreeMap<String, Category>,
}

impl Workspace {
    pub fn new(id: WorkspaceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            categories: BTreeMap::new(),
        }
    }

    /// Categories ordered by name.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    pub fn category_mut(&mut self, name: &str) -> Option<&mut Category> {
        self.categories.get_mut(name)
    }

    pub fn contains_category(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    /// Inserts or replaces the category stored under `category.name`.
    pub fn insert_category(&mut self, category: Category) {
        self.categories.insert(category.name.clone(), category);
    }

    pub fn remove_category(&mut self, name: &str) -> Option<Category> {
        self.categories.remove(name)
    }

    pub fn task_count(&self) -> usize {
        self.categories.values().map(|category| category.tasks.len()).sum()
    }
}

/// Grouping of tasks within a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    tasks: Vec<Task>,
}

impl Category {
    pub fn new(id: CategoryId, workspace_id: WorkspaceId, name: impl Into<String>) -> Self {
        Self {
            id,
            workspace_id,
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    pub fn push_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Removes and returns the task with `id`, keeping sibling order.
    pub fn remove_task(&mut self, id: TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id == id)?;
        Some(self.tasks.remove(index))
    }
}

/// Detached snapshot of a completed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: HistoryId,
    /// Originating category; `None` once that category is deleted.
    pub category_id: Option<CategoryId>,
    pub workspace_name: String,
    pub category_name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub priority: Priority,
    pub status: TaskStatus,
    pub deadline: Option<NaiveDate>,
    /// UTC timestamp text written by the store (`YYYY-MM-DDTHH:MM:SSZ`).
    pub completed_at: String,
}

impl HistoryEntry {
    /// Returns whether this snapshot carries the same task fields as `task`.
    ///
    /// Ids are ignored: a snapshot always gets its own history id.
    pub fn matches_task(&self, task: &Task) -> bool {
        self.description == task.description
            && self.tags == task.tags
            && self.difficulty == task.difficulty
            && self.priority == task.priority
            && self.status == task.status
            && self.deadline == task.deadline
    }

    /// Draft used to re-create an active task from this snapshot.
    pub fn to_draft(&self) -> TaskDraft {
        TaskDraft {
            description: self.description.clone(),
            tags: self.tags.clone(),
            difficulty: self.difficulty,
            priority: self.priority,
            deadline: self.deadline,
        }
    }
}
