//! Task record and its lifecycle enumerations.
//!
//! # Responsibility
//! - Define the active task shape and the draft used to create one.
//! - Own text conversions for status/priority/difficulty and deadlines.
//!
//! # Invariants
//! - `description` is never blank for a persisted task.
//! - Tags are trimmed, non-empty and unique ignoring case.
//! - Deadlines are persisted as `dd-MM-yyyy` text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned task rowid.
pub type TaskId = i64;

/// `chrono` pattern for the persisted `dd-MM-yyyy` deadline text.
pub const DEADLINE_FORMAT: &str = "%d-%m-%Y";

/// Task lifecycle state.
///
/// `Pending` and `InProgress` can be switched freely. `Completed` is terminal
/// for an active task: reaching it moves the task into history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [Self::Pending, Self::InProgress, Self::Completed];

    /// Display and storage text.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }

    /// Parses storage or user text, ignoring case and separators.
    pub fn parse(value: &str) -> Option<Self> {
        match squash(value).as_str() {
            "pending" => Some(Self::Pending),
            "inprogress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match squash(value).as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match squash(value).as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Validation failures for task input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Description is empty after trim.
    EmptyDescription,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDescription => write!(f, "task description cannot be empty"),
        }
    }
}

impl Error for TaskValidationError {}

/// Active task mirrored from the `Tasks` and `TaskTags` tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub priority: Priority,
    pub status: TaskStatus,
    pub deadline: Option<NaiveDate>,
}

impl Task {
    /// Signed number of days from `today` to the deadline.
    ///
    /// Negative values mean overdue. `None` when the task has no deadline.
    pub fn days_until_deadline(&self, today: NaiveDate) -> Option<i64> {
        self.deadline
            .map(|deadline| deadline.signed_duration_since(today).num_days())
    }

    /// Returns whether one of the tags equals `tag` ignoring case and
    /// surrounding whitespace.
    pub fn has_tag(&self, tag: &str) -> bool {
        let needle = tag.trim();
        !needle.is_empty()
            && self
                .tags
                .iter()
                .any(|value| tags_equal(value.as_str(), needle))
    }

    /// Deadline in persisted `dd-MM-yyyy` form, empty when unset.
    pub fn deadline_text(&self) -> String {
        self.deadline.map(format_deadline).unwrap_or_default()
    }
}

/// Input for creating a task. Status always starts as `Pending`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub description: String,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub priority: Priority,
    pub deadline: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Returns a trimmed copy with normalized tags.
    ///
    /// # Errors
    /// - `EmptyDescription` when the description is blank.
    pub fn normalized(&self) -> Result<Self, TaskValidationError> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(TaskValidationError::EmptyDescription);
        }
        Ok(Self {
            description: description.to_string(),
            tags: normalize_tags(&self.tags),
            ..self.clone()
        })
    }
}

/// Partial edit of an active task; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub difficulty: Option<Difficulty>,
    pub priority: Option<Priority>,
    /// `Some(None)` clears the deadline.
    pub deadline: Option<Option<NaiveDate>>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.tags.is_none()
            && self.difficulty.is_none()
            && self.priority.is_none()
            && self.deadline.is_none()
    }

    /// Applies the edit to a copy of `task`.
    pub fn apply_to(&self, task: &Task) -> Result<Task, TaskValidationError> {
        let mut updated = task.clone();
        if let Some(description) = self.description.as_deref() {
            let trimmed = description.trim();
            if trimmed.is_empty() {
                return Err(TaskValidationError::EmptyDescription);
            }
            updated.description = trimmed.to_string();
        }
        if let Some(tags) = self.tags.as_ref() {
            updated.tags = normalize_tags(tags);
        }
        if let Some(difficulty) = self.difficulty {
            updated.difficulty = difficulty;
        }
        if let Some(priority) = self.priority {
            updated.priority = priority;
        }
        if let Some(deadline) = self.deadline {
            updated.deadline = deadline;
        }
        Ok(updated)
    }
}

/// Trims tags, drops blanks and removes case-insensitive duplicates.
///
/// The first spelling of a tag wins and input order is kept.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            normalized.push(trimmed.to_string());
        }
    }
    normalized
}

/// Splits comma separated tag input (`"work, Home,,urgent"`).
pub fn parse_tag_list(input: &str) -> Vec<String> {
    let raw = input.split(',').map(str::to_string).collect::<Vec<_>>();
    normalize_tags(&raw)
}

/// Case-insensitive equality after trim.
pub fn tags_equal(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

/// Parses a `dd-MM-yyyy` deadline. Blank input yields `Ok(None)`.
pub fn parse_deadline(value: &str) -> Result<Option<NaiveDate>, chrono::ParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, DEADLINE_FORMAT).map(Some)
}

pub fn format_deadline(deadline: NaiveDate) -> String {
    deadline.format(DEADLINE_FORMAT).to_string()
}

fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !matches!(ch, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}
