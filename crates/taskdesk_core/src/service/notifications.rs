//! Deadline notification scan.
//!
//! # Responsibility
//! - Scan active tasks for deadlines inside the notice window.
//! - Keep transient, session-only notices with a viewed flag.
//!
//! # Invariants
//! - Notices are keyed by (task description, deadline); one notice per key.
//! - A rescan keeps the viewed flag of notices that are still due.
//! - Overdue tasks are not reported.

use crate::i18n::{deadline_message, Language};
use crate::model::task::format_deadline;
use crate::service::board::{BoardStore, TaskBoard};
use chrono::NaiveDate;
use log::debug;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One derived deadline notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub task_description: String,
    pub deadline: NaiveDate,
    pub workspace: String,
    pub category: String,
    /// Days from the scan date to the deadline; `0` means due today.
    pub days_left: i64,
    pub message: String,
    pub viewed: bool,
}

impl Notice {
    fn key(&self) -> (String, NaiveDate) {
        (self.task_description.clone(), self.deadline)
    }
}

/// Session store of deadline notices.
#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    language: Language,
    window_days: u32,
    notices: Vec<Notice>,
}

impl NotificationCenter {
    /// `window_days = 0` reports only tasks due on the scan date.
    pub fn new(language: Language, window_days: u32) -> Self {
        Self {
            language,
            window_days,
            notices: Vec::new(),
        }
    }

    /// Rebuilds notices from `board` as of `today`.
    ///
    /// Returns the number of notices that were not present before the scan.
    pub fn check_deadlines<R: BoardStore>(
        &mut self,
        board: &TaskBoard<R>,
        today: NaiveDate,
    ) -> usize {
        let previous = self
            .notices
            .iter()
            .map(|notice| (notice.key(), notice.viewed))
            .collect::<HashMap<_, _>>();

        let mut seen = HashSet::new();
        let mut notices = Vec::new();
        for (workspace, category, task) in board.tasks() {
            let (Some(deadline), Some(days_left)) =
                (task.deadline, task.days_until_deadline(today))
            else {
                continue;
            };
            if !(0..=i64::from(self.window_days)).contains(&days_left) {
                continue;
            }
            if !seen.insert((task.description.clone(), deadline)) {
                continue;
            }

            let mut notice = Notice {
                task_description: task.description.clone(),
                deadline,
                workspace: workspace.name.clone(),
                category: category.name.clone(),
                days_left,
                message: String::new(),
                viewed: false,
            };
            notice.message = self.render(&notice);
            notice.viewed = previous.get(&notice.key()).copied().unwrap_or(false);
            notices.push(notice);
        }

        let fresh = notices
            .iter()
            .filter(|notice| !previous.contains_key(&notice.key()))
            .count();
        debug!(
            "event=deadline_check module=notifications status=ok notices={} fresh={} window_days={}",
            notices.len(),
            fresh,
            self.window_days
        );
        self.notices = notices;
        fresh
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn unviewed(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter().filter(|notice| !notice.viewed)
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn mark_all_viewed(&mut self) {
        for notice in self.notices.iter_mut() {
            notice.viewed = true;
        }
    }

    /// Drops every notice. A later scan produces them again if still due.
    pub fn clear(&mut self) {
        self.notices.clear();
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Switches language and re-renders existing messages.
    pub fn relocalize(&mut self, language: Language) {
        self.language = language;
        let rendered = self
            .notices
            .iter()
            .map(|notice| self.render(notice))
            .collect::<Vec<_>>();
        for (notice, message) in self.notices.iter_mut().zip(rendered) {
            notice.message = message;
        }
    }

    fn render(&self, notice: &Notice) -> String {
        deadline_message(
            self.language,
            &notice.task_description,
            &format_deadline(notice.deadline),
        )
    }
}
