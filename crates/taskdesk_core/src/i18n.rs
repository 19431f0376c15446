//! Bilingual (English/Russian) phrase table.
//!
//! Display strings are written in English and looked up at render time.
//! Phrases missing from the table are returned unchanged.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// UI language. Russian is the default, matching the first-run experience.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Language {
    #[default]
    Russian,
    English,
}

impl Language {
    pub fn toggle(self) -> Self {
        match self {
            Self::Russian => Self::English,
            Self::English => Self::Russian,
        }
    }

    /// Short code (`ru` / `en`).
    pub fn code(self) -> &'static str {
        match self {
            Self::Russian => "ru",
            Self::English => "en",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ru" | "rus" | "russian" => Some(Self::Russian),
            "en" | "eng" | "english" => Some(Self::English),
            _ => None,
        }
    }
}

static RUSSIAN: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Task Manager", "Менеджер задач"),
        ("Workspace", "Рабочее пространство"),
        ("Workspaces", "Рабочие пространства"),
        ("Category", "Категория"),
        ("Task", "Задача"),
        ("Tags", "Теги"),
        ("Deadline", "Срок"),
        ("Status", "Статус"),
        ("Priority", "Приоритет"),
        ("Difficulty", "Сложность"),
        ("Completed at", "Завершено"),
        ("History", "История"),
        ("Notifications", "Уведомления"),
        ("No new notifications", "Нет новых уведомлений"),
        ("No workspaces", "Нет рабочих пространств"),
        ("History is empty", "История пуста"),
        ("No matches", "Совпадений нет"),
        ("Workspace created", "Рабочее пространство создано"),
        ("Workspace renamed", "Рабочее пространство переименовано"),
        ("Workspace deleted", "Рабочее пространство удалено"),
        ("Category created", "Категория создана"),
        ("Category renamed", "Категория переименована"),
        ("Category deleted", "Категория удалена"),
        ("Task added", "Задача добавлена"),
        ("Task updated", "Задача обновлена"),
        ("Task deleted", "Задача удалена"),
        ("Status changed", "Статус изменён"),
        ("Status unchanged", "Статус не изменился"),
        ("Task moved to history", "Задача перемещена в историю"),
        ("Task restored", "Задача восстановлена"),
        ("Task permanently deleted", "Задача удалена навсегда"),
        ("Error", "Ошибка"),
        ("name must not be blank", "название не может быть пустым"),
        ("workspace already exists", "рабочее пространство уже существует"),
        (
            "category already exists in workspace",
            "категория уже существует в рабочем пространстве",
        ),
        ("workspace not found", "рабочее пространство не найдено"),
        (
            "category not found in workspace",
            "категория не найдена в рабочем пространстве",
        ),
        ("task not found", "задача не найдена"),
        ("task not found in history", "задача не найдена в истории"),
        ("task description cannot be empty", "описание задачи не может быть пустым"),
        ("Pending", "В ожидании"),
        ("In Progress", "В процессе"),
        ("Completed", "Завершено"),
        ("Easy", "Легко"),
        ("Medium", "Средне"),
        ("Hard", "Сложно"),
        ("Low", "Низкий"),
        ("High", "Высокий"),
    ])
});

/// Looks up `phrase` for `language`; unknown phrases pass through.
pub fn translate(phrase: &str, language: Language) -> &str {
    match language {
        Language::English => phrase,
        Language::Russian => RUSSIAN.get(phrase).copied().unwrap_or(phrase),
    }
}

/// Deadline notice text for one task.
pub fn deadline_message(language: Language, description: &str, deadline: &str) -> String {
    match language {
        Language::English => {
            format!("Attention! Deadline for task \"{description}\" expires: {deadline}")
        }
        Language::Russian => {
            format!("Внимание! Срок выполнения задачи \"{description}\" истекает: {deadline}")
        }
    }
}
