use chrono::NaiveDate;
use rusqlite::Connection;
use taskdesk_core::db::open_db_in_memory;
use taskdesk_core::{
    BoardError, Difficulty, HistoryEntry, Priority, SqliteStore, StatusChange, TaskBoard,
    TaskChanges, TaskDraft, TaskStatus, Workspace,
};

fn date(day: u32, month: u32, year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn load(conn: &Connection) -> TaskBoard<SqliteStore<'_>> {
    TaskBoard::load(SqliteStore::try_new(conn).unwrap()).unwrap()
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn row_counts(conn: &Connection) -> Vec<i64> {
    [
        "Workspaces",
        "Categories",
        "Tasks",
        "TaskTags",
        "TaskHistory",
        "TaskHistoryTags",
    ]
    .iter()
    .map(|table| count(conn, table))
    .collect()
}

fn snapshot(board: &TaskBoard<SqliteStore<'_>>) -> (Vec<Workspace>, Vec<HistoryEntry>) {
    (
        board.workspaces().cloned().collect(),
        board.history().to_vec(),
    )
}

fn block(conn: &Connection, name: &str, event: &str) {
    conn.execute_batch(&format!(
        "CREATE TRIGGER {name} {event} BEGIN SELECT RAISE(ABORT, 'blocked'); END;"
    ))
    .unwrap();
}

/// Two workspaces with tagged tasks and one tagged history entry.
fn populated(conn: &Connection) -> TaskBoard<SqliteStore<'_>> {
    let mut board = load(conn);
    board.create_workspace("Home").unwrap();
    board.create_workspace("Work").unwrap();
    board.create_category("Home", "Chores").unwrap();
    board.create_category("Work", "Reports").unwrap();
    board
        .add_task(
            "Home",
            "Chores",
            &TaskDraft::new("Wash dishes").with_tags(["kitchen", "daily"]),
        )
        .unwrap();
    board
        .add_task("Work", "Reports", &TaskDraft::new("Q3 summary").with_tags(["finance"]))
        .unwrap();
    let done = board
        .add_task("Home", "Chores", &TaskDraft::new("Fix shelf").with_tags(["diy"]))
        .unwrap();
    board
        .change_task_status("Home", "Chores", done, TaskStatus::Completed)
        .unwrap();
    board
}

#[test]
fn deleting_workspace_removes_categories_tasks_and_tags() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);

    board.create_workspace("Home").unwrap();
    board.create_workspace("Work").unwrap();
    board.create_category("Home", "Chores").unwrap();
    board.create_category("Home", "Errands").unwrap();
    board.create_category("Work", "Reports").unwrap();
    board
        .add_task(
            "Home",
            "Chores",
            &TaskDraft::new("Wash dishes").with_tags(["kitchen", "daily"]),
        )
        .unwrap();
    board
        .add_task("Home", "Errands", &TaskDraft::new("Buy milk").with_tags(["shop"]))
        .unwrap();
    board
        .add_task("Work", "Reports", &TaskDraft::new("Q3 summary").with_tags(["finance"]))
        .unwrap();

    let removed = board.delete_workspace("Home").unwrap();
    assert_eq!(removed.task_count(), 2);
    assert!(board.workspace("Home").is_none());

    assert_eq!(count(&conn, "Workspaces"), 1);
    assert_eq!(count(&conn, "Categories"), 1);
    assert_eq!(count(&conn, "Tasks"), 1);
    assert_eq!(count(&conn, "TaskTags"), 1);

    let orphans: i64 = conn
        .query_row(
            "SELECT COUNT(*)
             FROM Tasks t
             LEFT JOIN Categories c ON c.id = t.category_id
             WHERE c.id IS NULL;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);
}

#[test]
fn deleting_category_removes_its_tasks_and_detaches_history() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);
    board.create_workspace("Home").unwrap();
    board.create_category("Home", "Chores").unwrap();
    let done = board
        .add_task("Home", "Chores", &TaskDraft::new("Vacuum"))
        .unwrap();
    board
        .add_task("Home", "Chores", &TaskDraft::new("Dust").with_tags(["weekly"]))
        .unwrap();
    board
        .change_task_status("Home", "Chores", done, TaskStatus::Completed)
        .unwrap();

    let removed = board.delete_category("Home", "Chores").unwrap();
    assert_eq!(removed.tasks().len(), 1);
    assert_eq!(count(&conn, "Tasks"), 0);
    assert_eq!(count(&conn, "TaskTags"), 0);

    assert_eq!(board.history().len(), 1);
    assert_eq!(board.history()[0].category_id, None);
    assert_eq!(board.history()[0].category_name, "Chores");
    let stored: Option<i64> = conn
        .query_row("SELECT category_id FROM TaskHistory;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored, None);
}

#[test]
fn completing_task_moves_one_identical_snapshot_into_history() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);
    board.create_workspace("Work").unwrap();
    board.create_category("Work", "Reports").unwrap();
    let id = board
        .add_task(
            "Work",
            "Reports",
            &TaskDraft::new("Quarterly report")
                .with_tags(["finance", "q3"])
                .with_priority(Priority::High)
                .with_difficulty(Difficulty::Hard)
                .with_deadline(date(15, 10, 2026)),
        )
        .unwrap();
    let before = board.task("Work", "Reports", id).unwrap().clone();

    let change = board
        .change_task_status("Work", "Reports", id, TaskStatus::Completed)
        .unwrap();
    let StatusChange::Archived(history_id) = change else {
        panic!("expected archive, got {change:?}");
    };

    assert!(board.task("Work", "Reports", id).is_none());
    assert_eq!(board.history().len(), 1);
    let entry = board.history_entry(history_id).unwrap();
    let mut expected = before;
    expected.status = TaskStatus::Completed;
    assert!(entry.matches_task(&expected));
    assert_eq!(entry.workspace_name, "Work");
    assert_eq!(entry.category_name, "Reports");
    assert!(!entry.completed_at.is_empty());

    assert_eq!(count(&conn, "Tasks"), 0);
    assert_eq!(count(&conn, "TaskTags"), 0);
    assert_eq!(count(&conn, "TaskHistory"), 1);
    assert_eq!(count(&conn, "TaskHistoryTags"), 2);
}

#[test]
fn pending_and_in_progress_switch_without_touching_history() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);
    board.create_workspace("Home").unwrap();
    board.create_category("Home", "Garden").unwrap();
    let id = board
        .add_task("Home", "Garden", &TaskDraft::new("Plant tulips"))
        .unwrap();

    let change = board
        .change_task_status("Home", "Garden", id, TaskStatus::InProgress)
        .unwrap();
    assert_eq!(
        change,
        StatusChange::Updated {
            from: TaskStatus::Pending,
            to: TaskStatus::InProgress,
        }
    );
    let again = board
        .change_task_status("Home", "Garden", id, TaskStatus::InProgress)
        .unwrap();
    assert_eq!(again, StatusChange::Unchanged);
    assert!(board.history().is_empty());

    let stored: String = conn
        .query_row("SELECT status FROM Tasks WHERE id = ?1;", [id], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(stored, "In Progress");
}

#[test]
fn restoring_history_entry_readds_pending_task_and_drops_entry() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);
    board.create_workspace("Home").unwrap();
    board.create_category("Home", "Chores").unwrap();
    board.create_category("Home", "Later").unwrap();
    let id = board
        .add_task(
            "Home",
            "Chores",
            &TaskDraft::new("Fix shelf").with_tags(["diy"]),
        )
        .unwrap();
    let StatusChange::Archived(history_id) = board
        .change_task_status("Home", "Chores", id, TaskStatus::Completed)
        .unwrap()
    else {
        panic!("expected archive");
    };

    let restored_id = board
        .restore_from_history(history_id, "Home", "Later")
        .unwrap();

    assert!(board.history().is_empty());
    let restored = board.task("Home", "Later", restored_id).unwrap();
    assert_eq!(restored.description, "Fix shelf");
    assert_eq!(restored.tags, vec!["diy".to_string()]);
    assert_eq!(restored.status, TaskStatus::Pending);
    assert_eq!(count(&conn, "TaskHistory"), 0);
    assert_eq!(count(&conn, "TaskHistoryTags"), 0);
    assert_eq!(count(&conn, "TaskTags"), 1);

    let err = board
        .restore_from_history(history_id, "Home", "Later")
        .unwrap_err();
    assert!(matches!(err, BoardError::HistoryEntryNotFound(missing) if missing == history_id));
}

#[test]
fn deleting_history_entry_is_permanent() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);
    board.create_workspace("Home").unwrap();
    board.create_category("Home", "Chores").unwrap();
    let id = board
        .add_task("Home", "Chores", &TaskDraft::new("Mop").with_tags(["floor"]))
        .unwrap();
    let StatusChange::Archived(history_id) = board
        .change_task_status("Home", "Chores", id, TaskStatus::Completed)
        .unwrap()
    else {
        panic!("expected archive");
    };

    let removed = board.delete_from_history(history_id).unwrap();
    assert_eq!(removed.description, "Mop");
    assert!(board.history().is_empty());
    assert_eq!(count(&conn, "TaskHistory"), 0);
    assert_eq!(count(&conn, "TaskHistoryTags"), 0);
    assert!(load(&conn).history().is_empty());
}

#[test]
fn reloading_board_reproduces_tree_and_history() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);
    board.create_workspace("Home").unwrap();
    board.create_workspace("Work").unwrap();
    board.create_category("Home", "Chores").unwrap();
    board.create_category("Work", "Meetings").unwrap();
    board
        .add_task(
            "Home",
            "Chores",
            &TaskDraft::new("Laundry")
                .with_tags(["weekly"])
                .with_deadline(date(1, 11, 2026)),
        )
        .unwrap();
    let standup = board
        .add_task(
            "Work",
            "Meetings",
            &TaskDraft::new("Standup").with_priority(Priority::Low),
        )
        .unwrap();
    let retro = board
        .add_task("Work", "Meetings", &TaskDraft::new("Retro"))
        .unwrap();
    board
        .change_task_status("Work", "Meetings", standup, TaskStatus::InProgress)
        .unwrap();
    board
        .change_task_status("Work", "Meetings", retro, TaskStatus::Completed)
        .unwrap();

    let reloaded = load(&conn);
    assert_eq!(
        reloaded.workspaces().collect::<Vec<_>>(),
        board.workspaces().collect::<Vec<_>>()
    );
    assert_eq!(reloaded.history(), board.history());
}

#[test]
fn duplicate_and_blank_names_are_rejected_without_store_writes() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);
    board.create_workspace("  Home  ").unwrap();
    board.create_category("Home", "Chores").unwrap();

    assert!(matches!(
        board.create_workspace("Home"),
        Err(BoardError::DuplicateWorkspace(name)) if name == "Home"
    ));
    assert!(matches!(
        board.create_category("Home", " Chores "),
        Err(BoardError::DuplicateCategory { .. })
    ));
    assert!(matches!(
        board.create_workspace("   "),
        Err(BoardError::InvalidName)
    ));
    assert!(matches!(
        board.create_category("Nowhere", "Misc"),
        Err(BoardError::WorkspaceNotFound(_))
    ));

    assert_eq!(count(&conn, "Workspaces"), 1);
    assert_eq!(count(&conn, "Categories"), 1);
}

#[test]
fn renames_update_store_and_tree() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);
    board.create_workspace("Home").unwrap();
    board.create_workspace("Work").unwrap();
    board.create_category("Home", "Chores").unwrap();
    board.create_category("Home", "Garden").unwrap();
    let id = board
        .add_task("Home", "Chores", &TaskDraft::new("Sweep"))
        .unwrap();

    board.rename_workspace("Home", "House").unwrap();
    board.rename_category("House", "Chores", "Cleaning").unwrap();
    assert!(board.task("House", "Cleaning", id).is_some());
    assert!(matches!(
        board.rename_workspace("House", "Work"),
        Err(BoardError::DuplicateWorkspace(_))
    ));
    assert!(matches!(
        board.rename_category("House", "Cleaning", "Garden"),
        Err(BoardError::DuplicateCategory { .. })
    ));

    let reloaded = load(&conn);
    assert!(reloaded.workspace("Home").is_none());
    assert!(reloaded.task("House", "Cleaning", id).is_some());
}

#[test]
fn editing_task_updates_fields_and_replaces_tags() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);
    board.create_workspace("Home").unwrap();
    board.create_category("Home", "Chores").unwrap();
    let id = board
        .add_task(
            "Home",
            "Chores",
            &TaskDraft::new("Paint fence")
                .with_tags(["outdoor", "paint"])
                .with_deadline(date(3, 11, 2026)),
        )
        .unwrap();

    let changes = TaskChanges {
        description: Some(" Paint the fence ".to_string()),
        tags: Some(vec!["Outdoor".to_string(), " weekend ".to_string()]),
        priority: Some(Priority::High),
        deadline: Some(None),
        ..TaskChanges::default()
    };
    board.update_task("Home", "Chores", id, &changes).unwrap();

    let task = board.task("Home", "Chores", id).unwrap();
    assert_eq!(task.description, "Paint the fence");
    assert_eq!(task.tags, vec!["Outdoor".to_string(), "weekend".to_string()]);
    assert_eq!(task.priority, Priority::High);
    assert_eq!(task.deadline, None);
    assert_eq!(load(&conn).task("Home", "Chores", id), Some(task));

    let blank = TaskChanges {
        description: Some("  ".to_string()),
        ..TaskChanges::default()
    };
    assert!(matches!(
        board.update_task("Home", "Chores", id, &blank),
        Err(BoardError::Validation(_))
    ));
    assert!(matches!(
        board.update_task("Home", "Chores", id + 100, &changes),
        Err(BoardError::TaskNotFound(_))
    ));
}

#[test]
fn deleting_task_removes_row_without_history() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);
    board.create_workspace("Home").unwrap();
    board.create_category("Home", "Chores").unwrap();
    let id = board
        .add_task("Home", "Chores", &TaskDraft::new("Iron").with_tags(["cloth"]))
        .unwrap();

    let removed = board.delete_task("Home", "Chores", id).unwrap();
    assert_eq!(removed.description, "Iron");
    assert!(board.history().is_empty());
    assert_eq!(count(&conn, "Tasks"), 0);
    assert_eq!(count(&conn, "TaskTags"), 0);
    assert!(matches!(
        board.delete_task("Home", "Chores", id),
        Err(BoardError::TaskNotFound(_))
    ));
}

#[test]
fn blank_task_description_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);
    board.create_workspace("Home").unwrap();
    board.create_category("Home", "Chores").unwrap();

    let err = board
        .add_task("Home", "Chores", &TaskDraft::new("   "))
        .unwrap_err();
    assert!(matches!(err, BoardError::Validation(_)));
    assert_eq!(count(&conn, "Tasks"), 0);
}

#[test]
fn tag_search_is_exact_and_case_insensitive() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);
    board.create_workspace("Home").unwrap();
    board.create_workspace("Work").unwrap();
    board.create_category("Home", "Chores").unwrap();
    board.create_category("Work", "Reports").unwrap();
    board
        .add_task("Home", "Chores", &TaskDraft::new("Dishes").with_tags(["Kitchen"]))
        .unwrap();
    board
        .add_task(
            "Work",
            "Reports",
            &TaskDraft::new("Budget").with_tags(["kitchen-remodel", "finance"]),
        )
        .unwrap();

    let hits = board.search_by_tags(&[" KITCHEN ".to_string()]);
    assert_eq!(
        hits.into_iter().collect::<Vec<_>>(),
        vec![("Home".to_string(), "Chores".to_string())]
    );

    let both = board.search_by_tags(&["kitchen".to_string(), "Finance".to_string()]);
    assert_eq!(both.len(), 2);

    assert!(board.search_by_tags(&["kitch".to_string()]).is_empty());
    assert!(board.search_by_tags(&["  ".to_string()]).is_empty());
    assert_eq!(board.tasks_with_tags(&["finance".to_string()]).len(), 1);
}

#[test]
fn description_lookup_ignores_case() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);
    board.create_workspace("Home").unwrap();
    board.create_category("Home", "Chores").unwrap();
    board.create_category("Home", "Garden").unwrap();
    let first = board
        .add_task("Home", "Chores", &TaskDraft::new("Water plants"))
        .unwrap();
    let second = board
        .add_task("Home", "Garden", &TaskDraft::new("water PLANTS"))
        .unwrap();
    board
        .change_task_status("Home", "Chores", first, TaskStatus::Completed)
        .unwrap();

    let active = board.find_tasks_by_description("Water Plants");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].task_id, second);
    assert_eq!(active[0].category, "Garden");
    assert_eq!(board.find_history_by_description(" water plants ").len(), 1);
}

#[test]
fn names_are_resolved_by_normalized_form() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);
    board.create_workspace("  Home  Office ").unwrap();
    assert!(board.workspace("Home Office").is_some());

    board.create_category("Home  Office", " Desk ").unwrap();
    let id = board
        .add_task("Home  Office", "Desk", &TaskDraft::new("Order chair"))
        .unwrap();
    assert!(board.task(" Home   Office", "  Desk", id).is_some());
    assert!(matches!(
        board.create_category("Home  Office", "Desk"),
        Err(BoardError::DuplicateCategory { .. })
    ));

    board.rename_workspace("Home  Office", "Home Office").unwrap();
    board
        .rename_category("Home  Office", "Desk ", "Desk")
        .unwrap();
    assert_eq!(board.workspaces().count(), 1);
    assert!(board.category("Home Office", "Desk").is_some());

    let StatusChange::Archived(history_id) = board
        .change_task_status("Home  Office", " Desk", id, TaskStatus::Completed)
        .unwrap()
    else {
        panic!("expected archive");
    };
    let entry = board.history_entry(history_id).unwrap();
    assert_eq!(entry.workspace_name, "Home Office");
    assert_eq!(entry.category_name, "Desk");

    board.delete_category("Home  Office", "Desk").unwrap();
    let removed = board.delete_workspace("Home  Office").unwrap();
    assert_eq!(removed.name, "Home Office");
    assert!(board.workspace("Home Office").is_none());
    assert_eq!(count(&conn, "Workspaces"), 0);
    assert_eq!(count(&conn, "Categories"), 0);
}

#[test]
fn blank_lookup_names_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let mut board = load(&conn);
    board.create_workspace("Home").unwrap();

    assert!(board.workspace("   ").is_none());
    assert!(matches!(
        board.delete_workspace("  "),
        Err(BoardError::WorkspaceNotFound(_))
    ));
    assert!(matches!(
        board.delete_category("Home", ""),
        Err(BoardError::CategoryNotFound { .. })
    ));
    assert_eq!(count(&conn, "Workspaces"), 1);
}

#[test]
fn failed_workspace_delete_leaves_store_and_tree_intact() {
    let conn = open_db_in_memory().unwrap();
    let mut board = populated(&conn);
    let before_rows = row_counts(&conn);
    let before = snapshot(&board);
    block(&conn, "keep_workspaces", "BEFORE DELETE ON Workspaces");

    let err = board.delete_workspace("Home").unwrap_err();

    assert!(matches!(err, BoardError::Repo(_)));
    assert_eq!(row_counts(&conn), before_rows);
    assert_eq!(snapshot(&board), before);
    assert!(board.history()[0].category_id.is_some());
    assert_eq!(snapshot(&load(&conn)), before);
}

#[test]
fn failed_completion_keeps_task_and_history_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let mut board = populated(&conn);
    let id = board.find_tasks_by_description("Wash dishes")[0].task_id;
    let before_rows = row_counts(&conn);
    let before = snapshot(&board);
    block(&conn, "keep_tasks", "BEFORE DELETE ON Tasks");

    let err = board
        .change_task_status("Home", "Chores", id, TaskStatus::Completed)
        .unwrap_err();

    assert!(matches!(err, BoardError::Repo(_)));
    assert_eq!(row_counts(&conn), before_rows);
    assert_eq!(snapshot(&board), before);
    let task = board.task("Home", "Chores", id).unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.tags, vec!["kitchen".to_string(), "daily".to_string()]);
    assert_eq!(snapshot(&load(&conn)), before);
}

#[test]
fn failed_restore_keeps_history_entry_and_adds_no_task() {
    let conn = open_db_in_memory().unwrap();
    let mut board = populated(&conn);
    let history_id = board.history()[0].id;
    let before_rows = row_counts(&conn);
    let before = snapshot(&board);
    block(&conn, "keep_history", "BEFORE DELETE ON TaskHistory");

    let err = board
        .restore_from_history(history_id, "Work", "Reports")
        .unwrap_err();

    assert!(matches!(err, BoardError::Repo(_)));
    assert_eq!(row_counts(&conn), before_rows);
    assert_eq!(snapshot(&board), before);
    assert_eq!(board.history()[0].tags, vec!["diy".to_string()]);
    assert_eq!(snapshot(&load(&conn)), before);
}
