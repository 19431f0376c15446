use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn taskdesk(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("taskdesk").unwrap();
    for key in [
        "TASKDESK_DB_PATH",
        "TASKDESK_LOG_DIR",
        "TASKDESK_LOG_LEVEL",
        "TASKDESK_LANG",
        "TASKDESK_NOTIFY_DAYS",
    ] {
        cmd.env_remove(key);
    }
    cmd.arg("--db").arg(db);
    cmd
}

fn english(db: &Path, args: &[&str]) -> Command {
    let mut cmd = taskdesk(db);
    cmd.args(["--lang", "en"]).args(args);
    cmd
}

fn seed(db: &Path) {
    english(db, &["workspace", "add", "Home"]).assert().success();
    english(db, &["category", "add", "Home", "Chores"])
        .assert()
        .success();
}

#[test]
fn workspace_lifecycle_is_persisted_between_runs() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tasks.db");

    english(&db, &["workspace", "add", "Home"])
        .assert()
        .success()
        .stdout("Workspace created\n");
    english(&db, &["category", "add", "Home", "Chores"])
        .assert()
        .success()
        .stdout("Category created\n");
    english(&db, &["workspace", "list"])
        .assert()
        .success()
        .stdout("Home\n  Chores (0)\n");

    english(&db, &["workspace", "remove", "Home"])
        .assert()
        .success()
        .stdout("Workspace deleted\n");
    english(&db, &["workspace", "list"])
        .assert()
        .success()
        .stdout("No workspaces\n");
}

#[test]
fn duplicate_workspace_fails_with_error_message() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tasks.db");
    seed(&db);

    english(&db, &["workspace", "add", "Home"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "Error: workspace already exists: Home",
        ));
}

#[test]
fn completing_task_moves_it_into_history() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tasks.db");
    seed(&db);

    english(
        &db,
        &[
            "task",
            "add",
            "Home",
            "Chores",
            "Wash dishes",
            "--tags",
            "kitchen, daily",
            "--priority",
            "high",
        ],
    )
    .assert()
    .success()
    .stdout("Task added\n");
    english(&db, &["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[1] Wash dishes | Status: Pending | Priority: High",
        ))
        .stdout(predicate::str::contains("Tags: kitchen, daily"));

    english(&db, &["task", "status", "Home", "Chores", "1", "completed"])
        .assert()
        .success()
        .stdout("Task moved to history\n");
    english(&db, &["task", "list"])
        .assert()
        .success()
        .stdout("No matches\n");
    english(&db, &["history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[1] Wash dishes | Home / Chores"));

    english(&db, &["history", "restore", "1", "Home", "Chores"])
        .assert()
        .success()
        .stdout("Task restored\n");
    english(&db, &["history", "list"])
        .assert()
        .success()
        .stdout("History is empty\n");
}

#[test]
fn json_output_reports_ids() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tasks.db");
    seed(&db);

    english(&db, &["--json", "task", "add", "Home", "Chores", "Mop floor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"ok\""))
        .stdout(predicate::str::contains("\"id\": 1"));
    english(&db, &["--json", "task", "list", "--workspace", "Home"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"description\": \"Mop floor\""))
        .stdout(predicate::str::contains("\"category\": \"Chores\""));
}

#[test]
fn tag_search_lists_matching_categories() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tasks.db");
    seed(&db);
    english(
        &db,
        &["task", "add", "Home", "Chores", "Dust", "--tags", "Weekly"],
    )
    .assert()
    .success();

    english(&db, &["tags", "search", "weekly"])
        .assert()
        .success()
        .stdout("Home / Chores\n");
    english(&db, &["tags", "search", "week"])
        .assert()
        .success()
        .stdout("No matches\n");
}

#[test]
fn notifications_use_given_date_and_window() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tasks.db");
    seed(&db);
    english(
        &db,
        &[
            "task",
            "add",
            "Home",
            "Chores",
            "Pay rent",
            "--deadline",
            "20-10-2026",
        ],
    )
    .assert()
    .success();

    english(&db, &["notifications", "--today", "19-10-2026"])
        .assert()
        .success()
        .stdout("No new notifications\n");
    english(
        &db,
        &["notifications", "--today", "19-10-2026", "--days", "1"],
    )
    .assert()
    .success()
    .stdout("Attention! Deadline for task \"Pay rent\" expires: 20-10-2026\n");
}

#[test]
fn russian_is_the_default_language() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tasks.db");

    taskdesk(&db)
        .args(["workspace", "add", "Дом"])
        .assert()
        .success()
        .stdout("Рабочее пространство создано\n");
}

#[test]
fn invalid_arguments_are_rejected_by_parser() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tasks.db");

    english(&db, &["task", "status", "Home", "Chores", "1", "someday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected Pending|In Progress|Completed"));
    english(
        &db,
        &["task", "add", "Home", "Chores", "X", "--deadline", "2026-10-19"],
    )
    .assert()
    .failure()
    .stderr(predicate::str::contains("expected dd-MM-yyyy"));
}

#[test]
fn board_errors_follow_the_ui_language() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tasks.db");

    taskdesk(&db)
        .args(["workspace", "add", "Дом"])
        .assert()
        .success();
    taskdesk(&db)
        .args(["workspace", "add", "Дом"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "Ошибка: рабочее пространство уже существует: Дом",
        ));
    taskdesk(&db)
        .args(["category", "add", "Работа", "Отчёты"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Ошибка: рабочее пространство не найдено: Работа",
        ));
}
