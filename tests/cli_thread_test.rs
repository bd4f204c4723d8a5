//! Integration tests for thread and container commands via the CLI.
//!
//! These tests verify that:
//! - `th init` creates storage and is idempotent
//! - `th thread new/list/show/update/progress` work end to end
//! - `th container new/list`, `th detail` and `th rm` work
//! - errors are reported as JSON or human text with exit code 1

mod common;

use common::TestEnv;
use predicates::prelude::*;

// === Init Tests ===

#[test]
fn test_init_creates_storage() {
    let env = TestEnv::new();

    env.th()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"initialized\":true"));
}

#[test]
fn test_init_already_initialized() {
    let env = TestEnv::init();

    env.th()
        .args(["init", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Already initialized"));
}

#[test]
fn test_commands_require_init() {
    let env = TestEnv::new();

    env.th()
        .args(["thread", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""))
        .stderr(predicate::str::contains("th init"));
}

// === Thread Tests ===

#[test]
fn test_thread_new_json() {
    let env = TestEnv::init();

    env.th()
        .args(["thread", "new", "Fix login"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"id\":\"th-"))
        .stdout(predicate::str::contains("\"type\":\"thread\""))
        .stdout(predicate::str::contains("\"name\":\"Fix login\""));
}

#[test]
fn test_thread_new_human() {
    let env = TestEnv::init();

    env.th()
        .args(["-H", "thread", "new", "Fix login"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created thread th-"));
}

#[test]
fn test_thread_new_rejects_bad_importance() {
    let env = TestEnv::init();

    env.th()
        .args(["-H", "thread", "new", "Too loud", "-i", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Invalid input"));
}

#[test]
fn test_thread_show_includes_temperature() {
    let env = TestEnv::init();
    let id = env.new_thread(&["Write docs", "-i", "5", "-s", "large", "-t", "docs"]);

    let shown = env.json(&["thread", "show", &id]);
    assert_eq!(shown["name"], "Write docs");
    assert_eq!(shown["importance"], 5);
    assert_eq!(shown["size"], "large");
    assert_eq!(shown["temperature"], "hot");
    assert_eq!(shown["tags"][0], "docs");
}

#[test]
fn test_thread_list_filters_by_status() {
    let env = TestEnv::init();
    env.new_thread(&["Running"]);
    env.new_thread(&["Parked", "--status", "paused"]);

    let all = env.json(&["thread", "list"]);
    assert_eq!(all["count"], 2);

    let paused = env.json(&["thread", "list", "--status", "paused"]);
    assert_eq!(paused["count"], 1);
    assert_eq!(paused["threads"][0]["name"], "Parked");
}

#[test]
fn test_thread_update_fields() {
    let env = TestEnv::init();
    let id = env.new_thread(&["Draft"]);

    let updated = env.json(&[
        "thread",
        "update",
        &id,
        "--name",
        "Final",
        "--importance",
        "2",
        "--add-tag",
        "review",
    ]);
    assert_eq!(updated["updated_fields"][0], "name");

    let shown = env.json(&["thread", "show", &id]);
    assert_eq!(shown["name"], "Final");
    assert_eq!(shown["importance"], 2);
    assert_eq!(shown["tags"][0], "review");
}

#[test]
fn test_thread_update_cycle_is_rejected() {
    let env = TestEnv::init();
    let parent = env.new_thread(&["Parent"]);
    let child = env.new_thread(&["Child", "-p", &parent]);

    env.th()
        .args(["thread", "update", &parent, "--parent", &child])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cycle detected"));
}

#[test]
fn test_thread_progress() {
    let env = TestEnv::init();
    let id = env.new_thread(&["Migrate DB"]);

    env.th()
        .args(["-H", "thread", "progress", &id, "schema drafted"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 entry"));

    env.th()
        .args(["-H", "thread", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("schema drafted"));
}

#[test]
fn test_thread_show_missing() {
    let env = TestEnv::init();

    env.th()
        .args(["thread", "show", "th-ffffff"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// === Container, Detail and Remove Tests ===

#[test]
fn test_container_new_and_list() {
    let env = TestEnv::init();
    let id = env.new_container(&["Infra", "-d", "Platform work"]);
    assert!(id.starts_with("ct-"));

    let list = env.json(&["container", "list"]);
    assert_eq!(list["count"], 1);
    assert_eq!(list["containers"][0]["description"], "Platform work");
}

#[test]
fn test_detail_on_container() {
    let env = TestEnv::init();
    let id = env.new_container(&["Infra"]);

    let added = env.json(&["detail", &id, "owned by the platform team"]);
    assert_eq!(added["count"], 1);

    let list = env.json(&["container", "list"]);
    assert_eq!(
        list["containers"][0]["details"][0]["content"],
        "owned by the platform team"
    );
}

#[test]
fn test_rm_leaves_children_as_roots() {
    let env = TestEnv::init();
    let parent = env.new_container(&["Box"]);
    let child = env.new_thread(&["Inside", "-p", &parent]);

    let removed = env.json(&["rm", &parent]);
    assert_eq!(removed["type"], "container");
    assert_eq!(removed["orphaned_children"][0], child.as_str());

    let out = env.human(&["tree"]);
    assert!(out.contains("└── Inside"));
}

#[test]
fn test_import_legacy_records() {
    let env = TestEnv::init();
    let file = env.path().join("legacy.json");
    std::fs::write(
        &file,
        r#"[
            {"id": "legacy-1", "name": "Old thread", "importance": 4, "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"},
            {"id": "legacy-2", "name": "Old folder", "createdAt": "2024-01-01T00:00:00Z", "updatedAt": "2024-01-01T00:00:00Z"}
        ]"#,
    )
    .unwrap();

    let result = env.json(&["import", file.to_str().unwrap()]);
    assert_eq!(result["threads"], 1);
    assert_eq!(result["containers"], 1);

    let out = env.human(&["tree"]);
    assert!(out.contains("Old thread [legacy-1] · frozen · ★★★★☆"));
    assert!(out.contains("▣ Old folder [legacy-2]"));
}

#[test]
fn test_action_log_records_commands() {
    let env = TestEnv::init();
    env.new_thread(&["Logged"]);
    env.th()
        .args(["thread", "show", "th-ffffff"])
        .assert()
        .failure();

    let log = env.json(&["log"]);
    let commands: Vec<&str> = log["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["command"].as_str().unwrap())
        .collect();
    assert_eq!(commands, vec!["init", "thread new", "thread show"]);
    assert_eq!(log["entries"][2]["success"], false);
}

#[test]
fn test_action_log_can_be_disabled() {
    let env = TestEnv::init();
    env.json(&["config", "set", "action-log", "false"]);
    env.new_thread(&["Quiet"]);

    let log = env.json(&["log"]);
    let last = log["entries"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["command"], "init");
}
