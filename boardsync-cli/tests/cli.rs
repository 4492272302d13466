use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::json;

use boardsync_core::config::config_path_at;
use boardsync_core::{CheckpointStore, FileCheckpointStore};

const CONFIG: &str = r#"
customer_id: acme
api_url: http://127.0.0.1:1/rest/agile/1.0
auth:
  kind: basic
  username: bot@acme.test
  api_token: s3cret
"#;

fn boardsync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("boardsync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("BOARDSYNC_API_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(home: &TempDir, contents: &str) {
    home.child(".boardsync/config.yaml")
        .write_str(contents)
        .expect("write config");
}

fn state_dir(home: &TempDir) -> assert_fs::fixture::ChildPath {
    home.child(".boardsync/state")
}

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().expect("home");
    boardsync_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("export"))
        .stdout(contains("board"))
        .stdout(contains("issue-boards"))
        .stdout(contains("checkpoint"));
}

#[test]
fn export_without_config_fails_with_path() {
    let home = TempDir::new().expect("home");
    boardsync_cmd(home.path())
        .arg("export")
        .assert()
        .failure()
        .stderr(contains("config not found"))
        .stderr(contains(".boardsync"));
}

#[test]
fn missing_secret_is_reported() {
    let home = TempDir::new().expect("home");
    write_config(
        &home,
        "customer_id: acme\napi_url: https://acme.example.test\nauth:\n  kind: bearer\n",
    );
    boardsync_cmd(home.path())
        .args(["checkpoint", "list"])
        .assert()
        .failure()
        .stderr(contains("BOARDSYNC_API_TOKEN"));
}

#[test]
fn secret_from_environment_satisfies_config() {
    let home = TempDir::new().expect("home");
    write_config(
        &home,
        "customer_id: acme\napi_url: https://acme.example.test\nauth:\n  kind: bearer\n",
    );
    boardsync_cmd(home.path())
        .env("BOARDSYNC_API_TOKEN", "from-env")
        .args(["checkpoint", "list"])
        .assert()
        .success()
        .stdout(contains("No checkpoints"));
}

#[test]
fn checkpoint_list_on_empty_state() {
    let home = TempDir::new().expect("home");
    write_config(&home, CONFIG);
    boardsync_cmd(home.path())
        .args(["checkpoint", "list"])
        .assert()
        .success()
        .stdout(contains("No checkpoints"));
}

#[test]
fn checkpoint_list_and_clear_round_trip() {
    let home = TempDir::new().expect("home");
    write_config(&home, CONFIG);

    let store = FileCheckpointStore::open_at(state_dir(&home).path(), "acme").expect("open");
    store
        .append_unique("boardlist", &["10".to_string(), "20".to_string()])
        .expect("seed boards");
    store.set("sprint_7", json!(0)).expect("seed sprint");
    store.flush().expect("flush");

    let assert = boardsync_cmd(home.path())
        .args(["checkpoint", "list", "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    let payload: serde_json::Value = serde_json::from_str(&stdout).expect("parse list json");
    assert_eq!(payload["boardlist"], json!(["10", "20"]));
    assert_eq!(payload["sprint_7"], json!(0));

    boardsync_cmd(home.path())
        .args(["checkpoint", "list"])
        .assert()
        .success()
        .stdout(contains("10, 20"))
        .stdout(contains("exported 1970-01-01"));

    boardsync_cmd(home.path())
        .args(["checkpoint", "clear"])
        .assert()
        .success()
        .stdout(contains("Cleared 2 checkpoints"));

    boardsync_cmd(home.path())
        .args(["checkpoint", "list"])
        .assert()
        .success()
        .stdout(contains("No checkpoints"));
}

#[test]
fn explicit_config_path_is_used() {
    let home = TempDir::new().expect("home");
    let elsewhere = TempDir::new().expect("elsewhere");
    let config = elsewhere.child("boardsync.yaml");
    let state = elsewhere.child("state");
    config
        .write_str(&format!("{CONFIG}state_dir: {}\n", state.path().display()))
        .expect("write config");

    boardsync_cmd(home.path())
        .args(["--config"])
        .arg(config.path())
        .args(["checkpoint", "clear"])
        .assert()
        .success()
        .stdout(contains(state.child("acme.json").path().display().to_string()));
    state.child("acme.json").assert(predicate::path::exists());
    home.child(".boardsync/config.yaml")
        .assert(predicate::path::missing());
}

#[test]
fn default_config_location_is_under_home() {
    let home = TempDir::new().expect("home");
    write_config(&home, CONFIG);
    assert_eq!(
        config_path_at(home.path()),
        home.child(".boardsync/config.yaml").path()
    );

    boardsync_cmd(home.path())
        .args(["checkpoint", "clear"])
        .assert()
        .success();
    state_dir(&home)
        .child("acme.json")
        .assert(predicate::str::contains("\"entries\""));
}

#[test]
fn unreachable_api_fails_the_export() {
    let home = TempDir::new().expect("home");
    write_config(&home, CONFIG);
    boardsync_cmd(home.path())
        .arg("export")
        .assert()
        .failure()
        .stderr(contains("export failed"))
        .stderr(contains("/board"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn issue_boards_output_requires_reexport() {
    let home = TempDir::new().expect("home");
    write_config(&home, CONFIG);
    boardsync_cmd(home.path())
        .args(["issue-boards", "APP-1", "--output", "out.jsonl"])
        .assert()
        .failure()
        .stderr(contains("--reexport"));
}

#[test]
fn issue_boards_with_no_history_finds_nothing_offline() {
    let home = TempDir::new().expect("home");
    write_config(&home, CONFIG);
    boardsync_cmd(home.path())
        .args(["issue-boards", "APP-1", "--json"])
        .assert()
        .success()
        .stdout(contains("\"boards\": []"));
}
