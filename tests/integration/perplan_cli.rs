use assert_cmd::Command;
use perplan_updater::server::{PackageStore, ServerState, router};
use perplan_updater::test_utils::{build_zip, spawn_server};
use perplan_updater::update::VersionStore;
use predicates::prelude::*;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

fn perplan(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("perplan").unwrap();
    cmd.env("PERPLAN_CONFIG_PATH", temp.path().join("config.toml"))
        .env("PERPLAN_DATA_DIR", temp.path().join("data"))
        .env("PERPLAN_NO_PROGRESS", "1");
    cmd
}

#[test]
fn test_status_json_when_offline() {
    let temp = TempDir::new().unwrap();
    let version_file = temp.path().join("version_info.json");
    VersionStore::new(&version_file).write("7", None);

    let output = perplan(&temp)
        .args(["status", "--json", "--base-url", "http://127.0.0.1:9", "--version-file"])
        .arg(&version_file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["installed"]["version"], "7");
    assert_eq!(report["remote"], Value::Null);
    assert_eq!(report["update_available"], false);
}

#[test]
fn test_publish_rejects_unversioned_file_locally() {
    let temp = TempDir::new().unwrap();
    let package = temp.path().join("latest.zip");
    std::fs::write(&package, build_zip(&[])).unwrap();

    perplan(&temp)
        .args(["publish", "--base-url", "http://127.0.0.1:9"])
        .arg(&package)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot determine a version"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_publish_uploads_to_server() {
    let temp = TempDir::new().unwrap();
    let store = PackageStore::open(temp.path().join("server"), "3").unwrap();
    let state = ServerState::new(store, "");
    let published: Arc<PackageStore> = state.store.clone();
    let base_url = spawn_server(router(state, 1024 * 1024)).await;

    let package = temp.path().join("update_v4.zip");
    std::fs::write(&package, build_zip(&[("perplan", b"v4")])).unwrap();

    let mut cmd = perplan(&temp);
    cmd.args(["publish", "--changelog", "Bug fixes", "--base-url", &base_url]).arg(&package);
    let assert = tokio::task::spawn_blocking(move || cmd.assert()).await.unwrap();
    assert.success().stdout(predicate::str::contains("Published version 4"));

    assert_eq!(published.current(), ("4".to_string(), Some("Bug fixes".to_string())));
    assert!(published.package_path("4").is_file());
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("perplan")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("publish"));
}
