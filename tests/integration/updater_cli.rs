//! The `updater` binary, launched the way the player launches it.
//!
//! These tests run the real process probe and launcher, so the restarted
//! "player" is a shell script that exits immediately.

use assert_cmd::Command;
use perplan_updater::update::VersionStore;
use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Layout {
    temp: TempDir,
    source: PathBuf,
    target: PathBuf,
    version_file: PathBuf,
}

fn layout() -> Layout {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("perplan-media/update-cli/extracted");
    let target = temp.path().join("install");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&target).unwrap();
    Layout {
        version_file: temp.path().join("data/version_info.json"),
        source,
        target,
        temp,
    }
}

#[cfg(unix)]
fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn updater(layout: &Layout) -> Command {
    let mut cmd = Command::cargo_bin("updater").unwrap();
    cmd.env("PERPLAN_TEMP_DIR", layout.temp.path().join("perplan-media"))
        .arg("--source")
        .arg(&layout.source)
        .arg("--target")
        .arg(&layout.target)
        .args(["--wait-for", "perplan-test-no-such-process", "--app", "perplan"])
        .arg("--version-file")
        .arg(&layout.version_file)
        .arg("--no-self-delete");
    cmd
}

#[cfg(unix)]
#[test]
#[serial]
fn test_updater_installs_and_records_version() {
    let layout = layout();
    write_script(&layout.source.join("perplan"), "exit 0");
    fs::write(layout.source.join("notes.txt"), "v5 notes").unwrap();
    fs::write(layout.source.join("updater"), "updater binary").unwrap();
    fs::write(layout.target.join("notes.txt"), "v4 notes").unwrap();

    updater(&layout)
        .args(["--version", "5", "--changelog", "- Gapless playback"])
        .assert()
        .success()
        .stdout(predicate::str::contains("updated to 5"));

    assert_eq!(fs::read_to_string(layout.target.join("notes.txt")).unwrap(), "v5 notes");
    assert!(layout.target.join("perplan").exists());
    assert!(!layout.target.join("updater").exists());
    // The staging attempt directory is gone, its namespace root is not
    assert!(!layout.source.parent().unwrap().exists());
    assert!(layout.temp.path().join("perplan-media").exists());

    let record = VersionStore::new(&layout.version_file).read().unwrap();
    assert_eq!(record.version, "5");
    assert_eq!(record.changelog.as_deref(), Some("- Gapless playback"));
}

#[cfg(unix)]
#[test]
#[serial]
fn test_updater_survives_closed_stdout() {
    let layout = layout();
    write_script(&layout.source.join("perplan"), "exit 0");

    // Same arguments as the player passes, but with the reading end of
    // stdout already gone, as after the player exits.
    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("updater"))
        .env("PERPLAN_TEMP_DIR", layout.temp.path().join("perplan-media"))
        .arg("--source")
        .arg(&layout.source)
        .arg("--target")
        .arg(&layout.target)
        .args(["--wait-for", "perplan-test-no-such-process", "--app", "perplan"])
        .args(["--version", "6"])
        .arg("--version-file")
        .arg(&layout.version_file)
        .arg("--no-self-delete")
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .spawn()
        .unwrap();
    drop(child.stdout.take());

    let status = child.wait().unwrap();
    assert!(status.success(), "updater exited with {status}");
    assert_eq!(VersionStore::new(&layout.version_file).read().unwrap().version, "6");
}

#[test]
#[serial]
fn test_updater_with_empty_source_fails() {
    let layout = layout();
    fs::remove_dir_all(&layout.source).unwrap();
    VersionStore::new(&layout.version_file).write("4", None);

    updater(&layout)
        .args(["--version", "5"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no files could be installed"))
        .stderr(predicate::str::contains("restart PPL Player manually"));

    assert_eq!(VersionStore::new(&layout.version_file).read().unwrap().version, "4");
}

#[test]
fn test_updater_requires_handoff_arguments() {
    Command::cargo_bin("updater")
        .unwrap()
        .args(["--target", "/tmp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--source"));
}
