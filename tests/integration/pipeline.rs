use clap::Parser;
use perplan_updater::config::UpdateConfig;
use perplan_updater::handoff::{Handoff, WaitOutcome, WaitPolicy};
use perplan_updater::server::{PackageStore, ServerState, router};
use perplan_updater::test_utils::{
    RecordingLauncher, ScriptedProbe, UiEvent, init_test_logging, package_with_updater,
    spawn_server, spawn_ui_responder,
};
use perplan_updater::update::{
    AppIdentity, HandoffArguments, PackageStager, UiHandle, UpdateOrchestrator, UpdateOutcome,
    VersionStore,
};
use std::ffi::OsString;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const CHANGELOG: &str = "- New skin\n- Gapless playback";

/// Player at version 2, server publishing version 3: check, consent,
/// stage, hand off, install, restart.
#[tokio::test]
async fn test_update_from_two_to_three() {
    init_test_logging(None);
    let temp = TempDir::new().unwrap();

    let store = PackageStore::open(temp.path().join("server"), "2").unwrap();
    store
        .publish(
            "3",
            &package_with_updater(&[
                ("perplan", b"player v3"),
                ("skins/default.css", b"v3 skin"),
            ]),
            Some(CHANGELOG),
        )
        .unwrap();
    let base_url = spawn_server(router(ServerState::new(store, ""), 16 * 1024 * 1024)).await;

    let install = temp.path().join("install");
    fs::create_dir_all(install.join("skins")).unwrap();
    fs::write(install.join("perplan"), "player v2").unwrap();
    fs::write(install.join("skins/default.css"), "v2 skin").unwrap();
    fs::write(install.join("player.ini"), "volume=40").unwrap();

    let version_file = temp.path().join("data/version_info.json");
    VersionStore::new(&version_file).write("2", None);

    // Player side
    let (ui, rx) = UiHandle::channel();
    let responder = spawn_ui_responder(rx, Some(true));
    let player_launcher = Arc::new(RecordingLauncher::default());
    let config = UpdateConfig {
        base_url,
        ..UpdateConfig::default()
    };
    let mut orchestrator = UpdateOrchestrator::new(config, ui)
        .unwrap()
        .with_store(VersionStore::new(&version_file))
        .with_stager(PackageStager::new(temp.path().join("perplan-media")))
        .with_identity(AppIdentity::Packaged {
            exe_path: install.join("perplan"),
        })
        .with_launcher(player_launcher.clone());

    let outcome = orchestrator.check_and_update().await;
    drop(orchestrator);
    let events = responder.await.unwrap();

    let args = match outcome {
        UpdateOutcome::HandoffRequested {
            args,
        } => args,
        other => panic!("expected handoff, got {other:?}"),
    };
    assert_eq!(events.last(), Some(&UiEvent::Shutdown));
    let launches = player_launcher.launches();
    assert_eq!(launches.len(), 1);
    let updater_path = launches[0].program.clone();
    let staging = args.source.parent().unwrap().to_path_buf();
    assert!(staging.exists());

    // Updater side, parsed from the command line the player launched it with
    let argv = std::iter::once(OsString::from("updater"))
        .chain(launches[0].args.iter().cloned())
        .chain(std::iter::once(OsString::from("--no-self-delete")));
    let handoff_args = HandoffArguments::try_parse_from(argv).unwrap();
    assert_eq!(handoff_args.changelog.as_deref(), Some(CHANGELOG));
    assert_eq!(handoff_args.source, args.source);
    let updater_launcher = Arc::new(RecordingLauncher::default());
    let report = Handoff::new(handoff_args)
        .with_probe(Box::new(ScriptedProbe::running_for(2)))
        .with_launcher(updater_launcher.clone())
        .with_policy(WaitPolicy {
            poll_interval: Duration::from_millis(5),
            timeout: Duration::from_secs(5),
            grace: Duration::ZERO,
        })
        .with_updater_path(Some(updater_path))
        .run()
        .await;

    assert_eq!(report.wait, WaitOutcome::Exited);
    assert!(report.succeeded());
    assert!(!report.is_degraded());
    assert!(report.version_persisted);
    assert!(report.cleanup_performed);
    assert!(report.restart_launched);

    assert_eq!(fs::read_to_string(install.join("perplan")).unwrap(), "player v3");
    assert_eq!(fs::read_to_string(install.join("skins/default.css")).unwrap(), "v3 skin");
    assert_eq!(fs::read_to_string(install.join("player.ini")).unwrap(), "volume=40");
    assert!(!install.join(perplan_updater::constants::updater_exe_name()).exists());
    assert!(!staging.exists());

    let record = VersionStore::new(&version_file).read().unwrap();
    assert_eq!(record.version, "3");
    assert_eq!(record.changelog.as_deref(), Some(CHANGELOG));
    assert!(record.updated_at().is_some());

    let relaunch = updater_launcher.launches();
    assert_eq!(relaunch.len(), 1);
    assert_eq!(relaunch[0].program, install.join("perplan"));
}

/// The next check after the install finds nothing to do.
#[tokio::test]
async fn test_check_after_install_is_up_to_date() {
    let temp = TempDir::new().unwrap();
    let store = PackageStore::open(temp.path().join("server"), "3").unwrap();
    let base_url = spawn_server(router(ServerState::new(store, ""), 1024)).await;

    let version_file = temp.path().join("version_info.json");
    VersionStore::new(&version_file).write("3", Some("New skin"));

    let (ui, rx) = UiHandle::channel();
    let responder = spawn_ui_responder(rx, Some(true));
    let config = UpdateConfig {
        base_url,
        ..UpdateConfig::default()
    };
    let mut orchestrator = UpdateOrchestrator::new(config, ui)
        .unwrap()
        .with_store(VersionStore::new(&version_file))
        .with_launcher(Arc::new(RecordingLauncher::default()));

    assert_eq!(orchestrator.check_and_update().await, UpdateOutcome::UpToDate);
    drop(orchestrator);
    assert!(responder.await.unwrap().is_empty());
}
