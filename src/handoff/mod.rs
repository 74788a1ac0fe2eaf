//! The standalone updater's work (binary `updater`).
//!
//! Runs after the application launched it and exited. Its whole input is a
//! [`HandoffArguments`] plus the file system:
//!
//! 1. Wait for the application process to exit (bounded).
//! 2. Pause briefly so the OS releases file handles.
//! 3. Copy the extracted package over the installation, skipping the
//!    updater itself.
//! 4. Record the new version, only if something was installed.
//! 5. Delete the staging directory if it is inside the temp namespace.
//! 6. Restart the application.
//! 7. Schedule removal of the updater executable.
//!
//! Steps 5 to 7 run even when nothing could be copied. There is no
//! rollback: a partial copy leaves a mixed installation, which the report
//! makes visible.

pub mod cleanup;
pub mod copy;
pub mod restart;
pub mod wait;

use crate::constants::updater_exe_name;
use crate::update::handoff::HandoffArguments;
use crate::update::version_store::VersionStore;
use crate::utils::platform::file_name_string;
use crate::utils::{DetachedLauncher, ProcessLauncher};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

pub use copy::{CopyFailure, CopyReport};
pub use wait::{ProcessProbe, SysinfoProbe, WaitOutcome, WaitPolicy};

/// What happened in each step of one updater run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffReport {
    /// Whether the player exited or the wait timed out.
    pub wait: WaitOutcome,
    /// Installed entries and per-entry failures.
    pub copy: CopyReport,
    /// The version record now names the installed version.
    pub version_persisted: bool,
    /// The staging attempt directory was removed.
    pub cleanup_performed: bool,
    /// The player was started again.
    pub restart_launched: bool,
    /// The companion script that removes the updater was started.
    pub self_delete_scheduled: bool,
}

impl HandoffReport {
    /// At least one item was installed.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.copy.succeeded()
    }

    /// Succeeded, but the wait timed out or some items failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.succeeded() && (self.wait == WaitOutcome::TimedOut || !self.copy.failures.is_empty())
    }
}

/// Executes one handoff.
pub struct Handoff {
    args: HandoffArguments,
    probe: Box<dyn ProcessProbe>,
    launcher: Arc<dyn ProcessLauncher>,
    policy: WaitPolicy,
    updater_path: Option<PathBuf>,
}

impl Handoff {
    /// Handoff using the real process list and detached launches.
    pub fn new(args: HandoffArguments) -> Self {
        Self {
            args,
            probe: Box::new(SysinfoProbe::default()),
            launcher: Arc::new(DetachedLauncher),
            policy: WaitPolicy::default(),
            updater_path: std::env::current_exe().ok(),
        }
    }

    #[must_use]
    pub fn with_probe(mut self, probe: Box<dyn ProcessProbe>) -> Self {
        self.probe = probe;
        self
    }

    #[must_use]
    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: WaitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Path of the running updater executable, skipped when copying and
    /// deleted afterwards.
    #[must_use]
    pub fn with_updater_path(mut self, path: Option<PathBuf>) -> Self {
        self.updater_path = path;
        self
    }

    /// Arguments this handoff runs with.
    #[must_use]
    pub const fn args(&self) -> &HandoffArguments {
        &self.args
    }

    /// Run every step and report.
    pub async fn run(mut self) -> HandoffReport {
        let args = self.args.clone();

        let wait = wait::wait_for_exit(self.probe.as_mut(), &args.wait_for, self.policy).await;

        let skip = self
            .updater_path
            .as_deref()
            .map(file_name_string)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(updater_exe_name);
        info!("Installing {} into {}", args.source.display(), args.target.display());
        let copy = copy::install_package(&args.source, &args.target, &skip);

        let version_persisted = if copy.succeeded() {
            self.persist_version()
        } else {
            error!("Nothing was installed from {}", args.source.display());
            false
        };

        let staging_dir = cleanup::staging_dir_of(&args.source);
        let cleanup_performed = staging_dir.as_deref().is_some_and(cleanup::remove_staging_dir);

        let restart_launched = match restart::restart_app(self.launcher.as_ref(), &args) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to restart application: {e:#}");
                false
            }
        };

        let self_delete_scheduled = self.schedule_self_delete(staging_dir, cleanup_performed);

        HandoffReport {
            wait,
            copy,
            version_persisted,
            cleanup_performed,
            restart_launched,
            self_delete_scheduled,
        }
    }

    fn persist_version(&self) -> bool {
        let store = match &self.args.version_file {
            Some(path) => VersionStore::new(path),
            None => match VersionStore::open_default() {
                Ok(store) => store,
                Err(e) => {
                    warn!("Cannot locate version record: {e:#}");
                    return false;
                }
            },
        };
        store.write(&self.args.version, self.args.changelog.as_deref())
    }

    fn schedule_self_delete(&self, staging_dir: Option<PathBuf>, cleaned: bool) -> bool {
        if self.args.no_self_delete {
            return false;
        }
        let Some(updater) = self.updater_path.as_deref().filter(|p| p.exists()) else {
            return false;
        };

        // Whatever cleanup could not remove while the updater was running
        let leftover = staging_dir.filter(|dir| {
            !cleaned && dir.exists() && cleanup::is_staging_dir(dir) && updater.starts_with(dir)
        });

        match restart::schedule_self_delete(self.launcher.as_ref(), updater, leftover.as_deref()) {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to schedule updater removal: {e:#}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RecordingLauncher, ScriptedProbe};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        staging: PathBuf,
        target: PathBuf,
        version_file: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("perplan-media").join("update-test");
        let source = staging.join("extracted");
        fs::create_dir_all(source.join("assets")).unwrap();
        fs::write(source.join("perplan"), "app v3").unwrap();
        fs::write(source.join("assets/skin.css"), "v3").unwrap();
        fs::write(source.join("updater"), "updater v3").unwrap();

        let target = temp.path().join("install");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("perplan"), "app v2").unwrap();

        let version_file = temp.path().join("data").join("version_info.json");
        Fixture {
            staging,
            target,
            version_file,
            _temp: temp,
        }
    }

    fn arguments(fx: &Fixture) -> HandoffArguments {
        HandoffArguments {
            source: fx.staging.join("extracted"),
            target: fx.target.clone(),
            wait_for: "perplan".to_string(),
            version: "3".to_string(),
            app_name: "perplan".to_string(),
            interpreter: None,
            changelog: Some("Faster startup".to_string()),
            version_file: Some(fx.version_file.clone()),
            no_self_delete: true,
        }
    }

    fn handoff(args: HandoffArguments, probe: ScriptedProbe, launcher: &Arc<RecordingLauncher>) -> Handoff {
        Handoff::new(args)
            .with_probe(Box::new(probe))
            .with_launcher(launcher.clone())
            .with_policy(WaitPolicy::immediate())
            .with_updater_path(Some(PathBuf::from("/nonexistent/updater")))
    }

    fn read_version(path: &Path) -> Option<String> {
        VersionStore::new(path).read().map(|record| record.version)
    }

    #[tokio::test]
    async fn test_full_handoff() {
        let fx = fixture();
        let launcher = Arc::new(RecordingLauncher::default());

        let report = handoff(arguments(&fx), ScriptedProbe::running_for(0), &launcher).run().await;

        assert_eq!(report.wait, WaitOutcome::Exited);
        assert!(report.succeeded());
        assert!(!report.is_degraded());
        assert!(report.version_persisted);
        assert!(report.cleanup_performed);
        assert!(report.restart_launched);
        assert!(!report.self_delete_scheduled);

        assert_eq!(fs::read_to_string(fx.target.join("perplan")).unwrap(), "app v3");
        assert_eq!(fs::read_to_string(fx.target.join("assets/skin.css")).unwrap(), "v3");
        assert_eq!(read_version(&fx.version_file).as_deref(), Some("3"));
        assert_eq!(
            VersionStore::new(&fx.version_file).read().unwrap().changelog.as_deref(),
            Some("Faster startup")
        );
        assert!(!fx.staging.exists());

        let launches = launcher.launches();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].program, fx.target.join("perplan"));
    }

    #[tokio::test]
    async fn test_wait_timeout_still_installs() {
        let fx = fixture();
        let launcher = Arc::new(RecordingLauncher::default());

        let report = handoff(arguments(&fx), ScriptedProbe::always_running(), &launcher).run().await;

        assert_eq!(report.wait, WaitOutcome::TimedOut);
        assert!(report.succeeded());
        assert!(report.is_degraded());
        assert_eq!(read_version(&fx.version_file).as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_missing_source_keeps_version_and_restarts() {
        let fx = fixture();
        VersionStore::new(&fx.version_file).write("2", None);
        fs::remove_dir_all(fx.staging.join("extracted")).unwrap();
        let launcher = Arc::new(RecordingLauncher::default());

        let report = handoff(arguments(&fx), ScriptedProbe::running_for(0), &launcher).run().await;

        assert!(!report.succeeded());
        assert!(!report.version_persisted);
        assert_eq!(read_version(&fx.version_file).as_deref(), Some("2"));
        assert!(report.restart_launched);
        assert_eq!(fs::read_to_string(fx.target.join("perplan")).unwrap(), "app v2");
    }

    #[tokio::test]
    async fn test_staging_outside_namespace_is_left_alone() {
        let fx = fixture();
        let outside = fx.target.parent().unwrap().join("elsewhere");
        fs::rename(&fx.staging, &outside).unwrap();
        let mut args = arguments(&fx);
        args.source = outside.join("extracted");
        let launcher = Arc::new(RecordingLauncher::default());

        let report = handoff(args, ScriptedProbe::running_for(0), &launcher).run().await;

        assert!(report.succeeded());
        assert!(!report.cleanup_performed);
        assert!(outside.exists());
    }

    #[tokio::test]
    async fn test_restart_failure_is_reported() {
        let fx = fixture();
        let launcher = Arc::new(RecordingLauncher::failing());

        let report = handoff(arguments(&fx), ScriptedProbe::running_for(1), &launcher).run().await;

        assert!(report.succeeded());
        assert!(!report.restart_launched);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_self_delete_is_scheduled() {
        let fx = fixture();
        let updater = fx.target.parent().unwrap().join("bin").join("updater");
        fs::create_dir_all(updater.parent().unwrap()).unwrap();
        fs::write(&updater, "updater").unwrap();
        let mut args = arguments(&fx);
        args.no_self_delete = false;
        let launcher = Arc::new(RecordingLauncher::default());

        let report = handoff(args, ScriptedProbe::running_for(0), &launcher)
            .with_updater_path(Some(updater.clone()))
            .run()
            .await;

        assert!(report.self_delete_scheduled);
        let launches = launcher.launches();
        assert_eq!(launches.len(), 2);
        let script = PathBuf::from(&launches[1].args[0]);
        assert_eq!(launches[1].program, PathBuf::from("/bin/sh"));
        assert!(launches[1].hidden);
        assert!(fs::read_to_string(&script).unwrap().contains("updater"));
        let _ = fs::remove_file(script);
        // The script does the deleting, not the updater
        assert!(updater.exists());
    }
}
