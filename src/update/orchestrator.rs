//! The update state machine.
//!
//! ```text
//! Idle -> CheckingVersion -> UpToDate
//!                         -> FirstRun
//!                         -> UpdateAvailable -> AwaitingUserConsent -> Declined
//!                                                                   -> Staging -> StageFailed
//!                                                                              -> HandoffRequested -> Terminating
//! ```
//!
//! One [`UpdateOrchestrator`] drives one update attempt. It never touches the
//! UI itself: consent, progress, failure notices and the final shutdown
//! request all go through the [`UiHandle`]. Every failure is turned into an
//! [`UpdateOutcome`]; nothing propagates to the host application.
//!
//! The stages are strictly ordered: version check, consent, download,
//! staging, updater launch, shutdown request. The only way to cancel is to
//! decline (or ignore) the consent prompt.

use crate::config::UpdateConfig;
use crate::constants::PRODUCT_NAME;
use crate::core::UpdateError;
use crate::update::client::{DistributionClient, RemoteVersionInfo};
use crate::update::comparison::VersionComparator;
use crate::update::handoff::{AppIdentity, HandoffArguments};
use crate::update::stager::{PackageStager, StagePhase};
use crate::update::ui::{NoticeLevel, ProgressStage, UiHandle};
use crate::update::version_store::VersionStore;
use crate::utils::{DetachedLauncher, LaunchSpec, ProcessLauncher, remove_dir_all};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Where the orchestrator is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Not started.
    Idle,
    /// Reading the local record and querying the endpoint.
    CheckingVersion,
    /// Nothing to do (or the endpoint is unreachable).
    UpToDate,
    /// No local record yet; a baseline is being recorded.
    FirstRun,
    /// The endpoint has a newer version.
    UpdateAvailable,
    /// Waiting for the user to accept.
    AwaitingUserConsent,
    /// The user said no, or did not answer in time.
    Declined,
    /// Downloading and staging the package.
    Staging,
    /// Download, staging or updater launch failed.
    StageFailed,
    /// The updater is running.
    HandoffRequested,
    /// Shutdown of the host application was requested.
    Terminating,
}

/// Final result of [`UpdateOrchestrator::check_and_update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// First run: `baseline` was recorded if the endpoint answered.
    FirstRun {
        /// Version recorded as installed, if any
        baseline: Option<String>,
    },
    /// The installed version is current.
    UpToDate,
    /// The endpoint could not be reached; treated as up to date.
    Offline,
    /// The user declined or let the prompt time out.
    Declined,
    /// The update could not be prepared; the application is unchanged.
    StageFailed {
        /// Human-readable cause
        reason: String,
    },
    /// The updater was launched and the application asked to exit.
    HandoffRequested {
        /// Arguments the updater was launched with
        args: HandoffArguments,
    },
}

/// Drives one update attempt from version check to handoff.
pub struct UpdateOrchestrator {
    config: UpdateConfig,
    client: DistributionClient,
    store: VersionStore,
    stager: PackageStager,
    comparator: Box<dyn VersionComparator>,
    identity: AppIdentity,
    launcher: Arc<dyn ProcessLauncher>,
    ui: UiHandle,
    force: bool,
    state: UpdateState,
    history: Vec<UpdateState>,
}

impl UpdateOrchestrator {
    /// Orchestrator for the running executable with default locations.
    pub fn new(config: UpdateConfig, ui: UiHandle) -> Result<Self> {
        let client = DistributionClient::new(&config)?;
        let comparator = config.comparator.comparator();

        Ok(Self {
            client,
            store: VersionStore::open_default()?,
            stager: PackageStager::default(),
            comparator,
            identity: AppIdentity::current()?,
            launcher: Arc::new(DetachedLauncher),
            ui,
            force: false,
            state: UpdateState::Idle,
            history: Vec::new(),
            config,
        })
    }

    /// Use a specific version record.
    #[must_use]
    pub fn with_store(mut self, store: VersionStore) -> Self {
        self.store = store;
        self
    }

    /// Use a specific staging area.
    #[must_use]
    pub fn with_stager(mut self, stager: PackageStager) -> Self {
        self.stager = stager;
        self
    }

    /// Install on behalf of `identity` instead of the running executable.
    #[must_use]
    pub fn with_identity(mut self, identity: AppIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Launch the updater through `launcher`.
    #[must_use]
    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Compare versions with `comparator` instead of the configured one.
    #[must_use]
    pub fn with_comparator(mut self, comparator: Box<dyn VersionComparator>) -> Self {
        self.comparator = comparator;
        self
    }

    /// Offer the remote version even if it is not newer.
    #[must_use]
    pub const fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> UpdateState {
        self.state
    }

    /// Every state entered so far, in order.
    #[must_use]
    pub fn history(&self) -> &[UpdateState] {
        &self.history
    }

    /// Run on a dedicated worker thread with its own runtime.
    ///
    /// The host keeps its own loop responsive and reads the outcome from the
    /// join handle, usually after it has stopped draining UI requests.
    pub fn spawn_background(self) -> Result<JoinHandle<UpdateOutcome>> {
        std::thread::Builder::new()
            .name("update-worker".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!("Failed to start update worker runtime: {e}");
                        return UpdateOutcome::Offline;
                    }
                };
                let mut orchestrator = self;
                runtime.block_on(orchestrator.check_and_update())
            })
            .context("Failed to spawn update worker thread")
    }

    /// Check for an update and, with the user's consent, hand off to the
    /// updater.
    pub async fn check_and_update(&mut self) -> UpdateOutcome {
        self.transition(UpdateState::CheckingVersion);

        let local = self.store.read();
        let remote = self.client.fetch_remote_version().await;

        let Some(local) = local else {
            return self.record_baseline(remote);
        };

        let Some(remote) = remote else {
            debug!("Update endpoint unavailable; continuing with {}", local.version);
            self.transition(UpdateState::UpToDate);
            return UpdateOutcome::Offline;
        };

        let newer = self.comparator.is_newer(&local.version, &remote.version);
        if !newer && !self.force {
            info!("Installed version {} is up to date (remote {})", local.version, remote.version);
            self.transition(UpdateState::UpToDate);
            return UpdateOutcome::UpToDate;
        }

        info!("Update available: {} -> {}", local.version, remote.version);
        self.transition(UpdateState::UpdateAvailable);

        self.transition(UpdateState::AwaitingUserConsent);
        let accepted = self
            .ui
            .confirm(
                "Update available",
                consent_message(&local.version, &remote),
                self.config.consent_timeout(),
            )
            .await;
        if !accepted {
            info!("Update to {} declined", remote.version);
            self.transition(UpdateState::Declined);
            return UpdateOutcome::Declined;
        }

        self.transition(UpdateState::Staging);
        match self.stage_and_launch(&remote).await {
            Ok(args) => {
                self.transition(UpdateState::HandoffRequested);
                if !self.ui.request_shutdown() {
                    warn!("UI loop is gone; the updater waits for the process to exit");
                }
                self.transition(UpdateState::Terminating);
                UpdateOutcome::HandoffRequested {
                    args,
                }
            }
            Err(e) => {
                self.transition(UpdateState::StageFailed);
                let reason = format!("{e:#}");
                if is_transient(&e) {
                    warn!("Download of {} failed: {reason}", remote.version);
                    self.ui.notify(
                        NoticeLevel::Info,
                        "Update postponed",
                        "The update server could not be reached. The update will be offered \
                         again next time.",
                    );
                } else {
                    error!("Update to {} failed: {reason}", remote.version);
                    self.ui.notify(
                        NoticeLevel::Error,
                        "Update failed",
                        format!("The update could not be installed: {reason}"),
                    );
                }
                UpdateOutcome::StageFailed {
                    reason,
                }
            }
        }
    }

    fn record_baseline(&mut self, remote: Option<RemoteVersionInfo>) -> UpdateOutcome {
        self.transition(UpdateState::FirstRun);

        let baseline = remote.map(|remote| {
            info!("First run; recording version {} as installed", remote.version);
            self.store.write(&remote.version, remote.changelog.as_deref());
            remote.version
        });

        UpdateOutcome::FirstRun {
            baseline,
        }
    }

    async fn stage_and_launch(&self, remote: &RemoteVersionInfo) -> Result<HandoffArguments> {
        self.ui.progress(ProgressStage::Preparing);

        self.ui.progress(ProgressStage::Downloading);
        let bytes = self.client.download_package(&remote.download_url).await?;

        let expected = if self.config.verify_checksum {
            remote.sha256.clone()
        } else {
            None
        };
        let stager = self.stager.clone();
        let ui = self.ui.clone();
        let staged = tokio::task::spawn_blocking(move || {
            stager.stage_with_progress(&bytes, expected.as_deref(), |phase| {
                ui.progress(match phase {
                    StagePhase::Saving => ProgressStage::Saving,
                    StagePhase::Extracting => ProgressStage::Extracting,
                });
            })
        })
        .await
        .context("Staging task panicked")??;

        self.ui.progress(ProgressStage::Installing);

        let launch = || -> Result<HandoffArguments> {
            let args =
                self.identity.handoff_arguments(&staged, remote, Some(self.store.location()))?;
            let spec = LaunchSpec::new(&staged.updater_path)
                .args(args.to_args())
                .working_dir(&staged.extract_dir);
            self.launcher.launch(&spec)?;
            Ok(args)
        };

        match launch() {
            Ok(args) => {
                info!("Handed off to updater at {}", staged.updater_path.display());
                Ok(args)
            }
            Err(e) => {
                if let Err(cleanup) = remove_dir_all(&staged.staging_root) {
                    warn!("Failed to remove staging directory: {cleanup:#}");
                }
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: UpdateState) {
        debug!("Update state {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }
}

/// Whether `error` stems from the network or the server rather than the
/// package itself.
fn is_transient(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| cause.downcast_ref::<UpdateError>().is_some_and(UpdateError::is_transient))
}

fn consent_message(local: &str, remote: &RemoteVersionInfo) -> String {
    let mut message =
        format!("{PRODUCT_NAME} {} is available (installed: {local}).", remote.version);
    if let Some(changelog) = remote.changelog.as_deref().filter(|c| !c.trim().is_empty()) {
        message.push_str("\n\nWhat's new:\n");
        message.push_str(changelog.trim());
    }
    message.push_str("\n\nThe player will close and restart to install it. Update now?");
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consent_message_includes_versions_and_changelog() {
        let remote = RemoteVersionInfo {
            version: "4".to_string(),
            changelog: Some("Faster seeking\n".to_string()),
            download_url: "/api/download".to_string(),
            sha256: None,
        };
        let message = consent_message("3", &remote);
        assert!(message.contains("PPL Player 4 is available (installed: 3)"));
        assert!(message.contains("Faster seeking"));
        assert!(message.ends_with("Update now?"));
    }

    #[test]
    fn test_transient_failures_found_through_context() {
        let offline = anyhow::Error::from(UpdateError::Network {
            operation: "download package".to_string(),
            reason: "connection refused".to_string(),
        })
        .context("Download failed");
        assert!(is_transient(&offline));

        let missing = anyhow::Error::from(UpdateError::MissingUpdater {
            name: "updater".to_string(),
            dir: "/tmp/perplan-media/update-1/extracted".to_string(),
        });
        assert!(!is_transient(&missing));
        assert!(!is_transient(&anyhow::anyhow!("disk full")));
    }

    #[test]
    fn test_consent_message_without_changelog() {
        let remote = RemoteVersionInfo {
            version: "4".to_string(),
            changelog: Some("  ".to_string()),
            download_url: "/api/download".to_string(),
            sha256: None,
        };
        assert!(!consent_message("3", &remote).contains("What's new"));
    }
}
