//! Test utilities for the update pipeline
//!
//! Helpers shared by unit tests and the integration suite: test logging,
//! in-memory zip packages, recording stand-ins for the process seams, a UI
//! loop that answers consent prompts automatically, and an in-process
//! distribution server.
//!
//! # Example
//!
//! ```rust,no_run
//! use perplan_updater::test_utils::{RecordingLauncher, package_with_updater};
//!
//! let bytes = package_with_updater(&[("perplan", b"app")]);
//! let launcher = RecordingLauncher::default();
//! assert!(launcher.launches().is_empty());
//! # let _ = bytes;
//! ```

use crate::constants::updater_exe_name;
use crate::handoff::ProcessProbe;
use crate::update::ui::{NoticeLevel, ProgressStage, UiRequest};
use crate::utils::{LaunchSpec, ProcessLauncher};
use anyhow::Result;
use std::io::{Cursor, Write};
use std::sync::{Mutex, Once};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use zip::write::SimpleFileOptions;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; without either, tests run
/// silently.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Build a zip archive in memory from `(name, content)` pairs.
///
/// # Panics
///
/// Panics if the archive cannot be written.
#[must_use]
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A package containing the updater executable plus `entries`.
#[must_use]
pub fn package_with_updater(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let updater = updater_exe_name();
    let mut all: Vec<(&str, &[u8])> = vec![(updater.as_str(), b"#!/bin/sh\nexit 0\n")];
    all.extend_from_slice(entries);
    build_zip(&all)
}

/// [`ProcessLauncher`] that records launches instead of starting processes.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    launches: Mutex<Vec<LaunchSpec>>,
    fail: bool,
}

impl RecordingLauncher {
    /// A launcher whose every launch fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            launches: Mutex::default(),
            fail: true,
        }
    }

    /// Launches recorded so far.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn launches(&self) -> Vec<LaunchSpec> {
        self.launches.lock().unwrap().clone()
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<()> {
        self.launches.lock().unwrap().push(spec.clone());
        if self.fail {
            anyhow::bail!("launch of {} refused", spec.program.display());
        }
        Ok(())
    }
}

/// [`ProcessProbe`] that reports "running" for a fixed number of polls.
#[derive(Debug)]
pub struct ScriptedProbe {
    remaining: Option<usize>,
    polls: usize,
}

impl ScriptedProbe {
    /// Running for the first `polls` polls, gone afterwards.
    #[must_use]
    pub const fn running_for(polls: usize) -> Self {
        Self {
            remaining: Some(polls),
            polls: 0,
        }
    }

    /// Never exits.
    #[must_use]
    pub const fn always_running() -> Self {
        Self {
            remaining: None,
            polls: 0,
        }
    }

    /// Number of polls so far.
    #[must_use]
    pub const fn polls(&self) -> usize {
        self.polls
    }
}

impl ProcessProbe for ScriptedProbe {
    fn is_running(&mut self, _name: &str) -> bool {
        self.polls += 1;
        match &mut self.remaining {
            None => true,
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }
}

/// What a scripted UI loop saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Confirm(String),
    Progress(ProgressStage),
    Notify(NoticeLevel, String),
    Shutdown,
}

/// Drain `rx` like a UI loop would, answering consent with `answer`.
///
/// With `answer == None` consent prompts are never answered, so the worker
/// runs into its timeout. The task ends when every [`crate::update::ui::UiHandle`]
/// is dropped and yields the events in order.
pub fn spawn_ui_responder(
    mut rx: mpsc::UnboundedReceiver<UiRequest>,
    answer: Option<bool>,
) -> JoinHandle<Vec<UiEvent>> {
    tokio::spawn(async move {
        let mut events = Vec::new();
        let mut unanswered: Vec<oneshot::Sender<bool>> = Vec::new();

        while let Some(request) = rx.recv().await {
            match request {
                UiRequest::Confirm {
                    message,
                    reply,
                    ..
                } => {
                    events.push(UiEvent::Confirm(message));
                    match answer {
                        Some(answer) => {
                            let _ = reply.send(answer);
                        }
                        None => unanswered.push(reply),
                    }
                }
                UiRequest::Progress {
                    stage,
                    ..
                } => events.push(UiEvent::Progress(stage)),
                UiRequest::Notify {
                    level,
                    message,
                    ..
                } => events.push(UiEvent::Notify(level, message)),
                UiRequest::Shutdown => events.push(UiEvent::Shutdown),
            }
        }

        drop(unanswered);
        events
    })
}

/// Serve `router` on an ephemeral localhost port; returns its base URL.
///
/// # Panics
///
/// Panics if no port can be bound.
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}
