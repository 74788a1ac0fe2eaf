//! Waiting for the application to exit.
//!
//! The updater polls the OS process list until no process with the given
//! name is left, up to a fixed bound. Hitting the bound is not fatal: the
//! copy step runs anyway and reports the files that are still locked. The
//! caller gets [`WaitOutcome::TimedOut`] so the degraded case is visible in
//! the report.

use crate::constants::{HANDLE_RELEASE_GRACE, PROCESS_EXIT_TIMEOUT, PROCESS_POLL_INTERVAL};
use std::ffi::OsStr;
use std::path::Path;
use std::time::{Duration, Instant};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System, UpdateKind};
use tracing::{debug, info, warn};

/// Answers "is a process with this name running?".
pub trait ProcessProbe: Send {
    /// Whether any process named `name` is running.
    fn is_running(&mut self, name: &str) -> bool;
}

/// [`ProcessProbe`] backed by `sysinfo`.
///
/// A process matches when either its reported name or its executable's file
/// name equals `name`; Linux truncates reported names to 15 bytes, so a
/// truncated prefix of `name` also matches there. Matching is
/// case-insensitive on Windows.
pub struct SysinfoProbe {
    system: System,
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self {
            system: System::new_with_specifics(RefreshKind::nothing()),
        }
    }
}

impl ProcessProbe for SysinfoProbe {
    fn is_running(&mut self, name: &str) -> bool {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet),
        );
        let own_pid = sysinfo::get_current_pid().ok();

        self.system.processes().iter().any(|(pid, process)| {
            if Some(*pid) == own_pid {
                return false;
            }
            let exe_name = process.exe().and_then(Path::file_name);
            names_match(process.name(), name)
                || exe_name.is_some_and(|exe| names_match(exe, name))
        })
    }
}

fn names_match(candidate: &OsStr, wanted: &str) -> bool {
    let candidate = candidate.to_string_lossy();
    if cfg!(windows) {
        return candidate.eq_ignore_ascii_case(wanted);
    }
    if candidate == wanted {
        return true;
    }
    // Linux `comm` is cut to 15 bytes
    cfg!(target_os = "linux")
        && candidate.len() == 15
        && wanted.len() > 15
        && wanted.starts_with(candidate.as_ref())
}

/// Timing of the wait step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Delay between two polls.
    pub poll_interval: Duration,
    /// Give up waiting after this long.
    pub timeout: Duration,
    /// Pause after the process is gone, before touching files.
    pub grace: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: PROCESS_POLL_INTERVAL,
            timeout: PROCESS_EXIT_TIMEOUT,
            grace: HANDLE_RELEASE_GRACE,
        }
    }
}

impl WaitPolicy {
    /// No waiting at all.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            timeout: Duration::ZERO,
            grace: Duration::ZERO,
        }
    }
}

/// How the wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The process was observed gone.
    Exited,
    /// The process was still running when the bound was hit.
    TimedOut,
}

/// Wait for every process named `name` to exit, then apply the grace delay.
pub async fn wait_for_exit(
    probe: &mut dyn ProcessProbe,
    name: &str,
    policy: WaitPolicy,
) -> WaitOutcome {
    info!("Waiting for {name} to exit");
    let started = Instant::now();

    loop {
        if !probe.is_running(name) {
            debug!("{name} exited after {:?}", started.elapsed());
            if !policy.grace.is_zero() {
                tokio::time::sleep(policy.grace).await;
            }
            return WaitOutcome::Exited;
        }

        if started.elapsed() >= policy.timeout {
            warn!("{name} still running after {:?}; continuing anyway", policy.timeout);
            return WaitOutcome::TimedOut;
        }

        tokio::time::sleep(policy.poll_interval).await;
    }
}
