//! Detached process launching
//!
//! Both sides of the handoff start processes that must outlive their parent:
//! the application starts the updater and then exits, the updater restarts
//! the application and schedules its own deletion. [`ProcessLauncher`] is
//! the seam between that logic and the OS so tests can record launches
//! instead of performing them.

use crate::core::UpdateError;
use anyhow::Result;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Everything needed to start one detached process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Executable to run
    pub program: PathBuf,
    /// Command-line arguments
    pub args: Vec<OsString>,
    /// Working directory, or the parent's when `None`
    pub working_dir: Option<PathBuf>,
    /// Run without a console window and with null stdio
    pub hidden: bool,
}

impl LaunchSpec {
    /// Launch `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            hidden: false,
        }
    }

    /// Append arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Hide the process from the user.
    #[must_use]
    pub const fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

/// Starts processes that keep running after the caller exits.
pub trait ProcessLauncher: Send + Sync {
    /// Start the process described by `spec` without waiting for it.
    fn launch(&self, spec: &LaunchSpec) -> Result<()>;
}

/// Real launcher backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedLauncher;

impl ProcessLauncher for DetachedLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<()> {
        debug!("Launching {:?} with {:?}", spec.program, spec.args);

        let mut command = Command::new(&spec.program);
        command.args(&spec.args).stdin(Stdio::null());

        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        if spec.hidden {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        configure_detached(&mut command, spec.hidden);

        let child = command.spawn().map_err(|e| UpdateError::Launch {
            program: spec.program.display().to_string(),
            reason: e.to_string(),
        })?;

        info!("Started {} (pid {})", spec.program.display(), child.id());
        Ok(())
    }
}

#[cfg(windows)]
fn configure_detached(command: &mut Command, hidden: bool) {
    use std::os::windows::process::CommandExt;

    const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;

    let window = if hidden {
        CREATE_NO_WINDOW
    } else {
        CREATE_NEW_CONSOLE
    };
    command.creation_flags(CREATE_NEW_PROCESS_GROUP | window);
}

#[cfg(unix)]
fn configure_detached(command: &mut Command, _hidden: bool) {
    use std::os::unix::process::CommandExt;

    // Own process group: a terminal hangup aimed at the parent does not reach the child.
    command.process_group(0);
}

#[cfg(not(any(unix, windows)))]
fn configure_detached(_command: &mut Command, _hidden: bool) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_spec_builder() {
        let spec = LaunchSpec::new("/opt/ppl/updater")
            .args(["--source", "/tmp/x"])
            .working_dir("/opt/ppl")
            .hidden(true);

        assert_eq!(spec.program, PathBuf::from("/opt/ppl/updater"));
        assert_eq!(spec.args, vec![OsString::from("--source"), OsString::from("/tmp/x")]);
        assert_eq!(spec.working_dir, Some(PathBuf::from("/opt/ppl")));
        assert!(spec.hidden);
    }

    #[test]
    fn test_launch_missing_program_is_launch_error() {
        let spec = LaunchSpec::new("/definitely/not/here/perplan-missing");
        let err = DetachedLauncher.launch(&spec).unwrap_err();
        assert!(matches!(err.downcast_ref::<UpdateError>(), Some(UpdateError::Launch { .. })));
    }
}
