//! Restarting the application and removing the updater afterwards.
//!
//! A running executable cannot delete itself on Windows, so the updater
//! writes a small companion script that waits a moment, deletes the updater
//! (and what is left of its staging directory) and finally itself. The same
//! approach is used on Unix with a POSIX shell script.

use crate::constants::SELF_DELETE_DELAY_SECS;
use crate::update::handoff::HandoffArguments;
use crate::utils::{LaunchSpec, ProcessLauncher, atomic_write, get_temp_root};
use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Launch description for restarting the application.
#[must_use]
pub fn restart_spec(args: &HandoffArguments) -> LaunchSpec {
    let app = args.app_path();
    match &args.interpreter {
        Some(interpreter) => {
            LaunchSpec::new(interpreter).args([app.into_os_string()]).working_dir(&args.target)
        }
        None => LaunchSpec::new(app).working_dir(&args.target),
    }
}

/// Restart the application described by `args`.
pub fn restart_app(launcher: &dyn ProcessLauncher, args: &HandoffArguments) -> Result<()> {
    let app = args.app_path();
    if !app.exists() {
        bail!("Application not found at {}", app.display());
    }

    launcher.launch(&restart_spec(args))?;
    info!("Restarted {}", app.display());
    Ok(())
}

/// Script that deletes `updater`, then `leftover_dir`, then itself.
#[must_use]
pub fn self_delete_script(updater: &Path, leftover_dir: Option<&Path>) -> String {
    if cfg!(windows) {
        let mut script = format!(
            "@echo off\r\n\
             ping 127.0.0.1 -n {} > nul\r\n\
             del /f /q \"{}\"\r\n",
            SELF_DELETE_DELAY_SECS + 1,
            updater.display()
        );
        if let Some(dir) = leftover_dir {
            script.push_str(&format!("rmdir /s /q \"{}\"\r\n", dir.display()));
        }
        script.push_str("del /f /q \"%~f0\"\r\n");
        script
    } else {
        let mut script = format!(
            "#!/bin/sh\nsleep {SELF_DELETE_DELAY_SECS}\nrm -f {}\n",
            shell_quote(updater)
        );
        if let Some(dir) = leftover_dir {
            script.push_str(&format!("rm -rf {}\n", shell_quote(dir)));
        }
        script.push_str("rm -f \"$0\"\n");
        script
    }
}

fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}

/// Write the companion script and start it hidden.
///
/// Returns the script path.
pub fn schedule_self_delete(
    launcher: &dyn ProcessLauncher,
    updater: &Path,
    leftover_dir: Option<&Path>,
) -> Result<PathBuf> {
    let extension = if cfg!(windows) { "bat" } else { "sh" };
    let script_path = get_temp_root()
        .join(format!("cleanup-{}.{extension}", uuid::Uuid::new_v4().simple()));
    atomic_write(&script_path, self_delete_script(updater, leftover_dir).as_bytes())?;

    let spec = if cfg!(windows) {
        LaunchSpec::new("cmd").args([std::ffi::OsString::from("/C"), script_path.clone().into()])
    } else {
        LaunchSpec::new("/bin/sh").args([script_path.clone().into_os_string()])
    };

    if let Err(e) = launcher.launch(&spec.hidden(true)) {
        warn!("Failed to start self-delete script: {e:#}");
        let _ = std::fs::remove_file(&script_path);
        return Err(e);
    }

    info!("Scheduled removal of {}", updater.display());
    Ok(script_path)
}
