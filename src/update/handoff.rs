//! The handoff contract between the application and the updater.
//!
//! [`HandoffArguments`] is the only thing the two processes share besides the
//! file system. The application serializes it with
//! [`HandoffArguments::to_args`] when it launches the updater, and the
//! updater binary parses the same struct back with clap. Keeping both sides
//! on one type means a flag cannot be renamed on one side only.

use crate::constants::{MAIN_SCRIPT_NAME, main_exe_name};
use crate::core::UpdateError;
use crate::update::client::RemoteVersionInfo;
use crate::update::stager::StagedPackage;
use crate::utils::platform::file_name_string;
use anyhow::{Context, Result};
use clap::Parser;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Instructions for one updater run.
///
/// # Command line
///
/// ```text
/// updater --source <DIR> --target <DIR> --wait-for <NAME>
///         [--version <V>] [--app <NAME>] [--interpreter <PATH>]
///         [--changelog <TEXT>] [--version-file <PATH>] [--no-self-delete]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "updater",
    about = "Applies a staged PPL Player update once the player has exited"
)]
pub struct HandoffArguments {
    /// Extracted package directory to install from
    #[arg(long, value_name = "DIR")]
    pub source: PathBuf,

    /// Installation directory to update
    #[arg(long, value_name = "DIR")]
    pub target: PathBuf,

    /// Process name to wait for before touching any file
    #[arg(long = "wait-for", value_name = "NAME")]
    pub wait_for: String,

    /// Version being installed, recorded after the copy
    #[arg(long, value_name = "V", default_value = "0", allow_hyphen_values = true)]
    pub version: String,

    /// Executable (or script) to restart, relative to the target
    #[arg(long = "app", value_name = "NAME", default_value_t = main_exe_name())]
    pub app_name: String,

    /// Interpreter used to restart a script-based application
    #[arg(long, value_name = "PATH")]
    pub interpreter: Option<PathBuf>,

    /// Changelog of the installed version
    #[arg(long, value_name = "TEXT", allow_hyphen_values = true)]
    pub changelog: Option<String>,

    /// Version record to update instead of the default location
    #[arg(long = "version-file", value_name = "PATH")]
    pub version_file: Option<PathBuf>,

    /// Leave the updater executable in place after the run
    #[arg(long = "no-self-delete")]
    pub no_self_delete: bool,
}

impl HandoffArguments {
    /// Serialize into updater command-line arguments (without argv[0]).
    #[must_use]
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args = vec![
            flag("--source", &self.source),
            flag("--target", &self.target),
            flag("--wait-for", &self.wait_for),
            flag("--version", &self.version),
            flag("--app", &self.app_name),
        ];

        if let Some(interpreter) = &self.interpreter {
            args.push(flag("--interpreter", interpreter));
        }
        if let Some(changelog) = &self.changelog {
            args.push(flag("--changelog", changelog));
        }
        if let Some(version_file) = &self.version_file {
            args.push(flag("--version-file", version_file));
        }
        if self.no_self_delete {
            args.push("--no-self-delete".into());
        }

        args
    }

    /// Path of the application to restart.
    #[must_use]
    pub fn app_path(&self) -> PathBuf {
        self.target.join(&self.app_name)
    }
}

/// `--name=value` as one argument, so values starting with `-` (bullet-list
/// changelogs, odd paths) are never mistaken for flags.
fn flag(name: &str, value: impl AsRef<OsStr>) -> OsString {
    let mut arg = OsString::from(name);
    arg.push("=");
    arg.push(value);
    arg
}

/// How the running application was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppIdentity {
    /// A native executable.
    Packaged {
        /// Full path of the running executable
        exe_path: PathBuf,
    },
    /// A script run by an interpreter.
    Interpreted {
        /// Interpreter executable
        interpreter: PathBuf,
        /// Entry script inside the installation directory
        script_path: PathBuf,
    },
}

impl AppIdentity {
    /// Identity of the current process as a packaged executable.
    pub fn current() -> Result<Self> {
        let exe_path = std::env::current_exe().context("Failed to locate the running executable")?;
        Ok(Self::Packaged {
            exe_path,
        })
    }

    /// Identity of a script-based install rooted at `install_dir`.
    pub fn interpreted(interpreter: impl Into<PathBuf>, install_dir: &Path) -> Self {
        Self::Interpreted {
            interpreter: interpreter.into(),
            script_path: install_dir.join(MAIN_SCRIPT_NAME),
        }
    }

    /// Directory the updater must install into.
    pub fn install_dir(&self) -> Result<PathBuf> {
        let anchor = match self {
            Self::Packaged {
                exe_path,
            } => exe_path,
            Self::Interpreted {
                script_path,
                ..
            } => script_path,
        };
        anchor.parent().map(Path::to_path_buf).ok_or_else(|| {
            UpdateError::Other {
                message: format!("'{}' has no parent directory", anchor.display()),
            }
            .into()
        })
    }

    /// Process name the updater waits on.
    #[must_use]
    pub fn wait_for(&self) -> String {
        match self {
            Self::Packaged {
                exe_path,
            } => file_name_string(exe_path),
            Self::Interpreted {
                interpreter,
                ..
            } => file_name_string(interpreter),
        }
    }

    /// Name of the executable or script to restart.
    #[must_use]
    pub fn app_name(&self) -> String {
        match self {
            Self::Packaged {
                exe_path,
            } => file_name_string(exe_path),
            Self::Interpreted {
                script_path,
                ..
            } => file_name_string(script_path),
        }
    }

    /// Build the handoff for installing `staged` as `remote`.
    pub fn handoff_arguments(
        &self,
        staged: &StagedPackage,
        remote: &RemoteVersionInfo,
        version_file: Option<&Path>,
    ) -> Result<HandoffArguments> {
        let interpreter = match self {
            Self::Packaged { .. } => None,
            Self::Interpreted {
                interpreter,
                ..
            } => Some(interpreter.clone()),
        };

        Ok(HandoffArguments {
            source: staged.extract_dir.clone(),
            target: self.install_dir()?,
            wait_for: self.wait_for(),
            version: remote.version.clone(),
            app_name: self.app_name(),
            interpreter,
            changelog: remote.changelog.clone(),
            version_file: version_file.map(Path::to_path_buf),
            no_self_delete: false,
        })
    }
}
