//! Global constants used throughout the PERPLAN update pipeline.
//!
//! This module contains timeout durations, fixed file names, and the
//! namespace segment shared by the main application, the handoff updater and
//! the distribution server. Both processes of the handoff protocol compile
//! against these values, so they must only change together.

use std::time::Duration;

/// Product namespace used for per-user data, config and temp directories.
///
/// The handoff updater refuses to delete any staging directory whose path
/// does not contain this segment.
pub const PRODUCT_NAMESPACE: &str = "perplan-media";

/// Human-readable product name used in console output.
pub const PRODUCT_NAME: &str = "PPL Player";

/// File name of the persisted version record inside the data directory.
pub const VERSION_FILE_NAME: &str = "version_info.json";

/// File name of the global TOML configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Base name of the updater executable shipped inside update packages.
pub const UPDATER_BASE_NAME: &str = "updater";

/// Base name of the main application executable.
pub const MAIN_APP_BASE_NAME: &str = "perplan";

/// Script launched by an interpreter when the app does not run as a
/// packaged executable.
pub const MAIN_SCRIPT_NAME: &str = "main.py";

/// Package file extension accepted by the distribution server.
pub const PACKAGE_EXTENSION: &str = ".zip";

/// Name of the downloaded archive inside a staging attempt directory.
pub const STAGED_ARCHIVE_NAME: &str = "package.zip";

/// Name of the extraction directory inside a staging attempt directory.
pub const STAGED_EXTRACT_DIR: &str = "extracted";

/// Prefix of per-attempt staging directories under the temp root.
pub const STAGING_DIR_PREFIX: &str = "update-";

/// Default distribution endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:1234";

/// Default listen address of the distribution server.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:1234";

/// Timeout for version and descriptor requests (10 seconds).
pub const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for package downloads (120 seconds).
///
/// Packages carry whole application builds, so this is much larger than the
/// version check timeout.
pub const PACKAGE_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// How long the background worker waits for the user to answer the update
/// prompt before treating it as declined (60 seconds).
pub const CONSENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Interval between process list polls while waiting for the main
/// application to exit (1 second).
pub const PROCESS_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on the wait for the main application to exit (30 seconds).
///
/// After this the updater proceeds anyway and reports the wait as degraded.
pub const PROCESS_EXIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause after the main application exited, giving the OS time to release
/// file handles (2 seconds).
pub const HANDLE_RELEASE_GRACE: Duration = Duration::from_secs(2);

/// Delay used by the self-delete companion script before removing the
/// updater executable (seconds).
pub const SELF_DELETE_DELAY_SECS: u64 = 2;

/// Default upload size limit of the distribution server (512 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// File name of the updater executable for the current platform.
#[must_use]
pub fn updater_exe_name() -> String {
    format!("{UPDATER_BASE_NAME}{}", std::env::consts::EXE_SUFFIX)
}

/// File name of the main application executable for the current platform.
#[must_use]
pub fn main_exe_name() -> String {
    format!("{MAIN_APP_BASE_NAME}{}", std::env::consts::EXE_SUFFIX)
}

/// Conventional file name of a published package for `version`.
#[must_use]
pub fn package_file_name(version: &str) -> String {
    format!("update_v{version}{PACKAGE_EXTENSION}")
}
