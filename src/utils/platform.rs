//! Platform-specific helpers: per-user directories and path checks
//!
//! Directory resolution goes through the `dirs` crate. Each location can be
//! redirected with an environment variable, which is how tests and portable
//! installs keep the pipeline away from the real user profile:
//!
//! | Location | Default | Override |
//! |----------|---------|----------|
//! | data     | `<data_dir>/perplan-media` | `PERPLAN_DATA_DIR` |
//! | config   | `<config_dir>/perplan-media` | `PERPLAN_CONFIG_PATH` (file) |
//! | temp     | `<temp_dir>/perplan-media` | `PERPLAN_TEMP_DIR` |

use crate::constants::PRODUCT_NAMESPACE;
use anyhow::Result;
use std::path::{Component, Path, PathBuf};

/// Environment variable overriding the per-user data directory.
pub const DATA_DIR_ENV: &str = "PERPLAN_DATA_DIR";

/// Environment variable overriding the staging temp root.
pub const TEMP_DIR_ENV: &str = "PERPLAN_TEMP_DIR";

/// Environment variable overriding the global config file path.
pub const CONFIG_PATH_ENV: &str = "PERPLAN_CONFIG_PATH";

/// Whether the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Per-user application data directory (`<data_dir>/perplan-media`).
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    dirs::data_dir().map(|p| p.join(PRODUCT_NAMESPACE)).ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the APPDATA environment variable is set"
        } else if cfg!(target_os = "macos") {
            "On macOS: Check that the HOME environment variable is set"
        } else {
            "On Linux: Check that the XDG_DATA_HOME or HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine data directory.\n\n{platform_help}")
    })
}

/// Per-user configuration directory (`<config_dir>/perplan-media`).
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir().map(|p| p.join(PRODUCT_NAMESPACE)).ok_or_else(|| {
        anyhow::anyhow!("Could not determine config directory. Set {CONFIG_PATH_ENV} instead.")
    })
}

/// Root of all staging attempts (`<temp_dir>/perplan-media`).
#[must_use]
pub fn get_temp_root() -> PathBuf {
    std::env::var(TEMP_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join(PRODUCT_NAMESPACE))
}

/// Whether one of the normal components of `path` equals `segment`.
///
/// Matching is per component, so `/tmp/perplan-media-old` does not match
/// `perplan-media`.
#[must_use]
pub fn path_has_segment(path: &Path, segment: &str) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => name.to_string_lossy().eq_ignore_ascii_case(segment),
        _ => false,
    })
}

/// File name of `path` as a `String`, or an empty string.
#[must_use]
pub fn file_name_string(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_has_segment() {
        assert!(path_has_segment(Path::new("/tmp/perplan-media/xyz"), "perplan-media"));
        assert!(path_has_segment(Path::new("/tmp/PERPLAN-MEDIA/xyz"), "perplan-media"));
        assert!(!path_has_segment(Path::new("/tmp/unrelated"), "perplan-media"));
        assert!(!path_has_segment(Path::new("/tmp/perplan-media-old/x"), "perplan-media"));
    }

    #[test]
    fn test_file_name_string() {
        assert_eq!(file_name_string(Path::new("/opt/ppl/perplan")), "perplan");
        assert_eq!(file_name_string(Path::new("/")), "");
    }
}
