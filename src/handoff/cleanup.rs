//! Removal of the staging attempt directory.

use crate::constants::PRODUCT_NAMESPACE;
use crate::utils::{path_has_segment, remove_dir_all};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The staging attempt directory holding `source` (its parent).
#[must_use]
pub fn staging_dir_of(source: &Path) -> Option<PathBuf> {
    source.parent().map(Path::to_path_buf)
}

/// Whether `dir` lies inside the product's temp namespace.
///
/// Paths without a `perplan-media` component do not, and neither does the
/// namespace directory itself.
#[must_use]
pub fn is_staging_dir(dir: &Path) -> bool {
    let is_namespace_root =
        dir.file_name().is_some_and(|name| name.eq_ignore_ascii_case(PRODUCT_NAMESPACE));
    path_has_segment(dir, PRODUCT_NAMESPACE) && !is_namespace_root
}

/// Delete `dir` if [`is_staging_dir`] allows it.
///
/// Returns whether the directory was removed.
pub fn remove_staging_dir(dir: &Path) -> bool {
    if !is_staging_dir(dir) {
        warn!("Refusing to delete {}: not a staging directory", dir.display());
        return false;
    }
    if !dir.exists() {
        return false;
    }

    match remove_dir_all(dir) {
        Ok(()) => {
            info!("Removed staging directory {}", dir.display());
            true
        }
        Err(e) => {
            warn!("Failed to remove staging directory: {e:#}");
            false
        }
    }
}
