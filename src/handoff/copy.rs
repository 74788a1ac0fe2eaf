//! Copying the staged package over the installation.

use crate::utils::{ensure_dir, replace_dir};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One entry that could not be installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFailure {
    /// Source entry that was skipped.
    pub path: PathBuf,
    /// Error that stopped it.
    pub reason: String,
}

/// Result of [`install_package`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    /// Top-level entries installed.
    pub copied: usize,
    /// Entries that failed; the rest were still attempted.
    pub failures: Vec<CopyFailure>,
}

impl CopyReport {
    /// The step counts as done when at least one entry was installed.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.copied > 0
    }
}

/// Install every top-level entry of `source` into `target`, except `skip`.
///
/// Files overwrite their counterpart, directories replace theirs wholesale.
/// Each failure is logged and recorded; the remaining entries are still
/// copied. Running it twice with the same inputs yields the same target.
pub fn install_package(source: &Path, target: &Path, skip: &str) -> CopyReport {
    let mut report = CopyReport::default();

    let entries = match ensure_dir(target).and_then(|()| read_sorted(source)) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot install from {}: {e:#}", source.display());
            report.failures.push(CopyFailure {
                path: source.to_path_buf(),
                reason: format!("{e:#}"),
            });
            return report;
        }
    };

    for src in entries {
        let Some(name) = src.file_name() else {
            continue;
        };
        if is_same_name(name.to_string_lossy().as_ref(), skip) {
            debug!("Skipping {}", src.display());
            continue;
        }

        let dst = target.join(name);
        match install_entry(&src, &dst) {
            Ok(()) => {
                debug!("Installed {}", dst.display());
                report.copied += 1;
            }
            Err(e) => {
                warn!("Failed to install {}: {e:#}", dst.display());
                report.failures.push(CopyFailure {
                    path: dst,
                    reason: format!("{e:#}"),
                });
            }
        }
    }

    info!("Installed {} item(s), {} failure(s)", report.copied, report.failures.len());
    report
}

fn read_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn install_entry(src: &Path, dst: &Path) -> Result<()> {
    if src.is_dir() {
        if dst.exists() && !dst.is_dir() {
            fs::remove_file(dst)
                .with_context(|| format!("Failed to remove file: {}", dst.display()))?;
        }
        replace_dir(src, dst)
    } else {
        if dst.is_dir() {
            fs::remove_dir_all(dst)
                .with_context(|| format!("Failed to remove directory: {}", dst.display()))?;
        }
        fs::copy(src, dst).with_context(|| {
            format!("Failed to copy {} to {}", src.display(), dst.display())
        })?;
        Ok(())
    }
}

fn is_same_name(a: &str, b: &str) -> bool {
    if cfg!(windows) { a.eq_ignore_ascii_case(b) } else { a == b }
}
