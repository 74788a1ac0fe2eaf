//! Staging of downloaded update packages.
//!
//! Each attempt gets its own directory under the temp root:
//!
//! ```text
//! <temp-root>/update-<uuid>/
//! ├── package.zip
//! └── extracted/
//!     ├── updater(.exe)
//!     └── ...application files
//! ```
//!
//! A [`StagedPackage`] is only returned once the archive is written,
//! extracted and known to contain the updater. On any failure the attempt
//! directory is removed again, so a half-staged package can never be handed
//! to the updater. After a successful stage the directory belongs to the
//! updater, which deletes it once the install is done.

use crate::constants::{
    STAGED_ARCHIVE_NAME, STAGED_EXTRACT_DIR, STAGING_DIR_PREFIX, updater_exe_name,
};
use crate::core::UpdateError;
use crate::update::verification::ChecksumVerifier;
use crate::utils::{atomic_write, ensure_dir, get_temp_root, remove_dir_all};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A fully validated, extracted update package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPackage {
    /// Per-attempt directory holding the archive and the extraction.
    pub staging_root: PathBuf,
    /// Root of the extracted package.
    pub extract_dir: PathBuf,
    /// The updater executable at the extraction root.
    pub updater_path: PathBuf,
}

/// Staging step about to start, for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePhase {
    /// Writing the archive to disk.
    Saving,
    /// Unpacking the archive.
    Extracting,
}

/// Writes, extracts and validates update packages.
#[derive(Debug, Clone)]
pub struct PackageStager {
    temp_root: PathBuf,
}

impl Default for PackageStager {
    fn default() -> Self {
        Self::new(get_temp_root())
    }
}

impl PackageStager {
    /// Stager using `temp_root` for attempt directories.
    pub fn new(temp_root: impl Into<PathBuf>) -> Self {
        Self {
            temp_root: temp_root.into(),
        }
    }

    /// Directory under which attempt directories are created.
    #[must_use]
    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    /// Stage `bytes` without progress reporting.
    pub fn stage(&self, bytes: &[u8], expected_sha256: Option<&str>) -> Result<StagedPackage> {
        self.stage_with_progress(bytes, expected_sha256, |_| {})
    }

    /// Stage `bytes`, calling `on_phase` before each step.
    ///
    /// When `expected_sha256` is given the bytes are verified before anything
    /// touches the disk.
    pub fn stage_with_progress(
        &self,
        bytes: &[u8],
        expected_sha256: Option<&str>,
        mut on_phase: impl FnMut(StagePhase),
    ) -> Result<StagedPackage> {
        if let Some(expected) = expected_sha256 {
            ChecksumVerifier::verify_bytes(bytes, expected)?;
        }

        ensure_dir(&self.temp_root)?;
        let attempt =
            self.temp_root.join(format!("{STAGING_DIR_PREFIX}{}", uuid::Uuid::new_v4().simple()));
        fs::create_dir(&attempt).map_err(|_| UpdateError::FileSystem {
            operation: "create staging directory".to_string(),
            path: attempt.display().to_string(),
        })?;
        debug!("Staging update in {}", attempt.display());

        match stage_into(&attempt, bytes, &mut on_phase) {
            Ok(staged) => {
                info!("Staged update package at {}", staged.extract_dir.display());
                Ok(staged)
            }
            Err(e) => {
                if let Err(cleanup) = remove_dir_all(&attempt) {
                    warn!("Failed to remove staging directory: {cleanup:#}");
                }
                Err(e)
            }
        }
    }
}

fn stage_into(
    attempt: &Path,
    bytes: &[u8],
    on_phase: &mut impl FnMut(StagePhase),
) -> Result<StagedPackage> {
    on_phase(StagePhase::Saving);
    let archive_path = attempt.join(STAGED_ARCHIVE_NAME);
    atomic_write(&archive_path, bytes)?;

    on_phase(StagePhase::Extracting);
    let extract_dir = attempt.join(STAGED_EXTRACT_DIR);
    let count = extract_archive(&archive_path, &extract_dir)?;
    debug!("Extracted {count} entries");

    let updater_name = updater_exe_name();
    let updater_path = extract_dir.join(&updater_name);
    if !updater_path.is_file() {
        return Err(UpdateError::MissingUpdater {
            name: updater_name,
            dir: extract_dir.display().to_string(),
        }
        .into());
    }
    mark_executable(&updater_path)?;

    Ok(StagedPackage {
        staging_root: attempt.to_path_buf(),
        extract_dir,
        updater_path,
    })
}

/// Extract a zip archive into `dest`, returning the number of entries written.
///
/// Entries whose names escape `dest` (absolute paths, `..`) are skipped.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| UpdateError::InvalidPackage {
        reason: e.to_string(),
    })?;

    ensure_dir(dest)?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| UpdateError::InvalidPackage {
            reason: format!("unreadable entry {i}: {e}"),
        })?;

        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe archive entry: {}", entry.name());
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            ensure_dir(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            ensure_dir(parent)?;
        }
        let mut out = fs::File::create(&out_path)
            .with_context(|| format!("Failed to create file: {}", out_path.display()))?;
        std::io::copy(&mut entry, &mut out)
            .with_context(|| format!("Failed to extract {}", out_path.display()))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode & 0o7777))?;
        }

        written += 1;
    }

    Ok(written)
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to mark executable: {}", path.display()))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}
