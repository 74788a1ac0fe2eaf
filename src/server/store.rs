//! On-disk state of the distribution server.
//!
//! ```text
//! <data-dir>/
//! ├── server_version.json       same format as the client's version record
//! └── updates/
//!     ├── update_v3.zip
//!     └── update_v3.zip.sha256
//! ```
//!
//! Exactly one package is published at a time. Publishing writes the new
//! package next to the old one, switches the version record, then removes
//! the superseded files, so a download racing with an upload gets either the
//! old or the new package in full.

use crate::constants::{PACKAGE_EXTENSION, PRODUCT_NAME, package_file_name};
use crate::update::verification::ChecksumVerifier;
use crate::update::version_store::VersionStore;
use crate::utils::{atomic_write, ensure_dir};
use anyhow::{Context, Result, bail};
use regex::Regex;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;

/// File name of the server's version record.
pub const SERVER_VERSION_FILE: &str = "server_version.json";

/// Directory holding published packages.
pub const UPDATES_DIR: &str = "updates";

const CHECKSUM_SUFFIX: &str = ".sha256";

/// Version encoded in a package file name, e.g. `update_v4.2.zip` -> `4.2`.
#[must_use]
pub fn extract_version(file_name: &str) -> Option<String> {
    let stem = strip_package_extension(file_name).unwrap_or(file_name);
    let re = Regex::new(r"v?(\d+(\.\d+)?)").ok()?;
    re.captures(stem).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

/// Whether `file_name` has the package extension (case-insensitive).
#[must_use]
pub fn has_package_extension(file_name: &str) -> bool {
    strip_package_extension(file_name).is_some()
}

fn strip_package_extension(file_name: &str) -> Option<&str> {
    let split = file_name.len().checked_sub(PACKAGE_EXTENSION.len())?;
    let (stem, ext) = (file_name.get(..split)?, file_name.get(split..)?);
    ext.eq_ignore_ascii_case(PACKAGE_EXTENSION).then_some(stem)
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPackage {
    /// Version taken from the uploaded file name
    pub version: String,
    /// Changelog recorded with the version
    pub changelog: Option<String>,
    /// Stored file name, independent of the uploaded name
    pub file_name: String,
    /// Hex SHA-256 of the package, also written to the sidecar
    pub sha256: String,
}

/// Package bytes served by the download endpoint.
#[derive(Debug, Clone)]
pub struct CurrentPackage {
    /// Version the package belongs to
    pub version: String,
    /// Stored file name, `update_v{version}.zip`
    pub file_name: String,
    /// Package contents
    pub bytes: Vec<u8>,
}

/// Published version and package files.
#[derive(Debug)]
pub struct PackageStore {
    root: PathBuf,
    initial_version: String,
    record: VersionStore,
    publish_lock: Mutex<()>,
}

impl PackageStore {
    /// Open (and create) the store at `root`.
    pub fn open(root: impl Into<PathBuf>, initial_version: impl Into<String>) -> Result<Self> {
        let root = root.into();
        ensure_dir(&root.join(UPDATES_DIR))?;
        let record = VersionStore::new(root.join(SERVER_VERSION_FILE));

        Ok(Self {
            root,
            initial_version: initial_version.into(),
            record,
            publish_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn updates_dir(&self) -> PathBuf {
        self.root.join(UPDATES_DIR)
    }

    /// Published version and changelog.
    ///
    /// Before the first upload this is the configured initial version.
    #[must_use]
    pub fn current(&self) -> (String, Option<String>) {
        match self.record.read() {
            Some(record) => (record.version, record.changelog),
            None => (self.initial_version.clone(), None),
        }
    }

    #[must_use]
    pub fn package_path(&self, version: &str) -> PathBuf {
        self.updates_dir().join(package_file_name(version))
    }

    /// SHA-256 recorded for the package of `version`, if any.
    #[must_use]
    pub fn checksum(&self, version: &str) -> Option<String> {
        let path = checksum_path(&self.package_path(version));
        std::fs::read_to_string(path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Package names currently in `updates/`.
    #[must_use]
    pub fn available_packages(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.updates_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| has_package_extension(name))
            .collect();
        names.sort();
        names
    }

    /// Contents of the currently published package, synthesizing a
    /// placeholder when none was uploaded.
    ///
    /// Runs under the publish lock, so the version and the file always
    /// belong together even while an upload replaces them.
    pub fn current_package(&self) -> Result<CurrentPackage> {
        let _guard = self.lock();

        let (version, _) = self.current();
        let path = self.package_path(&version);
        if !path.is_file() {
            warn!("No package for version {version}; creating placeholder {}", path.display());
            let bytes = placeholder_package(&version)?;
            atomic_write(&path, &bytes)?;
            let sha256 = ChecksumVerifier::compute_sha256(&bytes);
            atomic_write(&checksum_path(&path), sha256.as_bytes())?;
        }

        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read package: {}", path.display()))?;
        Ok(CurrentPackage {
            file_name: package_file_name(&version),
            version,
            bytes,
        })
    }

    /// Publish `bytes` as `version`, replacing the current package.
    pub fn publish(
        &self,
        version: &str,
        bytes: &[u8],
        changelog: Option<&str>,
    ) -> Result<PublishedPackage> {
        let _guard = self.lock();

        let path = self.package_path(version);
        let sha256 = ChecksumVerifier::compute_sha256(bytes);
        atomic_write(&path, bytes)?;
        atomic_write(&checksum_path(&path), sha256.as_bytes())?;

        if !self.record.write(version, changelog) {
            bail!("Failed to update {}", self.record.location().display());
        }

        let file_name = package_file_name(version);
        self.remove_superseded(&file_name);
        info!("Published version {version} ({} bytes)", bytes.len());

        Ok(PublishedPackage {
            version: version.to_string(),
            changelog: changelog.map(str::to_string),
            file_name,
            sha256,
        })
    }

    fn remove_superseded(&self, current: &str) {
        for name in self.available_packages() {
            if name == current {
                continue;
            }
            for stale in [format!("{name}{CHECKSUM_SUFFIX}"), name] {
                let path = self.updates_dir().join(&stale);
                if path.exists()
                    && let Err(e) = std::fs::remove_file(&path)
                {
                    warn!("Failed to remove superseded {}: {e}", path.display());
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.publish_lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn checksum_path(package: &Path) -> PathBuf {
    let mut name = package.as_os_str().to_os_string();
    name.push(CHECKSUM_SUFFIX);
    PathBuf::from(name)
}

/// Build the placeholder package served before anything was uploaded.
pub fn placeholder_package(version: &str) -> Result<Vec<u8>> {
    let file_name = package_file_name(version);
    let readme = format!(
        "{PRODUCT_NAME} - update v{version}\n\
         ====================================\n\n\
         This is a placeholder update package.\n\n\
         To publish a real update:\n\
         1. Build the player and the updater\n\
         2. Put both executables and their resources in a zip archive\n\
         3. Name it {file_name}\n\
         4. Upload it with `perplan publish {file_name}`\n"
    );
    let changelog = format!("Version {version}\n- Placeholder package\n");

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in
        [("README.txt", readme.as_str()), ("changelog.txt", changelog.as_str()), ("version.txt", version)]
    {
        writer.start_file(name, options).context("Failed to start placeholder entry")?;
        writer.write_all(content.as_bytes())?;
    }
    let cursor = writer.finish().context("Failed to finish placeholder package")?;
    Ok(cursor.into_inner())
}
