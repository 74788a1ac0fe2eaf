//! Persisted record of the locally installed version.
//!
//! The record is a small JSON document in the per-user data directory:
//!
//! ```json
//! { "version": "3", "changelog": "Performance fixes", "updated_at": "2026-01-01T12:00:00Z" }
//! ```
//!
//! Two processes write it (the application on first run, the handoff updater
//! after installing) but never at the same time, so there is no locking.
//! Writes merge into whatever is already on disk, keeping fields this crate
//! does not know about, and go through a temp file plus rename so a crash
//! cannot leave a half-written record.
//!
//! Reads fail soft. A missing, unreadable or corrupt record is reported as
//! absent, which the orchestrator treats as a first run.

use crate::constants::VERSION_FILE_NAME;
use crate::utils::{atomic_write, get_data_dir};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The installed version as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Installed version. Older writers stored a JSON number.
    #[serde(deserialize_with = "deserialize_version")]
    pub version: String,

    /// Changelog of the installed version, if one was published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,

    /// Fields written by other tools, preserved on rewrite.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VersionRecord {
    /// When the record was last written by this crate, if known.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.extra
            .get("updated_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Accept a version given either as a JSON string or a JSON number.
///
/// The distribution endpoint and older records use bare numbers
/// (`{"version": 3}`); everything written by this crate uses strings.
pub(crate) fn deserialize_version<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawVersion {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawVersion::deserialize(deserializer)? {
        RawVersion::Text(text) => text.trim().to_string(),
        RawVersion::Number(number) => number.to_string(),
    })
}

/// Reads and writes a [`VersionRecord`] at a fixed path.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    /// Store backed by an explicit file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// Store at the default per-user location.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Self::default_location()?))
    }

    /// `<data-dir>/perplan-media/version_info.json`, honouring
    /// `PERPLAN_DATA_DIR`.
    pub fn default_location() -> Result<PathBuf> {
        Ok(get_data_dir()?.join(VERSION_FILE_NAME))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.path
    }

    /// Read the record, or `None` if it is missing or unreadable.
    #[must_use]
    pub fn read(&self) -> Option<VersionRecord> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No version record at {}", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("Failed to read version record {}: {e}", self.path.display());
                return None;
            }
        };

        match serde_json::from_str::<VersionRecord>(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring corrupt version record {}: {e}", self.path.display());
                None
            }
        }
    }

    /// Persist `version` and `changelog`, merging into the existing record.
    ///
    /// Returns `false` if the record could not be written; the failure is
    /// logged. A `None` changelog removes any stale changelog of the previous
    /// version.
    pub fn write(&self, version: &str, changelog: Option<&str>) -> bool {
        match self.try_write(version, changelog) {
            Ok(()) => {
                info!("Recorded installed version {version} at {}", self.path.display());
                true
            }
            Err(e) => {
                warn!("Failed to write version record: {e:#}");
                false
            }
        }
    }

    fn try_write(&self, version: &str, changelog: Option<&str>) -> Result<()> {
        let mut fields = self.read_raw_fields();

        fields.insert("version".to_string(), Value::String(version.to_string()));
        match changelog {
            Some(changelog) => {
                fields.insert("changelog".to_string(), Value::String(changelog.to_string()));
            }
            None => {
                fields.remove("changelog");
            }
        }
        fields.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));

        let json = serde_json::to_vec_pretty(&Value::Object(fields))
            .context("Failed to serialize version record")?;
        atomic_write(&self.path, &json)
    }

    /// Existing top-level fields, or an empty map if the file is absent or
    /// not a JSON object.
    fn read_raw_fields(&self) -> Map<String, Value> {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            _ => {
                debug!("Replacing unparseable version record {}", self.path.display());
                Map::new()
            }
        }
    }
}
