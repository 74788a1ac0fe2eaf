use crate::constants::{
    CONSENT_TIMEOUT, DEFAULT_BASE_URL, DEFAULT_BIND_ADDR, DEFAULT_MAX_UPLOAD_BYTES,
    PACKAGE_DOWNLOAD_TIMEOUT, VERSION_CHECK_TIMEOUT,
};
use crate::update::comparison::ComparatorKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Client-side update settings.
///
/// # TOML Example
/// ```toml
/// [update]
/// base_url = "http://updates.example.com:1234"
/// check_timeout_secs = 10
/// download_timeout_secs = 120
/// consent_timeout_secs = 60
/// verify_checksum = true
/// comparator = "numeric"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Base URL of the distribution endpoint (without `/api`).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for version and descriptor requests, in seconds.
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,

    /// Timeout for package downloads, in seconds.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// How long to wait for the user to accept an update, in seconds.
    ///
    /// No answer within this window counts as declining.
    #[serde(default = "default_consent_timeout_secs")]
    pub consent_timeout_secs: u64,

    /// Verify the package SHA-256 when the server advertises one.
    #[serde(default = "default_verify_checksum")]
    pub verify_checksum: bool,

    /// Version comparison strategy.
    ///
    /// `numeric` compares versions as floating point numbers and matches the
    /// historical behaviour of the player. `semver` handles multi-part
    /// versions such as `1.10.0` correctly and is recommended for new
    /// deployments.
    #[serde(default)]
    pub comparator: ComparatorKind,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            check_timeout_secs: default_check_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            consent_timeout_secs: default_consent_timeout_secs(),
            verify_checksum: default_verify_checksum(),
            comparator: ComparatorKind::default(),
        }
    }
}

impl UpdateConfig {
    /// Version check timeout as a [`Duration`].
    #[must_use]
    pub const fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    /// Download timeout as a [`Duration`].
    #[must_use]
    pub const fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Consent timeout as a [`Duration`].
    #[must_use]
    pub const fn consent_timeout(&self) -> Duration {
        Duration::from_secs(self.consent_timeout_secs)
    }

    pub(crate) fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

const fn default_check_timeout_secs() -> u64 {
    VERSION_CHECK_TIMEOUT.as_secs()
}

const fn default_download_timeout_secs() -> u64 {
    PACKAGE_DOWNLOAD_TIMEOUT.as_secs()
}

const fn default_consent_timeout_secs() -> u64 {
    CONSENT_TIMEOUT.as_secs()
}

const fn default_verify_checksum() -> bool {
    true
}

/// Distribution server settings.
///
/// # TOML Example
/// ```toml
/// [server]
/// bind = "0.0.0.0:1234"
/// public_url = "http://updates.example.com:1234"
/// data_dir = "/srv/perplan"
/// initial_version = "1"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// URL clients use to reach this server; used to build `download_url`.
    #[serde(default = "default_base_url")]
    pub public_url: String,

    /// Directory holding `server_version.json` and `updates/`.
    ///
    /// Defaults to `<data_dir>/perplan-media/server`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Version reported before anything has been uploaded.
    #[serde(default = "default_initial_version")]
    pub initial_version: String,

    /// Largest accepted upload body, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_url: default_base_url(),
            data_dir: None,
            initial_version: default_initial_version(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    pub(crate) fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

fn default_bind() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_initial_version() -> String {
    "1".to_string()
}

const fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_defaults() {
        let config = UpdateConfig::default();
        assert_eq!(config.base_url, "http://localhost:1234");
        assert_eq!(config.consent_timeout(), Duration::from_secs(60));
        assert_eq!(config.check_timeout(), Duration::from_secs(10));
        assert_eq!(config.download_timeout(), Duration::from_secs(120));
        assert!(config.verify_checksum);
        assert_eq!(config.comparator, ComparatorKind::Numeric);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: UpdateConfig = toml::from_str(
            r#"
base_url = "http://updates.internal:8080"
comparator = "semver"
"#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://updates.internal:8080");
        assert_eq!(config.comparator, ComparatorKind::Semver);
        assert_eq!(config.consent_timeout_secs, 60);
    }

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "0.0.0.0:1234");
        assert_eq!(config.initial_version, "1");
        assert!(config.data_dir.is_none());
        assert!(config.is_default());
    }
}
