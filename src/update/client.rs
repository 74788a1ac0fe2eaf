//! HTTP client for the distribution endpoint.
//!
//! Version checks treat every failure as "offline": a non-200 status, a
//! timeout, a refused connection or a malformed body all yield `None` and are
//! logged at debug level only. Update checks run at application startup and
//! must never turn a flaky network into a visible error. Downloads are
//! different: once the user accepted an update, failures are reported.

use crate::config::UpdateConfig;
use crate::core::UpdateError;
use crate::update::version_store::deserialize_version;
use anyhow::Result;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Update descriptor served by `GET /api/update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteVersionInfo {
    /// Published version; the endpoint may send a number.
    #[serde(deserialize_with = "deserialize_version")]
    pub version: String,

    /// Human-readable changes in this version.
    #[serde(default)]
    pub changelog: Option<String>,

    /// Where to download the package; may be relative to the base URL.
    pub download_url: String,

    /// Hex SHA-256 of the package, when the server advertises one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

#[derive(Deserialize)]
struct VersionResponse {
    #[serde(deserialize_with = "deserialize_version")]
    version: String,
}

/// Client for `{base_url}/api/*`.
#[derive(Debug, Clone)]
pub struct DistributionClient {
    http: reqwest::Client,
    base_url: String,
    check_timeout: Duration,
    download_timeout: Duration,
}

impl DistributionClient {
    /// Build a client from the `[update]` configuration.
    pub fn new(config: &UpdateConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("perplan-updater/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpdateError::Network {
                operation: "create HTTP client".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            check_timeout: config.check_timeout(),
            download_timeout: config.download_timeout(),
        })
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the update descriptor, or `None` if the endpoint is unavailable.
    pub async fn fetch_remote_version(&self) -> Option<RemoteVersionInfo> {
        let url = format!("{}/api/update", self.base_url);
        match self.get_json::<RemoteVersionInfo>(&url).await {
            Ok(info) => {
                debug!("Remote version {} at {}", info.version, self.base_url);
                Some(info)
            }
            Err(e) => {
                debug!("Update check against {url} failed: {e:#}");
                None
            }
        }
    }

    /// Fetch only the published version, or `None` if unavailable.
    pub async fn fetch_version(&self) -> Option<String> {
        let url = format!("{}/api/version", self.base_url);
        match self.get_json::<VersionResponse>(&url).await {
            Ok(response) => Some(response.version),
            Err(e) => {
                debug!("Version check against {url} failed: {e:#}");
                None
            }
        }
    }

    /// Download a package; `locator` may be absolute or relative to the base.
    pub async fn download_package(&self, locator: &str) -> Result<Vec<u8>> {
        let url = self.resolve(locator)?;
        info!("Downloading update package from {url}");

        let response = self
            .http
            .get(url.clone())
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| network_error("download package", &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let bytes = response.bytes().await.map_err(|e| network_error("download package", &e))?;
        debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    /// Resolve a download locator against the base URL.
    pub fn resolve(&self, locator: &str) -> Result<Url> {
        let base = Url::parse(&format!("{}/", self.base_url)).map_err(|e| UpdateError::Config {
            message: format!("Invalid base URL '{}': {e}", self.base_url),
        })?;
        let url = base.join(locator).map_err(|e| UpdateError::InvalidPackage {
            reason: format!("Invalid download URL '{locator}': {e}"),
        })?;
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .timeout(self.check_timeout)
            .send()
            .await
            .map_err(|e| network_error("check version", &e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(UpdateError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.bytes().await.map_err(|e| network_error("check version", &e))?;
        let parsed = serde_json::from_slice::<T>(&body).map_err(UpdateError::from)?;
        Ok(parsed)
    }
}

fn network_error(operation: &str, error: &reqwest::Error) -> UpdateError {
    let reason = if error.is_timeout() {
        "request timed out".to_string()
    } else {
        error.to_string()
    };
    UpdateError::Network {
        operation: operation.to_string(),
        reason,
    }
}
