//! `perplan publish`: upload a package to a distribution server.
//!
//! The server derives the version from the file name (`update_v4.zip`
//! publishes version 4), so the file is checked locally first to fail
//! before sending hundreds of megabytes.

use crate::cli::CliConfig;
use crate::core::UpdateError;
use crate::server::handlers::UploadResponse;
use crate::server::store::{extract_version, has_package_extension};
use crate::utils::platform::file_name_string;
use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct PublishCommand {
    /// Package to upload, named like `update_v4.zip`
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Changelog shown to users in the update prompt
    #[arg(long, value_name = "TEXT")]
    changelog: Option<String>,

    /// Distribution server, overriding the configured update endpoint
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    message: Option<String>,
}

impl PublishCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load_global().await?.update;
        let base_url = self.base_url.unwrap_or(config.base_url);
        let base_url = base_url.trim_end_matches('/');

        let file_name = file_name_string(&self.file);
        if !has_package_extension(&file_name) {
            bail!("'{file_name}' is not a .zip package");
        }
        let Some(version) = extract_version(&file_name) else {
            bail!("Cannot determine a version from '{file_name}'; name it like update_v4.zip");
        };

        let bytes = tokio::fs::read(&self.file)
            .await
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        info!("Uploading {file_name} ({} bytes) as version {version}", bytes.len());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/zip")
            .context("Invalid MIME type")?;
        let mut form = Form::new().part("file", part);
        if let Some(changelog) = self.changelog {
            form = form.text("changelog", changelog);
        }

        let url = format!("{base_url}/api/upload");
        let response = reqwest::Client::new()
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UpdateError::Network {
                operation: "upload package".to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ErrorBody>().await.ok();
            return match body {
                Some(ErrorBody {
                    error,
                    message,
                }) => match message {
                    Some(message) => bail!("Upload rejected: {error} ({message})"),
                    None => bail!("Upload rejected: {error}"),
                },
                None => Err(UpdateError::HttpStatus {
                    url,
                    status: status.as_u16(),
                }
                .into()),
            };
        }

        let published: UploadResponse =
            response.json().await.context("Unexpected upload response")?;
        println!(
            "{} Published version {} as {}",
            "✓".green(),
            published.version.bold(),
            published.filename
        );
        if let Some(changelog) = published.changelog {
            println!("  Changelog: {changelog}");
        }
        Ok(())
    }
}
