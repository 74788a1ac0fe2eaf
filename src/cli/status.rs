//! `perplan status`: installed vs. published version.

use crate::cli::CliConfig;
use crate::constants::PRODUCT_NAME;
use crate::update::client::{DistributionClient, RemoteVersionInfo};
use crate::update::version_store::{VersionRecord, VersionStore};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Distribution endpoint, overriding the configuration
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Version record to inspect instead of the default location
    #[arg(long, value_name = "PATH")]
    version_file: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    version_file: PathBuf,
    installed: Option<VersionRecord>,
    remote: Option<RemoteVersionInfo>,
    update_available: bool,
}

impl StatusCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let mut config = cli.load_global().await?.update;
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }

        let store = match self.version_file {
            Some(path) => VersionStore::new(path),
            None => VersionStore::open_default()?,
        };
        let client = DistributionClient::new(&config)?;

        let installed = store.read();
        let remote = client.fetch_remote_version().await;
        let comparator = config.comparator.comparator();
        let update_available = match (&installed, &remote) {
            (Some(local), Some(remote)) => comparator.is_newer(&local.version, &remote.version),
            _ => false,
        };

        let report = StatusReport {
            version_file: store.location().to_path_buf(),
            installed,
            remote,
            update_available,
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report, client.base_url());
        }
        Ok(())
    }
}

fn print_report(report: &StatusReport, base_url: &str) {
    println!("{}", PRODUCT_NAME.bold());

    match &report.installed {
        Some(record) => {
            println!("  Installed:  {}", record.version.green());
            if let Some(updated_at) = record.updated_at() {
                println!("  Updated:    {}", updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        None => println!("  Installed:  {}", "unknown (first run)".yellow()),
    }
    println!("  Record:     {}", report.version_file.display());

    match &report.remote {
        Some(remote) => {
            println!("  Published:  {} ({base_url})", remote.version);
            if let Some(changelog) = remote.changelog.as_deref().filter(|c| !c.trim().is_empty()) {
                println!("  Changelog:  {}", changelog.trim());
            }
        }
        None => println!("  Published:  {} ({base_url})", "unreachable".yellow()),
    }

    if report.update_available {
        println!("\n{}", "An update is available. Run `perplan check` to install it.".cyan());
    }
}
