//! Command-line interface for the PERPLAN update pipeline.
//!
//! The `perplan` binary hosts the parts of the pipeline that can run outside
//! the player's GUI:
//!
//! - `check` - Run one update attempt with a console UI (consent prompt and
//!   progress bar on the terminal)
//! - `status` - Show the recorded version and what the endpoint publishes
//! - `serve` - Run the distribution server
//! - `publish` - Upload a package to a distribution server
//!
//! The updater half of the handoff is a separate binary (`updater`) with its
//! own argument parser, see [`crate::update::handoff::HandoffArguments`].
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug logging
//! - `--quiet` - Errors only, no progress bars
//! - `--config <PATH>` - Use a specific configuration file
//! - `--no-progress` - Disable progress bars
//!
//! ```bash
//! perplan check --yes
//! perplan --verbose serve --bind 0.0.0.0:1234 --public-url http://updates.lan:1234
//! perplan publish update_v4.zip --changelog "Faster seeking"
//! ```

pub mod check;
pub mod publish;
pub mod serve;
pub mod status;

use crate::config::GlobalConfig;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Settings derived from the global flags, handed to every command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is not set; `None` logs errors only.
    pub log_level: Option<String>,

    /// Disable progress bars.
    pub no_progress: bool,

    /// Configuration file overriding the default location.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the configuration file this CLI run should use.
    pub async fn load_global(&self) -> Result<GlobalConfig> {
        GlobalConfig::load_with_optional(self.config_path.clone()).await
    }

    /// Install the global tracing subscriber.
    ///
    /// `RUST_LOG` wins over the flag-derived level. Safe to call more than
    /// once; later calls are ignored.
    pub fn init_logging(&self) {
        let default = self.log_level.as_deref().unwrap_or("error");
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{default},tower_http=warn")));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init();
    }
}

/// PERPLAN update tooling.
#[derive(Parser, Debug)]
#[command(
    name = "perplan",
    about = "PPL Player update tooling - check, serve and publish updates",
    version,
    long_about = "Checks for PPL Player updates against a distribution endpoint, \
                  runs that endpoint, and publishes new packages to it."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check for an update and install it after confirmation
    Check(check::CheckCommand),

    /// Show installed and published versions
    Status(status::StatusCommand),

    /// Run the distribution server
    Serve(serve::ServeCommand),

    /// Upload a package to a distribution server
    Publish(publish::PublishCommand),
}

impl Cli {
    /// Parse-independent entry point used by `main`.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress || self.quiet,
            config_path: self.config.clone(),
        }
    }

    /// Run the selected command with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Check(cmd) => cmd.execute(&config).await,
            Commands::Status(cmd) => cmd.execute(&config).await,
            Commands::Serve(cmd) => cmd.execute(&config).await,
            Commands::Publish(cmd) => cmd.execute(&config).await,
        }
    }
}
