//! PERPLAN CLI entry point
//!
//! Parses the command line, runs the selected command and renders failures
//! as user-friendly errors:
//! - `check` - Check for an update and install it after confirmation
//! - `status` - Show installed and published versions
//! - `serve` - Run the distribution server
//! - `publish` - Upload a package to a distribution server

use anyhow::Result;
use clap::Parser;
use perplan_updater::cli;
use perplan_updater::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
