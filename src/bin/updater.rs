//! PERPLAN handoff updater
//!
//! Shipped at the root of every update package and launched by the player
//! right before it exits. Installs the staged files, records the new version,
//! restarts the player and removes itself. See [`perplan_updater::handoff`].

use clap::Parser;
use colored::Colorize;
use perplan_updater::constants::PRODUCT_NAME;
use perplan_updater::handoff::{Handoff, WaitOutcome};
use perplan_updater::update::HandoffArguments;
use std::io::Write;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "updater",
    about = "Applies a staged PPL Player update once the player has exited"
)]
struct UpdaterCli {
    #[command(flatten)]
    handoff: HandoffArguments,

    /// Enable debug logging
    #[arg(long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(long)]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = UpdaterCli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();

    let target = cli.handoff.target.clone();
    let version = cli.handoff.version.clone();
    let report = Handoff::new(cli.handoff).run().await;

    // The player that launched us may be gone along with the reading end of
    // our stdout; a failed write must not turn an install into a crash.
    let mut out = std::io::stdout().lock();
    let mut err = std::io::stderr().lock();

    if report.succeeded() {
        if report.wait == WaitOutcome::TimedOut {
            let warning = "The player did not exit in time; some files may be outdated";
            writeln!(err, "{}", warning.yellow()).ok();
        }
        for failure in &report.copy.failures {
            writeln!(err, "{} {}: {}", "skipped".yellow(), failure.path.display(), failure.reason)
                .ok();
        }
        writeln!(out, "{} {PRODUCT_NAME} updated to {version}", "✓".green()).ok();
        return;
    }

    writeln!(err, "{}: no files could be installed", "error".red().bold()).ok();
    for failure in &report.copy.failures {
        writeln!(err, "  {}: {}", failure.path.display(), failure.reason).ok();
    }
    writeln!(
        err,
        "{}: restart {PRODUCT_NAME} manually from {}",
        "suggestion".green(),
        target.display()
    )
    .ok();
    drop((out, err));
    std::process::exit(1);
}
