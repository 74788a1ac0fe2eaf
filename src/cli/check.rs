//! `perplan check`: one update attempt with a terminal UI.
//!
//! The orchestrator runs on its own worker thread exactly as it does inside
//! the player; this command only plays the UI loop, rendering prompts,
//! progress milestones and notifications on the terminal.

use crate::cli::CliConfig;
use crate::constants::PRODUCT_NAME;
use crate::update::comparison::ComparatorKind;
use crate::update::handoff::AppIdentity;
use crate::update::orchestrator::{UpdateOrchestrator, UpdateOutcome};
use crate::update::ui::{NoticeLevel, UiHandle, UiRequest};
use crate::utils::ProgressBar;
use anyhow::{Result, anyhow, bail};
use clap::Args;
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Accept the update without prompting
    #[arg(short, long)]
    yes: bool,

    /// Offer the published version even if it is not newer
    #[arg(long)]
    force: bool,

    /// Distribution endpoint, overriding the configuration
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Version comparison strategy, overriding the configuration
    #[arg(long, value_enum)]
    comparator: Option<ComparatorKind>,

    /// Update a script-based install run by this interpreter
    #[arg(long, value_name = "PATH", requires = "install_dir")]
    interpreter: Option<PathBuf>,

    /// Installation directory of the script-based install
    #[arg(long, value_name = "DIR", requires = "interpreter")]
    install_dir: Option<PathBuf>,
}

impl CheckCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let mut config = cli.load_global().await?.update;
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(kind) = self.comparator {
            config.comparator = kind;
        }

        let (ui, rx) = UiHandle::channel();
        let mut orchestrator = UpdateOrchestrator::new(config, ui)?.force(self.force);
        if let (Some(interpreter), Some(dir)) = (self.interpreter, self.install_dir.as_deref()) {
            orchestrator = orchestrator.with_identity(AppIdentity::interpreted(interpreter, dir));
        }

        let worker = orchestrator.spawn_background()?;
        ConsoleUi::new(self.yes, cli.no_progress).run(rx).await;

        let outcome = tokio::task::spawn_blocking(move || worker.join())
            .await?
            .map_err(|_| anyhow!("Update worker panicked"))?;
        report(&outcome)
    }
}

/// Terminal stand-in for the player's UI loop.
struct ConsoleUi {
    assume_yes: bool,
    no_progress: bool,
    bar: Option<ProgressBar>,
}

impl ConsoleUi {
    const fn new(assume_yes: bool, no_progress: bool) -> Self {
        Self {
            assume_yes,
            no_progress,
            bar: None,
        }
    }

    /// Serve requests until the worker drops its handle.
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<UiRequest>) {
        while let Some(request) = rx.recv().await {
            match request {
                UiRequest::Confirm {
                    title,
                    message,
                    reply,
                } => self.confirm(&title, &message, reply).await,
                UiRequest::Progress {
                    message,
                    percent,
                    ..
                } => {
                    let bar = self.bar.get_or_insert_with(|| {
                        if self.no_progress {
                            ProgressBar::hidden()
                        } else {
                            ProgressBar::new_percent()
                        }
                    });
                    match percent {
                        Some(percent) => bar.set_percent(percent),
                        None => bar.set_indeterminate(),
                    }
                    bar.set_message(message);
                }
                UiRequest::Notify {
                    level,
                    title,
                    message,
                } => {
                    if let Some(bar) = self.bar.take() {
                        bar.finish_and_clear();
                    }
                    match level {
                        NoticeLevel::Info => println!("{}: {message}", title.cyan()),
                        NoticeLevel::Error => eprintln!("{}: {message}", title.red().bold()),
                    }
                }
                UiRequest::Shutdown => {
                    if let Some(bar) = self.bar.take() {
                        bar.finish_with_message("Handing over to the updater");
                    }
                    debug!("Shutdown requested by update worker");
                }
            }
        }
    }

    async fn confirm(&self, title: &str, message: &str, mut reply: oneshot::Sender<bool>) {
        println!("{}", title.bold());
        println!("{message}");

        if self.assume_yes {
            println!("{}", "Accepted (--yes)".green());
            let _ = reply.send(true);
            return;
        }

        print!("[y/N] ");
        let _ = std::io::stdout().flush();

        let answer = tokio::select! {
            answer = read_answer() => Some(answer.unwrap_or(false)),
            () = reply.closed() => None,
        };

        match answer {
            Some(answer) => {
                let _ = reply.send(answer);
            }
            None => {
                println!();
                println!("{}", "No answer in time; skipping this update".yellow());
            }
        }
    }
}

/// Read one line from stdin on a detached thread.
///
/// The thread is not part of the runtime's blocking pool, so an unanswered
/// prompt does not keep the process alive.
fn read_answer() -> oneshot::Receiver<bool> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let accepted = std::io::stdin().read_line(&mut line).is_ok() && is_affirmative(&line);
        let _ = tx.send(accepted);
    });
    rx
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn report(outcome: &UpdateOutcome) -> Result<()> {
    match outcome {
        UpdateOutcome::FirstRun {
            baseline: Some(version),
        } => println!("{} First run: recorded version {version} as installed", "✓".green()),
        UpdateOutcome::FirstRun {
            baseline: None,
        } => println!("{}", "First run: update server unavailable, nothing recorded".yellow()),
        UpdateOutcome::UpToDate => println!("{} {PRODUCT_NAME} is up to date", "✓".green()),
        UpdateOutcome::Offline => {
            println!("{}", "Update server unavailable; skipped the check".yellow());
        }
        UpdateOutcome::Declined => println!("Update declined"),
        UpdateOutcome::StageFailed {
            reason,
        } => bail!("Update was not installed: {reason}"),
        UpdateOutcome::HandoffRequested {
            args,
        } => println!(
            "{} Updater started; {PRODUCT_NAME} {} will be installed into {}",
            "✓".green(),
            args.version,
            args.target.display()
        ),
    }
    Ok(())
}
