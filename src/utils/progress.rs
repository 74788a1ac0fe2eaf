//! Terminal progress indicators for the console update harness
//!
//! Thin wrapper over `indicatif` that renders the orchestrator's coarse
//! milestones: a spinner while the percentage is unknown, a bar once it is.
//! Progress output is suppressed when `PERPLAN_NO_PROGRESS` is set (the
//! `--quiet` flag sets it) so scripted runs get clean output.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

/// Environment variable disabling progress rendering.
pub const NO_PROGRESS_ENV: &str = "PERPLAN_NO_PROGRESS";

fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV).is_ok()
}

/// Progress indicator that switches between spinner and bar.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Create a percentage bar (0..=100).
    pub fn new_percent() -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(100);
            bar.set_style(percent_style());
            bar
        };
        Self { inner: bar }
    }

    /// A bar that never renders.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Set a determinate percentage.
    pub fn set_percent(&self, percent: u8) {
        self.inner.set_style(percent_style());
        self.inner.disable_steady_tick();
        self.inner.set_position(u64::from(percent.min(100)));
    }

    /// Switch to an indeterminate spinner.
    pub fn set_indeterminate(&self) {
        self.inner.set_style(spinner_style());
        self.inner.enable_steady_tick(Duration::from_millis(100));
    }

    /// Update the message shown next to the indicator.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Finish, keeping the final message visible.
    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    /// Finish and remove the indicator from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    /// Whether output is actually rendered.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }
}

fn percent_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}
