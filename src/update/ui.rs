//! Message bridge between the update worker and the UI loop.
//!
//! The orchestrator runs on a background thread and never touches the UI
//! directly. Everything it needs from the user or the host application goes
//! through [`UiHandle`] as a [`UiRequest`]; the UI loop drains the receiving
//! end on its own thread and acts on each request there.
//!
//! Consent is a request carrying a one-shot reply slot. The worker waits for
//! the reply for a bounded time; no answer, or a UI that went away, counts as
//! "no".

use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Coarse progress milestones of a staged update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    /// Update accepted, nothing downloaded yet.
    Preparing,
    /// Download in flight; size unknown.
    Downloading,
    /// Writing the package to the staging area.
    Saving,
    /// Unpacking the package.
    Extracting,
    /// Launching the updater.
    Installing,
}

impl ProgressStage {
    /// Percentage shown for this stage, `None` for indeterminate.
    #[must_use]
    pub const fn percent(self) -> Option<u8> {
        match self {
            Self::Preparing => Some(0),
            Self::Downloading => None,
            Self::Saving => Some(40),
            Self::Extracting => Some(60),
            Self::Installing => Some(90),
        }
    }

    /// Default status line for this stage.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Preparing => "Preparing update...",
            Self::Downloading => "Downloading update...",
            Self::Saving => "Saving update package...",
            Self::Extracting => "Extracting files...",
            Self::Installing => "Installing update...",
        }
    }
}

/// Severity of a one-off notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Something failed; the application keeps running.
    Error,
}

/// A request from the worker to the UI loop.
#[derive(Debug)]
pub enum UiRequest {
    /// Ask a yes/no question; answer through `reply`.
    Confirm {
        /// Dialog title
        title: String,
        /// Question text
        message: String,
        /// Reply slot; `true` accepts
        reply: oneshot::Sender<bool>,
    },
    /// Show or advance the progress indicator.
    Progress {
        /// Current milestone
        stage: ProgressStage,
        /// Status line
        message: String,
        /// Percentage, `None` for indeterminate
        percent: Option<u8>,
    },
    /// Show a one-off notification.
    Notify {
        /// Severity
        level: NoticeLevel,
        /// Notification title
        title: String,
        /// Notification body
        message: String,
    },
    /// Terminate the host application so the updater can replace its files.
    Shutdown,
}

/// Worker side of the bridge.
#[derive(Debug, Clone)]
pub struct UiHandle {
    tx: mpsc::UnboundedSender<UiRequest>,
}

impl UiHandle {
    /// Create a connected handle and receiver.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Ask the user and wait at most `timeout` for the answer.
    ///
    /// Returns `false` on timeout or when the UI side is gone.
    pub async fn confirm(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        timeout: Duration,
    ) -> bool {
        let (reply, answer) = oneshot::channel();
        let request = UiRequest::Confirm {
            title: title.into(),
            message: message.into(),
            reply,
        };
        if self.tx.send(request).is_err() {
            debug!("UI loop is gone; treating consent as declined");
            return false;
        }

        match tokio::time::timeout(timeout, answer).await {
            Ok(Ok(accepted)) => accepted,
            Ok(Err(_)) => {
                debug!("Consent request dropped without an answer");
                false
            }
            Err(_) => {
                debug!("No answer to consent request within {timeout:?}");
                false
            }
        }
    }

    /// Report a progress milestone with its default message.
    pub fn progress(&self, stage: ProgressStage) {
        self.send(UiRequest::Progress {
            stage,
            message: stage.message().to_string(),
            percent: stage.percent(),
        });
    }

    /// Show a notification.
    pub fn notify(&self, level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) {
        self.send(UiRequest::Notify {
            level,
            title: title.into(),
            message: message.into(),
        });
    }

    /// Ask the host application to exit.
    ///
    /// Returns `false` if the UI loop already stopped listening.
    pub fn request_shutdown(&self) -> bool {
        self.tx.send(UiRequest::Shutdown).is_ok()
    }

    fn send(&self, request: UiRequest) {
        if self.tx.send(request).is_err() {
            debug!("UI loop is gone; dropping request");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_confirm_accepted() {
        let (ui, mut rx) = UiHandle::channel();
        let responder = tokio::spawn(async move {
            match rx.recv().await {
                Some(UiRequest::Confirm {
                    reply,
                    message,
                    ..
                }) => {
                    assert!(message.contains("version 4"));
                    reply.send(true).unwrap();
                }
                other => panic!("unexpected request: {other:?}"),
            }
        });

        assert!(ui.confirm("Update", "Install version 4?", Duration::from_secs(5)).await);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_confirm_times_out_as_declined() {
        let (ui, mut rx) = UiHandle::channel();
        let answer = ui.confirm("Update", "Install?", Duration::from_millis(50)).await;
        assert!(!answer);
        // The request was delivered, just never answered
        assert!(matches!(rx.try_recv(), Ok(UiRequest::Confirm { .. })));
    }

    #[tokio::test]
    async fn test_confirm_dropped_reply_is_declined() {
        let (ui, mut rx) = UiHandle::channel();
        let dropper = tokio::spawn(async move {
            let request = rx.recv().await;
            drop(request);
        });
        assert!(!ui.confirm("Update", "Install?", Duration::from_secs(5)).await);
        dropper.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_ui_declines_and_rejects_shutdown() {
        let (ui, rx) = UiHandle::channel();
        drop(rx);
        assert!(!ui.confirm("Update", "Install?", Duration::from_secs(5)).await);
        assert!(!ui.request_shutdown());
        ui.progress(ProgressStage::Preparing);
    }

    #[test]
    fn test_progress_milestones() {
        let (ui, mut rx) = UiHandle::channel();
        for stage in [
            ProgressStage::Preparing,
            ProgressStage::Downloading,
            ProgressStage::Saving,
            ProgressStage::Extracting,
            ProgressStage::Installing,
        ] {
            ui.progress(stage);
        }

        let mut percents = Vec::new();
        while let Ok(UiRequest::Progress {
            percent,
            ..
        }) = rx.try_recv()
        {
            percents.push(percent);
        }
        assert_eq!(percents, vec![Some(0), None, Some(40), Some(60), Some(90)]);
    }
}
