//! Error handling for the PERPLAN update pipeline
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** so callers can classify update failures
//!    (transient network problems are silent, staging failures are shown once)
//! 2. **User-friendly messages** with actionable suggestions for the CLI
//!
//! # Architecture
//!
//! - [`UpdateError`] - Enumerated failure cases of the pipeline
//! - [`ErrorContext`] - Wrapper adding suggestions and details for display
//! - [`user_friendly_error`] - Converts any [`anyhow::Error`] into an
//!   [`ErrorContext`], walking the cause chain for known error types
//!
//! # Examples
//!
//! ```rust,no_run
//! use perplan_updater::core::{UpdateError, user_friendly_error};
//!
//! let error = anyhow::Error::from(UpdateError::MissingUpdater {
//!     name: "updater.exe".to_string(),
//!     dir: "C:/Temp/perplan-media/update-1/extracted".to_string(),
//! });
//! user_friendly_error(error).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Failure cases of the update pipeline.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The distribution endpoint could not be reached or timed out.
    #[error("Network operation failed: {operation}")]
    Network {
        /// What was being attempted (e.g. "download package")
        operation: String,
        /// Transport-level reason
        reason: String,
    },

    /// The distribution endpoint answered with a non-success status.
    #[error("Unexpected HTTP status {status} from {url}")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// Status code returned by the server
        status: u16,
    },

    /// The downloaded archive could not be read or extracted.
    #[error("Invalid update package: {reason}")]
    InvalidPackage {
        /// Why the package was rejected
        reason: String,
    },

    /// The package does not contain the updater executable.
    #[error("Update package does not contain '{name}'")]
    MissingUpdater {
        /// Expected executable file name
        name: String,
        /// Directory that was scanned
        dir: String,
    },

    /// The package hash does not match the advertised one.
    #[error("Checksum mismatch for update package")]
    ChecksumMismatch {
        /// Hash advertised by the distribution endpoint
        expected: String,
        /// Hash computed locally
        actual: String,
    },

    /// A file system operation failed.
    #[error("File system error during {operation}: {path}")]
    FileSystem {
        /// Operation being performed
        operation: String,
        /// Path involved
        path: String,
    },

    /// A detached process could not be started.
    #[error("Failed to launch '{program}': {reason}")]
    Launch {
        /// Program that failed to start
        program: String,
        /// Underlying reason
        reason: String,
    },

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong with the configuration
        message: String,
    },

    /// IO error from the standard library.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reading or writing a zip archive.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl UpdateError {
    /// Whether this failure is transient (offline, timeout, server hiccup).
    ///
    /// Transient failures are never surfaced to the user as errors.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::HttpStatus { .. })
    }
}

/// Error wrapper with a suggestion and details for CLI display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: UpdateError,
    /// Actionable hint for the user
    pub suggestion: Option<String>,
    /// Additional explanation
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wrap an error without suggestion or details.
    #[must_use]
    pub const fn new(error: UpdateError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// Walks the cause chain looking for an [`UpdateError`] or a
/// [`std::io::Error`]; everything else is reported with the full chain as
/// details.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(update_error) = cause.downcast_ref::<UpdateError>() {
            return create_error_context(update_error, &error);
        }

        if let Some(io_error) = cause.downcast_ref::<std::io::Error>() {
            match io_error.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    return ErrorContext::new(UpdateError::FileSystem {
                        operation: "file access".to_string(),
                        path: "unknown".to_string(),
                    })
                    .with_suggestion(
                        "Check that the install directory is writable by the current user",
                    )
                    .with_details(format!("{error:#}"));
                }
                std::io::ErrorKind::NotFound => {
                    return ErrorContext::new(UpdateError::FileSystem {
                        operation: "file access".to_string(),
                        path: "unknown".to_string(),
                    })
                    .with_suggestion("Check that the file or directory exists")
                    .with_details(format!("{error:#}"));
                }
                _ => {}
            }
        }
    }

    ErrorContext::new(UpdateError::Other {
        message: error.to_string(),
    })
    .with_details(format!("{error:#}"))
}

fn create_error_context(error: &UpdateError, chain: &anyhow::Error) -> ErrorContext {
    match error {
        UpdateError::Network { operation, reason } => ErrorContext::new(UpdateError::Network {
            operation: operation.clone(),
            reason: reason.clone(),
        })
        .with_suggestion("Check your network connection and the configured update base_url")
        .with_details(reason.clone()),
        UpdateError::HttpStatus { url, status } => ErrorContext::new(UpdateError::HttpStatus {
            url: url.clone(),
            status: *status,
        })
        .with_suggestion("Verify the distribution server is running and has a package published"),
        UpdateError::MissingUpdater { name, dir } => ErrorContext::new(UpdateError::MissingUpdater {
            name: name.clone(),
            dir: dir.clone(),
        })
        .with_suggestion(format!("Rebuild the package with '{name}' at the archive root"))
        .with_details(format!("Scanned {dir}")),
        UpdateError::ChecksumMismatch { expected, actual } => {
            ErrorContext::new(UpdateError::ChecksumMismatch {
                expected: expected.clone(),
                actual: actual.clone(),
            })
            .with_suggestion("Retry the update; if it persists the published package is corrupt")
            .with_details(format!("Expected: {expected}\nActual:   {actual}"))
        }
        UpdateError::Config { message } => ErrorContext::new(UpdateError::Config {
            message: message.clone(),
        })
        .with_suggestion("Fix or remove the configuration file; defaults are used when it is absent"),
        other => ErrorContext::new(UpdateError::Other {
            message: other.to_string(),
        })
        .with_details(format!("{chain:#}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let offline = UpdateError::Network {
            operation: "fetch".to_string(),
            reason: "timeout".to_string(),
        };
        assert!(offline.is_transient());

        let status = UpdateError::HttpStatus {
            url: "http://localhost/api/download".to_string(),
            status: 404,
        };
        assert!(status.is_transient());

        let missing = UpdateError::MissingUpdater {
            name: "updater".to_string(),
            dir: "/tmp".to_string(),
        };
        assert!(!missing.is_transient());
    }

    #[test]
    fn test_user_friendly_error_finds_update_error_in_chain() {
        let error = anyhow::Error::from(UpdateError::MissingUpdater {
            name: "updater.exe".to_string(),
            dir: "/tmp/perplan-media/update-1/extracted".to_string(),
        })
        .context("Staging failed");

        let ctx = user_friendly_error(error);
        assert!(matches!(ctx.error, UpdateError::MissingUpdater { .. }));
        assert!(ctx.suggestion.unwrap().contains("updater.exe"));
    }

    #[test]
    fn test_error_context_display_includes_suggestion() {
        let ctx = ErrorContext::new(UpdateError::Config {
            message: "bad comparator".to_string(),
        })
        .with_suggestion("use numeric or semver");

        let rendered = ctx.to_string();
        assert!(rendered.contains("Configuration error: bad comparator"));
        assert!(rendered.contains("Suggestion: use numeric or semver"));
    }

    #[test]
    fn test_unknown_errors_keep_chain_in_details() {
        let error = anyhow::anyhow!("root cause").context("outer");
        let ctx = user_friendly_error(error);
        assert!(ctx.details.unwrap().contains("root cause"));
    }
}
