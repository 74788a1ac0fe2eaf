//! Core types shared by every part of the update pipeline
//!
//! Currently this is the error system:
//! - [`UpdateError`] - Strongly-typed failure cases
//! - [`ErrorContext`] - User-friendly wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error into a displayable context
//!
//! Every fallible operation returns an [`anyhow::Result`]; functions that
//! callers need to classify (staging, downloads) produce [`UpdateError`]
//! values that survive `.context()` wrapping and can be found again by
//! walking the cause chain.

pub mod error;

pub use error::{ErrorContext, UpdateError, user_friendly_error};
