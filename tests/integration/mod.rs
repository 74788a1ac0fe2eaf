//! Integration test suite for the PERPLAN update pipeline
//!
//! End-to-end tests of the public API and the two binaries. The distribution
//! server always runs in-process on an ephemeral port; nothing here needs
//! network access beyond localhost.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **server**: HTTP contract of the distribution server
//! - **pipeline**: Player side and updater side chained together
//! - **updater_cli**: The `updater` binary as launched by the player
//! - **perplan_cli**: The `perplan` binary (status, publish)

mod perplan_cli;
mod pipeline;
mod server;
mod updater_cli;
