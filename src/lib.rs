//! PERPLAN - self-update pipeline for the PPL media player
//!
//! Keeps an installed player current against a small HTTP distribution
//! endpoint. The work is split across two processes because a running
//! executable cannot replace its own files:
//!
//! - the **player** checks for a newer version in the background, asks the
//!   user, downloads and stages the package, launches the bundled updater
//!   and exits;
//! - the **updater** waits for the player to exit, copies the staged files
//!   over the installation, records the new version, restarts the player and
//!   removes itself.
//!
//! A third component, the **distribution server**, publishes the current
//! version and its package and accepts uploads of new packages.
//!
//! # Architecture Overview
//!
//! ```text
//!   player process                     updater process
//! ┌───────────────────────┐         ┌──────────────────────────┐
//! │ UpdateOrchestrator    │ launch  │ Handoff                  │
//! │  ├─ DistributionClient│────────▶│  ├─ wait for exit        │
//! │  ├─ VersionStore      │ Handoff │  ├─ copy package         │
//! │  ├─ PackageStager     │Arguments│  ├─ record version       │
//! │  └─ UiHandle ◀─▶ UI   │         │  ├─ clean staging        │
//! └──────────┬────────────┘         │  ├─ restart player       │
//!            │ HTTP                 │  └─ self-delete          │
//!            ▼                      └──────────────────────────┘
//! ┌───────────────────────┐
//! │ distribution server   │
//! │  /api/update, ...     │
//! └───────────────────────┘
//! ```
//!
//! # Core Modules
//!
//! - [`update`] - Client side: version check, consent, staging, handoff
//! - [`handoff`] - Updater side: wait, copy, record, clean up, restart
//! - [`server`] - Distribution endpoint (axum)
//! - [`cli`] - `perplan` command line (check, status, serve, publish)
//!
//! ## Supporting Modules
//!
//! - [`config`] - Global TOML configuration
//! - [`constants`] - Timeouts, file names and the temp namespace
//! - [`core`] - Error types and user-facing error formatting
//! - [`utils`] - File system, platform directories, process launching,
//!   progress bars
//!
//! # Persisted Files
//!
//! | File | Owner | Content |
//! |------|-------|---------|
//! | `<data>/perplan-media/version_info.json` | player, updater | `{"version", "changelog", "updated_at"}` |
//! | `<temp>/perplan-media/update-<id>/` | player, then updater | `package.zip` and `extracted/` |
//! | `<server-data>/server_version.json` | server | published version and changelog |
//! | `<server-data>/updates/update_v<V>.zip` | server | published package plus `.sha256` |

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod handoff;
pub mod server;
pub mod update;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
