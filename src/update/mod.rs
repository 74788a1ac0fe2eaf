//! Client side of the PERPLAN self-update pipeline.
//!
//! Runs inside the player. A background worker asks the distribution
//! endpoint for the published version, compares it with the locally recorded
//! one, asks the user, downloads and stages the package, launches the
//! bundled updater and finally asks the player to exit. The updater side
//! lives in [`crate::handoff`].
//!
//! # Architecture Overview
//!
//! - **[`UpdateOrchestrator`]**: the state machine driving one attempt
//! - **[`DistributionClient`]**: HTTP access to `/api/update` and the package
//! - **[`VersionStore`]**: the locally recorded installed version
//! - **[`PackageStager`]**: checksum, save, extract and validate a package
//! - **[`UiHandle`]**: the only way the worker talks to the UI thread
//! - **[`HandoffArguments`]**: the typed contract with the updater process
//!
//! ## Update Flow
//!
//! ```text
//! 1. Version Check
//!    ├── Read version_info.json (missing: record remote as baseline, stop)
//!    └── GET /api/update (unreachable: stop quietly)
//!
//! 2. Consent
//!    └── Confirm prompt through the UI bridge, bounded by a timeout
//!
//! 3. Staging
//!    ├── Download the package
//!    ├── Verify SHA-256 when advertised
//!    └── Save, extract, require the updater at the root
//!
//! 4. Handoff
//!    ├── Launch the updater with HandoffArguments
//!    └── Ask the UI to shut the player down
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use perplan_updater::config::UpdateConfig;
//! use perplan_updater::update::{UiHandle, UpdateOrchestrator};
//!
//! # fn example() -> anyhow::Result<()> {
//! let (ui, _requests) = UiHandle::channel();
//! let worker = UpdateOrchestrator::new(UpdateConfig::default(), ui)?.spawn_background()?;
//! // ...drain `_requests` on the UI thread...
//! # let _ = worker;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod comparison;
pub mod handoff;
pub mod orchestrator;
pub mod stager;
pub mod ui;
pub mod verification;
pub mod version_store;


pub use client::{DistributionClient, RemoteVersionInfo};
pub use comparison::{ComparatorKind, NumericComparator, SemverComparator, VersionComparator};
pub use handoff::{AppIdentity, HandoffArguments};
pub use orchestrator::{UpdateOrchestrator, UpdateOutcome, UpdateState};
pub use stager::{PackageStager, StagedPackage};
pub use ui::{NoticeLevel, ProgressStage, UiHandle, UiRequest};
pub use verification::ChecksumVerifier;
pub use version_store::{VersionRecord, VersionStore};
