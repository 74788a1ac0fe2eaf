//! Configuration management
//!
//! - [`global`] - The TOML configuration file and its location
//! - [`update`] - Section types for the update client and distribution server
//!
//! Defaults come from `#[serde(default = ...)]` functions backed by
//! [`crate::constants`], so a partial file only overrides what it names.

pub mod global;
pub mod update;

pub use global::GlobalConfig;
pub use update::{ServerConfig, UpdateConfig};
