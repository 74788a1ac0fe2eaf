//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`fs`] - Atomic writes and directory copy/replace
//! - [`platform`] - Per-user data, config and temp directories
//! - [`process`] - Detached process launching
//! - [`progress`] - Terminal progress indicators

pub mod fs;
pub mod platform;
pub mod process;
pub mod progress;

pub use fs::{atomic_write, copy_dir, ensure_dir, remove_dir_all, replace_dir};
pub use platform::{get_data_dir, get_temp_root, is_windows, path_has_segment};
pub use process::{DetachedLauncher, LaunchSpec, ProcessLauncher};
pub use progress::ProgressBar;
