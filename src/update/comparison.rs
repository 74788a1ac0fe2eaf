//! Version comparison strategies.
//!
//! Installed player builds have always compared versions as floating point
//! numbers, so `"3" < "3.5" < "4"` and `"3"` equals `"3.0"`. That breaks for
//! multi-part versions (`1.10` parses as `1.1`, which is older than `1.9`),
//! so the comparison is pluggable: [`NumericComparator`] stays the default
//! for compatibility with published records, and [`SemverComparator`] is
//! available for deployments that use semantic versions.
//!
//! Unparseable versions never count as newer; a malformed server response
//! must not trigger an update.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Decides whether a remote version is newer than the installed one.
pub trait VersionComparator: Send + Sync + Debug {
    /// `true` iff `remote` is strictly newer than `local`.
    fn is_newer(&self, local: &str, remote: &str) -> bool;
}

/// Configured comparison strategy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ComparatorKind {
    /// Floating point comparison.
    #[default]
    Numeric,
    /// Semantic version comparison with lenient parsing.
    Semver,
}

impl ComparatorKind {
    /// Build the comparator for this strategy.
    #[must_use]
    pub fn comparator(self) -> Box<dyn VersionComparator> {
        match self {
            Self::Numeric => Box::new(NumericComparator),
            Self::Semver => Box::new(SemverComparator),
        }
    }
}

/// Compares versions as `f64`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NumericComparator;

impl NumericComparator {
    fn parse(version: &str) -> Option<f64> {
        version.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl VersionComparator for NumericComparator {
    fn is_newer(&self, local: &str, remote: &str) -> bool {
        match (Self::parse(local), Self::parse(remote)) {
            (Some(local), Some(remote)) => remote > local,
            _ => false,
        }
    }
}

/// Compares versions as semantic versions.
///
/// Accepts `v`, `version-` and `release-` prefixes and pads missing minor or
/// patch components, so `"3"` and `"v3.0.0"` are equal.
#[derive(Debug, Default, Clone, Copy)]
pub struct SemverComparator;

impl SemverComparator {
    fn parse(version: &str) -> Option<semver::Version> {
        let version = version.trim();
        let clean = version
            .strip_prefix("version-")
            .or_else(|| version.strip_prefix("release-"))
            .or_else(|| version.strip_prefix('v'))
            .unwrap_or(version);

        if let Ok(parsed) = semver::Version::parse(clean) {
            return Some(parsed);
        }

        let (core, rest) = match clean.find(['-', '+']) {
            Some(idx) => clean.split_at(idx),
            None => (clean, ""),
        };
        let parts = core.split('.').count();
        let padded = match parts {
            1 => format!("{core}.0.0{rest}"),
            2 => format!("{core}.0{rest}"),
            _ => return None,
        };
        semver::Version::parse(&padded).ok()
    }
}

impl VersionComparator for SemverComparator {
    fn is_newer(&self, local: &str, remote: &str) -> bool {
        match (Self::parse(local), Self::parse(remote)) {
            (Some(local), Some(remote)) => remote > local,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_comparison() {
        let cmp = NumericComparator;
        assert!(cmp.is_newer("3", "4"));
        assert!(cmp.is_newer("3", "3.5"));
        assert!(!cmp.is_newer("3", "3.0"));
        assert!(!cmp.is_newer("4", "3"));
        assert!(!cmp.is_newer("3", "3"));
    }

    #[test]
    fn test_numeric_rejects_garbage() {
        let cmp = NumericComparator;
        assert!(!cmp.is_newer("3", "latest"));
        assert!(!cmp.is_newer("beta", "4"));
        assert!(!cmp.is_newer("3", "NaN"));
        assert!(!cmp.is_newer("3", "inf"));
    }

    #[test]
    fn test_numeric_multi_part_limitation() {
        // 1.10 parses as 1.1; numeric comparison keeps the historical behaviour
        assert!(!NumericComparator.is_newer("1.9", "1.10"));
        assert!(SemverComparator.is_newer("1.9", "1.10"));
    }

    #[test]
    fn test_semver_lenient_parsing() {
        let cmp = SemverComparator;
        assert!(!cmp.is_newer("3", "v3.0.0"));
        assert!(cmp.is_newer("v2", "3"));
        assert!(cmp.is_newer("1.2", "release-1.2.1"));
        assert!(cmp.is_newer("1.0.0-beta.1", "1.0.0"));
        assert!(!cmp.is_newer("1.0.0", "1.0.0-rc.1"));
        assert!(!cmp.is_newer("1.0.0", "1.0.0.0"));
    }

    #[test]
    fn test_comparator_kind_from_config() {
        assert!(ComparatorKind::Numeric.comparator().is_newer("2", "3"));
        assert!(ComparatorKind::Semver.comparator().is_newer("1.9.0", "1.10.0"));
        assert_eq!(ComparatorKind::default(), ComparatorKind::Numeric);
    }
}
