use crate::core::UpdateError;
use anyhow::Result;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

/// SHA-256 integrity checks for update packages.
///
/// The distribution endpoint may advertise the hash of the package it serves
/// in the update descriptor. When it does, the bytes are checked before
/// anything is written to disk, so a truncated or altered download never
/// reaches the stager. This detects corruption, not a malicious server:
/// packages are not signed.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Hex-encoded SHA-256 of `bytes`.
    #[must_use]
    pub fn compute_sha256(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    /// Verify `bytes` against an expected hex digest.
    ///
    /// The comparison is case-insensitive and tolerates a `sha256:` prefix on
    /// the expected value. A mismatch is reported as
    /// [`UpdateError::ChecksumMismatch`].
    pub fn verify_bytes(bytes: &[u8], expected_checksum: &str) -> Result<()> {
        let expected = normalize(expected_checksum);
        let actual = Self::compute_sha256(bytes);

        if actual != expected {
            warn!("Checksum mismatch: expected {expected}, got {actual}");
            return Err(UpdateError::ChecksumMismatch {
                expected,
                actual,
            }
            .into());
        }

        info!("Checksum verification successful");
        Ok(())
    }
}

fn normalize(checksum: &str) -> String {
    let trimmed = checksum.trim();
    let hex = trimmed
        .strip_prefix("sha256:")
        .or_else(|| trimmed.strip_prefix("SHA256:"))
        .unwrap_or(trimmed);
    hex.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256("hello world")
    const HELLO_SHA: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_compute_sha256() {
        assert_eq!(ChecksumVerifier::compute_sha256(b"hello world"), HELLO_SHA);
    }

    #[test]
    fn test_verify_accepts_prefix_and_uppercase() {
        ChecksumVerifier::verify_bytes(b"hello world", HELLO_SHA).unwrap();
        ChecksumVerifier::verify_bytes(b"hello world", &HELLO_SHA.to_uppercase()).unwrap();
        ChecksumVerifier::verify_bytes(b"hello world", &format!("sha256:{HELLO_SHA}")).unwrap();
    }

    #[test]
    fn test_verify_mismatch() {
        let err = ChecksumVerifier::verify_bytes(b"hello world!", HELLO_SHA).unwrap_err();
        match err.downcast_ref::<UpdateError>() {
            Some(UpdateError::ChecksumMismatch {
                expected,
                actual,
            }) => {
                assert_eq!(expected, HELLO_SHA);
                assert_ne!(actual, HELLO_SHA);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
