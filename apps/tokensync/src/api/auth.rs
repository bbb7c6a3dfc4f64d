//! # Publish Key Verification
//!
//! Constant-time comparison of per-project publish keys. Unlike a bearer
//! token middleware, the key travels in the publish request body and is
//! checked against the project's configured key inside the handler.

use subtle::ConstantTimeEq;

// =============================================================================
// KEY COMPARISON
// =============================================================================

/// Compare a provided publish key against the expected one in constant time.
///
/// Both keys are padded to the same length so `ct_eq` always runs over the
/// same number of bytes, preventing length-leaking side channels.
#[must_use]
pub fn verify_publish_key(expected: &str, provided: &str) -> bool {
    let expected_bytes = expected.as_bytes();
    let provided_bytes = provided.as_bytes();

    let max_len = provided_bytes.len().max(expected_bytes.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided_bytes.len()].copy_from_slice(provided_bytes);
    padded_expected[..expected_bytes.len()].copy_from_slice(expected_bytes);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided_bytes.len() == expected_bytes.len()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn matching_keys_verify() {
        assert!(verify_publish_key("secret-key", "secret-key"));
    }

    #[test]
    fn wrong_keys_are_rejected() {
        assert!(!verify_publish_key("secret-key", "secret-kez"));
        assert!(!verify_publish_key("secret-key", "secret-key-longer"));
        assert!(!verify_publish_key("secret-key", ""));
    }

    #[test]
    fn empty_expected_key_never_verifies_nonempty_input() {
        assert!(!verify_publish_key("", "anything"));
    }
}
