//! Content addressing for downloaded payloads
//!
//! Every stored object is named after the SHA-256 digest of its bytes, so the
//! same payload always maps to the same storage key.

use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Compute the lowercase hex SHA-256 digest of `data`
pub fn content_digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_content_digest_known_value() {
        assert_eq!(
            content_digest(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_content_digest_empty_input() {
        assert_eq!(
            content_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_content_digest_is_lowercase_hex() {
        let digest = content_digest(b"pixels");
        assert_eq!(digest.len(), DIGEST_HEX_LEN);
        assert!(digest.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    proptest! {
        #[test]
        fn prop_digest_is_stable(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let first = content_digest(&data);
            let second = content_digest(&data);
            prop_assert_eq!(first.len(), DIGEST_HEX_LEN);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_distinct_inputs_have_distinct_digests(
            a in proptest::collection::vec(any::<u8>(), 0..1024),
            b in proptest::collection::vec(any::<u8>(), 0..1024),
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(content_digest(&a), content_digest(&b));
        }
    }
}
