//! Fuzz tests for the signing digest

use k256::Scalar;
use proptest::prelude::*;
use tss_sim_core::message_digest;

proptest! {
    /// The digest is a pure function of the message
    #[test]
    fn digest_deterministic(message in ".*") {
        prop_assert_eq!(message_digest(&message).unwrap(), message_digest(&message).unwrap());
    }

    /// Only the leftmost 32 bytes matter
    #[test]
    fn digest_ignores_bytes_past_32(prefix in "[a-z]{32}", tail in "[a-z]{1,64}") {
        let long = format!("{prefix}{tail}");
        prop_assert_eq!(message_digest(&long).unwrap(), message_digest(&prefix).unwrap());
    }

    /// Short messages are their big-endian value
    #[test]
    fn short_digest_is_integer_value(bytes in prop::collection::vec(0x20u8..0x7f, 0..8)) {
        let message = String::from_utf8(bytes.clone()).unwrap();
        let value = bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64);
        prop_assert_eq!(message_digest(&message).unwrap(), Scalar::from(value));
    }
}
