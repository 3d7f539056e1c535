//! Property-based tests for line decoding.
//!
//! The decoder sits directly on untrusted socket input, so it must reject
//! garbage with an error and never panic.

use pairwise_proto::{Line, PeerMessage, ProtocolError, decode_line, encode_line};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Property: arbitrary text never panics the decoder
    #[test]
    fn prop_decode_never_panics(line in ".*") {
        let _ = decode_line::<PeerMessage>(&line);
    }

    /// Property: any encoded message is a single line that decodes back
    #[test]
    fn prop_encoded_message_is_one_line(
        qpn in any::<u32>(),
        addr in any::<u64>(),
        rkey in any::<u32>(),
    ) {
        let msg = PeerMessage::QpMetadata(pairwise_proto::QpMetadata { qpn, addr, rkey });
        let line = encode_line(&msg)?;

        prop_assert_eq!(line.matches('\n').count(), 1);
        prop_assert_eq!(decode_line::<PeerMessage>(&line)?, Line::Message(msg));
    }

    /// Property: a JSON object with an unknown type tag is always an error
    #[test]
    fn prop_unknown_type_rejected(kind in "[a-z_]{1,16}") {
        prop_assume!(!["global_metadata", "qp_metadata", "pair_request"].contains(&kind.as_str()));

        let line = format!(r#"{{"type":"{kind}","qpn":1}}"#);
        let result = decode_line::<PeerMessage>(&line);
        prop_assert!(matches!(result, Err(ProtocolError::Json(_))));
    }
}
