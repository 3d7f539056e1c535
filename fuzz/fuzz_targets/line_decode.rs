//! Fuzz target for rendezvous line decoding
//!
//! # Strategy
//!
//! Arbitrary bytes, interpreted as one line, decoded in both directions.
//!
//! # Invariants
//!
//! - NEVER panic on malformed input
//! - A line that decodes to a message re-encodes to a single line that
//!   decodes to the same message

#![no_main]

use libfuzzer_sys::fuzz_target;
use pairwise_proto::{decode_line, encode_line, ControllerMessage, Line, PeerMessage};

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(Line::Message(msg)) = decode_line::<PeerMessage>(line) {
        let encoded = encode_line(&msg).expect("decoded message must encode");
        assert_eq!(encoded.matches('\n').count(), 1);
        match decode_line::<PeerMessage>(&encoded) {
            Ok(Line::Message(again)) => assert_eq!(again, msg),
            other => panic!("re-decode failed: {other:?}"),
        }
    }

    if let Ok(Line::Message(msg)) = decode_line::<ControllerMessage>(line) {
        let encoded = encode_line(&msg).expect("decoded message must encode");
        match decode_line::<ControllerMessage>(&encoded) {
            Ok(Line::Message(again)) => assert_eq!(again, msg),
            other => panic!("re-decode failed: {other:?}"),
        }
    }
});
