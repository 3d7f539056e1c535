//! Fuzz target for update document extraction and merging
//!
//! # Strategy
//!
//! Two arbitrary JSON inputs used as the server and client update documents,
//! merged twice in a row with the first round's views fed back as history.
//!
//! # Invariants
//!
//! - NEVER panic on any JSON shape
//! - `_coordinator.pair_count` matches the published pairs
//! - Re-running an unchanged round leaves states and epochs unchanged

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pairwise_coordinator::{merge_round, Published, UpdateDocument};

#[derive(Debug, Arbitrary)]
struct Input {
    server: Vec<u8>,
    client: Vec<u8>,
}

fn parse(bytes: &[u8]) -> UpdateDocument {
    serde_json::from_slice(bytes)
        .map(|doc| UpdateDocument::from_value(&doc))
        .unwrap_or_default()
}

fuzz_target!(|input: Input| {
    let server = parse(&input.server);
    let client = parse(&input.client);

    let first = merge_round(&server, &client, &Published::new(), &Published::new(), 0);
    assert_eq!(first.server.metadata.pair_count, first.server.pairs.len());
    assert!(first.server.pairs.iter().all(|p| p.epoch == 1));

    let (server_prev, client_prev) = (first.server.published(), first.client.published());
    let second = merge_round(&server, &client, &server_prev, &client_prev, 1);
    assert_eq!(second.server.published(), first.server.published());
    assert_eq!(second.client.published(), first.client.published());
});
