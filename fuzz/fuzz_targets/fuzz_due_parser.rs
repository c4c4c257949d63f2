//! Fuzz target: GraphQL `dueNow` response parser
//!
//! Feeds arbitrary bytes to `parse_due_now` and verifies:
//! - No panics under arbitrary input
//! - Every accepted due list survives a trip through the core JSON shape
//!
//! cargo fuzz run fuzz_due_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use pillbox::adapters::graphql::parse_due_now;
use pillbox::app::schedule::DueEntry;

fuzz_target!(|data: &[u8]| {
    if let Ok(entries) = parse_due_now(data) {
        let json = serde_json::to_vec(&entries).expect("due entries serialise");
        let back: Vec<DueEntry> = serde_json::from_slice(&json).expect("core shape parses");
        assert_eq!(back, entries);
    }
});
