// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for event normalization.
// Run with: cargo +nightly fuzz run fuzz_normalizer
//
// Queue payloads are untrusted. Normalization must either produce an entry
// whose partition name has the fixed shape or reject the payload, and never
// panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use xlog_core::{Normalizer, Partitioner};

fuzz_target!(|data: &[u8]| {
    if let Some(entry) = Normalizer::default().normalize_bytes(data) {
        let partition = Partitioner::new("xlog").partition_for(entry.timestamp());
        assert_eq!(partition.as_str().len(), "xlog".len() + 8);
        let _ = entry.to_document();
    }
});
