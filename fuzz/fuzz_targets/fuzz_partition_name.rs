// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for parsing partition names back into dates.
// Run with: cargo +nightly fuzz run fuzz_partition_name
//
// The viewer hands arbitrary collection names to `date_of`; any name it
// accepts must round-trip through `partition_for_date`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use xlog_core::{PartitionId, Partitioner};

fuzz_target!(|data: &[u8]| {
    if let Ok(name) = std::str::from_utf8(data) {
        let partitioner = Partitioner::new("xlog");
        let id = PartitionId::new(name);
        if let Some(date) = partitioner.date_of(&id) {
            assert_eq!(partitioner.partition_for_date(date), id);
        }
    }
});
