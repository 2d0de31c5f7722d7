// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// xlog core data model
//
// Everything the ingestion pipeline passes between its stages lives here:
// the normalized `LogEntry`, the day-granular `PartitionId` and the
// `Partitioner` that derives it, the `Batch` that accumulates entries per
// partition alongside the raw events they came from, and the `Normalizer`
// that turns a shipper event into a `LogEntry`.
//
// # Modules
//
// - [`entry`] -- `LogEntry`, a timestamp plus an open JSON field set.
// - [`partition`] -- `PartitionId` and the `Partitioner` naming scheme
//   `<prefix><yyyy><mm><dd>`.
// - [`batch`] -- `Batch<R>`, entries grouped by partition and paired with a
//   shadow value `R` (the raw event) for recovery.
// - [`normalize`] -- Filebeat event decoding and normalization.
//
// # Example
//
// ```rust
// use xlog_core::{Batch, Normalizer, Partitioner};
//
// let normalizer = Normalizer::default();
// let partitioner = Partitioner::new("xlog");
//
// let raw = br#"{"@timestamp":"2024-03-05T10:00:00Z","message":"hello"}"#;
// let entry = normalizer.normalize_bytes(raw).unwrap();
//
// let mut batch: Batch<Vec<u8>> = Batch::new();
// batch.begin();
// batch.accumulate(partitioner.partition_for(entry.timestamp()), entry, raw.to_vec());
// assert_eq!(batch.len(), 1);
// assert_eq!(batch.partitions().next().unwrap().0.as_str(), "xlog20240305");
// ```

pub mod batch;
pub mod entry;
pub mod normalize;
pub mod partition;

pub use batch::{Batch, PartitionSlot};
pub use entry::{LogEntry, TIMESTAMP_FIELD};
pub use normalize::{decode_event, Normalizer, NormalizerConfig};
pub use partition::{PartitionId, Partitioner};
