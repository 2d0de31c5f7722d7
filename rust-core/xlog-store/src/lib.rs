// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// xlog partitioned storage
//
// Log entries are stored in one partition per calendar day. This crate
// defines the `PartitionedStore` contract the ingestion loop commits
// through, the batch commit protocol on top of it, and the backends.
//
// # Modules
//
// - [`store`] -- The `PartitionedStore` trait, partition metadata and the
//   per-partition write unit.
// - [`commit`] -- `commit_batch` and the attributed `CommitError`.
// - [`error`] -- The `StoreError` enum covering single-operation failures.
// - [`provision`] -- Process-lifetime cache of provisioned partitions.
// - [`memory`] -- An in-memory store for tests and ephemeral runs, with
//   failure injection.
// - [`metrics`] -- A transparent wrapper that collects write statistics.
// - `redb_store` -- A persistent single-file store (feature `redb-backend`).
//
// # Example
//
// ```rust
// use xlog_core::{Batch, Normalizer, Partitioner};
// use xlog_store::{commit_batch, InMemoryStore, MetricsStore, PartitionedStore};
//
// # tokio_test::block_on(async {
// let store = MetricsStore::new(InMemoryStore::new(Partitioner::new("xlog")));
//
// let entry = Normalizer::default()
//     .normalize_bytes(br#"{"@timestamp":"2024-03-05T10:00:00Z","message":"hi"}"#)
//     .unwrap();
// let mut batch = Batch::new();
// batch.accumulate(store.partition_for(entry.timestamp()), entry, ());
//
// let report = commit_batch(&store, &batch).await.unwrap();
// assert_eq!(report.documents, 1);
// assert_eq!(store.stats().await.provision_calls, 1);
// # });
// ```

pub mod commit;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod provision;
pub mod store;

// Optional persistent backend, feature-gated to keep the default build lean.
#[cfg(feature = "redb-backend")]
pub mod redb_store;

pub use commit::{commit_batch, CommitError, CommitReport};
pub use error::StoreError;
pub use memory::{Atomicity, InMemoryStore};
pub use metrics::{MetricsStore, StoreStats};
pub use provision::ProvisionCache;
pub use store::{
    default_indexed_fields, PartitionMetadata, PartitionWrite, PartitionedStore, ShardKey,
    DEFAULT_INDEXED_FIELDS,
};

#[cfg(feature = "redb-backend")]
pub use redb_store::RedbStore;
