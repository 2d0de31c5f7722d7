// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core partitioned store trait.
//
// A partitioned store keeps one logical collection per calendar day. Every
// implementation maps timestamps to partitions through a `Partitioner`,
// provisions a partition's indexes (and shard key, where supported) before
// its first write, and applies multi-partition writes as a unit that either
// commits or is attributed to the partition that failed.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use xlog_core::{LogEntry, PartitionId, Partitioner};

use crate::commit::CommitError;
use crate::error::StoreError;

/// Fields indexed in every partition unless configured otherwise.
pub const DEFAULT_INDEXED_FIELDS: &[&str] = &["timestamp", "hostname", "source"];

/// The entries bound for one partition in a multi-partition write.
#[derive(Debug, Clone, Copy)]
pub struct PartitionWrite<'a> {
    pub partition: &'a PartitionId,
    pub entries: &'a [LogEntry],
}

/// How documents of a partition are distributed across shards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardKey {
    pub field: String,
    pub hashed: bool,
}

impl ShardKey {
    /// A hashed shard key on `field`.
    pub fn hashed(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            hashed: true,
        }
    }
}

/// Provisioning state recorded for a partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionMetadata {
    pub partition: PartitionId,
    /// Fields with a lookup index, in the order they were created.
    pub indexed_fields: Vec<String>,
    /// `None` on backends without sharding.
    pub shard_key: Option<ShardKey>,
    pub provisioned_at: DateTime<Utc>,
}

/// A day-partitioned document store.
///
/// Implementations must be safe to share between the ingestion loop and
/// read-side tasks; reads may run concurrently with a commit and never
/// observe part of it.
#[async_trait]
pub trait PartitionedStore: Send + Sync {
    /// The naming scheme this store partitions by.
    fn partitioner(&self) -> &Partitioner;

    /// The partition holding entries stamped `timestamp`.
    fn partition_for(&self, timestamp: DateTime<Utc>) -> PartitionId {
        self.partitioner().partition_for(timestamp)
    }

    /// Fields indexed in newly provisioned partitions.
    fn indexed_fields(&self) -> &[String];

    /// Establish the indexes and shard key of `partition`.
    ///
    /// Idempotent. After the first success in a process, further calls for
    /// the same partition return without touching the backend.
    async fn ensure_provisioned(&self, partition: &PartitionId) -> Result<(), StoreError>;

    /// Apply `writes` as one multi-document insert per partition.
    ///
    /// Every partition must already be provisioned. On failure the error
    /// names the partition that failed and which partitions, if any, did
    /// commit.
    async fn write_partitions(&self, writes: &[PartitionWrite<'_>]) -> Result<(), CommitError>;

    /// Write a single entry to its partition, provisioning it if needed.
    async fn insert_one(&self, entry: &LogEntry) -> Result<PartitionId, StoreError> {
        let partition = self.partition_for(entry.timestamp());
        self.ensure_provisioned(&partition).await?;
        let write = PartitionWrite {
            partition: &partition,
            entries: std::slice::from_ref(entry),
        };
        self.write_partitions(&[write])
            .await
            .map_err(CommitError::into_store_error)?;
        Ok(partition)
    }

    /// Provisioning state of `partition`, or `None` if it does not exist.
    async fn partition_metadata(
        &self,
        partition: &PartitionId,
    ) -> Result<Option<PartitionMetadata>, StoreError>;

    /// All existing partitions in name order.
    async fn list_partitions(&self) -> Result<Vec<PartitionId>, StoreError>;

    /// Existing partitions covering the inclusive date range.
    async fn partitions_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PartitionId>, StoreError> {
        let existing = self.list_partitions().await?;
        Ok(self
            .partitioner()
            .partitions_between(start, end)
            .into_iter()
            .filter(|p| existing.binary_search(p).is_ok())
            .collect())
    }

    /// Number of documents in `partition`; zero if it does not exist.
    async fn count(&self, partition: &PartitionId) -> Result<u64, StoreError>;

    /// Up to `limit` documents of `partition` in timestamp order.
    async fn scan(&self, partition: &PartitionId, limit: usize) -> Result<Vec<LogEntry>, StoreError>;

    /// Up to `limit` documents whose `field` renders as `value`, in
    /// timestamp order, served from the field's index.
    ///
    /// Fails with [`StoreError::NotIndexed`] if the partition has no index
    /// on `field`.
    async fn find_by_field(
        &self,
        partition: &PartitionId,
        field: &str,
        value: &str,
        limit: usize,
    ) -> Result<Vec<LogEntry>, StoreError>;

    /// A human-readable name for this store, used in logging and metrics.
    fn name(&self) -> &str;
}

/// Owned copy of the default indexed field list.
pub fn default_indexed_fields() -> Vec<String> {
    DEFAULT_INDEXED_FIELDS.iter().map(|f| f.to_string()).collect()
}
