// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metrics-collecting wrapper for partitioned stores.
//
// Wraps any `PartitionedStore` and counts provisioning calls, commits,
// documents written and failures, plus the cumulative commit latency.
// Read operations are delegated untouched.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::RwLock;
use xlog_core::{LogEntry, PartitionId, Partitioner};

use crate::commit::CommitError;
use crate::error::StoreError;
use crate::store::{PartitionMetadata, PartitionWrite, PartitionedStore};

/// Accumulated statistics for a store.
///
/// All counters are monotonically increasing for the lifetime of the
/// [`MetricsStore`] that owns them, until [`MetricsStore::reset_stats`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStats {
    /// Calls to `ensure_provisioned`, cached or not.
    pub provision_calls: u64,
    /// `ensure_provisioned` calls that failed.
    pub provision_failures: u64,
    /// Successful `write_partitions` calls.
    pub commits: u64,
    /// Failed `write_partitions` calls.
    pub failed_commits: u64,
    /// Partitions written by successful commits, or committed before a
    /// failure.
    pub partitions_written: u64,
    /// Documents durably written.
    pub documents_written: u64,
    /// Cumulative wall-clock latency of all `write_partitions` calls, in
    /// milliseconds.
    pub commit_latency_sum_ms: f64,
}

/// A store wrapper that collects write-path metrics.
pub struct MetricsStore<S: PartitionedStore> {
    inner: S,
    stats: Arc<RwLock<StoreStats>>,
}

impl<S: PartitionedStore> MetricsStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            stats: Arc::new(RwLock::new(StoreStats::default())),
        }
    }

    /// Return a snapshot of the current statistics.
    pub async fn stats(&self) -> StoreStats {
        self.stats.read().await.clone()
    }

    pub async fn reset_stats(&self) {
        *self.stats.write().await = StoreStats::default();
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

/// Clones share the statistics accumulator.
impl<S: PartitionedStore + Clone> Clone for MetricsStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}

#[async_trait]
impl<S: PartitionedStore> PartitionedStore for MetricsStore<S> {
    fn partitioner(&self) -> &Partitioner {
        self.inner.partitioner()
    }

    fn indexed_fields(&self) -> &[String] {
        self.inner.indexed_fields()
    }

    async fn ensure_provisioned(&self, partition: &PartitionId) -> Result<(), StoreError> {
        let result = self.inner.ensure_provisioned(partition).await;

        let mut s = self.stats.write().await;
        s.provision_calls += 1;
        if result.is_err() {
            s.provision_failures += 1;
        }

        result
    }

    async fn write_partitions(&self, writes: &[PartitionWrite<'_>]) -> Result<(), CommitError> {
        let start = Instant::now();
        let result = self.inner.write_partitions(writes).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let mut s = self.stats.write().await;
        s.commit_latency_sum_ms += elapsed_ms;
        match &result {
            Ok(()) => {
                s.commits += 1;
                s.partitions_written += writes.len() as u64;
                s.documents_written += writes.iter().map(|w| w.entries.len() as u64).sum::<u64>();
            }
            Err(e) => {
                s.failed_commits += 1;
                let committed = writes.iter().filter(|w| e.committed.contains(w.partition));
                for w in committed {
                    s.partitions_written += 1;
                    s.documents_written += w.entries.len() as u64;
                }
            }
        }

        result
    }

    async fn partition_metadata(
        &self,
        partition: &PartitionId,
    ) -> Result<Option<PartitionMetadata>, StoreError> {
        self.inner.partition_metadata(partition).await
    }

    async fn list_partitions(&self) -> Result<Vec<PartitionId>, StoreError> {
        self.inner.list_partitions().await
    }

    async fn count(&self, partition: &PartitionId) -> Result<u64, StoreError> {
        self.inner.count(partition).await
    }

    async fn scan(&self, partition: &PartitionId, limit: usize) -> Result<Vec<LogEntry>, StoreError> {
        self.inner.scan(partition, limit).await
    }

    async fn find_by_field(
        &self,
        partition: &PartitionId,
        field: &str,
        value: &str,
        limit: usize,
    ) -> Result<Vec<LogEntry>, StoreError> {
        self.inner.find_by_field(partition, field, value, limit).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
