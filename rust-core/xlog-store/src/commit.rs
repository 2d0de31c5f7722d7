// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch commit protocol.
//
// `commit_batch` takes a `Batch` accumulated by the caller and writes every
// non-empty partition in it: first it provisions each partition (a no-op for
// partitions already seen by this process), then it hands all partitions to
// the store in one `write_partitions` call. Failures come back as a
// `CommitError` that splits the batch's partitions into committed, failed
// and aborted, so the caller can recover exactly the events that were not
// stored.

use thiserror::Error;
use tracing::{debug, warn};
use xlog_core::{Batch, PartitionId};

use crate::error::StoreError;
use crate::store::{PartitionWrite, PartitionedStore};

/// A failed commit, attributed to the partition where it failed.
#[derive(Debug, Error)]
#[error("commit failed at partition {failed}: {source}")]
pub struct CommitError {
    /// The partition whose provisioning or write failed.
    pub failed: PartitionId,
    /// Partitions whose entries are durably stored.
    pub committed: Vec<PartitionId>,
    /// Partitions rolled back or never attempted because of the failure.
    pub aborted: Vec<PartitionId>,
    #[source]
    pub source: StoreError,
}

impl CommitError {
    /// A failure that left nothing written: `failed` is blamed and every
    /// other partition in `partitions` is aborted.
    pub fn nothing_written<'a, I>(failed: &PartitionId, partitions: I, source: StoreError) -> Self
    where
        I: IntoIterator<Item = &'a PartitionId>,
    {
        Self {
            failed: failed.clone(),
            committed: Vec::new(),
            aborted: partitions.into_iter().filter(|p| *p != failed).cloned().collect(),
            source,
        }
    }

    /// Partitions whose entries were not stored: the failed one first, then
    /// the aborted ones.
    pub fn failed_partitions(&self) -> impl Iterator<Item = &PartitionId> {
        std::iter::once(&self.failed).chain(self.aborted.iter())
    }

    pub fn into_store_error(self) -> StoreError {
        self.source
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Each written partition with its document count, in partition order.
    pub partitions: Vec<(PartitionId, usize)>,
    /// Total documents written.
    pub documents: usize,
}

impl CommitReport {
    pub fn is_empty(&self) -> bool {
        self.documents == 0
    }
}

/// Commit every buffered partition of `batch` to `store`.
///
/// An empty batch succeeds without touching the store. The batch itself is
/// left untouched; clearing it or draining its shadows for recovery is the
/// caller's decision.
pub async fn commit_batch<S, R>(store: &S, batch: &Batch<R>) -> Result<CommitReport, CommitError>
where
    S: PartitionedStore + ?Sized,
    R: Sync,
{
    if batch.is_empty() {
        debug!(store = store.name(), "empty batch, nothing to commit");
        return Ok(CommitReport::default());
    }

    let writes: Vec<PartitionWrite<'_>> = batch
        .partitions()
        .map(|(partition, entries)| PartitionWrite { partition, entries })
        .collect();

    for write in &writes {
        if let Err(e) = store.ensure_provisioned(write.partition).await {
            warn!(partition = %write.partition, error = %e, "provisioning failed, batch not written");
            return Err(CommitError::nothing_written(
                write.partition,
                writes.iter().map(|w| w.partition),
                e,
            ));
        }
    }

    store.write_partitions(&writes).await?;

    let partitions: Vec<(PartitionId, usize)> = writes
        .iter()
        .map(|w| (w.partition.clone(), w.entries.len()))
        .collect();
    let documents = batch.len();

    debug!(
        store = store.name(),
        partitions = partitions.len(),
        documents,
        "batch committed"
    );

    Ok(CommitReport {
        partitions,
        documents,
    })
}
