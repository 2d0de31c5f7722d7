// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The ingestion loop.
//
// Drives source -> normalizer -> store. Each poll yields at most one event;
// well-formed events are normalized and accumulated into a `Batch` keyed by
// partition, with the raw event kept alongside its entry. When the batch
// reaches `batch_size` entries or `batch_window` has elapsed since it began,
// it is committed. A failed commit hands the raw events of every partition
// that was not stored back to the source, then the loop carries on with a
// fresh batch.
//
// The loop is single-threaded and owns its batch. The only blocking call is
// `RecordSource::next`, bounded by the source's poll timeout, so the window
// trigger and shutdown requests are both noticed within one poll timeout.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use xlog_core::{Batch, Normalizer, PartitionId};
use xlog_source::{Polled, RawEvent, RecordSource};
use xlog_store::{commit_batch, CommitReport, PartitionedStore};

use crate::error::IngestError;

/// When to commit the batch being accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Commit once this many entries are buffered.
    pub batch_size: usize,
    /// Commit once the batch is this old, even if small or empty.
    pub batch_window: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            batch_window: Duration::from_secs(10),
        }
    }
}

/// Counters kept over the life of a loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Well-formed events received from the source.
    pub received: u64,
    /// Received events the normalizer rejected.
    pub discarded: u64,
    /// Entries durably committed.
    pub committed: u64,
    /// Raw events handed back to the source after a failed commit.
    pub recovered: u64,
    /// Raw events lost because recovery failed.
    pub dropped: u64,
    /// Non-empty commits that succeeded.
    pub commits: u64,
    /// Commits that failed.
    pub failed_commits: u64,
}

/// Result of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// An entry was added to the batch.
    Accumulated,
    /// An event arrived but was not a log entry.
    Discarded,
    /// The poll timed out or the payload was malformed.
    Idle,
}

/// Result of a commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Committed(CommitReport),
    Recovered {
        /// Partition the failure was attributed to.
        failed: PartitionId,
        /// Raw events re-enqueued.
        recovered: usize,
        /// Raw events whose recovery failed.
        dropped: usize,
    },
}

/// Consumes one [`RecordSource`] into one [`PartitionedStore`].
pub struct IngestLoop<S, P> {
    source: S,
    store: P,
    normalizer: Normalizer,
    config: BatchConfig,
    batch: Batch<RawEvent>,
    stats: IngestStats,
}

impl<S, P> IngestLoop<S, P>
where
    S: RecordSource,
    P: PartitionedStore,
{
    pub fn new(source: S, store: P, normalizer: Normalizer, config: BatchConfig) -> Self {
        let mut batch = Batch::new();
        batch.begin();
        Self {
            source,
            store,
            normalizer,
            config,
            batch,
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Entries waiting for the next commit.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    /// Whether the size or time threshold has been reached.
    pub fn batch_due(&self) -> bool {
        self.batch.len() >= self.config.batch_size || self.batch.age() >= self.config.batch_window
    }

    /// Poll the source once and accumulate the result.
    ///
    /// Only transport failures of the source are errors.
    pub async fn poll_once(&mut self) -> Result<StepOutcome, IngestError> {
        let record = match self.source.next().await? {
            Polled::Record(record) => record,
            Polled::Empty => return Ok(StepOutcome::Idle),
        };
        self.stats.received += 1;

        match self.normalizer.normalize(record.event) {
            Some(entry) => {
                let partition = self.store.partition_for(entry.timestamp());
                self.batch.accumulate(partition, entry, record.raw);
                Ok(StepOutcome::Accumulated)
            }
            None => {
                self.stats.discarded += 1;
                debug!(
                    origin = record.raw.origin(),
                    bytes = record.raw.payload().len(),
                    "event is not a log entry, discarded"
                );
                Ok(StepOutcome::Discarded)
            }
        }
    }

    /// Commit the current batch, recover what was not stored, and begin a
    /// new batch.
    pub async fn flush(&mut self) -> FlushOutcome {
        let outcome = match commit_batch(&self.store, &self.batch).await {
            Ok(report) => {
                if !report.is_empty() {
                    self.stats.commits += 1;
                    self.stats.committed += report.documents as u64;
                    info!(
                        documents = report.documents,
                        partitions = report.partitions.len(),
                        "batch committed"
                    );
                }
                FlushOutcome::Committed(report)
            }
            Err(err) => {
                self.stats.failed_commits += 1;
                let committed: usize = err
                    .committed
                    .iter()
                    .filter_map(|p| self.batch.slot(p))
                    .map(|slot| slot.len())
                    .sum();
                self.stats.committed += committed as u64;

                error!(
                    failed = %err.failed,
                    committed_partitions = err.committed.len(),
                    aborted_partitions = err.aborted.len(),
                    error = %err.source,
                    "commit failed, recovering raw events"
                );

                let failed: Vec<PartitionId> = err.failed_partitions().cloned().collect();
                let raws = self.batch.drain_shadows(&failed);
                let (recovered, dropped) = self.recover_all(raws).await;
                FlushOutcome::Recovered {
                    failed: err.failed,
                    recovered,
                    dropped,
                }
            }
        };

        self.batch.begin();
        outcome
    }

    async fn recover_all(&mut self, raws: Vec<RawEvent>) -> (usize, usize) {
        let (mut recovered, mut dropped) = (0, 0);
        for raw in raws {
            match self.source.recover(&raw).await {
                Ok(()) => recovered += 1,
                Err(e) => {
                    dropped += 1;
                    error!(
                        origin = raw.origin(),
                        bytes = raw.payload().len(),
                        error = %e,
                        "recovery failed, event dropped"
                    );
                }
            }
        }
        self.stats.recovered += recovered as u64;
        self.stats.dropped += dropped as u64;
        if recovered > 0 {
            warn!(recovered, dropped, "raw events re-enqueued for retry");
        }
        (recovered, dropped)
    }

    /// Run until `shutdown` reads `true` or the source fails.
    ///
    /// Shutdown is checked between polls, never during one. On the way out
    /// the pending batch gets one final commit (recovering its events if
    /// that fails) and the source is closed. A source failure also flushes
    /// what was already accumulated before the error is returned.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<IngestStats, IngestError> {
        info!(
            source = self.source.origin(),
            store = self.store.name(),
            batch_size = self.config.batch_size,
            batch_window_ms = self.config.batch_window.as_millis() as u64,
            "ingestion started"
        );
        // Entries accumulated through `poll_once` before the run stay buffered.
        if self.batch.is_empty() {
            self.batch.begin();
        }

        loop {
            if *shutdown.borrow_and_update() {
                info!("shutdown requested, stopping ingestion");
                break;
            }

            if let Err(e) = self.poll_once().await {
                error!(error = %e, pending = self.batch.len(), "source failed, flushing pending batch");
                self.flush().await;
                self.close_source().await;
                return Err(e);
            }

            if self.batch_due() {
                self.flush().await;
            }
        }

        self.flush().await;
        self.close_source().await;

        info!(
            received = self.stats.received,
            discarded = self.stats.discarded,
            committed = self.stats.committed,
            recovered = self.stats.recovered,
            dropped = self.stats.dropped,
            commits = self.stats.commits,
            failed_commits = self.stats.failed_commits,
            "ingestion stopped"
        );
        Ok(self.stats.clone())
    }

    async fn close_source(&mut self) {
        if let Err(e) = self.source.close().await {
            warn!(error = %e, "failed to close source");
        }
    }
}
