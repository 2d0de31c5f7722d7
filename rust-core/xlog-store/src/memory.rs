// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory partitioned store.
//
// Partitions live in a `BTreeMap` behind a tokio `RwLock`; each partition
// keeps its documents ordered by (timestamp, insertion sequence) and one
// value index per indexed field. A commit takes the write lock once, so
// readers see either none or all of it.
//
// Besides serving tests and ephemeral runs, the store can be told to reject
// writes or provisioning for given partitions, and can emulate a sharded
// backend (a hashed shard key on the timestamp field is recorded at
// provisioning time).

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use xlog_core::{LogEntry, PartitionId, Partitioner, TIMESTAMP_FIELD};

use crate::commit::CommitError;
use crate::error::StoreError;
use crate::provision::ProvisionCache;
use crate::store::{
    default_indexed_fields, PartitionMetadata, PartitionWrite, PartitionedStore, ShardKey,
};

/// How far a failed multi-partition write is rolled back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Atomicity {
    /// All partitions of a write commit together or not at all.
    #[default]
    Batch,
    /// Partitions commit one after another in order; a failure keeps the
    /// partitions written before it.
    Partition,
}

/// (timestamp millis, insertion sequence)
type DocKey = (i64, u64);

#[derive(Debug)]
struct MemPartition {
    metadata: PartitionMetadata,
    docs: BTreeMap<DocKey, LogEntry>,
    /// field -> rendered value -> documents
    indexes: BTreeMap<String, BTreeMap<String, BTreeSet<DocKey>>>,
}

impl MemPartition {
    fn new(metadata: PartitionMetadata) -> Self {
        let indexes = metadata
            .indexed_fields
            .iter()
            .map(|f| (f.clone(), BTreeMap::new()))
            .collect();
        Self {
            metadata,
            docs: BTreeMap::new(),
            indexes,
        }
    }

    fn insert(&mut self, key: DocKey, entry: &LogEntry) {
        for (field, index) in self.indexes.iter_mut() {
            if let Some(value) = entry.field_text(field) {
                index.entry(value).or_default().insert(key);
            }
        }
        self.docs.insert(key, entry.clone());
    }
}

#[derive(Debug, Default)]
struct State {
    partitions: BTreeMap<PartitionId, MemPartition>,
    next_seq: u64,
    provision_ops: u64,
    failing_writes: HashSet<PartitionId>,
    failing_provisioning: HashSet<PartitionId>,
}

impl State {
    fn check_writable(&self, partition: &PartitionId) -> Result<(), StoreError> {
        if !self.partitions.contains_key(partition) {
            return Err(StoreError::NotProvisioned(partition.clone()));
        }
        if self.failing_writes.contains(partition) {
            return Err(StoreError::WriteRejected {
                partition: partition.clone(),
                reason: "write failure injected".to_string(),
            });
        }
        Ok(())
    }

    fn apply(&mut self, write: &PartitionWrite<'_>) {
        let State {
            partitions,
            next_seq,
            ..
        } = self;
        if let Some(partition) = partitions.get_mut(write.partition) {
            for entry in write.entries {
                let key = (entry.timestamp().timestamp_millis(), *next_seq);
                *next_seq += 1;
                partition.insert(key, entry);
            }
        }
    }
}

/// A [`PartitionedStore`] held entirely in process memory.
///
/// Clones share state, so a test can keep a handle while the ingestion loop
/// owns another.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    partitioner: Partitioner,
    indexed_fields: Vec<String>,
    shard_key: Option<ShardKey>,
    atomicity: Atomicity,
    provisioned: Arc<ProvisionCache>,
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new(partitioner: Partitioner) -> Self {
        Self {
            partitioner,
            indexed_fields: default_indexed_fields(),
            shard_key: None,
            atomicity: Atomicity::default(),
            provisioned: Arc::new(ProvisionCache::new()),
            state: Arc::new(RwLock::new(State::default())),
        }
    }

    pub fn with_indexed_fields(mut self, fields: Vec<String>) -> Self {
        self.indexed_fields = fields;
        self
    }

    /// Record a hashed shard key on the timestamp field for new partitions.
    pub fn sharded(mut self) -> Self {
        self.shard_key = Some(ShardKey::hashed(TIMESTAMP_FIELD));
        self
    }

    pub fn with_atomicity(mut self, atomicity: Atomicity) -> Self {
        self.atomicity = atomicity;
        self
    }

    /// Reject every subsequent write to `partition`.
    pub async fn fail_writes_to(&self, partition: &PartitionId) {
        self.state.write().await.failing_writes.insert(partition.clone());
    }

    /// Reject provisioning of `partition`.
    pub async fn fail_provisioning_of(&self, partition: &PartitionId) {
        self.state
            .write()
            .await
            .failing_provisioning
            .insert(partition.clone());
    }

    /// Undo injected failures for `partition`.
    pub async fn heal(&self, partition: &PartitionId) {
        let mut state = self.state.write().await;
        state.failing_writes.remove(partition);
        state.failing_provisioning.remove(partition);
    }

    /// Number of times a partition was actually created.
    pub async fn provision_count(&self) -> u64 {
        self.state.read().await.provision_ops
    }

    /// Documents across all partitions.
    pub async fn total_documents(&self) -> usize {
        self.state
            .read()
            .await
            .partitions
            .values()
            .map(|p| p.docs.len())
            .sum()
    }
}

#[async_trait]
impl PartitionedStore for InMemoryStore {
    fn partitioner(&self) -> &Partitioner {
        &self.partitioner
    }

    fn indexed_fields(&self) -> &[String] {
        &self.indexed_fields
    }

    async fn ensure_provisioned(&self, partition: &PartitionId) -> Result<(), StoreError> {
        if self.provisioned.contains(partition).await {
            return Ok(());
        }

        let mut state = self.state.write().await;
        if state.failing_provisioning.contains(partition) {
            return Err(StoreError::Provisioning {
                partition: partition.clone(),
                reason: "provisioning failure injected".to_string(),
            });
        }
        if !state.partitions.contains_key(partition) {
            let metadata = PartitionMetadata {
                partition: partition.clone(),
                indexed_fields: self.indexed_fields.clone(),
                shard_key: self.shard_key.clone(),
                provisioned_at: Utc::now(),
            };
            state
                .partitions
                .insert(partition.clone(), MemPartition::new(metadata));
            state.provision_ops += 1;
            info!(
                partition = %partition,
                indexes = self.indexed_fields.len(),
                sharded = self.shard_key.is_some(),
                "provisioned partition"
            );
        }
        drop(state);

        self.provisioned.insert(partition.clone()).await;
        Ok(())
    }

    async fn write_partitions(&self, writes: &[PartitionWrite<'_>]) -> Result<(), CommitError> {
        let mut state = self.state.write().await;

        match self.atomicity {
            Atomicity::Batch => {
                for write in writes {
                    if let Err(e) = state.check_writable(write.partition) {
                        return Err(CommitError::nothing_written(
                            write.partition,
                            writes.iter().map(|w| w.partition),
                            e,
                        ));
                    }
                }
                for write in writes {
                    state.apply(write);
                }
            }
            Atomicity::Partition => {
                for (i, write) in writes.iter().enumerate() {
                    if let Err(e) = state.check_writable(write.partition) {
                        return Err(CommitError {
                            failed: write.partition.clone(),
                            committed: writes[..i].iter().map(|w| w.partition.clone()).collect(),
                            aborted: writes[i + 1..]
                                .iter()
                                .map(|w| w.partition.clone())
                                .collect(),
                            source: e,
                        });
                    }
                    state.apply(write);
                }
            }
        }

        debug!(partitions = writes.len(), "in-memory write applied");
        Ok(())
    }

    async fn partition_metadata(
        &self,
        partition: &PartitionId,
    ) -> Result<Option<PartitionMetadata>, StoreError> {
        let state = self.state.read().await;
        Ok(state.partitions.get(partition).map(|p| p.metadata.clone()))
    }

    async fn list_partitions(&self) -> Result<Vec<PartitionId>, StoreError> {
        let state = self.state.read().await;
        Ok(state.partitions.keys().cloned().collect())
    }

    async fn count(&self, partition: &PartitionId) -> Result<u64, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .partitions
            .get(partition)
            .map_or(0, |p| p.docs.len() as u64))
    }

    async fn scan(&self, partition: &PartitionId, limit: usize) -> Result<Vec<LogEntry>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .partitions
            .get(partition)
            .map(|p| p.docs.values().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_by_field(
        &self,
        partition: &PartitionId,
        field: &str,
        value: &str,
        limit: usize,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let state = self.state.read().await;
        let Some(p) = state.partitions.get(partition) else {
            return Ok(Vec::new());
        };
        let index = p.indexes.get(field).ok_or_else(|| StoreError::NotIndexed {
            partition: partition.clone(),
            field: field.to_string(),
        })?;

        Ok(index
            .get(value)
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| p.docs.get(k))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
