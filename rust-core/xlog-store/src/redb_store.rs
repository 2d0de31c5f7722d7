// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// redb-backed partitioned store.
//
// Uses redb (pure Rust, B-tree, ACID, single-file database) for durable
// day-partitioned storage.
//
// # Design
//
// - `_partitions` maps a partition name to its JSON `PartitionMetadata`.
//   A partition exists once it has a row here.
// - Each partition is a table named after it. Keys are the entry timestamp
//   (8 bytes, big-endian, sign bit flipped so earlier sorts first) followed
//   by a random 16-byte UUID; values are the JSON-serialized `LogEntry`.
// - Each indexed field has a table `{partition}#{field}` whose keys are
//   `value || 0x00 || doc key` with empty values. Lookups range-scan from
//   `value || 0x00`.
// - A `write_partitions` call is one write transaction covering every
//   partition, so it commits entirely or not at all. redb has no sharding;
//   the recorded shard key is always `None`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition, TableError,
    WriteTransaction,
};
use tracing::{debug, info};
use xlog_core::{LogEntry, PartitionId, Partitioner};

use crate::commit::CommitError;
use crate::error::StoreError;
use crate::provision::ProvisionCache;
use crate::store::{default_indexed_fields, PartitionMetadata, PartitionWrite, PartitionedStore};

/// Partition name -> JSON `PartitionMetadata`.
const PARTITIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("_partitions");

/// Length of a document key: timestamp (8) + uuid (16).
const DOC_KEY_LEN: usize = 24;

fn doc_key(entry: &LogEntry) -> [u8; DOC_KEY_LEN] {
    let millis = entry.timestamp().timestamp_millis() as u64 ^ (1 << 63);
    let mut key = [0u8; DOC_KEY_LEN];
    key[..8].copy_from_slice(&millis.to_be_bytes());
    key[8..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
    key
}

fn index_prefix(value: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(value.len() + 1);
    prefix.extend_from_slice(value.as_bytes());
    prefix.push(0);
    prefix
}

fn index_key(value: &str, doc_key: &[u8]) -> Vec<u8> {
    let mut key = index_prefix(value);
    key.extend_from_slice(doc_key);
    key
}

fn index_table_name(partition: &PartitionId, field: &str) -> String {
    format!("{partition}#{field}")
}

fn unavailable(context: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::BackendUnavailable(format!("{context}: {e}"))
}

/// A commit the backend refused leaves nothing written; it is not corruption.
fn commit_failed(e: redb::CommitError) -> StoreError {
    unavailable("commit", e)
}

fn corrupted(context: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::CorruptedData(format!("{context}: {e}"))
}

fn decode_metadata(bytes: &[u8]) -> Result<PartitionMetadata, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| corrupted("partition metadata", e))
}

fn decode_entry(bytes: &[u8]) -> Result<LogEntry, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| corrupted("document", e))
}

/// Insert `entries` into `partition` and its indexes within `txn`.
fn write_partition(
    txn: &WriteTransaction,
    partition: &PartitionId,
    entries: &[LogEntry],
) -> Result<(), StoreError> {
    let metadata = {
        let meta = txn
            .open_table(PARTITIONS)
            .map_err(|e| unavailable("open partitions", e))?;
        let row = meta
            .get(partition.as_str())
            .map_err(|e| corrupted("read partition metadata", e))?;
        match row {
            Some(bytes) => decode_metadata(bytes.value())?,
            None => return Err(StoreError::NotProvisioned(partition.clone())),
        }
    };

    let doc_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(partition.as_str());
    let mut docs = txn
        .open_table(doc_def)
        .map_err(|e| unavailable("open partition", e))?;

    let index_names: Vec<String> = metadata
        .indexed_fields
        .iter()
        .map(|f| index_table_name(partition, f))
        .collect();
    let mut indexes = Vec::with_capacity(index_names.len());
    for (field, name) in metadata.indexed_fields.iter().zip(&index_names) {
        let def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(name);
        let table = txn
            .open_table(def)
            .map_err(|e| unavailable("open index", e))?;
        indexes.push((field, table));
    }

    for entry in entries {
        let key = doc_key(entry);
        let doc = serde_json::to_vec(entry)?;
        docs.insert(key.as_slice(), doc.as_slice())
            .map_err(|e| StoreError::WriteRejected {
                partition: partition.clone(),
                reason: e.to_string(),
            })?;

        for (field, table) in indexes.iter_mut() {
            if let Some(value) = entry.field_text(field.as_str()) {
                table
                    .insert(index_key(&value, &key).as_slice(), b"".as_slice())
                    .map_err(|e| StoreError::WriteRejected {
                        partition: partition.clone(),
                        reason: format!("index {field}: {e}"),
                    })?;
            }
        }
    }
    Ok(())
}

/// A persistent [`PartitionedStore`] in a single redb file.
///
/// Clones share the database handle and the provisioning cache.
///
/// # Example
///
/// ```rust,no_run
/// use xlog_core::Partitioner;
/// use xlog_store::{PartitionedStore, RedbStore};
///
/// let store = RedbStore::open("/tmp/xlog.redb", Partitioner::new("xlog")).unwrap();
/// assert_eq!(store.name(), "redb");
/// ```
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
    path: PathBuf,
    partitioner: Partitioner,
    indexed_fields: Vec<String>,
    provisioned: Arc<ProvisionCache>,
}

impl RedbStore {
    /// Open or create a store at `path`.
    pub fn open(path: impl AsRef<Path>, partitioner: Partitioner) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(&path).map_err(|e| {
            unavailable(&format!("failed to open redb at {}", path.display()), e)
        })?;

        debug!(path = %path.display(), "opened redb store");

        Ok(Self {
            db: Arc::new(db),
            path,
            partitioner,
            indexed_fields: default_indexed_fields(),
            provisioned: Arc::new(ProvisionCache::new()),
        })
    }

    /// Fields indexed in partitions provisioned from now on. Existing
    /// partitions keep the fields they were provisioned with.
    pub fn with_indexed_fields(mut self, fields: Vec<String>) -> Self {
        self.indexed_fields = fields;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the database file in bytes, if it can be read.
    pub fn approximate_size(&self) -> Option<u64> {
        std::fs::metadata(&self.path).ok().map(|m| m.len())
    }
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .field("partitioner", &self.partitioner)
            .finish()
    }
}

#[async_trait]
impl PartitionedStore for RedbStore {
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

        let db = Arc::clone(&self.db);
        let owned = partition.clone();
        let fields = self.indexed_fields.clone();

        let created = tokio::task::spawn_blocking(move || -> Result<bool, StoreError> {
            let provisioning = |e: &dyn std::fmt::Display| StoreError::Provisioning {
                partition: owned.clone(),
                reason: e.to_string(),
            };

            let txn = db.begin_write().map_err(|e| unavailable("write txn", e))?;
            {
                let mut meta = txn.open_table(PARTITIONS).map_err(|e| provisioning(&e))?;
                let exists = meta
                    .get(owned.as_str())
                    .map_err(|e| provisioning(&e))?
                    .is_some();
                if exists {
                    drop(meta);
                    txn.abort().map_err(|e| unavailable("abort", e))?;
                    return Ok(false);
                }

                let doc_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(owned.as_str());
                txn.open_table(doc_def).map_err(|e| provisioning(&e))?;
                for field in &fields {
                    let name = index_table_name(&owned, field);
                    let def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&name);
                    txn.open_table(def).map_err(|e| provisioning(&e))?;
                }

                let metadata = PartitionMetadata {
                    partition: owned.clone(),
                    indexed_fields: fields.clone(),
                    shard_key: None,
                    provisioned_at: Utc::now(),
                };
                let bytes = serde_json::to_vec(&metadata)?;
                meta.insert(owned.as_str(), bytes.as_slice())
                    .map_err(|e| provisioning(&e))?;
            }
            txn.commit().map_err(|e| provisioning(&e))?;
            Ok(true)
        })
        .await
        .map_err(|e| unavailable("task join", e))??;

        if created {
            info!(
                partition = %partition,
                indexes = self.indexed_fields.len(),
                "provisioned partition"
            );
        }
        self.provisioned.insert(partition.clone()).await;
        Ok(())
    }

    async fn write_partitions(&self, writes: &[PartitionWrite<'_>]) -> Result<(), CommitError> {
        let Some(first) = writes.first() else {
            return Ok(());
        };
        let first = first.partition.clone();
        let partitions: Vec<PartitionId> = writes.iter().map(|w| w.partition.clone()).collect();
        let owned: Vec<(PartitionId, Vec<LogEntry>)> = writes
            .iter()
            .map(|w| (w.partition.clone(), w.entries.to_vec()))
            .collect();
        let db = Arc::clone(&self.db);

        let result = tokio::task::spawn_blocking(move || -> Result<(), (Option<PartitionId>, StoreError)> {
            let txn = db
                .begin_write()
                .map_err(|e| (None, unavailable("write txn", e)))?;
            for (partition, entries) in &owned {
                // Returning drops `txn` uncommitted, which rolls back every
                // partition written so far.
                write_partition(&txn, partition, entries)
                    .map_err(|e| (Some(partition.clone()), e))?;
            }
            txn.commit().map_err(|e| (None, commit_failed(e)))?;
            Ok(())
        })
        .await
        .map_err(|e| (None, unavailable("task join", e)))
        .and_then(|r| r);

        result.map_err(|(failed, source)| {
            let failed = failed.unwrap_or(first);
            CommitError::nothing_written(&failed, partitions.iter(), source)
        })
    }

    async fn partition_metadata(
        &self,
        partition: &PartitionId,
    ) -> Result<Option<PartitionMetadata>, StoreError> {
        let db = Arc::clone(&self.db);
        let partition = partition.clone();

        tokio::task::spawn_blocking(move || -> Result<Option<PartitionMetadata>, StoreError> {
            let txn = db.begin_read().map_err(|e| unavailable("read txn", e))?;
            let meta = match txn.open_table(PARTITIONS) {
                Ok(t) => t,
                Err(TableError::TableDoesNotExist(_)) => return Ok(None),
                Err(e) => return Err(unavailable("open partitions", e)),
            };
            let row = meta
                .get(partition.as_str())
                .map_err(|e| corrupted("read partition metadata", e))?;
            row.map(|bytes| decode_metadata(bytes.value())).transpose()
        })
        .await
        .map_err(|e| unavailable("task join", e))?
    }

    async fn list_partitions(&self) -> Result<Vec<PartitionId>, StoreError> {
        let db = Arc::clone(&self.db);

        tokio::task::spawn_blocking(move || -> Result<Vec<PartitionId>, StoreError> {
            let txn = db.begin_read().map_err(|e| unavailable("read txn", e))?;
            let meta = match txn.open_table(PARTITIONS) {
                Ok(t) => t,
                Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
                Err(e) => return Err(unavailable("open partitions", e)),
            };
            let mut partitions = Vec::new();
            for row in meta.iter().map_err(|e| corrupted("list partitions", e))? {
                let (name, _) = row.map_err(|e| corrupted("partition row", e))?;
                partitions.push(PartitionId::new(name.value()));
            }
            Ok(partitions)
        })
        .await
        .map_err(|e| unavailable("task join", e))?
    }

    async fn count(&self, partition: &PartitionId) -> Result<u64, StoreError> {
        let db = Arc::clone(&self.db);
        let partition = partition.clone();

        tokio::task::spawn_blocking(move || -> Result<u64, StoreError> {
            let txn = db.begin_read().map_err(|e| unavailable("read txn", e))?;
            let def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(partition.as_str());
            let docs = match txn.open_table(def) {
                Ok(t) => t,
                Err(TableError::TableDoesNotExist(_)) => return Ok(0),
                Err(e) => return Err(unavailable("open partition", e)),
            };
            docs.len().map_err(|e| corrupted("count", e))
        })
        .await
        .map_err(|e| unavailable("task join", e))?
    }

    async fn scan(&self, partition: &PartitionId, limit: usize) -> Result<Vec<LogEntry>, StoreError> {
        let db = Arc::clone(&self.db);
        let partition = partition.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<LogEntry>, StoreError> {
            let txn = db.begin_read().map_err(|e| unavailable("read txn", e))?;
            let def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(partition.as_str());
            let docs = match txn.open_table(def) {
                Ok(t) => t,
                Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
                Err(e) => return Err(unavailable("open partition", e)),
            };

            let mut results = Vec::new();
            for row in docs.iter().map_err(|e| corrupted("scan", e))?.take(limit) {
                let (_, doc) = row.map_err(|e| corrupted("scan entry", e))?;
                results.push(decode_entry(doc.value())?);
            }
            Ok(results)
        })
        .await
        .map_err(|e| unavailable("task join", e))?
    }

    async fn find_by_field(
        &self,
        partition: &PartitionId,
        field: &str,
        value: &str,
        limit: usize,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let Some(metadata) = self.partition_metadata(partition).await? else {
            return Ok(Vec::new());
        };
        if !metadata.indexed_fields.iter().any(|f| f == field) {
            return Err(StoreError::NotIndexed {
                partition: partition.clone(),
                field: field.to_string(),
            });
        }

        let db = Arc::clone(&self.db);
        let partition = partition.clone();
        let index_name = index_table_name(&partition, field);
        let prefix = index_prefix(value);

        tokio::task::spawn_blocking(move || -> Result<Vec<LogEntry>, StoreError> {
            let txn = db.begin_read().map_err(|e| unavailable("read txn", e))?;
            let index_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&index_name);
            let doc_def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(partition.as_str());
            let (index, docs) = match (txn.open_table(index_def), txn.open_table(doc_def)) {
                (Ok(i), Ok(d)) => (i, d),
                (Err(TableError::TableDoesNotExist(_)), _)
                | (_, Err(TableError::TableDoesNotExist(_))) => return Ok(Vec::new()),
                (Err(e), _) | (_, Err(e)) => return Err(unavailable("open index", e)),
            };

            let mut results = Vec::new();
            let iter = index
                .range(prefix.as_slice()..)
                .map_err(|e| corrupted("index range", e))?;
            for row in iter {
                if results.len() >= limit {
                    break;
                }
                let (key, _) = row.map_err(|e| corrupted("index entry", e))?;
                let key = key.value();
                if !key.starts_with(&prefix) {
                    break;
                }
                // A longer key is a different value that merely starts with
                // `value\0`.
                if key.len() != prefix.len() + DOC_KEY_LEN {
                    continue;
                }
                let doc_key = &key[prefix.len()..];
                match docs.get(doc_key).map_err(|e| corrupted("index target", e))? {
                    Some(doc) => results.push(decode_entry(doc.value())?),
                    None => return Err(corrupted("index target", "dangling index entry")),
                }
            }
            Ok(results)
        })
        .await
        .map_err(|e| unavailable("task join", e))?
    }

    fn name(&self) -> &str {
        "redb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Map, Value};
    use tempfile::tempdir;

    use crate::commit::commit_batch;
    use xlog_core::Batch;

    fn temp_store() -> (RedbStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("xlog.redb"), Partitioner::new("xlog")).unwrap();
        (store, dir)
    }

    fn entry(day: u32, hour: u32, host: &str) -> LogEntry {
        let mut fields = Map::new();
        fields.insert("hostname".to_string(), Value::String(host.to_string()));
        fields.insert("message".to_string(), json!(format!("at {hour}")));
        LogEntry::new(Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap(), fields)
    }

    #[tokio::test]
    async fn test_insert_one_round_trips() {
        let (store, _dir) = temp_store();
        let original = entry(5, 10, "web-1");

        let p = store.insert_one(&original).await.unwrap();
        assert_eq!(p.as_str(), "xlog20240305");
        assert_eq!(store.count(&p).await.unwrap(), 1);
        assert_eq!(store.scan(&p, 10).await.unwrap(), vec![original]);
    }

    #[tokio::test]
    async fn test_provisioning_is_idempotent_and_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("xlog.redb");
        let p = PartitionId::new("xlog20240305");

        let first = {
            let store = RedbStore::open(&path, Partitioner::new("xlog")).unwrap();
            store.ensure_provisioned(&p).await.unwrap();
            store.ensure_provisioned(&p).await.unwrap();
            store.partition_metadata(&p).await.unwrap().unwrap()
        };

        // A fresh process re-runs provisioning; the recorded state is kept.
        let store = RedbStore::open(&path, Partitioner::new("xlog")).unwrap();
        store.ensure_provisioned(&p).await.unwrap();
        let again = store.partition_metadata(&p).await.unwrap().unwrap();

        assert_eq!(first, again);
        assert_eq!(again.indexed_fields, default_indexed_fields());
        assert_eq!(again.shard_key, None);
        assert_eq!(store.list_partitions().await.unwrap(), vec![p]);
    }

    #[tokio::test]
    async fn test_unprovisioned_write_rolls_back_everything() {
        let (store, _dir) = temp_store();
        let p5 = PartitionId::new("xlog20240305");
        let p6 = PartitionId::new("xlog20240306");
        store.ensure_provisioned(&p5).await.unwrap();

        let (e5, e6) = ([entry(5, 1, "a")], [entry(6, 1, "a")]);
        let err = store
            .write_partitions(&[
                PartitionWrite { partition: &p5, entries: &e5 },
                PartitionWrite { partition: &p6, entries: &e6 },
            ])
            .await
            .unwrap_err();

        assert_eq!(err.failed, p6);
        assert_eq!(err.aborted, vec![p5.clone()]);
        assert!(matches!(err.source, StoreError::NotProvisioned(_)));
        assert_eq!(store.count(&p5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_commit_batch_and_scan_in_time_order() {
        let (store, _dir) = temp_store();
        let mut batch = Batch::new();
        for (day, hour) in [(5, 9), (6, 1), (5, 3)] {
            let e = entry(day, hour, "web-1");
            batch.accumulate(store.partition_for(e.timestamp()), e, ());
        }

        let report = commit_batch(&store, &batch).await.unwrap();
        assert_eq!(report.documents, 3);

        let p5 = PartitionId::new("xlog20240305");
        let messages: Vec<String> = store
            .scan(&p5, 10)
            .await
            .unwrap()
            .iter()
            .filter_map(|e| e.field_text("message"))
            .collect();
        assert_eq!(messages, vec!["at 3", "at 9"]);
        assert_eq!(store.list_partitions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_find_by_field_uses_index() {
        let (store, _dir) = temp_store();
        store.insert_one(&entry(5, 1, "web-1")).await.unwrap();
        store.insert_one(&entry(5, 2, "web-10")).await.unwrap();
        store.insert_one(&entry(5, 3, "web-1")).await.unwrap();
        let p = PartitionId::new("xlog20240305");

        let found = store.find_by_field(&p, "hostname", "web-1", 10).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|e| e.field_text("hostname").as_deref() == Some("web-1")));

        let limited = store.find_by_field(&p, "hostname", "web-1", 1).await.unwrap();
        assert_eq!(limited.len(), 1);

        assert!(matches!(
            store.find_by_field(&p, "message", "at 1", 10).await,
            Err(StoreError::NotIndexed { .. })
        ));
    }

    #[tokio::test]
    async fn test_reads_on_missing_partition_are_empty() {
        let (store, _dir) = temp_store();
        let p = PartitionId::new("xlog20000101");
        assert_eq!(store.count(&p).await.unwrap(), 0);
        assert!(store.scan(&p, 10).await.unwrap().is_empty());
        assert!(store.partition_metadata(&p).await.unwrap().is_none());
        assert!(store.list_partitions().await.unwrap().is_empty());
        assert!(store.find_by_field(&p, "hostname", "a", 10).await.unwrap().is_empty());
    }

    #[test]
    fn test_doc_keys_sort_by_time_across_epoch() {
        let before = LogEntry::new(Utc.with_ymd_and_hms(1969, 12, 31, 0, 0, 0).unwrap(), Map::new());
        let after = LogEntry::new(Utc.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap(), Map::new());
        assert!(doc_key(&before) < doc_key(&after));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_readers_see_whole_commits_only() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let (store, _dir) = temp_store();
        let mut batch = Batch::new();
        for i in 0..300u32 {
            let e = entry(5 + i % 3, i % 24, "web-1");
            batch.accumulate(store.partition_for(e.timestamp()), e, ());
        }
        let expected: Vec<(PartitionId, u64)> = batch
            .partitions()
            .map(|(p, entries)| (p.clone(), entries.len() as u64))
            .collect();

        let done = Arc::new(AtomicBool::new(false));
        let reader = {
            let store = store.clone();
            let expected = expected.clone();
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                let mut rounds = 0u32;
                loop {
                    let finished = done.load(Ordering::Acquire);
                    for (p, full) in &expected {
                        let n = store.count(p).await.unwrap();
                        assert!(n == 0 || n == *full, "{p}: counted {n} of {full}");
                        let seen = store.scan(p, 1000).await.unwrap().len() as u64;
                        assert!(seen == 0 || seen == *full, "{p}: scanned {seen} of {full}");
                    }
                    rounds += 1;
                    if finished {
                        return rounds;
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        commit_batch(&store, &batch).await.unwrap();
        done.store(true, Ordering::Release);

        assert!(reader.await.unwrap() >= 1);
        for (p, full) in &expected {
            assert_eq!(store.count(p).await.unwrap(), *full);
        }
    }

    #[test]
    fn test_commit_failure_is_backend_unavailable() {
        let io = std::io::Error::other("no space left on device");
        let err = commit_failed(redb::CommitError::Storage(redb::StorageError::Io(io)));
        assert!(matches!(err, StoreError::BackendUnavailable(_)));
        assert!(err.to_string().contains("no space left on device"));
    }
}
