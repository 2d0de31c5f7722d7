// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// redb-backed durable queue.
//
// A FIFO list persisted in a redb file, for deployments where the shipper
// and the ingester share a host and no broker is wanted.
//
// # Design
//
// - One table per queue key, named `queue:{key}`, mapping a u64 sequence
//   number to the raw payload.
// - `push` appends at `last + 1` inside a write transaction; `recover` is a
//   push, so recovered events go behind everything already queued.
// - `next` is `pop_first` in a write transaction: the removal and the read
//   commit together, so a payload is never handed out twice.
// - When the queue is empty, `next` re-polls every `poll_interval` until the
//   poll timeout. Producers in other processes are picked up on the next
//   tick.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition, TableError,
};
use tokio::time::Instant;
use tracing::debug;

use crate::error::SourceError;
use crate::source::{ensure_origin, Polled, RawEvent, RecordSource};

/// Default interval between polls of an empty queue.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A persistent FIFO queue and [`RecordSource`] backed by redb.
///
/// Cloning is cheap and clones share the database handle, so one clone can
/// act as the producer while another is consumed by the ingestion loop.
#[derive(Clone)]
pub struct RedbQueue {
    db: Arc<Database>,
    path: PathBuf,
    table: String,
    origin: Arc<str>,
    poll_timeout: Duration,
    poll_interval: Duration,
    closed: bool,
}

fn transport(context: &str, e: impl std::fmt::Display) -> SourceError {
    SourceError::Transport(format!("{context}: {e}"))
}

impl RedbQueue {
    /// Open or create the queue `key` in the redb file at `path`.
    pub fn open(
        path: impl AsRef<Path>,
        key: &str,
        poll_timeout: Duration,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(&path).map_err(|e| {
            transport(&format!("failed to open redb queue at {}", path.display()), e)
        })?;

        debug!(path = %path.display(), key, "opened redb queue");

        Ok(Self {
            db: Arc::new(db),
            origin: Arc::from(format!("redb:{}#{key}", path.display())),
            table: format!("queue:{key}"),
            path,
            poll_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            closed: false,
        })
    }

    /// Another queue stored in the same file under `key`.
    pub fn with_key(&self, key: &str) -> Self {
        Self {
            db: Arc::clone(&self.db),
            path: self.path.clone(),
            table: format!("queue:{key}"),
            origin: Arc::from(format!("redb:{}#{key}", self.path.display())),
            poll_timeout: self.poll_timeout,
            poll_interval: self.poll_interval,
            closed: false,
        }
    }

    /// Override how often an empty queue is re-polled.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a payload at the tail, returning its sequence number.
    pub async fn push(&self, payload: &[u8]) -> Result<u64, SourceError> {
        let db = Arc::clone(&self.db);
        let table_name = self.table.clone();
        let payload = payload.to_vec();

        tokio::task::spawn_blocking(move || -> Result<u64, SourceError> {
            let def: TableDefinition<u64, &[u8]> = TableDefinition::new(&table_name);
            let txn = db.begin_write().map_err(|e| transport("write txn", e))?;
            let seq;
            {
                let mut table = txn.open_table(def).map_err(|e| transport("open queue", e))?;
                seq = table
                    .last()
                    .map_err(|e| transport("queue tail", e))?
                    .map(|(k, _)| k.value() + 1)
                    .unwrap_or(0);
                table
                    .insert(seq, payload.as_slice())
                    .map_err(|e| transport("enqueue", e))?;
            }
            txn.commit().map_err(|e| transport("commit enqueue", e))?;
            Ok(seq)
        })
        .await
        .map_err(|e| transport("task join", e))?
    }

    /// Number of queued payloads.
    pub async fn len(&self) -> Result<u64, SourceError> {
        let db = Arc::clone(&self.db);
        let table_name = self.table.clone();

        tokio::task::spawn_blocking(move || -> Result<u64, SourceError> {
            let def: TableDefinition<u64, &[u8]> = TableDefinition::new(&table_name);
            let txn = db.begin_read().map_err(|e| transport("read txn", e))?;
            let table = match txn.open_table(def) {
                Ok(t) => t,
                Err(TableError::TableDoesNotExist(_)) => return Ok(0),
                Err(e) => return Err(transport("open queue", e)),
            };
            table.len().map_err(|e| transport("queue length", e))
        })
        .await
        .map_err(|e| transport("task join", e))?
    }

    pub async fn is_empty(&self) -> Result<bool, SourceError> {
        Ok(self.len().await? == 0)
    }

    /// Remove and return the head payload, if any.
    async fn pop(&self) -> Result<Option<Vec<u8>>, SourceError> {
        let db = Arc::clone(&self.db);
        let table_name = self.table.clone();

        tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>, SourceError> {
            let def: TableDefinition<u64, &[u8]> = TableDefinition::new(&table_name);
            let txn = db.begin_write().map_err(|e| transport("write txn", e))?;
            let head;
            {
                let mut table = txn.open_table(def).map_err(|e| transport("open queue", e))?;
                head = table
                    .pop_first()
                    .map_err(|e| transport("dequeue", e))?
                    .map(|(_, v)| v.value().to_vec());
            }
            if head.is_none() {
                // Nothing removed; skip the fsync of an empty commit.
                txn.abort().map_err(|e| transport("abort dequeue", e))?;
                return Ok(None);
            }
            txn.commit().map_err(|e| transport("commit dequeue", e))?;
            Ok(head)
        })
        .await
        .map_err(|e| transport("task join", e))?
    }
}

impl std::fmt::Debug for RedbQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbQueue")
            .field("path", &self.path)
            .field("table", &self.table)
            .field("closed", &self.closed)
            .finish()
    }
}

#[async_trait]
impl RecordSource for RedbQueue {
    async fn next(&mut self) -> Result<Polled, SourceError> {
        if self.closed {
            return Err(SourceError::Closed(self.origin.to_string()));
        }

        let deadline = Instant::now() + self.poll_timeout;
        loop {
            if let Some(payload) = self.pop().await? {
                return Ok(Polled::from_raw(RawEvent::new(self.origin.clone(), payload)));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Polled::Empty);
            }
            tokio::time::sleep(remaining.min(self.poll_interval)).await;
        }
    }

    async fn recover(&mut self, raw: &RawEvent) -> Result<(), SourceError> {
        if self.closed {
            return Err(SourceError::Closed(self.origin.to_string()));
        }
        ensure_origin(&self.origin, raw)?;
        self.push(raw.payload()).await.map(|_| ())
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        // Other clones may still hold the database; ours is released on drop.
        self.closed = true;
        Ok(())
    }

    fn origin(&self) -> &str {
        &self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn temp_queue(timeout: Duration) -> (RedbQueue, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let queue = RedbQueue::open(dir.path().join("queue.redb"), "xlog", timeout)
            .unwrap()
            .with_poll_interval(Duration::from_millis(10));
        (queue, dir)
    }

    #[tokio::test]
    async fn test_fifo_and_destructive_read() {
        let (mut queue, _dir) = temp_queue(Duration::from_millis(50));
        queue.push(br#"{"n":1}"#).await.unwrap();
        queue.push(br#"{"n":2}"#).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 2);

        let first = queue.next().await.unwrap().into_record().unwrap();
        assert_eq!(first.event["n"], 1);
        assert_eq!(queue.len().await.unwrap(), 1);

        let second = queue.next().await.unwrap().into_record().unwrap();
        assert_eq!(second.event["n"], 2);
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_queue_times_out() {
        let (mut queue, _dir) = temp_queue(Duration::from_millis(50));
        let started = std::time::Instant::now();
        assert!(queue.next().await.unwrap().is_empty());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_consumed() {
        let (mut queue, _dir) = temp_queue(Duration::from_millis(50));
        queue.push(b"<html>").await.unwrap();
        assert!(queue.next().await.unwrap().is_empty());
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_recover_goes_to_tail_byte_for_byte() {
        let (mut queue, _dir) = temp_queue(Duration::from_millis(50));
        let original = b"{\"z\":1,   \"a\":[1, 2]}".to_vec();
        queue.push(&original).await.unwrap();

        let record = queue.next().await.unwrap().into_record().unwrap();
        queue.push(br#"{"queued":"meanwhile"}"#).await.unwrap();
        queue.recover(&record.raw).await.unwrap();

        let meanwhile = queue.next().await.unwrap().into_record().unwrap();
        assert_eq!(meanwhile.event["queued"], "meanwhile");
        let again = queue.next().await.unwrap().into_record().unwrap();
        assert_eq!(again.raw.payload(), original.as_slice());
    }

    #[tokio::test]
    async fn test_recover_rejects_other_origins() {
        let (mut queue, _dir) = temp_queue(Duration::from_millis(50));
        let foreign = RawEvent::new(Arc::from("memory:other"), b"{}".to_vec());
        assert!(matches!(
            queue.recover(&foreign).await,
            Err(SourceError::NotRecoverable { .. })
        ));
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_queue_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("persist.redb");

        {
            let queue = RedbQueue::open(&path, "xlog", Duration::from_millis(10)).unwrap();
            queue.push(br#"{"kept":true}"#).await.unwrap();
        }

        let mut queue = RedbQueue::open(&path, "xlog", Duration::from_millis(10)).unwrap();
        let record = queue.next().await.unwrap().into_record().unwrap();
        assert_eq!(record.event["kept"], true);
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared.redb");
        let a = RedbQueue::open(&path, "a", Duration::from_millis(10)).unwrap();
        a.push(b"{}").await.unwrap();

        let mut b = a.with_key("b");
        assert_ne!(a.origin(), b.origin());
        assert_eq!(b.len().await.unwrap(), 0);
        assert!(b.next().await.unwrap().is_empty());
        assert_eq!(a.len().await.unwrap(), 1);

        let from_a = RawEvent::new(Arc::from(a.origin()), b"{}".to_vec());
        assert!(b.recover(&from_a).await.is_err());
    }

    #[tokio::test]
    async fn test_closed_queue_refuses_reads() {
        let (mut queue, _dir) = temp_queue(Duration::from_millis(10));
        queue.close().await.unwrap();
        queue.close().await.unwrap();
        assert!(matches!(queue.next().await, Err(SourceError::Closed(_))));
    }
}
