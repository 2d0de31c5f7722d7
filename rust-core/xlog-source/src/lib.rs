// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// xlog record sources
//
// A record source is the queue end of the ingestion pipeline. Every backend
// implements `RecordSource`, so the ingestion loop never knows which queue
// technology it is draining.
//
// # Modules
//
// - [`source`] -- The `RecordSource` trait, `RawEvent`, `Record` and the
//   tagged `Polled` outcome.
// - [`error`] -- The `SourceError` enum.
// - [`memory`] -- An in-process queue for tests and embedding.
// - [`redb_queue`] -- A durable FIFO persisted in a redb file.
// - `redis_queue` -- The shipper's Redis list (feature `redis`).
//
// # Example
//
// ```rust
// use std::time::Duration;
// use xlog_source::{MemoryQueue, MemorySource, RecordSource};
//
// let queue = MemoryQueue::new();
// queue.push(br#"{"@timestamp":"2024-03-05T10:00:00Z","message":"hi"}"#.to_vec());
//
// let mut source = MemorySource::new(queue.clone(), "docs", Duration::from_millis(10));
// let record = source.next().await.unwrap().into_record().unwrap();
//
// // A failed commit hands the exact bytes back to the queue.
// source.recover(&record.raw).await.unwrap();
// assert_eq!(queue.len(), 1);
// ```

pub mod error;
pub mod memory;
pub mod redb_queue;
pub mod source;

#[cfg(feature = "redis")]
pub mod redis_queue;

pub use error::SourceError;
pub use memory::{MemoryQueue, MemorySource};
pub use redb_queue::RedbQueue;
pub use source::{Polled, RawEvent, Record, RecordSource};

#[cfg(feature = "redis")]
pub use redis_queue::RedisQueue;
