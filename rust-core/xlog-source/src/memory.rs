// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory queue and source.
//
// `MemoryQueue` is a cloneable FIFO handle shared between producers and a
// `MemorySource`. Waiting consumers are woken through a tokio `Notify`, so a
// poll returns as soon as an item is pushed instead of at the next tick.
// Intended for tests and for embedding the pipeline behind an in-process
// producer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::SourceError;
use crate::source::{ensure_origin, Polled, RawEvent, RecordSource};

/// A shared FIFO of raw payloads.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    items: Arc<Mutex<VecDeque<Vec<u8>>>>,
    notify: Arc<Notify>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Vec<u8>>> {
        // The deque has no invariant a panicking holder could break.
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a payload at the tail.
    pub fn push(&self, payload: impl Into<Vec<u8>>) {
        self.lock().push_back(payload.into());
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<Vec<u8>> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the queued payloads, head first.
    pub fn snapshot(&self) -> Vec<Vec<u8>> {
        self.lock().iter().cloned().collect()
    }
}

/// A [`RecordSource`] consuming a [`MemoryQueue`].
#[derive(Debug)]
pub struct MemorySource {
    queue: MemoryQueue,
    origin: Arc<str>,
    poll_timeout: Duration,
    closed: bool,
}

impl MemorySource {
    /// Consume `queue`. `name` distinguishes sources for recovery checks.
    pub fn new(queue: MemoryQueue, name: &str, poll_timeout: Duration) -> Self {
        Self {
            queue,
            origin: Arc::from(format!("memory:{name}")),
            poll_timeout,
            closed: false,
        }
    }

    pub fn queue(&self) -> &MemoryQueue {
        &self.queue
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn next(&mut self) -> Result<Polled, SourceError> {
        if self.closed {
            return Err(SourceError::Closed(self.origin.to_string()));
        }

        let deadline = Instant::now() + self.poll_timeout;
        loop {
            // `notify_one` leaves a permit when nobody waits, so a push that
            // lands between the pop and the wait is not missed.
            let notified = self.queue.notify.notified();
            if let Some(payload) = self.queue.pop() {
                return Ok(Polled::from_raw(RawEvent::new(self.origin.clone(), payload)));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || tokio::time::timeout(remaining, notified).await.is_err() {
                return Ok(Polled::Empty);
            }
        }
    }

    async fn recover(&mut self, raw: &RawEvent) -> Result<(), SourceError> {
        if self.closed {
            return Err(SourceError::Closed(self.origin.to_string()));
        }
        ensure_origin(&self.origin, raw)?;
        self.queue.push(raw.payload().to_vec());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SourceError> {
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

    fn source(queue: &MemoryQueue) -> MemorySource {
        MemorySource::new(queue.clone(), "test", Duration::from_secs(3))
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_empty() {
        let queue = MemoryQueue::new();
        let mut source = source(&queue);

        let started = Instant::now();
        assert!(source.next().await.unwrap().is_empty());
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_next_is_destructive_and_fifo() {
        let queue = MemoryQueue::new();
        queue.push(br#"{"n":1}"#.to_vec());
        queue.push(br#"{"n":2}"#.to_vec());
        let mut source = source(&queue);

        let first = source.next().await.unwrap().into_record().unwrap();
        assert_eq!(first.event["n"], 1);
        assert_eq!(queue.len(), 1);

        let second = source.next().await.unwrap().into_record().unwrap();
        assert_eq!(second.event["n"], 2);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_consumed() {
        let queue = MemoryQueue::new();
        queue.push(b"{\"broken\":".to_vec());
        let mut source = source(&queue);

        assert!(source.next().await.unwrap().is_empty());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_recover_appends_exact_bytes_at_tail() {
        let queue = MemoryQueue::new();
        // Whitespace and key order must survive the round trip untouched.
        let original = b"{ \"b\": 2,  \"a\": 1 }".to_vec();
        queue.push(original.clone());
        let mut source = source(&queue);

        let record = source.next().await.unwrap().into_record().unwrap();
        queue.push(br#"{"later":true}"#.to_vec());
        source.recover(&record.raw).await.unwrap();

        assert_eq!(queue.snapshot(), vec![br#"{"later":true}"#.to_vec(), original.clone()]);

        source.next().await.unwrap();
        let again = source.next().await.unwrap().into_record().unwrap();
        assert_eq!(again.raw.payload(), original.as_slice());
    }

    #[tokio::test]
    async fn test_recover_rejects_foreign_events() {
        let queue = MemoryQueue::new();
        let mut source = source(&queue);
        let foreign = RawEvent::new(Arc::from("memory:other"), b"{}".to_vec());

        let err = source.recover(&foreign).await.unwrap_err();
        assert!(matches!(err, SourceError::NotRecoverable { .. }));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_push_wakes_waiting_consumer() {
        let queue = MemoryQueue::new();
        let mut source = source(&queue);
        let producer = queue.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.push(br#"{"late":1}"#.to_vec());
        });

        let polled = source.next().await.unwrap();
        assert!(polled.into_record().is_some());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let queue = MemoryQueue::new();
        queue.push(b"{}".to_vec());
        let mut source = source(&queue);

        source.close().await.unwrap();
        source.close().await.unwrap();
        assert!(matches!(source.next().await, Err(SourceError::Closed(_))));
        assert_eq!(queue.len(), 1);
    }
}
