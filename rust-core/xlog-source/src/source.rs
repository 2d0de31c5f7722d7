// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core record source trait.
//
// A source is a queue consumer with three operations: a bounded, destructive
// `next`, a `recover` that appends an event back at the tail of the same
// queue, and `close`. The outcome of `next` is tagged explicitly so callers
// never have to tell a timeout apart from an error by inspecting it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SourceError;

/// An opaque payload exactly as dequeued, tagged with the source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    origin: Arc<str>,
    payload: Vec<u8>,
}

impl RawEvent {
    pub fn new(origin: Arc<str>, payload: Vec<u8>) -> Self {
        Self { origin, payload }
    }

    /// Identifier of the source that dequeued this event.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// A dequeued event that decoded into a structured JSON object.
#[derive(Debug, Clone)]
pub struct Record {
    /// The bytes as dequeued; this is what `recover` re-enqueues.
    pub raw: RawEvent,
    /// The decoded event, ready for normalization.
    pub event: Map<String, Value>,
}

impl Record {
    /// Decode a raw event. Returns `None` when the payload is not a JSON
    /// object, in which case the event is dropped by the caller.
    pub fn decode(raw: RawEvent) -> Option<Self> {
        match xlog_core::decode_event(&raw.payload) {
            Some(event) => Some(Self { raw, event }),
            None => {
                debug!(origin = %raw.origin, bytes = raw.payload.len(), "discarding malformed event");
                None
            }
        }
    }
}

/// Outcome of a single poll.
#[derive(Debug, Clone)]
pub enum Polled {
    /// One well-formed event.
    Record(Record),
    /// Nothing usable: the poll timed out or the dequeued payload was
    /// malformed and has been discarded.
    Empty,
}

impl Polled {
    /// Decode a dequeued payload into a poll outcome.
    pub fn from_raw(raw: RawEvent) -> Self {
        Record::decode(raw).map_or(Polled::Empty, Polled::Record)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Polled::Empty)
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Polled::Record(record) => Some(record),
            Polled::Empty => None,
        }
    }
}

/// A consumable queue of shipper events.
///
/// `next` removes one item from the shared queue and `recover` adds one
/// back, so an event is only at risk between a `next` and the commit that
/// follows it; callers must `recover` every event whose commit failed.
#[async_trait]
pub trait RecordSource: Send {
    /// Wait up to the source's poll timeout for one event.
    ///
    /// Returns `Polled::Empty` on timeout and for malformed payloads (which
    /// are consumed and never retried). Only transport failures are errors.
    async fn next(&mut self) -> Result<Polled, SourceError>;

    /// Re-enqueue `raw` at the tail of the queue it came from, byte for byte.
    ///
    /// Fails with [`SourceError::NotRecoverable`] if `raw` did not originate
    /// from this source.
    async fn recover(&mut self, raw: &RawEvent) -> Result<(), SourceError>;

    /// Release the underlying connection. Calling it twice is harmless.
    async fn close(&mut self) -> Result<(), SourceError>;

    /// Identifier stamped on every event this source yields.
    fn origin(&self) -> &str;
}

/// Reject events that were not dequeued by the source named `origin`.
pub fn ensure_origin(origin: &str, raw: &RawEvent) -> Result<(), SourceError> {
    if raw.origin() == origin {
        Ok(())
    } else {
        Err(SourceError::NotRecoverable {
            expected: origin.to_string(),
            found: raw.origin().to_string(),
        })
    }
}
