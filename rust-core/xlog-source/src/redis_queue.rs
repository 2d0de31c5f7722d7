// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Redis list source.
//
// Filebeat's Redis output pushes each event onto a list. This source pops
// from the head with `BLPOP` bounded by the poll timeout and recovers with
// `RPUSH`, which puts the event behind everything currently queued. Only
// compiled with the `redis` feature.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::debug;

use crate::error::SourceError;
use crate::source::{ensure_origin, Polled, RawEvent, RecordSource};

fn transport(context: &str, e: redis::RedisError) -> SourceError {
    SourceError::Transport(format!("{context}: {e}"))
}

/// A [`RecordSource`] consuming a Redis list.
pub struct RedisQueue {
    conn: Option<MultiplexedConnection>,
    key: String,
    origin: Arc<str>,
    poll_timeout: Duration,
}

impl RedisQueue {
    /// Connect to `url` and consume the list at `key`.
    ///
    /// `poll_timeout` must be non-zero: a zero `BLPOP` timeout blocks forever.
    pub async fn connect(url: &str, key: &str, poll_timeout: Duration) -> Result<Self, SourceError> {
        if poll_timeout.is_zero() {
            return Err(SourceError::Transport(
                "redis poll timeout must be non-zero".to_string(),
            ));
        }

        let client = redis::Client::open(url).map_err(|e| transport("invalid redis url", e))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| transport("connect", e))?;

        debug!(key, "connected to redis queue");

        Ok(Self {
            conn: Some(conn),
            key: key.to_string(),
            origin: Arc::from(format!("redis:{key}")),
            poll_timeout,
        })
    }

    fn connection(&mut self) -> Result<&mut MultiplexedConnection, SourceError> {
        match self.conn.as_mut() {
            Some(conn) => Ok(conn),
            None => Err(SourceError::Closed(self.origin.to_string())),
        }
    }
}

impl std::fmt::Debug for RedisQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisQueue")
            .field("key", &self.key)
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

#[async_trait]
impl RecordSource for RedisQueue {
    async fn next(&mut self) -> Result<Polled, SourceError> {
        let key = self.key.clone();
        let timeout = self.poll_timeout.as_secs_f64();
        let conn = self.connection()?;

        // Nil reply on timeout; otherwise (list key, payload).
        let popped: Option<(String, Vec<u8>)> = conn
            .blpop(&key, timeout)
            .await
            .map_err(|e| transport("BLPOP", e))?;

        Ok(match popped {
            Some((_, payload)) => Polled::from_raw(RawEvent::new(self.origin.clone(), payload)),
            None => Polled::Empty,
        })
    }

    async fn recover(&mut self, raw: &RawEvent) -> Result<(), SourceError> {
        ensure_origin(&self.origin, raw)?;
        let key = self.key.clone();
        let conn = self.connection()?;
        let _: i64 = conn
            .rpush(&key, raw.payload())
            .await
            .map_err(|e| transport("RPUSH", e))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        // Dropping the multiplexed handle closes the connection.
        self.conn = None;
        Ok(())
    }

    fn origin(&self) -> &str {
        &self.origin
    }
}
