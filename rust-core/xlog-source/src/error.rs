// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Source error types.
//
// Timeouts and malformed payloads are not errors: `RecordSource::next`
// reports both as `Polled::Empty`. What remains is a failure to reach the
// queue, an attempt to recover an event into a queue it did not come from,
// and use after close.

use thiserror::Error;

/// Errors raised by a record source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The queue could not be reached or rejected the operation.
    #[error("transport error: {0}")]
    Transport(String),

    /// The raw event did not originate from this source.
    #[error("event from '{found}' cannot be recovered into '{expected}'")]
    NotRecoverable {
        /// Origin of the source asked to recover the event.
        expected: String,
        /// Origin recorded on the event.
        found: String,
    },

    /// The source has been closed.
    #[error("source '{0}' is closed")]
    Closed(String),

    /// An I/O error occurred while opening a file-backed queue.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Whether this error means the queue itself is unreachable.
    pub fn is_transport(&self) -> bool {
        matches!(self, SourceError::Transport(_) | SourceError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_recoverable_display() {
        let err = SourceError::NotRecoverable {
            expected: "memory:a".to_string(),
            found: "memory:b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "event from 'memory:b' cannot be recovered into 'memory:a'"
        );
        assert!(!err.is_transport());
    }

    #[test]
    fn test_transport_classification() {
        assert!(SourceError::Transport("connection refused".to_string()).is_transport());
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(SourceError::Io(io).is_transport());
        assert!(!SourceError::Closed("memory:q".to_string()).is_transport());
    }
}
