// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Store error types.
//
// `StoreError` covers a single store operation. A failed batch commit is
// reported as a `CommitError` (see `commit.rs`), which wraps the
// `StoreError` that caused it and says which partitions it affected.

use thiserror::Error;
use xlog_core::PartitionId;

/// Errors that can occur when interacting with a partitioned store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred in the underlying storage layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize a document.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// The stored data is corrupted or in an unexpected format.
    #[error("corrupted data: {0}")]
    CorruptedData(String),

    /// The store is not available (e.g., connection lost).
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The store refused a multi-document insert.
    #[error("write to partition {partition} rejected: {reason}")]
    WriteRejected {
        /// Partition the write targeted.
        partition: PartitionId,
        /// Backend-supplied reason.
        reason: String,
    },

    /// Indexes or the shard key could not be established.
    #[error("provisioning of partition {partition} failed: {reason}")]
    Provisioning {
        /// Partition being provisioned.
        partition: PartitionId,
        /// Backend-supplied reason.
        reason: String,
    },

    /// A write reached a partition that was never provisioned.
    #[error("partition {0} is not provisioned")]
    NotProvisioned(PartitionId),

    /// A field lookup asked for a field the partition has no index on.
    #[error("partition {partition} has no index on field '{field}'")]
    NotIndexed {
        /// Partition queried.
        partition: PartitionId,
        /// Field without an index.
        field: String,
    },
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file gone");
        let err = StoreError::Io(io_err);
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_write_rejected_display() {
        let err = StoreError::WriteRejected {
            partition: PartitionId::new("xlog20240306"),
            reason: "disk full".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "write to partition xlog20240306 rejected: disk full"
        );
    }

    #[test]
    fn test_not_indexed_display() {
        let err = StoreError::NotIndexed {
            partition: PartitionId::new("xlog20240305"),
            field: "message".to_string(),
        };
        assert!(err.to_string().contains("no index on field 'message'"));
    }

    #[test]
    fn test_from_serde_json() {
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StoreError = bad.into();
        assert!(matches!(err, StoreError::SerializationError(_)));
    }
}
