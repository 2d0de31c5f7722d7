// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ingestion error types.
//
// Only failures that stop the loop are errors here. A failed commit is not:
// it is handled inside the loop by recovering the affected raw events.

use thiserror::Error;
use xlog_source::SourceError;

/// Errors that end an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The source failed while polling; fatal to the loop.
    #[error("source failed: {0}")]
    Source(#[from] SourceError),
}
