// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// xlog ingestion
//
// Wires a record source to a partitioned store. The `IngestLoop` polls the
// source, normalizes each event, accumulates a batch per cycle and commits
// it; a failed commit re-enqueues the raw events that were not stored, so
// delivery is at-least-once.
//
// # Modules
//
// - [`ingest`] -- `IngestLoop`, `BatchConfig` and the loop statistics.
// - [`config`] -- `IngestConfig` loaded from `XLOG_*` environment variables.
// - [`error`] -- The `IngestError` enum for failures that end a run.

pub mod config;
pub mod error;
pub mod ingest;

pub use config::{ConfigError, IngestConfig, LogFormat, QueueUrl};
pub use error::IngestError;
pub use ingest::{BatchConfig, FlushOutcome, IngestLoop, IngestStats, StepOutcome};
