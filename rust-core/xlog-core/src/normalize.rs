// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filebeat event normalization.
//
// Turning a queue payload into a `LogEntry` happens in two steps. The source
// decodes the payload into a JSON object (`decode_event`) and discards it if
// that fails; the ingestion loop then normalizes the object (`Normalizer`),
// which finds the timestamp and tidies shipper metadata. Both steps are
// total: anything that is not a log entry comes back as `None`, never as an
// error, because an unparseable payload can never succeed on a retry.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::entry::LogEntry;
use crate::partition::Partitioner;

/// Decode a raw queue payload into a JSON object.
///
/// Returns `None` for invalid JSON and for JSON that is not an object.
pub fn decode_event(payload: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice::<Value>(payload) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            debug!(kind = json_kind(&other), "event payload is not a JSON object");
            None
        }
        Err(e) => {
            debug!(error = %e, bytes = payload.len(), "event payload is not valid JSON");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Normalizer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerConfig {
    /// Keys searched, in order, for the event timestamp. All of them are
    /// removed from the field set.
    pub timestamp_keys: Vec<String>,
    /// Lift `beat.hostname` / `host.name` into `hostname` and
    /// `log.file.path` into `source`, and drop `@metadata`.
    pub lift_shipper_metadata: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            timestamp_keys: vec!["@timestamp".to_string(), "timestamp".to_string()],
            lift_shipper_metadata: true,
        }
    }
}

/// Maps decoded shipper events to log entries.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize a decoded event. `None` means "not a log entry".
    pub fn normalize(&self, mut event: Map<String, Value>) -> Option<LogEntry> {
        let timestamp = self
            .config
            .timestamp_keys
            .iter()
            .find_map(|key| event.get(key).and_then(parse_timestamp));

        let Some(timestamp) = timestamp else {
            debug!("event has no usable timestamp");
            return None;
        };

        for key in &self.config.timestamp_keys {
            event.remove(key);
        }

        if self.config.lift_shipper_metadata {
            event.remove("@metadata");
            lift(&mut event, "hostname", &[&["beat", "hostname"], &["host", "name"]]);
            lift(&mut event, "source", &[&["log", "file", "path"]]);
        }

        Some(LogEntry::new(timestamp, event))
    }

    /// Decode and normalize a raw payload in one step.
    pub fn normalize_bytes(&self, payload: &[u8]) -> Option<LogEntry> {
        decode_event(payload).and_then(|event| self.normalize(event))
    }
}

/// Parse an RFC 3339 string or integer Unix milliseconds.
///
/// Timestamps the partitioner cannot name in every offset are rejected.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }?;
    Partitioner::accepts(parsed).then_some(parsed)
}

/// Copy the first string found at one of `paths` into top-level `target`,
/// unless `target` is already present.
fn lift(event: &mut Map<String, Value>, target: &str, paths: &[&[&str]]) {
    if event.contains_key(target) {
        return;
    }
    let found = paths.iter().find_map(|path| {
        let (first, rest) = path.split_first()?;
        let mut node = event.get(*first)?;
        for key in rest {
            node = node.get(*key)?;
        }
        node.as_str().map(str::to_string)
    });
    if let Some(value) = found {
        event.insert(target.to_string(), Value::String(value));
    }
}
