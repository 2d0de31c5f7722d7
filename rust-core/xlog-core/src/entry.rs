// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Normalized log entry.
//
// A `LogEntry` is what the store persists: one required timestamp and an
// open set of JSON fields. The stored document shape is the field set with
// the timestamp added under `TIMESTAMP_FIELD`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the timestamp field in stored documents.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// A normalized, immutable log record derived from exactly one raw event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl LogEntry {
    /// Create an entry. A `timestamp` key inside `fields` is dropped since
    /// the entry's own timestamp owns that name in the stored document.
    pub fn new(timestamp: DateTime<Utc>, mut fields: Map<String, Value>) -> Self {
        fields.remove(TIMESTAMP_FIELD);
        Self { timestamp, fields }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Look up a field by name. Does not cover the timestamp.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Render a field as the text used for index keys and equality lookups.
    ///
    /// Strings render as themselves, other scalars and nested values as
    /// compact JSON, and the timestamp as RFC 3339 with millisecond
    /// precision. Missing fields and nulls have no index text.
    pub fn field_text(&self, field: &str) -> Option<String> {
        if field == TIMESTAMP_FIELD {
            return Some(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true));
        }
        match self.fields.get(field)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// The stored document: all fields plus the timestamp.
    pub fn to_document(&self) -> Value {
        let mut doc = self.fields.clone();
        doc.insert(
            TIMESTAMP_FIELD.to_string(),
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
        Value::Object(doc)
    }
}
