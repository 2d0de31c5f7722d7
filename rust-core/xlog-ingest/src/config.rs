// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ingester configuration.
//
// Every setting has a default and can be overridden by an `XLOG_*`
// environment variable. `from_lookup` takes the variable source as a
// closure so parsing can be tested without touching the process
// environment.

use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;
use thiserror::Error;
use xlog_core::Partitioner;
use xlog_store::default_indexed_fields;

use crate::ingest::BatchConfig;

/// Invalid configuration value.
#[derive(Debug, Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

impl ConfigError {
    fn new(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Where raw events are consumed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueUrl {
    /// `redb://<path>`: a durable queue file on this host.
    Redb(PathBuf),
    /// `redis://...` or `rediss://...`: the shipper's Redis list.
    Redis(String),
}

impl QueueUrl {
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        if let Some(path) = url.strip_prefix("redb://") {
            if path.is_empty() {
                return Err(ConfigError::new("XLOG_QUEUE_URL", url, "missing file path"));
            }
            return Ok(QueueUrl::Redb(PathBuf::from(path)));
        }
        if url.starts_with("redis://") || url.starts_with("rediss://") {
            return Ok(QueueUrl::Redis(url.to_string()));
        }
        Err(ConfigError::new(
            "XLOG_QUEUE_URL",
            url,
            "expected a redb:// or redis:// URL",
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Main configuration for the ingester.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub queue: QueueUrl,
    /// Queue key (Redis list name or redb queue table).
    pub queue_key: String,
    pub store_path: PathBuf,
    pub partition_prefix: String,
    /// Offset in which partition calendar days are computed.
    pub partition_offset: FixedOffset,
    /// Fields indexed in new partitions, without duplicates.
    pub indexed_fields: Vec<String>,
    pub batch_size: usize,
    pub batch_window: Duration,
    /// Upper bound on a single blocking poll of the queue.
    pub poll_timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let batch = BatchConfig::default();
        Self {
            queue: QueueUrl::Redb(PathBuf::from("./data/queue.redb")),
            queue_key: "xlog".to_string(),
            store_path: PathBuf::from("./data/xlog.redb"),
            partition_prefix: "xlog".to_string(),
            partition_offset: Partitioner::default().offset(),
            indexed_fields: default_indexed_fields(),
            batch_size: batch.batch_size,
            batch_window: batch.batch_window,
            poll_timeout: Duration::from_secs(3),
            log_format: LogFormat::Pretty,
        }
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::new(var, value, "must be greater than zero")),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::new(var, value, e.to_string())),
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM` or `Z`.
fn parse_offset(value: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = |reason: &str| ConfigError::new("XLOG_PARTITION_OFFSET", value, reason);
    let v = value.trim();
    if v.eq_ignore_ascii_case("z") || v.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| invalid("out of range"));
    }

    let (sign, rest) = match v.as_bytes().first() {
        Some(b'+') => (1, &v[1..]),
        Some(b'-') => (-1, &v[1..]),
        _ => return Err(invalid("expected a leading '+' or '-'")),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("expected HH:MM"));
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid("bad hours"))?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid("bad minutes"))?;
    if minutes >= 60 {
        return Err(invalid("minutes must be below 60"));
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(|| invalid("out of range"))
}

fn parse_fields(value: &str) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for field in value.split(',').map(str::trim).filter(|f| !f.is_empty()) {
        if !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
    }
    fields
}

impl IngestConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from `lookup`, which maps a variable name to its
    /// value if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = IngestConfig::default();

        if let Some(url) = lookup("XLOG_QUEUE_URL") {
            config.queue = QueueUrl::parse(&url)?;
        }

        if let Some(key) = lookup("XLOG_QUEUE_KEY") {
            if key.trim().is_empty() {
                return Err(ConfigError::new("XLOG_QUEUE_KEY", &key, "must not be empty"));
            }
            config.queue_key = key;
        }

        if let Some(path) = lookup("XLOG_STORE_PATH") {
            config.store_path = PathBuf::from(path);
        }

        if let Some(prefix) = lookup("XLOG_PARTITION_PREFIX") {
            config.partition_prefix = prefix;
        }

        if let Some(offset) = lookup("XLOG_PARTITION_OFFSET") {
            config.partition_offset = parse_offset(&offset)?;
        }

        if let Some(fields) = lookup("XLOG_INDEXED_FIELDS") {
            config.indexed_fields = parse_fields(&fields);
        }

        if let Some(size) = lookup("XLOG_BATCH_SIZE") {
            config.batch_size = parse_positive("XLOG_BATCH_SIZE", &size)? as usize;
        }

        if let Some(ms) = lookup("XLOG_BATCH_WINDOW_MS") {
            config.batch_window = Duration::from_millis(parse_positive("XLOG_BATCH_WINDOW_MS", &ms)?);
        }

        if let Some(ms) = lookup("XLOG_POLL_TIMEOUT_MS") {
            config.poll_timeout = Duration::from_millis(parse_positive("XLOG_POLL_TIMEOUT_MS", &ms)?);
        }

        if let Some(format) = lookup("XLOG_LOG_FORMAT") {
            config.log_format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => {
                    return Err(ConfigError::new(
                        "XLOG_LOG_FORMAT",
                        &format,
                        "expected 'json' or 'pretty'",
                    ))
                }
            };
        }

        Ok(config)
    }

    pub fn partitioner(&self) -> Partitioner {
        Partitioner::new(self.partition_prefix.clone()).with_offset(self.partition_offset)
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            batch_size: self.batch_size,
            batch_window: self.batch_window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = IngestConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.queue, QueueUrl::Redb(PathBuf::from("./data/queue.redb")));
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.batch_window, Duration::from_secs(10));
        assert_eq!(config.poll_timeout, Duration::from_secs(3));
        assert_eq!(config.indexed_fields, vec!["timestamp", "hostname", "source"]);
        assert_eq!(config.partitioner().prefix(), "xlog");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_config_from_lookup() {
        let config = IngestConfig::from_lookup(lookup(&[
            ("XLOG_QUEUE_URL", "redis://127.0.0.1:6379/0"),
            ("XLOG_QUEUE_KEY", "filebeat"),
            ("XLOG_PARTITION_PREFIX", "logs_"),
            ("XLOG_PARTITION_OFFSET", "+08:00"),
            ("XLOG_INDEXED_FIELDS", "hostname, source,hostname,,level"),
            ("XLOG_BATCH_SIZE", "250"),
            ("XLOG_BATCH_WINDOW_MS", "1500"),
            ("XLOG_POLL_TIMEOUT_MS", "500"),
            ("XLOG_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.queue, QueueUrl::Redis("redis://127.0.0.1:6379/0".to_string()));
        assert_eq!(config.queue_key, "filebeat");
        assert_eq!(config.partition_offset.local_minus_utc(), 8 * 3600);
        assert_eq!(config.indexed_fields, vec!["hostname", "source", "level"]);
        assert_eq!(config.batch_config().batch_size, 250);
        assert_eq!(config.batch_config().batch_window, Duration::from_millis(1500));
        assert_eq!(config.poll_timeout, Duration::from_millis(500));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_redb_queue_url() {
        assert_eq!(
            QueueUrl::parse("redb:///var/lib/xlog/queue.redb").unwrap(),
            QueueUrl::Redb(PathBuf::from("/var/lib/xlog/queue.redb"))
        );
        assert!(QueueUrl::parse("redb://").is_err());
        assert!(QueueUrl::parse("amqp://broker").is_err());
    }

    #[test]
    fn test_zero_values_rejected() {
        let err = IngestConfig::from_lookup(lookup(&[("XLOG_BATCH_SIZE", "0")])).unwrap_err();
        assert_eq!(err.var, "XLOG_BATCH_SIZE");
        assert!(IngestConfig::from_lookup(lookup(&[("XLOG_POLL_TIMEOUT_MS", "0")])).is_err());
        assert!(IngestConfig::from_lookup(lookup(&[("XLOG_BATCH_SIZE", "lots")])).is_err());
    }

    #[test]
    fn test_offsets() {
        assert_eq!(parse_offset("-05:30").unwrap().local_minus_utc(), -(5 * 3600 + 30 * 60));
        assert_eq!(parse_offset("+0100").unwrap().local_minus_utc(), 3600);
        assert_eq!(parse_offset("Z").unwrap().local_minus_utc(), 0);
        assert!(parse_offset("08:00").is_err());
        assert!(parse_offset("+08:75").is_err());
        assert!(parse_offset("+99:00").is_err());
    }

    #[test]
    fn test_bad_log_format() {
        let err = IngestConfig::from_lookup(lookup(&[("XLOG_LOG_FORMAT", "xml")])).unwrap_err();
        assert!(err.to_string().contains("XLOG_LOG_FORMAT"));
    }
}
