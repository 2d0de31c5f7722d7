// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Day partitions.
//
// Each calendar day gets its own partition named `<prefix><yyyy><mm><dd>`,
// zero-padded. The name is a storage-compatibility detail: partitions written
// by earlier deployments must keep resolving to the same name, so the format
// is fixed and the calendar day is taken in a fixed reference offset rather
// than the host's local zone.

use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Name of a day partition, e.g. `xlog20240305`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(String);

impl PartitionId {
    /// Wrap an existing partition name without validating it.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PartitionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Maps timestamps to day partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partitioner {
    /// Prefix prepended to every partition name.
    prefix: String,
    /// Reference offset in which the calendar day is computed.
    offset: FixedOffset,
}

impl Partitioner {
    /// A partitioner computing days in UTC.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            offset: Utc.fix(),
        }
    }

    /// Compute calendar days in `offset` instead of UTC.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The calendar day of `timestamp` in the reference offset.
    pub fn date_for(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        timestamp.with_timezone(&self.offset).date_naive()
    }

    /// Whether `timestamp` lands on a four-digit-year day in any fixed
    /// offset.
    ///
    /// Offsets stay within a day of UTC, so the first UTC day of year 0 and
    /// the last of year 9999 are excluded. Timestamps outside this range
    /// would produce partition names that `date_of` cannot read back.
    pub fn accepts(timestamp: DateTime<Utc>) -> bool {
        match (NaiveDate::from_ymd_opt(0, 1, 2), NaiveDate::from_ymd_opt(9999, 12, 30)) {
            (Some(first), Some(last)) => (first..=last).contains(&timestamp.date_naive()),
            _ => false,
        }
    }

    /// The partition holding entries stamped `timestamp`.
    pub fn partition_for(&self, timestamp: DateTime<Utc>) -> PartitionId {
        self.partition_for_date(self.date_for(timestamp))
    }

    /// The partition for a calendar day.
    pub fn partition_for_date(&self, date: NaiveDate) -> PartitionId {
        PartitionId(format!(
            "{}{:04}{:02}{:02}",
            self.prefix,
            date.year(),
            date.month(),
            date.day()
        ))
    }

    /// Parse a partition name produced by this partitioner back into its day.
    ///
    /// Returns `None` for names with a different prefix or a malformed date
    /// suffix.
    pub fn date_of(&self, partition: &PartitionId) -> Option<NaiveDate> {
        let digits = partition.as_str().strip_prefix(self.prefix.as_str())?;
        if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year = digits[0..4].parse().ok()?;
        let month = digits[4..6].parse().ok()?;
        let day = digits[6..8].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    /// All partitions from `start` to `end`, both inclusive, oldest first.
    pub fn partitions_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<PartitionId> {
        start
            .iter_days()
            .take_while(|day| *day <= end)
            .map(|day| self.partition_for_date(day))
            .collect()
    }
}

impl Default for Partitioner {
    fn default() -> Self {
        Self::new("xlog")
    }
}
