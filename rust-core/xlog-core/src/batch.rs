// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-cycle accumulation of log entries, grouped by partition.
//
// A `Batch<R>` pairs every entry with a shadow value `R` (in the ingestion
// loop, the raw queue event that produced it). The pairing is positional
// within a partition and is kept until the batch is cleared, so a failed
// commit can hand exactly the right raw events back to the queue.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::entry::LogEntry;
use crate::partition::PartitionId;

/// Entries buffered for one partition with their paired shadows.
#[derive(Debug, Clone)]
pub struct PartitionSlot<R> {
    entries: Vec<LogEntry>,
    shadows: Vec<R>,
}

impl<R> PartitionSlot<R> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            shadows: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn shadows(&self) -> &[R] {
        &self.shadows
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An in-memory batch of entries awaiting a single commit pass.
///
/// Partitions iterate in name order, which for one prefix is day order.
#[derive(Debug)]
pub struct Batch<R> {
    partitions: BTreeMap<PartitionId, PartitionSlot<R>>,
    len: usize,
    started: Instant,
}

impl<R> Batch<R> {
    pub fn new() -> Self {
        Self {
            partitions: BTreeMap::new(),
            len: 0,
            started: Instant::now(),
        }
    }

    /// Reset the batch and restart its age clock.
    pub fn begin(&mut self) {
        self.clear();
        self.started = Instant::now();
    }

    /// Buffer `entry` under `partition`, paired with `shadow`. No I/O.
    pub fn accumulate(&mut self, partition: PartitionId, entry: LogEntry, shadow: R) {
        let slot = self
            .partitions
            .entry(partition)
            .or_insert_with(PartitionSlot::new);
        slot.entries.push(entry);
        slot.shadows.push(shadow);
        self.len += 1;
    }

    /// Total number of buffered entries across all partitions.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Time since the last `begin`.
    pub fn age(&self) -> Duration {
        self.started.elapsed()
    }

    /// Non-empty partitions and their entries, in partition order.
    pub fn partitions(&self) -> impl Iterator<Item = (&PartitionId, &[LogEntry])> {
        self.partitions
            .iter()
            .filter(|(_, slot)| !slot.is_empty())
            .map(|(id, slot)| (id, slot.entries()))
    }

    /// Number of partitions holding at least one entry.
    pub fn partition_count(&self) -> usize {
        self.partitions().count()
    }

    pub fn slot(&self, partition: &PartitionId) -> Option<&PartitionSlot<R>> {
        self.partitions.get(partition)
    }

    /// Remove the entries of `partitions` and return their shadows in
    /// partition order, then insertion order.
    pub fn drain_shadows<'a, I>(&mut self, partitions: I) -> Vec<R>
    where
        I: IntoIterator<Item = &'a PartitionId>,
    {
        let mut drained = Vec::new();
        for id in partitions {
            if let Some(slot) = self.partitions.get_mut(id) {
                self.len -= slot.entries.len();
                slot.entries.clear();
                drained.append(&mut slot.shadows);
            }
        }
        drained
    }

    /// Remove every entry and return all shadows.
    pub fn drain_all_shadows(&mut self) -> Vec<R> {
        let mut drained = Vec::with_capacity(self.len);
        for slot in self.partitions.values_mut() {
            slot.entries.clear();
            drained.append(&mut slot.shadows);
        }
        self.len = 0;
        drained
    }

    /// Discard buffered entries.
    ///
    /// Slots used in the cycle being cleared keep their allocations for the
    /// next cycle; slots that were already empty are released so days that
    /// have rolled over do not linger.
    pub fn clear(&mut self) {
        self.partitions.retain(|_, slot| !slot.is_empty());
        for slot in self.partitions.values_mut() {
            slot.entries.clear();
            slot.shadows.clear();
        }
        self.len = 0;
    }
}

impl<R> Default for Batch<R> {
    fn default() -> Self {
        Self::new()
    }
}
