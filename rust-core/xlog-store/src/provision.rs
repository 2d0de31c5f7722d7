// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process-lifetime record of provisioned partitions.
//
// Stores consult this before provisioning so that a partition's indexes are
// established once per process, not once per commit. The cache is only ever
// filled after provisioning succeeded; a restart starts empty and the first
// commit per partition re-runs the (idempotent) provisioning.

use std::collections::HashSet;

use tokio::sync::RwLock;
use xlog_core::PartitionId;

/// Set of partitions provisioned by this process.
#[derive(Debug, Default)]
pub struct ProvisionCache {
    seen: RwLock<HashSet<PartitionId>>,
}

impl ProvisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, partition: &PartitionId) -> bool {
        self.seen.read().await.contains(partition)
    }

    /// Record `partition` as provisioned. Returns `false` if it already was.
    pub async fn insert(&self, partition: PartitionId) -> bool {
        self.seen.write().await.insert(partition)
    }

    pub async fn len(&self) -> usize {
        self.seen.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.seen.read().await.is_empty()
    }
}
