//! Host handle implementations for a standalone controller.

use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::metadata::RegisterNodeRecord;
use crate::plugin::{ClusterControl, QuorumController};

/// A single-node controller that is always active.
#[derive(Debug, Clone)]
pub struct StandaloneController {
    cluster_id: String,
    active: bool,
    fixed_time_ms: Option<i64>,
}

impl StandaloneController {
    pub fn new(cluster_id: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            active: true,
            fixed_time_ms: None,
        }
    }

    /// Pin the controller clock, for reproducible record generation.
    pub fn with_fixed_time(mut self, time_ms: i64) -> Self {
        self.fixed_time_ms = Some(time_ms);
        self
    }

    /// Mark the controller as a standby.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

impl QuorumController for StandaloneController {
    fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn time_ms(&self) -> i64 {
        if let Some(fixed) = self.fixed_time_ms {
            return fixed;
        }
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Registered nodes, folded from `RegisterNode` records.
#[derive(Debug, Default)]
pub struct ClusterMembership {
    nodes: RwLock<BTreeSet<i32>>,
}

impl ClusterMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(node_ids: impl IntoIterator<Item = i32>) -> Self {
        Self {
            nodes: RwLock::new(node_ids.into_iter().collect()),
        }
    }

    pub fn replay(&self, record: &RegisterNodeRecord) {
        self.nodes.write().insert(record.node_id);
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}

impl ClusterControl for ClusterMembership {
    fn registered_node_ids(&self) -> Vec<i32> {
        self.nodes.read().iter().copied().collect()
    }
}
