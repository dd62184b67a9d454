//! Failover context tracking.
//!
//! Failover state is stored as KV records under [`FAILOVER_KEY_PREFIX`]
//! followed by the failed node id. An empty value clears the context.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::metadata::KvRecord;

pub const FAILOVER_KEY_PREFIX: &str = "__failover/";

/// Consumer of KV records on the replay path.
pub trait FailoverControl: Send + Sync {
    fn replay(&self, record: &KvRecord);
}

/// In-memory failover contexts keyed by failed node id.
#[derive(Debug, Default)]
pub struct FailoverControlManager {
    contexts: RwLock<BTreeMap<i32, Bytes>>,
}

impl FailoverControlManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self, node_id: i32) -> Option<Bytes> {
        self.contexts.read().get(&node_id).cloned()
    }

    pub fn failed_nodes(&self) -> Vec<i32> {
        self.contexts.read().keys().copied().collect()
    }

    pub fn failover_key(node_id: i32) -> String {
        format!("{}{}", FAILOVER_KEY_PREFIX, node_id)
    }
}

impl FailoverControl for FailoverControlManager {
    fn replay(&self, record: &KvRecord) {
        let mut contexts = self.contexts.write();
        for kv in &record.key_values {
            let Some(suffix) = kv.key.strip_prefix(FAILOVER_KEY_PREFIX) else {
                continue;
            };
            let Ok(node_id) = suffix.parse::<i32>() else {
                tracing::warn!(key = %kv.key, "Ignoring failover record with malformed node id");
                continue;
            };
            if kv.value.is_empty() {
                contexts.remove(&node_id);
            } else {
                contexts.insert(node_id, kv.value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_tracks_failover_keys_only() {
        let manager = FailoverControlManager::new();
        manager.replay(&KvRecord::single(
            FailoverControlManager::failover_key(3),
            Bytes::from_static(b"{\"target\":1}"),
        ));
        manager.replay(&KvRecord::single("unrelated", "value"));
        manager.replay(&KvRecord::single("__failover/not-a-number", "x"));

        assert_eq!(manager.failed_nodes(), vec![3]);
        assert_eq!(
            manager.context(3),
            Some(Bytes::from_static(b"{\"target\":1}"))
        );
    }

    #[test]
    fn test_empty_value_clears_context() {
        let manager = FailoverControlManager::new();
        manager.replay(&KvRecord::single(FailoverControlManager::failover_key(3), "ctx"));
        manager.replay(&KvRecord::single(
            FailoverControlManager::failover_key(3),
            Bytes::new(),
        ));
        assert!(manager.failed_nodes().is_empty());
    }
}
