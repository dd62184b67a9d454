//! Built-in Extension Registrations
//!
//! Registers the node-quota fingerprint manager with the extension registry
//! using the `inventory` crate. Hosts that ship their own implementation
//! build without the `builtin-manager` feature.

mod node_quota;

use std::sync::Arc;

pub use node_quota::{
    CHECK_INTERVAL_KEY, DEFAULT_CHECK_INTERVAL_MS, MAX_NODE_COUNT_KEY, MIN_CHECK_INTERVAL_MS,
    NodeQuotaManager, install_id_for,
};

use crate::plugin::capabilities::FingerPrintControlManager;

/// Registry id of the node-quota manager
pub const NODE_QUOTA_ID: &str = "node-quota";

fn create_node_quota_manager() -> Arc<dyn FingerPrintControlManager> {
    NodeQuotaManager::new()
}

register_fingerprint_manager!(NODE_QUOTA_ID, create_node_quota_manager);
