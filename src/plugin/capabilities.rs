//! Extension Capability Traits
//!
//! This module defines the contract a fingerprint/license extension must
//! satisfy to plug into the controller's replay path, and the host handles
//! passed to its optional initialization hook.
//!
//! # Threading
//!
//! `replay` and `replay_license_config` run on the controller's single
//! ordered apply thread. They must be deterministic, must not block, and must
//! only touch the implementation's own state. Everything else may be called
//! from any thread.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::isolation::PluginError;
use super::metadata::ExtensionManifest;
use crate::image::FingerPrintImage;
use crate::metadata::{ApiMessageAndVersion, ConfigRecord, ConfigResource, FingerPrintRecord};

/// Marker trait for all extension capabilities
///
/// Implementations are shared across the registry, the replay path and any
/// background task, so they must be `Send + Sync + 'static`.
pub trait PluginCapability: Send + Sync + 'static {}

/// View of the quorum controller handed to extensions.
pub trait QuorumController: Send + Sync {
    /// Cluster identifier, stable for the lifetime of the cluster
    fn cluster_id(&self) -> &str;

    /// Whether this controller is the active (leader) controller
    fn is_active(&self) -> bool;

    /// Controller clock in milliseconds since the Unix epoch
    fn time_ms(&self) -> i64;
}

/// View of cluster membership handed to extensions.
pub trait ClusterControl: Send + Sync {
    /// Ids of the nodes currently registered with the cluster
    fn registered_node_ids(&self) -> Vec<i32>;
}

pub type ControllerHandle = Arc<dyn QuorumController>;
pub type ClusterControlHandle = Arc<dyn ClusterControl>;

/// Optional post-construction hook.
///
/// The registry invokes it at most once with the host handles, unchanged.
pub trait Initialize: Send + Sync {
    fn initialize(
        &self,
        controller: &ControllerHandle,
        cluster_control: &ClusterControlHandle,
    ) -> Result<(), PluginError>;
}

/// Dynamic configuration changes keyed by resource.
///
/// A value of `None` deletes the key.
pub type DynamicConfigChanges = BTreeMap<ConfigResource, BTreeMap<String, Option<String>>>;

/// Records the active controller must append to commit an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerResult {
    pub records: Vec<ApiMessageAndVersion>,
}

impl ControllerResult {
    pub fn of(records: Vec<ApiMessageAndVersion>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Dynamic reconfiguration error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconfigurationError {
    #[error("Config '{0}' is not dynamically reconfigurable")]
    UnknownConfig(String),

    #[error("Invalid value '{value}' for config '{name}': {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Resource {0:?} does not accept extension configs")]
    UnsupportedResource(ConfigResource),

    #[error("Only the active controller can reconfigure the extension")]
    NotActive,
}

/// Fingerprint/license control capability
///
/// At most one implementation is live per process. Implement this trait and
/// register the type with `register_fingerprint_manager!` to make it
/// discoverable.
///
/// # Example
///
/// ```ignore
/// pub struct MyManager { /* ... */ }
///
/// impl PluginCapability for MyManager {}
///
/// impl FingerPrintControlManager for MyManager {
///     fn install_id(&self) -> String { "install-1".to_string() }
///     // ...
/// }
///
/// fn create() -> Arc<dyn FingerPrintControlManager> { Arc::new(MyManager::new()) }
///
/// register_fingerprint_manager!("my-manager", create);
/// ```
pub trait FingerPrintControlManager: PluginCapability {
    /// Identity and version of this implementation
    fn manifest(&self) -> &ExtensionManifest;

    /// Identifier of this installation, deterministic across restarts
    fn install_id(&self) -> String;

    /// Run a license validity check
    ///
    /// May have side effects. Not called from the replay path.
    fn check_license(&self) -> bool;

    /// Begin periodic checks. Repeated calls must not start a second schedule;
    /// returns whether this call started one.
    fn start_schedule_check(&self) -> bool;

    /// Fold a fingerprint record into the implementation's state
    fn replay(&self, record: &FingerPrintRecord) -> bool;

    /// Fold a config record; returns whether the record was consumed
    fn replay_license_config(&self, record: &ConfigRecord) -> bool;

    /// Whether a fingerprint has been replayed since the last reset
    fn record_exists(&self) -> bool;

    /// Discard replayed state and continue from `image`
    ///
    /// Called before a snapshot is loaded. License configs return to their
    /// defaults; the snapshot's config records are replayed afterwards.
    fn reset_to(&self, _image: &FingerPrintImage) {}

    /// Config keys accepted by `update_dynamic_config`
    fn reconfigurable_configs(&self) -> BTreeSet<String>;

    /// Validate a change set without applying it
    fn validate_reconfiguration(
        &self,
        changes: &DynamicConfigChanges,
    ) -> Result<(), ReconfigurationError>;

    /// Validate and apply a change set, all or nothing
    ///
    /// On success returns the records that make the change durable. On error
    /// nothing is applied.
    fn update_dynamic_config(
        &self,
        changes: &DynamicConfigChanges,
    ) -> Result<ControllerResult, ReconfigurationError>;

    /// Optional initialization capability
    fn initializer(&self) -> Option<&dyn Initialize> {
        None
    }
}
