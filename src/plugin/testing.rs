//! Test doubles shared by the unit tests of this crate.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::capabilities::{
    ClusterControlHandle, ControllerHandle, ControllerResult, DynamicConfigChanges,
    FingerPrintControlManager, Initialize, PluginCapability, ReconfigurationError,
};
use super::isolation::PluginError;
use super::metadata::ExtensionManifest;
use crate::controller::{ClusterMembership, StandaloneController};
use crate::image::FingerPrintImage;
use crate::metadata::{ConfigRecord, FingerPrintRecord};

enum InitBehavior {
    Missing,
    Returns(Result<(), PluginError>),
    Panics,
}

/// Records every call it receives.
pub(crate) struct StubManager {
    manifest: ExtensionManifest,
    init: InitBehavior,
    init_calls: AtomicUsize,
    seen_cluster_id: Mutex<Option<String>>,
    schedule_started: AtomicBool,
    resets: AtomicUsize,
    fingerprints: Mutex<Vec<FingerPrintRecord>>,
    configs: Mutex<Vec<ConfigRecord>>,
}

impl StubManager {
    pub(crate) fn new(id: &str) -> Self {
        Self {
            manifest: ExtensionManifest::new(id, format!("Stub {}", id), "1.0.0"),
            init: InitBehavior::Missing,
            init_calls: AtomicUsize::new(0),
            seen_cluster_id: Mutex::new(None),
            schedule_started: AtomicBool::new(false),
            resets: AtomicUsize::new(0),
            fingerprints: Mutex::new(Vec::new()),
            configs: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_init(mut self, result: Result<(), PluginError>) -> Self {
        self.init = InitBehavior::Returns(result);
        self
    }

    pub(crate) fn with_init_panic(mut self) -> Self {
        self.init = InitBehavior::Panics;
        self
    }

    pub(crate) fn requiring_controller(mut self, req: &str) -> Self {
        self.manifest = self.manifest.with_controller_version(req);
        self
    }

    pub(crate) fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen_cluster_id(&self) -> Option<String> {
        self.seen_cluster_id.lock().clone()
    }

    pub(crate) fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub(crate) fn config_replays(&self) -> Vec<ConfigRecord> {
        self.configs.lock().clone()
    }

    pub(crate) fn fingerprint_replays(&self) -> Vec<FingerPrintRecord> {
        self.fingerprints.lock().clone()
    }
}

impl PluginCapability for StubManager {}

impl Initialize for StubManager {
    fn initialize(
        &self,
        controller: &ControllerHandle,
        _cluster_control: &ClusterControlHandle,
    ) -> Result<(), PluginError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_cluster_id.lock() = Some(controller.cluster_id().to_string());
        match &self.init {
            InitBehavior::Returns(result) => result.clone(),
            InitBehavior::Panics => panic!("init hook panicked"),
            InitBehavior::Missing => Ok(()),
        }
    }
}

impl FingerPrintControlManager for StubManager {
    fn manifest(&self) -> &ExtensionManifest {
        &self.manifest
    }

    fn install_id(&self) -> String {
        format!("stub-{}", self.manifest.id)
    }

    fn check_license(&self) -> bool {
        true
    }

    fn start_schedule_check(&self) -> bool {
        !self.schedule_started.swap(true, Ordering::SeqCst)
    }

    fn replay(&self, record: &FingerPrintRecord) -> bool {
        self.fingerprints.lock().push(*record);
        true
    }

    fn replay_license_config(&self, record: &ConfigRecord) -> bool {
        self.configs.lock().push(record.clone());
        true
    }

    fn record_exists(&self) -> bool {
        !self.fingerprints.lock().is_empty()
    }

    fn reset_to(&self, image: &FingerPrintImage) {
        self.resets.fetch_add(1, Ordering::SeqCst);
        let mut fingerprints = self.fingerprints.lock();
        fingerprints.clear();
        if !image.is_empty() {
            fingerprints.push(FingerPrintRecord::new(
                image.max_node_count(),
                image.created_timestamp(),
            ));
        }
        self.configs.lock().clear();
    }

    fn reconfigurable_configs(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn validate_reconfiguration(
        &self,
        changes: &DynamicConfigChanges,
    ) -> Result<(), ReconfigurationError> {
        match changes.values().flat_map(|c| c.keys()).next() {
            Some(name) => Err(ReconfigurationError::UnknownConfig(name.clone())),
            None => Ok(()),
        }
    }

    fn update_dynamic_config(
        &self,
        changes: &DynamicConfigChanges,
    ) -> Result<ControllerResult, ReconfigurationError> {
        self.validate_reconfiguration(changes)?;
        Ok(ControllerResult::default())
    }

    fn initializer(&self) -> Option<&dyn Initialize> {
        match self.init {
            InitBehavior::Missing => None,
            _ => Some(self),
        }
    }
}

/// Host handles with a fixed clock and membership.
pub(crate) fn fixed_handles(
    cluster_id: &str,
    time_ms: i64,
    node_ids: &[i32],
) -> (ControllerHandle, ClusterControlHandle) {
    let controller: ControllerHandle =
        Arc::new(StandaloneController::new(cluster_id).with_fixed_time(time_ms));
    let cluster: ClusterControlHandle =
        Arc::new(ClusterMembership::with_nodes(node_ids.iter().copied()));
    (controller, cluster)
}
