//! Node-quota license manager.
//!
//! The license holds while the number of registered nodes stays within the
//! `max_node_count` of the latest fingerprint. A cluster without any
//! fingerprint is unrestricted.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::NODE_QUOTA_ID;
use crate::image::{
    CONFIG_RECORD_VERSION, FINGERPRINT_RECORD_VERSION, FingerPrintDelta, FingerPrintImage,
};
use crate::metadata::{
    ApiMessageAndVersion, ConfigRecord, ConfigResource, ConfigResourceType, FingerPrintRecord,
};
use crate::plugin::capabilities::{
    ClusterControlHandle, ControllerHandle, ControllerResult, DynamicConfigChanges,
    FingerPrintControlManager, Initialize, PluginCapability, ReconfigurationError,
};
use crate::plugin::isolation::PluginError;
use crate::plugin::metadata::ExtensionManifest;

pub const MAX_NODE_COUNT_KEY: &str = "license.max.node.count";
pub const CHECK_INTERVAL_KEY: &str = "license.check.interval.ms";

pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 60_000;
pub const MIN_CHECK_INTERVAL_MS: u64 = 1_000;

/// Install id of a cluster: the first 32 hex chars of SHA-256(cluster id).
pub fn install_id_for(cluster_id: &str) -> String {
    let digest = Sha256::digest(cluster_id.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(32);
    id
}

struct Handles {
    controller: ControllerHandle,
    cluster_control: ClusterControlHandle,
}

/// A running check task and the token that stops it.
struct Schedule {
    task: JoinHandle<()>,
    shutdown: CancellationToken,
}

pub struct NodeQuotaManager {
    manifest: ExtensionManifest,
    this: Weak<NodeQuotaManager>,
    handles: OnceCell<Handles>,
    fingerprint: Mutex<FingerPrintImage>,
    check_interval_ms: AtomicU64,
    checks_run: AtomicU64,
    schedule: Mutex<Option<Schedule>>,
}

impl NodeQuotaManager {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            manifest: ExtensionManifest::new(
                NODE_QUOTA_ID,
                "Node quota license manager",
                env!("CARGO_PKG_VERSION"),
            ),
            this: this.clone(),
            handles: OnceCell::new(),
            fingerprint: Mutex::new(FingerPrintImage::EMPTY),
            check_interval_ms: AtomicU64::new(DEFAULT_CHECK_INTERVAL_MS),
            checks_run: AtomicU64::new(0),
            schedule: Mutex::new(None),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.handles.get().is_some()
    }

    /// Latest replayed fingerprint
    pub fn fingerprint(&self) -> FingerPrintImage {
        *self.fingerprint.lock()
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms.load(Ordering::Acquire))
    }

    /// Number of license checks run so far
    pub fn checks_run(&self) -> u64 {
        self.checks_run.load(Ordering::Relaxed)
    }

    /// Stop the scheduled check task, if one is running.
    ///
    /// A later `start_schedule_check` starts a new task.
    pub fn stop_schedule_check(&self) {
        if let Some(schedule) = self.schedule.lock().take() {
            schedule.shutdown.cancel();
            tracing::info!("Stopped scheduled license checks");
        }
    }

    /// Whether a check task is currently running
    pub fn is_scheduled(&self) -> bool {
        self.schedule
            .lock()
            .as_ref()
            .is_some_and(|schedule| !schedule.task.is_finished())
    }

    fn parse_max_node_count(value: &str) -> Result<i32, ReconfigurationError> {
        let invalid = |reason: &str| ReconfigurationError::InvalidValue {
            name: MAX_NODE_COUNT_KEY.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let count = value
            .trim()
            .parse::<i32>()
            .map_err(|_| invalid("must be a 32-bit integer"))?;
        if count < 0 {
            return Err(invalid("must be non-negative"));
        }
        Ok(count)
    }

    fn parse_check_interval(value: &str) -> Result<u64, ReconfigurationError> {
        let invalid = |reason: String| ReconfigurationError::InvalidValue {
            name: CHECK_INTERVAL_KEY.to_string(),
            value: value.to_string(),
            reason,
        };
        let interval = value
            .trim()
            .parse::<u64>()
            .map_err(|_| invalid("must be a positive integer".to_string()))?;
        if interval < MIN_CHECK_INTERVAL_MS {
            return Err(invalid(format!("must be at least {}", MIN_CHECK_INTERVAL_MS)));
        }
        Ok(interval)
    }

    fn is_cluster_resource(resource_type: ConfigResourceType, name: &str) -> bool {
        resource_type == ConfigResourceType::Cluster && name.is_empty()
    }

    fn spawn_schedule(&self, runtime: tokio::runtime::Handle) -> Schedule {
        let this = self.this.clone();
        let shutdown = CancellationToken::new();
        let cancelled = shutdown.clone();
        let mut period = self.check_interval();

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(manager) = this.upgrade() else {
                    break;
                };
                let valid = manager.check_license();
                tracing::debug!(valid, "Scheduled license check completed");

                let configured = manager.check_interval();
                if configured != period {
                    period = configured;
                    ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
                }
            }
            tracing::debug!("License check schedule stopped");
        });
        Schedule { task, shutdown }
    }
}

impl Drop for NodeQuotaManager {
    fn drop(&mut self) {
        if let Some(schedule) = self.schedule.get_mut().take() {
            schedule.shutdown.cancel();
        }
    }
}

impl PluginCapability for NodeQuotaManager {}

impl Initialize for NodeQuotaManager {
    fn initialize(
        &self,
        controller: &ControllerHandle,
        cluster_control: &ClusterControlHandle,
    ) -> Result<(), PluginError> {
        self.handles
            .set(Handles {
                controller: Arc::clone(controller),
                cluster_control: Arc::clone(cluster_control),
            })
            .map_err(|_| PluginError::InitializationFailed("already initialized".to_string()))?;
        tracing::info!(
            cluster_id = %controller.cluster_id(),
            install_id = %install_id_for(controller.cluster_id()),
            "Node quota manager attached to controller"
        );
        Ok(())
    }
}

impl FingerPrintControlManager for NodeQuotaManager {
    fn manifest(&self) -> &ExtensionManifest {
        &self.manifest
    }

    /// Empty until the manager is attached to a controller.
    fn install_id(&self) -> String {
        self.handles
            .get()
            .map(|handles| install_id_for(handles.controller.cluster_id()))
            .unwrap_or_default()
    }

    fn check_license(&self) -> bool {
        self.checks_run.fetch_add(1, Ordering::Relaxed);
        let Some(handles) = self.handles.get() else {
            tracing::warn!("Node quota manager is not initialized, cannot count nodes");
            return false;
        };

        let fingerprint = self.fingerprint();
        if fingerprint.is_empty() {
            return true;
        }

        let registered = handles.cluster_control.registered_node_ids().len();
        let allowed = usize::try_from(fingerprint.max_node_count()).unwrap_or(0);
        if registered > allowed {
            tracing::warn!(
                registered,
                max_node_count = fingerprint.max_node_count(),
                "Registered node count exceeds license"
            );
            return false;
        }
        true
    }

    fn start_schedule_check(&self) -> bool {
        let mut schedule = self.schedule.lock();
        if let Some(running) = schedule.as_ref() {
            if !running.task.is_finished() {
                return false;
            }
            tracing::debug!("Previous license check task has exited, starting a new one");
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime available, scheduled license checks not started");
            return false;
        };
        *schedule = Some(self.spawn_schedule(runtime));
        tracing::info!(
            interval_ms = self.check_interval().as_millis() as u64,
            "Started scheduled license checks"
        );
        true
    }

    fn replay(&self, record: &FingerPrintRecord) -> bool {
        let mut current = self.fingerprint.lock();
        let base = *current;
        let mut delta = FingerPrintDelta::new(&base);
        delta.replay(record);
        *current = delta.apply();
        true
    }

    fn replay_license_config(&self, record: &ConfigRecord) -> bool {
        if !Self::is_cluster_resource(record.resource_type, &record.resource_name) {
            return false;
        }
        match record.name.as_str() {
            CHECK_INTERVAL_KEY => {
                let interval = match record.value.as_deref() {
                    None => DEFAULT_CHECK_INTERVAL_MS,
                    Some(value) => match Self::parse_check_interval(value) {
                        Ok(interval) => interval,
                        Err(e) => {
                            tracing::warn!(error = %e, "Ignoring invalid replayed license config");
                            return true;
                        }
                    },
                };
                self.check_interval_ms.store(interval, Ordering::Release);
                true
            }
            // Carried by the fingerprint record written alongside it
            MAX_NODE_COUNT_KEY => true,
            _ => false,
        }
    }

    fn record_exists(&self) -> bool {
        !self.fingerprint.lock().is_empty()
    }

    fn reset_to(&self, image: &FingerPrintImage) {
        *self.fingerprint.lock() = *image;
        self.check_interval_ms
            .store(DEFAULT_CHECK_INTERVAL_MS, Ordering::Release);
    }

    fn reconfigurable_configs(&self) -> BTreeSet<String> {
        [MAX_NODE_COUNT_KEY, CHECK_INTERVAL_KEY]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn validate_reconfiguration(
        &self,
        changes: &DynamicConfigChanges,
    ) -> Result<(), ReconfigurationError> {
        for (resource, entries) in changes {
            if entries.is_empty() {
                continue;
            }
            if !Self::is_cluster_resource(resource.resource_type, &resource.name) {
                return Err(ReconfigurationError::UnsupportedResource(resource.clone()));
            }
            for (name, value) in entries {
                match (name.as_str(), value.as_deref()) {
                    (MAX_NODE_COUNT_KEY, Some(value)) => {
                        Self::parse_max_node_count(value)?;
                    }
                    (MAX_NODE_COUNT_KEY, None) => {
                        return Err(ReconfigurationError::InvalidValue {
                            name: name.clone(),
                            value: String::new(),
                            reason: "cannot be deleted".to_string(),
                        });
                    }
                    (CHECK_INTERVAL_KEY, Some(value)) => {
                        Self::parse_check_interval(value)?;
                    }
                    (CHECK_INTERVAL_KEY, None) => {}
                    _ => return Err(ReconfigurationError::UnknownConfig(name.clone())),
                }
            }
        }
        Ok(())
    }

    fn update_dynamic_config(
        &self,
        changes: &DynamicConfigChanges,
    ) -> Result<ControllerResult, ReconfigurationError> {
        let handles = self.handles.get().ok_or(ReconfigurationError::NotActive)?;
        if !handles.controller.is_active() {
            return Err(ReconfigurationError::NotActive);
        }
        self.validate_reconfiguration(changes)?;

        let cluster = ConfigResource::cluster();
        let mut merged: BTreeMap<&str, Option<&str>> = BTreeMap::new();
        for entries in changes.values() {
            for (name, value) in entries {
                merged.insert(name.as_str(), value.as_deref());
            }
        }

        let mut records = Vec::with_capacity(merged.len() + 1);
        for (name, value) in &merged {
            let record = match value {
                Some(value) => ConfigRecord::set(&cluster, *name, *value),
                None => ConfigRecord::delete(&cluster, *name),
            };
            records.push(ApiMessageAndVersion::new(record, CONFIG_RECORD_VERSION));
        }

        if let Some(Some(value)) = merged.get(MAX_NODE_COUNT_KEY) {
            let max_node_count = Self::parse_max_node_count(value)?;
            let current = self.fingerprint();
            let created_timestamp = if current.is_empty() {
                handles.controller.time_ms()
            } else {
                current.created_timestamp()
            };
            records.push(ApiMessageAndVersion::new(
                FingerPrintRecord::new(max_node_count, created_timestamp),
                FINGERPRINT_RECORD_VERSION,
            ));
        }

        tracing::info!(records = records.len(), "Prepared license reconfiguration");
        Ok(ControllerResult::of(records))
    }

    fn initializer(&self) -> Option<&dyn Initialize> {
        Some(self)
    }
}

impl std::fmt::Debug for NodeQuotaManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeQuotaManager")
            .field("initialized", &self.is_initialized())
            .field("fingerprint", &self.fingerprint())
            .field("check_interval", &self.check_interval())
            .finish()
    }
}
