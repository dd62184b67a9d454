//! Shared helpers for the integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fingerprint_control::metadata::{ApiMessage, ApiMessageAndVersion};
use fingerprint_control::plugin::prelude::*;

/// Manager that records what it was given and nothing more.
pub struct RecordingManager {
    manifest: ExtensionManifest,
    pub fingerprints: Mutex<Vec<FingerPrintRecord>>,
    pub configs: Mutex<Vec<ConfigRecord>>,
}

impl RecordingManager {
    pub fn new(id: &str) -> Self {
        Self {
            manifest: ExtensionManifest::new(id, format!("Recording {}", id), "1.0.0"),
            fingerprints: Mutex::new(Vec::new()),
            configs: Mutex::new(Vec::new()),
        }
    }
}

impl PluginCapability for RecordingManager {}

impl FingerPrintControlManager for RecordingManager {
    fn manifest(&self) -> &ExtensionManifest {
        &self.manifest
    }

    fn install_id(&self) -> String {
        self.manifest.id.clone()
    }

    fn check_license(&self) -> bool {
        true
    }

    fn start_schedule_check(&self) -> bool {
        false
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

    fn reset_to(&self, _image: &FingerPrintImage) {
        self.fingerprints.lock().clear();
        self.configs.lock().clear();
    }

    fn reconfigurable_configs(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn validate_reconfiguration(
        &self,
        _changes: &DynamicConfigChanges,
    ) -> Result<(), ReconfigurationError> {
        Ok(())
    }

    fn update_dynamic_config(
        &self,
        _changes: &DynamicConfigChanges,
    ) -> Result<ControllerResult, ReconfigurationError> {
        Ok(ControllerResult::default())
    }
}

/// Candidate that counts how often its factory runs.
pub fn counting_candidate(id: &'static str, constructed: Arc<AtomicUsize>) -> Candidate {
    Candidate::new(id, move || {
        constructed.fetch_add(1, Ordering::SeqCst);
        Arc::new(RecordingManager::new(id)) as Arc<dyn FingerPrintControlManager>
    })
}

pub fn record(message: impl Into<ApiMessage>) -> ApiMessageAndVersion {
    ApiMessageAndVersion::new(message, 0)
}
