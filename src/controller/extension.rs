//! Controller Extension Dispatcher
//!
//! The single entry point the controller's replay path calls for every
//! record. Record kinds owned by extension managers are forwarded; anything
//! else is reported as not handled so the host can route it elsewhere.

use std::sync::Arc;

use super::failover::FailoverControl;
use crate::metadata::{ApiMessage, MetadataRecordType, OffsetAndEpoch};
use crate::plugin::FingerPrintControlManager;

/// Hook the controller's replay loop calls for each record.
///
/// Called exactly once per record, in log order, from the thread that owns
/// log application.
pub trait QuorumControllerExtension: Send + Sync {
    /// Returns whether the record was handled by this extension.
    fn replay(
        &self,
        record_type: MetadataRecordType,
        message: &ApiMessage,
        snapshot_id: Option<OffsetAndEpoch>,
        batch_last_offset: i64,
    ) -> bool;
}

/// Routes KV records to failover control and config records to the
/// fingerprint manager, when one is present.
pub struct DefaultQuorumControllerExtension {
    failover_control: Arc<dyn FailoverControl>,
    fingerprint_control: Option<Arc<dyn FingerPrintControlManager>>,
}

impl DefaultQuorumControllerExtension {
    pub fn new(
        failover_control: Arc<dyn FailoverControl>,
        fingerprint_control: Option<Arc<dyn FingerPrintControlManager>>,
    ) -> Self {
        Self {
            failover_control,
            fingerprint_control,
        }
    }

    pub fn fingerprint_control(&self) -> Option<&Arc<dyn FingerPrintControlManager>> {
        self.fingerprint_control.as_ref()
    }
}

impl QuorumControllerExtension for DefaultQuorumControllerExtension {
    fn replay(
        &self,
        record_type: MetadataRecordType,
        message: &ApiMessage,
        snapshot_id: Option<OffsetAndEpoch>,
        batch_last_offset: i64,
    ) -> bool {
        match (record_type, message) {
            (MetadataRecordType::KvRecord, ApiMessage::KvRecord(record)) => {
                self.failover_control.replay(record);
                true
            }
            (MetadataRecordType::Config, ApiMessage::Config(record)) => {
                match &self.fingerprint_control {
                    Some(manager) => {
                        manager.replay_license_config(record);
                        true
                    }
                    None => false,
                }
            }
            (MetadataRecordType::KvRecord | MetadataRecordType::Config, other) => {
                tracing::error!(
                    record_type = %record_type,
                    actual = %other.record_type(),
                    ?snapshot_id,
                    batch_last_offset,
                    "Record type does not match message, skipping"
                );
                false
            }
            _ => false,
        }
    }
}
