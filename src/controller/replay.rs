//! Ordered application of metadata batches.
//!
//! Every record is offered to the extension dispatcher first. Records it
//! does not handle are folded here: node registrations into membership and
//! fingerprints into the image delta and the fingerprint manager. Cluster
//! config records reach the image delta whether or not the dispatcher took
//! them. The delta is applied once per batch.

use std::sync::Arc;

use super::extension::QuorumControllerExtension;
use super::handles::ClusterMembership;
use crate::image::{FingerPrintImage, MetadataDelta, MetadataImage, RecordListWriter};
use crate::metadata::{ApiMessage, ApiMessageAndVersion, OffsetAndEpoch};
use crate::plugin::FingerPrintControlManager;

/// Counters for a single applied batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub records: usize,
    pub handled_by_extension: usize,
    pub fingerprints: usize,
    pub last_offset: i64,
}

pub struct ReplayLoop {
    extension: Arc<dyn QuorumControllerExtension>,
    fingerprint_control: Option<Arc<dyn FingerPrintControlManager>>,
    membership: Arc<ClusterMembership>,
    image: MetadataImage,
}

impl ReplayLoop {
    pub fn new(
        extension: Arc<dyn QuorumControllerExtension>,
        fingerprint_control: Option<Arc<dyn FingerPrintControlManager>>,
        membership: Arc<ClusterMembership>,
    ) -> Self {
        Self {
            extension,
            fingerprint_control,
            membership,
            image: MetadataImage::EMPTY,
        }
    }

    pub fn image(&self) -> &MetadataImage {
        &self.image
    }

    pub fn membership(&self) -> &Arc<ClusterMembership> {
        &self.membership
    }

    /// Offset the next appended record will receive.
    pub fn next_offset(&self) -> i64 {
        self.image.highest_offset() + 1
    }

    /// Apply records appended to the log after the current image.
    pub fn apply_batch(&mut self, batch: &[ApiMessageAndVersion]) -> BatchSummary {
        let first_offset = self.next_offset();
        self.apply_from(batch, first_offset, None)
    }

    /// Rebuild state from a snapshot record stream covering `snapshot_id`.
    ///
    /// The snapshot replaces the current image and the manager's replayed
    /// state; records are numbered so the last one lands on the snapshot
    /// offset.
    pub fn load_snapshot(
        &mut self,
        records: &[ApiMessageAndVersion],
        snapshot_id: OffsetAndEpoch,
    ) -> BatchSummary {
        let first_offset = snapshot_id.offset + 1 - records.len() as i64;
        if let Some(manager) = &self.fingerprint_control {
            manager.reset_to(&FingerPrintImage::EMPTY);
        }
        self.image = MetadataImage::EMPTY;
        let summary = self.apply_from(records, first_offset, Some(snapshot_id));
        if records.is_empty() {
            let empty = MetadataImage::EMPTY;
            let mut delta = MetadataDelta::new(&empty);
            delta.advance_to(snapshot_id.offset);
            self.image = delta.apply();
        }
        tracing::info!(
            offset = snapshot_id.offset,
            epoch = snapshot_id.epoch,
            records = summary.records,
            "Loaded metadata snapshot"
        );
        summary
    }

    /// Records that reproduce the current image when loaded as a snapshot.
    pub fn snapshot_records(&self) -> Vec<ApiMessageAndVersion> {
        let mut writer = RecordListWriter::new();
        self.image.write(&mut writer);
        writer.into_records()
    }

    fn apply_from(
        &mut self,
        batch: &[ApiMessageAndVersion],
        first_offset: i64,
        snapshot_id: Option<OffsetAndEpoch>,
    ) -> BatchSummary {
        let batch_last_offset = first_offset + batch.len() as i64 - 1;
        let mut summary = BatchSummary {
            last_offset: batch_last_offset,
            ..BatchSummary::default()
        };
        if batch.is_empty() {
            return summary;
        }

        let mut delta = MetadataDelta::new(&self.image);
        for (index, record) in batch.iter().enumerate() {
            let offset = first_offset + index as i64;
            let message = &record.message;
            summary.records += 1;

            if self.extension.replay(
                message.record_type(),
                message,
                snapshot_id,
                batch_last_offset,
            ) {
                summary.handled_by_extension += 1;
                // Config records also belong to the image
                delta.replay(message, offset);
                continue;
            }

            match message {
                ApiMessage::RegisterNode(node) => {
                    self.membership.replay(node);
                    delta.advance_to(offset);
                }
                ApiMessage::FingerPrint(fingerprint) => {
                    delta.replay(message, offset);
                    if let Some(manager) = &self.fingerprint_control {
                        manager.replay(fingerprint);
                    }
                    summary.fingerprints += 1;
                }
                _ => {
                    delta.replay(message, offset);
                }
            }
        }

        let next = delta.apply();
        self.image = next;
        tracing::debug!(
            records = summary.records,
            last_offset = batch_last_offset,
            "Applied metadata batch"
        );
        summary
    }
}
