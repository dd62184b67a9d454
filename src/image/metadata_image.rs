//! Aggregate metadata image as seen by a replica.
//!
//! Only the extension-owned parts of the image live here; the rest of the
//! metadata image belongs to the host.

use super::config::{ConfigDelta, ConfigImage};
use super::fingerprint::{FingerPrintDelta, FingerPrintImage};
use super::writer::ImageWriter;
use crate::metadata::ApiMessage;

/// Immutable image of replayed metadata up to `highest_offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataImage {
    fingerprint: FingerPrintImage,
    config: ConfigImage,
    highest_offset: i64,
}

impl MetadataImage {
    pub const EMPTY: MetadataImage = MetadataImage {
        fingerprint: FingerPrintImage::EMPTY,
        config: ConfigImage::EMPTY,
        highest_offset: -1,
    };

    pub fn fingerprint(&self) -> &FingerPrintImage {
        &self.fingerprint
    }

    /// Cluster-level config entries
    pub fn config(&self) -> &ConfigImage {
        &self.config
    }

    /// Offset of the last record folded into this image, `-1` if none.
    pub fn highest_offset(&self) -> i64 {
        self.highest_offset
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprint.is_empty() && self.config.is_empty()
    }

    /// Config records come first so the fingerprint is replayed last.
    pub fn write(&self, writer: &mut dyn ImageWriter) {
        self.config.write(writer);
        self.fingerprint.write(writer);
    }
}

impl Default for MetadataImage {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Accumulates one batch of records on top of a [`MetadataImage`].
#[derive(Debug)]
pub struct MetadataDelta<'a> {
    image: &'a MetadataImage,
    fingerprint: Option<FingerPrintDelta<'a>>,
    config: Option<ConfigDelta<'a>>,
    highest_offset: Option<i64>,
}

impl<'a> MetadataDelta<'a> {
    pub fn new(image: &'a MetadataImage) -> Self {
        Self {
            image,
            fingerprint: None,
            config: None,
            highest_offset: None,
        }
    }

    /// Fold a record at `offset`. Returns whether the record touched the image.
    pub fn replay(&mut self, message: &ApiMessage, offset: i64) -> bool {
        self.highest_offset = Some(offset);
        match message {
            ApiMessage::FingerPrint(record) => {
                let image = self.image;
                self.fingerprint
                    .get_or_insert_with(move || FingerPrintDelta::new(&image.fingerprint))
                    .replay(record);
                true
            }
            ApiMessage::Config(record) => {
                if !ConfigDelta::is_cluster_record(record) {
                    return false;
                }
                let image = self.image;
                self.config
                    .get_or_insert_with(move || ConfigDelta::new(&image.config))
                    .replay(record)
            }
            _ => false,
        }
    }

    /// Record that `offset` was consumed by someone other than the image.
    pub fn advance_to(&mut self, offset: i64) {
        self.highest_offset = Some(offset);
    }

    pub fn apply(&self) -> MetadataImage {
        let fingerprint = match &self.fingerprint {
            Some(delta) => delta.apply(),
            None => self.image.fingerprint,
        };
        let config = match &self.config {
            Some(delta) => delta.apply(),
            None => self.image.config.clone(),
        };
        MetadataImage {
            fingerprint,
            config,
            highest_offset: self.highest_offset.unwrap_or(self.image.highest_offset),
        }
    }
}
