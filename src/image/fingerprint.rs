//! Fingerprint image and delta.
//!
//! `FingerPrintImage` is the immutable snapshot of the extension's durable
//! fields. `FingerPrintDelta` accumulates replayed records on top of a base
//! image and produces the next image on `apply()`.

use super::writer::ImageWriter;
use crate::metadata::{ApiMessageAndVersion, FingerPrintRecord};

/// Schema version the fingerprint record is written with.
pub const FINGERPRINT_RECORD_VERSION: i16 = 0;

/// Immutable fingerprint snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FingerPrintImage {
    max_node_count: i32,
    created_timestamp: i64,
}

impl FingerPrintImage {
    pub const EMPTY: FingerPrintImage = FingerPrintImage {
        max_node_count: 0,
        created_timestamp: 0,
    };

    pub(crate) const fn new(max_node_count: i32, created_timestamp: i64) -> Self {
        Self {
            max_node_count,
            created_timestamp,
        }
    }

    /// True exactly when every field holds its zero value.
    pub fn is_empty(&self) -> bool {
        self.max_node_count == 0 && self.created_timestamp == 0
    }

    pub fn max_node_count(&self) -> i32 {
        self.max_node_count
    }

    pub fn created_timestamp(&self) -> i64 {
        self.created_timestamp
    }

    /// Emit this image into a snapshot stream.
    ///
    /// An empty image writes nothing, so an unconfigured extension leaves no
    /// trace in the snapshot.
    pub fn write(&self, writer: &mut dyn ImageWriter) {
        if !self.is_empty() {
            writer.write(ApiMessageAndVersion::new(
                FingerPrintRecord::new(self.max_node_count, self.created_timestamp),
                FINGERPRINT_RECORD_VERSION,
            ));
        }
    }
}

impl std::fmt::Display for FingerPrintImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FingerPrintImage(maxNodeCount={}, createdTimestamp={})",
            self.max_node_count, self.created_timestamp
        )
    }
}

/// Pending changes on top of a base [`FingerPrintImage`].
#[derive(Debug, Clone)]
pub struct FingerPrintDelta<'a> {
    image: &'a FingerPrintImage,
    max_node_count: Option<i32>,
    created_timestamp: Option<i64>,
}

impl<'a> FingerPrintDelta<'a> {
    pub fn new(image: &'a FingerPrintImage) -> Self {
        Self {
            image,
            max_node_count: None,
            created_timestamp: None,
        }
    }

    pub fn image(&self) -> &'a FingerPrintImage {
        self.image
    }

    /// Fold a record in. Later records overwrite earlier ones.
    pub fn replay(&mut self, record: &FingerPrintRecord) {
        self.max_node_count = Some(record.max_node_count);
        self.created_timestamp = Some(record.created_timestamp);
    }

    /// Whether any record has been folded since construction.
    pub fn has_changes(&self) -> bool {
        self.max_node_count.is_some() || self.created_timestamp.is_some()
    }

    /// Build the next image. Unset fields pass the base value through.
    pub fn apply(&self) -> FingerPrintImage {
        FingerPrintImage::new(
            self.max_node_count.unwrap_or(self.image.max_node_count()),
            self.created_timestamp
                .unwrap_or(self.image.created_timestamp()),
        )
    }
}
