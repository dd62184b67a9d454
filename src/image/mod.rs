//! Metadata Images
//!
//! Immutable snapshots and the deltas that produce them. A replica that folds
//! the same record prefix reaches the same image however the records were
//! split into batches.

pub mod config;
pub mod fingerprint;
pub mod metadata_image;
pub mod writer;

pub use config::{CONFIG_RECORD_VERSION, ConfigDelta, ConfigImage};
pub use fingerprint::{FINGERPRINT_RECORD_VERSION, FingerPrintDelta, FingerPrintImage};
pub use metadata_image::{MetadataDelta, MetadataImage};
pub use writer::{ImageWriter, RecordListWriter};
