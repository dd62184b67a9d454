//! Metadata Records
//!
//! Typed records replayed through the controller's ordered apply path, and
//! the JSON-lines record log format used by the CLI.

pub mod log;
pub mod records;

pub use log::{RecordLogError, read_record_log};
pub use records::{
    ApiMessage, ApiMessageAndVersion, ConfigRecord, ConfigResource, ConfigResourceType,
    FingerPrintRecord, KeyValue, KvRecord, MetadataRecordType, OffsetAndEpoch,
    RegisterNodeRecord, RemoveKvRecord, TopicRecord,
};
