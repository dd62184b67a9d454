//! Snapshot stream writers.

use crate::metadata::ApiMessageAndVersion;

/// Sink for the records that make up a metadata snapshot.
pub trait ImageWriter {
    fn write(&mut self, record: ApiMessageAndVersion);
}

/// Collects written records in memory, in write order.
#[derive(Debug, Default)]
pub struct RecordListWriter {
    records: Vec<ApiMessageAndVersion>,
}

impl RecordListWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ApiMessageAndVersion] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ApiMessageAndVersion> {
        self.records
    }
}

impl ImageWriter for RecordListWriter {
    fn write(&mut self, record: ApiMessageAndVersion) {
        self.records.push(record);
    }
}
