//! JSON-lines record log reader.
//!
//! One `ApiMessageAndVersion` per line. Blank lines and lines starting with
//! `#` are skipped. The zero-based index of each record among the non-skipped
//! lines is its log offset.

use std::io::BufRead;
use std::path::Path;

use super::records::ApiMessageAndVersion;

#[derive(Debug, thiserror::Error)]
pub enum RecordLogError {
    #[error("Failed to read record log: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record on line {line}: {error}")]
    Malformed { line: usize, error: String },
}

/// Parse every record from a reader, in order.
pub fn parse_record_log(reader: impl BufRead) -> Result<Vec<ApiMessageAndVersion>, RecordLogError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record = serde_json::from_str(trimmed).map_err(|e| RecordLogError::Malformed {
            line: index + 1,
            error: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Read a record log file from disk.
pub fn read_record_log(path: &Path) -> Result<Vec<ApiMessageAndVersion>, RecordLogError> {
    let file = std::fs::File::open(path)?;
    parse_record_log(std::io::BufReader::new(file))
}
