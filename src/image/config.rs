//! Cluster-level configuration carried in the image.
//!
//! Only entries on the cluster resource are kept. They are written back into
//! snapshots as version-0 config records so a bootstrapped replica replays
//! the same license settings as one that followed the log.

use std::collections::BTreeMap;

use super::writer::ImageWriter;
use crate::metadata::{ApiMessageAndVersion, ConfigRecord, ConfigResource, ConfigResourceType};

/// Schema version config records are written with.
pub const CONFIG_RECORD_VERSION: i16 = 0;

/// Immutable map of cluster config name to value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigImage {
    entries: BTreeMap<String, String>,
}

impl ConfigImage {
    pub const EMPTY: ConfigImage = ConfigImage {
        entries: BTreeMap::new(),
    };

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Emit one set record per entry, in name order.
    pub fn write(&self, writer: &mut dyn ImageWriter) {
        let cluster = ConfigResource::cluster();
        for (name, value) in &self.entries {
            writer.write(ApiMessageAndVersion::new(
                ConfigRecord::set(&cluster, name.as_str(), value.as_str()),
                CONFIG_RECORD_VERSION,
            ));
        }
    }
}

/// Pending cluster config changes on top of a base [`ConfigImage`].
///
/// `None` marks a deletion.
#[derive(Debug, Clone)]
pub struct ConfigDelta<'a> {
    image: &'a ConfigImage,
    changes: BTreeMap<String, Option<String>>,
}

impl<'a> ConfigDelta<'a> {
    pub fn new(image: &'a ConfigImage) -> Self {
        Self {
            image,
            changes: BTreeMap::new(),
        }
    }

    /// Whether `record` targets the cluster resource.
    pub fn is_cluster_record(record: &ConfigRecord) -> bool {
        record.resource_type == ConfigResourceType::Cluster && record.resource_name.is_empty()
    }

    /// Fold a record in. Returns false for records on other resources.
    pub fn replay(&mut self, record: &ConfigRecord) -> bool {
        if !Self::is_cluster_record(record) {
            return false;
        }
        self.changes.insert(record.name.clone(), record.value.clone());
        true
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn apply(&self) -> ConfigImage {
        let mut entries = self.image.entries.clone();
        for (name, value) in &self.changes {
            match value {
                Some(value) => {
                    entries.insert(name.clone(), value.clone());
                }
                None => {
                    entries.remove(name);
                }
            }
        }
        ConfigImage { entries }
    }
}
