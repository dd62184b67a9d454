//! Metadata record types replayed from the controller log.
//!
//! Records are plain data. Every state change in the controller derives from
//! one of these, applied strictly in log order.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Kind of a metadata record as carried in the log framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataRecordType {
    RegisterNode,
    Topic,
    Config,
    KvRecord,
    RemoveKvRecord,
    FingerPrint,
    NoOp,
}

impl MetadataRecordType {
    /// Stable on-log identifier.
    pub const fn id(&self) -> i16 {
        match self {
            Self::RegisterNode => 0,
            Self::Topic => 2,
            Self::Config => 4,
            Self::NoOp => 20,
            Self::KvRecord => 516,
            Self::RemoveKvRecord => 517,
            Self::FingerPrint => 530,
        }
    }

    /// Resolve an on-log identifier. Unknown ids yield `None`.
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(Self::RegisterNode),
            2 => Some(Self::Topic),
            4 => Some(Self::Config),
            20 => Some(Self::NoOp),
            516 => Some(Self::KvRecord),
            517 => Some(Self::RemoveKvRecord),
            530 => Some(Self::FingerPrint),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetadataRecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataRecordType::RegisterNode => write!(f, "register_node"),
            MetadataRecordType::Topic => write!(f, "topic"),
            MetadataRecordType::Config => write!(f, "config"),
            MetadataRecordType::KvRecord => write!(f, "kv_record"),
            MetadataRecordType::RemoveKvRecord => write!(f, "remove_kv_record"),
            MetadataRecordType::FingerPrint => write!(f, "fingerprint"),
            MetadataRecordType::NoOp => write!(f, "no_op"),
        }
    }
}

/// Persisted fingerprint of the extension's licensing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerPrintRecord {
    pub max_node_count: i32,
    pub created_timestamp: i64,
}

impl FingerPrintRecord {
    pub fn new(max_node_count: i32, created_timestamp: i64) -> Self {
        Self {
            max_node_count,
            created_timestamp,
        }
    }
}

/// Resource kinds a config record can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigResourceType {
    Cluster,
    Broker,
    Topic,
}

/// A config resource. Cluster-wide defaults use an empty name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigResource {
    pub resource_type: ConfigResourceType,
    pub name: String,
}

impl ConfigResource {
    pub fn new(resource_type: ConfigResourceType, name: impl Into<String>) -> Self {
        Self {
            resource_type,
            name: name.into(),
        }
    }

    /// The cluster-wide default resource.
    pub fn cluster() -> Self {
        Self::new(ConfigResourceType::Cluster, "")
    }
}

/// Set or delete a single configuration key.
///
/// A `value` of `None` removes the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    pub resource_type: ConfigResourceType,
    #[serde(default)]
    pub resource_name: String,
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl ConfigRecord {
    pub fn set(resource: &ConfigResource, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            resource_type: resource.resource_type,
            resource_name: resource.name.clone(),
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn delete(resource: &ConfigResource, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource.resource_type,
            resource_name: resource.name.clone(),
            name: name.into(),
            value: None,
        }
    }

    pub fn resource(&self) -> ConfigResource {
        ConfigResource::new(self.resource_type, self.resource_name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: Bytes,
}

/// Upsert of opaque key/value pairs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KvRecord {
    pub key_values: Vec<KeyValue>,
}

impl KvRecord {
    pub fn single(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key_values: vec![KeyValue {
                key: key.into(),
                value: value.into(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoveKvRecord {
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterNodeRecord {
    pub node_id: i32,
    #[serde(default)]
    pub node_epoch: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub name: String,
    pub topic_id: String,
}

/// A typed metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ApiMessage {
    RegisterNode(RegisterNodeRecord),
    Topic(TopicRecord),
    Config(ConfigRecord),
    KvRecord(KvRecord),
    RemoveKvRecord(RemoveKvRecord),
    FingerPrint(FingerPrintRecord),
    NoOp,
}

impl ApiMessage {
    pub fn record_type(&self) -> MetadataRecordType {
        match self {
            ApiMessage::RegisterNode(_) => MetadataRecordType::RegisterNode,
            ApiMessage::Topic(_) => MetadataRecordType::Topic,
            ApiMessage::Config(_) => MetadataRecordType::Config,
            ApiMessage::KvRecord(_) => MetadataRecordType::KvRecord,
            ApiMessage::RemoveKvRecord(_) => MetadataRecordType::RemoveKvRecord,
            ApiMessage::FingerPrint(_) => MetadataRecordType::FingerPrint,
            ApiMessage::NoOp => MetadataRecordType::NoOp,
        }
    }
}

impl From<FingerPrintRecord> for ApiMessage {
    fn from(record: FingerPrintRecord) -> Self {
        ApiMessage::FingerPrint(record)
    }
}

impl From<ConfigRecord> for ApiMessage {
    fn from(record: ConfigRecord) -> Self {
        ApiMessage::Config(record)
    }
}

impl From<KvRecord> for ApiMessage {
    fn from(record: KvRecord) -> Self {
        ApiMessage::KvRecord(record)
    }
}

/// A record together with the schema version it was written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessageAndVersion {
    pub message: ApiMessage,
    #[serde(default)]
    pub version: i16,
}

impl ApiMessageAndVersion {
    pub fn new(message: impl Into<ApiMessage>, version: i16) -> Self {
        Self {
            message: message.into(),
            version,
        }
    }
}

/// Identifies a snapshot by the last offset and epoch it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OffsetAndEpoch {
    pub offset: i64,
    pub epoch: i32,
}

impl OffsetAndEpoch {
    pub fn new(offset: i64, epoch: i32) -> Self {
        Self { offset, epoch }
    }
}
