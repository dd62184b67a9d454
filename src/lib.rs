pub mod config;
pub mod controller;
pub mod image;
pub mod metadata;
pub mod plugin;

// Re-export commonly used items for convenience
pub use config::{ConfigError, ExtensionConfig, LogFormat};
pub use controller::{DefaultQuorumControllerExtension, QuorumControllerExtension, ReplayLoop};
pub use image::{FingerPrintDelta, FingerPrintImage, MetadataDelta, MetadataImage};
pub use plugin::{CapabilityRegistry, FingerPrintControlManager};
