//! Fingerprint Extension System
//!
//! This module provides the pluggable fingerprint/license extension of the
//! controller:
//! - The capability contract an implementation fulfils
//! - Compile-time registration through `inventory`
//! - A registry that discovers the live implementation once and caches it
//! - Panic isolation around extension constructors and hooks
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Extension Registration                      │
//! │  register_fingerprint_manager! ──▶ inventory ──▶ CapabilityRegistry │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ## Registering an Implementation
//!
//! ```ignore
//! use fingerprint_control::plugin::prelude::*;
//!
//! pub struct MyManager;
//!
//! impl PluginCapability for MyManager {}
//!
//! impl FingerPrintControlManager for MyManager {
//!     // ...
//! }
//!
//! fn create() -> Arc<dyn FingerPrintControlManager> {
//!     Arc::new(MyManager)
//! }
//!
//! register_fingerprint_manager!("my-manager", create);
//! ```
//!
//! ## Using the Registry
//!
//! ```ignore
//! let registry = CapabilityRegistry::from_inventory();
//! let (manager, outcome) = registry.get_and_initialize(&controller, &cluster_control);
//! ```

#[macro_use]
pub mod macros;

#[cfg(feature = "builtin-manager")]
pub mod builtin;
pub mod capabilities;
pub mod isolation;
pub mod lifecycle;
pub mod metadata;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use capabilities::{
    ClusterControl, ClusterControlHandle, ControllerHandle, ControllerResult,
    DynamicConfigChanges, FingerPrintControlManager, Initialize, PluginCapability,
    QuorumController, ReconfigurationError,
};
pub use isolation::{PluginError, call_plugin_preserving_error, call_plugin_safely_value};
pub use lifecycle::{DiscoveryReport, ExtensionState, InitOutcome};
pub use metadata::{CONTROLLER_VERSION, ExtensionManifest, controller_version};
pub use registry::{Candidate, CapabilityRegistry, ManagerConstructor};

/// Prelude module for convenient imports
///
/// Use this for extension development:
/// ```ignore
/// use fingerprint_control::plugin::prelude::*;
/// ```
pub mod prelude {
    pub use super::capabilities::{
        ClusterControl, ClusterControlHandle, ControllerHandle, ControllerResult,
        DynamicConfigChanges, FingerPrintControlManager, Initialize, PluginCapability,
        QuorumController, ReconfigurationError,
    };
    pub use super::isolation::PluginError;
    pub use super::metadata::ExtensionManifest;
    pub use super::registry::{
        Candidate, CapabilityRegistry, ManagerConstructor, ManagerFactoryFn, ManagerFactoryPtr,
    };

    pub use crate::image::FingerPrintImage;
    pub use crate::metadata::{ConfigRecord, ConfigResource, FingerPrintRecord};
    pub use crate::register_fingerprint_manager;
    pub use inventory;
    pub use std::sync::Arc;
}
