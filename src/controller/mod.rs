//! Controller-side integration of the fingerprint extension.
//!
//! - [`DefaultQuorumControllerExtension`] routes replayed records to the
//!   failover and fingerprint managers
//! - [`ReplayLoop`] applies record batches in log order and maintains the
//!   metadata image
//! - [`StandaloneController`] and [`ClusterMembership`] are the host handles
//!   passed to an extension's initialization hook

pub mod extension;
pub mod failover;
pub mod handles;
pub mod replay;

pub use extension::{DefaultQuorumControllerExtension, QuorumControllerExtension};
pub use failover::{FAILOVER_KEY_PREFIX, FailoverControl, FailoverControlManager};
pub use handles::{ClusterMembership, StandaloneController};
pub use replay::{BatchSummary, ReplayLoop};
