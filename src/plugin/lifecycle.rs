//! Extension Lifecycle
//!
//! ```text
//!     +--------------+
//!     | Unregistered |   (registry constructed)
//!     +------+-------+
//!            |  get()
//!            v
//!     +------+-------+
//!     |  Discovered  |   (implementation cached)
//!     +------+-------+
//!            |  get_and_initialize()   (optional)
//!            v
//!     +------+-------+
//!     | Initialized  |
//!     +------+-------+
//!            |  start()
//!            v
//!     +------+-------+
//!     |  Operating   |
//!     +--------------+
//! ```
//!
//! `Disabled` is reached from `Unregistered` when discovery finds nothing or
//! configuration turns the extension off. Other states only move forward.
//! There is no teardown state; the extension lives until process exit.

use std::time::Instant;

/// Extension lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExtensionState {
    /// Discovery has not run yet
    Unregistered = 0,

    /// An implementation was discovered and cached
    Discovered = 1,

    /// The initialization hook ran successfully
    Initialized = 2,

    /// Scheduled checks were started
    Operating = 3,

    /// No implementation is active
    Disabled = 4,
}

impl ExtensionState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => ExtensionState::Discovered,
            2 => ExtensionState::Initialized,
            3 => ExtensionState::Operating,
            4 => ExtensionState::Disabled,
            _ => ExtensionState::Unregistered,
        }
    }

    /// Whether an implementation is live in this state
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ExtensionState::Discovered | ExtensionState::Initialized | ExtensionState::Operating
        )
    }
}

impl std::fmt::Display for ExtensionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtensionState::Unregistered => write!(f, "unregistered"),
            ExtensionState::Discovered => write!(f, "discovered"),
            ExtensionState::Initialized => write!(f, "initialized"),
            ExtensionState::Operating => write!(f, "operating"),
            ExtensionState::Disabled => write!(f, "disabled"),
        }
    }
}

/// Outcome of the best-effort initialization hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// The hook ran and succeeded
    Initialized,

    /// The implementation exposes no initialization hook
    NotApplicable,

    /// No implementation is active
    Absent,

    /// The hook failed or panicked; the instance stays usable uninitialized
    Failed(String),
}

impl InitOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, InitOutcome::Failed(_))
    }
}

/// Result of the one-time discovery pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Number of registered candidates seen
    pub candidates: usize,

    /// Id of the implementation chosen, if any
    pub chosen: Option<String>,

    /// Candidates skipped for version incompatibility or constructor panics
    pub rejected: Vec<String>,

    /// When the pass ran
    pub discovered_at: Instant,
}

impl DiscoveryReport {
    pub(crate) fn new() -> Self {
        Self {
            candidates: 0,
            chosen: None,
            rejected: Vec::new(),
            discovered_at: Instant::now(),
        }
    }

    /// Whether more than one candidate competed for the slot
    pub fn is_ambiguous(&self) -> bool {
        self.candidates > 1
    }
}
