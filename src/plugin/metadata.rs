//! Extension Manifest
//!
//! Identity and version information an extension publishes, used by the
//! registry for logging and compatibility checks.

use serde::{Deserialize, Serialize};

/// Version of the controller the extensions plug into.
pub const CONTROLLER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Manifest describing an extension implementation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    /// Unique implementation identifier (e.g., "node-quota")
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Semantic version of the implementation
    pub version: semver::Version,

    /// Controller versions this implementation supports
    pub controller_version: semver::VersionReq,
}

impl ExtensionManifest {
    /// Create a manifest accepting any controller `>=1.0.0`.
    ///
    /// An unparsable `version` falls back to 1.0.0 with a warning.
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: &str) -> Self {
        let id = id.into();
        let parsed_version = match semver::Version::parse(version) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(
                    extension = %id,
                    version = %version,
                    error = %e,
                    "Invalid extension version, falling back to 1.0.0"
                );
                semver::Version::new(1, 0, 0)
            }
        };

        Self {
            id,
            name: name.into(),
            version: parsed_version,
            controller_version: semver::VersionReq::parse(">=1.0.0")
                .unwrap_or(semver::VersionReq::STAR),
        }
    }

    /// Restrict the supported controller versions.
    ///
    /// An unparsable requirement leaves the current one in place.
    pub fn with_controller_version(mut self, req: &str) -> Self {
        match semver::VersionReq::parse(req) {
            Ok(parsed) => self.controller_version = parsed,
            Err(e) => {
                tracing::warn!(
                    extension = %self.id,
                    requirement = %req,
                    error = %e,
                    "Invalid controller version requirement, keeping previous"
                );
            }
        }
        self
    }

    /// Whether this extension accepts the given controller version.
    pub fn supports(&self, controller_version: &semver::Version) -> bool {
        self.controller_version.matches(controller_version)
    }
}

/// The running controller's version.
pub fn controller_version() -> semver::Version {
    semver::Version::parse(CONTROLLER_VERSION).unwrap_or_else(|_| semver::Version::new(1, 0, 0))
}
