//! Extension Registry
//!
//! Discovers, at most once, the single [`FingerPrintControlManager`]
//! implementation that is live in this process and caches it.
//!
//! # Discovery sources
//!
//! - Implementations registered at compile time with
//!   `register_fingerprint_manager!` (collected through the `inventory` crate)
//! - An explicit candidate list supplied by the host at startup
//!
//! # Concurrency
//!
//! The cached resolution sits behind an `ArcSwapOption`. Steady-state `get()`
//! is a single lock-free load. The first caller takes the discovery mutex,
//! re-checks, and runs discovery; racing first callers block on the mutex and
//! then observe the stored resolution. An empty result is cached as well, so
//! discovery never runs twice.
//!
//! # Usage
//!
//! ```ignore
//! let registry = Arc::new(CapabilityRegistry::from_inventory());
//! let (manager, outcome) = registry.get_and_initialize(&controller, &cluster_control);
//! let extension = DefaultQuorumControllerExtension::new(failover, manager);
//! ```

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use super::capabilities::{ClusterControlHandle, ControllerHandle, FingerPrintControlManager};
use super::isolation::{PluginError, call_plugin_preserving_error, call_plugin_safely_value};
use super::lifecycle::{DiscoveryReport, ExtensionState, InitOutcome};
use super::metadata::controller_version;
use crate::config::ExtensionConfig;

/// Factory function pointer type (non-Arc version for `ManagerConstructor`)
pub type ManagerFactoryPtr = fn() -> Arc<dyn FingerPrintControlManager>;

/// Factory function type for host-supplied candidates
pub type ManagerFactoryFn = Arc<dyn Fn() -> Arc<dyn FingerPrintControlManager> + Send + Sync>;

/// Constructor for inventory-based registration
///
/// Uses a function pointer so construction is deferred until discovery,
/// keeping it compatible with `inventory::submit!`.
pub struct ManagerConstructor {
    /// Implementation id used in discovery logs
    pub id: &'static str,

    /// Factory creating the implementation
    pub create: ManagerFactoryPtr,
}

impl ManagerConstructor {
    pub const fn new(id: &'static str, create: ManagerFactoryPtr) -> Self {
        Self { id, create }
    }
}

// Collect all registered implementations at link time
inventory::collect!(ManagerConstructor);

/// A discoverable implementation
#[derive(Clone)]
pub struct Candidate {
    id: String,
    factory: ManagerFactoryFn,
}

impl Candidate {
    pub fn new<F>(id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn FingerPrintControlManager> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            factory: Arc::new(factory),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate").field("id", &self.id).finish()
    }
}

impl From<&ManagerConstructor> for Candidate {
    fn from(constructor: &ManagerConstructor) -> Self {
        Candidate::new(constructor.id, constructor.create)
    }
}

enum DiscoverySource {
    Inventory,
    Candidates(Vec<Candidate>),
    Disabled,
}

struct Resolution {
    manager: Option<Arc<dyn FingerPrintControlManager>>,
    report: DiscoveryReport,
}

/// Process-wide holder of the live extension implementation
///
/// Construct once at controller startup and share by reference (or `Arc`)
/// with everything that needs the extension.
pub struct CapabilityRegistry {
    source: DiscoverySource,
    controller_version: semver::Version,

    /// Cached discovery result; `None` until discovery ran
    resolved: ArcSwapOption<Resolution>,

    /// Serializes the discovery slow path
    discovery_lock: Mutex<()>,

    /// Outcome of the one initialization attempt
    init_outcome: Mutex<Option<InitOutcome>>,

    state: AtomicU8,
    discovery_passes: AtomicUsize,
}

impl CapabilityRegistry {
    fn with_source(source: DiscoverySource) -> Self {
        Self {
            source,
            controller_version: controller_version(),
            resolved: ArcSwapOption::empty(),
            discovery_lock: Mutex::new(()),
            init_outcome: Mutex::new(None),
            state: AtomicU8::new(ExtensionState::Unregistered as u8),
            discovery_passes: AtomicUsize::new(0),
        }
    }

    /// Discover implementations registered via `register_fingerprint_manager!`
    pub fn from_inventory() -> Self {
        Self::with_source(DiscoverySource::Inventory)
    }

    /// Discover from an explicit, host-supplied candidate list
    ///
    /// Candidates are tried in the given order.
    pub fn with_candidates(candidates: Vec<Candidate>) -> Self {
        Self::with_source(DiscoverySource::Candidates(candidates))
    }

    /// A registry that never resolves an implementation
    pub fn disabled() -> Self {
        Self::with_source(DiscoverySource::Disabled)
    }

    /// Build the registry the configuration asks for
    pub fn from_config(config: &ExtensionConfig) -> Self {
        if config.extension_enabled {
            Self::from_inventory()
        } else {
            Self::disabled()
        }
    }

    /// Override the controller version used for compatibility checks
    pub fn with_controller_version(mut self, version: semver::Version) -> Self {
        self.controller_version = version;
        self
    }

    /// The cached implementation, discovering it on first call
    ///
    /// Returns `None` when no implementation is available. Never fails.
    pub fn get(&self) -> Option<Arc<dyn FingerPrintControlManager>> {
        {
            let guard = self.resolved.load();
            if let Some(resolved) = &*guard {
                return resolved.manager.clone();
            }
        }
        self.resolve_slow().manager.clone()
    }

    fn resolve_slow(&self) -> Arc<Resolution> {
        let _guard = self.discovery_lock.lock();
        if let Some(resolved) = self.resolved.load_full() {
            return resolved;
        }

        let resolution = Arc::new(self.discover());
        self.resolved.store(Some(resolution.clone()));
        resolution
    }

    fn discover(&self) -> Resolution {
        self.discovery_passes.fetch_add(1, Ordering::SeqCst);
        let mut report = DiscoveryReport::new();

        let candidates: Vec<Candidate> = match &self.source {
            DiscoverySource::Disabled => {
                tracing::info!("Fingerprint extension disabled by configuration");
                self.transition(ExtensionState::Disabled);
                return Resolution {
                    manager: None,
                    report,
                };
            }
            DiscoverySource::Inventory => inventory::iter::<ManagerConstructor>
                .into_iter()
                .map(Candidate::from)
                .collect(),
            DiscoverySource::Candidates(candidates) => candidates.clone(),
        };
        report.candidates = candidates.len();

        let mut chosen = None;
        for candidate in &candidates {
            let factory = candidate.factory.clone();
            let manager = match call_plugin_safely_value(AssertUnwindSafe(|| factory())) {
                Ok(manager) => manager,
                Err(e) => {
                    tracing::warn!(
                        candidate = %candidate.id,
                        error = %e,
                        "Skipping fingerprint control manager that failed to construct"
                    );
                    report.rejected.push(candidate.id.clone());
                    continue;
                }
            };

            let manifest = manager.manifest();
            if !manifest.supports(&self.controller_version) {
                let err = PluginError::VersionIncompatible(format!(
                    "requires controller {}, running {}",
                    manifest.controller_version, self.controller_version
                ));
                tracing::warn!(
                    candidate = %candidate.id,
                    error = %err,
                    "Skipping incompatible fingerprint control manager"
                );
                report.rejected.push(candidate.id.clone());
                continue;
            }

            chosen = Some((candidate.id.clone(), manager));
            break;
        }

        match chosen {
            Some((id, manager)) => {
                if candidates.len() > 1 {
                    tracing::warn!(
                        candidates = candidates.len(),
                        chosen = %id,
                        "Multiple fingerprint control manager implementations found. Using {}",
                        id
                    );
                }
                tracing::info!(
                    implementation = %id,
                    version = %manager.manifest().version,
                    "Loaded fingerprint control manager implementation"
                );
                report.chosen = Some(id);
                self.transition(ExtensionState::Discovered);
                Resolution {
                    manager: Some(manager),
                    report,
                }
            }
            None => {
                tracing::info!(
                    candidates = candidates.len(),
                    "No fingerprint control manager implementation found, extension disabled"
                );
                self.transition(ExtensionState::Disabled);
                Resolution {
                    manager: None,
                    report,
                }
            }
        }
    }

    /// Retrieve the implementation and run its initialization hook once
    ///
    /// The handles are passed through unchanged. Hook absence, failure and
    /// panics are reported in the returned [`InitOutcome`] and logged; the
    /// implementation stays usable in every case. Later calls return the
    /// outcome of the first attempt.
    pub fn get_and_initialize(
        &self,
        controller: &ControllerHandle,
        cluster_control: &ClusterControlHandle,
    ) -> (Option<Arc<dyn FingerPrintControlManager>>, InitOutcome) {
        let Some(manager) = self.get() else {
            return (None, InitOutcome::Absent);
        };

        let mut recorded = self.init_outcome.lock();
        if let Some(outcome) = recorded.as_ref() {
            return (Some(manager), outcome.clone());
        }

        let id = manager.manifest().id.clone();
        let outcome = match manager.initializer() {
            None => {
                tracing::debug!(
                    implementation = %id,
                    "Fingerprint control manager does not expose an initialization hook"
                );
                InitOutcome::NotApplicable
            }
            Some(hook) => {
                let result = call_plugin_preserving_error(
                    AssertUnwindSafe(|| hook.initialize(controller, cluster_control)),
                    PluginError::Panic,
                );
                match result {
                    Ok(()) => {
                        tracing::info!(implementation = %id, "Initialized fingerprint control manager");
                        self.advance(ExtensionState::Initialized);
                        InitOutcome::Initialized
                    }
                    Err(e) => {
                        tracing::warn!(
                            implementation = %id,
                            error = %e,
                            "Failed to initialize fingerprint control manager"
                        );
                        InitOutcome::Failed(e.to_string())
                    }
                }
            }
        };

        *recorded = Some(outcome.clone());
        (Some(manager), outcome)
    }

    /// Start the implementation's scheduled checks
    ///
    /// Returns whether a schedule was started by this call. The state moves
    /// to `Operating` when a schedule started or the implementation was
    /// already initialized.
    pub fn start(&self) -> bool {
        let Some(manager) = self.get() else {
            return false;
        };
        let started = manager.start_schedule_check();
        if started || self.state() == ExtensionState::Initialized {
            self.advance(ExtensionState::Operating);
        }
        started
    }

    /// Move forward along Discovered, Initialized, Operating. Never moves
    /// back and never leaves `Disabled`.
    fn advance(&self, new_state: ExtensionState) {
        let result = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let current = ExtensionState::from_u8(current);
                let forward = current != ExtensionState::Disabled
                    && (current as u8) < (new_state as u8);
                forward.then_some(new_state as u8)
            });
        if let Ok(previous) = result {
            tracing::debug!(
                from = %ExtensionState::from_u8(previous),
                to = %new_state,
                "Fingerprint extension state transition"
            );
        }
    }

    fn transition(&self, new_state: ExtensionState) {
        let previous = ExtensionState::from_u8(self.state.swap(new_state as u8, Ordering::AcqRel));
        if previous != new_state {
            tracing::debug!(
                from = %previous,
                to = %new_state,
                "Fingerprint extension state transition"
            );
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ExtensionState {
        ExtensionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Number of discovery passes executed (0 or 1)
    pub fn discovery_passes(&self) -> usize {
        self.discovery_passes.load(Ordering::SeqCst)
    }

    /// Report of the discovery pass, if it ran
    pub fn discovery_report(&self) -> Option<DiscoveryReport> {
        let guard = self.resolved.load();
        (*guard).as_ref().map(|resolved| resolved.report.clone())
    }

    /// Outcome of the initialization attempt, if one was made
    pub fn init_outcome(&self) -> Option<InitOutcome> {
        self.init_outcome.lock().clone()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::from_inventory()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("state", &self.state())
            .field("discovery_passes", &self.discovery_passes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::testing::{StubManager, fixed_handles};

    fn stub(id: &'static str) -> Candidate {
        Candidate::new(id, move || Arc::new(StubManager::new(id)) as Arc<dyn FingerPrintControlManager>)
    }

    #[test]
    fn test_registry_without_candidates_is_absent() {
        let registry = CapabilityRegistry::with_candidates(Vec::new());
        assert_eq!(registry.state(), ExtensionState::Unregistered);
        assert!(registry.get().is_none());
        assert!(registry.get().is_none());
        assert_eq!(registry.discovery_passes(), 1);
        assert_eq!(registry.state(), ExtensionState::Disabled);
    }

    #[test]
    fn test_registry_disabled_skips_discovery_sources() {
        let registry = CapabilityRegistry::disabled();
        assert!(registry.get().is_none());
        assert_eq!(registry.state(), ExtensionState::Disabled);
        assert_eq!(registry.discovery_report().unwrap().candidates, 0);
    }

    #[test]
    fn test_registry_caches_instance() {
        let registry = CapabilityRegistry::with_candidates(vec![stub("a")]);
        let first = registry.get().unwrap();
        let second = registry.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.discovery_passes(), 1);
        assert_eq!(registry.state(), ExtensionState::Discovered);
    }

    #[test]
    fn test_registry_first_candidate_wins() {
        let registry = CapabilityRegistry::with_candidates(vec![stub("a"), stub("b")]);
        let manager = registry.get().unwrap();
        assert_eq!(manager.manifest().id, "a");

        let report = registry.discovery_report().unwrap();
        assert!(report.is_ambiguous());
        assert_eq!(report.chosen.as_deref(), Some("a"));
    }

    #[test]
    fn test_registry_skips_panicking_constructor() {
        let exploding = Candidate::new("boom", || -> Arc<dyn FingerPrintControlManager> {
            panic!("constructor failed")
        });
        let registry = CapabilityRegistry::with_candidates(vec![exploding, stub("b")]);
        assert_eq!(registry.get().unwrap().manifest().id, "b");
        assert_eq!(registry.discovery_report().unwrap().rejected, vec!["boom".to_string()]);
    }

    #[test]
    fn test_registry_only_panicking_constructor_is_absent() {
        let exploding = Candidate::new("boom", || -> Arc<dyn FingerPrintControlManager> {
            panic!("constructor failed")
        });
        let registry = CapabilityRegistry::with_candidates(vec![exploding]);
        assert!(registry.get().is_none());
        assert_eq!(registry.state(), ExtensionState::Disabled);
    }

    #[test]
    fn test_registry_skips_incompatible_version() {
        let future_only = Candidate::new("future", || {
            Arc::new(StubManager::new("future").requiring_controller("^99"))
                as Arc<dyn FingerPrintControlManager>
        });
        let registry = CapabilityRegistry::with_candidates(vec![future_only, stub("current")])
            .with_controller_version(semver::Version::new(1, 0, 0));
        assert_eq!(registry.get().unwrap().manifest().id, "current");
    }

    #[test]
    fn test_initialize_absent() {
        let registry = CapabilityRegistry::with_candidates(Vec::new());
        let (controller, cluster) = fixed_handles("c1", 0, &[]);
        let (manager, outcome) = registry.get_and_initialize(&controller, &cluster);
        assert!(manager.is_none());
        assert_eq!(outcome, InitOutcome::Absent);
    }

    #[test]
    fn test_initialize_not_applicable() {
        let registry = CapabilityRegistry::with_candidates(vec![stub("a")]);
        let (controller, cluster) = fixed_handles("c1", 0, &[]);
        let (manager, outcome) = registry.get_and_initialize(&controller, &cluster);
        assert!(manager.is_some());
        assert_eq!(outcome, InitOutcome::NotApplicable);
        assert_eq!(registry.state(), ExtensionState::Discovered);
    }

    #[test]
    fn test_initialize_success_runs_once() {
        let stub = Arc::new(StubManager::new("init").with_init(Ok(())));
        let shared = stub.clone();
        let candidate = Candidate::new("init", move || {
            shared.clone() as Arc<dyn FingerPrintControlManager>
        });
        let registry = CapabilityRegistry::with_candidates(vec![candidate]);
        let (controller, cluster) = fixed_handles("c1", 0, &[]);

        let (_, outcome) = registry.get_and_initialize(&controller, &cluster);
        assert_eq!(outcome, InitOutcome::Initialized);
        assert_eq!(registry.state(), ExtensionState::Initialized);

        let (_, again) = registry.get_and_initialize(&controller, &cluster);
        assert_eq!(again, InitOutcome::Initialized);
        assert_eq!(stub.init_calls(), 1);
        assert_eq!(stub.seen_cluster_id().as_deref(), Some("c1"));
    }

    #[test]
    fn test_initialize_failure_keeps_instance() {
        let candidate = Candidate::new("bad-init", || {
            Arc::new(
                StubManager::new("bad-init")
                    .with_init(Err(PluginError::InitializationFailed("no quorum".to_string()))),
            ) as Arc<dyn FingerPrintControlManager>
        });
        let registry = CapabilityRegistry::with_candidates(vec![candidate]);
        let (controller, cluster) = fixed_handles("c1", 0, &[]);

        let (manager, outcome) = registry.get_and_initialize(&controller, &cluster);
        assert!(outcome.is_failed());
        assert!(manager.is_some());
        assert!(registry.get().is_some());
        assert_eq!(registry.state(), ExtensionState::Discovered);
    }

    #[test]
    fn test_initialize_panic_is_contained() {
        let candidate = Candidate::new("panicky", || {
            Arc::new(StubManager::new("panicky").with_init_panic()) as Arc<dyn FingerPrintControlManager>
        });
        let registry = CapabilityRegistry::with_candidates(vec![candidate]);
        let (controller, cluster) = fixed_handles("c1", 0, &[]);

        let (manager, outcome) = registry.get_and_initialize(&controller, &cluster);
        assert!(manager.is_some());
        match outcome {
            InitOutcome::Failed(reason) => assert!(reason.contains("init hook panicked")),
            other => panic!("Expected failed outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_start_moves_to_operating() {
        let registry = CapabilityRegistry::with_candidates(vec![stub("a")]);
        assert!(registry.start());
        assert_eq!(registry.state(), ExtensionState::Operating);
        // Stub schedules are idempotent
        assert!(!registry.start());
    }

    #[test]
    fn test_start_that_schedules_nothing_keeps_state() {
        let registry = CapabilityRegistry::with_candidates(vec![stub("a")]);
        let manager = registry.get().unwrap();
        // Schedule already claimed outside the registry
        assert!(manager.start_schedule_check());

        assert!(!registry.start());
        assert_eq!(registry.state(), ExtensionState::Discovered);
    }

    #[test]
    fn test_start_after_initialize_is_operating() {
        let stub = Arc::new(StubManager::new("init").with_init(Ok(())));
        let shared = stub.clone();
        let candidate = Candidate::new("init", move || {
            shared.clone() as Arc<dyn FingerPrintControlManager>
        });
        let registry = CapabilityRegistry::with_candidates(vec![candidate]);
        let (controller, cluster) = fixed_handles("c1", 0, &[]);
        registry.get_and_initialize(&controller, &cluster);

        // Schedule already running, the implementation is still operating
        assert!(stub.start_schedule_check());
        assert!(!registry.start());
        assert_eq!(registry.state(), ExtensionState::Operating);
    }

    #[test]
    fn test_initialize_after_start_stays_operating() {
        let candidate = Candidate::new("late-init", || {
            Arc::new(StubManager::new("late-init").with_init(Ok(())))
                as Arc<dyn FingerPrintControlManager>
        });
        let registry = CapabilityRegistry::with_candidates(vec![candidate]);
        assert!(registry.start());
        assert_eq!(registry.state(), ExtensionState::Operating);

        let (controller, cluster) = fixed_handles("c1", 0, &[]);
        let (_, outcome) = registry.get_and_initialize(&controller, &cluster);
        assert_eq!(outcome, InitOutcome::Initialized);
        assert_eq!(registry.state(), ExtensionState::Operating);
    }

    #[test]
    fn test_start_without_implementation() {
        let registry = CapabilityRegistry::disabled();
        assert!(!registry.start());
        assert_eq!(registry.state(), ExtensionState::Disabled);
    }

    #[cfg(feature = "builtin-manager")]
    #[test]
    fn test_registry_inventory_discovers_builtin() {
        let registry = CapabilityRegistry::from_inventory();
        let manager = registry.get().expect("builtin manager should be registered");
        assert_eq!(manager.manifest().id, crate::plugin::builtin::NODE_QUOTA_ID);
    }
}
