//! Concurrency tests for the extension registry
//!
//! Many threads race on the first `get()`. Discovery must run once, every
//! caller must see the same instance, and the ambiguity warning must be
//! logged exactly once.
//!
//! Run: cargo test --test registry_concurrency -- --nocapture

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use common::counting_candidate;
use fingerprint_control::plugin::{CapabilityRegistry, ExtensionState};

const THREADS: usize = 100;

/// Counts events per level across every thread that installs it.
#[derive(Clone, Default)]
struct LevelCounter {
    warn: Arc<AtomicUsize>,
    info: Arc<AtomicUsize>,
}

impl<S: Subscriber> Layer<S> for LevelCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        match *event.metadata().level() {
            Level::WARN => {
                self.warn.fetch_add(1, Ordering::SeqCst);
            }
            Level::INFO => {
                self.info.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }
    }
}

#[test]
fn test_concurrent_first_access_discovers_once() {
    let first_built = Arc::new(AtomicUsize::new(0));
    let second_built = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(CapabilityRegistry::with_candidates(vec![
        counting_candidate("first", first_built.clone()),
        counting_candidate("second", second_built.clone()),
    ]));

    let counter = LevelCounter::default();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            let counter = counter.clone();
            thread::spawn(move || {
                let subscriber = tracing_subscriber::registry().with(counter);
                tracing::subscriber::with_default(subscriber, || {
                    barrier.wait();
                    registry.get()
                })
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("worker thread panicked"))
        .collect();

    let first = results[0].clone().expect("an implementation should be resolved");
    assert_eq!(first.manifest().id, "first");
    for result in &results {
        let manager = result.as_ref().expect("every caller sees the implementation");
        assert!(Arc::ptr_eq(manager, &first));
    }

    assert_eq!(registry.discovery_passes(), 1);
    assert_eq!(first_built.load(Ordering::SeqCst), 1);
    assert_eq!(second_built.load(Ordering::SeqCst), 0);
    assert_eq!(counter.warn.load(Ordering::SeqCst), 1);
    assert_eq!(counter.info.load(Ordering::SeqCst), 1);
    assert_eq!(registry.state(), ExtensionState::Discovered);

    let report = registry.discovery_report().expect("discovery ran");
    assert!(report.is_ambiguous());
    assert_eq!(report.chosen.as_deref(), Some("first"));
}

#[test]
fn test_concurrent_first_access_without_candidates() {
    let registry = Arc::new(CapabilityRegistry::with_candidates(Vec::new()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.get().is_none()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().expect("worker thread panicked"));
    }
    assert_eq!(registry.discovery_passes(), 1);
    assert_eq!(registry.state(), ExtensionState::Disabled);
}

#[test]
fn test_steady_state_get_does_not_rediscover() {
    let built = Arc::new(AtomicUsize::new(0));
    let registry = CapabilityRegistry::with_candidates(vec![counting_candidate(
        "only",
        built.clone(),
    )]);

    for _ in 0..1_000 {
        assert!(registry.get().is_some());
    }
    assert_eq!(registry.discovery_passes(), 1);
    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert!(!registry.discovery_report().expect("discovery ran").is_ambiguous());
}
