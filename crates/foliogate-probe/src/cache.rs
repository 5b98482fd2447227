//! Per-origin record of recent probe results.
//!
//! Keyed by origin URL with a fixed TTL. `fresh()` answers only within
//! the TTL; `snapshot()` returns the most recent result per origin
//! regardless of age, for diagnostics.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::probe::HealthProbeResult;

/// Shared cache of the latest probe result per origin.
///
/// Clone-cheap (`Arc` inside); writes are last-writer-wins. Concurrent
/// duplicate probes for the same origin are harmless, so no entry-level
/// locking is done.
#[derive(Clone)]
pub struct ProbeCache {
    entries: Arc<RwLock<HashMap<String, (Instant, HealthProbeResult)>>>,
    ttl: Duration,
}

impl ProbeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Store a probe result for its origin.
    pub fn record(&self, result: HealthProbeResult) {
        let mut entries = self.entries.write().expect("probe cache lock");
        entries.insert(result.origin.clone(), (Instant::now(), result));
    }

    /// The latest result for an origin, if recorded within the TTL.
    pub fn fresh(&self, origin: &str) -> Option<HealthProbeResult> {
        let entries = self.entries.read().expect("probe cache lock");
        let (recorded_at, result) = entries.get(origin)?;
        if recorded_at.elapsed() < self.ttl {
            Some(result.clone())
        } else {
            None
        }
    }

    /// Most recent result per origin, fresh or stale.
    pub fn snapshot(&self) -> Vec<HealthProbeResult> {
        let entries = self.entries.read().expect("probe cache lock");
        let mut results: Vec<HealthProbeResult> =
            entries.values().map(|(_, r)| r.clone()).collect();
        results.sort_by(|a, b| a.origin.cmp(&b.origin));
        results
    }

    /// Drop all recorded results.
    pub fn clear(&self) {
        let mut entries = self.entries.write().expect("probe cache lock");
        entries.clear();
    }
}
