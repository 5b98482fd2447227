//! TTL-cached origin resolution.
//!
//! The resolver owns a single cache slot holding the last resolved
//! origin. Within the TTL every `resolve()` call returns the slot
//! without probing. On expiry or first use, candidates are probed
//! sequentially in priority order and the first healthy one wins.
//! Concurrent recomputes are allowed to race: probing is idempotent and
//! the last writer's value is valid either way, so the slot lock is
//! held only to read or store, never across a probe.

use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use foliogate_probe::{HealthProbeResult, ProbeCache};

use crate::candidates::{candidate_origins, CandidateOrigin, OriginSource};
use crate::config::GatewayConfig;

type BoxFuture = Pin<Box<dyn Future<Output = HealthProbeResult> + Send>>;

/// Injectable probe function: `(origin_url, timeout) → result`.
///
/// Defaults to [`foliogate_probe::probe`]; tests substitute scripted
/// probes to count calls and control health without network access.
pub type ProbeFn = Arc<dyn Fn(String, Duration) -> BoxFuture + Send + Sync>;

/// The resolved-origin cache slot.
struct CachedOrigin {
    origin: CandidateOrigin,
    cached_at: Instant,
}

/// Resolves the current backend origin, caching the decision.
///
/// Clone-cheap; all mutable state sits behind `Arc`.
#[derive(Clone)]
pub struct OriginResolver {
    candidates: Arc<Vec<CandidateOrigin>>,
    cache: Arc<RwLock<Option<CachedOrigin>>>,
    probe_cache: ProbeCache,
    probe_fn: ProbeFn,
    probe_timeout: Duration,
    ttl: Duration,
}

impl OriginResolver {
    /// Build a resolver over the environment's candidate list.
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            candidates: Arc::new(candidate_origins(config)),
            cache: Arc::new(RwLock::new(None)),
            probe_cache: ProbeCache::new(config.resolve_ttl),
            probe_fn: Arc::new(|origin, timeout| {
                Box::pin(async move { foliogate_probe::probe(&origin, timeout).await })
            }),
            probe_timeout: config.probe_timeout,
            ttl: config.resolve_ttl,
        }
    }

    /// Substitute the probe function (for tests).
    pub fn with_probe_fn(mut self, probe_fn: ProbeFn) -> Self {
        self.probe_fn = probe_fn;
        self
    }

    /// Override the cache TTL (for tests).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self.probe_cache = ProbeCache::new(ttl);
        self
    }

    /// The ordered candidate list.
    pub fn candidates(&self) -> &[CandidateOrigin] {
        &self.candidates
    }

    /// The per-origin record of recent probe results.
    pub fn probe_cache(&self) -> &ProbeCache {
        &self.probe_cache
    }

    /// The currently cached origin and its age, if any.
    pub fn cached(&self) -> Option<(CandidateOrigin, Duration)> {
        let slot = self.cache.read().expect("origin cache lock");
        slot.as_ref().map(|c| (c.origin.clone(), c.cached_at.elapsed()))
    }

    /// Empty the cache slot so the next `resolve()` recomputes.
    pub fn force_refresh(&self) {
        let mut slot = self.cache.write().expect("origin cache lock");
        *slot = None;
    }

    /// Resolve the backend origin to forward to.
    ///
    /// Never fails: if no candidate probes healthy, the last candidate
    /// is cached and returned anyway so the forward attempt surfaces
    /// the real connection error against a deterministic destination.
    pub async fn resolve(&self) -> CandidateOrigin {
        if let Some(hit) = self.cached_fresh() {
            return hit;
        }

        let resolved = self.recompute().await;

        let mut slot = self.cache.write().expect("origin cache lock");
        *slot = Some(CachedOrigin {
            origin: resolved.clone(),
            cached_at: Instant::now(),
        });
        resolved
    }

    /// Probe every candidate now, recording results.
    ///
    /// Used by the diagnostics re-probe trigger; bypasses the probe
    /// cache so results are current.
    pub async fn probe_all(&self) -> Vec<HealthProbeResult> {
        let mut results = Vec::with_capacity(self.candidates.len());
        for candidate in self.candidates.iter() {
            let result = (self.probe_fn)(candidate.url.clone(), self.probe_timeout).await;
            self.probe_cache.record(result.clone());
            results.push(result);
        }
        results
    }

    fn cached_fresh(&self) -> Option<CandidateOrigin> {
        let slot = self.cache.read().expect("origin cache lock");
        let cached = slot.as_ref()?;
        if cached.cached_at.elapsed() < self.ttl {
            Some(cached.origin.clone())
        } else {
            None
        }
    }

    async fn recompute(&self) -> CandidateOrigin {
        // An override is operator intent, trusted without probing.
        if let Some(first) = self.candidates.first() {
            if first.source == OriginSource::Override {
                debug!(origin = %first.url, "using override origin");
                return first.clone();
            }
        }

        // Sequential, in descending trust order: the first healthy
        // candidate wins even if a later one would answer faster.
        for candidate in self.candidates.iter() {
            let result = match self.probe_cache.fresh(&candidate.url) {
                Some(recent) => recent,
                None => {
                    let result =
                        (self.probe_fn)(candidate.url.clone(), self.probe_timeout).await;
                    self.probe_cache.record(result.clone());
                    result
                }
            };

            if result.healthy {
                info!(
                    origin = %candidate.url,
                    source = ?candidate.source,
                    latency_ms = result.latency_ms,
                    "resolved backend origin"
                );
                return candidate.clone();
            }

            warn!(
                origin = %candidate.url,
                detail = result.error_detail.as_deref().unwrap_or("unknown"),
                "candidate origin unhealthy"
            );
        }

        // Candidate construction always appends loopback, so the list
        // is non-empty by construction.
        let fallback = self
            .candidates
            .last()
            .cloned()
            .expect("candidate list is never empty");
        warn!(origin = %fallback.url, "no healthy candidate, using last candidate as fallback");
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Probe function with scripted per-origin health and a call counter.
    fn scripted_prober(
        health: HashMap<String, bool>,
        calls: Arc<AtomicUsize>,
    ) -> ProbeFn {
        Arc::new(move |origin, _timeout| {
            calls.fetch_add(1, Ordering::SeqCst);
            let healthy = health.get(&origin).copied().unwrap_or(false);
            Box::pin(async move {
                if healthy {
                    HealthProbeResult::healthy(&origin, 1)
                } else {
                    HealthProbeResult::unhealthy(&origin, 1, "scripted failure")
                }
            })
        })
    }

    fn container_config() -> GatewayConfig {
        GatewayConfig {
            in_container: true,
            ..Default::default()
        }
    }

    fn health(entries: &[(&str, bool)]) -> HashMap<String, bool> {
        entries
            .iter()
            .map(|(url, healthy)| (url.to_string(), *healthy))
            .collect()
    }

    #[tokio::test]
    async fn override_wins_with_zero_probes() {
        let config = GatewayConfig {
            override_origin: Some("http://backend-a:9000".to_string()),
            in_container: true,
            ..Default::default()
        };
        let calls = Arc::new(AtomicUsize::new(0));
        // Even an unhealthy override is returned untested.
        let resolver = OriginResolver::new(&config)
            .with_probe_fn(scripted_prober(health(&[]), calls.clone()));

        let origin = resolver.resolve().await;
        assert_eq!(origin.url, "http://backend-a:9000");
        assert_eq!(origin.source, OriginSource::Override);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn container_unhealthy_falls_through_to_loopback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = OriginResolver::new(&container_config()).with_probe_fn(scripted_prober(
            health(&[
                ("http://backend:8000", false),
                ("http://127.0.0.1:8000", true),
            ]),
            calls.clone(),
        ));

        let origin = resolver.resolve().await;
        assert_eq!(origin.url, "http://127.0.0.1:8000");
        assert_eq!(origin.source, OriginSource::Loopback);
        // Container first, then loopback.
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Cached: no further probes.
        let again = resolver.resolve().await;
        assert_eq!(again.url, "http://127.0.0.1:8000");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn first_healthy_candidate_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = OriginResolver::new(&container_config()).with_probe_fn(scripted_prober(
            health(&[
                ("http://backend:8000", true),
                ("http://127.0.0.1:8000", true),
            ]),
            calls.clone(),
        ));

        let origin = resolver.resolve().await;
        assert_eq!(origin.url, "http://backend:8000");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_unhealthy_falls_back_to_last_candidate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = OriginResolver::new(&container_config())
            .with_probe_fn(scripted_prober(health(&[]), calls.clone()));

        let origin = resolver.resolve().await;
        assert_eq!(origin.url, "http://127.0.0.1:8000");
        assert_eq!(origin.source, OriginSource::Loopback);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // The fallback is cached like any other resolution.
        let again = resolver.resolve().await;
        assert_eq!(again.url, "http://127.0.0.1:8000");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_expires_after_ttl() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = OriginResolver::new(&GatewayConfig::default())
            .with_ttl(Duration::from_millis(50))
            .with_probe_fn(scripted_prober(
                health(&[("http://127.0.0.1:8000", true)]),
                calls.clone(),
            ));

        resolver.resolve().await;
        resolver.resolve().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;

        resolver.resolve().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn force_refresh_recomputes_from_recent_probes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = OriginResolver::new(&GatewayConfig::default()).with_probe_fn(
            scripted_prober(health(&[("http://127.0.0.1:8000", true)]), calls.clone()),
        );

        resolver.resolve().await;
        assert!(resolver.cached().is_some());

        resolver.force_refresh();
        assert!(resolver.cached().is_none());

        // Recompute reuses the still-fresh probe record.
        let origin = resolver.resolve().await;
        assert_eq!(origin.url, "http://127.0.0.1:8000");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn probe_all_bypasses_probe_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = OriginResolver::new(&container_config())
            .with_probe_fn(scripted_prober(health(&[]), calls.clone()));

        let results = resolver.probe_all().await;
        assert_eq!(results.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let results = resolver.probe_all().await;
        assert_eq!(results.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn resolve_records_probe_results() {
        let resolver = OriginResolver::new(&container_config()).with_probe_fn(scripted_prober(
            health(&[("http://127.0.0.1:8000", true)]),
            Arc::new(AtomicUsize::new(0)),
        ));

        resolver.resolve().await;

        let snapshot = resolver.probe_cache().snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().any(|r| r.origin == "http://backend:8000" && !r.healthy));
        assert!(snapshot.iter().any(|r| r.origin == "http://127.0.0.1:8000" && r.healthy));
    }
}
