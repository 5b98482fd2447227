//! Candidate origin construction — the environment decision table.
//!
//! Priority order is the list order: an explicit override is the sole
//! candidate, a container-internal origin is prepended when a container
//! runtime was detected, and the local loopback origin is always the
//! final fallback.

use std::fmt;

use crate::config::GatewayConfig;

/// Hostname of the backend service on the container network.
const CONTAINER_BACKEND_HOST: &str = "backend";

/// Which environment rule produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginSource {
    /// Explicit operator override, trusted without probing.
    Override,
    /// Container-internal service address.
    Container,
    /// Local loopback, the universal fallback.
    Loopback,
}

/// An absolute base URL (scheme+host+port) considered as a backend.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CandidateOrigin {
    pub url: String,
    pub source: OriginSource,
}

impl CandidateOrigin {
    fn new(url: impl Into<String>, source: OriginSource) -> Self {
        Self {
            url: url.into(),
            source,
        }
    }
}

impl fmt::Display for CandidateOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Build the ordered candidate list for the current environment.
///
/// The list is never empty: the loopback origin is always appended
/// unless an override replaces the whole table.
pub fn candidate_origins(config: &GatewayConfig) -> Vec<CandidateOrigin> {
    if let Some(url) = &config.override_origin {
        return vec![CandidateOrigin::new(url.clone(), OriginSource::Override)];
    }

    let mut candidates = Vec::with_capacity(2);
    if config.in_container {
        candidates.push(CandidateOrigin::new(
            format!("http://{CONTAINER_BACKEND_HOST}:{}", config.backend_port),
            OriginSource::Container,
        ));
    }
    candidates.push(CandidateOrigin::new(
        format!("http://127.0.0.1:{}", config.backend_port),
        OriginSource::Loopback,
    ));
    candidates
}
