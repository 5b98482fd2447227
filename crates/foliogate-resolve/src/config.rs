//! Gateway configuration, read once from the environment.

use std::path::Path;
use std::time::Duration;

use tracing::warn;

/// Explicit backend origin override. When set, it is the sole candidate
/// and probing is skipped entirely.
pub const ENV_BACKEND_ORIGIN: &str = "FOLIOGATE_BACKEND_ORIGIN";
/// Truthy value forces container-mode candidate ordering.
pub const ENV_IN_CONTAINER: &str = "FOLIOGATE_IN_CONTAINER";
/// Port the backend listens on (container and loopback candidates).
pub const ENV_BACKEND_PORT: &str = "FOLIOGATE_BACKEND_PORT";
/// Hard bound on one forwarded request, in seconds.
pub const ENV_FORWARD_TIMEOUT: &str = "FOLIOGATE_FORWARD_TIMEOUT_SECS";
/// Bound on one health probe, in seconds.
pub const ENV_PROBE_TIMEOUT: &str = "FOLIOGATE_PROBE_TIMEOUT_SECS";
/// Comma-separated list of allowed CORS caller origins.
pub const ENV_ALLOWED_ORIGINS: &str = "FOLIOGATE_ALLOWED_ORIGINS";

/// Filesystem marker distinguishing containerized from local execution.
const DOCKERENV_PATH: &str = "/.dockerenv";

/// Runtime configuration for the gateway.
///
/// Derived once at startup; candidate origins and timeouts do not
/// mutate afterwards.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Explicit backend origin, trusted outright when present.
    pub override_origin: Option<String>,
    /// Whether a container runtime was detected (env signal or marker file).
    pub in_container: bool,
    /// Backend port used for the container and loopback candidates.
    pub backend_port: u16,
    /// Hard bound on one forwarded request.
    pub forward_timeout: Duration,
    /// Bound on one health probe.
    pub probe_timeout: Duration,
    /// TTL for the resolved-origin cache and the per-origin probe cache.
    pub resolve_ttl: Duration,
    /// Caller origins permitted by the cross-origin headers.
    pub allowed_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            override_origin: None,
            in_container: false,
            backend_port: 8000,
            forward_timeout: Duration::from_secs(60),
            probe_timeout: foliogate_probe::DEFAULT_PROBE_TIMEOUT,
            resolve_ttl: Duration::from_secs(30),
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl GatewayConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(
            |key| std::env::var(key).ok(),
            Path::new(DOCKERENV_PATH).exists(),
        )
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// `dockerenv_present` stands in for the `/.dockerenv` filesystem
    /// heuristic so tests can exercise both branches.
    pub fn from_lookup(
        get: impl Fn(&str) -> Option<String>,
        dockerenv_present: bool,
    ) -> Self {
        let defaults = Self::default();

        let override_origin = get(ENV_BACKEND_ORIGIN)
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());

        let in_container = get(ENV_IN_CONTAINER)
            .map(|v| is_truthy(&v))
            .unwrap_or(false)
            || dockerenv_present;

        let backend_port = parse_or(get(ENV_BACKEND_PORT), defaults.backend_port, ENV_BACKEND_PORT);

        let forward_timeout = Duration::from_secs(parse_or(
            get(ENV_FORWARD_TIMEOUT),
            defaults.forward_timeout.as_secs(),
            ENV_FORWARD_TIMEOUT,
        ));

        let probe_timeout = Duration::from_secs(parse_or(
            get(ENV_PROBE_TIMEOUT),
            defaults.probe_timeout.as_secs(),
            ENV_PROBE_TIMEOUT,
        ));

        let allowed_origins = match get(ENV_ALLOWED_ORIGINS) {
            Some(raw) => {
                let origins: Vec<String> = raw
                    .split(',')
                    .map(|s| s.trim().trim_end_matches('/').to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if origins.is_empty() {
                    defaults.allowed_origins.clone()
                } else {
                    origins
                }
            }
            None => defaults.allowed_origins.clone(),
        };

        Self {
            override_origin,
            in_container,
            backend_port,
            forward_timeout,
            probe_timeout,
            resolve_ttl: defaults.resolve_ttl,
            allowed_origins,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_or<T: std::str::FromStr + Copy>(value: Option<String>, default: T, key: &str) -> T {
    match value {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(%key, %raw, "unparseable value, using default");
            default
        }),
        None => default,
    }
}
