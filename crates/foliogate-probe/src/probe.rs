//! Single-shot liveness probe against a candidate origin.
//!
//! Sends `GET {origin}/api/health` over a fresh HTTP/1 connection and
//! treats any 2xx response within the timeout as healthy. Timeouts,
//! connection errors, and non-2xx statuses all normalize into an
//! unhealthy result — never an error.

use std::time::{Duration, Instant};

use tracing::debug;

/// Well-known health path probed on every candidate origin.
pub const HEALTH_PATH: &str = "/api/health";

/// Default bound on a single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one liveness probe.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthProbeResult {
    /// The origin that was probed.
    pub origin: String,
    /// Whether the health endpoint answered 2xx within the timeout.
    pub healthy: bool,
    /// Wall-clock time the probe took, in milliseconds.
    pub latency_ms: u64,
    /// Unix timestamp (seconds) when the probe completed.
    pub observed_at: u64,
    /// Diagnostic detail when unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl HealthProbeResult {
    pub fn healthy(origin: &str, latency_ms: u64) -> Self {
        Self {
            origin: origin.to_string(),
            healthy: true,
            latency_ms,
            observed_at: epoch_secs(),
            error_detail: None,
        }
    }

    pub fn unhealthy(origin: &str, latency_ms: u64, detail: impl Into<String>) -> Self {
        Self {
            origin: origin.to_string(),
            healthy: false,
            latency_ms,
            observed_at: epoch_secs(),
            error_detail: Some(detail.into()),
        }
    }
}

/// Probe an origin's health endpoint.
///
/// Returns a healthy result if `GET {origin}/api/health` answers 2xx
/// within `timeout`. Any failure mode — unparseable origin, connection
/// refused, handshake error, non-2xx, timeout — is reported as
/// unhealthy with `error_detail` populated.
pub async fn probe(origin: &str, timeout: Duration) -> HealthProbeResult {
    let started = Instant::now();
    let outcome = tokio::time::timeout(timeout, probe_once(origin)).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(())) => {
            debug!(%origin, latency_ms, "probe healthy");
            HealthProbeResult::healthy(origin, latency_ms)
        }
        Ok(Err(detail)) => {
            debug!(%origin, latency_ms, %detail, "probe unhealthy");
            HealthProbeResult::unhealthy(origin, latency_ms, detail)
        }
        Err(_) => {
            debug!(%origin, timeout_ms = timeout.as_millis() as u64, "probe timed out");
            HealthProbeResult::unhealthy(
                origin,
                latency_ms,
                format!("probe timed out after {}ms", timeout.as_millis()),
            )
        }
    }
}

/// One probe attempt, without the outer timeout.
async fn probe_once(origin: &str) -> Result<(), String> {
    let address = authority(origin).ok_or_else(|| format!("unparseable origin: {origin}"))?;
    let uri = format!("{}{}", origin.trim_end_matches('/'), HEALTH_PATH);

    let stream = tokio::net::TcpStream::connect(&address)
        .await
        .map_err(|e| format!("connect {address}: {e}"))?;

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| format!("handshake {address}: {e}"))?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = http::Request::builder()
        .method("GET")
        .uri(&uri)
        .header("host", &address)
        .header("user-agent", "foliogate-probe/0.1")
        .body(http_body_util::Empty::<bytes::Bytes>::new())
        .map_err(|e| format!("build probe request: {e}"))?;

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| format!("request {uri}: {e}"))?;

    if resp.status().is_success() {
        Ok(())
    } else {
        Err(format!("health endpoint returned {}", resp.status()))
    }
}

/// Extract `host:port` from an `http://` origin.
///
/// Origins are scheme+host+port with no path; a bare host gets port 80.
fn authority(origin: &str) -> Option<String> {
    let rest = origin.strip_prefix("http://")?;
    let host = rest.split('/').next().unwrap_or(rest).trim_end_matches('/');
    if host.is_empty() {
        return None;
    }
    if host.contains(':') {
        Some(host.to_string())
    } else {
        Some(format!("{host}:80"))
    }
}

pub(crate) fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
