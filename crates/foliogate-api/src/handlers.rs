//! Diagnostics handlers.
//!
//! Exposes the resolver's view of the world: the candidate table, the
//! cached resolution, and recent probe results, plus a manual re-probe
//! trigger. Implemented purely on the prober/resolver contracts.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;

use foliogate_probe::HealthProbeResult;
use foliogate_proxy::GatewayState;
use foliogate_resolve::CandidateOrigin;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

/// The currently cached resolution.
#[derive(serde::Serialize)]
pub struct ResolvedReport {
    pub origin: CandidateOrigin,
    pub age_secs: u64,
}

/// Snapshot of the resolver's state.
#[derive(serde::Serialize)]
pub struct OriginsReport {
    pub candidates: Vec<CandidateOrigin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedReport>,
    pub probes: Vec<HealthProbeResult>,
}

/// GET /gateway/origins
pub async fn get_origins(State(state): State<GatewayState>) -> impl IntoResponse {
    let resolved = state
        .resolver
        .cached()
        .map(|(origin, age)| ResolvedReport {
            origin,
            age_secs: age.as_secs(),
        });

    ApiResponse::ok(OriginsReport {
        candidates: state.resolver.candidates().to_vec(),
        resolved,
        probes: state.resolver.probe_cache().snapshot(),
    })
}

/// Result of a manual re-probe.
#[derive(serde::Serialize)]
pub struct ReprobeReport {
    pub results: Vec<HealthProbeResult>,
    pub resolved: CandidateOrigin,
}

/// POST /gateway/probe
pub async fn trigger_probe(State(state): State<GatewayState>) -> impl IntoResponse {
    info!("manual re-probe triggered");
    let results = state.resolver.probe_all().await;
    state.resolver.force_refresh();
    let resolved = state.resolver.resolve().await;

    ApiResponse::ok(ReprobeReport { results, resolved })
}

/// GET /healthz — the gateway's own liveness.
pub async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
