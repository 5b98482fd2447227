//! foliogate-api — the gateway's HTTP surface.
//!
//! Assembles the complete router: the proxied `/api` surface, the
//! diagnostics endpoints, and the gateway's own health check.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | any | `/api/{*path}` | Relay to the resolved backend origin |
//! | GET | `/gateway/origins` | Candidate list, cached resolution, last probes |
//! | POST | `/gateway/probe` | Probe all candidates now and re-resolve |
//! | GET | `/healthz` | Gateway liveness (never proxied) |

pub mod handlers;

use axum::routing::{get, post};
use axum::Router;

use foliogate_proxy::GatewayState;

/// Build the complete gateway router (proxy + diagnostics + health).
pub fn build_router(state: GatewayState) -> Router {
    let diagnostics = Router::new()
        .route("/origins", get(handlers::get_origins))
        .route("/probe", post(handlers::trigger_probe))
        .with_state(state.clone());

    Router::new()
        .merge(foliogate_proxy::proxy_router(state))
        .nest("/gateway", diagnostics)
        .route("/healthz", get(handlers::healthz))
}
