//! foliogate-proxy — the request forwarder.
//!
//! Relays every dashboard API request to the resolved backend origin:
//! rewrites the target URL, normalizes headers, transcodes the body by
//! content type, bounds the outbound call with a hard timeout, and
//! reshapes the backend's reply (or failure) for the calling browser.
//! Cross-origin headers are attached to every reply, success or error.
//!
//! # Components
//!
//! - **`forward`** — the per-request relay pipeline
//! - **`body`** — body-kind classification and transcoding
//! - **`headers`** — request/response header normalization
//! - **`cors`** — cross-origin headers and pre-flight replies
//! - **`error`** — the gateway's error taxonomy

pub mod body;
pub mod cors;
pub mod error;
pub mod forward;
pub mod headers;

use std::sync::Arc;

use axum::routing::any;
use axum::Router;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use foliogate_resolve::{GatewayConfig, OriginResolver};

pub use body::BodyKind;
pub use error::ForwardError;

/// Outbound HTTP client shared by all forwarded requests.
pub type HttpClient = Client<HttpConnector, axum::body::Body>;

/// Shared state for the forwarding handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub resolver: OriginResolver,
    pub config: Arc<GatewayConfig>,
    pub client: HttpClient,
}

impl GatewayState {
    /// Build state with a resolver derived from the config.
    pub fn new(config: GatewayConfig) -> Self {
        let resolver = OriginResolver::new(&config);
        Self::with_resolver(config, resolver)
    }

    /// Build state around an existing resolver (tests inject fakes here).
    pub fn with_resolver(config: GatewayConfig, resolver: OriginResolver) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            resolver,
            config: Arc::new(config),
            client,
        }
    }
}

/// The proxied surface: every method on `/api` and `/api/{*path}`.
pub fn proxy_router(state: GatewayState) -> Router {
    Router::new()
        .route("/api", any(forward::forward_handler))
        .route("/api/{*path}", any(forward::forward_handler))
        .with_state(state)
}
