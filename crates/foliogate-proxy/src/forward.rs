//! The per-request relay pipeline.
//!
//! Each inbound request either short-circuits (pre-flight, denylisted
//! path) or runs the full sequence: resolve the origin, build and send
//! the outbound request under the hard timeout, shape the reply.
//! Within one request the steps are strictly sequential, and
//! cross-origin headers go on every reply, including every error.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::{Method, StatusCode, Uri};
use axum::response::Response;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use tracing::{debug, warn};

use crate::body::BodyKind;
use crate::cors;
use crate::error::ForwardError;
use crate::headers;
use crate::GatewayState;

/// Path prefixes never proxied (static assets served elsewhere).
const EXCLUDED_PREFIXES: &[&str] = &["/static/", "/assets/", "/favicon.ico"];

/// The gateway's own health endpoint, never proxied.
const GATEWAY_HEALTH_PATH: &str = "/healthz";

/// Whether a request path is denylisted from proxying.
///
/// Matches against the remainder after the `/api` mount so both
/// `/api/static/...` and a bare `/static/...` are rejected.
pub fn is_excluded(path: &str) -> bool {
    let relative = path.strip_prefix("/api").unwrap_or(path);
    relative == GATEWAY_HEALTH_PATH
        || EXCLUDED_PREFIXES.iter().any(|p| relative.starts_with(p))
}

/// Handler for every method on the proxied surface.
pub async fn forward_handler(State(state): State<GatewayState>, req: Request) -> Response {
    let request_origin = req.headers().get(header::ORIGIN).cloned();

    // Pre-flight is answered locally, with no resolution or backend call.
    if req.method() == Method::OPTIONS {
        return cors::preflight(&state.config, request_origin.as_ref());
    }

    let response = match forward(&state, req).await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, status = %err.status(), "forward failed");
            err.into_envelope()
        }
    };
    cors::apply(response, &state.config.allowed_origins, request_origin.as_ref())
}

/// Relay one inbound request to the resolved origin.
async fn forward(state: &GatewayState, req: Request) -> Result<Response, ForwardError> {
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_string();

    if is_excluded(&path) {
        return Err(ForwardError::ExcludedPath(path));
    }

    let origin = state.resolver.resolve().await;

    // Original path and query, verbatim, against the resolved origin.
    let mut target = format!("{}{}", origin.url, path);
    if let Some(query) = parts.uri.query() {
        target.push('?');
        target.push_str(query);
    }
    let target_uri: Uri = target.parse().map_err(|e| ForwardError::BackendUnreachable {
        origin: origin.url.clone(),
        detail: format!("invalid target url {target}: {e}"),
    })?;

    // Only mutating methods carry a body to transcode.
    let kind = if matches!(parts.method, Method::POST | Method::PUT | Method::PATCH) {
        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| ForwardError::Internal(format!("read request body: {e}")))?;
        BodyKind::classify(content_type.as_deref(), bytes)?
    } else {
        BodyKind::Empty
    };

    let mut out_headers = headers::forwardable_request_headers(&parts.headers);
    if let Some(ct) = kind.content_type_override() {
        out_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(ct));
    }
    let client_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    headers::add_forwarding_context(&mut out_headers, &parts.headers, client_addr);

    let mut out_req = http::Request::builder()
        .method(parts.method.clone())
        .uri(target_uri)
        .body(kind.into_body())
        .map_err(|e| ForwardError::Internal(format!("build outbound request: {e}")))?;
    *out_req.headers_mut() = out_headers;

    debug!(method = %parts.method, %target, "forwarding request");

    let outcome = tokio::time::timeout(
        state.config.forward_timeout,
        state.client.request(out_req),
    )
    .await;

    match outcome {
        Err(_) => Err(ForwardError::BackendTimeout {
            origin: origin.url,
            timeout_secs: state.config.forward_timeout.as_secs(),
        }),
        Ok(Err(e)) => Err(ForwardError::BackendUnreachable {
            origin: origin.url,
            detail: e.to_string(),
        }),
        Ok(Ok(resp)) => shape_response(resp, &origin.url).await,
    }
}

/// Translate the backend's reply for the original caller.
async fn shape_response(
    resp: http::Response<Incoming>,
    origin: &str,
) -> Result<Response, ForwardError> {
    let (parts, body) = resp.into_parts();
    let mut headers = headers::relayable_response_headers(&parts.headers);

    let is_json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false);

    if is_json {
        // Buffer and re-serialize JSON replies; malformed backend JSON
        // degrades to a plain-text relay instead of failing the exchange.
        let bytes = body
            .collect()
            .await
            .map_err(|e| ForwardError::BackendUnreachable {
                origin: origin.to_string(),
                detail: format!("read backend response: {e}"),
            })?
            .to_bytes();

        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(value) => {
                let payload = serde_json::to_vec(&value)
                    .map_err(|e| ForwardError::Internal(format!("reserialize response: {e}")))?;
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                Ok(build_response(parts.status, headers, Body::from(payload)))
            }
            Err(e) => {
                debug!(%origin, error = %e, "backend sent malformed JSON, relaying as text");
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                );
                Ok(build_response(parts.status, headers, Body::from(bytes)))
            }
        }
    } else {
        // Opaque passthrough, unbuffered, preserving backend streaming.
        Ok(build_response(parts.status, headers, Body::new(body)))
    }
}

fn build_response(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
