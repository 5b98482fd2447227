//! Header normalization for relayed requests and responses.

use std::net::SocketAddr;

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};

/// Inbound headers unsafe to forward as-is. The client sets these for
/// its hop to the gateway; the outbound hop computes its own.
const STRIP_REQUEST_HEADERS: &[&str] = &[
    "host",
    "connection",
    "content-length",
    "transfer-encoding",
    "expect",
    "upgrade",
    "proxy-authorization",
];

/// Backend response headers invalid to relay. The body may be
/// re-serialized, so stale framing and encoding headers would lie
/// about the payload.
const STRIP_RESPONSE_HEADERS: &[&str] = &[
    "connection",
    "transfer-encoding",
    "content-encoding",
    "content-length",
];

/// Copy inbound headers, dropping the per-hop set.
///
/// Multi-valued headers keep all values in order.
pub fn forwardable_request_headers(inbound: &HeaderMap) -> HeaderMap {
    filtered(inbound, STRIP_REQUEST_HEADERS)
}

/// Copy backend response headers, dropping the per-hop set.
pub fn relayable_response_headers(backend: &HeaderMap) -> HeaderMap {
    filtered(backend, STRIP_RESPONSE_HEADERS)
}

fn filtered(source: &HeaderMap, strip: &[&str]) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(source.len());
    for (name, value) in source {
        if strip.contains(&name.as_str()) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Add forwarding-context headers describing the original hop.
pub fn add_forwarding_context(
    headers: &mut HeaderMap,
    inbound: &HeaderMap,
    client_addr: Option<SocketAddr>,
) {
    if let Some(host) = inbound.get("host") {
        headers.insert(
            HeaderName::from_static("x-forwarded-host"),
            host.clone(),
        );
    }
    headers.insert(
        HeaderName::from_static("x-forwarded-proto"),
        HeaderValue::from_static("http"),
    );
    if let Some(addr) = client_addr {
        // Append to any chain the client already carried.
        let ip = addr.ip().to_string();
        let chain = match headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{existing}, {ip}"),
            None => ip,
        };
        if let Ok(value) = HeaderValue::from_str(&chain) {
            headers.insert(HeaderName::from_static("x-forwarded-for"), value);
        }
    }
}
