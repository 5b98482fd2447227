//! Cross-origin headers.
//!
//! Every gateway reply carries cross-origin headers — success, error,
//! and pre-flight alike — so the browser can read error bodies instead
//! of being blocked by cross-origin policy on a failed request.

use axum::http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, VARY,
};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use foliogate_resolve::GatewayConfig;

/// Methods the gateway relays.
pub const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
/// Request headers callers may send.
pub const ALLOWED_HEADERS: &str = "content-type, authorization, x-requested-with";
/// Pre-flight result cache lifetime.
const MAX_AGE_SECS: &str = "86400";

/// Attach cross-origin headers to a reply.
pub fn apply(
    mut response: Response,
    allowed_origins: &[String],
    request_origin: Option<&HeaderValue>,
) -> Response {
    let allow = select_origin(allowed_origins, request_origin);
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&allow) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.append(VARY, HeaderValue::from_static("origin"));
    response
}

/// Answer an OPTIONS pre-flight locally, without a backend call.
pub fn preflight(config: &GatewayConfig, request_origin: Option<&HeaderValue>) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    response.headers_mut().insert(
        ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(MAX_AGE_SECS),
    );
    apply(response, &config.allowed_origins, request_origin)
}

/// Echo the caller's origin when it is in the allowed set, otherwise
/// answer with the first configured origin.
fn select_origin(allowed: &[String], request_origin: Option<&HeaderValue>) -> String {
    if let Some(origin) = request_origin.and_then(|v| v.to_str().ok()) {
        if allowed.iter().any(|a| a == origin) {
            return origin.to_string();
        }
    }
    allowed
        .first()
        .cloned()
        .unwrap_or_else(|| "*".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec![
            "http://localhost:3000".to_string(),
            "https://folio.example.com".to_string(),
        ]
    }

    #[test]
    fn echoes_allowed_request_origin() {
        let origin = HeaderValue::from_static("https://folio.example.com");
        let response = apply(StatusCode::OK.into_response(), &allowed(), Some(&origin));

        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://folio.example.com"
        );
        assert_eq!(response.headers().get(VARY).unwrap(), "origin");
    }

    #[test]
    fn unknown_origin_falls_back_to_first_allowed() {
        let origin = HeaderValue::from_static("https://evil.example.com");
        let response = apply(StatusCode::OK.into_response(), &allowed(), Some(&origin));

        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
    }

    #[test]
    fn missing_origin_header_falls_back_to_first_allowed() {
        let response = apply(StatusCode::OK.into_response(), &allowed(), None);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
    }

    #[test]
    fn headers_present_on_error_status() {
        let response = apply(StatusCode::BAD_GATEWAY.into_response(), &allowed(), None);

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            ALLOWED_METHODS
        );
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
            ALLOWED_HEADERS
        );
    }

    #[test]
    fn preflight_is_local_204() {
        let config = GatewayConfig::default();
        let response = preflight(&config, None);

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_MAX_AGE).unwrap(),
            MAX_AGE_SECS
        );
        assert!(response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
