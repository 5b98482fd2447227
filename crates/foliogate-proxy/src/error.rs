//! The gateway's error taxonomy.
//!
//! Every failure the gateway produces itself (as opposed to relaying a
//! backend status verbatim) maps to one of these variants. Error
//! replies carry the resolved origin so operators can see which backend
//! was actually unreachable.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Failures in the forwarding path.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Path matches the denylist and is never proxied.
    #[error("path is not proxied: {0}")]
    ExcludedPath(String),

    /// Inbound JSON body failed to parse; local fault, not forwarded.
    #[error("malformed JSON request body: {0}")]
    MalformedBody(String),

    /// Transport-level failure reaching the backend.
    #[error("backend unreachable at {origin}: {detail}")]
    BackendUnreachable { origin: String, detail: String },

    /// The backend withheld its response past the hard timeout.
    #[error("backend at {origin} timed out after {timeout_secs}s")]
    BackendTimeout { origin: String, timeout_secs: u64 },

    /// Catch-all for unexpected faults in the forwarding path.
    #[error("internal gateway fault: {0}")]
    Internal(String),
}

impl ForwardError {
    /// The status code this error surfaces as.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ExcludedPath(_) => StatusCode::NOT_FOUND,
            Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::BackendUnreachable { .. } => StatusCode::BAD_GATEWAY,
            Self::BackendTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The resolved origin involved, when the failure reached one.
    pub fn origin(&self) -> Option<&str> {
        match self {
            Self::BackendUnreachable { origin, .. } | Self::BackendTimeout { origin, .. } => {
                Some(origin)
            }
            _ => None,
        }
    }

    /// Render as the gateway's JSON error envelope.
    pub fn into_envelope(self) -> Response {
        let mut body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });
        if let Some(origin) = self.origin() {
            body["origin"] = serde_json::Value::String(origin.to_string());
        }
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ForwardError::ExcludedPath("/static/app.css".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ForwardError::MalformedBody("eof".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ForwardError::BackendUnreachable {
                origin: "http://127.0.0.1:8000".into(),
                detail: "connection refused".into(),
            }
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ForwardError::BackendTimeout {
                origin: "http://127.0.0.1:8000".into(),
                timeout_secs: 60,
            }
            .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ForwardError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn backend_errors_name_the_origin() {
        let err = ForwardError::BackendTimeout {
            origin: "http://backend:8000".into(),
            timeout_secs: 60,
        };
        assert_eq!(err.origin(), Some("http://backend:8000"));
        assert!(err.to_string().contains("http://backend:8000"));

        assert!(ForwardError::Internal("x".into()).origin().is_none());
    }
}
