//! Body-kind classification and transcoding.
//!
//! The inbound body is one of three kinds, selected from the declared
//! content type, with one transcoding path per kind:
//!
//! - JSON is read as text and validated; a parse failure is fatal for
//!   the request (400), and the outbound content type is forced to JSON.
//! - Multipart and form bodies pass through as raw bytes with their
//!   original content-type header intact — recomputing the header would
//!   corrupt multipart boundaries.
//! - Everything else also passes through as raw bytes.

use axum::body::Body;
use bytes::Bytes;

use crate::error::ForwardError;

/// The inbound request body, tagged by transcoding strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyKind {
    /// No body to forward.
    Empty,
    /// Validated JSON text, forwarded as text.
    Json(String),
    /// Opaque bytes, forwarded unchanged.
    Raw(Bytes),
}

impl BodyKind {
    /// Classify a buffered inbound body by its declared content type.
    pub fn classify(content_type: Option<&str>, bytes: Bytes) -> Result<Self, ForwardError> {
        if bytes.is_empty() {
            return Ok(Self::Empty);
        }

        let declared = content_type.unwrap_or("").to_ascii_lowercase();
        if declared.starts_with("application/json") {
            let text = String::from_utf8(bytes.to_vec())
                .map_err(|e| ForwardError::MalformedBody(format!("invalid utf-8: {e}")))?;
            serde_json::from_str::<serde_json::Value>(&text)
                .map_err(|e| ForwardError::MalformedBody(e.to_string()))?;
            return Ok(Self::Json(text));
        }

        Ok(Self::Raw(bytes))
    }

    /// Content type to force on the outbound request, if any.
    pub fn content_type_override(&self) -> Option<&'static str> {
        match self {
            Self::Json(_) => Some("application/json"),
            Self::Empty | Self::Raw(_) => None,
        }
    }

    /// Convert into the outbound request body.
    pub fn into_body(self) -> Body {
        match self {
            Self::Empty => Body::empty(),
            Self::Json(text) => Body::from(text),
            Self::Raw(bytes) => Body::from(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bytes_classify_as_empty() {
        let kind = BodyKind::classify(Some("application/json"), Bytes::new()).unwrap();
        assert_eq!(kind, BodyKind::Empty);
    }

    #[test]
    fn valid_json_is_kept_as_text() {
        let kind =
            BodyKind::classify(Some("application/json"), Bytes::from_static(b"{\"a\":1}"))
                .unwrap();
        assert_eq!(kind, BodyKind::Json("{\"a\":1}".to_string()));
        assert_eq!(kind.content_type_override(), Some("application/json"));
    }

    #[test]
    fn json_with_charset_parameter_still_json() {
        let kind = BodyKind::classify(
            Some("application/json; charset=utf-8"),
            Bytes::from_static(b"[1,2,3]"),
        )
        .unwrap();
        assert!(matches!(kind, BodyKind::Json(_)));
    }

    #[test]
    fn malformed_json_is_fatal() {
        let err = BodyKind::classify(Some("application/json"), Bytes::from_static(b"{\"a\":"))
            .unwrap_err();
        assert!(matches!(err, ForwardError::MalformedBody(_)));
    }

    #[test]
    fn non_utf8_json_is_fatal() {
        let err = BodyKind::classify(Some("application/json"), Bytes::from_static(&[0xff, 0xfe]))
            .unwrap_err();
        assert!(matches!(err, ForwardError::MalformedBody(_)));
    }

    #[test]
    fn multipart_passes_through_as_raw() {
        let payload = Bytes::from_static(b"--boundary\r\ncontent-disposition: form-data; name=\"f\"\r\n\r\nvalue\r\n--boundary--\r\n");
        let kind = BodyKind::classify(
            Some("multipart/form-data; boundary=boundary"),
            payload.clone(),
        )
        .unwrap();
        assert_eq!(kind, BodyKind::Raw(payload));
        assert_eq!(kind.content_type_override(), None);
    }

    #[test]
    fn unknown_content_type_is_raw() {
        let payload = Bytes::from_static(&[0x00, 0x01, 0x02]);
        let kind = BodyKind::classify(Some("application/octet-stream"), payload.clone()).unwrap();
        assert_eq!(kind, BodyKind::Raw(payload));
    }

    #[test]
    fn missing_content_type_is_raw() {
        let kind = BodyKind::classify(None, Bytes::from_static(b"data")).unwrap();
        assert!(matches!(kind, BodyKind::Raw(_)));
    }
}
