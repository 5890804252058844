//! Shared HTTP response types used by the legacy endpoints
//!
//! Bodies here match the pre-migration JSON contract so callers cannot tell
//! which store served the request.

use axum::http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

/// Response header carrying the next continuation token of a list call
pub const CONTINUE_HEADER: &str = "x-continue-token";

/// Standard error response format for HTTP API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error response with error code and message
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }

    /// Create an internal server error response
    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new("internal_server_error", message)
    }

    /// Create a bad request error response
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }

    /// Create a not found error response
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("forbidden", message)
    }
}

/// Acknowledgement body returned by mutating legacy endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse<T = ()> {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl<T> MessageResponse<T> {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            id: None,
            result: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_result(mut self, result: T) -> Self {
        self.result = Some(result);
        self
    }
}

/// Headers of a paged list response; empty when there is no next page
pub fn continue_headers(token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(value) = token
        .filter(|t| !t.is_empty())
        .and_then(|t| HeaderValue::from_str(t).ok())
    {
        headers.insert(CONTINUE_HEADER, value);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_creation() {
        let error = ErrorResponse::new("test_error", "Test message");
        assert_eq!(error.error, "test_error");
        assert_eq!(error.message, "Test message");
    }

    #[test]
    fn test_convenience_methods() {
        let internal = ErrorResponse::internal_server_error("Server error");
        assert_eq!(internal.error, "internal_server_error");

        let bad_req = ErrorResponse::bad_request("Invalid input");
        assert_eq!(bad_req.error, "bad_request");

        let not_found = ErrorResponse::not_found("Resource missing");
        assert_eq!(not_found.error, "not_found");

        let forbidden = ErrorResponse::forbidden("Read only");
        assert_eq!(forbidden.error, "forbidden");
    }

    #[test]
    fn test_message_response_serialization() {
        let added = MessageResponse::<()>::new("Annotation added").with_id(7);
        let json = serde_json::to_value(&added).unwrap();
        assert_eq!(json, serde_json::json!({"message": "Annotation added", "id": 7}));

        let deleted = MessageResponse::<()>::new("Annotation deleted");
        let json = serde_json::to_string(&deleted).unwrap();
        assert_eq!(json, r#"{"message":"Annotation deleted"}"#);
    }

    #[test]
    fn test_continue_headers() {
        assert!(continue_headers(None).is_empty());
        assert!(continue_headers(Some("")).is_empty());
        let headers = continue_headers(Some("YS0y"));
        assert_eq!(headers.get(CONTINUE_HEADER).unwrap(), "YS0y");
    }
}
