// Error Translator
// One taxonomy for both failure models: structured store errors pass through
// with their own status and message; domain sentinels map to the fixed codes of
// the pre-migration API; anything else is a 500 with a generic body.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::http_types::ErrorResponse;
use crate::resource::StatusError;

/// Body used for every unclassified failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// A scoped store client could not be obtained
    #[error("failed to acquire resource client: {0:#}")]
    ClientAcquisition(anyhow::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Provisioned/read-only record or datasource
    #[error("{0}")]
    ReadOnly(String),

    #[error("{0}")]
    OrgMismatch(String),

    #[error("{0}")]
    EmptyUpdate(String),

    #[error(transparent)]
    Store(#[from] StatusError),

    #[error("{0:#}")]
    Internal(anyhow::Error),
}

impl AdapterError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn read_only(message: impl Into<String>) -> Self {
        Self::ReadOnly(message.into())
    }

    pub fn org_mismatch(message: impl Into<String>) -> Self {
        Self::OrgMismatch(message.into())
    }

    pub fn internal(error: impl Into<anyhow::Error>) -> Self {
        Self::Internal(error.into())
    }

    /// True for failures whose details must stay out of the response body
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AdapterError::ClientAcquisition(_) | AdapterError::Internal(_)
        )
    }

    /// True when the store reported the object as missing
    pub fn is_store_not_found(&self) -> bool {
        matches!(self, AdapterError::Store(status) if status.is_not_found())
    }

    /// Map to the legacy status code, error code and message
    pub fn translate(&self) -> (StatusCode, ErrorResponse) {
        match self {
            AdapterError::Store(status) => {
                let code = StatusCode::from_u16(status.code)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let error = code
                    .canonical_reason()
                    .unwrap_or("store_error")
                    .to_lowercase()
                    .replace(' ', "_");
                (code, ErrorResponse::new(error, status.message.clone()))
            }
            AdapterError::Validation(message) | AdapterError::EmptyUpdate(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::bad_request(message.clone()),
            ),
            AdapterError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::not_found(message.clone()),
            ),
            AdapterError::ReadOnly(message) | AdapterError::OrgMismatch(message) => (
                StatusCode::FORBIDDEN,
                ErrorResponse::forbidden(message.clone()),
            ),
            AdapterError::ClientAcquisition(_) | AdapterError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::internal_server_error(INTERNAL_ERROR_MESSAGE),
            ),
        }
    }
}

impl From<anyhow::Error> for AdapterError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<StatusError>() {
            Ok(status) => AdapterError::Store(status),
            Err(other) => AdapterError::Internal(other),
        }
    }
}

impl From<JsonRejection> for AdapterError {
    fn from(rejection: JsonRejection) -> Self {
        AdapterError::Validation(format!("bad request data: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AdapterError {
    fn from(rejection: QueryRejection) -> Self {
        AdapterError::Validation(format!("bad query parameters: {}", rejection.body_text()))
    }
}

impl IntoResponse for AdapterError {
    fn into_response(self) -> Response {
        let (status, body) = self.translate();
        (status, Json(body)).into_response()
    }
}
