//! HTTP-facing errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use shifts_jobs::JobError;
use shifts_store::StoreError;
use thiserror::Error;
use tracing::error;

/// Errors returned by the `/api/v1` handlers.
///
/// Every variant renders as its status code with a `{"message": ...}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was malformed.
    #[error("{0}")]
    BadRequest(String),
    /// The job queue cannot take more work right now.
    #[error("{0}")]
    Unavailable(String),
    /// Storage or another internal step failed.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Shorthand for [`ApiError::BadRequest`].
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        error!(error = %e, "store error");
        Self::Internal("Unable to access the trip store".into())
    }
}

impl From<JobError> for ApiError {
    fn from(e: JobError) -> Self {
        Self::Unavailable(format!("Unable to schedule task: {e}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "message": self.to_string() }))).into_response()
    }
}
