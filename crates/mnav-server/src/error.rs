use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mnav_tracker::TrackerError;
use serde_json::json;

/// Error returned by API handlers, rendered as `{success: false, error}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad_request: {0}")]
    BadRequest(String),
    #[error("internal_error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = json!({ "success": false, "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<TrackerError> for ApiError {
    fn from(e: TrackerError) -> Self {
        if e.is_client_error() {
            Self::BadRequest(e.to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(e: axum::extract::rejection::JsonRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}
