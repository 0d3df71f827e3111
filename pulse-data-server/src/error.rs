use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use pulse_data::RelayError;

/// API error surface: every failure renders as an `{"error": "..."}` JSON
/// body, never an unhandled fault reaching the transport layer.
#[derive(Debug)]
pub enum ApiError {
    /// Cold start: no bundle has been computed yet.
    NotReady,
    /// Upstream pipeline failure with nothing cached to fall back on.
    Upstream(String),
}

impl From<RelayError> for ApiError {
    fn from(error: RelayError) -> Self {
        match error {
            RelayError::NotReady => Self::NotReady,
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotReady => (
                StatusCode::SERVICE_UNAVAILABLE,
                "market data not ready yet".to_string(),
            ),
            Self::Upstream(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
