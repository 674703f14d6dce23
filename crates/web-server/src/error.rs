use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing provider credentials: {0}")]
    Unauthorized(String),
    #[error("No data available: {0}")]
    NoData(String),
    #[error("Upstream provider error: {0}")]
    Upstream(#[from] api_client::error::ApiError),
    #[error("Analytics error: {0}")]
    Analytics(#[from] analytics::AnalyticsError),
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            AppError::NoData(message) => (StatusCode::NOT_FOUND, message),
            AppError::Upstream(api_err) => {
                tracing::error!(error = ?api_err, "Upstream provider error.");
                (StatusCode::BAD_GATEWAY, api_err.to_string())
            }
            AppError::Analytics(analytics_err) => {
                // The only analytics failure is the distinct no-data case.
                (StatusCode::NOT_FOUND, analytics_err.to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
