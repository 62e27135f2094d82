use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Server-side error taxonomy. Everything a handler can fail with maps to a
/// status code and a stable error code string for clients.
#[derive(Debug)]
pub enum AppError {
    InvalidInput(&'static str),
    Unauthorized,
    RateLimited,
    Internal(&'static str),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            AppError::InvalidInput(detail) => (StatusCode::BAD_REQUEST, "InvalidInput", detail),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized", "not signed in"),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RateLimited", "slow down"),
            AppError::Internal(detail) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal", detail)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, detail) = self.parts();
        let body = Json(json!({
            "success": false,
            "error": code,
            "detail": detail,
        }));
        (status, body).into_response()
    }
}

/// Converts db-layer failures into internal errors while logging the cause,
/// so handlers read as a chain of `.reject("context")?` calls.
pub trait ResultExt<T> {
    fn reject(self, context: &'static str) -> Result<T, AppError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn reject(self, context: &'static str) -> Result<T, AppError> {
        self.map_err(|e| {
            tracing::error!("{context}: {e}");
            AppError::Internal(context)
        })
    }
}
