use crate::error::AppError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

pub fn map_error(err: &AppError) -> (StatusCode, ErrorBody) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = match err {
        // storage failures are logged server-side, not leaked to callers
        AppError::Database(_) | AppError::Persistence(_) | AppError::Internal => {
            tracing::error!(error = %err, "request failed");
            "internal server error".to_string()
        }
        other => other.to_string(),
    };
    (
        status,
        ErrorBody {
            success: false,
            message,
        },
    )
}

pub fn into_response(err: AppError) -> impl IntoResponse {
    let (status, body) = map_error(&err);
    (status, Json(body))
}
