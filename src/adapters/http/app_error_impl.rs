use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(_) | AppError::Gateway(_) | AppError::Internal(_) => {
                tracing::error!(error = ?self, "Request failed")
            }
            _ => tracing::debug!(error = ?self, "Request rejected"),
        }

        match self {
            AppError::Database(_) => {
                error_resp(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseError, None)
            }
            AppError::Unauthenticated => {
                error_resp(StatusCode::UNAUTHORIZED, ErrorCode::Unauthenticated, None)
            }
            AppError::Forbidden => error_resp(StatusCode::FORBIDDEN, ErrorCode::Forbidden, None),
            AppError::InvalidInput(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, Some(msg))
            }
            AppError::Conflict(msg) => {
                error_resp(StatusCode::CONFLICT, ErrorCode::Conflict, Some(msg))
            }
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, None),
            AppError::Gateway(_) => {
                error_resp(StatusCode::BAD_GATEWAY, ErrorCode::GatewayError, None)
            }
            AppError::Internal(_) => {
                error_resp(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError, None)
            }
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
