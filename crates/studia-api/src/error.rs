//! HTTP error mapping for studia-api.
//!
//! Handlers return [`ApiError`]; the [`IntoResponse`] impl turns it into
//! the `{"message": ...}` JSON body the clients expect.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use studia_core::Error;

/// API-level error with an HTTP status.
#[derive(Debug)]
pub enum ApiError {
    /// 400 with a user-facing message.
    BadRequest(String),
    /// 401, identity header missing or not resolvable.
    Unauthorized(String),
    /// 403, authenticated but not allowed.
    Forbidden(String),
    /// 404 with a user-facing message.
    NotFound(String),
    /// 409, unique-constraint violations surface here.
    Conflict(String),
    /// 502, an upstream generation call failed.
    BadGateway(String),
    /// 500, everything else.
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match &err {
            Error::NotFound(msg) => ApiError::NotFound(msg.clone()),
            Error::NoteNotFound(_) => ApiError::NotFound("未找到笔记记录".to_string()),
            Error::ErrorEntryNotFound(_) => ApiError::NotFound("未找到错题记录".to_string()),
            Error::UserNotFound(_) => ApiError::Unauthorized("未授权或登录已过期".to_string()),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg.clone()),
            Error::Forbidden(msg) => ApiError::Forbidden(msg.clone()),
            Error::Internal(msg) => ApiError::Internal(msg.clone()),
            Error::Database(sqlx_err) => {
                let msg = sqlx_err.to_string();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    return ApiError::Conflict(msg);
                }
                ApiError::Internal(err.to_string())
            }
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "message": message,
        }));

        (status, body).into_response()
    }
}
