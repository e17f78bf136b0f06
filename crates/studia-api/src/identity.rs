//! Request identity resolution.
//!
//! Authentication lives in an upstream gateway; requests arrive with a
//! trusted `X-User-Id` header. This middleware resolves the header to a
//! user row and injects it into request extensions, so handlers can
//! take it with `Extension<User>`.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use studia_core::{User, UserRepository};

use crate::{ApiError, AppState};

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Middleware guarding every `/api` route.
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve_user(&state, request.headers()).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(unauthorized)?;

    let user_id = Uuid::parse_str(raw).map_err(|_| unauthorized())?;

    // An unknown id maps to 401 rather than 404: the header names the
    // caller, not a looked-up resource.
    let user = state.db.users.fetch(user_id).await?;
    Ok(user)
}

fn unauthorized() -> ApiError {
    ApiError::Unauthorized("未授权或登录已过期".to_string())
}
