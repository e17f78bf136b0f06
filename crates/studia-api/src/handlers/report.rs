//! Weekly parent report handler.

use axum::extract::State;
use axum::{Extension, Json};

use studia_core::{ParentReport, User, UserRole};

use crate::{ApiError, AppState};

/// Build the weekly report for a parent account.
///
/// The report is drafted from the linked student's dashboard summary
/// and always succeeds once authorized, generation failures fall back
/// to a deterministic template.
///
/// # Returns
/// - 200 OK with the camelCase report payload
/// - 403 Forbidden for non-parent accounts
#[utoipa::path(get, path = "/api/parent/report", tag = "Report",
    responses((status = 200, description = "Weekly parent report")))]
pub async fn parent_report(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<ParentReport>, ApiError> {
    if user.role != UserRole::Parent {
        return Err(ApiError::Forbidden("仅家长可用".to_string()));
    }

    let dashboard = state.dashboard.summarize(&user).await?;
    Ok(Json(state.reports.weekly_report(&dashboard).await))
}
