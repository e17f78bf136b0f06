//! Dashboard summary handler.

use axum::extract::State;
use axum::{Extension, Json};

use studia_core::{DashboardSummary, User};

use crate::{ApiError, AppState};

/// Aggregate the caller's recent study activity into one payload.
///
/// # Returns
/// - 200 OK with totals, per-subject counts, daily histogram, mastery
///   ranking, and derived insights
#[utoipa::path(get, path = "/api/dashboard/summary", tag = "Dashboard",
    responses((status = 200, description = "Aggregated dashboard summary")))]
pub async fn dashboard_summary(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let summary = state.dashboard.summarize(&user).await?;
    Ok(Json(summary))
}
