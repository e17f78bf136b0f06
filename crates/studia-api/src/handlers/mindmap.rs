//! Knowledge-map generation handler.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use studia_core::{KnowledgeMap, MapMode, SourceType, User};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct GenerateMapRequest {
    pub source_type: String,
    pub source_id: String,
    pub mode: Option<String>,
}

/// Generate a knowledge map for a note or an error entry.
///
/// # Returns
/// - 200 OK with the materialized map
/// - 400 Bad Request on an unknown source type or malformed id
/// - 404 Not Found if the source is outside the caller's scope
#[utoipa::path(post, path = "/api/mind-map/generate", tag = "MindMap",
    responses((status = 200, description = "Materialized knowledge map")))]
pub async fn generate_map(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<GenerateMapRequest>,
) -> Result<Json<KnowledgeMap>, ApiError> {
    let source_type = req
        .source_type
        .trim()
        .parse::<SourceType>()
        .map_err(|_| ApiError::BadRequest("source_type 必须为 note 或 error_book".to_string()))?;
    let source_id = Uuid::parse_str(req.source_id.trim())
        .map_err(|_| ApiError::BadRequest("source_id 无效".to_string()))?;
    let mode = MapMode::from_param(req.mode.as_deref());

    let map = state
        .engine
        .generate(&user, source_type, source_id, mode)
        .await?;
    Ok(Json(map))
}
