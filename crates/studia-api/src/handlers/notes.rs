//! Classroom-note HTTP handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use studia_core::{
    normalize_subject, CreateNoteRequest, NewNote, Note, NoteDetail, NoteListItem, NoteRepository,
    User, UserRepository,
};
use studia_jobs::ScheduleOutcome;

use crate::handlers::LIST_LIMIT;
use crate::{ApiError, AppState};

/// Optional overrides accepted by the summarize endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SummarizeNoteRequest {
    pub transcript: Option<String>,
    pub focus_tag: Option<String>,
}

/// List the most recent notes visible to the caller.
///
/// # Returns
/// - 200 OK with an array of note summaries, newest first
#[utoipa::path(get, path = "/api/note/entries", tag = "Notes",
    responses((status = 200, description = "Recent notes, newest first")))]
pub async fn list_notes(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<NoteListItem>>, ApiError> {
    let owner_ids = state.db.users.accessible_owner_ids(&user).await?;
    let notes = state
        .db
        .notes
        .recent_for_owners(&owner_ids, LIST_LIMIT)
        .await?;
    Ok(Json(notes.iter().map(Note::list_item).collect()))
}

/// Get one note with transcript, summary, and tasks.
///
/// # Returns
/// - 200 OK with the note detail
/// - 404 Not Found if the note is outside the caller's scope
#[utoipa::path(get, path = "/api/note/entries/{id}", tag = "Notes",
    responses((status = 200, description = "Note detail")))]
pub async fn get_note(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<NoteDetail>, ApiError> {
    let note = fetch_scoped_note(&state, &user, id).await?;
    Ok(Json(note.detail()))
}

/// Create a note from a transcript.
///
/// # Returns
/// - 201 Created with the note detail
/// - 400 Bad Request if the transcript is empty
#[utoipa::path(post, path = "/api/note/entries", tag = "Notes",
    responses((status = 201, description = "Created note detail")))]
pub async fn create_note(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<NoteDetail>), ApiError> {
    let transcript = req.transcript.trim();
    if transcript.is_empty() {
        return Err(ApiError::BadRequest("转写文本为空".to_string()));
    }

    let new_note = NewNote {
        title: non_blank(req.title),
        subject: non_blank(req.subject).map(|s| normalize_subject(&s)),
        focus_tag: non_blank(req.focus_tag),
        transcript: transcript.to_string(),
    };

    let note = state.db.notes.insert(user.id, new_note).await?;
    info!(note_id = %note.id, "Note created");
    Ok((StatusCode::CREATED, Json(note.detail())))
}

/// Schedule (re-)summarization of a note.
///
/// The body may override the transcript and focus tag before the job
/// runs; blank overrides are ignored.
///
/// # Returns
/// - 202 Accepted with `{ "id": ..., "status": "summarizing" }`
/// - 400 Bad Request if no usable transcript remains
/// - 404 Not Found if the note is outside the caller's scope
/// - 409 Conflict if a summary for this note is already in flight
#[utoipa::path(post, path = "/api/note/entries/{id}/summarize", tag = "Notes",
    responses((status = 202, description = "Summary job scheduled")))]
pub async fn summarize_note(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    body: Option<Json<SummarizeNoteRequest>>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let note = fetch_scoped_note(&state, &user, id).await?;

    let req = body.map(|Json(req)| req).unwrap_or_default();
    let transcript_override = req
        .transcript
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let focus_tag_override = req
        .focus_tag
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    // Reject before any write when neither the override nor the stored
    // transcript has content.
    let stored = note.transcript.as_deref().unwrap_or("").trim();
    if transcript_override.unwrap_or(stored).is_empty() {
        return Err(ApiError::BadRequest(
            "暂无可用于总结的转写文本".to_string(),
        ));
    }

    let note = state
        .db
        .notes
        .reset_for_summary(note.id, transcript_override, focus_tag_override)
        .await?;

    match state.summaries.schedule(note.id) {
        ScheduleOutcome::Scheduled => Ok((
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "id": note.id, "status": note.status })),
        )),
        ScheduleOutcome::AlreadyRunning => {
            Err(ApiError::Conflict("摘要任务已在进行中".to_string()))
        }
    }
}

/// Delete a note.
///
/// # Returns
/// - 200 OK with `{ "message": "已删除", "id": ... }`
/// - 404 Not Found if the note is outside the caller's scope
#[utoipa::path(delete, path = "/api/note/entries/{id}", tag = "Notes",
    responses((status = 200, description = "Note deleted")))]
pub async fn delete_note(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let note = fetch_scoped_note(&state, &user, id).await?;
    state.db.notes.delete(note.id).await?;
    info!(note_id = %note.id, "Note deleted");
    Ok(Json(
        serde_json::json!({ "message": "已删除", "id": note.id }),
    ))
}

async fn fetch_scoped_note(state: &AppState, user: &User, id: Uuid) -> Result<Note, ApiError> {
    let owner_ids = state.db.users.accessible_owner_ids(user).await?;
    let note = state
        .db
        .notes
        .fetch_scoped(id, &owner_ids)
        .await?
        .ok_or_else(|| ApiError::NotFound("未找到笔记记录".to_string()))?;
    Ok(note)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
