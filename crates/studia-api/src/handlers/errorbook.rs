//! Error-book HTTP handlers.
//!
//! Creation enriches the draft before the single insert: when the
//! caller supplies OCR text without an analysis, one generation call
//! produces the analysis, and title/subject/verdict are lifted from its
//! JSON payload. Strict parsing is deliberate here, free-text analyses
//! are kept but never mined for fields.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};
use uuid::Uuid;

use studia_core::{
    extract_error_concepts, extract_first_json_object, normalize_subject, CreateErrorEntryRequest,
    Error, ErrorBookRepository, ErrorEntry, ErrorEntryDetail, ErrorEntryListItem,
    ErrorEntryStatus, KnowledgeNodeRepository, NewErrorEntry, NodeKind, Quiz,
    User, UserRepository, UNCLASSIFIED_SUBJECT,
};

use crate::handlers::LIST_LIMIT;
use crate::{ApiError, AppState};

/// List the most recent error entries visible to the caller.
///
/// # Returns
/// - 200 OK with an array of entry summaries, newest first
#[utoipa::path(get, path = "/api/error-book/entries", tag = "ErrorBook",
    responses((status = 200, description = "Recent entries, newest first")))]
pub async fn list_entries(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<ErrorEntryListItem>>, ApiError> {
    let owner_ids = state.db.users.accessible_owner_ids(&user).await?;
    let entries = state
        .db
        .error_book
        .recent_for_owners(&owner_ids, LIST_LIMIT)
        .await?;
    Ok(Json(entries.iter().map(ErrorEntry::list_item).collect()))
}

/// Get one error entry with OCR text, analysis, and quiz.
///
/// # Returns
/// - 200 OK with the entry detail
/// - 404 Not Found if the entry is outside the caller's scope
#[utoipa::path(get, path = "/api/error-book/entries/{id}", tag = "ErrorBook",
    responses((status = 200, description = "Entry detail")))]
pub async fn get_entry(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<ErrorEntryDetail>, ApiError> {
    let entry = fetch_scoped_entry(&state, &user, id).await?;
    Ok(Json(entry.detail()))
}

/// Create an error entry from OCR text and/or a ready-made analysis.
///
/// # Returns
/// - 201 Created with the entry detail; generation failures degrade the
///   entry to `ai_failed` instead of failing the request
#[utoipa::path(post, path = "/api/error-book/entries", tag = "ErrorBook",
    responses((status = 201, description = "Created entry detail")))]
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<CreateErrorEntryRequest>,
) -> Result<(StatusCode, Json<ErrorEntryDetail>), ApiError> {
    let mut draft = NewErrorEntry {
        title: non_blank(req.title),
        subject: non_blank(req.subject).map(|s| normalize_subject(&s)),
        status: ErrorEntryStatus::Created,
        verdict: non_blank(req.verdict),
        ocr_text: non_blank(req.ocr_text),
        analysis: non_blank(req.analysis),
    };

    if draft.analysis.is_some() {
        draft.status = ErrorEntryStatus::Done;
    } else if let Some(ocr_text) = draft.ocr_text.clone() {
        match state.backend.generate(&analysis_prompt(&ocr_text)).await {
            Ok(text) => {
                draft.analysis = Some(text);
                draft.status = ErrorEntryStatus::Done;
            }
            Err(err) => {
                warn!(error = %err, "Error-entry analysis generation failed");
                draft.status = ErrorEntryStatus::AiFailed;
                if draft.verdict.is_none() {
                    draft.verdict = Some(format!("AI 分析失败：{err}"));
                }
            }
        }
    }

    if draft.status == ErrorEntryStatus::Done {
        if let Some(analysis) = draft.analysis.clone() {
            enrich_draft(&mut draft, &analysis);
        }
    }

    let mut entry = state.db.error_book.insert(user.id, draft).await?;
    info!(entry_id = %entry.id, status = entry.status.as_str(), "Error entry created");

    if entry.status == ErrorEntryStatus::Done {
        upsert_knowledge_from_entry(&state, &entry).await;
    }

    // Quiz on create is best-effort; the quiz endpoint retries later.
    match state.quizzes.ensure_quiz(&entry).await {
        Ok(_) => {
            if let Ok(fresh) = state.db.error_book.fetch(entry.id).await {
                entry = fresh;
            }
        }
        Err(err) => debug!(error = %err, "Quiz generation during create skipped"),
    }

    Ok((StatusCode::CREATED, Json(entry.detail())))
}

/// Return the entry's practice quiz, generating one if needed.
///
/// # Returns
/// - 200 OK with the quiz payload
/// - 400 Bad Request if the entry has no OCR text
/// - 404 Not Found if the entry is outside the caller's scope
/// - 502 Bad Gateway if generation or validation fails
#[utoipa::path(post, path = "/api/error-book/entries/{id}/quiz", tag = "ErrorBook",
    responses((status = 200, description = "Practice quiz")))]
pub async fn generate_quiz(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Quiz>, ApiError> {
    let entry = fetch_scoped_entry(&state, &user, id).await?;

    match state.quizzes.ensure_quiz(&entry).await {
        Ok(quiz) => Ok(Json(quiz)),
        Err(Error::InvalidInput(msg)) => Err(ApiError::BadRequest(msg)),
        Err(err) => Err(ApiError::BadGateway(quiz_failure_message(err))),
    }
}

/// Delete an error entry.
///
/// # Returns
/// - 200 OK with `{ "message": "已删除", "id": ... }`
/// - 404 Not Found if the entry is outside the caller's scope
#[utoipa::path(delete, path = "/api/error-book/entries/{id}", tag = "ErrorBook",
    responses((status = 200, description = "Entry deleted")))]
pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let entry = fetch_scoped_entry(&state, &user, id).await?;
    state.db.error_book.delete(entry.id).await?;
    info!(entry_id = %entry.id, "Error entry deleted");
    Ok(Json(
        serde_json::json!({ "message": "已删除", "id": entry.id }),
    ))
}

async fn fetch_scoped_entry(
    state: &AppState,
    user: &User,
    id: Uuid,
) -> Result<ErrorEntry, ApiError> {
    let owner_ids = state.db.users.accessible_owner_ids(user).await?;
    let entry = state
        .db
        .error_book
        .fetch_scoped(id, &owner_ids)
        .await?
        .ok_or_else(|| ApiError::NotFound("未找到错题记录".to_string()))?;
    Ok(entry)
}

async fn upsert_knowledge_from_entry(state: &AppState, entry: &ErrorEntry) {
    let (subject, concepts) = extract_error_concepts(
        entry.subject.as_deref().unwrap_or(""),
        entry.analysis.as_deref().unwrap_or(""),
    );
    for name in &concepts {
        let result = state
            .db
            .knowledge
            .get_or_create(entry.owner_id, &subject, name, NodeKind::Concept)
            .await;
        if let Err(err) = result {
            warn!(error = %err, "Knowledge upsert from error entry failed");
            break;
        }
    }
}

/// Lift title/subject/verdict from the analysis JSON into the draft,
/// never overwriting caller-provided values. A strict parse failure
/// leaves a marker verdict so the UI can tell structured analyses from
/// free text.
fn enrich_draft(draft: &mut NewErrorEntry, analysis: &str) {
    let extracted =
        extract_first_json_object(analysis).unwrap_or_else(|| analysis.to_string());
    let parsed = match serde_json::from_str::<JsonValue>(&extracted) {
        Ok(JsonValue::Object(map)) => map,
        _ => {
            if draft.verdict.is_none() {
                draft.verdict = Some("AI 已生成解析（非结构化输出）".to_string());
            }
            return;
        }
    };

    if draft.title.is_none() {
        draft.title = parsed
            .get("title")
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);
    }

    let needs_subject = match draft.subject.as_deref() {
        None => true,
        Some(s) => normalize_subject(s) == UNCLASSIFIED_SUBJECT,
    };
    if needs_subject {
        let from_payload = parsed.get("subject").and_then(JsonValue::as_str).unwrap_or("");
        draft.subject = Some(normalize_subject(from_payload));
    }

    if draft.verdict.is_none() {
        draft.verdict = parsed
            .get("verdict")
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from);
    }
}

fn quiz_failure_message(err: Error) -> String {
    match err {
        Error::Generation(msg) | Error::MalformedOutput(msg) => msg,
        other => other.to_string(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Build the error-analysis prompt for the given OCR text.
pub fn analysis_prompt(ocr_text: &str) -> String {
    let allowed_subjects = studia_core::SUBJECT_CHOICES.join("、");
    format!(
        r#"只输出 JSON，禁止 markdown/解释文字/多余字符。
你是中学学习助教。下面是 OCR 提取的错题文本，请输出严格 JSON（不要 markdown），并尽量可解释、可核验。
JSON schema（必须严格匹配）：
{{
  "title": string,
  "subject": string,
  "verdict": string,
  "mistakes": [{{
    "concept": string,
    "reason": string,
    "correct_approach": string,
    "practice": string,
    "evidence": string
  }}],
  "key_points": string[],
  "review_plan": string[],
  "confidence": number
}}
要求：
- subject 必须且只能从如下列表中选择其一：{allowed_subjects}。
- title/subject 简短；verdict 一句话总结最主要错因；confidence 0~1。
- mistakes 只在确实能提炼出错因时给出（最多 3 条）；如果无法判断，请输出空数组 []，不要输出占位词。
- 每条 mistakes 中：concept <= 10 字；reason <= 30 字；correct_approach <= 40 字；practice <= 40 字；evidence <= 30 字。
- key_points 建议 3-6 条，每条 <= 25 字。
- review_plan 建议 3-6 条，每条 <= 28 字。
- evidence 用 OCR 文本中的短片段引用（若无把握可留空字符串）。

OCR_TEXT:
{ocr_text}"#
    )
}
