//! Core data models for studia.
//!
//! These types are shared across all studia crates and represent the
//! domain entities: users, source records (notes and error-book entries),
//! knowledge nodes, and the knowledge-map payloads assembled from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

// =============================================================================
// USER TYPES
// =============================================================================

/// Account role. Parents see their linked students' data read-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Parent,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Parent => "parent",
        }
    }

    /// Parse a stored role string, defaulting to `Student`.
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "parent" => UserRole::Parent,
            _ => UserRole::Student,
        }
    }
}

/// A user account. Authentication itself lives in an upstream gateway;
/// this record exists for ownership scoping and the parent-student link.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub role: UserRole,
    /// Parent side of a parent-student binding, stored on either end.
    pub linked_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// NOTE TYPES
// =============================================================================

/// Processing status of a classroom note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    #[default]
    Created,
    Summarizing,
    Done,
    SummaryFailed,
}

impl NoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteStatus::Created => "created",
            NoteStatus::Summarizing => "summarizing",
            NoteStatus::Done => "done",
            NoteStatus::SummaryFailed => "summary_failed",
        }
    }

    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "summarizing" => NoteStatus::Summarizing,
            "done" => NoteStatus::Done,
            "summary_failed" => NoteStatus::SummaryFailed,
            _ => NoteStatus::Created,
        }
    }
}

/// A classroom note: transcript plus the validated structured summary
/// produced by the summary pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Note {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub focus_tag: Option<String>,
    pub status: NoteStatus,
    pub transcript: Option<String>,
    /// Validated summary payload (title/subject/summary_points/key_terms).
    pub summary: Option<JsonValue>,
    /// Validated task list payload ({"tasks": [...]}).
    pub tasks: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Default display title for an untitled note.
pub const UNTITLED_NOTE: &str = "未命名笔记";

/// Characters kept in the transcript preview of a note list item.
const TRANSCRIPT_PREVIEW_CHARS: usize = 160;

/// List/summary projection of a note.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NoteListItem {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub focus_tag: String,
    pub status: NoteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub transcript_preview: String,
}

impl Note {
    /// Build the list projection with display fallbacks applied.
    pub fn list_item(&self) -> NoteListItem {
        let transcript = self.transcript.as_deref().unwrap_or("");
        let cleaned = transcript.trim().replace('\r', "");
        let mut preview: String = cleaned.chars().take(TRANSCRIPT_PREVIEW_CHARS).collect();
        if cleaned.chars().count() > TRANSCRIPT_PREVIEW_CHARS {
            preview.push('…');
        }
        NoteListItem {
            id: self.id,
            title: display_title(self.title.as_deref(), UNTITLED_NOTE),
            subject: self.subject.clone().unwrap_or_default(),
            focus_tag: self.focus_tag.clone().unwrap_or_default(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            transcript_preview: preview,
        }
    }
}

/// Detail projection of a note: the list fields plus the full transcript
/// and the stored summary/tasks payloads.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NoteDetail {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub focus_tag: String,
    pub status: NoteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub transcript_preview: String,
    pub transcript: String,
    /// Validated summary payload, absent until the pipeline has run.
    pub summary: Option<JsonValue>,
    /// Task items unwrapped from the stored `{"tasks": [...]}` payload.
    pub tasks: Vec<JsonValue>,
}

impl Note {
    /// Build the detail projection.
    pub fn detail(&self) -> NoteDetail {
        let item = self.list_item();
        let tasks = self
            .tasks
            .as_ref()
            .and_then(|payload| payload.get("tasks"))
            .and_then(JsonValue::as_array)
            .cloned()
            .unwrap_or_default();
        NoteDetail {
            id: item.id,
            title: item.title,
            subject: item.subject,
            focus_tag: item.focus_tag,
            status: item.status,
            created_at: item.created_at,
            updated_at: item.updated_at,
            transcript_preview: item.transcript_preview,
            transcript: self.transcript.clone().unwrap_or_default(),
            summary: self.summary.clone(),
            tasks,
        }
    }
}

/// Request payload for creating a note.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateNoteRequest {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub focus_tag: Option<String>,
    pub transcript: String,
}

// =============================================================================
// ERROR-BOOK TYPES
// =============================================================================

/// Processing status of an error-book entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorEntryStatus {
    #[default]
    Created,
    Done,
    OcrFailed,
    AiFailed,
}

impl ErrorEntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorEntryStatus::Created => "created",
            ErrorEntryStatus::Done => "done",
            ErrorEntryStatus::OcrFailed => "ocr_failed",
            ErrorEntryStatus::AiFailed => "ai_failed",
        }
    }

    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "done" => ErrorEntryStatus::Done,
            "ocr_failed" => ErrorEntryStatus::OcrFailed,
            "ai_failed" => ErrorEntryStatus::AiFailed,
            _ => ErrorEntryStatus::Created,
        }
    }
}

/// An error-book entry: OCR text plus the free-text AI analysis that may
/// embed one JSON object (mistakes, key points, review plan).
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorEntry {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub status: ErrorEntryStatus,
    pub verdict: Option<String>,
    pub ocr_text: Option<String>,
    pub analysis: Option<String>,
    pub quiz: Option<JsonValue>,
    pub quiz_created_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Default display title for an untitled error entry.
pub const UNTITLED_ERROR_ENTRY: &str = "未命名错题";

/// List/summary projection of an error-book entry.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorEntryListItem {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub status: ErrorEntryStatus,
    pub verdict: String,
    pub created_at: DateTime<Utc>,
}

impl ErrorEntry {
    /// Build the list projection with display fallbacks applied.
    pub fn list_item(&self) -> ErrorEntryListItem {
        ErrorEntryListItem {
            id: self.id,
            title: display_title(self.title.as_deref(), UNTITLED_ERROR_ENTRY),
            subject: self.subject.clone().unwrap_or_default(),
            status: self.status,
            verdict: self.verdict.clone().unwrap_or_default(),
            created_at: self.created_at,
        }
    }
}

/// Detail projection of an error-book entry: the list fields plus the
/// OCR text, the analysis, and the stored quiz when it validates.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorEntryDetail {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub status: ErrorEntryStatus,
    pub verdict: String,
    pub created_at: DateTime<Utc>,
    pub ocr_text: String,
    pub analysis: String,
    /// Stored quiz, re-validated on read; `None` if absent or malformed.
    pub quiz: Option<Quiz>,
    pub quiz_created_at: Option<DateTime<Utc>>,
}

impl ErrorEntry {
    /// Build the detail projection.
    pub fn detail(&self) -> ErrorEntryDetail {
        let item = self.list_item();
        let quiz = self
            .quiz
            .as_ref()
            .and_then(JsonValue::as_object)
            .and_then(|obj| crate::quiz::validate_quiz(obj).ok());
        ErrorEntryDetail {
            id: item.id,
            title: item.title,
            subject: item.subject,
            status: item.status,
            verdict: item.verdict,
            created_at: item.created_at,
            ocr_text: self.ocr_text.clone().unwrap_or_default(),
            analysis: self.analysis.clone().unwrap_or_default(),
            quiz,
            quiz_created_at: self.quiz_created_at,
        }
    }
}

/// Request payload for creating an error-book entry.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CreateErrorEntryRequest {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub verdict: Option<String>,
    pub ocr_text: Option<String>,
    pub analysis: Option<String>,
}

fn display_title(title: Option<&str>, fallback: &str) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => fallback.to_string(),
    }
}

// =============================================================================
// KNOWLEDGE NODE TYPES
// =============================================================================

/// Kind of a knowledge node. `Concept` is the generic default; a node's
/// kind is only ever upgraded away from it, never across specific kinds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Chapter,
    #[default]
    Concept,
    Method,
    Mistake,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Chapter => "chapter",
            NodeKind::Concept => "concept",
            NodeKind::Method => "method",
            NodeKind::Mistake => "mistake",
        }
    }

    /// Parse a kind string; anything outside the four valid kinds maps to
    /// the generic `Concept`.
    pub fn parse_or_concept(s: &str) -> Self {
        match s {
            "chapter" => NodeKind::Chapter,
            "method" => NodeKind::Method,
            "mistake" => NodeKind::Mistake,
            _ => NodeKind::Concept,
        }
    }

    /// Whether this is the generic default kind.
    pub fn is_generic(&self) -> bool {
        matches!(self, NodeKind::Concept)
    }
}

/// A deduplicated knowledge-graph vertex, unique per
/// (owner_id, subject, name).
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct KnowledgeNode {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub subject: String,
    pub name: String,
    pub kind: NodeKind,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

// =============================================================================
// KNOWLEDGE MAP TYPES
// =============================================================================

/// Kind of source record a knowledge map is generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Note,
    ErrorBook,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Note => "note",
            SourceType::ErrorBook => "error_book",
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "note" => Ok(SourceType::Note),
            "error_book" => Ok(SourceType::ErrorBook),
            other => Err(crate::Error::InvalidInput(format!(
                "source_type must be note or error_book, got {other:?}"
            ))),
        }
    }
}

/// Map generation mode. Only the literal `ai` selects the LLM tree path;
/// everything else (including absence) behaves deterministically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MapMode {
    #[default]
    Ai,
    Simple,
}

impl MapMode {
    /// Resolve the request parameter: `None` defaults to `Ai`, any string
    /// other than `"ai"` selects `Simple`.
    pub fn from_param(mode: Option<&str>) -> Self {
        match mode.map(str::trim) {
            None | Some("") | Some("ai") => MapMode::Ai,
            Some(_) => MapMode::Simple,
        }
    }
}

/// A directed parent→child edge between two materialized nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MapEdge {
    pub from: Uuid,
    pub to: Uuid,
}

/// Mistake-frequency highlight for one map node.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MapHighlight {
    pub node_id: Uuid,
    pub count: i64,
}

/// A co-occurring neighbor concept of a map node.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RelatedConcept {
    pub node_id: Uuid,
    pub name: String,
    pub count: i64,
}

/// A note backing a concept in the evidence panel.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EvidenceNote {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// An error entry backing a concept in the evidence panel.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EvidenceError {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub verdict: String,
}

/// Historical evidence attached to one map node.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NodeEvidence {
    pub notes: Vec<EvidenceNote>,
    pub errors: Vec<EvidenceError>,
}

/// Comparative insight for one highlighted node.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NodeInsight {
    pub summary: String,
    pub gaps: Vec<String>,
    pub actions: Vec<String>,
}

/// Source-record reference echoed in a knowledge-map response.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MapSource {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub subject: String,
}

/// Full knowledge-map generation result.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct KnowledgeMap {
    pub generated_at: DateTime<Utc>,
    pub source: MapSource,
    pub root_id: Uuid,
    pub nodes: Vec<KnowledgeNode>,
    pub edges: Vec<MapEdge>,
    pub highlights: Vec<MapHighlight>,
    pub related: HashMap<Uuid, Vec<RelatedConcept>>,
    pub evidence: HashMap<Uuid, NodeEvidence>,
    pub analysis: HashMap<Uuid, NodeInsight>,
}

/// Persisted point-in-time capture of one map generation. Insert-only.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MindMapSnapshot {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub source_type: SourceType,
    pub source_id: Uuid,
    pub root_node_id: Option<Uuid>,
    pub map: JsonValue,
    pub highlights: JsonValue,
    pub related: JsonValue,
    pub created_at: DateTime<Utc>,
}

/// Insert request for a mind-map snapshot.
#[derive(Debug, Clone)]
pub struct NewMindMapSnapshot {
    pub owner_id: Uuid,
    pub source_type: SourceType,
    pub source_id: Uuid,
    pub root_node_id: Option<Uuid>,
    pub map: JsonValue,
    pub highlights: JsonValue,
    pub related: JsonValue,
}

// =============================================================================
// TREE TYPES (LLM tree payload)
// =============================================================================

/// One node of an LLM-proposed concept tree. Parsed once at the boundary;
/// unknown kinds degrade to `concept` during merge, not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

// =============================================================================
// NOTE SUMMARY / QUIZ PAYLOADS
// =============================================================================

/// A task item extracted from a classroom transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SummaryTask {
    pub id: String,
    pub text: String,
    pub done: bool,
}

/// Validated note-summary payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NoteSummary {
    pub title: String,
    pub subject: String,
    pub summary_points: Vec<String>,
    pub key_terms: Vec<String>,
    pub tasks: Vec<SummaryTask>,
}

/// Validated practice-quiz payload generated from an error entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Quiz {
    pub question: String,
    pub options: Vec<String>,
    pub answer_index: i32,
    pub explanation: String,
    pub topic: String,
}

// =============================================================================
// DASHBOARD TYPES
// =============================================================================

/// Error-book totals across the caller's accessible owners.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorBookTotals {
    pub total_entries: i64,
    pub done: i64,
    pub ocr_failed: i64,
    pub ai_failed: i64,
    pub with_quiz: i64,
}

/// Entry count for one canonical subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SubjectCount {
    pub subject: String,
    pub count: i64,
}

/// Entry count for one UTC calendar date (ISO `YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

/// Mastery ranking entry: mistake frequency vs. reinforcing notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MasteryEntry {
    pub node_id: Uuid,
    pub subject: String,
    pub name: String,
    pub mistake_count: i64,
    pub note_count: i64,
}

/// Classroom-records block of the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ClassroomRecords {
    pub status: String,
    pub message: String,
    pub items: Vec<NoteListItem>,
}

/// Error-book block of the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorBookStats {
    pub totals: ErrorBookTotals,
    pub subjects: Vec<SubjectCount>,
    pub daily_counts: Vec<DailyCount>,
    pub recent_entries: Vec<ErrorEntryListItem>,
    pub top_key_points: Vec<String>,
    pub top_review_plan: Vec<String>,
    pub weak_concepts: Vec<String>,
}

/// Knowledge block of the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct KnowledgeStats {
    pub mastery: Vec<MasteryEntry>,
}

/// Full dashboard payload.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DashboardSummary {
    pub generated_at: DateTime<Utc>,
    pub classroom_records: ClassroomRecords,
    pub error_book: ErrorBookStats,
    pub knowledge: KnowledgeStats,
    pub insights: Vec<String>,
}

// =============================================================================
// PARENT REPORT TYPES
// =============================================================================

/// One weak-topic row of the parent report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct WeakTopic {
    pub subject: String,
    pub issue: String,
    pub suggestion: String,
}

/// One highlight card of the parent report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HighlightCard {
    pub title: String,
    pub detail: String,
}

/// Weekly parent-facing report, LLM-written with a deterministic fallback.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParentReport {
    pub week: String,
    pub overall_tone: String,
    pub ai_summary: String,
    pub encouragement: String,
    pub weak_topics: Vec<WeakTopic>,
    pub highlight_cards: Vec<HighlightCard>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_note() -> Note {
        Note {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: None,
            subject: None,
            focus_tag: None,
            status: NoteStatus::Created,
            transcript: None,
            summary: None,
            tasks: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_node_kind_parse_or_concept() {
        assert_eq!(NodeKind::parse_or_concept("chapter"), NodeKind::Chapter);
        assert_eq!(NodeKind::parse_or_concept("method"), NodeKind::Method);
        assert_eq!(NodeKind::parse_or_concept("mistake"), NodeKind::Mistake);
        assert_eq!(NodeKind::parse_or_concept("concept"), NodeKind::Concept);
        assert_eq!(NodeKind::parse_or_concept("galaxy"), NodeKind::Concept);
        assert_eq!(NodeKind::parse_or_concept(""), NodeKind::Concept);
    }

    #[test]
    fn test_node_kind_is_generic() {
        assert!(NodeKind::Concept.is_generic());
        assert!(!NodeKind::Chapter.is_generic());
        assert!(!NodeKind::Method.is_generic());
        assert!(!NodeKind::Mistake.is_generic());
    }

    #[test]
    fn test_node_kind_serde_lowercase() {
        let json = serde_json::to_string(&NodeKind::Mistake).unwrap();
        assert_eq!(json, "\"mistake\"");
        let back: NodeKind = serde_json::from_str("\"chapter\"").unwrap();
        assert_eq!(back, NodeKind::Chapter);
    }

    #[test]
    fn test_source_type_round_trip() {
        assert_eq!("note".parse::<SourceType>().unwrap(), SourceType::Note);
        assert_eq!(
            "error_book".parse::<SourceType>().unwrap(),
            SourceType::ErrorBook
        );
        assert!("quiz".parse::<SourceType>().is_err());
        assert_eq!(SourceType::ErrorBook.as_str(), "error_book");
    }

    #[test]
    fn test_map_mode_from_param() {
        assert_eq!(MapMode::from_param(None), MapMode::Ai);
        assert_eq!(MapMode::from_param(Some("ai")), MapMode::Ai);
        assert_eq!(MapMode::from_param(Some("  ai  ")), MapMode::Ai);
        assert_eq!(MapMode::from_param(Some("")), MapMode::Ai);
        assert_eq!(MapMode::from_param(Some("simple")), MapMode::Simple);
        // Anything that is not exactly "ai" takes the deterministic path.
        assert_eq!(MapMode::from_param(Some("AI")), MapMode::Simple);
    }

    #[test]
    fn test_note_list_item_title_fallback() {
        let mut note = sample_note();
        assert_eq!(note.list_item().title, UNTITLED_NOTE);

        note.title = Some("  ".to_string());
        assert_eq!(note.list_item().title, UNTITLED_NOTE);

        note.title = Some("函数图像".to_string());
        assert_eq!(note.list_item().title, "函数图像");
    }

    #[test]
    fn test_note_list_item_preview_truncation() {
        let mut note = sample_note();
        note.transcript = Some("天".repeat(200));
        let item = note.list_item();
        assert_eq!(item.transcript_preview.chars().count(), 161);
        assert!(item.transcript_preview.ends_with('…'));

        note.transcript = Some("short\r\ntext".to_string());
        assert_eq!(note.list_item().transcript_preview, "short\ntext");
    }

    #[test]
    fn test_error_entry_list_item_fallbacks() {
        let entry = ErrorEntry {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: None,
            subject: None,
            status: ErrorEntryStatus::Done,
            verdict: None,
            ocr_text: None,
            analysis: None,
            quiz: None,
            quiz_created_at: None,
            created_at: Utc::now(),
        };
        let item = entry.list_item();
        assert_eq!(item.title, UNTITLED_ERROR_ENTRY);
        assert_eq!(item.subject, "");
        assert_eq!(item.verdict, "");
    }

    #[test]
    fn test_note_detail_unwraps_tasks() {
        let mut note = sample_note();
        assert!(note.detail().tasks.is_empty());
        assert!(note.detail().summary.is_none());

        note.tasks = Some(serde_json::json!({
            "tasks": [{"id": "t1", "text": "完成课后练习", "done": false}]
        }));
        note.summary = Some(serde_json::json!({"title": "分式方程"}));
        let detail = note.detail();
        assert_eq!(detail.tasks.len(), 1);
        assert_eq!(detail.tasks[0]["id"], "t1");
        assert!(detail.summary.is_some());

        // A malformed tasks payload degrades to an empty list.
        note.tasks = Some(serde_json::json!({"tasks": "oops"}));
        assert!(note.detail().tasks.is_empty());
    }

    #[test]
    fn test_error_entry_detail_revalidates_quiz() {
        let mut entry = ErrorEntry {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: None,
            subject: Some("数学".to_string()),
            status: ErrorEntryStatus::Done,
            verdict: None,
            ocr_text: Some("解方程 2x = 4".to_string()),
            analysis: None,
            quiz: None,
            quiz_created_at: None,
            created_at: Utc::now(),
        };
        assert!(entry.detail().quiz.is_none());

        entry.quiz = Some(serde_json::json!({
            "question": "2x = 6，x 等于几？",
            "options": ["1", "2", "3", "4"],
            "answer_index": 2,
            "explanation": "两边同除以 2。",
            "topic": "一元一次方程"
        }));
        let detail = entry.detail();
        let quiz = detail.quiz.unwrap();
        assert_eq!(quiz.answer_index, 2);
        assert_eq!(detail.ocr_text, "解方程 2x = 4");

        // A stored quiz that no longer validates is hidden, not surfaced.
        entry.quiz = Some(serde_json::json!({
            "question": "残缺的题目",
            "options": ["只有", "三个", "选项"],
            "answer_index": 0
        }));
        assert!(entry.detail().quiz.is_none());
    }

    #[test]
    fn test_tree_node_deserializes_with_defaults() {
        let node: TreeNode = serde_json::from_str(r#"{"name": "二次函数"}"#).unwrap();
        assert_eq!(node.name, "二次函数");
        assert_eq!(node.kind, "");
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_parent_report_serde_camel_case() {
        let report = ParentReport {
            week: "08.10 - 08.16".to_string(),
            overall_tone: "稳中有进".to_string(),
            ai_summary: String::new(),
            encouragement: String::new(),
            weak_topics: vec![],
            highlight_cards: vec![],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("overallTone").is_some());
        assert!(json.get("highlightCards").is_some());
    }

    #[test]
    fn test_knowledge_map_related_serializes_uuid_keys() {
        let node_id = Uuid::new_v4();
        let mut related = HashMap::new();
        related.insert(
            node_id,
            vec![RelatedConcept {
                node_id: Uuid::new_v4(),
                name: "判别式".to_string(),
                count: 2,
            }],
        );
        let json = serde_json::to_value(&related).unwrap();
        assert!(json.get(node_id.to_string()).is_some());
    }
}
