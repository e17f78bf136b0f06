//! Dashboard aggregation across classroom notes, the error book, and the
//! knowledge graph.
//!
//! One call assembles the whole student (or linked-parent) dashboard:
//! error-book totals and trends, recurring themes mined from recent
//! analysis payloads, classroom-note recency, and the mastery ranking.

use std::collections::HashMap;
use std::time::Instant;

use chrono::{Duration, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

use studia_core::defaults::{
    DASHBOARD_RECENT_ENTRIES, DASHBOARD_RECENT_NOTES, DASHBOARD_TOP, DASHBOARD_WINDOW,
    MASTERY_ERROR_WINDOW, MASTERY_NODE_WINDOW, MASTERY_NOTE_WINDOW,
};
use studia_core::{
    extract_first_json_object, normalize_subject, ClassroomRecords, DailyCount, DashboardSummary,
    ErrorBookRepository, ErrorBookStats, ErrorBookTotals, ErrorEntry, KnowledgeNodeRepository,
    KnowledgeStats, Note, NoteRepository, Result, SubjectCount, User, UserRepository,
    UNCLASSIFIED_SUBJECT,
};
use studia_db::Database;

use crate::mastery::mastery_ranking;

/// Assembles the dashboard payload from persisted records.
pub struct DashboardAggregator {
    db: Database,
}

impl DashboardAggregator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Build the full dashboard over every owner the user may read.
    #[instrument(skip(self, user), fields(
        subsystem = "graph",
        component = "dashboard",
        op = "summarize",
        user_id = %user.id,
    ))]
    pub async fn summarize(&self, user: &User) -> Result<DashboardSummary> {
        let start = Instant::now();
        let scope = self.db.users.accessible_owner_ids(user).await?;

        let recent = self
            .db
            .error_book
            .recent_for_owners(&scope, DASHBOARD_WINDOW)
            .await?;
        let totals = self.db.error_book.totals(&scope).await?;
        let subjects = subject_distribution(&recent);
        let daily_counts = daily_histogram(&recent, Utc::now().date_naive());
        let digest = mine_recent_analysis(&recent);
        let insights = build_insights(&totals, &subjects, &daily_counts, &digest);

        let notes = self
            .db
            .notes
            .recent_for_owners(&scope, DASHBOARD_RECENT_NOTES)
            .await?;
        let classroom_records = classroom_block(&notes);

        let nodes = self
            .db
            .knowledge
            .recent_for_owners(&scope, MASTERY_NODE_WINDOW)
            .await?;
        let mastery_errors = self
            .db
            .error_book
            .recent_for_owners(&scope, MASTERY_ERROR_WINDOW)
            .await?;
        let mastery_notes = self
            .db
            .notes
            .recent_for_owners(&scope, MASTERY_NOTE_WINDOW)
            .await?;
        let mastery = mastery_ranking(&nodes, &mastery_notes, &mastery_errors);

        debug!(
            scope_size = scope.len(),
            recent_entries = recent.len(),
            mastery_entries = mastery.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Dashboard assembled"
        );

        Ok(DashboardSummary {
            generated_at: Utc::now(),
            classroom_records,
            error_book: ErrorBookStats {
                totals,
                subjects,
                daily_counts,
                recent_entries: recent
                    .iter()
                    .take(DASHBOARD_RECENT_ENTRIES)
                    .map(ErrorEntry::list_item)
                    .collect(),
                top_key_points: digest.top_key_points,
                top_review_plan: digest.top_review_plan,
                weak_concepts: digest.weak_concepts,
            },
            knowledge: KnowledgeStats { mastery },
            insights,
        })
    }
}

/// Recurring themes mined from recent analysis payloads.
#[derive(Debug, Default)]
pub struct AnalysisDigest {
    pub top_key_points: Vec<String>,
    pub top_review_plan: Vec<String>,
    pub weak_concepts: Vec<String>,
}

/// Entry counts per canonical subject, most frequent first.
pub fn subject_distribution(entries: &[ErrorEntry]) -> Vec<SubjectCount> {
    let mut counts: HashMap<String, i64> = HashMap::new();
    for entry in entries {
        let subject = normalize_subject(entry.subject.as_deref().unwrap_or(""));
        *counts.entry(subject).or_insert(0) += 1;
    }
    let mut subjects: Vec<SubjectCount> = counts
        .into_iter()
        .map(|(subject, count)| SubjectCount { subject, count })
        .collect();
    subjects.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.subject.cmp(&b.subject)));
    subjects
}

/// Entry counts for the seven UTC dates ending at `today`, oldest first.
pub fn daily_histogram(entries: &[ErrorEntry], today: NaiveDate) -> Vec<DailyCount> {
    (0..7)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let count = entries
                .iter()
                .filter(|entry| entry.created_at.date_naive() == date)
                .count() as i64;
            DailyCount {
                date: date.to_string(),
                count,
            }
        })
        .collect()
}

/// Mine recurring key points, review-plan items, and weak concepts from
/// recent analysis payloads.
///
/// Only strictly valid JSON objects participate; a malformed analysis is
/// skipped rather than partially counted. Items are counted verbatim
/// (trimmed, not normalized) so the dashboard echoes the model's own
/// phrasing.
pub fn mine_recent_analysis(entries: &[ErrorEntry]) -> AnalysisDigest {
    let mut key_points: HashMap<String, i64> = HashMap::new();
    let mut review_plan: HashMap<String, i64> = HashMap::new();
    let mut weak: HashMap<String, i64> = HashMap::new();

    for entry in entries {
        let Some(analysis) = entry.analysis.as_deref() else {
            continue;
        };
        let Some(extracted) = extract_first_json_object(analysis) else {
            continue;
        };
        let Ok(payload) = serde_json::from_str::<JsonValue>(&extracted) else {
            continue;
        };
        let Some(payload) = payload.as_object() else {
            continue;
        };

        for item in list_of(payload.get("key_points")) {
            count_text(&mut key_points, item);
        }
        for item in list_of(payload.get("review_plan")) {
            count_text(&mut review_plan, item);
        }
        for mistake in list_of(payload.get("mistakes")) {
            let Some(obj) = mistake.as_object() else {
                continue;
            };
            if let Some(concept) = obj.get("concept") {
                count_text(&mut weak, concept);
            }
        }
    }

    AnalysisDigest {
        top_key_points: ranked_top(key_points, DASHBOARD_TOP),
        top_review_plan: ranked_top(review_plan, DASHBOARD_TOP),
        weak_concepts: ranked_top(weak, DASHBOARD_TOP),
    }
}

/// Headline strings shown at the top of the dashboard.
pub fn build_insights(
    totals: &ErrorBookTotals,
    subjects: &[SubjectCount],
    daily_counts: &[DailyCount],
    digest: &AnalysisDigest,
) -> Vec<String> {
    let seven_day_total: i64 = daily_counts.iter().map(|day| day.count).sum();
    let top_subject = subjects
        .first()
        .map(|entry| entry.subject.clone())
        .unwrap_or_else(|| UNCLASSIFIED_SUBJECT.to_string());

    let mut insights = vec![
        format!("近 7 天新增错题：{seven_day_total} 条"),
        format!(
            "错题总数：{} 条（完成：{} / OCR失败：{} / AI失败：{}）",
            totals.total_entries, totals.done, totals.ocr_failed, totals.ai_failed
        ),
        format!("高频科目：{top_subject}"),
    ];
    if !digest.weak_concepts.is_empty() {
        let head: Vec<String> = digest.weak_concepts.iter().take(3).cloned().collect();
        insights.push(format!("高频薄弱知识点：{}", head.join("、")));
    }
    if !digest.top_review_plan.is_empty() {
        let head: Vec<String> = digest.top_review_plan.iter().take(2).cloned().collect();
        insights.push(format!("建议优先复习：{}", head.join("；")));
    }
    insights
}

fn classroom_block(notes: &[Note]) -> ClassroomRecords {
    let (status, message) = if notes.is_empty() {
        ("empty", "暂无课堂记录，请先在笔记助手完成一次转写。")
    } else {
        ("ready", "来自笔记助手的课堂转写与摘要。")
    };
    ClassroomRecords {
        status: status.to_string(),
        message: message.to_string(),
        items: notes.iter().map(Note::list_item).collect(),
    }
}

fn list_of(value: Option<&JsonValue>) -> &[JsonValue] {
    value
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn count_text(counter: &mut HashMap<String, i64>, value: &JsonValue) {
    let text = match value {
        JsonValue::String(s) => s.trim().to_string(),
        JsonValue::Number(n) => n.to_string(),
        _ => String::new(),
    };
    if !text.is_empty() {
        *counter.entry(text).or_insert(0) += 1;
    }
}

fn ranked_top(counter: HashMap<String, i64>, limit: usize) -> Vec<String> {
    let mut items: Vec<(String, i64)> = counter.into_iter().collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items.into_iter().take(limit).map(|(text, _)| text).collect()
}
