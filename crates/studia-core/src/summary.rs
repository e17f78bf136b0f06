//! Note-summary payload validation.
//!
//! The summary pipeline asks the model for a fixed JSON shape; this module
//! coerces whatever came back into a [`NoteSummary`] that is always safe to
//! persist and render. Validation never fails outright: missing or broken
//! fields degrade to fallbacks and empty lists.

use serde_json::{Map, Value as JsonValue};

use crate::defaults::{KEY_TERMS_CAP, NOTE_FALLBACK_TITLE, SUMMARY_POINTS_CAP, TASKS_CAP};
use crate::models::{NoteSummary, SummaryTask};
use crate::normalize::normalize_subject;

/// Coerce a parsed model payload into a valid [`NoteSummary`].
///
/// Title falls back to [`NOTE_FALLBACK_TITLE`], the subject is mapped onto
/// the canonical list, point/term lists are trimmed and capped, and tasks
/// keep their model-assigned ids where present (`t{n}` otherwise).
pub fn validate_note_summary(parsed: &Map<String, JsonValue>) -> NoteSummary {
    let title = parsed
        .get("title")
        .map(text_of)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NOTE_FALLBACK_TITLE.to_string());

    let subject = normalize_subject(
        parsed
            .get("subject")
            .and_then(JsonValue::as_str)
            .unwrap_or(""),
    );

    let mut summary_points = string_list(parsed.get("summary_points"));
    summary_points.truncate(SUMMARY_POINTS_CAP);

    let mut key_terms = string_list(parsed.get("key_terms"));
    key_terms.truncate(KEY_TERMS_CAP);

    let mut tasks: Vec<SummaryTask> = Vec::new();
    if let Some(JsonValue::Array(items)) = parsed.get("tasks") {
        for (idx, item) in items.iter().take(TASKS_CAP).enumerate() {
            let Some(item) = item.as_object() else { continue };
            let text = item
                .get("text")
                .and_then(JsonValue::as_str)
                .map(str::trim)
                .unwrap_or("");
            if text.is_empty() {
                continue;
            }
            let fallback_id = format!("t{}", idx + 1);
            let id = item
                .get("id")
                .map(text_of)
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .unwrap_or(fallback_id);
            let done = item
                .get("done")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false);
            tasks.push(SummaryTask {
                id,
                text: text.to_string(),
                done,
            });
        }
    }

    NoteSummary {
        title,
        subject,
        summary_points,
        key_terms,
        tasks,
    }
}

fn string_list(value: Option<&JsonValue>) -> Vec<String> {
    let Some(JsonValue::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .map(text_of)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn text_of(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_full_payload_passes_through() {
        let parsed = as_map(json!({
            "title": " 二次函数复习 ",
            "subject": "奥数",
            "summary_points": ["顶点式：配方得到", "  ", "判别式的符号"],
            "key_terms": ["二次函数", "判别式"],
            "tasks": [
                {"id": "hw-1", "text": "完成练习册 12 页", "done": false},
                {"text": "  预习下一节 ", "done": true},
            ],
        }));
        let summary = validate_note_summary(&parsed);
        assert_eq!(summary.title, "二次函数复习");
        assert_eq!(summary.subject, "数学");
        assert_eq!(summary.summary_points, vec!["顶点式：配方得到", "判别式的符号"]);
        assert_eq!(summary.key_terms, vec!["二次函数", "判别式"]);
        assert_eq!(summary.tasks.len(), 2);
        assert_eq!(summary.tasks[0].id, "hw-1");
        assert_eq!(summary.tasks[1].id, "t2");
        assert_eq!(summary.tasks[1].text, "预习下一节");
        assert!(summary.tasks[1].done);
    }

    #[test]
    fn test_empty_payload_gets_fallbacks() {
        let summary = validate_note_summary(&Map::new());
        assert_eq!(summary.title, NOTE_FALLBACK_TITLE);
        assert_eq!(summary.subject, "未分类");
        assert!(summary.summary_points.is_empty());
        assert!(summary.key_terms.is_empty());
        assert!(summary.tasks.is_empty());
    }

    #[test]
    fn test_lists_are_capped_after_filtering() {
        let points: Vec<String> = (0..20).map(|i| format!("要点{i}")).collect();
        let terms: Vec<String> = (0..20).map(|i| format!("术语{i}")).collect();
        let parsed = as_map(json!({
            "summary_points": points,
            "key_terms": terms,
        }));
        let summary = validate_note_summary(&parsed);
        assert_eq!(summary.summary_points.len(), SUMMARY_POINTS_CAP);
        assert_eq!(summary.key_terms.len(), KEY_TERMS_CAP);
    }

    #[test]
    fn test_tasks_sliced_before_validation() {
        // Cap applies to raw items, so junk inside the window is not
        // backfilled from beyond it.
        let mut items: Vec<JsonValue> = (0..TASKS_CAP)
            .map(|i| {
                if i % 2 == 0 {
                    json!({"text": format!("任务{i}")})
                } else {
                    json!("junk")
                }
            })
            .collect();
        items.push(json!({"text": "窗口之外"}));
        let parsed = as_map(json!({ "tasks": items }));
        let summary = validate_note_summary(&parsed);
        assert_eq!(summary.tasks.len(), TASKS_CAP / 2);
        assert!(summary.tasks.iter().all(|t| t.text != "窗口之外"));
    }

    #[test]
    fn test_task_ids_keep_slice_position() {
        let parsed = as_map(json!({
            "tasks": [
                {"text": ""},
                {"text": "有效任务"},
            ],
        }));
        let summary = validate_note_summary(&parsed);
        assert_eq!(summary.tasks.len(), 1);
        // Fallback id reflects the original position, not the kept count.
        assert_eq!(summary.tasks[0].id, "t2");
    }

    #[test]
    fn test_non_list_fields_degrade() {
        let parsed = as_map(json!({
            "title": {"not": "a string"},
            "summary_points": "不是数组",
            "key_terms": {"a": 1},
            "tasks": "也不是数组",
        }));
        let summary = validate_note_summary(&parsed);
        assert_eq!(summary.title, NOTE_FALLBACK_TITLE);
        assert!(summary.summary_points.is_empty());
        assert!(summary.key_terms.is_empty());
        assert!(summary.tasks.is_empty());
    }
}
