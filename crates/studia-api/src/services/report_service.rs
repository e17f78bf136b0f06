//! Parent weekly report assembly.
//!
//! The report is drafted by the generation backend from the dashboard
//! payload. When the model call fails or the draft is unusable, a
//! deterministic fallback built from the same payload takes over, so
//! the endpoint itself never fails on generation. Either way the final
//! report passes through the same sanitization caps.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{Map, Value as JsonValue};
use tracing::{info, instrument, warn};

use studia_core::{
    extract_first_json_object, parse_lenient_object, DashboardSummary, GenerationBackend,
    HighlightCard, ParentReport, Result, WeakTopic,
};

/// Items kept per report list.
const MAX_LIST_ITEMS: usize = 6;
/// Character caps per field, matching what the clients render.
const MAX_TOPIC_SUBJECT_CHARS: usize = 40;
const MAX_TOPIC_ISSUE_CHARS: usize = 60;
const MAX_TOPIC_SUGGESTION_CHARS: usize = 60;
const MAX_CARD_TITLE_CHARS: usize = 16;
const MAX_CARD_DETAIL_CHARS: usize = 80;

/// Generation-backed weekly report service.
#[derive(Clone)]
pub struct ReportService {
    backend: Arc<dyn GenerationBackend>,
}

impl ReportService {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Assemble the weekly parent report from a dashboard payload.
    #[instrument(skip_all, fields(subsystem = "api", component = "report", op = "weekly"))]
    pub async fn weekly_report(&self, dashboard: &DashboardSummary) -> ParentReport {
        let draft = match self.request_draft(dashboard).await {
            Ok(draft) => draft,
            Err(err) => {
                warn!(error = %err, "Parent report generation failed, using fallback");
                None
            }
        };

        let (report, source) = match draft {
            Some(report) if !report.overall_tone.trim().is_empty() => (report, "model"),
            _ => (fallback_report(dashboard), "fallback"),
        };
        info!(source, "Parent report assembled");

        sanitize_report(report)
    }

    /// One generation attempt. `Ok(None)` means the response carried no
    /// usable JSON object; the caller falls back either way.
    async fn request_draft(&self, dashboard: &DashboardSummary) -> Result<Option<ParentReport>> {
        let prompt = report_prompt(dashboard);
        let raw = self.backend.generate(&prompt).await?;

        let Some(extracted) = extract_first_json_object(&raw) else {
            return Ok(None);
        };
        let Some(parsed) = parse_lenient_object(&extracted) else {
            return Ok(None);
        };
        Ok(Some(draft_from_map(&parsed)))
    }
}

/// Build the weekly-report prompt around the serialized dashboard.
pub fn report_prompt(dashboard: &DashboardSummary) -> String {
    let payload = serde_json::to_string(dashboard).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"只输出 JSON，禁止 markdown/解释文字/多余字符。
你是家长视图的学习周报助手。根据学习数据，生成简洁、友好、可执行的家长周报。
需要综合：错题统计、课堂笔记（转写/总结）以及知识点掌握情况，体现学习进度与下一步行动。
JSON schema（必须严格匹配）：
{{
  "week": string,
  "overallTone": string,
  "aiSummary": string,
  "encouragement": string,
  "weakTopics": [{{"subject": string, "issue": string, "suggestion": string}}],
  "highlightCards": [{{"title": string, "detail": string}}]
}}
要求：
- week 为近 7 天日期范围，格式如 "12.10 - 12.16"。
- overallTone/aiSummary/encouragement 每段 1-2 句，避免夸张数字与空话。
- weakTopics 2-4 条，建议必须可执行。
- highlightCards 2-4 条，标题 <= 10 字，detail <= 24 字。
输入数据（JSON）：
{payload}"#
    )
}

fn draft_from_map(parsed: &Map<String, JsonValue>) -> ParentReport {
    ParentReport {
        week: trimmed_text(parsed.get("week")),
        overall_tone: trimmed_text(parsed.get("overallTone")),
        ai_summary: trimmed_text(parsed.get("aiSummary")),
        encouragement: trimmed_text(parsed.get("encouragement")),
        weak_topics: parsed
            .get("weakTopics")
            .and_then(JsonValue::as_array)
            .map(|items| {
                items
                    .iter()
                    .take(MAX_LIST_ITEMS)
                    .filter_map(JsonValue::as_object)
                    .map(|item| WeakTopic {
                        subject: trimmed_text(item.get("subject")),
                        issue: trimmed_text(item.get("issue")),
                        suggestion: trimmed_text(item.get("suggestion")),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        highlight_cards: parsed
            .get("highlightCards")
            .and_then(JsonValue::as_array)
            .map(|items| {
                items
                    .iter()
                    .take(MAX_LIST_ITEMS)
                    .filter_map(JsonValue::as_object)
                    .map(|item| HighlightCard {
                        title: trimmed_text(item.get("title")),
                        detail: trimmed_text(item.get("detail")),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn trimmed_text(value: Option<&JsonValue>) -> String {
    match value {
        Some(JsonValue::String(s)) => s.trim().to_string(),
        Some(JsonValue::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Deterministic report built straight from the dashboard numbers.
pub fn fallback_report(dashboard: &DashboardSummary) -> ParentReport {
    let totals = &dashboard.error_book.totals;
    let top_subject = dashboard
        .error_book
        .subjects
        .first()
        .map(|s| s.subject.clone())
        .unwrap_or_default();

    let joined: Vec<&str> = dashboard
        .insights
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(3)
        .collect();
    let insights_text = if joined.is_empty() {
        format!(
            "近 7 天学习数据已汇总，错题总数 {} 条。",
            totals.total_entries
        )
    } else {
        joined.join("；")
    };

    let mut weak_topics: Vec<WeakTopic> = dashboard
        .error_book
        .weak_concepts
        .iter()
        .take(3)
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(|name| {
            let subject = if top_subject.is_empty() {
                "未分类"
            } else {
                &top_subject
            };
            WeakTopic {
                subject: format!("{subject} · {name}"),
                issue: "高频薄弱点，需要反复巩固".to_string(),
                suggestion: "用 3 道变式题 + 1 次口述复盘".to_string(),
            }
        })
        .collect();
    if weak_topics.is_empty() {
        weak_topics.push(WeakTopic {
            subject: if top_subject.is_empty() {
                "综合".to_string()
            } else {
                top_subject.clone()
            },
            issue: "需要保持稳定复习节奏".to_string(),
            suggestion: "每天 15 分钟错题回顾 + 当日小测".to_string(),
        });
    }

    let mut highlight_cards = vec![
        HighlightCard {
            title: "错题总量".to_string(),
            detail: format!("{} 条（已完成 {}）", totals.total_entries, totals.done),
        },
        HighlightCard {
            title: "练习题".to_string(),
            detail: format!("已生成 {} 份练习", totals.with_quiz),
        },
    ];
    if !dashboard.classroom_records.items.is_empty() {
        highlight_cards.push(HighlightCard {
            title: "课堂笔记".to_string(),
            detail: format!(
                "近 10 条有记录（共 {} 条）",
                dashboard.classroom_records.items.len()
            ),
        });
    }
    if !dashboard.knowledge.mastery.is_empty() {
        highlight_cards.push(HighlightCard {
            title: "知识点".to_string(),
            detail: format!("覆盖 {} 个节点", dashboard.knowledge.mastery.len()),
        });
    }

    ParentReport {
        week: fallback_week(),
        overall_tone: format!("本周学习数据概览：{insights_text}"),
        ai_summary: "建议围绕薄弱点做“短频快”复习：看一遍要点→做两题→讲给家长听。".to_string(),
        encouragement: "只要每天稳定一点点，理解和自信都会积累起来。家长多关注过程，少盯结果。"
            .to_string(),
        weak_topics,
        highlight_cards,
    }
}

/// Last-7-days range in `MM.DD - MM.DD` form.
fn fallback_week() -> String {
    let end = Utc::now().date_naive();
    let start = end - Duration::days(6);
    format!("{} - {}", start.format("%m.%d"), end.format("%m.%d"))
}

/// Trim every string, cap list sizes and field lengths, and make sure
/// the week label is present.
fn sanitize_report(mut report: ParentReport) -> ParentReport {
    report.week = report.week.trim().to_string();
    if report.week.is_empty() {
        report.week = fallback_week();
    }
    report.overall_tone = report.overall_tone.trim().to_string();
    report.ai_summary = report.ai_summary.trim().to_string();
    report.encouragement = report.encouragement.trim().to_string();

    report.weak_topics.truncate(MAX_LIST_ITEMS);
    for topic in &mut report.weak_topics {
        topic.subject = cap_chars(&topic.subject, MAX_TOPIC_SUBJECT_CHARS);
        topic.issue = cap_chars(&topic.issue, MAX_TOPIC_ISSUE_CHARS);
        topic.suggestion = cap_chars(&topic.suggestion, MAX_TOPIC_SUGGESTION_CHARS);
    }

    report.highlight_cards.truncate(MAX_LIST_ITEMS);
    for card in &mut report.highlight_cards {
        card.title = cap_chars(&card.title, MAX_CARD_TITLE_CHARS);
        card.detail = cap_chars(&card.detail, MAX_CARD_DETAIL_CHARS);
    }
    report
}

fn cap_chars(text: &str, max: usize) -> String {
    text.trim().chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use studia_core::{
        ClassroomRecords, DailyCount, ErrorBookStats, ErrorBookTotals, KnowledgeStats,
        MasteryEntry, SubjectCount,
    };
    use uuid::Uuid;

    fn sample_dashboard() -> DashboardSummary {
        DashboardSummary {
            generated_at: Utc::now(),
            classroom_records: ClassroomRecords {
                status: "ok".to_string(),
                message: String::new(),
                items: vec![],
            },
            error_book: ErrorBookStats {
                totals: ErrorBookTotals {
                    total_entries: 12,
                    done: 9,
                    ocr_failed: 1,
                    ai_failed: 2,
                    with_quiz: 4,
                },
                subjects: vec![SubjectCount {
                    subject: "数学".to_string(),
                    count: 8,
                }],
                daily_counts: vec![DailyCount {
                    date: "2026-08-20".to_string(),
                    count: 3,
                }],
                recent_entries: vec![],
                top_key_points: vec![],
                top_review_plan: vec![],
                weak_concepts: vec!["去分母".to_string(), "辅助线".to_string()],
            },
            knowledge: KnowledgeStats {
                mastery: vec![MasteryEntry {
                    node_id: Uuid::new_v4(),
                    subject: "数学".to_string(),
                    name: "分式方程".to_string(),
                    mistake_count: 5,
                    note_count: 2,
                }],
            },
            insights: vec!["数学错题集中在分式方程".to_string()],
        }
    }

    #[test]
    fn test_fallback_report_builds_cards_from_totals() {
        let report = fallback_report(&sample_dashboard());

        assert_eq!(report.overall_tone, "本周学习数据概览：数学错题集中在分式方程");
        assert_eq!(report.weak_topics.len(), 2);
        assert_eq!(report.weak_topics[0].subject, "数学 · 去分母");

        let titles: Vec<&str> = report
            .highlight_cards
            .iter()
            .map(|c| c.title.as_str())
            .collect();
        assert_eq!(titles, vec!["错题总量", "练习题", "知识点"]);
        assert_eq!(report.highlight_cards[0].detail, "12 条（已完成 9）");
        assert_eq!(report.highlight_cards[1].detail, "已生成 4 份练习");
    }

    #[test]
    fn test_fallback_report_without_data_uses_defaults() {
        let mut dashboard = sample_dashboard();
        dashboard.insights.clear();
        dashboard.error_book.weak_concepts.clear();
        dashboard.error_book.subjects.clear();
        dashboard.knowledge.mastery.clear();

        let report = fallback_report(&dashboard);
        assert_eq!(
            report.overall_tone,
            "本周学习数据概览：近 7 天学习数据已汇总，错题总数 12 条。"
        );
        assert_eq!(report.weak_topics.len(), 1);
        assert_eq!(report.weak_topics[0].subject, "综合");
        assert_eq!(report.highlight_cards.len(), 2);
    }

    #[test]
    fn test_fallback_week_format() {
        let week = fallback_week();
        // "MM.DD - MM.DD"
        assert_eq!(week.chars().count(), 13);
        assert!(week.contains(" - "));
    }

    #[test]
    fn test_draft_from_map_skips_malformed_list_items() {
        let parsed = match json!({
            "week": " 08.16 - 08.22 ",
            "overallTone": "整体平稳",
            "aiSummary": "建议保持节奏",
            "encouragement": "继续加油",
            "weakTopics": ["纯字符串", {"subject": "数学", "issue": "粗心", "suggestion": "验算"}],
            "highlightCards": "不是列表"
        }) {
            JsonValue::Object(map) => map,
            _ => unreachable!(),
        };

        let draft = draft_from_map(&parsed);
        assert_eq!(draft.week, "08.16 - 08.22");
        assert_eq!(draft.weak_topics.len(), 1);
        assert_eq!(draft.weak_topics[0].subject, "数学");
        assert!(draft.highlight_cards.is_empty());
    }

    #[test]
    fn test_sanitize_caps_lengths_and_counts() {
        let mut report = fallback_report(&sample_dashboard());
        report.week = "  ".to_string();
        report.weak_topics = (0..9)
            .map(|i| WeakTopic {
                subject: "科".repeat(50),
                issue: format!("问题 {i}"),
                suggestion: "建".repeat(80),
            })
            .collect();
        report.highlight_cards = vec![HighlightCard {
            title: "标".repeat(20),
            detail: "细".repeat(100),
        }];

        let clean = sanitize_report(report);
        assert!(!clean.week.is_empty());
        assert_eq!(clean.weak_topics.len(), 6);
        assert_eq!(clean.weak_topics[0].subject.chars().count(), 40);
        assert_eq!(clean.weak_topics[0].suggestion.chars().count(), 60);
        assert_eq!(clean.highlight_cards[0].title.chars().count(), 16);
        assert_eq!(clean.highlight_cards[0].detail.chars().count(), 80);
    }

    #[test]
    fn test_report_prompt_embeds_dashboard_payload() {
        let prompt = report_prompt(&sample_dashboard());
        assert!(prompt.starts_with("只输出 JSON"));
        assert!(prompt.contains("\"weakTopics\": [{\"subject\": string"));
        assert!(prompt.contains("输入数据（JSON）：\n{"));
        // The serialized payload rides along un-escaped.
        assert!(prompt.contains("数学错题集中在分式方程"));
    }
}
