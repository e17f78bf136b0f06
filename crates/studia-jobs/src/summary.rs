//! Note summary pipeline.
//!
//! One background job per note: generate a structured summary from the
//! transcript, validate it, persist title/subject/summary/tasks, then feed
//! the key terms into the knowledge-node store. Persistence and upsert
//! failures downgrade to warnings; everything before them marks the note
//! `summary_failed`.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use studia_core::defaults::SUMMARY_EVENT_CAPACITY;
use studia_core::{
    extract_first_json_object, extract_note_concepts, parse_lenient_object, validate_note_summary,
    ApplySummaryRequest, Error, GenerationBackend, KnowledgeNodeRepository, NodeKind, Note,
    NoteRepository, NoteSummary, Result, SUBJECT_CHOICES,
};
use studia_db::Database;

use crate::registry::InFlightRegistry;

/// Outcome of a scheduling attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// The job was spawned.
    Scheduled,
    /// A summary for this note is already in flight; nothing was queued.
    AlreadyRunning,
}

/// Lifecycle event emitted by the summary pipeline.
#[derive(Debug, Clone)]
pub enum SummaryEvent {
    Started { note_id: Uuid },
    Completed { note_id: Uuid },
    Failed { note_id: Uuid, error: String },
}

/// Background note-summary service.
///
/// Cloning is cheap; clones share the in-flight registry and the event
/// channel.
#[derive(Clone)]
pub struct NoteSummaryService {
    db: Database,
    backend: Arc<dyn GenerationBackend>,
    registry: InFlightRegistry,
    event_tx: broadcast::Sender<SummaryEvent>,
}

impl NoteSummaryService {
    pub fn new(db: Database, backend: Arc<dyn GenerationBackend>) -> Self {
        let (event_tx, _) = broadcast::channel(SUMMARY_EVENT_CAPACITY);
        Self {
            db,
            backend,
            registry: InFlightRegistry::new(),
            event_tx,
        }
    }

    /// Get a receiver for pipeline lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<SummaryEvent> {
        self.event_tx.subscribe()
    }

    /// Spawn a summary job for the note unless one is already running.
    ///
    /// Admission and spawn happen before this returns; the pipeline itself
    /// runs on the runtime and reports through [`events`](Self::events) and
    /// the note's status column.
    pub fn schedule(&self, note_id: Uuid) -> ScheduleOutcome {
        let Some(guard) = self.registry.try_admit(note_id) else {
            debug!(%note_id, "Summary already in flight, rejecting");
            return ScheduleOutcome::AlreadyRunning;
        };

        let service = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            service.run(note_id).await;
        });
        ScheduleOutcome::Scheduled
    }

    #[instrument(skip(self), fields(
        subsystem = "jobs",
        component = "summary",
        op = "run",
        note_id = %note_id,
    ))]
    async fn run(&self, note_id: Uuid) {
        let start = Instant::now();
        let _ = self.event_tx.send(SummaryEvent::Started { note_id });

        let note = match self.db.notes.fetch(note_id).await {
            Ok(note) => note,
            Err(Error::NoteNotFound(_)) => {
                debug!("Note vanished before its summary job ran");
                return;
            }
            Err(e) => {
                self.fail(note_id, &e).await;
                return;
            }
        };

        match self.summarize_note(&note).await {
            Ok(summary) => {
                info!(
                    subject = %summary.subject,
                    points = summary.summary_points.len(),
                    tasks = summary.tasks.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Note summary completed"
                );
                let _ = self.event_tx.send(SummaryEvent::Completed { note_id });
            }
            Err(e) => {
                warn!(
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Note summary failed"
                );
                self.fail(note_id, &e).await;
            }
        }
    }

    async fn fail(&self, note_id: Uuid, error: &Error) {
        if let Err(mark_err) = self.db.notes.mark_summary_failed(note_id).await {
            warn!(error = %mark_err, "Failed to mark note summary_failed");
        }
        let _ = self.event_tx.send(SummaryEvent::Failed {
            note_id,
            error: error.to_string(),
        });
    }

    /// Generate, validate, and persist the summary for one note.
    ///
    /// Returns the validated payload even when persistence degrades; the
    /// errors it does return are the ones that mark the note failed.
    async fn summarize_note(&self, note: &Note) -> Result<NoteSummary> {
        let transcript = note.transcript.as_deref().unwrap_or("").trim();
        if transcript.is_empty() {
            return Err(Error::InvalidInput("转写文本为空，无法摘要".to_string()));
        }

        let prompt = summary_prompt(transcript, note.focus_tag.as_deref());
        let raw = self
            .backend
            .generate(&prompt)
            .await
            .map_err(|e| Error::Generation(format!("智能摘要失败：{e}")))?;

        let extracted = extract_first_json_object(&raw)
            .ok_or_else(|| Error::MalformedOutput("摘要返回格式非 JSON".to_string()))?;
        let parsed = parse_lenient_object(&extracted)
            .ok_or_else(|| Error::MalformedOutput("摘要 JSON 解析失败".to_string()))?;

        let summary = validate_note_summary(&parsed);
        self.persist(note, &summary).await;
        Ok(summary)
    }

    /// Persist the summary and seed the knowledge graph from it.
    async fn persist(&self, note: &Note, summary: &NoteSummary) {
        let payload = json!({
            "title": summary.title,
            "subject": summary.subject,
            "summary_points": summary.summary_points,
            "key_terms": summary.key_terms,
        });

        let request = ApplySummaryRequest {
            title: summary.title.clone(),
            subject: summary.subject.clone(),
            summary: payload.clone(),
            tasks: json!({ "tasks": summary.tasks }),
        };
        if let Err(e) = self.db.notes.apply_summary(note.id, request).await {
            warn!(error = %e, "Failed to persist note summary");
            return;
        }

        let (subject, concepts) = extract_note_concepts(&summary.subject, Some(&payload));
        for name in &concepts {
            if let Err(e) = self
                .db
                .knowledge
                .get_or_create(note.owner_id, &subject, name, NodeKind::Concept)
                .await
            {
                warn!(error = %e, concept = %name, "Knowledge upsert from note failed");
                break;
            }
        }
    }
}

/// Build the note-summary prompt.
pub fn summary_prompt(transcript: &str, focus_tag: Option<&str>) -> String {
    let allowed_subjects = SUBJECT_CHOICES.join("、");
    let focus_tag = focus_tag.unwrap_or("").trim();
    let focus_line = if focus_tag.is_empty() {
        String::new()
    } else {
        format!("focus_tag：{focus_tag}\n")
    };

    format!(
        r#"只输出 JSON，禁止 markdown/解释文字/多余字符。
你是课堂笔记助手。根据课堂转写文本，提炼结构化笔记与任务追踪。
JSON schema（必须严格匹配）：
{{
  "title": string,
  "subject": string,
  "summary_points": string[],
  "tasks": [{{"id": string, "text": string, "done": boolean}}],
  "key_terms": string[]
}}
要求：
- subject 必须且只能从如下列表中选择其一：{allowed_subjects}。
- title 简短（<= 18 字）。
- summary_points 3-6 条，每条 <= 28 字；尽量包含关键公式/例题/典型句式等“可复用示例”。
- tasks 2-6 条，都是可执行动作，text <= 30 字；done 默认 false；id 用短字符串（如 t1、t2）。
- key_terms 3-8 个关键词，<= 8 字/个。
- 如果转写内容信息不足：summary_points/tasks/key_terms 允许为空数组，但不要输出占位词。

{focus_line}TRANSCRIPT:
{transcript}"#
    )
}
