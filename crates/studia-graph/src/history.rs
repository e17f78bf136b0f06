//! Per-concept evidence index over recent history.
//!
//! Maps normalized concept names to the notes and error entries they were
//! extracted from. Keyed by name alone, not (subject, name): a concept
//! spelled identically in two subjects shares one evidence bucket, which
//! keeps cross-subject reinforcement visible.

use std::collections::HashMap;

use studia_core::defaults::{ERROR_EVIDENCE_TITLE, EVIDENCE_TOP, NOTE_FALLBACK_TITLE};
use studia_core::{
    extract_error_concepts, extract_note_concepts, ErrorEntry, EvidenceError, EvidenceNote,
    NodeEvidence, Note,
};

/// Concept → source-record index built from recent history windows.
///
/// Input slices must be newest first; bucket order preserves that, so
/// [`evidence_for`](Self::evidence_for) returns the freshest records.
pub struct HistoryIndex {
    notes: HashMap<String, Vec<EvidenceNote>>,
    errors: HashMap<String, Vec<EvidenceError>>,
}

impl HistoryIndex {
    pub fn build(notes: &[Note], errors: &[ErrorEntry]) -> Self {
        let mut note_index: HashMap<String, Vec<EvidenceNote>> = HashMap::new();
        for note in notes {
            let (_, concepts) =
                extract_note_concepts(note.subject.as_deref().unwrap_or(""), note.summary.as_ref());
            for name in concepts {
                note_index.entry(name).or_default().push(EvidenceNote {
                    id: note.id,
                    title: display_title(note.title.as_deref(), NOTE_FALLBACK_TITLE),
                    created_at: note.created_at,
                });
            }
        }

        let mut error_index: HashMap<String, Vec<EvidenceError>> = HashMap::new();
        for entry in errors {
            let (_, concepts) = extract_error_concepts(
                entry.subject.as_deref().unwrap_or(""),
                entry.analysis.as_deref().unwrap_or(""),
            );
            for name in concepts {
                error_index.entry(name).or_default().push(EvidenceError {
                    id: entry.id,
                    title: display_title(entry.title.as_deref(), ERROR_EVIDENCE_TITLE),
                    created_at: entry.created_at,
                    verdict: entry
                        .verdict
                        .as_deref()
                        .map(str::trim)
                        .unwrap_or_default()
                        .to_string(),
                });
            }
        }

        Self {
            notes: note_index,
            errors: error_index,
        }
    }

    /// Evidence for one normalized concept name, capped per source kind.
    pub fn evidence_for(&self, name: &str) -> NodeEvidence {
        NodeEvidence {
            notes: self
                .notes
                .get(name)
                .map(|hits| hits.iter().take(EVIDENCE_TOP).cloned().collect())
                .unwrap_or_default(),
            errors: self
                .errors
                .get(name)
                .map(|hits| hits.iter().take(EVIDENCE_TOP).cloned().collect())
                .unwrap_or_default(),
        }
    }
}

fn display_title(title: Option<&str>, fallback: &str) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use studia_core::{ErrorEntryStatus, NoteStatus};
    use uuid::Uuid;

    fn note(title: Option<&str>, key_terms: &[&str], age_mins: i64) -> Note {
        let now = Utc::now();
        Note {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            title: title.map(str::to_string),
            subject: Some("数学".to_string()),
            focus_tag: None,
            status: NoteStatus::Done,
            transcript: None,
            summary: Some(json!({ "key_terms": key_terms })),
            tasks: None,
            created_at: now - Duration::minutes(age_mins),
            updated_at: now,
        }
    }

    fn error(title: Option<&str>, verdict: Option<&str>, concepts: &[&str]) -> ErrorEntry {
        let analysis = json!({
            "mistakes": concepts.iter().map(|c| json!({ "concept": c })).collect::<Vec<_>>(),
        });
        ErrorEntry {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            title: title.map(str::to_string),
            subject: Some("数学".to_string()),
            status: ErrorEntryStatus::Done,
            verdict: verdict.map(str::to_string),
            ocr_text: None,
            analysis: Some(analysis.to_string()),
            quiz: None,
            quiz_created_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_index_collects_both_source_kinds() {
        let notes = vec![note(Some("分式方程笔记"), &["去分母", "检验"], 0)];
        let errors = vec![error(Some("第 3 题"), Some(" 漏乘 "), &["去分母"])];
        let index = HistoryIndex::build(&notes, &errors);

        let ev = index.evidence_for("去分母");
        assert_eq!(ev.notes.len(), 1);
        assert_eq!(ev.notes[0].title, "分式方程笔记");
        assert_eq!(ev.errors.len(), 1);
        assert_eq!(ev.errors[0].verdict, "漏乘");

        let ev = index.evidence_for("检验");
        assert_eq!(ev.notes.len(), 1);
        assert!(ev.errors.is_empty());
    }

    #[test]
    fn test_title_fallbacks() {
        let notes = vec![note(None, &["顶点式"], 0), note(Some("  "), &["顶点式"], 1)];
        let errors = vec![error(None, None, &["顶点式"])];
        let index = HistoryIndex::build(&notes, &errors);

        let ev = index.evidence_for("顶点式");
        assert!(ev.notes.iter().all(|n| n.title == NOTE_FALLBACK_TITLE));
        assert_eq!(ev.errors[0].title, ERROR_EVIDENCE_TITLE);
        assert_eq!(ev.errors[0].verdict, "");
    }

    #[test]
    fn test_evidence_caps_and_keeps_input_order() {
        let notes: Vec<Note> = (0..8)
            .map(|i| note(Some(&format!("笔记{i}")), &["判别式"], i))
            .collect();
        let index = HistoryIndex::build(&notes, &[]);
        let ev = index.evidence_for("判别式");
        assert_eq!(ev.notes.len(), EVIDENCE_TOP);
        // Input is newest first; the cap keeps the head of the bucket.
        assert_eq!(ev.notes[0].title, "笔记0");
        assert_eq!(ev.notes[4].title, "笔记4");
    }

    #[test]
    fn test_unknown_concept_is_empty() {
        let index = HistoryIndex::build(&[], &[]);
        let ev = index.evidence_for("不存在");
        assert!(ev.notes.is_empty());
        assert!(ev.errors.is_empty());
    }

    #[test]
    fn test_same_record_under_multiple_concepts() {
        let notes = vec![note(Some("电学笔记"), &["欧姆定律", "串联电路"], 0)];
        let index = HistoryIndex::build(&notes, &[]);
        assert_eq!(index.evidence_for("欧姆定律").notes.len(), 1);
        assert_eq!(index.evidence_for("串联电路").notes.len(), 1);
    }
}
