//! Concept extraction from source records.
//!
//! Notes and error-book entries carry structured-ish AI output; these
//! functions pull candidate concept names out of it, normalized and
//! deduplicated, ready for the node store. Extraction is best-effort:
//! malformed payloads yield an empty list, never an error.

use serde_json::Value as JsonValue;

use crate::defaults::{CONCEPTS_PER_RECORD, SUMMARY_POINT_HEAD_CHARS};
use crate::lenient_json::{extract_first_json_object, parse_lenient_object};
use crate::normalize::{normalize_concept, normalize_subject};

/// Extract `(subject, concepts)` from a note's summary payload.
///
/// `key_terms` are the preferred concept source; when none survive
/// normalization, the headings of `summary_points` are used instead
/// (text before the first full-width colon, or the first
/// [`SUMMARY_POINT_HEAD_CHARS`] characters).
pub fn extract_note_concepts(subject: &str, summary: Option<&JsonValue>) -> (String, Vec<String>) {
    let subject = normalize_subject(subject);
    let mut concepts: Vec<String> = Vec::new();

    if let Some(JsonValue::Object(map)) = summary {
        if let Some(JsonValue::Array(terms)) = map.get("key_terms") {
            for term in terms {
                if let Some(name) = normalize_json_concept(term) {
                    push_unique(&mut concepts, name);
                }
            }
        }
        if concepts.is_empty() {
            if let Some(JsonValue::Array(points)) = map.get("summary_points") {
                for point in points {
                    let Some(text) = point.as_str() else { continue };
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    let head = match text.split_once('：') {
                        Some((head, _)) => head.trim().to_string(),
                        None => text.chars().take(SUMMARY_POINT_HEAD_CHARS).collect(),
                    };
                    let name = normalize_concept(&head);
                    if !name.is_empty() {
                        push_unique(&mut concepts, name);
                    }
                }
            }
        }
    }

    concepts.truncate(CONCEPTS_PER_RECORD);
    (subject, concepts)
}

/// Extract `(subject, concepts)` from an error entry's analysis text.
///
/// The analysis is free-form prose that may embed one JSON object;
/// `mistakes[].concept` entries come first, then `key_points`, preserving
/// first-seen order across both.
pub fn extract_error_concepts(subject: &str, analysis: &str) -> (String, Vec<String>) {
    let subject = normalize_subject(subject);
    let mut concepts: Vec<String> = Vec::new();

    let parsed = extract_first_json_object(analysis).and_then(|obj| parse_lenient_object(&obj));
    if let Some(map) = parsed {
        if let Some(JsonValue::Array(mistakes)) = map.get("mistakes") {
            for mistake in mistakes {
                let Some(mistake) = mistake.as_object() else { continue };
                if let Some(name) = mistake.get("concept").and_then(normalize_json_concept) {
                    push_unique(&mut concepts, name);
                }
            }
        }
        if let Some(JsonValue::Array(key_points)) = map.get("key_points") {
            for point in key_points {
                if let Some(name) = normalize_json_concept(point) {
                    push_unique(&mut concepts, name);
                }
            }
        }
    }

    concepts.truncate(CONCEPTS_PER_RECORD);
    (subject, concepts)
}

/// Normalize a JSON value into a concept name. Strings and numbers are
/// accepted, everything else is skipped.
fn normalize_json_concept(value: &JsonValue) -> Option<String> {
    let raw = match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        _ => return None,
    };
    let name = normalize_concept(&raw);
    (!name.is_empty()).then_some(name)
}

fn push_unique(concepts: &mut Vec<String>, name: String) {
    if !concepts.iter().any(|existing| *existing == name) {
        concepts.push(name);
    }
}
