//! Tolerant decoding of model-produced JSON.
//!
//! Generation backends are asked for pure JSON but routinely wrap it in
//! markdown fences or surround it with prose. These helpers recover the
//! first complete object from such output without ever trusting it:
//! strict parsing happens at the end, and anything unrecoverable is a
//! `None` for the caller to map into its own failure handling.

use serde_json::{Map, Value as JsonValue};

/// Strip a surrounding markdown code fence, language tag included.
///
/// Only a fence that both opens and closes the trimmed text is removed;
/// a lone ``` or an unterminated fence passes through untouched.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("```") && trimmed.ends_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() >= 2 {
            return lines[1..lines.len() - 1].join("\n").trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Extract the first balanced `{...}` span from the text.
///
/// Tracks string state and backslash escapes so braces inside string
/// literals do not count. Returns `None` when no opening brace exists or
/// the object never closes.
pub fn extract_first_json_object(text: &str) -> Option<String> {
    let s = strip_code_fence(text);
    let start = s.find('{')?;
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(s[start..=i].trim().to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse an object-shaped payload, repairing curly quotes on failure.
///
/// Strict parse first; if that fails, typographic double quotes
/// (U+201C/U+201D) are replaced with ASCII quotes and the parse is
/// retried once. A payload that parses to anything other than an object
/// yields `None`.
pub fn parse_lenient_object(text: &str) -> Option<Map<String, JsonValue>> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }

    match serde_json::from_str::<JsonValue>(s) {
        Ok(JsonValue::Object(map)) => return Some(map),
        Ok(_) => return None,
        Err(_) => {}
    }

    let repaired = s.replace('\u{201c}', "\"").replace('\u{201d}', "\"");
    match serde_json::from_str::<JsonValue>(repaired.trim()) {
        Ok(JsonValue::Object(map)) => Some(map),
        _ => None,
    }
}
