//! Practice-quiz payload validation.
//!
//! Unlike note summaries, a quiz with a broken shape is worthless, so
//! validation here is strict: four non-empty options and an in-range
//! answer index, or the payload is rejected with a user-facing message.

use serde_json::{Map, Value as JsonValue};

use crate::error::{Error, Result};
use crate::models::Quiz;

/// Number of options every quiz must carry.
pub const QUIZ_OPTION_COUNT: usize = 4;

/// Validate a parsed model payload into a [`Quiz`].
///
/// Rejects payloads without exactly four options, with an answer index
/// outside `0..=3`, or with an empty question or option. Explanation and
/// topic are optional and default to empty strings.
pub fn validate_quiz(parsed: &Map<String, JsonValue>) -> Result<Quiz> {
    let options = match parsed.get("options") {
        Some(JsonValue::Array(items)) if items.len() == QUIZ_OPTION_COUNT => items,
        _ => return Err(Error::MalformedOutput("练习题 options 格式错误".to_string())),
    };

    let answer_index = match parsed.get("answer_index").and_then(JsonValue::as_i64) {
        Some(idx) if (0..QUIZ_OPTION_COUNT as i64).contains(&idx) => idx as i32,
        _ => return Err(Error::MalformedOutput("练习题 answer_index 错误".to_string())),
    };

    let question = text_of(parsed.get("question")).trim().to_string();
    if question.is_empty() {
        return Err(Error::MalformedOutput("练习题题干为空".to_string()));
    }

    let options_text: Vec<String> = options
        .iter()
        .map(|item| text_of(Some(item)).trim().to_string())
        .collect();
    if options_text.iter().any(String::is_empty) {
        return Err(Error::MalformedOutput("练习题选项为空".to_string()));
    }

    Ok(Quiz {
        question,
        options: options_text,
        answer_index,
        explanation: text_of(parsed.get("explanation")).trim().to_string(),
        topic: text_of(parsed.get("topic")).trim().to_string(),
    })
}

fn text_of(value: Option<&JsonValue>) -> String {
    match value {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) => n.to_string(),
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

    fn valid_payload() -> Map<String, JsonValue> {
        as_map(json!({
            "question": "下列哪个是方程 x²-4=0 的解？",
            "options": ["x=1", "x=2", "x=3", "x=5"],
            "answer_index": 1,
            "explanation": "因式分解得 (x-2)(x+2)=0。",
            "topic": "一元二次方程",
        }))
    }

    #[test]
    fn test_valid_quiz_passes() {
        let quiz = validate_quiz(&valid_payload()).unwrap();
        assert_eq!(quiz.answer_index, 1);
        assert_eq!(quiz.options.len(), QUIZ_OPTION_COUNT);
        assert_eq!(quiz.topic, "一元二次方程");
    }

    #[test]
    fn test_wrong_option_count_rejected() {
        let mut payload = valid_payload();
        payload.insert("options".into(), json!(["a", "b", "c"]));
        let err = validate_quiz(&payload).unwrap_err();
        assert!(err.to_string().contains("options"));

        payload.insert("options".into(), json!("not a list"));
        assert!(validate_quiz(&payload).is_err());
    }

    #[test]
    fn test_answer_index_bounds() {
        let mut payload = valid_payload();
        for bad in [json!(-1), json!(4), json!(1.5), json!("2"), json!(null)] {
            payload.insert("answer_index".into(), bad);
            let err = validate_quiz(&payload).unwrap_err();
            assert!(err.to_string().contains("answer_index"));
        }
        payload.insert("answer_index".into(), json!(0));
        assert!(validate_quiz(&payload).is_ok());
        payload.insert("answer_index".into(), json!(3));
        assert!(validate_quiz(&payload).is_ok());
    }

    #[test]
    fn test_empty_question_rejected() {
        let mut payload = valid_payload();
        payload.insert("question".into(), json!("   "));
        let err = validate_quiz(&payload).unwrap_err();
        assert!(err.to_string().contains("题干"));
    }

    #[test]
    fn test_blank_option_rejected() {
        let mut payload = valid_payload();
        payload.insert("options".into(), json!(["x=1", "  ", "x=3", "x=5"]));
        let err = validate_quiz(&payload).unwrap_err();
        assert!(err.to_string().contains("选项"));
    }

    #[test]
    fn test_optional_fields_default_empty() {
        let mut payload = valid_payload();
        payload.remove("explanation");
        payload.remove("topic");
        let quiz = validate_quiz(&payload).unwrap();
        assert_eq!(quiz.explanation, "");
        assert_eq!(quiz.topic, "");
    }
}
