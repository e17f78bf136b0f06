//! Practice-quiz generation for error-book entries.
//!
//! The quiz is a deliberately easier single-choice question probing the
//! same knowledge point as the original mistake. A stored quiz that
//! still validates is reused; generation only runs when the entry has
//! none. Persistence is best-effort, a quiz the caller already holds is
//! not discarded because the UPDATE failed.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use studia_core::{
    extract_first_json_object, parse_lenient_object, validate_quiz, Error, ErrorBookRepository,
    ErrorEntry, GenerationBackend, Quiz, Result,
};
use studia_db::Database;

/// Generation-backed quiz service.
#[derive(Clone)]
pub struct QuizService {
    db: Database,
    backend: Arc<dyn GenerationBackend>,
}

impl QuizService {
    pub fn new(db: Database, backend: Arc<dyn GenerationBackend>) -> Self {
        Self { db, backend }
    }

    /// Return the entry's quiz, generating and storing one if needed.
    ///
    /// Fails with `InvalidInput` when the entry has no OCR text, and
    /// with `Generation`/`MalformedOutput` when the model call or its
    /// payload is unusable.
    #[instrument(skip(self, entry), fields(subsystem = "api", component = "quiz", op = "ensure", entry_id = %entry.id))]
    pub async fn ensure_quiz(&self, entry: &ErrorEntry) -> Result<Quiz> {
        let ocr_text = entry.ocr_text.as_deref().unwrap_or("").trim();
        if ocr_text.is_empty() {
            return Err(Error::InvalidInput(
                "OCR 文本为空，无法生成练习题".to_string(),
            ));
        }

        if let Some(stored) = entry.quiz.as_ref().and_then(JsonValue::as_object) {
            if let Ok(quiz) = validate_quiz(stored) {
                debug!("Stored quiz still valid, skipping generation");
                return Ok(quiz);
            }
        }

        self.generate_and_store(entry.id, ocr_text).await
    }

    async fn generate_and_store(&self, entry_id: Uuid, ocr_text: &str) -> Result<Quiz> {
        let started = Instant::now();
        let prompt = quiz_prompt(ocr_text);

        let raw = self
            .backend
            .generate(&prompt)
            .await
            .map_err(|e| Error::Generation(format!("练习题生成失败：{e}")))?;

        let extracted = extract_first_json_object(&raw)
            .ok_or_else(|| Error::MalformedOutput("练习题返回格式非 JSON".to_string()))?;
        let parsed = parse_lenient_object(&extracted)
            .ok_or_else(|| Error::MalformedOutput("练习题 JSON 解析失败".to_string()))?;
        let quiz = validate_quiz(&parsed)?;

        let payload = serde_json::to_value(&quiz)?;
        if let Err(err) = self.db.error_book.store_quiz(entry_id, &payload).await {
            warn!(error = %err, "Failed to persist quiz");
        }

        info!(
            duration_ms = started.elapsed().as_millis() as u64,
            topic = %quiz.topic,
            "Practice quiz generated"
        );
        Ok(quiz)
    }
}

/// Build the quiz generation prompt for the given OCR text.
pub fn quiz_prompt(ocr_text: &str) -> String {
    format!(
        r#"只输出 JSON，禁止 markdown/解释文字/多余字符。
你是中学学习助教。根据 OCR 文本，生成一道“类似但更简单”的单选题（4 个选项），用于检验同一知识点。
请输出严格 JSON（不要 markdown），schema：
{{"question": string, "options": [string,string,string,string], "answer_index": number, "explanation": string, "topic": string}}.
要求：
- answer_index 必须是 0~3 的整数。
- question 必须非空。
- options 的 4 个字符串都必须非空，且相互区分（不要 4 个一样/近似）。
- 题目要清晰、可独立作答；避免含糊引用“上题/图中”。
- explanation 用 2-5 句解释即可。

OCR_TEXT:
{ocr_text}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiz_prompt_pins_schema() {
        let prompt = quiz_prompt("解方程 2x + 1 = 5");
        assert!(prompt.starts_with("只输出 JSON"));
        assert!(prompt.contains("\"options\": [string,string,string,string]"));
        assert!(prompt.contains("answer_index 必须是 0~3 的整数"));
        assert!(prompt.ends_with("OCR_TEXT:\n解方程 2x + 1 = 5"));
    }

    #[test]
    fn test_quiz_prompt_demands_standalone_question() {
        let prompt = quiz_prompt("x");
        assert!(prompt.contains("避免含糊引用"));
        assert!(prompt.contains("类似但更简单"));
    }
}
