//! Error-book repository: mistake records, their analysis, and quizzes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use studia_core::{
    Error, ErrorBookRepository, ErrorBookTotals, ErrorEntry, ErrorEntryStatus, NewErrorEntry,
    Result,
};

/// PostgreSQL implementation of [`ErrorBookRepository`].
pub struct PgErrorBookRepository {
    pool: Pool<Postgres>,
}

impl PgErrorBookRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_entry(row: &PgRow) -> ErrorEntry {
    ErrorEntry {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get::<Option<String>, _>("title"),
        subject: row.get::<Option<String>, _>("subject"),
        status: ErrorEntryStatus::parse_or_default(row.get("status")),
        verdict: row.get::<Option<String>, _>("verdict"),
        ocr_text: row.get::<Option<String>, _>("ocr_text"),
        analysis: row.get::<Option<String>, _>("analysis"),
        quiz: row.get::<Option<JsonValue>, _>("quiz"),
        quiz_created_at: row.get::<Option<DateTime<Utc>>, _>("quiz_created_at"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl ErrorBookRepository for PgErrorBookRepository {
    async fn insert(&self, owner_id: Uuid, req: NewErrorEntry) -> Result<ErrorEntry> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO error_entry (id, owner_id, title, subject, status, verdict,
                                     ocr_text, analysis, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, owner_id, title, subject, status, verdict, ocr_text,
                      analysis, quiz, quiz_created_at, created_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(&req.title)
        .bind(&req.subject)
        .bind(req.status.as_str())
        .bind(&req.verdict)
        .bind(&req.ocr_text)
        .bind(&req.analysis)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row_to_entry(&row))
    }

    async fn fetch(&self, id: Uuid) -> Result<ErrorEntry> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, title, subject, status, verdict, ocr_text,
                   analysis, quiz, quiz_created_at, created_at
            FROM error_entry
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::ErrorEntryNotFound(id))?;

        Ok(row_to_entry(&row))
    }

    async fn fetch_scoped(&self, id: Uuid, owner_ids: &[Uuid]) -> Result<Option<ErrorEntry>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, title, subject, status, verdict, ocr_text,
                   analysis, quiz, quiz_created_at, created_at
            FROM error_entry
            WHERE id = $1 AND owner_id = ANY($2)
            "#,
        )
        .bind(id)
        .bind(owner_ids)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(row_to_entry))
    }

    async fn recent_for_owners(&self, owner_ids: &[Uuid], limit: i64) -> Result<Vec<ErrorEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, title, subject, status, verdict, ocr_text,
                   analysis, quiz, quiz_created_at, created_at
            FROM error_entry
            WHERE owner_id = ANY($1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(owner_ids)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_entry).collect())
    }

    async fn totals(&self, owner_ids: &[Uuid]) -> Result<ErrorBookTotals> {
        // One aggregate pass; the dashboard needs full-table counts even
        // though the rest of its mining works on a recent window.
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total_entries,
                   COUNT(*) FILTER (WHERE status = 'done') AS done,
                   COUNT(*) FILTER (WHERE status = 'ocr_failed') AS ocr_failed,
                   COUNT(*) FILTER (WHERE status = 'ai_failed') AS ai_failed,
                   COUNT(*) FILTER (WHERE quiz IS NOT NULL) AS with_quiz
            FROM error_entry
            WHERE owner_id = ANY($1)
            "#,
        )
        .bind(owner_ids)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(ErrorBookTotals {
            total_entries: row.get("total_entries"),
            done: row.get("done"),
            ocr_failed: row.get("ocr_failed"),
            ai_failed: row.get("ai_failed"),
            with_quiz: row.get("with_quiz"),
        })
    }

    async fn store_quiz(&self, id: Uuid, quiz: &JsonValue) -> Result<()> {
        let result =
            sqlx::query("UPDATE error_entry SET quiz = $2, quiz_created_at = $3 WHERE id = $1")
                .bind(id)
                .bind(quiz)
                .bind(Utc::now())
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ErrorEntryNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM error_entry WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ErrorEntryNotFound(id));
        }
        Ok(())
    }
}
