//! Note repository: classroom transcripts and their summary lifecycle.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use studia_core::{
    ApplySummaryRequest, Error, NewNote, Note, NoteRepository, NoteStatus, Result,
};

/// PostgreSQL implementation of [`NoteRepository`].
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_note(row: &PgRow) -> Note {
    Note {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get::<Option<String>, _>("title"),
        subject: row.get::<Option<String>, _>("subject"),
        focus_tag: row.get::<Option<String>, _>("focus_tag"),
        status: NoteStatus::parse_or_default(row.get("status")),
        transcript: row.get::<Option<String>, _>("transcript"),
        summary: row.get::<Option<JsonValue>, _>("summary"),
        tasks: row.get::<Option<JsonValue>, _>("tasks"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, owner_id: Uuid, req: NewNote) -> Result<Note> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO note (id, owner_id, title, subject, focus_tag, status,
                              transcript, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING id, owner_id, title, subject, focus_tag, status, transcript,
                      summary, tasks, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(&req.title)
        .bind(&req.subject)
        .bind(&req.focus_tag)
        .bind(NoteStatus::Created.as_str())
        .bind(&req.transcript)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row_to_note(&row))
    }

    async fn fetch(&self, id: Uuid) -> Result<Note> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, title, subject, focus_tag, status, transcript,
                   summary, tasks, created_at, updated_at
            FROM note
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::NoteNotFound(id))?;

        Ok(row_to_note(&row))
    }

    async fn fetch_scoped(&self, id: Uuid, owner_ids: &[Uuid]) -> Result<Option<Note>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, title, subject, focus_tag, status, transcript,
                   summary, tasks, created_at, updated_at
            FROM note
            WHERE id = $1 AND owner_id = ANY($2)
            "#,
        )
        .bind(id)
        .bind(owner_ids)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(row_to_note))
    }

    async fn recent_for_owners(&self, owner_ids: &[Uuid], limit: i64) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, title, subject, focus_tag, status, transcript,
                   summary, tasks, created_at, updated_at
            FROM note
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

        Ok(rows.iter().map(row_to_note).collect())
    }

    async fn reset_for_summary(
        &self,
        id: Uuid,
        transcript: Option<&str>,
        focus_tag: Option<&str>,
    ) -> Result<Note> {
        let row = sqlx::query(
            r#"
            UPDATE note
            SET transcript = COALESCE($2, transcript),
                focus_tag = COALESCE($3, focus_tag),
                summary = NULL,
                tasks = NULL,
                status = $4,
                updated_at = $5
            WHERE id = $1
            RETURNING id, owner_id, title, subject, focus_tag, status, transcript,
                      summary, tasks, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(transcript)
        .bind(focus_tag)
        .bind(NoteStatus::Summarizing.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::NoteNotFound(id))?;

        Ok(row_to_note(&row))
    }

    async fn apply_summary(&self, id: Uuid, req: ApplySummaryRequest) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE note
            SET title = $2, subject = $3, summary = $4, tasks = $5,
                status = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&req.title)
        .bind(&req.subject)
        .bind(&req.summary)
        .bind(&req.tasks)
        .bind(NoteStatus::Done.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    async fn mark_summary_failed(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE note SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(NoteStatus::SummaryFailed.as_str())
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM note WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }
}
