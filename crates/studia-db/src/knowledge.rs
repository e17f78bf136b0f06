//! Knowledge-node repository: the deduplicated concept graph vertices.
//!
//! Nodes are unique per `(owner_id, subject, name)` with both fields
//! canonicalized before touching the table, so every writer funnels
//! through [`get_or_create`](studia_core::KnowledgeNodeRepository::get_or_create)
//! and concurrent upserts of the same concept cannot race into duplicates.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use std::collections::HashMap;
use uuid::Uuid;

use studia_core::{
    normalize_concept, normalize_subject, Error, KnowledgeNode, KnowledgeNodeRepository, NodeKind,
    Result,
};

/// PostgreSQL implementation of [`KnowledgeNodeRepository`].
pub struct PgKnowledgeNodeRepository {
    pool: Pool<Postgres>,
}

impl PgKnowledgeNodeRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_node(row: &PgRow) -> KnowledgeNode {
    KnowledgeNode {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        subject: row.get("subject"),
        name: row.get("name"),
        kind: NodeKind::parse_or_concept(row.get("kind")),
        created_at: row.get("created_at"),
        last_seen_at: row.get("last_seen_at"),
    }
}

#[async_trait]
impl KnowledgeNodeRepository for PgKnowledgeNodeRepository {
    async fn get_or_create(
        &self,
        owner_id: Uuid,
        subject: &str,
        name: &str,
        kind: NodeKind,
    ) -> Result<Option<KnowledgeNode>> {
        let subject = normalize_subject(subject);
        let name = normalize_concept(name);
        if name.is_empty() {
            return Ok(None);
        }

        // Single atomic upsert. An existing node gets its last_seen_at
        // bumped; its kind is upgraded only from the generic `concept`
        // to a more specific kind, never sideways or back.
        let row = sqlx::query(
            r#"
            INSERT INTO knowledge_node (id, owner_id, subject, name, kind,
                                        created_at, last_seen_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (owner_id, subject, name) DO UPDATE
            SET last_seen_at = EXCLUDED.last_seen_at,
                kind = CASE
                           WHEN knowledge_node.kind = 'concept'
                                AND EXCLUDED.kind <> 'concept'
                           THEN EXCLUDED.kind
                           ELSE knowledge_node.kind
                       END
            RETURNING id, owner_id, subject, name, kind, created_at, last_seen_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(owner_id)
        .bind(&subject)
        .bind(&name)
        .bind(kind.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Some(row_to_node(&row)))
    }

    async fn rename(&self, id: Uuid, name: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE knowledge_node SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(false),
            Err(e) => Err(Error::Database(e)),
        }
    }

    async fn names_for(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query("SELECT id, name FROM knowledge_node WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .iter()
            .map(|row| (row.get("id"), row.get("name")))
            .collect())
    }

    async fn recent_for_owners(
        &self,
        owner_ids: &[Uuid],
        limit: i64,
    ) -> Result<Vec<KnowledgeNode>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, subject, name, kind, created_at, last_seen_at
            FROM knowledge_node
            WHERE owner_id = ANY($1)
            ORDER BY last_seen_at DESC
            LIMIT $2
            "#,
        )
        .bind(owner_ids)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_node).collect())
    }
}
