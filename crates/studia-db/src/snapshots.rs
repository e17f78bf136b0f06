//! Mind-map snapshot repository. Snapshots are insert-only history.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use studia_core::{Error, NewMindMapSnapshot, Result, SnapshotRepository};

/// PostgreSQL implementation of [`SnapshotRepository`].
pub struct PgSnapshotRepository {
    pool: Pool<Postgres>,
}

impl PgSnapshotRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotRepository for PgSnapshotRepository {
    async fn insert(&self, snapshot: NewMindMapSnapshot) -> Result<Uuid> {
        let row = sqlx::query(
            r#"
            INSERT INTO mind_map_snapshot (id, owner_id, source_type, source_id,
                                           root_node_id, map, highlights, related,
                                           created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(snapshot.owner_id)
        .bind(snapshot.source_type.as_str())
        .bind(snapshot.source_id)
        .bind(snapshot.root_node_id)
        .bind(&snapshot.map)
        .bind(&snapshot.highlights)
        .bind(&snapshot.related)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.get("id"))
    }
}
