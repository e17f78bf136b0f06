//! User repository: lookup and parent/student access scoping.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use studia_core::{Error, Result, User, UserRepository, UserRole};

/// PostgreSQL implementation of [`UserRepository`].
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a user row. Account provisioning lives upstream; this exists
    /// for seeding and test fixtures.
    pub async fn insert(
        &self,
        email: &str,
        username: &str,
        display_name: &str,
        role: UserRole,
        linked_user_id: Option<Uuid>,
    ) -> Result<User> {
        let id = Uuid::now_v7();
        let row = sqlx::query(
            r#"
            INSERT INTO app_user (id, email, username, display_name, role, linked_user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, username, display_name, role, linked_user_id, created_at
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(username)
        .bind(display_name)
        .bind(role.as_str())
        .bind(linked_user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row_to_user(&row))
    }
}

fn row_to_user(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        display_name: row.get("display_name"),
        role: UserRole::parse_or_default(row.get("role")),
        linked_user_id: row.get::<Option<Uuid>, _>("linked_user_id"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn fetch(&self, id: Uuid) -> Result<User> {
        let row = sqlx::query(
            r#"
            SELECT id, email, username, display_name, role, linked_user_id, created_at
            FROM app_user
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::UserNotFound(id))?;

        Ok(row_to_user(&row))
    }

    async fn accessible_owner_ids(&self, user: &User) -> Result<Vec<Uuid>> {
        if user.role != UserRole::Parent {
            return Ok(vec![user.id]);
        }

        // Parent scope: self, plus student accounts linked from either
        // side of the binding. UNION deduplicates, ORDER BY keeps the
        // result deterministic.
        let rows = sqlx::query(
            r#"
            SELECT id FROM app_user WHERE id = $1
            UNION
            SELECT id FROM app_user WHERE id = $2 AND role = 'student'
            UNION
            SELECT id FROM app_user WHERE linked_user_id = $1 AND role = 'student'
            ORDER BY 1
            "#,
        )
        .bind(user.id)
        .bind(user.linked_user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }
}
