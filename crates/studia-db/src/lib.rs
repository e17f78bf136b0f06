//! # studia-db
//!
//! PostgreSQL database layer for studia.
//!
//! Everything SQL lives here: pool construction, one repository per
//! entity, the knowledge-node upsert that keeps the concept graph
//! deduplicated, and the insert-only mind-map snapshot history.
//!
//! ## Example
//!
//! ```rust,ignore
//! use studia_db::{Database, NewNote, NoteRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/studia").await?;
//!
//!     let note = db.notes.insert(owner_id, NewNote {
//!         title: None,
//!         subject: Some("数学".to_string()),
//!         focus_tag: None,
//!         transcript: "今天讲了分式方程……".to_string(),
//!     }).await?;
//!
//!     println!("Created note: {}", note.id);
//!     Ok(())
//! }
//! ```
pub mod errorbook;
pub mod knowledge;
pub mod notes;
pub mod pool;
pub mod snapshots;
pub mod users;

// Compiled unconditionally so downstream tests/ directories can reach
// DEFAULT_TEST_DATABASE_URL and the seeding helpers.
pub mod test_fixtures;

pub use studia_core::*;

pub use errorbook::PgErrorBookRepository;
pub use knowledge::PgKnowledgeNodeRepository;
pub use notes::PgNoteRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use snapshots::PgSnapshotRepository;
pub use users::PgUserRepository;

/// One handle bundling the pool and every repository.
pub struct Database {
    /// Shared connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// User repository for identity lookup and access scoping.
    pub users: PgUserRepository,
    /// Note repository for classroom transcripts and summaries.
    pub notes: PgNoteRepository,
    /// Error-book repository for mistake records and quizzes.
    pub error_book: PgErrorBookRepository,
    /// Knowledge-node repository for the deduplicated concept graph.
    pub knowledge: PgKnowledgeNodeRepository,
    /// Mind-map snapshot repository.
    pub snapshots: PgSnapshotRepository,
}

impl Database {
    /// Wrap an existing pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            notes: PgNoteRepository::new(pool.clone()),
            error_book: PgErrorBookRepository::new(pool.clone()),
            knowledge: PgKnowledgeNodeRepository::new(pool.clone()),
            snapshots: PgSnapshotRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to `url` with pool sizing taken from the environment.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Connect to `url` with explicit pool sizing.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Apply any migrations not yet recorded in the target database.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Borrow the underlying pool for ad-hoc queries.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}
