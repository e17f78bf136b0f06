//! Sanity checks for the migrated schema.
//!
//! The repositories assume specific tables, constraints, and indexes; these
//! tests verify migrations actually created them.

use sqlx::PgPool;

use studia_db::test_fixtures::DEFAULT_TEST_DATABASE_URL;

/// Helper to get a database connection from the environment.
async fn get_test_pool() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| DEFAULT_TEST_DATABASE_URL.to_string());

    PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test database")
}

#[tokio::test]
#[ignore] // Requires database connection with migrations applied
async fn test_core_tables_exist() {
    let pool = get_test_pool().await;

    for table in [
        "app_user",
        "note",
        "error_entry",
        "knowledge_node",
        "mind_map_snapshot",
    ] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1 FROM information_schema.tables
                 WHERE table_schema = 'public' AND table_name = $1
             )",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .expect("Failed to query information_schema");

        assert!(exists, "Table '{}' should exist after migrations", table);
    }
}

#[tokio::test]
#[ignore] // Requires database connection with migrations applied
async fn test_knowledge_node_identity_is_unique() {
    let pool = get_test_pool().await;

    // The upsert relies on ON CONFLICT (owner_id, subject, name).
    let constraint_type: Option<String> = sqlx::query_scalar(
        "SELECT constraint_type
         FROM information_schema.table_constraints
         WHERE table_name = 'knowledge_node'
           AND constraint_name = 'uq_knowledge_node_owner_subject_name'",
    )
    .fetch_optional(&pool)
    .await
    .expect("Failed to query constraints");

    assert_eq!(
        constraint_type.as_deref(),
        Some("UNIQUE"),
        "knowledge_node needs its (owner_id, subject, name) unique constraint"
    );
}

#[tokio::test]
#[ignore] // Requires database connection with migrations applied
async fn test_owner_scoped_indexes_exist() {
    let pool = get_test_pool().await;

    let indexes: Vec<String> = sqlx::query_scalar(
        "SELECT indexname FROM pg_indexes WHERE schemaname = 'public'",
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query pg_indexes");

    for index in [
        "idx_note_owner_created",
        "idx_error_entry_owner_created",
        "idx_knowledge_node_owner_seen",
        "idx_mind_map_snapshot_owner",
        "idx_app_user_linked",
    ] {
        assert!(
            indexes.contains(&index.to_string()),
            "Index '{}' should exist after migrations",
            index
        );
    }
}
