//! End-to-end knowledge-map generation against a real database, with a
//! scripted generation backend.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use studia_db::test_fixtures::{TestDatabase, TestDataBuilder};
use studia_graph::{Error, KnowledgeMapEngine, MapMode, NodeKind, SourceType, User};
use studia_inference::MockGenerationBackend;

const MATH_ANALYSIS: &str = r#"{"mistakes": [{"concept": "去分母"}], "key_points": ["检验"]}"#;

fn engine_with(test_db: &TestDatabase, mock: &MockGenerationBackend) -> KnowledgeMapEngine {
    KnowledgeMapEngine::new(test_db.db.clone(), Arc::new(mock.clone()))
}

async fn seed_math_student(test_db: &TestDatabase) -> (User, Uuid, Uuid) {
    let data = TestDataBuilder::new(test_db)
        .with_student()
        .await
        .with_summarized_note("数学", &["去分母", "验根"])
        .await
        .with_error_entry("数学", MATH_ANALYSIS)
        .await
        .build()
        .await;
    let user = data.owner.clone().expect("builder created owner");
    (user, data.notes[0], data.entries[0])
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_simple_mode_builds_star_without_tree_call() {
    let test_db = TestDatabase::new().await;
    let (user, note_id, _) = seed_math_student(&test_db).await;

    let mock = MockGenerationBackend::new()
        .with_response_mapping("对比分析", r#"{"comparisons": []}"#);
    let engine = engine_with(&test_db, &mock);

    let map = engine
        .generate(&user, SourceType::Note, note_id, MapMode::Simple)
        .await
        .expect("generation failed");

    // Root carries the note title; every seed hangs off it.
    assert_eq!(map.nodes[0].id, map.root_id);
    assert_eq!(map.nodes[0].name, "数学课堂笔记");
    assert_eq!(map.nodes[0].kind, NodeKind::Chapter);
    let names: Vec<&str> = map.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["数学课堂笔记", "去分母", "验根"]);
    assert_eq!(map.edges.len(), 2);
    assert!(map.edges.iter().all(|e| e.from == map.root_id));

    // Simple mode never asks for a tree.
    assert!(mock.prompts().iter().all(|p| !p.contains("知识树")));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_ai_mode_merges_tree_renames_root_and_attaches_loose_seeds() {
    let test_db = TestDatabase::new().await;
    let (user, note_id, _) = seed_math_student(&test_db).await;

    let tree = json!({
        "tree": {
            "name": "分式方程",
            "kind": "chapter",
            "children": [
                { "name": "去分母", "kind": "method", "children": [] },
                { "name": "通分", "kind": "concept", "children": [] }
            ]
        }
    });
    let comparisons = json!({
        "comparisons": [{
            "name": "去分母",
            "summary": "容易忘记检验",
            "gaps": ["检验意识弱"],
            "actions": ["每题检验"]
        }]
    });
    let mock = MockGenerationBackend::new()
        .with_response_mapping("知识树", tree.to_string())
        .with_response_mapping("对比分析", comparisons.to_string());
    let engine = engine_with(&test_db, &mock);

    let map = engine
        .generate(&user, SourceType::Note, note_id, MapMode::Ai)
        .await
        .expect("generation failed");

    // The tree's root name replaced the title-derived one.
    assert_eq!(map.nodes[0].name, "分式方程");
    assert_eq!(map.nodes[0].id, map.root_id);

    let names: Vec<&str> = map.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["分式方程", "去分母", "通分", "验根"]);
    // 去分母 already has a tree edge, so only the loose seed 验根 gets a
    // root edge.
    assert_eq!(map.edges.len(), 3);
    assert!(map.edges.iter().all(|e| e.from == map.root_id));

    let quxiang = map.nodes.iter().find(|n| n.name == "去分母").unwrap();
    assert_eq!(quxiang.kind, NodeKind::Method);

    // Highlight: one recent mistake mentions 去分母.
    assert_eq!(map.highlights.len(), 1);
    assert_eq!(map.highlights[0].node_id, quxiang.id);
    assert_eq!(map.highlights[0].count, 1);

    // Evidence: 去分母 is backed by both the note and the error entry;
    // 验根 by the note alone; the chapter root carries none.
    assert_eq!(map.evidence.len(), 2);
    let ev = map.evidence.get(&quxiang.id).expect("evidence for 去分母");
    assert_eq!(ev.notes.len(), 1);
    assert_eq!(ev.notes[0].title, "数学课堂笔记");
    assert_eq!(ev.errors.len(), 1);
    assert_eq!(ev.errors[0].verdict, "计算过程有误");
    assert!(!map.evidence.contains_key(&map.root_id));

    // Related neighbors come from co-occurrence within single records.
    let related = map.related.get(&quxiang.id).expect("related for 去分母");
    let mut neighbor_names: Vec<&str> = related.iter().map(|r| r.name.as_str()).collect();
    neighbor_names.sort_unstable();
    assert_eq!(neighbor_names, vec!["检验", "验根"]);
    assert!(related.iter().all(|r| r.count == 1));
    assert_eq!(map.related.len(), map.nodes.len());

    // Comparative insight landed on the named node.
    let insight = map.analysis.get(&quxiang.id).expect("insight for 去分母");
    assert_eq!(insight.summary, "容易忘记检验");
    assert_eq!(insight.gaps, vec!["检验意识弱"]);
    assert_eq!(insight.actions, vec!["每题检验"]);

    // One tree call, one comparison call.
    assert_eq!(mock.call_count(), 2);
    assert!(mock.prompts()[0].contains("标题：数学课堂笔记"));

    // The snapshot row was persisted for the owner.
    let count: i64 = sqlx::query_scalar("SELECT count(*) FROM mind_map_snapshot WHERE owner_id = $1")
        .bind(user.id)
        .fetch_one(&test_db.pool)
        .await
        .expect("snapshot count query failed");
    assert_eq!(count, 1);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_ai_mode_falls_back_to_flat_map_on_malformed_tree() {
    let test_db = TestDatabase::new().await;
    let (user, note_id, _) = seed_math_student(&test_db).await;

    let mock = MockGenerationBackend::new()
        .with_response_mapping("知识树", "抱歉，我不能输出 JSON。")
        .with_response_mapping("对比分析", r#"{"comparisons": []}"#);
    let engine = engine_with(&test_db, &mock);

    let map = engine
        .generate(&user, SourceType::Note, note_id, MapMode::Ai)
        .await
        .expect("fallback should not fail the request");

    // No tree, so the root keeps its title name and seeds form a star.
    assert_eq!(map.nodes[0].name, "数学课堂笔记");
    assert_eq!(map.nodes.len(), 3);
    assert_eq!(map.edges.len(), 2);
    assert!(map.edges.iter().all(|e| e.from == map.root_id));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_ai_merge_respects_node_cap() {
    let test_db = TestDatabase::new().await;
    let data = TestDataBuilder::new(&test_db)
        .with_student()
        .await
        .with_note("今天复习了各种方程的解法。")
        .await
        .build()
        .await;
    let user = data.owner.clone().expect("owner");

    let children: Vec<serde_json::Value> = (0..40)
        .map(|i| json!({ "name": format!("子概念{i:02}"), "kind": "concept", "children": [] }))
        .collect();
    let tree = json!({ "tree": { "name": "方程总览", "kind": "chapter", "children": children } });
    let mock = MockGenerationBackend::new().with_response_mapping("知识树", tree.to_string());
    let engine = engine_with(&test_db, &mock);

    let map = engine
        .generate(&user, SourceType::Note, data.notes[0], MapMode::Ai)
        .await
        .expect("generation failed");

    assert_eq!(map.nodes[0].name, "方程总览");
    assert_eq!(map.nodes.len(), 34);
    assert_eq!(map.edges.len(), 33);

    // No evidence exists for synthetic children, so the comparison call
    // was skipped and only the tree was requested.
    assert_eq!(mock.call_count(), 1);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_error_book_source_builds_from_analysis() {
    let test_db = TestDatabase::new().await;
    let data = TestDataBuilder::new(&test_db)
        .with_student()
        .await
        .with_error_entry("数学", MATH_ANALYSIS)
        .await
        .build()
        .await;
    let user = data.owner.clone().expect("owner");

    let mock = MockGenerationBackend::new()
        .with_response_mapping("对比分析", r#"{"comparisons": []}"#);
    let engine = engine_with(&test_db, &mock);

    let map = engine
        .generate(&user, SourceType::ErrorBook, data.entries[0], MapMode::Simple)
        .await
        .expect("generation failed");

    assert_eq!(map.source.source_type, SourceType::ErrorBook);
    assert_eq!(map.source.title, "数学错题");
    assert_eq!(map.source.subject, "数学");
    let names: Vec<&str> = map.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["数学错题", "去分母", "检验"]);

    // Both extracted concepts appear in the entry itself, so both carry
    // a highlight count of one.
    assert_eq!(map.highlights.len(), 2);
    assert!(map.highlights.iter().all(|h| h.count == 1));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_missing_sources_surface_typed_errors() {
    let test_db = TestDatabase::new().await;
    let student = test_db.create_student("学生甲").await;
    let mock = MockGenerationBackend::new();
    let engine = engine_with(&test_db, &mock);

    let missing = Uuid::new_v4();
    let err = engine
        .generate(&student, SourceType::Note, missing, MapMode::Simple)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoteNotFound(id) if id == missing));

    let err = engine
        .generate(&student, SourceType::ErrorBook, missing, MapMode::Simple)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ErrorEntryNotFound(id) if id == missing));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_other_students_records_stay_invisible() {
    let test_db = TestDatabase::new().await;
    let (_, note_id, _) = seed_math_student(&test_db).await;
    let outsider = test_db.create_student("学生乙").await;

    let mock = MockGenerationBackend::new();
    let engine = engine_with(&test_db, &mock);

    let err = engine
        .generate(&outsider, SourceType::Note, note_id, MapMode::Simple)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoteNotFound(_)));

    test_db.cleanup().await;
}
