//! Error-book totals, quiz storage, and recency windows.

use serde_json::json;
use studia_db::test_fixtures::TestDatabase;
use studia_db::{ErrorBookRepository, ErrorEntryStatus, NewErrorEntry};
use uuid::Uuid;

async fn insert_entry(
    test_db: &TestDatabase,
    owner_id: Uuid,
    status: ErrorEntryStatus,
) -> studia_db::ErrorEntry {
    test_db
        .db
        .error_book
        .insert(
            owner_id,
            NewErrorEntry {
                title: Some("错题".to_string()),
                subject: Some("数学".to_string()),
                status,
                verdict: None,
                ocr_text: Some("题目文本".to_string()),
                analysis: None,
            },
        )
        .await
        .expect("insert failed")
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_totals_count_full_table_by_status() {
    let test_db = TestDatabase::new().await;
    let student = test_db.create_student("学生甲").await;
    let other = test_db.create_student("学生乙").await;

    insert_entry(&test_db, student.id, ErrorEntryStatus::Done).await;
    let quizzed = insert_entry(&test_db, student.id, ErrorEntryStatus::Done).await;
    insert_entry(&test_db, student.id, ErrorEntryStatus::OcrFailed).await;
    insert_entry(&test_db, student.id, ErrorEntryStatus::AiFailed).await;
    insert_entry(&test_db, student.id, ErrorEntryStatus::Created).await;
    // Another owner's record must not leak into the totals.
    insert_entry(&test_db, other.id, ErrorEntryStatus::Done).await;

    test_db
        .db
        .error_book
        .store_quiz(
            quizzed.id,
            &json!({
                "question": "下列哪个是分式方程？",
                "options": ["A", "B", "C", "D"],
                "answer_index": 0,
                "explanation": "",
                "topic": "分式方程",
            }),
        )
        .await
        .expect("store_quiz failed");

    let totals = test_db
        .db
        .error_book
        .totals(&[student.id])
        .await
        .expect("totals failed");

    assert_eq!(totals.total_entries, 5);
    assert_eq!(totals.done, 2);
    assert_eq!(totals.ocr_failed, 1);
    assert_eq!(totals.ai_failed, 1);
    assert_eq!(totals.with_quiz, 1);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_store_quiz_stamps_creation_time() {
    let test_db = TestDatabase::new().await;
    let student = test_db.create_student("学生甲").await;

    let entry = insert_entry(&test_db, student.id, ErrorEntryStatus::Done).await;
    assert!(entry.quiz.is_none());
    assert!(entry.quiz_created_at.is_none());

    test_db
        .db
        .error_book
        .store_quiz(entry.id, &json!({"question": "题干", "options": ["A", "B", "C", "D"], "answer_index": 1}))
        .await
        .expect("store_quiz failed");

    let stored = test_db
        .db
        .error_book
        .fetch(entry.id)
        .await
        .expect("fetch failed");
    assert!(stored.quiz.is_some());
    assert!(stored.quiz_created_at.is_some());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection
async fn test_recent_for_owners_is_newest_first_and_limited() {
    let test_db = TestDatabase::new().await;
    let student = test_db.create_student("学生甲").await;

    let mut ids = Vec::new();
    for _ in 0..4 {
        ids.push(insert_entry(&test_db, student.id, ErrorEntryStatus::Done).await.id);
    }

    let recent = test_db
        .db
        .error_book
        .recent_for_owners(&[student.id], 3)
        .await
        .expect("recent failed");

    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].id, ids[3]);
    assert_eq!(recent[1].id, ids[2]);
    assert_eq!(recent[2].id, ids[1]);

    test_db.cleanup().await;
}
