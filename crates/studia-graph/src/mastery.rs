//! Mastery ranking: mistake frequency against reinforcing notes.
//!
//! Counts are joined onto nodes by (owner, subject, name) so a parent
//! viewing two linked students never mixes their statistics, and so a
//! concept that exists in two subjects ranks independently in each.

use std::collections::HashMap;
use uuid::Uuid;

use studia_core::defaults::MASTERY_TOP;
use studia_core::{
    extract_error_concepts, extract_note_concepts, ErrorEntry, KnowledgeNode, MasteryEntry, Note,
};

type ConceptKey = (Uuid, String, String);

/// Rank recently seen knowledge nodes by weakness.
///
/// Every node in the input window is ranked, including ones with zero
/// counts; order is (-mistake_count, -note_count, name) and the result is
/// capped at [`MASTERY_TOP`].
pub fn mastery_ranking(
    nodes: &[KnowledgeNode],
    notes: &[Note],
    errors: &[ErrorEntry],
) -> Vec<MasteryEntry> {
    let mut mistake_counts: HashMap<ConceptKey, i64> = HashMap::new();
    for entry in errors {
        let (subject, concepts) = extract_error_concepts(
            entry.subject.as_deref().unwrap_or(""),
            entry.analysis.as_deref().unwrap_or(""),
        );
        for name in concepts {
            *mistake_counts
                .entry((entry.owner_id, subject.clone(), name))
                .or_insert(0) += 1;
        }
    }

    let mut note_counts: HashMap<ConceptKey, i64> = HashMap::new();
    for note in notes {
        let (subject, concepts) =
            extract_note_concepts(note.subject.as_deref().unwrap_or(""), note.summary.as_ref());
        for name in concepts {
            *note_counts
                .entry((note.owner_id, subject.clone(), name))
                .or_insert(0) += 1;
        }
    }

    let mut ranking: Vec<MasteryEntry> = nodes
        .iter()
        .map(|node| {
            // Stored subject and name are already canonical, so they are
            // the join key as-is.
            let key = (node.owner_id, node.subject.clone(), node.name.clone());
            MasteryEntry {
                node_id: node.id,
                subject: node.subject.clone(),
                name: node.name.clone(),
                mistake_count: mistake_counts.get(&key).copied().unwrap_or(0),
                note_count: note_counts.get(&key).copied().unwrap_or(0),
            }
        })
        .collect();

    ranking.sort_by(|a, b| {
        b.mistake_count
            .cmp(&a.mistake_count)
            .then_with(|| b.note_count.cmp(&a.note_count))
            .then_with(|| a.name.cmp(&b.name))
    });
    ranking.truncate(MASTERY_TOP);
    ranking
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use studia_core::{ErrorEntryStatus, NodeKind, NoteStatus};

    fn node(owner: Uuid, subject: &str, name: &str) -> KnowledgeNode {
        KnowledgeNode {
            id: Uuid::new_v4(),
            owner_id: owner,
            subject: subject.to_string(),
            name: name.to_string(),
            kind: NodeKind::Concept,
            created_at: Utc::now(),
            last_seen_at: Utc::now(),
        }
    }

    fn note(owner: Uuid, subject: &str, key_terms: &[&str]) -> Note {
        Note {
            id: Uuid::new_v4(),
            owner_id: owner,
            title: None,
            subject: Some(subject.to_string()),
            focus_tag: None,
            status: NoteStatus::Done,
            transcript: None,
            summary: Some(json!({ "key_terms": key_terms })),
            tasks: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn error(owner: Uuid, subject: &str, concepts: &[&str]) -> ErrorEntry {
        let analysis = json!({ "key_points": concepts });
        ErrorEntry {
            id: Uuid::new_v4(),
            owner_id: owner,
            title: None,
            subject: Some(subject.to_string()),
            status: ErrorEntryStatus::Done,
            verdict: None,
            ocr_text: None,
            analysis: Some(analysis.to_string()),
            quiz: None,
            quiz_created_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_counts_join_by_owner_subject_name() {
        let owner = Uuid::new_v4();
        let nodes = vec![node(owner, "数学", "去分母"), node(owner, "物理", "浮力")];
        let errors = vec![
            error(owner, "数学", &["去分母"]),
            error(owner, "数学", &["去分母"]),
            error(owner, "物理", &["浮力"]),
        ];
        let notes = vec![note(owner, "数学", &["去分母"])];

        let ranking = mastery_ranking(&nodes, &notes, &errors);
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].name, "去分母");
        assert_eq!(ranking[0].mistake_count, 2);
        assert_eq!(ranking[0].note_count, 1);
        assert_eq!(ranking[1].name, "浮力");
        assert_eq!(ranking[1].mistake_count, 1);
        assert_eq!(ranking[1].note_count, 0);
    }

    #[test]
    fn test_zero_count_nodes_still_ranked() {
        let owner = Uuid::new_v4();
        let nodes = vec![node(owner, "数学", "集合"), node(owner, "数学", "函数")];
        let ranking = mastery_ranking(&nodes, &[], &[]);
        assert_eq!(ranking.len(), 2);
        // All-zero entries fall back to name order.
        assert_eq!(ranking[0].name, "函数");
        assert_eq!(ranking[1].name, "集合");
        assert!(ranking.iter().all(|e| e.mistake_count == 0 && e.note_count == 0));
    }

    #[test]
    fn test_counts_do_not_cross_owners() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let nodes = vec![node(a, "数学", "判别式"), node(b, "数学", "判别式")];
        let errors = vec![error(a, "数学", &["判别式"])];

        let ranking = mastery_ranking(&nodes, &[], &errors);
        let for_a = ranking.iter().find(|e| e.node_id == nodes[0].id).unwrap();
        let for_b = ranking.iter().find(|e| e.node_id == nodes[1].id).unwrap();
        assert_eq!(for_a.mistake_count, 1);
        assert_eq!(for_b.mistake_count, 0);
    }

    #[test]
    fn test_subject_aliases_fold_into_one_key() {
        // The record says 奥数 but the node was stored under 数学.
        let owner = Uuid::new_v4();
        let nodes = vec![node(owner, "数学", "牛吃草问题")];
        let errors = vec![error(owner, "奥数", &["牛吃草问题"])];
        let ranking = mastery_ranking(&nodes, &[], &errors);
        assert_eq!(ranking[0].mistake_count, 1);
    }

    #[test]
    fn test_note_count_breaks_mistake_tie() {
        let owner = Uuid::new_v4();
        let nodes = vec![node(owner, "数学", "甲"), node(owner, "数学", "乙")];
        let errors = vec![
            error(owner, "数学", &["甲"]),
            error(owner, "数学", &["乙"]),
        ];
        let notes = vec![note(owner, "数学", &["乙"])];
        let ranking = mastery_ranking(&nodes, &notes, &errors);
        assert_eq!(ranking[0].name, "乙");
    }

    #[test]
    fn test_ranking_capped() {
        let owner = Uuid::new_v4();
        let nodes: Vec<KnowledgeNode> = (0..MASTERY_TOP + 10)
            .map(|i| node(owner, "数学", &format!("概念{i:03}")))
            .collect();
        let ranking = mastery_ranking(&nodes, &[], &[]);
        assert_eq!(ranking.len(), MASTERY_TOP);
    }
}
