//! Knowledge-map generation.
//!
//! One generation call resolves the source record, obtains a concept
//! tree (LLM-proposed or a flat fallback), materializes its nodes
//! through the deduplicating upsert, and layers mistake highlights,
//! co-occurrence neighbors, historical evidence, and comparative
//! insights on top. A snapshot of the result is persisted best-effort;
//! the response never fails on snapshot problems.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use studia_core::defaults::{
    COOCCURRENCE_WINDOW, ERROR_FALLBACK_TITLE, HIGHLIGHT_WINDOW, HISTORY_INDEX_WINDOW, INSIGHT_TOP,
    MAP_EDGE_BUDGET, MAP_NODE_CAP, NOTE_FALLBACK_TITLE, RELATED_TOP,
};
use studia_core::{
    extract_error_concepts, extract_first_json_object, extract_note_concepts, normalize_concept,
    parse_lenient_object, Error, ErrorBookRepository, GenerationBackend, KnowledgeMap,
    KnowledgeNode, KnowledgeNodeRepository, MapHighlight, MapMode, MapSource, NewMindMapSnapshot,
    NodeEvidence, NodeInsight, NodeKind, NoteRepository, RelatedConcept, Result,
    SnapshotRepository, SourceType, TreeNode, User, UserRepository,
};
use studia_db::Database;
use studia_inference::generate_with_retry;

use crate::cooccur::CooccurrenceGraph;
use crate::history::HistoryIndex;
use crate::merge::MapAccumulator;
use crate::prompts::{compare_prompt, mind_tree_prompt};
use crate::tree::{flatten_tree, parse_mind_tree};

/// Source record a map is generated from, reduced to what the pipeline
/// needs.
struct SourceRecord {
    owner_id: Uuid,
    subject: String,
    title: String,
    seeds: Vec<String>,
    text: String,
}

/// One node row submitted to the comparative-insight prompt.
#[derive(Serialize)]
struct CompareItem {
    name: String,
    highlight: i64,
    notes_titles: Vec<String>,
    errors_titles: Vec<String>,
    errors_verdicts: Vec<String>,
}

/// Generates knowledge maps from notes and error-book entries.
pub struct KnowledgeMapEngine {
    db: Database,
    backend: Arc<dyn GenerationBackend>,
}

impl KnowledgeMapEngine {
    pub fn new(db: Database, backend: Arc<dyn GenerationBackend>) -> Self {
        Self { db, backend }
    }

    /// Generate a knowledge map for one source record.
    ///
    /// In [`MapMode::Ai`] a failed tree generation degrades to the flat
    /// root-and-seeds layout instead of failing the request.
    #[instrument(skip(self, user), fields(
        subsystem = "graph",
        component = "engine",
        op = "generate",
        user_id = %user.id,
        source_type = source_type.as_str(),
        source_id = %source_id,
        mode = ?mode,
    ))]
    pub async fn generate(
        &self,
        user: &User,
        source_type: SourceType,
        source_id: Uuid,
        mode: MapMode,
    ) -> Result<KnowledgeMap> {
        let start = Instant::now();
        let scope = self.db.users.accessible_owner_ids(user).await?;
        let source = self.resolve_source(source_type, source_id, &scope).await?;

        let tree = match mode {
            MapMode::Ai => match self.request_tree(&source).await {
                Ok(tree) => Some(tree),
                Err(e) => {
                    warn!(error = %e, "AI tree generation failed, using flat fallback");
                    None
                }
            },
            MapMode::Simple => None,
        };

        let mut root = self
            .db
            .knowledge
            .get_or_create(
                source.owner_id,
                &source.subject,
                &source.title,
                NodeKind::Chapter,
            )
            .await?
            .ok_or_else(|| Error::Internal("无法生成根节点".to_string()))?;

        if let Some(tree) = &tree {
            let desired = normalize_concept(&tree.name);
            if !desired.is_empty()
                && desired != root.name
                && self.db.knowledge.rename(root.id, &desired).await?
            {
                root.name = desired;
            }
        }

        let mut acc = MapAccumulator::new(root);
        match &tree {
            Some(tree) => {
                self.merge_tree(&mut acc, &source, tree).await?;
                self.merge_seeds(&mut acc, &source).await?;
            }
            None => self.merge_flat(&mut acc, &source).await?,
        }

        let root_id = acc.root_id();
        let (nodes, edges) = acc.into_parts();

        let highlight_counts = self.highlight_counts(source.owner_id, &nodes).await?;
        let graph = self.build_cooccurrence(source.owner_id).await?;
        let related = self.related_neighbors(&graph, &nodes).await?;
        let evidence = self.node_evidence(source.owner_id, &nodes).await?;

        let analysis = match self
            .comparative_insights(&source, &nodes, &highlight_counts, &evidence)
            .await
        {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "Comparative analysis skipped");
                HashMap::new()
            }
        };

        let snapshot = NewMindMapSnapshot {
            owner_id: source.owner_id,
            source_type,
            source_id,
            root_node_id: Some(root_id),
            map: json!({
                "root_id": root_id,
                "nodes": &nodes,
                "edges": &edges,
                "evidence": &evidence,
                "analysis": &analysis,
            }),
            highlights: json!(&highlight_counts),
            related: json!(&related),
        };
        if let Err(e) = self.db.snapshots.insert(snapshot).await {
            warn!(error = %e, "Snapshot persistence failed");
        }

        let mut highlights: Vec<MapHighlight> = highlight_counts
            .into_iter()
            .map(|(node_id, count)| MapHighlight { node_id, count })
            .collect();
        highlights.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.node_id.cmp(&b.node_id)));

        info!(
            node_count = nodes.len(),
            edge_count = edges.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Knowledge map generated"
        );

        Ok(KnowledgeMap {
            generated_at: Utc::now(),
            source: MapSource {
                source_type,
                id: source_id,
                owner_id: source.owner_id,
                title: source.title,
                subject: source.subject,
            },
            root_id,
            nodes,
            edges,
            highlights,
            related,
            evidence,
            analysis,
        })
    }

    async fn resolve_source(
        &self,
        source_type: SourceType,
        source_id: Uuid,
        scope: &[Uuid],
    ) -> Result<SourceRecord> {
        match source_type {
            SourceType::Note => {
                let note = self
                    .db
                    .notes
                    .fetch_scoped(source_id, scope)
                    .await?
                    .ok_or(Error::NoteNotFound(source_id))?;
                let (subject, seeds) = extract_note_concepts(
                    note.subject.as_deref().unwrap_or(""),
                    note.summary.as_ref(),
                );
                let title = match note.title.as_deref().map(str::trim) {
                    Some(t) if !t.is_empty() => t.to_string(),
                    _ => NOTE_FALLBACK_TITLE.to_string(),
                };
                // Transcript text drives tree generation; a summarized
                // note without one still has its summary JSON to offer.
                let text = match note.transcript.as_deref().map(str::trim) {
                    Some(t) if !t.is_empty() => t.to_string(),
                    _ => note
                        .summary
                        .as_ref()
                        .map(JsonValue::to_string)
                        .unwrap_or_default(),
                };
                Ok(SourceRecord {
                    owner_id: note.owner_id,
                    subject,
                    title,
                    seeds,
                    text,
                })
            }
            SourceType::ErrorBook => {
                let entry = self
                    .db
                    .error_book
                    .fetch_scoped(source_id, scope)
                    .await?
                    .ok_or(Error::ErrorEntryNotFound(source_id))?;
                let (subject, seeds) = extract_error_concepts(
                    entry.subject.as_deref().unwrap_or(""),
                    entry.analysis.as_deref().unwrap_or(""),
                );
                let title = match entry.title.as_deref().map(str::trim) {
                    Some(t) if !t.is_empty() => t.to_string(),
                    _ => ERROR_FALLBACK_TITLE.to_string(),
                };
                let text = match entry.ocr_text.as_deref().map(str::trim) {
                    Some(t) if !t.is_empty() => t.to_string(),
                    _ => entry
                        .analysis
                        .as_deref()
                        .map(|s| s.trim().to_string())
                        .unwrap_or_default(),
                };
                Ok(SourceRecord {
                    owner_id: entry.owner_id,
                    subject,
                    title,
                    seeds,
                    text,
                })
            }
        }
    }

    async fn request_tree(&self, source: &SourceRecord) -> Result<TreeNode> {
        let prompt = mind_tree_prompt(&source.subject, &source.title, &source.text, &source.seeds);
        let raw = generate_with_retry(self.backend.as_ref(), &prompt).await?;
        parse_mind_tree(&raw)
    }

    /// Resolve a concept name to a materialized node id, admitting it to
    /// the accumulator. Names already on the map short-circuit without a
    /// database round trip.
    async fn resolve_node(
        &self,
        acc: &mut MapAccumulator,
        owner_id: Uuid,
        subject: &str,
        name: &str,
        kind: NodeKind,
    ) -> Result<Option<Uuid>> {
        let key = normalize_concept(name);
        if key.is_empty() {
            return Ok(None);
        }
        if let Some(id) = acc.cached_id(&key) {
            return Ok(Some(id));
        }
        let Some(node) = self
            .db
            .knowledge
            .get_or_create(owner_id, subject, &key, kind)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(acc.admit(node)))
    }

    async fn merge_tree(
        &self,
        acc: &mut MapAccumulator,
        source: &SourceRecord,
        tree: &TreeNode,
    ) -> Result<()> {
        let pairs = flatten_tree(tree);
        for pair in pairs.iter().take(MAP_EDGE_BUDGET) {
            if acc.node_count() >= MAP_NODE_CAP {
                break;
            }
            let parent = self
                .resolve_node(
                    acc,
                    source.owner_id,
                    &source.subject,
                    &pair.parent,
                    NodeKind::Chapter,
                )
                .await?;
            let child = self
                .resolve_node(
                    acc,
                    source.owner_id,
                    &source.subject,
                    &pair.child,
                    NodeKind::parse_or_concept(&pair.child_kind),
                )
                .await?;
            let (Some(from), Some(to)) = (parent, child) else {
                continue;
            };
            if from != to {
                acc.push_edge(from, to);
            }
        }
        Ok(())
    }

    /// Attach leftover seed concepts under the root, skipping any the
    /// tree already placed.
    async fn merge_seeds(&self, acc: &mut MapAccumulator, source: &SourceRecord) -> Result<()> {
        for seed in &source.seeds {
            if acc.node_count() >= MAP_NODE_CAP {
                break;
            }
            let Some(id) = self
                .resolve_node(
                    acc,
                    source.owner_id,
                    &source.subject,
                    seed,
                    NodeKind::Concept,
                )
                .await?
            else {
                continue;
            };
            if !acc.has_incoming(id) {
                acc.push_edge(acc.root_id(), id);
            }
        }
        Ok(())
    }

    /// Flat fallback: every seed hangs directly off the root.
    async fn merge_flat(&self, acc: &mut MapAccumulator, source: &SourceRecord) -> Result<()> {
        for seed in &source.seeds {
            let Some(id) = self
                .resolve_node(
                    acc,
                    source.owner_id,
                    &source.subject,
                    seed,
                    NodeKind::Concept,
                )
                .await?
            else {
                continue;
            };
            acc.push_edge(acc.root_id(), id);
        }
        Ok(())
    }

    /// Mistake frequency per map node over the owner's recent errors.
    /// Nodes with no recent mistakes are absent, not zero.
    async fn highlight_counts(
        &self,
        owner_id: Uuid,
        nodes: &[KnowledgeNode],
    ) -> Result<HashMap<Uuid, i64>> {
        let recent = self
            .db
            .error_book
            .recent_for_owners(&[owner_id], HIGHLIGHT_WINDOW)
            .await?;
        let mut counter: HashMap<String, i64> = HashMap::new();
        for entry in &recent {
            let (_, concepts) = extract_error_concepts(
                entry.subject.as_deref().unwrap_or(""),
                entry.analysis.as_deref().unwrap_or(""),
            );
            for concept in concepts {
                *counter.entry(concept).or_insert(0) += 1;
            }
        }

        let mut counts = HashMap::new();
        for node in nodes {
            if let Some(count) = counter.get(&node.name) {
                counts.insert(node.id, *count);
            }
        }
        Ok(counts)
    }

    /// Build the co-occurrence graph over the owner's recent records,
    /// materializing every extracted concept as a node on the way.
    async fn build_cooccurrence(&self, owner_id: Uuid) -> Result<CooccurrenceGraph> {
        let scope = [owner_id];
        let notes = self
            .db
            .notes
            .recent_for_owners(&scope, COOCCURRENCE_WINDOW)
            .await?;
        let errors = self
            .db
            .error_book
            .recent_for_owners(&scope, COOCCURRENCE_WINDOW)
            .await?;

        let mut graph = CooccurrenceGraph::new();
        for note in &notes {
            let (subject, concepts) = extract_note_concepts(
                note.subject.as_deref().unwrap_or(""),
                note.summary.as_ref(),
            );
            let ids = self.materialize(owner_id, &subject, &concepts).await?;
            graph.record(&ids);
        }
        for entry in &errors {
            let (subject, concepts) = extract_error_concepts(
                entry.subject.as_deref().unwrap_or(""),
                entry.analysis.as_deref().unwrap_or(""),
            );
            let ids = self.materialize(owner_id, &subject, &concepts).await?;
            graph.record(&ids);
        }
        Ok(graph)
    }

    async fn materialize(
        &self,
        owner_id: Uuid,
        subject: &str,
        concepts: &[String],
    ) -> Result<Vec<Uuid>> {
        let mut ids = Vec::new();
        for concept in concepts {
            if let Some(node) = self
                .db
                .knowledge
                .get_or_create(owner_id, subject, concept, NodeKind::Concept)
                .await?
            {
                ids.push(node.id);
            }
        }
        Ok(ids)
    }

    /// Top co-occurring neighbors for every map node, names resolved in
    /// one batch. Neighbors whose node has vanished are dropped.
    async fn related_neighbors(
        &self,
        graph: &CooccurrenceGraph,
        nodes: &[KnowledgeNode],
    ) -> Result<HashMap<Uuid, Vec<RelatedConcept>>> {
        let mut tops: HashMap<Uuid, Vec<(Uuid, i64)>> = HashMap::new();
        let mut wanted: Vec<Uuid> = Vec::new();
        for node in nodes {
            let top = graph.top_related(node.id, RELATED_TOP);
            wanted.extend(top.iter().map(|(other, _)| *other));
            tops.insert(node.id, top);
        }
        wanted.sort();
        wanted.dedup();
        let names = self.db.knowledge.names_for(&wanted).await?;

        let mut related = HashMap::new();
        for node in nodes {
            let neighbors = tops
                .remove(&node.id)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|(other, count)| {
                    names.get(&other).map(|name| RelatedConcept {
                        node_id: other,
                        name: name.clone(),
                        count,
                    })
                })
                .collect();
            related.insert(node.id, neighbors);
        }
        Ok(related)
    }

    /// Historical evidence per concept node. Chapter nodes carry none.
    async fn node_evidence(
        &self,
        owner_id: Uuid,
        nodes: &[KnowledgeNode],
    ) -> Result<HashMap<Uuid, NodeEvidence>> {
        let scope = [owner_id];
        let notes = self
            .db
            .notes
            .recent_for_owners(&scope, HISTORY_INDEX_WINDOW)
            .await?;
        let errors = self
            .db
            .error_book
            .recent_for_owners(&scope, HISTORY_INDEX_WINDOW)
            .await?;
        let index = HistoryIndex::build(&notes, &errors);

        let mut evidence = HashMap::new();
        for node in nodes {
            if node.kind == NodeKind::Chapter || node.name.is_empty() {
                continue;
            }
            let found = index.evidence_for(&node.name);
            if found.notes.is_empty() && found.errors.is_empty() {
                continue;
            }
            evidence.insert(node.id, found);
        }
        Ok(evidence)
    }

    /// Comparative insights for the most mistake-laden evidenced nodes.
    /// With no candidates the generation call is skipped entirely.
    async fn comparative_insights(
        &self,
        source: &SourceRecord,
        nodes: &[KnowledgeNode],
        highlights: &HashMap<Uuid, i64>,
        evidence: &HashMap<Uuid, NodeEvidence>,
    ) -> Result<HashMap<Uuid, NodeInsight>> {
        let mut candidates: Vec<&KnowledgeNode> = nodes
            .iter()
            .filter(|node| evidence.contains_key(&node.id))
            .collect();
        candidates.sort_by(|a, b| {
            let ha = highlights.get(&a.id).copied().unwrap_or(0);
            let hb = highlights.get(&b.id).copied().unwrap_or(0);
            hb.cmp(&ha).then_with(|| a.name.cmp(&b.name))
        });
        candidates.truncate(INSIGHT_TOP);
        if candidates.is_empty() {
            return Ok(HashMap::new());
        }

        let items: Vec<CompareItem> = candidates
            .iter()
            .filter_map(|node| {
                let ev = evidence.get(&node.id)?;
                Some(CompareItem {
                    name: node.name.clone(),
                    highlight: highlights.get(&node.id).copied().unwrap_or(0),
                    notes_titles: ev.notes.iter().map(|n| n.title.clone()).collect(),
                    errors_titles: ev.errors.iter().map(|e| e.title.clone()).collect(),
                    errors_verdicts: ev
                        .errors
                        .iter()
                        .map(|e| e.verdict.clone())
                        .filter(|v| !v.is_empty())
                        .collect(),
                })
            })
            .collect();
        let items_json = serde_json::to_string(&items)?;
        let prompt = compare_prompt(&source.subject, &source.title, &items_json);
        let raw = generate_with_retry(self.backend.as_ref(), &prompt).await?;

        let mut analysis = HashMap::new();
        for comparison in parse_comparisons(&raw)? {
            let Some(obj) = comparison.as_object() else {
                continue;
            };
            let name = normalize_concept(&text_of(obj.get("name")));
            if name.is_empty() {
                continue;
            }
            // First node with the name wins; maps never hold duplicates.
            let Some(node) = nodes.iter().find(|n| n.name == name) else {
                continue;
            };
            analysis.insert(
                node.id,
                NodeInsight {
                    summary: text_of(obj.get("summary")).trim().to_string(),
                    gaps: string_items(obj.get("gaps")),
                    actions: string_items(obj.get("actions")),
                },
            );
        }
        Ok(analysis)
    }
}

/// Pull the `comparisons` list out of a comparative-insight response.
fn parse_comparisons(raw: &str) -> Result<Vec<JsonValue>> {
    let extracted = extract_first_json_object(raw).unwrap_or_else(|| raw.to_string());
    let payload = parse_lenient_object(&extracted)
        .ok_or_else(|| Error::MalformedOutput("对比分析返回格式不正确".to_string()))?;
    match payload.get("comparisons").and_then(JsonValue::as_array) {
        Some(items) => Ok(items.clone()),
        None => Err(Error::MalformedOutput("对比分析返回格式不正确".to_string())),
    }
}

fn string_items(value: Option<&JsonValue>) -> Vec<String> {
    value
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn text_of(value: Option<&JsonValue>) -> String {
    match value {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
