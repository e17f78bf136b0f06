//! Bookkeeping for one map merge.
//!
//! A generation run materializes nodes one by one while consuming tree
//! relations; this accumulator keeps them in first-materialized order,
//! deduplicates by node id, caches the name→id resolution for the run,
//! and records edges exactly as the merge admits them (edges are not
//! deduplicated, matching the snapshot format).

use std::collections::HashMap;
use uuid::Uuid;

use studia_core::{KnowledgeNode, MapEdge};

/// Node/edge accumulator for a single map generation.
pub struct MapAccumulator {
    nodes: Vec<KnowledgeNode>,
    index: HashMap<Uuid, usize>,
    name_to_id: HashMap<String, Uuid>,
    edges: Vec<MapEdge>,
}

impl MapAccumulator {
    /// Start a map anchored at the root node. The root's (normalized)
    /// name is pre-cached so tree relations naming the root resolve to
    /// it instead of spawning a duplicate.
    pub fn new(root: KnowledgeNode) -> Self {
        let mut acc = Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            name_to_id: HashMap::new(),
            edges: Vec::new(),
        };
        acc.admit(root);
        acc
    }

    pub fn root_id(&self) -> Uuid {
        // The root is always the first admitted node.
        self.nodes[0].id
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[KnowledgeNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[MapEdge] {
        &self.edges
    }

    /// Resolution-cache lookup by normalized name.
    pub fn cached_id(&self, name: &str) -> Option<Uuid> {
        self.name_to_id.get(name).copied()
    }

    /// Admit a materialized node, keeping the first occurrence's position
    /// when the same node id arrives again. Returns the node id.
    pub fn admit(&mut self, node: KnowledgeNode) -> Uuid {
        let id = node.id;
        self.name_to_id.entry(node.name.clone()).or_insert(id);
        if !self.index.contains_key(&id) {
            self.index.insert(id, self.nodes.len());
            self.nodes.push(node);
        }
        id
    }

    pub fn push_edge(&mut self, from: Uuid, to: Uuid) {
        self.edges.push(MapEdge { from, to });
    }

    /// Whether any recorded edge already points at the given node.
    pub fn has_incoming(&self, id: Uuid) -> bool {
        self.edges.iter().any(|edge| edge.to == id)
    }

    pub fn into_parts(self) -> (Vec<KnowledgeNode>, Vec<MapEdge>) {
        (self.nodes, self.edges)
    }
}
