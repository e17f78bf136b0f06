//! Concept co-occurrence graph.
//!
//! Two concepts are related when they were extracted from the same source
//! record. Weights are symmetric and count records, not mentions: each
//! record contributes at most 1 to any pair, however often either concept
//! appears in it.

use std::collections::HashMap;
use uuid::Uuid;

/// Symmetric weighted co-occurrence graph over knowledge-node ids.
#[derive(Debug, Default)]
pub struct CooccurrenceGraph {
    weights: HashMap<Uuid, HashMap<Uuid, i64>>,
}

impl CooccurrenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one source record's node ids.
    ///
    /// Ids are deduplicated preserving first occurrence; every unordered
    /// pair of the remaining ids gets its weight bumped in both
    /// directions. Fewer than two distinct ids contribute nothing.
    pub fn record(&mut self, node_ids: &[Uuid]) {
        let mut uniq: Vec<Uuid> = Vec::with_capacity(node_ids.len());
        for id in node_ids {
            if !uniq.contains(id) {
                uniq.push(*id);
            }
        }
        if uniq.len() < 2 {
            return;
        }
        for i in 0..uniq.len() {
            for j in (i + 1)..uniq.len() {
                let (a, b) = (uniq[i], uniq[j]);
                *self.weights.entry(a).or_default().entry(b).or_insert(0) += 1;
                *self.weights.entry(b).or_default().entry(a).or_insert(0) += 1;
            }
        }
    }

    /// Weight between two nodes (0 when never co-occurred).
    pub fn weight(&self, a: Uuid, b: Uuid) -> i64 {
        self.weights
            .get(&a)
            .and_then(|neighbors| neighbors.get(&b))
            .copied()
            .unwrap_or(0)
    }

    /// Strongest neighbors of a node, heaviest first, ties broken by
    /// neighbor id for a stable order.
    pub fn top_related(&self, id: Uuid, limit: usize) -> Vec<(Uuid, i64)> {
        let Some(neighbors) = self.weights.get(&id) else {
            return Vec::new();
        };
        let mut ranked: Vec<(Uuid, i64)> = neighbors.iter().map(|(&n, &w)| (n, w)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }
}
