//! # studia-graph
//!
//! Knowledge-graph construction and mining for studia.
//!
//! This crate provides:
//! - Knowledge-map generation from a note or error-book entry, with an
//!   LLM-proposed concept tree and a deterministic flat fallback
//! - Concept co-occurrence mining over recent records
//! - Per-node historical evidence (backing notes and errors)
//! - Comparative weak-point insights for highlighted nodes
//! - Dashboard aggregation (totals, trends, mined themes, mastery)
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use studia_graph::{KnowledgeMapEngine, MapMode, SourceType};
//! use studia_db::Database;
//! use studia_inference::GeminiBackend;
//!
//! let db = Database::connect("postgres://...").await?;
//! let backend = Arc::new(GeminiBackend::from_env()?);
//! let engine = KnowledgeMapEngine::new(db, backend);
//!
//! let map = engine
//!     .generate(&user, SourceType::Note, note_id, MapMode::Ai)
//!     .await?;
//! println!("{} nodes, {} edges", map.nodes.len(), map.edges.len());
//! ```

pub mod cooccur;
pub mod dashboard;
pub mod engine;
pub mod history;
pub mod mastery;
pub mod merge;
pub mod prompts;
pub mod tree;

// Re-export core types
pub use studia_core::*;

// Re-export graph types
pub use cooccur::CooccurrenceGraph;
pub use dashboard::{
    build_insights, daily_histogram, mine_recent_analysis, subject_distribution, AnalysisDigest,
    DashboardAggregator,
};
pub use engine::KnowledgeMapEngine;
pub use history::HistoryIndex;
pub use mastery::mastery_ranking;
pub use merge::MapAccumulator;
pub use prompts::{compare_prompt, mind_tree_prompt};
pub use tree::{flatten_tree, parse_mind_tree, FlatEdge};
