//! Centralized default constants for the studia system.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates reference these constants instead of defining their
//! own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// CONCEPT NORMALIZATION
// =============================================================================

/// Maximum length of a normalized concept name, in characters.
///
/// This is a display/identity bound, not a semantic limit: two distinct
/// long names may truncate to the same node identity (accepted lossy
/// behavior).
pub const CONCEPT_NAME_MAX_CHARS: usize = 24;

/// Maximum heading length taken from a summary point with no full-width
/// colon, in characters.
pub const SUMMARY_POINT_HEAD_CHARS: usize = 12;

/// Maximum concepts extracted from one source record.
pub const CONCEPTS_PER_RECORD: usize = 16;

// =============================================================================
// KNOWLEDGE MAP
// =============================================================================

/// Hard cap on materialized nodes per map generation, root included.
/// Bounds LLM-induced graph explosion.
pub const MAP_NODE_CAP: usize = 34;

/// Maximum flattened tree edges consumed per map generation.
pub const MAP_EDGE_BUDGET: usize = 80;

/// Maximum seed concepts forwarded to the tree-generation prompt.
pub const PROMPT_SEED_CAP: usize = 18;

/// Maximum source-text characters forwarded to the tree-generation prompt.
pub const PROMPT_SOURCE_CHARS: usize = 4500;

/// Default root title for a note-sourced map with no stored title.
pub const NOTE_FALLBACK_TITLE: &str = "课堂笔记";

/// Default root title for an error-book-sourced map with no stored title.
pub const ERROR_FALLBACK_TITLE: &str = "错题知识树";

/// Default title shown for an untitled error entry in evidence lists.
pub const ERROR_EVIDENCE_TITLE: &str = "错题";

// =============================================================================
// HISTORY WINDOWS
// =============================================================================

/// Recent records per source kind scanned by the co-occurrence builder.
pub const COOCCURRENCE_WINDOW: i64 = 120;

/// Recent error entries scanned for highlight (mistake-frequency) counts.
pub const HIGHLIGHT_WINDOW: i64 = 160;

/// Recent records per source kind indexed for per-node evidence.
pub const HISTORY_INDEX_WINDOW: i64 = 220;

/// Recent error entries scanned by the dashboard aggregator.
pub const DASHBOARD_WINDOW: i64 = 80;

/// Recent error entries scanned for mastery mistake counts.
pub const MASTERY_ERROR_WINDOW: i64 = 120;

/// Recent notes scanned for mastery note counts.
pub const MASTERY_NOTE_WINDOW: i64 = 160;

/// Most-recently-seen knowledge nodes considered for mastery ranking.
pub const MASTERY_NODE_WINDOW: i64 = 120;

// =============================================================================
// RANKING CAPS
// =============================================================================

/// Mastery entries exposed on the dashboard.
pub const MASTERY_TOP: usize = 40;

/// Related neighbors exposed per map node.
pub const RELATED_TOP: usize = 6;

/// Evidence notes/errors exposed per map node (each).
pub const EVIDENCE_TOP: usize = 5;

/// Nodes submitted to the comparative-insight call.
pub const INSIGHT_TOP: usize = 8;

/// Top recurring key points / review plan items / weak concepts on the
/// dashboard.
pub const DASHBOARD_TOP: usize = 6;

/// Recent error entries echoed on the dashboard.
pub const DASHBOARD_RECENT_ENTRIES: usize = 8;

/// Recent classroom notes echoed on the dashboard.
pub const DASHBOARD_RECENT_NOTES: i64 = 10;

// =============================================================================
// NOTE SUMMARY
// =============================================================================

/// Maximum summary points kept by summary validation.
pub const SUMMARY_POINTS_CAP: usize = 8;

/// Maximum key terms kept by summary validation.
pub const KEY_TERMS_CAP: usize = 12;

/// Maximum tasks kept by summary validation.
pub const TASKS_CAP: usize = 12;

// =============================================================================
// GENERATION / RETRY
// =============================================================================

/// Attempts per generation call before giving up.
pub const GENERATION_ATTEMPTS: u32 = 3;

/// Base backoff before the first retry, in milliseconds.
pub const RETRY_BASE_DELAY_MS: u64 = 600;

/// Additional backoff per completed attempt, in milliseconds.
pub const RETRY_STEP_DELAY_MS: u64 = 900;

/// Default Gemini model name.
pub const GEN_MODEL: &str = "gemini-2.5-flash";

/// Default Gemini API base URL.
pub const GEN_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Timeout for generation requests in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default summary-event broadcast channel capacity.
pub const SUMMARY_EVENT_CAPACITY: usize = 64;
