//! Canonical field names for structured logging.
//!
//! Tracing calls across the workspace spell these fields out literally;
//! this module is the registry that keeps the spelling consistent, so a
//! log query for `owner_id` or `duration_ms` matches every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Operation lost, someone should look |
//! | WARN  | Something failed but a fallback covered it |
//! | INFO  | Startup, shutdown, operation completions |
//! | DEBUG | Decisions taken, intermediate values |
//! | TRACE | Per-item detail, high volume |

// ─── Origin fields ─────────────────────────────────────────────────────────

/// Which crate emitted the event.
/// Values: "api", "db", "graph", "inference", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Unit within a subsystem.
/// Examples: "engine", "merge", "gemini", "pool", "summary"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "generate_map", "get_or_create", "summarize", "dashboard"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Owner (student account) UUID the operation is scoped to.
pub const OWNER_ID: &str = "owner_id";

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Error-book entry UUID being operated on.
pub const ENTRY_ID: &str = "entry_id";

/// Knowledge node UUID.
pub const NODE_ID: &str = "node_id";

/// Canonical subject label.
pub const SUBJECT: &str = "subject";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Elapsed wall-clock time in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of knowledge nodes materialized by an operation.
pub const NODE_COUNT: &str = "node_count";

/// Number of edges produced by an operation.
pub const EDGE_COUNT: &str = "edge_count";

/// Number of seed concepts fed into a merge.
pub const SEED_COUNT: &str = "seed_count";

/// Character length of a prompt sent to the model.
pub const PROMPT_LEN: &str = "prompt_len";

/// Character length of what the model sent back.
pub const RESPONSE_LEN: &str = "response_len";

/// Retry attempt number (0-based).
pub const ATTEMPT: &str = "attempt";

// ─── Database fields ───────────────────────────────────────────────────────

/// Total connections currently held by the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Connections sitting idle in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model identifier used for generation.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error text when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Set when an operation crossed its slow threshold.
pub const SLOW: &str = "slow";
