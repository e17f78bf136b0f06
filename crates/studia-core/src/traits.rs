//! Core traits for studia abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// USER REPOSITORY
// =============================================================================

/// Repository for user lookup and access scoping.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch a user by id.
    async fn fetch(&self, id: Uuid) -> Result<User>;

    /// Owner ids whose records the given user may read.
    ///
    /// Students see only themselves. Parents additionally see linked
    /// student accounts, whichever side of the link the binding was
    /// stored on. The result is sorted and deduplicated.
    async fn accessible_owner_ids(&self, user: &User) -> Result<Vec<Uuid>>;
}

// =============================================================================
// NOTE REPOSITORY
// =============================================================================

/// Insert request for a classroom note.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub focus_tag: Option<String>,
    pub transcript: String,
}

/// Summary payload applied to a note once the pipeline succeeds.
#[derive(Debug, Clone)]
pub struct ApplySummaryRequest {
    pub title: String,
    pub subject: String,
    pub summary: JsonValue,
    pub tasks: JsonValue,
}

/// Repository for classroom notes.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a new note with its transcript.
    async fn insert(&self, owner_id: Uuid, req: NewNote) -> Result<Note>;

    /// Fetch a note by id.
    async fn fetch(&self, id: Uuid) -> Result<Note>;

    /// Fetch a note only if it belongs to one of the given owners.
    ///
    /// Records outside the scope are indistinguishable from missing ones.
    async fn fetch_scoped(&self, id: Uuid, owner_ids: &[Uuid]) -> Result<Option<Note>>;

    /// Most recent notes across the given owners, newest first.
    async fn recent_for_owners(&self, owner_ids: &[Uuid], limit: i64) -> Result<Vec<Note>>;

    /// Prepare a note for (re-)summarization: apply optional transcript
    /// and focus-tag overrides, clear previous summary output, and move
    /// the status to `summarizing`.
    async fn reset_for_summary(
        &self,
        id: Uuid,
        transcript: Option<&str>,
        focus_tag: Option<&str>,
    ) -> Result<Note>;

    /// Persist a validated summary and mark the note `done`.
    async fn apply_summary(&self, id: Uuid, req: ApplySummaryRequest) -> Result<()>;

    /// Mark the note `summary_failed`.
    async fn mark_summary_failed(&self, id: Uuid) -> Result<()>;

    /// Delete a note.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// ERROR-BOOK REPOSITORY
// =============================================================================

/// Insert request for an error-book entry, fields already enriched.
#[derive(Debug, Clone)]
pub struct NewErrorEntry {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub status: ErrorEntryStatus,
    pub verdict: Option<String>,
    pub ocr_text: Option<String>,
    pub analysis: Option<String>,
}

/// Repository for error-book entries.
#[async_trait]
pub trait ErrorBookRepository: Send + Sync {
    /// Insert a new entry.
    async fn insert(&self, owner_id: Uuid, req: NewErrorEntry) -> Result<ErrorEntry>;

    /// Fetch an entry by id.
    async fn fetch(&self, id: Uuid) -> Result<ErrorEntry>;

    /// Fetch an entry only if it belongs to one of the given owners.
    async fn fetch_scoped(&self, id: Uuid, owner_ids: &[Uuid]) -> Result<Option<ErrorEntry>>;

    /// Most recent entries across the given owners, newest first.
    async fn recent_for_owners(&self, owner_ids: &[Uuid], limit: i64) -> Result<Vec<ErrorEntry>>;

    /// Status totals over every entry of the given owners.
    async fn totals(&self, owner_ids: &[Uuid]) -> Result<ErrorBookTotals>;

    /// Store a generated quiz payload and stamp its creation time.
    async fn store_quiz(&self, id: Uuid, quiz: &JsonValue) -> Result<()>;

    /// Delete an entry.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// KNOWLEDGE NODE REPOSITORY
// =============================================================================

/// Repository for deduplicated knowledge-graph nodes.
#[async_trait]
pub trait KnowledgeNodeRepository: Send + Sync {
    /// Resolve `(owner, subject, name)` to its node, creating it when
    /// missing. The subject is canonicalized and the name normalized
    /// before lookup; a name that normalizes to nothing yields `None`.
    ///
    /// On an existing node `last_seen_at` is bumped, and the kind is
    /// upgraded when the stored kind is the generic `concept` and a more
    /// specific one is requested. Kinds never change otherwise.
    async fn get_or_create(
        &self,
        owner_id: Uuid,
        subject: &str,
        name: &str,
        kind: NodeKind,
    ) -> Result<Option<KnowledgeNode>>;

    /// Rename a node. Returns `false` when the target name is already
    /// taken for the same owner and subject, leaving the node unchanged.
    async fn rename(&self, id: Uuid, name: &str) -> Result<bool>;

    /// Batch-resolve node names by id. Missing ids are simply absent.
    async fn names_for(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>>;

    /// Most recently seen nodes across the given owners.
    async fn recent_for_owners(&self, owner_ids: &[Uuid], limit: i64)
        -> Result<Vec<KnowledgeNode>>;
}

// =============================================================================
// SNAPSHOT REPOSITORY
// =============================================================================

/// Repository for mind-map snapshots. Snapshots are insert-only.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Persist a snapshot, returning its id.
    async fn insert(&self, snapshot: NewMindMapSnapshot) -> Result<Uuid>;
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text given a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
