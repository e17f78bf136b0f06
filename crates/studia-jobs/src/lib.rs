//! # studia-jobs
//!
//! Background note-summary pipeline for studia.
//!
//! This crate provides:
//! - Per-note in-flight tracking so duplicate triggers are rejected, not queued
//! - A summarize-validate-persist pipeline over the generation backend
//! - Lifecycle notifications via broadcast channels
//!
//! ## Example
//!
//! ```ignore
//! use studia_jobs::{NoteSummaryService, ScheduleOutcome};
//! use studia_db::Database;
//! use studia_inference::GeminiBackend;
//! use std::sync::Arc;
//!
//! let db = Database::connect("postgres://...").await?;
//! let backend = Arc::new(GeminiBackend::from_env()?);
//! let service = NoteSummaryService::new(db, backend);
//!
//! // Listen for events
//! let mut events = service.events();
//!
//! match service.schedule(note_id) {
//!     ScheduleOutcome::Scheduled => println!("summary started"),
//!     ScheduleOutcome::AlreadyRunning => println!("already in flight"),
//! }
//!
//! while let Ok(event) = events.recv().await {
//!     println!("Event: {:?}", event);
//! }
//! ```

pub mod registry;
pub mod summary;

// Re-export core types
pub use studia_core::*;

// Re-export pipeline types
pub use registry::{InFlightGuard, InFlightRegistry};
pub use summary::{summary_prompt, NoteSummaryService, ScheduleOutcome, SummaryEvent};

/// Capacity of the summary event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = studia_core::defaults::SUMMARY_EVENT_CAPACITY;
