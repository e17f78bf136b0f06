//! # studia-core
//!
//! Core types, traits, and abstractions for the studia backend.
//!
//! This crate provides the foundational data structures, normalization
//! rules, and trait definitions that other studia crates depend on.

pub mod defaults;
pub mod error;
pub mod extract;
pub mod lenient_json;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod quiz;
pub mod summary;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use extract::{extract_error_concepts, extract_note_concepts};
pub use lenient_json::{extract_first_json_object, parse_lenient_object, strip_code_fence};
pub use models::*;
pub use normalize::{normalize_concept, normalize_subject, SUBJECT_CHOICES, UNCLASSIFIED_SUBJECT};
pub use quiz::{validate_quiz, QUIZ_OPTION_COUNT};
pub use summary::validate_note_summary;
pub use traits::*;
