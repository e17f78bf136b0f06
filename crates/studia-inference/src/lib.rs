//! # studia-inference
//!
//! LLM inference backend abstraction for studia.
//!
//! This crate provides:
//! - The Gemini generation backend used in production
//! - A retry wrapper that distinguishes transient transport failures
//!   from permanent API errors
//! - A deterministic mock backend (feature `mock`) for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use studia_inference::{generate_with_retry, GeminiBackend};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = GeminiBackend::from_env().unwrap();
//!     let raw = generate_with_retry(&backend, "列出三个要点")
//!         .await
//!         .unwrap();
//!     println!("{raw}");
//! }
//! ```

pub mod gemini;
pub mod retry;

// Mock generation backend for testing
#[cfg(feature = "mock")]
pub mod mock;

// Re-export core types
pub use studia_core::*;

pub use gemini::GeminiBackend;
pub use retry::{generate_with_retry, is_transient};

#[cfg(feature = "mock")]
pub use mock::MockGenerationBackend;
