//! Handler modules for studia-api.
//!
//! One module per route group; all handlers take the authenticated
//! [`studia_core::User`] from request extensions.

pub mod dashboard;
pub mod errorbook;
pub mod mindmap;
pub mod notes;
pub mod report;

/// Number of entries returned by the list endpoints.
pub const LIST_LIMIT: i64 = 50;
