//! Service layer for generation-backed business logic.

pub mod quiz_service;
pub mod report_service;

pub use quiz_service::QuizService;
pub use report_service::ReportService;
