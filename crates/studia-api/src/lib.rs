//! HTTP API server for studia.
//!
//! Thin axum layer over the workspace crates: identity comes from the
//! `X-User-Id` header (authentication itself lives upstream), handlers
//! delegate to repositories and the generation-backed services, and
//! every error leaves as a `{ "message": ... }` JSON body.

pub mod error;
pub mod handlers;
pub mod identity;
pub mod services;

pub use error::ApiError;
pub use services::{QuizService, ReportService};

use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use studia_core::GenerationBackend;
use studia_db::Database;
use studia_graph::{DashboardAggregator, KnowledgeMapEngine};
use studia_jobs::NoteSummaryService;

/// Maximum request body size. OCR text and transcripts are the largest
/// payloads; no endpoint accepts file uploads.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024; // 2 MB

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Text-generation backend shared by every AI-backed path.
    pub backend: Arc<dyn GenerationBackend>,
    /// Knowledge-map construction engine.
    pub engine: Arc<KnowledgeMapEngine>,
    /// Read-side aggregation for dashboard and report payloads.
    pub dashboard: Arc<DashboardAggregator>,
    /// Background note-summary pipeline with in-flight deduplication.
    pub summaries: NoteSummaryService,
    /// Practice-quiz generation with best-effort persistence.
    pub quizzes: QuizService,
    /// Weekly parent-report drafting with deterministic fallback.
    pub reports: ReportService,
}

impl AppState {
    /// Wire the full service graph from a database handle and a backend.
    pub fn new(db: Database, backend: Arc<dyn GenerationBackend>) -> Self {
        let engine = Arc::new(KnowledgeMapEngine::new(db.clone(), backend.clone()));
        let dashboard = Arc::new(DashboardAggregator::new(db.clone()));
        let summaries = NoteSummaryService::new(db.clone(), backend.clone());
        let quizzes = QuizService::new(db.clone(), backend.clone());
        let reports = ReportService::new(backend.clone());
        Self {
            db,
            backend,
            engine,
            dashboard,
            summaries,
            quizzes,
            reports,
        }
    }
}

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically — useful for
/// log correlation and debugging production incidents.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// OpenAPI documentation served at `/api-docs/openapi.json`; Swagger UI
/// at `/docs` fetches from that endpoint.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Studia API",
        version = "2026.8.4",
        description = "Study-assistant backend with classroom notes, an error book, knowledge maps, and parent reports"
    ),
    paths(
        handlers::notes::list_notes,
        handlers::notes::create_note,
        handlers::notes::get_note,
        handlers::notes::summarize_note,
        handlers::notes::delete_note,
        handlers::errorbook::list_entries,
        handlers::errorbook::create_entry,
        handlers::errorbook::get_entry,
        handlers::errorbook::generate_quiz,
        handlers::errorbook::delete_entry,
        handlers::mindmap::generate_map,
        handlers::dashboard::dashboard_summary,
        handlers::report::parent_report,
    ),
    tags(
        (name = "Notes", description = "Classroom note capture and summarization"),
        (name = "ErrorBook", description = "Error-book entries, analysis, and practice quizzes"),
        (name = "MindMap", description = "Knowledge-map generation"),
        (name = "Dashboard", description = "Aggregated study statistics"),
        (name = "Report", description = "Weekly parent reports"),
        (name = "System", description = "Health checks and system info")
    )
)]
struct ApiDoc;

/// Build the application router.
///
/// Everything under `/api` requires a resolvable `X-User-Id` header;
/// the health check and the OpenAPI surface stay open.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        // Classroom notes
        .route(
            "/api/note/entries",
            get(handlers::notes::list_notes).post(handlers::notes::create_note),
        )
        .route(
            "/api/note/entries/:id",
            get(handlers::notes::get_note).delete(handlers::notes::delete_note),
        )
        .route(
            "/api/note/entries/:id/summarize",
            post(handlers::notes::summarize_note),
        )
        // Error book
        .route(
            "/api/error-book/entries",
            get(handlers::errorbook::list_entries).post(handlers::errorbook::create_entry),
        )
        .route(
            "/api/error-book/entries/:id",
            get(handlers::errorbook::get_entry).delete(handlers::errorbook::delete_entry),
        )
        .route(
            "/api/error-book/entries/:id/quiz",
            post(handlers::errorbook::generate_quiz),
        )
        // Knowledge maps and aggregates
        .route("/api/mind-map/generate", post(handlers::mindmap::generate_map))
        .route(
            "/api/dashboard/summary",
            get(handlers::dashboard::dashboard_summary),
        )
        .route("/api/parent/report", get(handlers::report::parent_report))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            identity::require_user,
        ));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // OpenAPI / Swagger UI
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

// =============================================================================
// HEALTH CHECK
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
