//! studia API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use studia_api::AppState;
use studia_core::GenerationBackend;
use studia_db::Database;
use studia_inference::GeminiBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let _log_guard = init_tracing();

    let database_url = env_or("DATABASE_URL", "postgres://localhost/studia");
    let host = env_or("HOST", "0.0.0.0");
    let port: u16 = env_or("PORT", "3000").parse().unwrap_or(3000);

    info!("Connecting to database");
    let db = Database::connect(&database_url).await?;
    db.migrate().await?;
    info!("Database ready, migrations applied");

    // Generation backend (summaries, analyses, quizzes, maps, reports)
    let backend: Arc<dyn GenerationBackend> = Arc::new(GeminiBackend::from_env()?);
    info!("Generation backend initialized: {}", backend.model_name());

    let state = AppState::new(db, backend);
    let app = studia_api::app(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` sets the filter (default `studia_api=debug,tower_http=debug`).
/// `LOG_FORMAT=json` switches to JSON lines, `LOG_FILE=<path>` adds a daily
/// rolling file target, and `LOG_ANSI` forces colors on or off. The returned
/// guard must stay alive for the process lifetime or buffered file output
/// is lost.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "studia_api=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");
    let ansi = std::env::var("LOG_ANSI").ok().map(|v| v == "true" || v == "1");
    let file = std::env::var("LOG_FILE").ok();

    let registry = tracing_subscriber::registry().with(filter);

    let guard = match file.as_deref() {
        Some(path) => {
            let target = std::path::Path::new(path);
            let dir = target.parent().unwrap_or(std::path::Path::new("."));
            let name = target
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("studia-api.log");
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            if json {
                registry
                    .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                    .init();
            } else {
                // files default to plain text
                registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(writer)
                            .with_ansi(ansi.unwrap_or(false)),
                    )
                    .init();
            }
            Some(guard)
        }
        None => {
            if json {
                registry
                    .with(tracing_subscriber::fmt::layer().json())
                    .init();
            } else {
                let mut layer = tracing_subscriber::fmt::layer();
                if let Some(ansi) = ansi {
                    layer = layer.with_ansi(ansi);
                }
                registry.with(layer).init();
            }
            None
        }
    };

    info!(
        log_format = if json { "json" } else { "text" },
        log_file = file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    guard
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
