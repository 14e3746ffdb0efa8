use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::ai::{AiService, HttpAiService};
use super::api::{self, AppState};
use super::db::{DbHandle, PlannerDb};

/// Configuration for the planner server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub ai_base_url: String,
    pub ai_timeout: Option<Duration>,
    pub dev_mode: bool,
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            db_path: PathBuf::from(".learnstack/learnstack.db"),
            ai_base_url: "http://localhost:8000".to_string(),
            ai_timeout: None,
            dev_mode: false,
            open_browser: false,
        }
    }
}

/// Build the full application router with request tracing, plus permissive
/// CORS in dev mode.
pub fn build_router(state: Arc<AppState>, dev_mode: bool) -> Router {
    let app = api::api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http());
    if dev_mode {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Serve `app` on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")
}

/// Start the planner server.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let db = PlannerDb::new(&config.db_path).context("Failed to initialize planner database")?;
    let ai = HttpAiService::new(&config.ai_base_url, config.ai_timeout)
        .context("Failed to build AI service client")?;
    if !ai.health().await {
        tracing::warn!(
            url = %config.ai_base_url,
            "AI service is not reachable, task generation will fail until it is"
        );
    }

    let state = Arc::new(AppState {
        db: DbHandle::new(db),
        ai: Arc::new(ai),
    });
    let app = build_router(state, config.dev_mode);

    let host = if config.dev_mode { "0.0.0.0" } else { config.host.as_str() };
    let addr = format!("{}:{}", host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr: SocketAddr = listener.local_addr()?;
    let url = format!("http://{}", local_addr);
    println!("learnstack running at {}", url);
    tracing::info!(addr = %local_addr, db = %config.db_path.display(), "Server started");

    if config.open_browser {
        if let Err(e) = open::that(&url) {
            tracing::warn!(error = %e, "Failed to open browser");
        }
    }

    serve(listener, app, shutdown_signal()).await?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    println!("\nShutting down...");
}
