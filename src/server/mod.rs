//! HTTP surface: event ingestion, reports and site resolution.

pub mod error;
pub mod identity;
pub mod routes;

use crate::config::Config;
use crate::core::ingest::{EventSubmission, IngestOutcome, IngestSettings, Ingestor};
use crate::db::{DbPool, lock_pool};
use crate::models::Actor;
use crate::errors::{AppError, AppResult};
use axum::Router;
use axum::routing::{get, post};
use std::sync::{Arc, Mutex};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<Mutex<DbPool>>,
    pub ingestor: Arc<Ingestor>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        Self {
            pool: Arc::new(Mutex::new(pool)),
            ingestor: Arc::new(Ingestor::new(IngestSettings::from_config(&config))),
            config: Arc::new(config),
        }
    }

    /// Run blocking database work off the async workers.
    pub async fn with_db<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut DbPool) -> AppResult<T> + Send + 'static,
    {
        let pool = Arc::clone(&self.pool);

        tokio::task::spawn_blocking(move || {
            let mut guard = lock_pool(&pool)?;
            f(&mut *guard)
        })
        .await
        .map_err(|e| AppError::Other(format!("blocking task failed: {e}")))?
    }

    /// Ingest without holding the pool while a shift lookup waits to retry.
    pub async fn ingest(&self, actor: Actor, submission: EventSubmission) -> AppResult<IngestOutcome> {
        let pool = Arc::clone(&self.pool);
        let ingestor = Arc::clone(&self.ingestor);

        tokio::task::spawn_blocking(move || ingestor.ingest_shared(&pool, &actor, submission))
            .await
            .map_err(|e| AppError::Other(format!("blocking task failed: {e}")))?
    }
}

/// ```text
/// GET  /health
/// POST /api/events
/// GET  /api/reports
/// GET  /api/sites/resolve
/// ```
pub fn router(state: AppState) -> Router {
    let timeout = state.config.request_timeout();

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/events", post(routes::events::record_event))
        .route("/api/reports", get(routes::reports::get_report))
        .route("/api/sites/resolve", get(routes::sites::resolve_site))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

pub async fn serve(config: Config, bind: &str) -> AppResult<()> {
    let pool = DbPool::open_migrated(&config.database)?;
    let app = router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
