//! Where the tracker sends transition events.

use crate::core::ingest::{Ingestor, RawEventPayload};
use crate::db::DbPool;
use crate::errors::{AppError, AppResult};
use crate::models::Actor;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const HEADER_ACTOR_ID: &str = "x-actor-id";
pub const HEADER_ACTOR_ROLE: &str = "x-actor-role";
pub const HEADER_BUSINESS_ID: &str = "x-business-id";

#[async_trait]
pub trait EventSink: Send + Sync {
    /// Submit one event; returns the stored (or deduplicated) event id.
    async fn submit(&self, payload: RawEventPayload) -> AppResult<String>;
}

/// Posts events to a running `crewclock serve` instance.
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
    actor: Actor,
}

#[derive(Deserialize)]
struct SubmitResponse {
    event: SubmittedEvent,
}

#[derive(Deserialize)]
struct SubmittedEvent {
    id: String,
}

impl HttpSink {
    pub fn new(base_url: &str, actor: Actor, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/events", base_url.trim_end_matches('/')),
            actor,
        })
    }
}

#[async_trait]
impl EventSink for HttpSink {
    async fn submit(&self, payload: RawEventPayload) -> AppResult<String> {
        let role = if self.actor.is_elevated() { "admin" } else { "member" };

        let mut req = self
            .client
            .post(&self.endpoint)
            .header(HEADER_ACTOR_ID, &self.actor.user_id)
            .header(HEADER_ACTOR_ROLE, role)
            .json(&payload);
        if let Some(b) = &self.actor.active_business {
            req = req.header(HEADER_BUSINESS_ID, b);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Transport(format!("{status}: {body}")));
        }

        let parsed: SubmitResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;
        Ok(parsed.event.id)
    }
}

/// Ingests straight into a local database, for single-machine use and tests.
pub struct LocalSink {
    pool: Arc<Mutex<DbPool>>,
    ingestor: Arc<Ingestor>,
    actor: Actor,
}

impl LocalSink {
    pub fn new(pool: Arc<Mutex<DbPool>>, ingestor: Arc<Ingestor>, actor: Actor) -> Self {
        Self { pool, ingestor, actor }
    }
}

#[async_trait]
impl EventSink for LocalSink {
    async fn submit(&self, payload: RawEventPayload) -> AppResult<String> {
        let pool = Arc::clone(&self.pool);
        let ingestor = Arc::clone(&self.ingestor);
        let actor = self.actor.clone();

        tokio::task::spawn_blocking(move || {
            let submission = payload.validate(Utc::now())?;
            let outcome = ingestor.ingest_shared(&pool, &actor, submission)?;
            Ok(outcome.event.id().to_string())
        })
        .await
        .map_err(|e| AppError::Other(format!("ingest task failed: {e}")))?
    }
}
