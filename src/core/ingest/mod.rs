//! Event ingestion: validate, authorize, classify against the site geometry
//! and store idempotently.

pub mod business;
pub mod payload;

pub use business::{BusinessResolution, BusinessSource, resolve_business};
pub use payload::{EventSubmission, GeofenceSubmission, RawEventPayload, ShiftSubmission};

use crate::config::Config;
use crate::core::auth::{authorize_event_write, require_actor};
use crate::core::geo::classify;
use crate::db::events::{insert_geofence_event_dedup, insert_time_entry_event_dedup};
use crate::db::pool::{DbPool, lock_pool};
use crate::db::shifts::get_shift;
use crate::db::sites::get_site;
use crate::errors::{AppError, AppResult};
use crate::models::{
    Actor, Classification, Coordinate, GeofenceEvent, Shift, Site, TimeEntryEvent, new_event_id,
};
use business::lookup_shift_with_retry;
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub dedup_window: chrono::Duration,
    pub shift_lookup_attempts: u32,
    pub shift_lookup_delay: Duration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            dedup_window: chrono::Duration::seconds(30),
            shift_lookup_attempts: 3,
            shift_lookup_delay: Duration::from_millis(250),
        }
    }
}

impl IngestSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            dedup_window: cfg.dedup_window(),
            shift_lookup_attempts: cfg.ingest.shift_lookup_attempts,
            shift_lookup_delay: Duration::from_millis(cfg.ingest.shift_lookup_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stream", rename_all = "snake_case")]
pub enum RecordedEvent {
    Geofence(GeofenceEvent),
    Shift(TimeEntryEvent),
}

impl RecordedEvent {
    pub fn id(&self) -> &str {
        match self {
            RecordedEvent::Geofence(e) => &e.id,
            RecordedEvent::Shift(e) => &e.id,
        }
    }

    pub fn inside(&self) -> Option<bool> {
        match self {
            RecordedEvent::Geofence(e) => e.inside,
            RecordedEvent::Shift(e) => e.inside,
        }
    }

    pub fn distance_m(&self) -> Option<u32> {
        match self {
            RecordedEvent::Geofence(e) => e.distance_m,
            RecordedEvent::Shift(e) => e.distance_m,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub event: RecordedEvent,
    /// True when an equivalent event was already stored; `event` is that one.
    pub deduped: bool,
    pub business: BusinessResolution,
}

pub struct Ingestor {
    settings: IngestSettings,
}

impl Ingestor {
    pub fn new(settings: IngestSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    pub fn ingest(
        &self,
        conn: &mut Connection,
        actor: &Actor,
        submission: EventSubmission,
    ) -> AppResult<IngestOutcome> {
        require_actor(actor)?;

        let shift = match submission.time_entry_id() {
            Some(id) => Some(self.lookup_shift(|id| get_shift(&*conn, id), id)?),
            None => None,
        };
        self.ingest_with_shift(conn, actor, submission, shift)
    }

    /// [`Ingestor::ingest`] against a pool shared between callers. The lock is
    /// taken per lookup attempt and for the write, never across a retry delay.
    pub fn ingest_shared(
        &self,
        pool: &Mutex<DbPool>,
        actor: &Actor,
        submission: EventSubmission,
    ) -> AppResult<IngestOutcome> {
        require_actor(actor)?;

        let shift = match submission.time_entry_id() {
            Some(id) => Some(self.lookup_shift(|id| get_shift(&lock_pool(pool)?.conn, id), id)?),
            None => None,
        };

        let mut guard = lock_pool(pool)?;
        self.ingest_with_shift(&mut guard.conn, actor, submission, shift)
    }

    fn lookup_shift<F>(&self, fetch: F, shift_id: &str) -> AppResult<Shift>
    where
        F: FnMut(&str) -> AppResult<Option<Shift>>,
    {
        lookup_shift_with_retry(
            fetch,
            shift_id,
            self.settings.shift_lookup_attempts,
            self.settings.shift_lookup_delay,
        )
    }

    fn ingest_with_shift(
        &self,
        conn: &mut Connection,
        actor: &Actor,
        submission: EventSubmission,
        shift: Option<Shift>,
    ) -> AppResult<IngestOutcome> {
        let employee_id = submission
            .employee_id()
            .unwrap_or(actor.user_id.as_str())
            .to_string();

        let project = get_site(conn, submission.project_id())?;
        let business = resolve_business(actor.active_business.as_deref(), shift.as_ref(), project.as_ref())?;

        if business.context_mismatch {
            tracing::warn!(
                context = actor.active_business.as_deref().unwrap_or_default(),
                business = %business.business_id,
                "request context disagrees with shift record; using shift business"
            );
        }

        authorize_event_write(conn, actor, &business.business_id, &employee_id)?;

        if let Some(shift) = &shift
            && shift.employee_id != employee_id
        {
            return Err(AppError::Forbidden(format!(
                "time entry {} belongs to another employee",
                shift.id
            )));
        }

        let classification = classify_for(project.as_ref(), &business.business_id, submission.position());
        if classification.inside.is_none() {
            tracing::debug!(project = submission.project_id(), "site geometry unavailable, storing unclassified");
        }

        let window = self.settings.dedup_window;
        let (event, deduped) = match submission {
            EventSubmission::Geofence(g) => {
                let ev = GeofenceEvent {
                    id: new_event_id(),
                    business_id: business.business_id.clone(),
                    project_id: g.project_id,
                    employee_id,
                    time_entry_id: g.time_entry_id,
                    event_type: g.event_type,
                    occurred_at: g.occurred_at,
                    lat: g.position.lat,
                    lng: g.position.lng,
                    distance_m: classification.distance_m,
                    inside: classification.inside,
                    source: g.source,
                };
                let outcome = insert_geofence_event_dedup(conn, &ev, window)?;
                let deduped = outcome.is_duplicate();
                (RecordedEvent::Geofence(outcome.into_inner()), deduped)
            }
            EventSubmission::Shift(s) => {
                let ev = TimeEntryEvent {
                    id: new_event_id(),
                    time_entry_id: s.time_entry_id,
                    business_id: business.business_id.clone(),
                    project_id: s.project_id,
                    employee_id,
                    event_type: s.event_type,
                    occurred_at: s.occurred_at,
                    lat: s.position.map(|p| p.lat),
                    lng: s.position.map(|p| p.lng),
                    distance_m: classification.distance_m,
                    inside: classification.inside,
                    source: s.source,
                };
                let outcome = insert_time_entry_event_dedup(conn, &ev, window)?;
                let deduped = outcome.is_duplicate();
                (RecordedEvent::Shift(outcome.into_inner()), deduped)
            }
        };

        if deduped {
            tracing::info!(event_id = event.id(), "duplicate event within window, returning existing");
        } else {
            tracing::info!(
                event_id = event.id(),
                business = %business.business_id,
                inside = ?event.inside(),
                distance_m = ?event.distance_m(),
                "event recorded"
            );
        }

        Ok(IngestOutcome {
            event,
            deduped,
            business,
        })
    }
}

/// Geometry only counts when the project exists and belongs to the resolved
/// business; anything else is stored unclassified.
fn classify_for(project: Option<&Site>, business_id: &str, position: Option<Coordinate>) -> Classification {
    match (project, position) {
        (Some(site), Some(pos)) if site.business_id == business_id => classify(site, pos),
        _ => Classification::unknown(),
    }
}
