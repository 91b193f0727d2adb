//! Polling loop driving one device session.

use super::sink::EventSink;
use super::source::PositionSource;
use super::state::{Decision, ShiftTracker, ThrottleLedger};
use crate::config::Config;
use crate::core::ingest::RawEventPayload;
use crate::models::{Coordinate, EventSource, GeofenceEventType, Site};
use crate::utils::time::fmt_ts;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, timeout};

/// The shift currently being tracked, with its project's geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveShift {
    pub shift_id: String,
    pub site: Site,
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub poll_interval: Duration,
    pub min_emit_interval: chrono::Duration,
    pub position_timeout: Duration,
}

impl TrackerSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            poll_interval: Duration::from_secs(cfg.tracker.poll_interval_secs.max(1)),
            min_emit_interval: chrono::Duration::seconds(cfg.tracker.min_emit_interval_secs as i64),
            position_timeout: Duration::from_secs(cfg.tracker.position_timeout_secs.max(1)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerSummary {
    pub ticks: u32,
    pub samples: u32,
    pub skipped: u32,
    pub emitted: u32,
    pub suppressed: u32,
}

pub struct ProximityTracker<S: PositionSource, K: EventSink + 'static> {
    settings: TrackerSettings,
    source: S,
    sink: Arc<K>,
    ledger: ThrottleLedger,
}

impl<S: PositionSource, K: EventSink + 'static> ProximityTracker<S, K> {
    pub fn new(settings: TrackerSettings, source: S, sink: Arc<K>) -> Self {
        let ledger = ThrottleLedger::new(settings.min_emit_interval);
        Self {
            settings,
            source,
            sink,
            ledger,
        }
    }

    /// Run until the session ends: the shift closes (`None`), the channel's
    /// sender is dropped, or the position source is exhausted. A shift change
    /// mid-read cancels the pending position request.
    pub async fn run(mut self, mut shifts: watch::Receiver<Option<ActiveShift>>) -> TrackerSummary {
        let mut summary = TrackerSummary::default();
        let mut tracker: Option<ShiftTracker> = None;

        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shifts.changed() => {
                    if changed.is_err() || shifts.borrow().is_none() {
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            let Some(active) = shifts.borrow_and_update().clone() else {
                tracing::debug!("no open shift, tracker stopping");
                break;
            };

            if self.source.is_exhausted() {
                break;
            }
            summary.ticks += 1;

            if tracker.as_ref().is_none_or(|t| t.shift_id != active.shift_id) {
                tracing::debug!(shift_id = %active.shift_id, "tracking new shift");
                tracker = Some(ShiftTracker::new(&active.shift_id, &active.site.id));
            }
            let Some(current) = tracker.as_mut() else {
                continue;
            };

            let reading = tokio::select! {
                changed = shifts.changed() => {
                    if changed.is_err() || shifts.borrow().is_none() {
                        break;
                    }
                    // Shift changed under us; drop this read.
                    summary.skipped += 1;
                    continue;
                }
                r = timeout(self.settings.position_timeout, self.source.current_position()) => r,
            };

            let position = match reading {
                Ok(Ok(p)) => p,
                Ok(Err(e)) => {
                    tracing::debug!(error = %e, "position unavailable, skipping tick");
                    summary.skipped += 1;
                    continue;
                }
                Err(_) => {
                    tracing::debug!("position request timed out, skipping tick");
                    summary.skipped += 1;
                    continue;
                }
            };

            let now = Utc::now();
            match current.sample(&active.site, position, now, &mut self.ledger) {
                Decision::Unresolved => summary.skipped += 1,
                Decision::Baseline | Decision::Unchanged => summary.samples += 1,
                Decision::Suppressed(kind) => {
                    summary.samples += 1;
                    summary.suppressed += 1;
                    tracing::debug!(event = %kind, "transition throttled");
                }
                Decision::Emit(kind) => {
                    summary.samples += 1;
                    summary.emitted += 1;
                    self.emit(&active, kind, position, now);
                }
            }
        }

        summary
    }

    /// Detached, never retried; failures only show up in debug builds.
    fn emit(&self, active: &ActiveShift, kind: GeofenceEventType, position: Coordinate, at: chrono::DateTime<Utc>) {
        let payload = RawEventPayload {
            event_type: Some(kind.to_db_str().to_string()),
            project_id: Some(active.site.id.clone()),
            employee_id: None,
            time_entry_id: Some(active.shift_id.clone()),
            occurred_at: Some(fmt_ts(&at)),
            lat: Some(position.lat),
            lng: Some(position.lng),
            source: Some(EventSource::Mobile.to_db_str().to_string()),
        };

        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.submit(payload).await
                && cfg!(debug_assertions)
            {
                tracing::warn!(error = %e, "geofence event submission failed");
            }
        });
    }
}
