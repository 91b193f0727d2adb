use super::coordinate::Coordinate;
use super::event_type::{EventSource, GeofenceEventType, ShiftEventType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded geofence crossing. Append-only.
///
/// `distance_m` and `inside` are fixed at insert time against the site
/// geometry of that moment; both stay `None` when the geometry could not be
/// resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceEvent {
    pub id: String,
    pub business_id: String,
    pub project_id: String,
    pub employee_id: String,
    pub time_entry_id: Option<String>,
    pub event_type: GeofenceEventType,
    pub occurred_at: DateTime<Utc>,
    pub lat: f64,
    pub lng: f64,
    pub distance_m: Option<u32>,
    pub inside: Option<bool>,
    pub source: EventSource,
}

impl GeofenceEvent {
    pub fn position(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Audit-stream event keyed to a shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntryEvent {
    pub id: String,
    pub time_entry_id: String,
    pub business_id: String,
    pub project_id: String,
    pub employee_id: String,
    pub event_type: ShiftEventType,
    pub occurred_at: DateTime<Utc>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub distance_m: Option<u32>,
    pub inside: Option<bool>,
    pub source: EventSource,
}

impl TimeEntryEvent {
    pub fn position(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.lat, self.lng)
    }
}

/// Distance/inside pair computed once from the site geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub distance_m: Option<u32>,
    pub inside: Option<bool>,
}

impl Classification {
    pub fn unknown() -> Self {
        Self::default()
    }
}

pub fn new_event_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
