//! Wire payload → closed submission type.
//!
//! Clients send one loosely-typed JSON shape; it is validated here, at the
//! boundary, into [`EventSubmission`] so nothing downstream handles optional
//! fields that a given event kind requires.

use crate::errors::{AppError, AppResult};
use crate::models::{Coordinate, EventSource, GeofenceEventType, ShiftEventType};
use crate::utils::time::parse_occurred_at;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEventPayload {
    pub event_type: Option<String>,
    pub project_id: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub time_entry_id: Option<String>,
    #[serde(default)]
    pub occurred_at: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceSubmission {
    pub project_id: String,
    pub event_type: GeofenceEventType,
    /// Defaults to the acting user.
    pub employee_id: Option<String>,
    pub time_entry_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub position: Coordinate,
    pub source: EventSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShiftSubmission {
    pub project_id: String,
    pub event_type: ShiftEventType,
    pub employee_id: Option<String>,
    pub time_entry_id: String,
    pub occurred_at: DateTime<Utc>,
    pub position: Option<Coordinate>,
    pub source: EventSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventSubmission {
    Geofence(GeofenceSubmission),
    Shift(ShiftSubmission),
}

impl EventSubmission {
    pub fn project_id(&self) -> &str {
        match self {
            EventSubmission::Geofence(g) => &g.project_id,
            EventSubmission::Shift(s) => &s.project_id,
        }
    }

    pub fn employee_id(&self) -> Option<&str> {
        match self {
            EventSubmission::Geofence(g) => g.employee_id.as_deref(),
            EventSubmission::Shift(s) => s.employee_id.as_deref(),
        }
    }

    pub fn time_entry_id(&self) -> Option<&str> {
        match self {
            EventSubmission::Geofence(g) => g.time_entry_id.as_deref(),
            EventSubmission::Shift(s) => Some(&s.time_entry_id),
        }
    }

    pub fn position(&self) -> Option<Coordinate> {
        match self {
            EventSubmission::Geofence(g) => Some(g.position),
            EventSubmission::Shift(s) => s.position,
        }
    }

    pub fn type_str(&self) -> &'static str {
        match self {
            EventSubmission::Geofence(g) => g.event_type.to_db_str(),
            EventSubmission::Shift(s) => s.event_type.to_db_str(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_position(lat: Option<f64>, lng: Option<f64>) -> AppResult<Option<Coordinate>> {
    match (lat, lng) {
        (None, None) => Ok(None),
        (Some(_), None) => Err(AppError::validation("lng", "missing while lat is present")),
        (None, Some(_)) => Err(AppError::validation("lat", "missing while lng is present")),
        (Some(lat), Some(lng)) => {
            if !lat.is_finite() {
                return Err(AppError::validation("lat", "must be a finite number"));
            }
            if !lng.is_finite() {
                return Err(AppError::validation("lng", "must be a finite number"));
            }
            Ok(Some(Coordinate::new(lat, lng)))
        }
    }
}

impl RawEventPayload {
    /// Validate into a typed submission. `now` backs a missing `occurred_at`.
    pub fn validate(self, now: DateTime<Utc>) -> AppResult<EventSubmission> {
        let raw_type = non_empty(self.event_type)
            .ok_or_else(|| AppError::validation("event_type", "is required"))?
            .to_lowercase();

        let project_id = non_empty(self.project_id)
            .ok_or_else(|| AppError::validation("project_id", "is required"))?;

        let source = match non_empty(self.source) {
            None => EventSource::default(),
            Some(s) => EventSource::from_db_str(&s.to_lowercase())
                .ok_or_else(|| AppError::validation("source", format!("unknown source '{s}'")))?,
        };

        let occurred_at = parse_occurred_at(self.occurred_at.as_deref(), now)?;
        let position = parse_position(self.lat, self.lng)?;
        let employee_id = non_empty(self.employee_id);
        let time_entry_id = non_empty(self.time_entry_id);

        if let Some(event_type) = GeofenceEventType::from_db_str(&raw_type) {
            let position = position.ok_or_else(|| {
                AppError::validation("lat", "coordinates are required for geofence events")
            })?;

            return Ok(EventSubmission::Geofence(GeofenceSubmission {
                project_id,
                event_type,
                employee_id,
                time_entry_id,
                occurred_at,
                position,
                source,
            }));
        }

        if let Some(event_type) = ShiftEventType::from_db_str(&raw_type) {
            let time_entry_id = time_entry_id.ok_or_else(|| {
                AppError::validation("time_entry_id", "is required for shift events")
            })?;

            return Ok(EventSubmission::Shift(ShiftSubmission {
                project_id,
                event_type,
                employee_id,
                time_entry_id,
                occurred_at,
                position,
                source,
            }));
        }

        Err(AppError::validation(
            "event_type",
            format!("unknown event type '{raw_type}'"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-03-05T12:00:00Z".parse().unwrap()
    }

    fn enter() -> RawEventPayload {
        RawEventPayload {
            event_type: Some("enter".into()),
            project_id: Some("p1".into()),
            lat: Some(45.0),
            lng: Some(9.0),
            ..Default::default()
        }
    }

    fn invalid_field(payload: RawEventPayload) -> &'static str {
        match payload.validate(now()) {
            Err(AppError::Validation { field, .. }) => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn geofence_payload_becomes_typed_submission() {
        let EventSubmission::Geofence(g) = enter().validate(now()).unwrap() else {
            panic!("expected a geofence submission");
        };
        assert_eq!(g.event_type, GeofenceEventType::Enter);
        assert_eq!(g.occurred_at, now());
        assert_eq!(g.source, EventSource::Mobile);
        assert_eq!(g.position, Coordinate::new(45.0, 9.0));
    }

    #[test]
    fn non_finite_lat_is_rejected() {
        let p = RawEventPayload {
            lat: Some(f64::NAN),
            ..enter()
        };
        assert_eq!(invalid_field(p), "lat");
    }

    #[test]
    fn lat_without_lng_is_rejected() {
        let p = RawEventPayload {
            lng: None,
            ..enter()
        };
        assert_eq!(invalid_field(p), "lng");
    }

    #[test]
    fn geofence_event_needs_coordinates() {
        let p = RawEventPayload {
            lat: None,
            lng: None,
            ..enter()
        };
        assert_eq!(invalid_field(p), "lat");
    }

    #[test]
    fn present_but_unparseable_occurred_at_is_rejected() {
        let p = RawEventPayload {
            occurred_at: Some("yesterday-ish".into()),
            ..enter()
        };
        assert_eq!(invalid_field(p), "occurred_at");

        let blank = RawEventPayload {
            occurred_at: Some("  ".into()),
            ..enter()
        };
        assert_eq!(blank.validate(now()).unwrap().type_str(), "enter");
    }

    #[test]
    fn unknown_source_is_rejected() {
        let p = RawEventPayload {
            source: Some("carrier-pigeon".into()),
            ..enter()
        };
        assert_eq!(invalid_field(p), "source");
    }

    #[test]
    fn shift_event_needs_time_entry_but_not_coordinates() {
        let p = RawEventPayload {
            event_type: Some("Clock_Out".into()),
            lat: None,
            lng: None,
            ..enter()
        };
        assert_eq!(invalid_field(p), "time_entry_id");

        let p = RawEventPayload {
            event_type: Some("clock_out".into()),
            time_entry_id: Some("shift-1".into()),
            lat: None,
            lng: None,
            ..enter()
        };
        let EventSubmission::Shift(s) = p.validate(now()).unwrap() else {
            panic!("expected a shift submission");
        };
        assert_eq!(s.event_type, ShiftEventType::ClockOut);
        assert_eq!(s.position, None);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let p = RawEventPayload {
            event_type: Some("teleport".into()),
            ..enter()
        };
        assert_eq!(invalid_field(p), "event_type");
    }
}
