//! Transition/throttle bookkeeping for the proximity tracker.
//!
//! Pure state: no clock, no geolocation, no I/O. The runner feeds samples in
//! and acts on the returned [`Decision`].

use crate::core::geo::{distance_meters, is_inside};
use crate::models::{Coordinate, GeofenceEventType, Site};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// First resolved sample of the shift; recorded, nothing emitted.
    Baseline,
    Unchanged,
    Emit(GeofenceEventType),
    /// A transition happened inside the throttle window. State still moved.
    Suppressed(GeofenceEventType),
    /// The site has no usable geometry; sample ignored.
    Unresolved,
}

/// Last emission per project. Lives for the whole tracking session so the
/// throttle spans shift boundaries.
#[derive(Debug, Clone)]
pub struct ThrottleLedger {
    min_interval: Duration,
    last_emit_at_by_project: HashMap<String, DateTime<Utc>>,
}

impl ThrottleLedger {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_emit_at_by_project: HashMap::new(),
        }
    }

    pub fn may_emit(&self, project_id: &str, now: DateTime<Utc>) -> bool {
        match self.last_emit_at_by_project.get(project_id) {
            None => true,
            Some(last) => now - *last >= self.min_interval,
        }
    }

    pub fn record(&mut self, project_id: &str, at: DateTime<Utc>) {
        self.last_emit_at_by_project.insert(project_id.to_string(), at);
    }

    pub fn last_emit_at(&self, project_id: &str) -> Option<DateTime<Utc>> {
        self.last_emit_at_by_project.get(project_id).copied()
    }
}

/// Inside/outside state of one active shift.
#[derive(Debug, Clone)]
pub struct ShiftTracker {
    pub shift_id: String,
    pub project_id: String,
    last_inside: Option<bool>,
}

impl ShiftTracker {
    pub fn new(shift_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            shift_id: shift_id.into(),
            project_id: project_id.into(),
            last_inside: None,
        }
    }

    /// `None` until the first sample resolves.
    pub fn last_inside(&self) -> Option<bool> {
        self.last_inside
    }

    pub fn observe(&mut self, inside: bool, now: DateTime<Utc>, ledger: &mut ThrottleLedger) -> Decision {
        let previous = self.last_inside.replace(inside);

        match previous {
            None => Decision::Baseline,
            Some(prev) if prev == inside => Decision::Unchanged,
            Some(_) => {
                let kind = GeofenceEventType::for_inside(inside);
                if ledger.may_emit(&self.project_id, now) {
                    ledger.record(&self.project_id, now);
                    Decision::Emit(kind)
                } else {
                    Decision::Suppressed(kind)
                }
            }
        }
    }

    /// Classify a device position against the site and observe the result.
    pub fn sample(
        &mut self,
        site: &Site,
        position: Coordinate,
        now: DateTime<Utc>,
        ledger: &mut ThrottleLedger,
    ) -> Decision {
        let Some(center) = site.center() else {
            return Decision::Unresolved;
        };
        if !position.is_finite() {
            return Decision::Unresolved;
        }

        let d = distance_meters(center, position);
        self.observe(is_inside(d, site.effective_radius()), now, ledger)
    }
}
