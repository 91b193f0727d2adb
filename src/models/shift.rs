use super::coordinate::Coordinate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One employee's clock-in-to-clock-out session at a project (a "time entry").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub business_id: String,
    pub employee_id: String,
    pub project_id: String,
    pub clock_in: DateTime<Utc>,
    pub clock_out: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub clock_in_position: Option<Coordinate>,
    #[serde(default)]
    pub clock_out_position: Option<Coordinate>,
}

impl Shift {
    pub fn is_open(&self) -> bool {
        self.clock_out.is_none()
    }

    /// Worked seconds: the precomputed value when usable, otherwise derived
    /// from the clock timestamps (`now` for a still-open shift).
    pub fn worked_seconds(&self, now: DateTime<Utc>) -> f64 {
        if let Some(d) = self.duration_seconds
            && d.is_finite()
        {
            return d.max(0.0);
        }

        let end = self.clock_out.unwrap_or(now);
        ((end - self.clock_in).num_milliseconds() as f64 / 1000.0).max(0.0)
    }
}
