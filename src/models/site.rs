use super::coordinate::Coordinate;
use serde::{Deserialize, Serialize};

/// Radius applied when a project has none configured.
pub const DEFAULT_RADIUS_M: f64 = 300.0;

/// A job site (project) with its geofence geometry.
///
/// Geometry is read as of "now"; events keep the distance computed at insert
/// time and are never reclassified after an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub business_id: String,
    #[serde(default)]
    pub name: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_m: Option<f64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Site {
    pub fn center(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.lat, self.lng)
    }

    pub fn has_coordinates(&self) -> bool {
        self.center().is_some()
    }

    /// Configured radius, or the 300 m default when absent or non-positive.
    pub fn effective_radius(&self) -> f64 {
        match self.radius_m {
            Some(r) if r.is_finite() && r > 0.0 => r,
            _ => DEFAULT_RADIUS_M,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}
