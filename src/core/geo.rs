//! Geodesy helpers shared by tracking, ingestion, backfill and reports.

use crate::models::{Classification, Coordinate, Site};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Length of one degree of latitude in the flat-Earth approximation.
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Great-circle distance in meters (haversine).
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Inside iff `distance_m <= radius_m`. A radius that is not a finite positive
/// number never contains anything.
pub fn is_inside(distance_m: f64, radius_m: f64) -> bool {
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return false;
    }
    distance_m.is_finite() && distance_m <= radius_m
}

/// Project a point `meters` away along `bearing_rad` (0 = north, clockwise),
/// using a local flat-Earth approximation. Only suitable for short offsets.
pub fn offset(origin: Coordinate, meters: f64, bearing_rad: f64) -> Coordinate {
    let d_north = meters * bearing_rad.cos();
    let d_east = meters * bearing_rad.sin();

    let meters_per_degree_lng = METERS_PER_DEGREE_LAT * origin.lat.to_radians().cos();

    let lat = origin.lat + d_north / METERS_PER_DEGREE_LAT;
    let lng = if meters_per_degree_lng.abs() > f64::EPSILON {
        origin.lng + d_east / meters_per_degree_lng
    } else {
        origin.lng
    };

    Coordinate::new(lat, lng)
}

/// Classify a position against a site's current geometry.
///
/// The stored distance is a whole number of meters and `inside` is decided on
/// that stored value, so `inside == (distance_m <= radius)` holds for every row.
/// Unknown when the site has no usable center or the position is not finite.
pub fn classify(site: &Site, position: Coordinate) -> Classification {
    let Some(center) = site.center() else {
        return Classification::unknown();
    };
    if !position.is_finite() {
        return Classification::unknown();
    }

    let rounded = distance_meters(center, position).round().max(0.0);
    Classification {
        distance_m: Some(rounded as u32),
        inside: Some(is_inside(rounded, site.effective_radius())),
    }
}
