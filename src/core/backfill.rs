//! Synthetic enter/exit/re-enter history for shifts recorded before event
//! capture existed.

use crate::core::geo::{classify, offset};
use crate::db::events::{count_events_for_time_entry, insert_geofence_batch};
use crate::db::log::ttlog;
use crate::db::shifts::load_shifts_since;
use crate::db::sites::{get_site, load_sites_by_business};
use crate::errors::{AppError, AppResult};
use crate::models::{EventSource, GeofenceEvent, GeofenceEventType, Shift, Site, new_event_id};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::f64::consts::TAU;

pub const MAX_EVENTS_PER_SHIFT: u8 = 3;

const ENTER_JITTER: Duration = Duration::minutes(10);
const OPEN_SHIFT_PLACEHOLDER: Duration = Duration::hours(2);
const MIN_SHIFT: Duration = Duration::minutes(1);
const EXIT_MIN_SHIFT: Duration = Duration::minutes(30);
const EXIT_AFTER_ENTER: Duration = Duration::minutes(5);
const EXIT_BEFORE_END: Duration = Duration::minutes(10);
const EXIT_FRACTION: (f64, f64) = (0.2, 0.7);
const REENTER_MIN_GAP: Duration = Duration::minutes(5);
const REENTER_MAX_GAP: Duration = Duration::minutes(90);

const ON_SITE_METERS: (f64, f64) = (3.0, 25.0);
const EXIT_OVERSHOOT_METERS: (f64, f64) = (8.0, 22.0);
const EXIT_CLAMP_METERS: (f64, f64) = (18.0, 50.0);

/// Shape of the synthesized sequence for one shift.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisParams {
    pub cap: u8,
    pub exit_probability: f64,
    pub reenter_probability: f64,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            cap: MAX_EVENTS_PER_SHIFT,
            exit_probability: 0.8,
            reenter_probability: 0.7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackfillOptions {
    pub business_id: String,
    pub lookback_days: u32,
    pub dry_run: bool,
    pub overwrite: bool,
    pub batch_size: usize,
    pub params: SynthesisParams,
}

impl BackfillOptions {
    /// Dry-run, no overwrite, cap 3, 30 day lookback.
    pub fn new(business_id: impl Into<String>) -> Self {
        Self {
            business_id: business_id.into(),
            lookback_days: 30,
            dry_run: true,
            overwrite: false,
            batch_size: 200,
            params: SynthesisParams::default(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.business_id.trim().is_empty() {
            return Err(AppError::validation("business", "is required"));
        }
        if self.params.cap > MAX_EVENTS_PER_SHIFT {
            return Err(AppError::validation(
                "max_events",
                format!("must be between 0 and {MAX_EVENTS_PER_SHIFT}"),
            ));
        }
        if self.batch_size == 0 {
            return Err(AppError::validation("batch_size", "must be positive"));
        }
        for p in [self.params.exit_probability, self.params.reenter_probability] {
            if !(0.0..=1.0).contains(&p) {
                return Err(AppError::validation("probability", "must be within 0..=1"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub business_id: String,
    pub dry_run: bool,
    pub scanned: usize,
    pub skipped_existing: usize,
    pub skipped_no_coords: usize,
    pub skipped_cap_zero: usize,
    pub generated: usize,
    pub inserted: usize,
    pub batches: usize,
}

/// Uniform instant in `[lo, hi]` (millisecond resolution).
fn instant_between<R: Rng + ?Sized>(rng: &mut R, lo: DateTime<Utc>, hi: DateTime<Utc>) -> DateTime<Utc> {
    let span = (hi - lo).num_milliseconds();
    if span <= 0 {
        return lo;
    }
    lo + Duration::milliseconds(rng.random_range(0..=span))
}

fn effective_end(shift: &Shift) -> DateTime<Utc> {
    match shift.clock_out {
        Some(out) => out.max(shift.clock_in + MIN_SHIFT),
        None => shift.clock_in + OPEN_SHIFT_PLACEHOLDER,
    }
}

fn synth_event<R: Rng + ?Sized>(
    rng: &mut R,
    shift: &Shift,
    site: &Site,
    event_type: GeofenceEventType,
    occurred_at: DateTime<Utc>,
    meters: f64,
) -> Option<GeofenceEvent> {
    let center = site.center()?;
    let position = offset(center, meters, rng.random_range(0.0..TAU));
    if !position.is_finite() {
        return None;
    }
    let c = classify(site, position);

    Some(GeofenceEvent {
        id: new_event_id(),
        business_id: shift.business_id.clone(),
        project_id: shift.project_id.clone(),
        employee_id: shift.employee_id.clone(),
        time_entry_id: Some(shift.id.clone()),
        event_type,
        occurred_at,
        lat: position.lat,
        lng: position.lng,
        distance_m: c.distance_m,
        inside: c.inside,
        source: EventSource::System,
    })
}

fn on_site_meters<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.random_range(ON_SITE_METERS.0..=ON_SITE_METERS.1)
}

fn exit_meters<R: Rng + ?Sized>(rng: &mut R, radius: f64) -> f64 {
    let raw = radius + rng.random_range(EXIT_OVERSHOOT_METERS.0..=EXIT_OVERSHOOT_METERS.1);
    raw.clamp(EXIT_CLAMP_METERS.0, EXIT_CLAMP_METERS.1)
}

/// Plausible event sequence for one shift, strictly increasing in time and
/// contained in `[clock_in, effective_end]`. Empty for cap 0 or a site
/// without coordinates.
pub fn synthesize_for_shift<R: Rng + ?Sized>(
    shift: &Shift,
    site: &Site,
    params: &SynthesisParams,
    rng: &mut R,
) -> Vec<GeofenceEvent> {
    let cap = params.cap.min(MAX_EVENTS_PER_SHIFT) as usize;
    if cap == 0 || !site.has_coordinates() {
        return Vec::new();
    }

    let start = shift.clock_in;
    let end = effective_end(shift);
    let mut events = Vec::with_capacity(cap);

    let enter_at = instant_between(rng, start, (start + ENTER_JITTER).min(end));
    let meters = on_site_meters(rng);
    if let Some(ev) = synth_event(rng, shift, site, GeofenceEventType::Enter, enter_at, meters) {
        events.push(ev);
    }

    let mut exit_at = None;
    if cap >= 2
        && let Some(out) = shift.clock_out
        && out - start > EXIT_MIN_SHIFT
        && rng.random_bool(params.exit_probability)
    {
        let dur_ms = (out - start).num_milliseconds() as f64;
        let lo = (start + Duration::milliseconds((dur_ms * EXIT_FRACTION.0) as i64)).max(enter_at + EXIT_AFTER_ENTER);
        let hi = (start + Duration::milliseconds((dur_ms * EXIT_FRACTION.1) as i64)).min(end - EXIT_BEFORE_END);

        if lo <= hi {
            let at = instant_between(rng, lo, hi);
            let meters = exit_meters(rng, site.effective_radius());
            if let Some(ev) = synth_event(rng, shift, site, GeofenceEventType::Exit, at, meters) {
                events.push(ev);
                exit_at = Some(at);
            }
        }
    }

    if cap >= 3
        && let Some(exit_at) = exit_at
        && rng.random_bool(params.reenter_probability)
    {
        let lo = exit_at + REENTER_MIN_GAP;
        let hi = (exit_at + REENTER_MAX_GAP).min(end);
        if lo <= hi {
            let at = instant_between(rng, lo, hi);
            let meters = on_site_meters(rng);
            if let Some(ev) = synth_event(rng, shift, site, GeofenceEventType::Enter, at, meters) {
                events.push(ev);
            }
        }
    }

    events.truncate(cap);
    events
}

/// Scan a business's recent shifts, synthesize events and (unless dry-run)
/// insert them in batches. A failing batch aborts the run; the error carries
/// the report of what was done up to that point.
pub fn run_backfill<R: Rng + ?Sized>(
    conn: &mut Connection,
    opts: &BackfillOptions,
    rng: &mut R,
    now: DateTime<Utc>,
) -> AppResult<BackfillReport> {
    opts.validate()?;

    let mut report = BackfillReport {
        business_id: opts.business_id.clone(),
        dry_run: opts.dry_run,
        ..Default::default()
    };

    let since = now - Duration::days(opts.lookback_days as i64);
    let shifts = load_shifts_since(conn, &opts.business_id, &since)?;

    let mut sites: HashMap<String, Site> = load_sites_by_business(conn, &opts.business_id)?
        .into_iter()
        .map(|s| (s.id.clone(), s))
        .collect();

    let mut pending: Vec<GeofenceEvent> = Vec::new();

    for shift in &shifts {
        report.scanned += 1;

        if opts.params.cap == 0 {
            report.skipped_cap_zero += 1;
            continue;
        }

        if !sites.contains_key(&shift.project_id)
            && let Some(site) = get_site(conn, &shift.project_id)?
        {
            sites.insert(site.id.clone(), site);
        }
        let Some(site) = sites.get(&shift.project_id).filter(|s| s.has_coordinates()) else {
            report.skipped_no_coords += 1;
            continue;
        };

        if !opts.overwrite && count_events_for_time_entry(conn, &shift.id)? > 0 {
            report.skipped_existing += 1;
            continue;
        }

        let events = synthesize_for_shift(shift, site, &opts.params, rng);
        report.generated += events.len();
        pending.extend(events);
    }

    tracing::info!(
        business = %opts.business_id,
        scanned = report.scanned,
        generated = report.generated,
        dry_run = opts.dry_run,
        "backfill scan complete"
    );

    if opts.dry_run {
        return Ok(report);
    }

    for batch in pending.chunks(opts.batch_size) {
        match insert_geofence_batch(conn, batch) {
            Ok(n) => {
                report.inserted += n;
                report.batches += 1;
                tracing::debug!(batch = report.batches, inserted = n, "backfill batch committed");
            }
            Err(e) => {
                tracing::error!(error = %e, inserted = report.inserted, "backfill batch failed");
                return Err(AppError::BackfillAborted {
                    report: Box::new(report),
                    reason: e.to_string(),
                });
            }
        }
    }

    ttlog(
        conn,
        "backfill",
        &opts.business_id,
        &format!(
            "scanned={} generated={} inserted={} batches={}",
            report.scanned, report.generated, report.inserted, report.batches
        ),
    )?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn site() -> Site {
        Site {
            id: "p1".into(),
            business_id: "b1".into(),
            name: "Yard".into(),
            lat: Some(39.0),
            lng: Some(-105.0),
            radius_m: Some(300.0),
            active: true,
        }
    }

    fn shift(out: Option<&str>) -> Shift {
        Shift {
            id: "s1".into(),
            business_id: "b1".into(),
            employee_id: "e1".into(),
            project_id: "p1".into(),
            clock_in: "2024-01-01T08:00:00Z".parse().unwrap(),
            clock_out: out.map(|s| s.parse().unwrap()),
            duration_seconds: None,
            clock_in_position: None,
            clock_out_position: None,
        }
    }

    #[test]
    fn exit_distance_is_clamped() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let m = exit_meters(&mut rng, 300.0);
            assert!((18.0..=50.0).contains(&m));
            let small = exit_meters(&mut rng, 2.0);
            assert!(small >= 18.0);
        }
    }

    #[test]
    fn open_shift_gets_only_an_enter() {
        let mut rng = StdRng::seed_from_u64(5);
        let params = SynthesisParams {
            cap: 3,
            exit_probability: 1.0,
            reenter_probability: 1.0,
        };
        let events = synthesize_for_shift(&shift(None), &site(), &params, &mut rng);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, GeofenceEventType::Enter);
    }

    #[test]
    fn one_minute_shift_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        let s = shift(Some("2024-01-01T08:00:30Z"));
        let events = synthesize_for_shift(&s, &site(), &SynthesisParams::default(), &mut rng);
        assert_eq!(events.len(), 1);
        let end = s.clock_in + Duration::minutes(1);
        assert!(events[0].occurred_at >= s.clock_in && events[0].occurred_at <= end);
    }

    #[test]
    fn invalid_cap_is_rejected() {
        let mut opts = BackfillOptions::new("b1");
        opts.params.cap = 4;
        assert_eq!(opts.validate().unwrap_err().code(), "VALIDATION_ERROR");
    }
}
