//! Pure aggregation over already-loaded rows.

use super::range::DateRange;
use crate::core::geo::classify;
use crate::models::{Coordinate, Shift, ShiftEventType, Site, TimeEntryEvent};
use crate::utils::time::{hours, round2};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub const TOP_N: usize = 5;

/// Which data a row's clock-in/out classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceSource {
    AuditStream,
    ShiftRows,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoursBucket {
    pub id: String,
    pub name: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRow {
    pub shift_id: String,
    pub employee_id: String,
    pub employee_name: String,
    pub project_id: String,
    pub project_name: String,
    pub clock_in: DateTime<Utc>,
    pub clock_out: Option<DateTime<Utc>>,
    pub hours: f64,
    pub clock_in_inside: Option<bool>,
    pub clock_in_distance_m: Option<u32>,
    pub clock_out_inside: Option<bool>,
    pub clock_out_distance_m: Option<u32>,
    pub source: AttendanceSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectCompliance {
    pub project_id: String,
    pub project_name: String,
    pub punches_inside: u32,
    pub punches_outside: u32,
    pub punches_total: u32,
    /// `None` when there are no classified punches.
    pub percent_inside: Option<u32>,
    pub exit_events: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub business_id: String,
    pub range: DateRange,
    pub generated_at: DateTime<Utc>,
    pub total_hours: f64,
    pub week_hours: f64,
    pub active_sites: usize,
    pub top_projects: Vec<HoursBucket>,
    pub top_workers: Vec<HoursBucket>,
    pub attendance: Vec<AttendanceRow>,
    pub compliance: Vec<ProjectCompliance>,
    /// `ShiftRows` when the audit stream could not be read at all.
    pub attendance_source: AttendanceSource,
}

/// Everything the aggregator needs, loaded up front.
#[derive(Debug, Clone, Default)]
pub struct ReportInputs {
    pub business_id: String,
    pub project_filter: Option<String>,
    pub shifts: Vec<Shift>,
    pub week_shifts: Vec<Shift>,
    pub sites: Vec<Site>,
    pub names: HashMap<String, String>,
    /// `None`: audit stream unavailable.
    pub audit: Option<HashMap<String, Vec<TimeEntryEvent>>>,
    pub exits_by_project: HashMap<String, u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Punch {
    inside: Option<bool>,
    distance_m: Option<u32>,
}

/// Classify a recorded position against the site's current geometry.
/// Unknown or null-island coordinates stay unclassified.
fn punch_from_position(site: Option<&Site>, pos: Option<Coordinate>) -> Punch {
    match (site, pos) {
        (Some(site), Some(p)) if p.is_finite() && !p.is_null_island() => {
            let c = classify(site, p);
            Punch {
                inside: c.inside,
                distance_m: c.distance_m,
            }
        }
        _ => Punch::default(),
    }
}

fn punch_from_event(ev: &TimeEntryEvent) -> Punch {
    if ev.position().is_some_and(|p| p.is_null_island()) {
        return Punch::default();
    }
    Punch {
        inside: ev.inside,
        distance_m: ev.distance_m,
    }
}

fn worked_hours(shift: &Shift, now: DateTime<Utc>) -> f64 {
    hours(shift.worked_seconds(now))
}

fn top_buckets(totals: HashMap<String, f64>, label: impl Fn(&str) -> String) -> Vec<HoursBucket> {
    let mut buckets: Vec<HoursBucket> = totals
        .into_iter()
        .map(|(id, h)| HoursBucket {
            name: label(&id),
            id,
            hours: round2(h),
        })
        .collect();

    buckets.sort_by(|a, b| {
        b.hours
            .total_cmp(&a.hours)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    buckets.truncate(TOP_N);
    buckets
}

fn attendance_row(
    shift: &Shift,
    site: Option<&Site>,
    events: Option<&Vec<TimeEntryEvent>>,
    names: &HashMap<String, String>,
    now: DateTime<Utc>,
) -> AttendanceRow {
    let events = events.map(Vec::as_slice).unwrap_or_default();

    let audit_in = events.iter().find(|e| e.event_type == ShiftEventType::ClockIn);
    let audit_out = events.iter().rev().find(|e| e.event_type.closes_shift());

    let (clock_in, in_punch) = match audit_in {
        Some(ev) => (ev.occurred_at, punch_from_event(ev)),
        None => (shift.clock_in, punch_from_position(site, shift.clock_in_position)),
    };
    let (clock_out, out_punch) = match audit_out {
        Some(ev) => (Some(ev.occurred_at), punch_from_event(ev)),
        None => (shift.clock_out, punch_from_position(site, shift.clock_out_position)),
    };

    let source = if audit_in.is_some() || audit_out.is_some() {
        AttendanceSource::AuditStream
    } else {
        AttendanceSource::ShiftRows
    };

    AttendanceRow {
        shift_id: shift.id.clone(),
        employee_id: shift.employee_id.clone(),
        employee_name: names
            .get(&shift.employee_id)
            .cloned()
            .unwrap_or_else(|| shift.employee_id.clone()),
        project_id: shift.project_id.clone(),
        project_name: site
            .map(|s| s.display_name().to_string())
            .unwrap_or_else(|| shift.project_id.clone()),
        clock_in,
        clock_out,
        hours: round2(worked_hours(shift, now)),
        clock_in_inside: in_punch.inside,
        clock_in_distance_m: in_punch.distance_m,
        clock_out_inside: out_punch.inside,
        clock_out_distance_m: out_punch.distance_m,
        source,
    }
}

fn compliance(
    rows: &[AttendanceRow],
    site_name: impl Fn(&str) -> String,
    exits: &HashMap<String, u32>,
    project_filter: Option<&str>,
) -> Vec<ProjectCompliance> {
    let mut by_project: BTreeMap<String, (u32, u32)> = BTreeMap::new();

    for row in rows {
        let entry = by_project.entry(row.project_id.clone()).or_default();
        for inside in [row.clock_in_inside, row.clock_out_inside].into_iter().flatten() {
            entry.1 += 1;
            if inside {
                entry.0 += 1;
            }
        }
    }
    for project in exits.keys() {
        if project_filter.is_none_or(|f| f == project.as_str()) {
            by_project.entry(project.clone()).or_default();
        }
    }

    let mut out: Vec<ProjectCompliance> = by_project
        .into_iter()
        .map(|(project_id, (inside, total))| ProjectCompliance {
            project_name: site_name(&project_id),
            punches_inside: inside,
            punches_outside: total - inside,
            punches_total: total,
            percent_inside: (total > 0).then(|| ((inside as f64 / total as f64) * 100.0).round() as u32),
            exit_events: exits.get(&project_id).copied().unwrap_or(0),
            project_id,
        })
        .collect();

    out.sort_by(|a, b| a.project_name.cmp(&b.project_name).then_with(|| a.project_id.cmp(&b.project_id)));
    out
}

pub fn aggregate(inputs: &ReportInputs, range: DateRange, now: DateTime<Utc>) -> Report {
    let sites: HashMap<&str, &Site> = inputs.sites.iter().map(|s| (s.id.as_str(), s)).collect();
    let site_name = |id: &str| {
        sites
            .get(id)
            .map(|s| s.display_name().to_string())
            .unwrap_or_else(|| id.to_string())
    };
    let worker_name = |id: &str| inputs.names.get(id).cloned().unwrap_or_else(|| id.to_string());

    let mut total_seconds = 0.0;
    let mut by_project: HashMap<String, f64> = HashMap::new();
    let mut by_worker: HashMap<String, f64> = HashMap::new();
    let mut attendance = Vec::with_capacity(inputs.shifts.len());

    for shift in &inputs.shifts {
        let h = worked_hours(shift, now);
        total_seconds += shift.worked_seconds(now);
        *by_project.entry(shift.project_id.clone()).or_default() += h;
        *by_worker.entry(shift.employee_id.clone()).or_default() += h;

        let events = inputs.audit.as_ref().and_then(|a| a.get(&shift.id));
        attendance.push(attendance_row(
            shift,
            sites.get(shift.project_id.as_str()).copied(),
            events,
            &inputs.names,
            now,
        ));
    }

    let week_seconds: f64 = inputs.week_shifts.iter().map(|s| s.worked_seconds(now)).sum();

    let active_sites = inputs
        .sites
        .iter()
        .filter(|s| s.active)
        .filter(|s| inputs.project_filter.as_deref().is_none_or(|p| p == s.id.as_str()))
        .count();

    let compliance = compliance(
        &attendance,
        site_name,
        &inputs.exits_by_project,
        inputs.project_filter.as_deref(),
    );

    Report {
        business_id: inputs.business_id.clone(),
        range,
        generated_at: now,
        total_hours: round2(hours(total_seconds)),
        week_hours: round2(hours(week_seconds)),
        active_sites,
        top_projects: top_buckets(by_project, site_name),
        top_workers: top_buckets(by_worker, worker_name),
        attendance,
        compliance,
        attendance_source: if inputs.audit.is_some() {
            AttendanceSource::AuditStream
        } else {
            AttendanceSource::ShiftRows
        },
    }
}
