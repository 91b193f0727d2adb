//! Manager-facing hours and geofence compliance reports.

pub mod aggregate;
pub mod range;

pub use aggregate::{
    AttendanceRow, AttendanceSource, HoursBucket, ProjectCompliance, Report, ReportInputs, aggregate,
};
pub use range::{DateRange, RangePreset, current_week, resolve_range};

use crate::core::auth::authorize_report_read;
use crate::db::events::{count_exits_by_project, load_time_entry_events_for};
use crate::db::members::display_names;
use crate::db::shifts::{ShiftFilter, load_shifts_in_range};
use crate::db::sites::load_sites_by_business;
use crate::errors::{AppError, AppResult};
use crate::models::Actor;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub business_id: String,
    #[serde(default)]
    pub range: RangePreset,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
}

/// Load everything for `query` and aggregate it. Any read failure fails the
/// report, except the audit stream, which falls back to shift rows.
pub fn build_report(
    conn: &Connection,
    actor: &Actor,
    query: &ReportQuery,
    now: DateTime<Utc>,
) -> AppResult<Report> {
    if query.business_id.trim().is_empty() {
        return Err(AppError::validation("business_id", "is required"));
    }
    authorize_report_read(conn, actor, &query.business_id)?;

    let range = resolve_range(query.range, query.start.as_deref(), query.end.as_deref(), now);
    let week = current_week(now);
    let filter = ShiftFilter {
        project_id: query.project_id.clone(),
        employee_id: query.employee_id.clone(),
    };

    let shifts = load_shifts_in_range(conn, &query.business_id, &range.start, &range.end, &filter)?;
    let week_shifts = load_shifts_in_range(conn, &query.business_id, &week.start, &week.end, &filter)?;
    let sites = load_sites_by_business(conn, &query.business_id)?;

    let mut employees: Vec<String> = shifts.iter().map(|s| s.employee_id.clone()).collect();
    employees.sort();
    employees.dedup();
    let names = display_names(conn, &employees)?;

    let shift_ids: Vec<String> = shifts.iter().map(|s| s.id.clone()).collect();
    let audit = match load_time_entry_events_for(conn, &shift_ids) {
        Ok(events) => Some(events),
        Err(e) => {
            tracing::warn!(error = %e, "audit stream unavailable, deriving attendance from shift rows");
            None
        }
    };

    let exits_by_project = count_exits_by_project(conn, &query.business_id, &range.start, &range.end, &filter)?;

    let inputs = ReportInputs {
        business_id: query.business_id.clone(),
        project_filter: query.project_id.clone(),
        shifts,
        week_shifts,
        sites,
        names,
        audit,
        exits_by_project,
    };

    let report = aggregate(&inputs, range, now);
    tracing::info!(
        business = %report.business_id,
        shifts = report.attendance.len(),
        total_hours = report.total_hours,
        "report built"
    );
    Ok(report)
}
