use crate::core::report::{AttendanceRow, AttendanceSource};
use crate::utils::time::fmt_ts;
use serde::Serialize;

/// Flat attendance row for CSV/JSON export. Unknown presence is an empty
/// cell, never `false`.
#[derive(Serialize, Clone, Debug)]
pub struct AttendanceExport {
    pub shift_id: String,
    pub employee_id: String,
    pub employee: String,
    pub project_id: String,
    pub project: String,
    pub clock_in: String,
    pub clock_out: String,
    pub hours: f64,
    pub clock_in_inside: Option<bool>,
    pub clock_in_distance_m: Option<u32>,
    pub clock_out_inside: Option<bool>,
    pub clock_out_distance_m: Option<u32>,
    pub source: &'static str,
}

impl From<&AttendanceRow> for AttendanceExport {
    fn from(r: &AttendanceRow) -> Self {
        Self {
            shift_id: r.shift_id.clone(),
            employee_id: r.employee_id.clone(),
            employee: r.employee_name.clone(),
            project_id: r.project_id.clone(),
            project: r.project_name.clone(),
            clock_in: fmt_ts(&r.clock_in),
            clock_out: r.clock_out.as_ref().map(fmt_ts).unwrap_or_default(),
            hours: r.hours,
            clock_in_inside: r.clock_in_inside,
            clock_in_distance_m: r.clock_in_distance_m,
            clock_out_inside: r.clock_out_inside,
            clock_out_distance_m: r.clock_out_distance_m,
            source: match r.source {
                AttendanceSource::AuditStream => "audit_stream",
                AttendanceSource::ShiftRows => "shift_rows",
            },
        }
    }
}
