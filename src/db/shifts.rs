//! Time entry (shift) records.
//!
//! Clock-in/out mutations belong to the outer CRUD system; the pipeline only
//! reads shifts, and `upsert_shift` exists for fixture import.

use crate::errors::AppResult;
use crate::models::{Coordinate, Shift};
use crate::utils::time::{fmt_ts, ts_from_sql};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

const SHIFT_COLUMNS: &str = "id, business_id, employee_id, project_id, clock_in, clock_out, \
     duration_seconds, clock_in_lat, clock_in_lng, clock_out_lat, clock_out_lng";

pub fn map_shift(row: &Row) -> rusqlite::Result<Shift> {
    let clock_in = ts_from_sql(4, row.get("clock_in")?)?;
    let clock_out = match row.get::<_, Option<String>>("clock_out")? {
        Some(raw) => Some(ts_from_sql(5, raw)?),
        None => None,
    };

    Ok(Shift {
        id: row.get("id")?,
        business_id: row.get("business_id")?,
        employee_id: row.get("employee_id")?,
        project_id: row.get("project_id")?,
        clock_in,
        clock_out,
        duration_seconds: row.get("duration_seconds")?,
        clock_in_position: Coordinate::from_parts(
            row.get("clock_in_lat")?,
            row.get("clock_in_lng")?,
        ),
        clock_out_position: Coordinate::from_parts(
            row.get("clock_out_lat")?,
            row.get("clock_out_lng")?,
        ),
    })
}

fn collect(stmt: &mut rusqlite::Statement<'_>, args: Vec<Value>) -> AppResult<Vec<Shift>> {
    let rows = stmt.query_map(params_from_iter(args), map_shift)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn upsert_shift(conn: &Connection, s: &Shift) -> AppResult<()> {
    conn.execute(
        "INSERT INTO time_entries (id, business_id, employee_id, project_id, clock_in, clock_out,
                                   duration_seconds, clock_in_lat, clock_in_lng, clock_out_lat, clock_out_lng)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(id) DO UPDATE SET
            business_id = excluded.business_id,
            employee_id = excluded.employee_id,
            project_id = excluded.project_id,
            clock_in = excluded.clock_in,
            clock_out = excluded.clock_out,
            duration_seconds = excluded.duration_seconds,
            clock_in_lat = excluded.clock_in_lat,
            clock_in_lng = excluded.clock_in_lng,
            clock_out_lat = excluded.clock_out_lat,
            clock_out_lng = excluded.clock_out_lng",
        params![
            s.id,
            s.business_id,
            s.employee_id,
            s.project_id,
            fmt_ts(&s.clock_in),
            s.clock_out.as_ref().map(fmt_ts),
            s.duration_seconds,
            s.clock_in_position.map(|c| c.lat),
            s.clock_in_position.map(|c| c.lng),
            s.clock_out_position.map(|c| c.lat),
            s.clock_out_position.map(|c| c.lng),
        ],
    )?;
    Ok(())
}

pub fn get_shift(conn: &Connection, id: &str) -> AppResult<Option<Shift>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {SHIFT_COLUMNS} FROM time_entries WHERE id = ?1"
    ))?;
    Ok(stmt.query_row([id], map_shift).optional()?)
}

pub fn load_open_shifts_for_employee(conn: &Connection, employee_id: &str) -> AppResult<Vec<Shift>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {SHIFT_COLUMNS} FROM time_entries
         WHERE employee_id = ?1 AND clock_out IS NULL
         ORDER BY clock_in DESC"
    ))?;
    collect(&mut stmt, vec![Value::Text(employee_id.to_string())])
}

/// Filters shared by the report queries.
#[derive(Debug, Clone, Default)]
pub struct ShiftFilter {
    pub project_id: Option<String>,
    pub employee_id: Option<String>,
}

/// Shifts of a business whose `clock_in` falls in `[start, end)`.
pub fn load_shifts_in_range(
    conn: &Connection,
    business_id: &str,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
    filter: &ShiftFilter,
) -> AppResult<Vec<Shift>> {
    let mut sql = format!(
        "SELECT {SHIFT_COLUMNS} FROM time_entries
         WHERE business_id = ? AND clock_in >= ? AND clock_in < ?"
    );
    let mut args = vec![
        Value::Text(business_id.to_string()),
        Value::Text(fmt_ts(start)),
        Value::Text(fmt_ts(end)),
    ];

    if let Some(p) = &filter.project_id {
        sql.push_str(" AND project_id = ?");
        args.push(Value::Text(p.clone()));
    }
    if let Some(e) = &filter.employee_id {
        sql.push_str(" AND employee_id = ?");
        args.push(Value::Text(e.clone()));
    }
    sql.push_str(" ORDER BY clock_in ASC, id ASC");

    let mut stmt = conn.prepare(&sql)?;
    collect(&mut stmt, args)
}

/// Shifts of a business clocked in since `since`, oldest first (backfill scan).
pub fn load_shifts_since(
    conn: &Connection,
    business_id: &str,
    since: &DateTime<Utc>,
) -> AppResult<Vec<Shift>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {SHIFT_COLUMNS} FROM time_entries
         WHERE business_id = ?1 AND clock_in >= ?2
         ORDER BY clock_in ASC, id ASC"
    ))?;
    collect(
        &mut stmt,
        vec![
            Value::Text(business_id.to_string()),
            Value::Text(fmt_ts(since)),
        ],
    )
}
