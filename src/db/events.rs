//! Geofence and time-entry event streams.
//!
//! Both tables are append-only: this module inserts and reads, never updates
//! or deletes.

use crate::db::shifts::ShiftFilter;
use crate::errors::{AppError, AppResult};
use crate::models::{EventSource, GeofenceEvent, GeofenceEventType, ShiftEventType, TimeEntryEvent};
use crate::utils::time::{fmt_ts, ts_from_sql};
use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params, params_from_iter};
use std::collections::HashMap;

const GEOFENCE_COLUMNS: &str = "id, business_id, project_id, employee_id, time_entry_id, \
     event_type, occurred_at, lat, lng, distance_m, inside, source";

const TIME_ENTRY_EVENT_COLUMNS: &str = "id, time_entry_id, business_id, project_id, employee_id, \
     event_type, occurred_at, lat, lng, distance_m, inside, source";

/// Result of an idempotent insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome<T> {
    Inserted(T),
    /// A same-type event inside the dedup window already existed; it is returned unchanged.
    Duplicate(T),
}

impl<T> InsertOutcome<T> {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, InsertOutcome::Duplicate(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            InsertOutcome::Inserted(t) | InsertOutcome::Duplicate(t) => t,
        }
    }
}

fn conversion_error(idx: usize, what: &str, raw: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(AppError::validation("event", format!("invalid {what}: {raw}"))),
    )
}

fn read_source(row: &Row, idx: usize) -> rusqlite::Result<EventSource> {
    let raw: String = row.get(idx)?;
    EventSource::from_db_str(&raw).ok_or_else(|| conversion_error(idx, "source", raw))
}

fn read_inside(row: &Row, idx: usize) -> rusqlite::Result<Option<bool>> {
    Ok(row.get::<_, Option<i32>>(idx)?.map(|v| v == 1))
}

pub fn map_geofence_row(row: &Row) -> rusqlite::Result<GeofenceEvent> {
    let kind: String = row.get(5)?;
    let event_type =
        GeofenceEventType::from_db_str(&kind).ok_or_else(|| conversion_error(5, "event_type", kind))?;

    Ok(GeofenceEvent {
        id: row.get(0)?,
        business_id: row.get(1)?,
        project_id: row.get(2)?,
        employee_id: row.get(3)?,
        time_entry_id: row.get(4)?,
        event_type,
        occurred_at: ts_from_sql(6, row.get(6)?)?,
        lat: row.get(7)?,
        lng: row.get(8)?,
        distance_m: row.get(9)?,
        inside: read_inside(row, 10)?,
        source: read_source(row, 11)?,
    })
}

pub fn map_time_entry_event_row(row: &Row) -> rusqlite::Result<TimeEntryEvent> {
    let kind: String = row.get(5)?;
    let event_type =
        ShiftEventType::from_db_str(&kind).ok_or_else(|| conversion_error(5, "event_type", kind))?;

    Ok(TimeEntryEvent {
        id: row.get(0)?,
        time_entry_id: row.get(1)?,
        business_id: row.get(2)?,
        project_id: row.get(3)?,
        employee_id: row.get(4)?,
        event_type,
        occurred_at: ts_from_sql(6, row.get(6)?)?,
        lat: row.get(7)?,
        lng: row.get(8)?,
        distance_m: row.get(9)?,
        inside: read_inside(row, 10)?,
        source: read_source(row, 11)?,
    })
}

pub fn insert_geofence_event(conn: &Connection, ev: &GeofenceEvent) -> AppResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO geofence_events (id, business_id, project_id, employee_id, time_entry_id,
                                      event_type, occurred_at, lat, lng, distance_m, inside, source, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )?;
    stmt.execute(params![
        ev.id,
        ev.business_id,
        ev.project_id,
        ev.employee_id,
        ev.time_entry_id,
        ev.event_type.to_db_str(),
        fmt_ts(&ev.occurred_at),
        ev.lat,
        ev.lng,
        ev.distance_m,
        ev.inside.map(|b| if b { 1 } else { 0 }),
        ev.source.to_db_str(),
        fmt_ts(&Utc::now()),
    ])?;
    Ok(())
}

pub fn insert_time_entry_event(conn: &Connection, ev: &TimeEntryEvent) -> AppResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO time_entry_events (id, time_entry_id, business_id, project_id, employee_id,
                                        event_type, occurred_at, lat, lng, distance_m, inside, source, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )?;
    stmt.execute(params![
        ev.id,
        ev.time_entry_id,
        ev.business_id,
        ev.project_id,
        ev.employee_id,
        ev.event_type.to_db_str(),
        fmt_ts(&ev.occurred_at),
        ev.lat,
        ev.lng,
        ev.distance_m,
        ev.inside.map(|b| if b { 1 } else { 0 }),
        ev.source.to_db_str(),
        fmt_ts(&Utc::now()),
    ])?;
    Ok(())
}

fn within_window(a: &DateTime<Utc>, b: &DateTime<Utc>, window: Duration) -> bool {
    (*a - *b).abs() <= window
}

/// Insert unless the latest same-type event for the same
/// (employee, project, business) lies within `window` of this one.
///
/// The lookup and the insert share one `BEGIN IMMEDIATE` transaction: the
/// write lock is taken before the read, so concurrent submissions serialise
/// and only one of them can pass the check.
pub fn insert_geofence_event_dedup(
    conn: &mut Connection,
    ev: &GeofenceEvent,
    window: Duration,
) -> AppResult<InsertOutcome<GeofenceEvent>> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let latest = {
        let mut stmt = tx.prepare_cached(&format!(
            "SELECT {GEOFENCE_COLUMNS} FROM geofence_events
             WHERE employee_id = ?1 AND project_id = ?2 AND business_id = ?3 AND event_type = ?4
             ORDER BY occurred_at DESC
             LIMIT 1"
        ))?;
        stmt.query_row(
            params![
                ev.employee_id,
                ev.project_id,
                ev.business_id,
                ev.event_type.to_db_str()
            ],
            map_geofence_row,
        )
        .optional()?
    };

    if let Some(prev) = latest
        && within_window(&ev.occurred_at, &prev.occurred_at, window)
    {
        tx.commit()?;
        return Ok(InsertOutcome::Duplicate(prev));
    }

    insert_geofence_event(&tx, ev)?;
    tx.commit()?;
    Ok(InsertOutcome::Inserted(ev.clone()))
}

/// Same contract as [`insert_geofence_event_dedup`], for the audit stream.
pub fn insert_time_entry_event_dedup(
    conn: &mut Connection,
    ev: &TimeEntryEvent,
    window: Duration,
) -> AppResult<InsertOutcome<TimeEntryEvent>> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let latest = {
        let mut stmt = tx.prepare_cached(&format!(
            "SELECT {TIME_ENTRY_EVENT_COLUMNS} FROM time_entry_events
             WHERE employee_id = ?1 AND project_id = ?2 AND business_id = ?3 AND event_type = ?4
             ORDER BY occurred_at DESC
             LIMIT 1"
        ))?;
        stmt.query_row(
            params![
                ev.employee_id,
                ev.project_id,
                ev.business_id,
                ev.event_type.to_db_str()
            ],
            map_time_entry_event_row,
        )
        .optional()?
    };

    if let Some(prev) = latest
        && within_window(&ev.occurred_at, &prev.occurred_at, window)
    {
        tx.commit()?;
        return Ok(InsertOutcome::Duplicate(prev));
    }

    insert_time_entry_event(&tx, ev)?;
    tx.commit()?;
    Ok(InsertOutcome::Inserted(ev.clone()))
}

/// Insert a batch atomically: either every event lands or none does.
pub fn insert_geofence_batch(conn: &mut Connection, events: &[GeofenceEvent]) -> AppResult<usize> {
    let tx = conn.transaction()?;
    for ev in events {
        insert_geofence_event(&tx, ev)?;
    }
    tx.commit()?;
    Ok(events.len())
}

pub fn count_events_for_time_entry(conn: &Connection, time_entry_id: &str) -> AppResult<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM geofence_events WHERE time_entry_id = ?1",
        [time_entry_id],
        |row| row.get(0),
    )?;
    Ok(n)
}

pub fn load_geofence_events_for_time_entry(
    conn: &Connection,
    time_entry_id: &str,
) -> AppResult<Vec<GeofenceEvent>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {GEOFENCE_COLUMNS} FROM geofence_events
         WHERE time_entry_id = ?1
         ORDER BY occurred_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map([time_entry_id], map_geofence_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Exit events per project for a business in `[start, end)`, narrowed by the
/// report's project and employee filters.
pub fn count_exits_by_project(
    conn: &Connection,
    business_id: &str,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
    filter: &ShiftFilter,
) -> AppResult<HashMap<String, u32>> {
    let mut sql = String::from(
        "SELECT project_id, COUNT(*) FROM geofence_events
         WHERE business_id = ? AND event_type = 'exit'
           AND occurred_at >= ? AND occurred_at < ?",
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
    sql.push_str(" GROUP BY project_id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
    })?;

    let mut out = HashMap::new();
    for r in rows {
        let (project, n) = r?;
        out.insert(project, n);
    }
    Ok(out)
}

/// Audit-stream events for a set of shifts, grouped by shift id, oldest first.
///
/// Errors propagate unchanged so the caller can tell "stream unavailable"
/// apart from "no events".
pub fn load_time_entry_events_for(
    conn: &Connection,
    time_entry_ids: &[String],
) -> AppResult<HashMap<String, Vec<TimeEntryEvent>>> {
    let mut out: HashMap<String, Vec<TimeEntryEvent>> = HashMap::new();

    // SQLite caps bound parameters; chunk the in-list.
    for chunk in time_entry_ids.chunks(500) {
        let placeholders = vec!["?"; chunk.len()].join(",");
        let sql = format!(
            "SELECT {TIME_ENTRY_EVENT_COLUMNS} FROM time_entry_events
             WHERE time_entry_id IN ({placeholders})
             ORDER BY occurred_at ASC, id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), map_time_entry_event_row)?;
        for r in rows {
            let ev = r?;
            out.entry(ev.time_entry_id.clone()).or_default().push(ev);
        }
    }

    Ok(out)
}
