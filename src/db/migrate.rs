//! Schema migrations.
//!
//! Every migration is recorded in the `log` table as
//! `operation = 'migration_applied', target = <version>` and is skipped once
//! recorded, so the runner is safe to call on every open.

use rusqlite::{Connection, OptionalExtension, Result};
use tracing::info;

struct Migration {
    version: &'static str,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "20260105_0001_core_tables",
        description: "memberships, profiles, projects and time entries",
        sql: r#"
        CREATE TABLE IF NOT EXISTS memberships (
            business_id TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'worker' CHECK(role IN ('worker','manager','owner')),
            active      INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (business_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS profiles (
            user_id      TEXT PRIMARY KEY,
            display_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS projects (
            id          TEXT PRIMARY KEY,
            business_id TEXT NOT NULL,
            name        TEXT NOT NULL DEFAULT '',
            lat         REAL,
            lng         REAL,
            radius_m    REAL,
            active      INTEGER NOT NULL DEFAULT 1
        );
        CREATE INDEX IF NOT EXISTS idx_projects_business ON projects(business_id);

        CREATE TABLE IF NOT EXISTS time_entries (
            id               TEXT PRIMARY KEY,
            business_id      TEXT NOT NULL,
            employee_id      TEXT NOT NULL,
            project_id       TEXT NOT NULL,
            clock_in         TEXT NOT NULL,
            clock_out        TEXT,
            duration_seconds REAL,
            clock_in_lat     REAL,
            clock_in_lng     REAL,
            clock_out_lat    REAL,
            clock_out_lng    REAL
        );
        CREATE INDEX IF NOT EXISTS idx_time_entries_business_in ON time_entries(business_id, clock_in);
        CREATE INDEX IF NOT EXISTS idx_time_entries_employee_open ON time_entries(employee_id, clock_out);
        "#,
    },
    Migration {
        version: "20260105_0002_geofence_events",
        description: "append-only geofence enter/exit events",
        sql: r#"
        CREATE TABLE IF NOT EXISTS geofence_events (
            id            TEXT PRIMARY KEY,
            business_id   TEXT NOT NULL,
            project_id    TEXT NOT NULL,
            employee_id   TEXT NOT NULL,
            time_entry_id TEXT,
            event_type    TEXT NOT NULL CHECK(event_type IN ('enter','exit')),
            occurred_at   TEXT NOT NULL,
            lat           REAL NOT NULL,
            lng           REAL NOT NULL,
            distance_m    INTEGER CHECK(distance_m IS NULL OR distance_m >= 0),
            inside        INTEGER,
            source        TEXT NOT NULL DEFAULT 'mobile' CHECK(source IN ('mobile','web','system')),
            created_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_geofence_dedup
            ON geofence_events(employee_id, project_id, business_id, event_type, occurred_at);
        CREATE INDEX IF NOT EXISTS idx_geofence_time_entry ON geofence_events(time_entry_id);
        CREATE INDEX IF NOT EXISTS idx_geofence_business_at ON geofence_events(business_id, occurred_at);
        "#,
    },
    Migration {
        version: "20260112_0003_time_entry_events",
        description: "clock-in/out audit stream",
        sql: r#"
        CREATE TABLE IF NOT EXISTS time_entry_events (
            id            TEXT PRIMARY KEY,
            time_entry_id TEXT NOT NULL,
            business_id   TEXT NOT NULL,
            project_id    TEXT NOT NULL,
            employee_id   TEXT NOT NULL,
            event_type    TEXT NOT NULL
                CHECK(event_type IN ('clock_in','clock_out','manager_clock_out','edit')),
            occurred_at   TEXT NOT NULL,
            lat           REAL,
            lng           REAL,
            distance_m    INTEGER CHECK(distance_m IS NULL OR distance_m >= 0),
            inside        INTEGER,
            source        TEXT NOT NULL DEFAULT 'mobile' CHECK(source IN ('mobile','web','system')),
            created_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tee_time_entry ON time_entry_events(time_entry_id, occurred_at);
        CREATE INDEX IF NOT EXISTS idx_tee_dedup
            ON time_entry_events(employee_id, project_id, business_id, event_type, occurred_at);
        "#,
    },
];

/// Ensure that the `log` table exists.
fn ensure_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn is_applied(conn: &Connection, version: &str) -> Result<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn apply(conn: &Connection, m: &Migration) -> Result<()> {
    conn.execute_batch(&format!("BEGIN;\n{}\nCOMMIT;", m.sql))
        .inspect_err(|_| {
            let _ = conn.execute_batch("ROLLBACK;");
        })?;

    conn.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (datetime('now'), 'migration_applied', ?1, ?2)",
        [m.version, m.description],
    )?;

    info!(version = m.version, "migration applied: {}", m.description);
    Ok(())
}

/// Names of migrations not yet applied.
pub fn pending_migrations(conn: &Connection) -> Result<Vec<&'static str>> {
    ensure_log_table(conn)?;
    let mut out = Vec::new();
    for m in MIGRATIONS {
        if !is_applied(conn, m.version)? {
            out.push(m.version);
        }
    }
    Ok(out)
}

/// Public entry point: run all pending migrations.
///
/// Invoked by `DbPool::open_migrated` and `DbPool::in_memory`.
pub fn run_pending_migrations(conn: &Connection) -> Result<()> {
    ensure_log_table(conn)?;

    for m in MIGRATIONS {
        if !is_applied(conn, m.version)? {
            apply(conn, m)?;
        }
    }

    Ok(())
}
