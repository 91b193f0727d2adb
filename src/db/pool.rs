//! SQLite connection wrapper.

use crate::db::migrate::run_pending_migrations;
use crate::errors::{AppError, AppResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// How long a writer waits on SQLite's lock before giving up with SQLITE_BUSY.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DbPool {
    pub conn: Connection,
}

impl DbPool {
    pub fn new(path: &str) -> AppResult<Self> {
        let conn = Connection::open(Path::new(path))?;
        Self::configure(conn)
    }

    /// Open and bring the schema up to date.
    pub fn open_migrated(path: &str) -> AppResult<Self> {
        let pool = Self::new(path)?;
        run_pending_migrations(&pool.conn)?;
        Ok(pool)
    }

    pub fn in_memory() -> AppResult<Self> {
        let pool = Self::configure(Connection::open_in_memory()?)?;
        run_pending_migrations(&pool.conn)?;
        Ok(pool)
    }

    fn configure(conn: Connection) -> AppResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn })
    }
}

/// Lock a shared pool; a poisoned lock surfaces as a storage error.
pub fn lock_pool(pool: &Mutex<DbPool>) -> AppResult<MutexGuard<'_, DbPool>> {
    pool.lock()
        .map_err(|_| AppError::Storage("database lock poisoned".to_string()))
}
