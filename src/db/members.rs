//! Memberships and profiles, read for authorization and report labels.

use crate::errors::{AppError, AppResult};
use crate::models::{MemberRole, Membership, Profile};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashMap;

fn map_membership(row: &Row) -> rusqlite::Result<Membership> {
    let raw: String = row.get("role")?;
    let role = MemberRole::from_db_str(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(AppError::validation("role", raw.clone())),
        )
    })?;

    Ok(Membership {
        business_id: row.get("business_id")?,
        user_id: row.get("user_id")?,
        role,
        active: row.get::<_, i32>("active")? == 1,
    })
}

pub fn upsert_membership(conn: &Connection, m: &Membership) -> AppResult<()> {
    conn.execute(
        "INSERT INTO memberships (business_id, user_id, role, active)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(business_id, user_id) DO UPDATE SET
            role = excluded.role,
            active = excluded.active",
        params![
            m.business_id,
            m.user_id,
            m.role.to_db_str(),
            if m.active { 1 } else { 0 }
        ],
    )?;
    Ok(())
}

pub fn get_membership(
    conn: &Connection,
    business_id: &str,
    user_id: &str,
) -> AppResult<Option<Membership>> {
    let mut stmt = conn.prepare_cached(
        "SELECT business_id, user_id, role, active FROM memberships
         WHERE business_id = ?1 AND user_id = ?2",
    )?;
    Ok(stmt
        .query_row([business_id, user_id], map_membership)
        .optional()?)
}

/// Businesses where the user holds an active membership.
pub fn active_business_ids(conn: &Connection, user_id: &str) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT business_id FROM memberships
         WHERE user_id = ?1 AND active = 1
         ORDER BY business_id ASC",
    )?;
    let rows = stmt.query_map([user_id], |row| row.get::<_, String>(0))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn upsert_profile(conn: &Connection, p: &Profile) -> AppResult<()> {
    conn.execute(
        "INSERT INTO profiles (user_id, display_name) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET display_name = excluded.display_name",
        params![p.user_id, p.display_name],
    )?;
    Ok(())
}

/// Display names for the given users; unknown users are simply absent.
pub fn display_names(conn: &Connection, user_ids: &[String]) -> AppResult<HashMap<String, String>> {
    let mut out = HashMap::new();
    let mut stmt = conn.prepare_cached("SELECT display_name FROM profiles WHERE user_id = ?1")?;

    for id in user_ids {
        if let Some(name) = stmt
            .query_row([id], |row| row.get::<_, String>(0))
            .optional()?
        {
            out.insert(id.clone(), name);
        }
    }
    Ok(out)
}
