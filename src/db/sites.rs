//! Project (site) records.

use crate::errors::AppResult;
use crate::models::Site;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

const SITE_COLUMNS: &str = "id, business_id, name, lat, lng, radius_m, active";

pub fn map_site(row: &Row) -> rusqlite::Result<Site> {
    Ok(Site {
        id: row.get("id")?,
        business_id: row.get("business_id")?,
        name: row.get("name")?,
        lat: row.get("lat")?,
        lng: row.get("lng")?,
        radius_m: row.get("radius_m")?,
        active: row.get::<_, i32>("active")? == 1,
    })
}

pub fn upsert_site(conn: &Connection, site: &Site) -> AppResult<()> {
    conn.execute(
        "INSERT INTO projects (id, business_id, name, lat, lng, radius_m, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
            business_id = excluded.business_id,
            name = excluded.name,
            lat = excluded.lat,
            lng = excluded.lng,
            radius_m = excluded.radius_m,
            active = excluded.active",
        params![
            site.id,
            site.business_id,
            site.name,
            site.lat,
            site.lng,
            site.radius_m,
            if site.active { 1 } else { 0 },
        ],
    )?;
    Ok(())
}

pub fn get_site(conn: &Connection, id: &str) -> AppResult<Option<Site>> {
    let mut stmt =
        conn.prepare_cached(&format!("SELECT {SITE_COLUMNS} FROM projects WHERE id = ?1"))?;
    Ok(stmt.query_row([id], map_site).optional()?)
}

/// Active sites for the given businesses (small "in-list" query).
pub fn load_active_sites_for(conn: &Connection, business_ids: &[String]) -> AppResult<Vec<Site>> {
    if business_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; business_ids.len()].join(",");
    let sql = format!(
        "SELECT {SITE_COLUMNS} FROM projects
         WHERE active = 1 AND business_id IN ({placeholders})
         ORDER BY id ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(business_ids.iter()), map_site)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn load_all_active_sites(conn: &Connection) -> AppResult<Vec<Site>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {SITE_COLUMNS} FROM projects WHERE active = 1 ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map([], map_site)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Every project of a business, active or not (reports need names of closed sites too).
pub fn load_sites_by_business(conn: &Connection, business_id: &str) -> AppResult<Vec<Site>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {SITE_COLUMNS} FROM projects WHERE business_id = ?1 ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map([business_id], map_site)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
