//! Fixture import: memberships, profiles, projects and shifts from JSON.
//!
//! Stands in for the external CRUD system so the pipeline can run locally.

use crate::db::log::ttlog;
use crate::db::members::{upsert_membership, upsert_profile};
use crate::db::shifts::upsert_shift;
use crate::db::sites::upsert_site;
use crate::errors::{AppError, AppResult};
use crate::models::{Membership, Profile, Shift, Site};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub memberships: Vec<Membership>,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub projects: Vec<Site>,
    #[serde(default)]
    pub shifts: Vec<Shift>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub memberships: usize,
    pub profiles: usize,
    pub projects: usize,
    pub shifts: usize,
}

impl Fixture {
    pub fn from_json(text: &str) -> AppResult<Self> {
        serde_json::from_str(text).map_err(|e| AppError::Validation {
            field: "fixture",
            reason: e.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Upsert the whole fixture in one transaction.
pub fn apply_fixture(conn: &mut Connection, fixture: &Fixture, origin: &str) -> AppResult<SeedSummary> {
    let tx = conn.transaction()?;

    for m in &fixture.memberships {
        upsert_membership(&tx, m)?;
    }
    for p in &fixture.profiles {
        upsert_profile(&tx, p)?;
    }
    for s in &fixture.projects {
        upsert_site(&tx, s)?;
    }
    for s in &fixture.shifts {
        upsert_shift(&tx, s)?;
    }

    let summary = SeedSummary {
        memberships: fixture.memberships.len(),
        profiles: fixture.profiles.len(),
        projects: fixture.projects.len(),
        shifts: fixture.shifts.len(),
    };

    ttlog(
        &tx,
        "seed",
        origin,
        &format!(
            "memberships={} profiles={} projects={} shifts={}",
            summary.memberships, summary.profiles, summary.projects, summary.shifts
        ),
    )?;
    tx.commit()?;

    tracing::info!(?summary, origin, "fixture applied");
    Ok(summary)
}
