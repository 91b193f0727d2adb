#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use chrono::{DateTime, Duration, TimeZone, Utc};
use crewclock::core::geo::offset;
use crewclock::core::seed::{Fixture, apply_fixture};
use crewclock::db::DbPool;
use crewclock::models::{Coordinate, MemberRole, Membership, Profile, Shift, Site};
use std::env;
use std::fs;
use std::path::PathBuf;

pub const BUSINESS: &str = "biz-north";
pub const OTHER_BUSINESS: &str = "biz-south";
pub const PROJECT: &str = "proj-harbor";
pub const WORKER: &str = "u-worker";
pub const MANAGER: &str = "u-manager";
pub const OUTSIDER: &str = "u-outsider";

pub fn center() -> Coordinate {
    Coordinate::new(45.0, 9.0)
}

/// A point `meters` north of the harbor site center.
pub fn north_of_center(meters: f64) -> Coordinate {
    offset(center(), meters, 0.0)
}

pub fn cc() -> Command {
    cargo_bin_cmd!("crewclock")
}

/// Create a unique test DB path inside the system temp dir and remove any existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_crewclock.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    fs::remove_file(&db_path).ok();
    db_path
}

/// Create a temporary output file path inside tempdir and ensure it's removed
pub fn temp_out(name: &str, ext: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_out.{}", name, ext));
    let p = path.to_string_lossy().to_string();
    fs::remove_file(&p).ok();
    p
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn harbor_site() -> Site {
    Site {
        id: PROJECT.to_string(),
        business_id: BUSINESS.to_string(),
        name: "Harbor Wall".to_string(),
        lat: Some(45.0),
        lng: Some(9.0),
        radius_m: Some(300.0),
        active: true,
    }
}

pub fn shift(id: &str, employee: &str, clock_in: DateTime<Utc>, clock_out: Option<DateTime<Utc>>) -> Shift {
    Shift {
        id: id.to_string(),
        business_id: BUSINESS.to_string(),
        employee_id: employee.to_string(),
        project_id: PROJECT.to_string(),
        clock_in,
        clock_out,
        duration_seconds: None,
        clock_in_position: None,
        clock_out_position: None,
    }
}

/// Two businesses: a worker and a manager in the north one, an outsider in
/// the south one; one site with a 300 m radius and a site without coordinates.
pub fn base_fixture() -> Fixture {
    let member = |business: &str, user: &str, role| Membership {
        business_id: business.to_string(),
        user_id: user.to_string(),
        role,
        active: true,
    };

    Fixture {
        memberships: vec![
            member(BUSINESS, WORKER, MemberRole::Worker),
            member(BUSINESS, MANAGER, MemberRole::Manager),
            member(OTHER_BUSINESS, OUTSIDER, MemberRole::Worker),
        ],
        profiles: vec![
            Profile {
                user_id: WORKER.to_string(),
                display_name: "Ada Mason".to_string(),
            },
            Profile {
                user_id: MANAGER.to_string(),
                display_name: "Bo Foreman".to_string(),
            },
        ],
        projects: vec![
            harbor_site(),
            Site {
                id: "proj-unmapped".to_string(),
                business_id: BUSINESS.to_string(),
                name: "Unmapped Yard".to_string(),
                lat: None,
                lng: None,
                radius_m: None,
                active: true,
            },
        ],
        shifts: vec![],
    }
}

pub fn seeded_pool(extra_shifts: Vec<Shift>) -> DbPool {
    let mut pool = DbPool::in_memory().expect("in-memory db");
    let mut fixture = base_fixture();
    fixture.shifts = extra_shifts;
    apply_fixture(&mut pool.conn, &fixture, "test").expect("apply fixture");
    pool
}

/// Init a DB through the CLI and load the base fixture (plus an open shift
/// for the worker) from a JSON file.
pub fn init_db_with_fixture(name: &str) -> String {
    let db_path = setup_test_db(name);

    cc().args(["--db", &db_path, "--test", "init"])
        .assert()
        .success();

    let mut fixture = base_fixture();
    fixture.shifts = vec![shift("shift-open", WORKER, Utc::now() - Duration::hours(1), None)];

    let fixture_path = temp_out(name, "json");
    fs::write(&fixture_path, serde_json::to_string_pretty(&fixture).unwrap()).unwrap();

    cc().args(["--db", &db_path, "seed", "--file", &fixture_path])
        .assert()
        .success();

    db_path
}
