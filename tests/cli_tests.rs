use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use std::fs;

mod common;
use common::*;

fn coords(meters: f64) -> (String, String) {
    let p = north_of_center(meters);
    (p.lat.to_string(), p.lng.to_string())
}

fn geofence_rows(db_path: &str) -> i64 {
    let conn = rusqlite::Connection::open(db_path).expect("open db");
    conn.query_row("SELECT COUNT(*) FROM geofence_events", [], |r| r.get(0))
        .expect("count")
}

#[test]
fn test_init_creates_database() {
    let db_path = setup_test_db("cli_init");

    cc().args(["--db", &db_path, "--test", "init"])
        .assert()
        .success()
        .stdout(contains("Database initialized"));

    assert!(std::path::Path::new(&db_path).exists());

    cc().args(["--db", &db_path, "db", "--check", "--info"])
        .assert()
        .success()
        .stdout(contains("Integrity check passed"))
        .stdout(contains("Geofence events"));
}

#[test]
fn test_record_enter_and_duplicate() {
    let db_path = init_db_with_fixture("cli_record");
    let (lat, lng) = coords(280.0);

    let args = [
        "--db", &db_path, "record", "--actor", WORKER, "--business", BUSINESS, "--type", "enter",
        "--project", PROJECT, "--lat", &lat, "--lng", &lng, "--at", "2026-03-02T08:00:00Z",
    ];

    cc().args(args)
        .assert()
        .success()
        .stdout(contains("Event recorded"))
        .stdout(contains("280 m"));

    cc().args(args)
        .assert()
        .success()
        .stdout(contains("Duplicate event"));

    assert_eq!(geofence_rows(&db_path), 1);
}

#[test]
fn test_record_without_coordinates_is_rejected() {
    let db_path = init_db_with_fixture("cli_record_invalid");

    cc().args([
        "--db", &db_path, "record", "--actor", WORKER, "--type", "exit", "--project", PROJECT,
    ])
    .assert()
    .failure()
    .stderr(contains("Invalid lat"));

    assert_eq!(geofence_rows(&db_path), 0);
}

#[test]
fn test_record_for_other_business_is_forbidden() {
    let db_path = init_db_with_fixture("cli_record_forbidden");
    let (lat, lng) = coords(10.0);

    cc().args([
        "--db", &db_path, "record", "--actor", OUTSIDER, "--type", "enter", "--project", PROJECT,
        "--lat", &lat, "--lng", &lng,
    ])
    .assert()
    .failure()
    .stderr(contains("Forbidden"));
}

#[test]
fn test_resolve_finds_site_in_range() {
    let db_path = init_db_with_fixture("cli_resolve");
    let (lat, lng) = coords(120.0);

    cc().args(["--db", &db_path, "resolve", "--actor", WORKER, "--lat", &lat, "--lng", &lng])
        .assert()
        .success()
        .stdout(contains("Harbor Wall"));

    let (far_lat, far_lng) = coords(2_000.0);
    cc().args([
        "--db", &db_path, "resolve", "--actor", WORKER, "--lat", &far_lat, "--lng", &far_lng,
    ])
    .assert()
    .success()
    .stdout(contains("No job site in range"));
}

#[test]
fn test_report_text_csv_and_json() {
    let db_path = init_db_with_fixture("cli_report");

    cc().args(["--db", &db_path, "report", "--actor", MANAGER, "--business", BUSINESS])
        .assert()
        .success()
        .stdout(contains("Report for business biz-north"))
        .stdout(contains("Ada Mason"));

    cc().args([
        "--db", &db_path, "report", "--actor", MANAGER, "--business", BUSINESS, "--format", "csv",
    ])
    .assert()
    .success()
    .stdout(contains("shift_id,employee_id,employee,project_id,project"))
    .stdout(contains("shift-open"));

    let out = temp_out("cli_report", "json");
    cc().args([
        "--db", &db_path, "report", "--actor", MANAGER, "--business", BUSINESS, "--format", "json",
        "--file", &out,
    ])
    .assert()
    .success()
    .stdout(contains("JSON export completed"));

    let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(parsed["business_id"], BUSINESS);
    assert_eq!(parsed["attendance"].as_array().unwrap().len(), 1);
}

#[test]
fn test_report_requires_manager() {
    let db_path = init_db_with_fixture("cli_report_forbidden");

    cc().args(["--db", &db_path, "report", "--actor", WORKER, "--business", BUSINESS])
        .assert()
        .failure()
        .stderr(contains("Forbidden"));
}

#[test]
fn test_backfill_dry_run_then_apply() {
    let db_path = init_db_with_fixture("cli_backfill");

    cc().args(["--db", &db_path, "backfill", "--business", BUSINESS, "--seed", "7"])
        .assert()
        .success()
        .stdout(contains("Dry run"));
    assert_eq!(geofence_rows(&db_path), 0);

    cc().args([
        "--db", &db_path, "backfill", "--business", BUSINESS, "--seed", "7", "--dry-run", "false",
    ])
    .assert()
    .success()
    .stdout(contains("events inserted"));
    assert!(geofence_rows(&db_path) >= 1);

    cc().args(["--db", &db_path, "log", "--print"])
        .assert()
        .success()
        .stdout(contains("backfill").and(contains("seed")));
}

#[test]
fn test_backfill_cap_above_three_is_rejected() {
    let db_path = init_db_with_fixture("cli_backfill_cap");

    cc().args(["--db", &db_path, "backfill", "--business", BUSINESS, "--max-events", "4"])
        .assert()
        .failure();
}

#[test]
fn test_track_replay_records_transition() {
    let db_path = init_db_with_fixture("cli_track");

    let far = north_of_center(450.0);
    let near = north_of_center(40.0);
    let replay = temp_out("cli_track", "txt");
    fs::write(
        &replay,
        format!(
            "# walking in\n{},{}\n-\n{},{}\n",
            far.lat, far.lng, near.lat, near.lng
        ),
    )
    .unwrap();

    cc().args([
        "--db", &db_path, "track", "--actor", WORKER, "--replay", &replay, "--interval-ms", "5",
    ])
    .assert()
    .success()
    .stdout(contains("Tracking finished"));

    assert_eq!(geofence_rows(&db_path), 1);
}

#[test]
fn test_track_without_open_shift_fails() {
    let db_path = init_db_with_fixture("cli_track_none");
    let replay = temp_out("cli_track_none", "txt");
    fs::write(&replay, "45.0,9.0\n").unwrap();

    cc().args(["--db", &db_path, "track", "--actor", MANAGER, "--replay", &replay])
        .assert()
        .failure()
        .stderr(contains("not found"));
}
