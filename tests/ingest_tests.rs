use chrono::Duration;
use crewclock::core::ingest::{
    BusinessSource, IngestSettings, Ingestor, RawEventPayload, RecordedEvent,
};
use crewclock::db::DbPool;
use crewclock::errors::AppError;
use crewclock::models::{Actor, Coordinate};
use crewclock::utils::time::fmt_ts;

mod common;
use common::*;

fn ingestor() -> Ingestor {
    Ingestor::new(IngestSettings {
        dedup_window: Duration::seconds(30),
        shift_lookup_attempts: 2,
        shift_lookup_delay: std::time::Duration::from_millis(1),
    })
}

fn geofence(kind: &str, pos: Coordinate, occurred_at: &str) -> RawEventPayload {
    RawEventPayload {
        event_type: Some(kind.to_string()),
        project_id: Some(PROJECT.to_string()),
        occurred_at: Some(occurred_at.to_string()),
        lat: Some(pos.lat),
        lng: Some(pos.lng),
        ..Default::default()
    }
}

fn count(pool: &DbPool, table: &str) -> i64 {
    pool.conn
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .unwrap()
}

fn record(
    pool: &mut DbPool,
    actor: &Actor,
    payload: RawEventPayload,
) -> Result<crewclock::core::ingest::IngestOutcome, AppError> {
    let now = at(2026, 3, 2, 12, 0);
    let submission = payload.validate(now)?;
    ingestor().ingest(&mut pool.conn, actor, submission)
}

#[test]
fn test_enter_280m_from_center_is_inside() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::member(WORKER).with_business(BUSINESS);

    let out = record(
        &mut pool,
        &actor,
        geofence("enter", north_of_center(280.0), "2026-03-02T08:00:00Z"),
    )
    .unwrap();

    assert!(!out.deduped);
    assert_eq!(out.event.inside(), Some(true));
    assert_eq!(out.event.distance_m(), Some(280));
    assert_eq!(out.business.business_id, BUSINESS);
}

#[test]
fn test_enter_320m_from_center_is_outside_but_stored() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::member(WORKER).with_business(BUSINESS);

    let out = record(
        &mut pool,
        &actor,
        geofence("enter", north_of_center(320.0), "2026-03-02T08:00:00Z"),
    )
    .unwrap();

    assert_eq!(out.event.inside(), Some(false));
    assert_eq!(out.event.distance_m(), Some(320));
    assert_eq!(count(&pool, "geofence_events"), 1);
}

#[test]
fn test_same_event_within_window_is_deduplicated() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::member(WORKER).with_business(BUSINESS);
    let pos = north_of_center(50.0);

    let first = record(&mut pool, &actor, geofence("enter", pos, "2026-03-02T08:00:00Z")).unwrap();
    let second = record(&mut pool, &actor, geofence("enter", pos, "2026-03-02T08:00:10Z")).unwrap();

    assert!(second.deduped);
    assert_eq!(first.event.id(), second.event.id());
    assert_eq!(count(&pool, "geofence_events"), 1);
}

#[test]
fn test_same_event_outside_window_is_stored_twice() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::member(WORKER).with_business(BUSINESS);
    let pos = north_of_center(50.0);

    record(&mut pool, &actor, geofence("enter", pos, "2026-03-02T08:00:00Z")).unwrap();
    let second = record(&mut pool, &actor, geofence("enter", pos, "2026-03-02T08:00:40Z")).unwrap();

    assert!(!second.deduped);
    assert_eq!(count(&pool, "geofence_events"), 2);
}

#[test]
fn test_enter_then_exit_are_not_duplicates() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::member(WORKER).with_business(BUSINESS);

    record(&mut pool, &actor, geofence("enter", north_of_center(10.0), "2026-03-02T08:00:00Z")).unwrap();
    let exit = record(&mut pool, &actor, geofence("exit", north_of_center(400.0), "2026-03-02T08:00:05Z")).unwrap();

    assert!(!exit.deduped);
    assert_eq!(count(&pool, "geofence_events"), 2);
}

#[test]
fn test_worker_cannot_record_for_someone_else() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::member(WORKER).with_business(BUSINESS);

    let mut payload = geofence("enter", north_of_center(10.0), "2026-03-02T08:00:00Z");
    payload.employee_id = Some(MANAGER.to_string());

    let err = record(&mut pool, &actor, payload).unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(count(&pool, "geofence_events"), 0);
}

#[test]
fn test_manager_can_record_for_worker() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::member(MANAGER).with_business(BUSINESS);

    let mut payload = geofence("enter", north_of_center(10.0), "2026-03-02T08:00:00Z");
    payload.employee_id = Some(WORKER.to_string());

    let out = record(&mut pool, &actor, payload).unwrap();
    match out.event {
        RecordedEvent::Geofence(e) => assert_eq!(e.employee_id, WORKER),
        other => panic!("unexpected stream: {other:?}"),
    }
}

#[test]
fn test_non_member_is_forbidden() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::member(OUTSIDER).with_business(BUSINESS);

    let err = record(
        &mut pool,
        &actor,
        geofence("enter", north_of_center(10.0), "2026-03-02T08:00:00Z"),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[test]
fn test_admin_bypasses_membership() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::admin("u-root").with_business(BUSINESS);

    let out = record(
        &mut pool,
        &actor,
        geofence("enter", north_of_center(10.0), "2026-03-02T08:00:00Z"),
    )
    .unwrap();
    assert_eq!(out.event.inside(), Some(true));
}

#[test]
fn test_missing_actor_is_unauthorized() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::member("  ").with_business(BUSINESS);

    let mut payload = geofence("enter", north_of_center(10.0), "2026-03-02T08:00:00Z");
    payload.employee_id = Some(WORKER.to_string());

    let err = record(&mut pool, &actor, payload).unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
}

#[test]
fn test_project_without_coordinates_stores_unknown_classification() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::member(WORKER).with_business(BUSINESS);

    let mut payload = geofence("enter", north_of_center(10.0), "2026-03-02T08:00:00Z");
    payload.project_id = Some("proj-unmapped".to_string());

    let out = record(&mut pool, &actor, payload).unwrap();
    assert_eq!(out.event.inside(), None);
    assert_eq!(out.event.distance_m(), None);
    assert_eq!(count(&pool, "geofence_events"), 1);
}

#[test]
fn test_unknown_project_falls_back_to_context_business() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::member(WORKER).with_business(BUSINESS);

    let mut payload = geofence("enter", north_of_center(10.0), "2026-03-02T08:00:00Z");
    payload.project_id = Some("proj-ghost".to_string());

    let out = record(&mut pool, &actor, payload).unwrap();
    assert_eq!(out.business.source, BusinessSource::Context);
    assert_eq!(out.event.inside(), None);
}

#[test]
fn test_project_business_used_when_no_context() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::member(WORKER);

    let out = record(
        &mut pool,
        &actor,
        geofence("enter", north_of_center(10.0), "2026-03-02T08:00:00Z"),
    )
    .unwrap();
    assert_eq!(out.business.business_id, BUSINESS);
    assert_eq!(out.business.source, BusinessSource::Project);
    assert!(out.business.used_fallback);
}

#[test]
fn test_clock_in_uses_shift_business_over_context() {
    let open = shift("shift-1", WORKER, at(2026, 3, 2, 8, 0), None);
    let mut pool = seeded_pool(vec![open]);
    let actor = Actor::member(WORKER).with_business(OTHER_BUSINESS);

    let mut payload = geofence("clock_in", north_of_center(100.0), "2026-03-02T08:00:00Z");
    payload.time_entry_id = Some("shift-1".to_string());

    let out = record(&mut pool, &actor, payload).unwrap();
    assert_eq!(out.business.business_id, BUSINESS);
    assert_eq!(out.business.source, BusinessSource::Shift);
    assert!(out.business.used_fallback);
    assert!(out.business.context_mismatch);

    match &out.event {
        RecordedEvent::Shift(e) => {
            assert_eq!(e.time_entry_id, "shift-1");
            assert_eq!(e.inside, Some(true));
        }
        other => panic!("unexpected stream: {other:?}"),
    }
    assert_eq!(count(&pool, "time_entry_events"), 1);
    assert_eq!(count(&pool, "geofence_events"), 0);
}

#[test]
fn test_clock_out_without_position_is_unclassified() {
    let open = shift("shift-1", WORKER, at(2026, 3, 2, 8, 0), None);
    let mut pool = seeded_pool(vec![open]);
    let actor = Actor::member(WORKER).with_business(BUSINESS);

    let payload = RawEventPayload {
        event_type: Some("clock_out".to_string()),
        project_id: Some(PROJECT.to_string()),
        time_entry_id: Some("shift-1".to_string()),
        occurred_at: Some("2026-03-02T16:00:00Z".to_string()),
        ..Default::default()
    };

    let out = record(&mut pool, &actor, payload).unwrap();
    assert_eq!(out.event.inside(), None);
    assert_eq!(out.event.distance_m(), None);
}

#[test]
fn test_unknown_shift_is_not_found_after_retries() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::member(WORKER).with_business(BUSINESS);

    let mut payload = geofence("clock_in", north_of_center(10.0), "2026-03-02T08:00:00Z");
    payload.time_entry_id = Some("shift-missing".to_string());

    let err = record(&mut pool, &actor, payload).unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: "time_entry", .. }));
}

#[test]
fn test_shift_of_another_employee_is_forbidden() {
    let open = shift("shift-1", WORKER, at(2026, 3, 2, 8, 0), None);
    let mut pool = seeded_pool(vec![open]);
    let actor = Actor::member(MANAGER).with_business(BUSINESS);

    let mut payload = geofence("manager_clock_out", north_of_center(10.0), "2026-03-02T17:00:00Z");
    payload.time_entry_id = Some("shift-1".to_string());

    let err = record(&mut pool, &actor, payload).unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[test]
fn test_validation_rejects_before_storage() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::member(WORKER).with_business(BUSINESS);

    let mut no_lng = geofence("enter", north_of_center(10.0), "2026-03-02T08:00:00Z");
    no_lng.lng = None;
    assert!(matches!(
        record(&mut pool, &actor, no_lng).unwrap_err(),
        AppError::Validation { .. }
    ));

    let bad_time = geofence("enter", north_of_center(10.0), "yesterday-ish");
    assert!(matches!(
        record(&mut pool, &actor, bad_time).unwrap_err(),
        AppError::Validation { field: "occurred_at", .. }
    ));

    let mut bad_source = geofence("enter", north_of_center(10.0), "2026-03-02T08:00:00Z");
    bad_source.source = Some("carrier-pigeon".to_string());
    assert!(matches!(
        record(&mut pool, &actor, bad_source).unwrap_err(),
        AppError::Validation { field: "source", .. }
    ));

    let bad_type = geofence("teleport", north_of_center(10.0), "2026-03-02T08:00:00Z");
    assert!(matches!(
        record(&mut pool, &actor, bad_type).unwrap_err(),
        AppError::Validation { .. }
    ));

    assert_eq!(count(&pool, "geofence_events"), 0);
}

#[test]
fn test_missing_occurred_at_defaults_to_now() {
    let mut pool = seeded_pool(vec![]);
    let actor = Actor::member(WORKER).with_business(BUSINESS);

    let mut payload = geofence("enter", north_of_center(10.0), "");
    payload.occurred_at = None;

    let out = record(&mut pool, &actor, payload).unwrap();
    match out.event {
        RecordedEvent::Geofence(e) => {
            assert_eq!(fmt_ts(&e.occurred_at), fmt_ts(&at(2026, 3, 2, 12, 0)))
        }
        other => panic!("unexpected stream: {other:?}"),
    }
}

#[test]
fn test_default_settings_match_config_defaults() {
    let cfg = crewclock::config::Config::default();
    let from_cfg = Ingestor::new(IngestSettings::from_config(&cfg));
    let defaults = IngestSettings::default();

    assert_eq!(from_cfg.settings().dedup_window, defaults.dedup_window);
    assert_eq!(
        from_cfg.settings().shift_lookup_attempts,
        defaults.shift_lookup_attempts
    );
}

#[test]
fn test_concurrent_duplicates_store_exactly_one_row() {
    use crewclock::core::seed::apply_fixture;
    use std::sync::{Arc, Barrier};
    use std::thread;

    let db_path = setup_test_db("concurrent_dedup");
    {
        let mut pool = DbPool::open_migrated(&db_path).unwrap();
        apply_fixture(&mut pool.conn, &base_fixture(), "test").unwrap();
    }

    // Two writers on separate connections to the same file.
    let pools: Vec<DbPool> = (0..2)
        .map(|_| DbPool::open_migrated(&db_path).unwrap())
        .collect();
    let barrier = Arc::new(Barrier::new(pools.len()));

    let handles: Vec<_> = pools
        .into_iter()
        .map(|mut pool| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let actor = Actor::member(WORKER).with_business(BUSINESS);
                let submission = geofence("enter", north_of_center(50.0), "2026-03-02T08:00:00Z")
                    .validate(at(2026, 3, 2, 12, 0))
                    .unwrap();
                barrier.wait();
                ingestor()
                    .ingest(&mut pool.conn, &actor, submission)
                    .unwrap()
                    .deduped
            })
        })
        .collect();

    let deduped: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(deduped.iter().filter(|d| **d).count(), 1);

    let pool = DbPool::new(&db_path).unwrap();
    assert_eq!(count(&pool, "geofence_events"), 1);
}

#[test]
fn test_shift_retry_does_not_hold_the_shared_pool() {
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration as StdDuration, Instant};

    let pool = Arc::new(Mutex::new(seeded_pool(vec![])));
    let slow = Ingestor::new(IngestSettings {
        dedup_window: Duration::seconds(30),
        shift_lookup_attempts: 3,
        shift_lookup_delay: StdDuration::from_millis(200),
    });

    let shared = Arc::clone(&pool);
    let worker = thread::spawn(move || {
        let actor = Actor::member(WORKER).with_business(BUSINESS);
        let submission = RawEventPayload {
            event_type: Some("clock_in".to_string()),
            project_id: Some(PROJECT.to_string()),
            time_entry_id: Some("shift-missing".to_string()),
            ..Default::default()
        }
        .validate(at(2026, 3, 2, 12, 0))
        .unwrap();
        slow.ingest_shared(&shared, &actor, submission)
    });

    // Mid-retry, other callers still get the connection right away.
    thread::sleep(StdDuration::from_millis(100));
    let started = Instant::now();
    drop(pool.lock().unwrap());
    assert!(started.elapsed() < StdDuration::from_millis(100));

    let err = worker.join().unwrap().unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: "time_entry", .. }));
}

#[test]
fn test_blank_actor_is_rejected_before_any_lookup() {
    use std::time::{Duration as StdDuration, Instant};

    let mut pool = seeded_pool(vec![]);
    let slow = Ingestor::new(IngestSettings {
        dedup_window: Duration::seconds(30),
        shift_lookup_attempts: 3,
        shift_lookup_delay: StdDuration::from_millis(300),
    });
    let submission = RawEventPayload {
        event_type: Some("clock_in".to_string()),
        project_id: Some(PROJECT.to_string()),
        time_entry_id: Some("shift-missing".to_string()),
        ..Default::default()
    }
    .validate(at(2026, 3, 2, 12, 0))
    .unwrap();

    let started = Instant::now();
    let err = slow
        .ingest(&mut pool.conn, &Actor::member("  "), submission)
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
    assert!(started.elapsed() < StdDuration::from_millis(300));
}
