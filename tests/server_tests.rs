use crewclock::config::Config;
use crewclock::core::ingest::RawEventPayload;
use crewclock::core::tracker::{EventSink, HttpSink};
use crewclock::models::{Actor, Shift};
use crewclock::server::{AppState, router};
use serde_json::{Value, json};
use std::time::Duration;

mod common;
use common::*;

/// Serve a seeded in-memory database on an ephemeral port; returns the base URL.
async fn spawn_server(shifts: Vec<Shift>) -> String {
    let state = AppState::new(seeded_pool(shifts), Config::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    format!("http://{addr}")
}

fn enter_body(meters: f64) -> Value {
    let p = north_of_center(meters);
    json!({
        "event_type": "enter",
        "project_id": PROJECT,
        "occurred_at": "2026-03-02T08:00:00Z",
        "lat": p.lat,
        "lng": p.lng,
    })
}

#[tokio::test]
async fn test_health_reports_database() {
    let base = spawn_server(vec![]).await;

    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_post_event_created_then_deduplicated() {
    let base = spawn_server(vec![]).await;
    let client = reqwest::Client::new();

    let first = client
        .post(format!("{base}/api/events"))
        .header("x-actor-id", WORKER)
        .header("x-business-id", BUSINESS)
        .json(&enter_body(280.0))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);
    let first: Value = first.json().await.unwrap();
    assert_eq!(first["event"]["inside"], true);
    assert_eq!(first["event"]["distance_m"], 280);
    assert_eq!(first["deduped"], false);

    let second = client
        .post(format!("{base}/api/events"))
        .header("x-actor-id", WORKER)
        .header("x-business-id", BUSINESS)
        .json(&enter_body(280.0))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 200);
    let second: Value = second.json().await.unwrap();
    assert_eq!(second["event"]["id"], first["event"]["id"]);
}

#[tokio::test]
async fn test_errors_use_stable_codes() {
    let base = spawn_server(vec![]).await;
    let client = reqwest::Client::new();

    let anonymous = client
        .post(format!("{base}/api/events"))
        .json(&enter_body(10.0))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);
    let body: Value = anonymous.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHORIZED");

    let invalid = client
        .post(format!("{base}/api/events"))
        .header("x-actor-id", WORKER)
        .json(&json!({ "event_type": "enter", "project_id": PROJECT, "lat": 45.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status().as_u16(), 400);
    let body: Value = invalid.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let garbage = client
        .post(format!("{base}/api/events"))
        .header("x-actor-id", WORKER)
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status().as_u16(), 400);

    let forbidden = client
        .post(format!("{base}/api/events"))
        .header("x-actor-id", OUTSIDER)
        .json(&enter_body(10.0))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status().as_u16(), 403);
}

#[tokio::test]
async fn test_report_and_site_resolution() {
    let base = spawn_server(vec![shift(
        "shift-a",
        WORKER,
        chrono::Utc::now() - chrono::Duration::hours(3),
        Some(chrono::Utc::now() - chrono::Duration::hours(1)),
    )])
    .await;
    let client = reqwest::Client::new();

    let report: Value = client
        .get(format!("{base}/api/reports?range=last30"))
        .header("x-actor-id", MANAGER)
        .header("x-business-id", BUSINESS)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["business_id"], BUSINESS);
    assert_eq!(report["attendance"].as_array().unwrap().len(), 1);
    assert_eq!(report["total_hours"], 2.0);

    let p = north_of_center(100.0);
    let resolved: Value = client
        .get(format!("{base}/api/sites/resolve?lat={}&lng={}", p.lat, p.lng))
        .header("x-actor-id", WORKER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resolved["selection"], "single");
    assert_eq!(resolved["chosen"]["site"]["id"], PROJECT);

    let bad = client
        .get(format!("{base}/api/sites/resolve?lat=north&lng=9"))
        .header("x-actor-id", WORKER)
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status().as_u16(), 400);
}

#[tokio::test]
async fn test_http_sink_submits_to_server() {
    let base = spawn_server(vec![]).await;
    let actor = Actor::member(WORKER).with_business(BUSINESS);
    let sink = HttpSink::new(&base, actor, Duration::from_secs(5)).unwrap();

    let p = north_of_center(30.0);
    let id = sink
        .submit(RawEventPayload {
            event_type: Some("enter".to_string()),
            project_id: Some(PROJECT.to_string()),
            lat: Some(p.lat),
            lng: Some(p.lng),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(!id.is_empty());
}

#[tokio::test]
async fn test_http_sink_reports_rejections() {
    let base = spawn_server(vec![]).await;
    let sink = HttpSink::new(&base, Actor::member(OUTSIDER), Duration::from_secs(5)).unwrap();

    let p = north_of_center(30.0);
    let err = sink
        .submit(RawEventPayload {
            event_type: Some("enter".to_string()),
            project_id: Some(PROJECT.to_string()),
            lat: Some(p.lat),
            lng: Some(p.lng),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.code(), "TRANSPORT_ERROR");
}
