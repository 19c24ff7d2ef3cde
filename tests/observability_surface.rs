//! End-to-end coverage of the C7 observability surface: load the shipped
//! default configuration, build a real `AppState` (simulated battery bus,
//! no dispatch tasks running), mount the router, and drive it through
//! `tower::ServiceExt::oneshot` the way a dashboard or health-checker would.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use open_energy_controller::{config::AppConfig, controller::AppState};
use serde_json::Value;
use tower::util::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_reports_ok_without_touching_dispatch_state() {
    let cfg = AppConfig::load().expect("default config should load and validate");
    let state = AppState::new(&cfg).await.expect("simulated AppState should construct without I/O");
    let router = open_energy_controller::api::router(state);

    let response = router
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn status_reflects_the_configured_initial_soc() {
    let cfg = AppConfig::load().expect("default config should load and validate");
    let initial_soc = cfg.battery.initial_soc;
    let state = AppState::new(&cfg).await.unwrap();
    let router = open_energy_controller::api::router(state);

    let response = router
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!((body["soc"].as_f64().unwrap() - initial_soc).abs() < 1e-9);
    assert_eq!(body["dispatch_state"], "Idle");
    assert!(body["last_dispatch_ts"].is_null());
}

#[tokio::test]
async fn safety_events_starts_empty_for_a_freshly_built_state() {
    let cfg = AppConfig::load().expect("default config should load and validate");
    let state = AppState::new(&cfg).await.unwrap();
    let router = open_energy_controller::api::router(state);

    let response = router
        .oneshot(Request::builder().uri("/safety/events").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}
