use std::sync::Arc;
use std::time::Duration;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use marquee_api::{app, AppState};
use marquee_core::{BookingService, HoldEngine, HoldSettings, InMemorySeatStore, SeatStore};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app(grace: Duration) -> Router {
    test_app_with_origins(grace, &[])
}

fn test_app_with_origins(grace: Duration, origins: &[String]) -> Router {
    let store: Arc<dyn SeatStore> = Arc::new(InMemorySeatStore::new());
    let settings = HoldSettings {
        grace,
        min_wait: Duration::from_millis(1),
        intake_capacity: 16,
    };
    let engine = HoldEngine::start(store.clone(), settings).unwrap();
    app(AppState::new(BookingService::new(store, engine)), origins)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create_event(app: &Router, seats: i32) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/events",
        Some(json!({ "title": "Quartet", "date": "2026-11-01T19:30:00Z", "amount_of_seats": seats })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["available_seats"], seats);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_book_and_confirm_flow() {
    let app = test_app(Duration::from_secs(30));
    let event_id = create_event(&app, 3).await;

    let (status, held) = send(&app, "POST", &format!("/events/{}/book", event_id), Some(json!({ "seat_index": 2 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(held["seat"]["booked"], true);
    assert_eq!(held["seat"]["paid"], false);
    assert!(held["hold_id"].is_string());

    let (status, _) = send(&app, "POST", &format!("/events/{}/book", event_id), Some(json!({ "seat_index": 2 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, seat) = send(&app, "POST", &format!("/events/{}/confirm", event_id), Some(json!({ "seat_index": 2 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seat["paid"], true);
    assert_eq!(seat["booked"], true);

    let (status, view) = send(&app, "GET", &format!("/events/{}", event_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["available_seats"], 2);
    assert_eq!(view["seats"][1]["status"], "paid");
    assert_eq!(view["seats"][0]["status"], "free");
}

#[tokio::test]
async fn test_unpaid_hold_expires() {
    let app = test_app(Duration::from_millis(50));
    let event_id = create_event(&app, 1).await;

    let (status, _) = send(&app, "POST", &format!("/events/{}/book", event_id), Some(json!({ "seat_index": 1 }))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, view) = send(&app, "GET", &format!("/events/{}", event_id), None).await;
    assert_eq!(view["seats"][0]["status"], "reserved");

    let mut freed = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let (_, view) = send(&app, "GET", &format!("/events/{}", event_id), None).await;
        if view["seats"][0]["status"] == "free" {
            freed = true;
            break;
        }
    }
    assert!(freed, "hold was never released");

    let (status, _) = send(&app, "POST", &format!("/events/{}/book", event_id), Some(json!({ "seat_index": 1 }))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_error_statuses() {
    let app = test_app(Duration::from_secs(30));
    let event_id = create_event(&app, 2).await;

    for index in [0, 3, -1] {
        let (status, body) = send(&app, "POST", &format!("/events/{}/book", event_id), Some(json!({ "seat_index": index }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    let (status, _) = send(&app, "POST", &format!("/events/{}/confirm", event_id), Some(json!({ "seat_index": 9 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = uuid::Uuid::new_v4();
    let (status, _) = send(&app, "GET", &format!("/events/{}", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", &format!("/events/{}/book", missing), Some(json!({ "seat_index": 1 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/events",
        Some(json!({ "title": "", "date": "2026-11-01T19:30:00Z", "amount_of_seats": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/events",
        Some(json!({ "title": "Empty house", "date": "2026-11-01T19:30:00Z", "amount_of_seats": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_and_health() {
    let app = test_app(Duration::from_secs(30));
    let event_id = create_event(&app, 1).await;
    send(&app, "POST", &format!("/events/{}/book", event_id), Some(json!({ "seat_index": 1 }))).await;

    let (status, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("marquee_holds_started_total"));
    assert!(text.contains("marquee_active_holds"));
}

#[tokio::test]
async fn test_cors_preflight_allows_only_routed_methods() {
    let app = test_app_with_origins(Duration::from_secs(30), &["http://localhost:5000".to_string()]);

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/events")
        .header(header::ORIGIN, "http://localhost:5000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:5000");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("POST") && methods.contains("GET"));
    assert!(!methods.contains("DELETE"));
}
