//! HTTP-level tests against the router with in-memory collaborators.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use crowdcheck_api::{create_app, AppState};
use crowdcheck_core::{
    Conditions, Coordinates, GeoPoint, HistoryStore, ManualClock, MemoryHistory, ProviderError,
    WeatherProvider,
};
use crowdcheck_ratelimit::{RateLimitPolicy, WindowStore};
use crowdcheck_verify::{EngineProfile, IDENTITY_FLOOD_REASON};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct RainyWeather;

#[async_trait]
impl WeatherProvider for RainyWeather {
    async fn current_conditions(&self, _at: Coordinates) -> Result<Conditions, ProviderError> {
        Ok(Conditions {
            condition_text: "light rain".to_string(),
            temperature_celsius: 24.0,
            wind_speed: 3.0,
            humidity: Some(88),
        })
    }

    async fn geocode(&self, city: &str) -> Result<GeoPoint, ProviderError> {
        if city.eq_ignore_ascii_case("karachi") {
            Ok(GeoPoint {
                lat: 24.86,
                lon: 67.0,
                name: "Karachi".to_string(),
                country: Some("PK".to_string()),
            })
        } else {
            Err(ProviderError::NotFound(city.to_string()))
        }
    }
}

struct Harness {
    app: Router,
    state: AppState,
    history: Arc<MemoryHistory>,
}

/// Never answers
struct StalledWeather {
    started: AtomicBool,
}

#[async_trait]
impl WeatherProvider for StalledWeather {
    async fn current_conditions(&self, _at: Coordinates) -> Result<Conditions, ProviderError> {
        self.started.store(true, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn geocode(&self, city: &str) -> Result<GeoPoint, ProviderError> {
        Err(ProviderError::NotFound(city.to_string()))
    }
}

fn harness(policy: RateLimitPolicy) -> Harness {
    harness_with(policy, Arc::new(RainyWeather))
}

fn harness_with(policy: RateLimitPolicy, weather: Arc<dyn WeatherProvider>) -> Harness {
    let history = Arc::new(MemoryHistory::new());
    let state = AppState::new(
        EngineProfile::default(),
        policy,
        history.clone(),
        weather,
        Arc::new(ManualClock::new(Utc::now())),
    )
    .unwrap()
    .trust_proxy(true);
    Harness {
        app: create_app(state.clone()),
        state,
        history,
    }
}

fn post_report(from: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/reports")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::USER_AGENT, "crowdcheck-tests/1.0")
        .header("x-forwarded-for", from)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", "192.0.2.10")
        .body(Body::empty())
        .unwrap()
}

fn rain_report() -> Value {
    json!({
        "description": "Heavy rain flooding the main road near the market",
        "location": "Karachi",
        "coordinates": { "latitude": 24.8607, "longitude": 67.0011 }
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_carries_security_headers() {
    let h = harness(RateLimitPolicy::default());
    let response = h.app.oneshot(get("/v1/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert!(response.headers().contains_key("content-security-policy"));

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_matching_report_is_auto_verified_and_listed() {
    let h = harness(RateLimitPolicy::default());
    let mut events = h.state.events.subscribe();

    let response = h
        .app
        .clone()
        .oneshot(post_report("203.0.113.5", rain_report()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["verification"]["score"], 100);
    assert_eq!(body["verification"]["admission"], "auto_verified");
    assert_eq!(body["report"]["verified"], true);
    assert_eq!(body["report"]["networkIdentity"], "203.0.113.5");

    assert_eq!(events.recv().await.unwrap().name, "report:new");
    assert_eq!(events.recv().await.unwrap().name, "report:verified");

    let listing = h.app.oneshot(get("/v1/reports")).await.unwrap();
    let reports = body_json(listing).await;
    assert_eq!(reports.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_junk_report_is_flagged_and_hidden() {
    let h = harness(RateLimitPolicy::default());
    let mut events = h.state.events.subscribe();

    let response = h
        .app
        .clone()
        .oneshot(post_report(
            "203.0.113.6",
            json!({ "description": "asdf", "location": "Karachi" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["verification"]["admission"], "flagged");
    assert_eq!(body["report"]["verified"], false);
    assert_eq!(events.recv().await.unwrap().name, "report:flagged");

    // stored, but not public
    assert_eq!(h.history.len(), 1);
    let listing = h.app.oneshot(get("/v1/reports")).await.unwrap();
    assert_eq!(body_json(listing).await, json!([]));
}

#[tokio::test]
async fn test_markup_is_stripped_before_validation() {
    let h = harness(RateLimitPolicy::default());
    let response = h
        .app
        .oneshot(post_report(
            "203.0.113.7",
            json!({ "description": "<>", "location": "Karachi" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Missing required fields");
    assert!(h.history.is_empty());
}

#[tokio::test]
async fn test_identity_flood_is_rejected() {
    let h = harness(RateLimitPolicy::default());

    for _ in 0..3 {
        let response = h
            .app
            .clone()
            .oneshot(post_report("198.51.100.20", rain_report()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = h
        .app
        .clone()
        .oneshot(post_report("198.51.100.20", rain_report()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert_eq!(body["reason"], IDENTITY_FLOOD_REASON);
    assert_eq!(h.history.len(), 3);

    let stats = body_json(h.app.oneshot(get("/v1/audit/stats")).await.unwrap()).await;
    assert_eq!(stats["data"]["total"], 4);
    assert_eq!(stats["data"]["duplicates"], 1);
}

#[tokio::test]
async fn test_rate_limit_returns_retry_after() {
    let h = harness(RateLimitPolicy {
        max_requests: 2,
        ..Default::default()
    });

    for _ in 0..2 {
        let response = h.app.clone().oneshot(get("/v1/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = h.app.clone().oneshot(get("/v1/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "900");
    let body = body_json(response).await;
    assert_eq!(body["retryAfter"], 900);

    // another address still gets through
    let other = Request::builder()
        .uri("/v1/health")
        .header("x-forwarded-for", "192.0.2.99")
        .body(Body::empty())
        .unwrap();
    assert_eq!(h.app.oneshot(other).await.unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn test_geocode() {
    let h = harness(RateLimitPolicy::default());

    let found = h.app.clone().oneshot(get("/v1/geocode?city=Karachi")).await.unwrap();
    assert_eq!(found.status(), StatusCode::OK);
    assert_eq!(body_json(found).await["data"]["name"], "Karachi");

    let missing = h.app.clone().oneshot(get("/v1/geocode?city=Atlantis")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let no_city = h.app.oneshot(get("/v1/geocode")).await.unwrap();
    assert_eq!(no_city.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_count_admissions() {
    let h = harness(RateLimitPolicy::default());
    h.app
        .clone()
        .oneshot(post_report("203.0.113.8", rain_report()))
        .await
        .unwrap();

    let response = h.app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("crowdcheck_evaluations_total{admission=\"auto_verified\"} 1"));
}

#[tokio::test]
async fn test_history_is_shared_with_state() {
    let h = harness(RateLimitPolicy::default());
    h.app
        .oneshot(post_report("203.0.113.9", rain_report()))
        .await
        .unwrap();
    let stored = h
        .state
        .history
        .find_recent(&Default::default(), None)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].location, "Karachi");
}

#[tokio::test]
async fn test_client_supplied_forwarding_hops_are_ignored() {
    let h = harness(RateLimitPolicy {
        max_requests: 2,
        ..Default::default()
    });

    let mut admitted = 0;
    for i in 0..10 {
        let req = Request::builder()
            .uri("/v1/health")
            .header("x-forwarded-for", format!("10.9.9.{}, 198.51.100.7", i))
            .body(Body::empty())
            .unwrap();
        if h.app.clone().oneshot(req).await.unwrap().status() == StatusCode::OK {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 2);
    assert!(h.state.limiter.store().state("198.51.100.7").is_some());
}

#[tokio::test]
async fn test_malformed_body_gets_json_error() {
    let h = harness(RateLimitPolicy::default());

    let broken = Request::builder()
        .method("POST")
        .uri("/v1/reports")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.20")
        .body(Body::from("{not json"))
        .unwrap();
    let wrong_type = post_report(
        "203.0.113.20",
        json!({
            "description": "Heavy rain flooding the main road near the market",
            "location": "Karachi",
            "coordinates": { "latitude": "x", "longitude": 67.0 }
        }),
    );

    for req in [broken, wrong_type] {
        let response = h.app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body = body_json(response).await;
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "Invalid request body");
    }
    assert!(h.history.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_submission_stores_nothing() {
    let weather = Arc::new(StalledWeather {
        started: AtomicBool::new(false),
    });
    let h = harness_with(RateLimitPolicy::default(), weather.clone());
    let mut events = h.state.events.subscribe();

    let pending = h.app.clone().oneshot(post_report("203.0.113.30", rain_report()));
    let outcome = tokio::time::timeout(Duration::from_millis(100), pending).await;

    assert!(outcome.is_err(), "request should still be waiting on weather");
    assert!(weather.started.load(Ordering::SeqCst));
    assert!(h.history.is_empty());
    assert!(h.state.audit.lock().unwrap().entries().is_empty());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_audit_entries_and_export() {
    let h = harness(RateLimitPolicy::default());
    h.app
        .clone()
        .oneshot(post_report("203.0.113.40", rain_report()))
        .await
        .unwrap();
    h.app
        .clone()
        .oneshot(post_report(
            "203.0.113.41",
            json!({ "description": "asdf", "location": "Karachi" }),
        ))
        .await
        .unwrap();

    let all = body_json(h.app.clone().oneshot(get("/v1/audit/entries")).await.unwrap()).await;
    assert_eq!(all["data"].as_array().unwrap().len(), 2);

    let flagged = body_json(
        h.app
            .clone()
            .oneshot(get("/v1/audit/entries?flagged=true"))
            .await
            .unwrap(),
    )
    .await;
    let flagged = flagged["data"].as_array().unwrap();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0]["admission"], "flagged");

    let mine = body_json(
        h.app
            .clone()
            .oneshot(get("/v1/audit/entries?identity=203.0.113.40"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(mine["data"].as_array().unwrap().len(), 1);

    let export = h.app.oneshot(get("/v1/audit/export")).await.unwrap();
    assert_eq!(export.headers()[header::CONTENT_TYPE], "application/x-ndjson");
    let bytes = axum::body::to_bytes(export.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap().lines().count(), 2);
}
