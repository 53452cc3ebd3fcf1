//! Shared helpers for API integration tests.
//!
//! Tests run the production router and middleware stack over a
//! [`MemoryLeadStore`], so no database is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use glasslead_api::config::{LogFormat, ServerConfig};
use glasslead_api::router::build_app_router;
use glasslead_api::state::AppState;
use glasslead_db::store::MemoryLeadStore;
use glasslead_events::EventBus;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        duplicate_window_secs: 60,
        lead_webhook_url: None,
        log_format: LogFormat::Pretty,
    }
}

/// Build the full application router over `store`.
pub fn build_test_app(store: Arc<MemoryLeadStore>) -> Router {
    build_test_app_with(store, Arc::new(EventBus::default()), test_config())
}

pub fn build_test_app_with(
    store: Arc<MemoryLeadStore>,
    event_bus: Arc<EventBus>,
    config: ServerConfig,
) -> Router {
    let state = AppState {
        store,
        config: Arc::new(config.clone()),
        event_bus,
    };
    build_app_router(state, &config)
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    post_lead_request(app, uri, body.to_string(), None).await
}

/// POST a lead to `/api/v1/leads`, optionally with an idempotency key.
pub async fn post_lead(
    app: Router,
    body: serde_json::Value,
    idempotency_key: Option<&str>,
) -> Response {
    post_lead_request(app, "/api/v1/leads", body.to_string(), idempotency_key).await
}

pub async fn post_raw(app: Router, uri: &str, body: &str) -> Response {
    post_lead_request(app, uri, body.to_string(), None).await
}

async fn post_lead_request(
    app: Router,
    uri: &str,
    body: String,
    idempotency_key: Option<&str>,
) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = idempotency_key {
        builder = builder.header("Idempotency-Key", key);
    }
    app.oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// A payload that passes every server-side rule.
pub fn valid_lead() -> serde_json::Value {
    serde_json::json!({
        "serviceType": "windshield_repair",
        "mobileService": false,
        "firstName": "Jamie",
        "lastName": "Rivera",
        "phoneE164": "+17209187465",
        "email": "jamie@example.com",
        "vehicleYear": 2020,
        "vehicleMake": "Honda",
        "vehicleModel": "Civic",
        "city": "Denver",
        "state": "CO",
        "zip": "80202",
        "timePreference": "flexible",
        "smsConsent": true,
        "privacyAcknowledgment": true,
        "termsAccepted": true,
        "clientId": "6f1c2d3e-0000-4000-8000-000000000001",
        "sessionId": "6f1c2d3e-0000-4000-8000-000000000002",
        "firstTouch": {"utm_source": "google", "utm_medium": "cpc", "referrer": "direct"},
        "lastTouch": {"utm_source": "direct", "referrer": "direct"}
    })
}
