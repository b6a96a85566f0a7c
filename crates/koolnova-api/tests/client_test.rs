#![allow(clippy::unwrap_used)]
// Integration tests for `Session` and `ApiClient` using wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use koolnova_api::{
    ApiClient, Credentials, Error, FanSpeed, ProjectMode, ProjectPatch, Session, ZonePatch,
    ZoneStatus,
};

// ── Helpers ─────────────────────────────────────────────────────────

const TIMEOUT: Duration = Duration::from_secs(5);

fn credentials(username: &str) -> Credentials {
    Credentials::new(username, SecretString::from("hunter2".to_owned()))
}

async fn login(server: &MockServer, creds: &Credentials) -> Result<Session, Error> {
    let base_url = Url::parse(&server.uri()).unwrap();
    Session::login(creds, base_url, TIMEOUT).await
}

fn authed_client(server: &MockServer) -> ApiClient {
    let base_url = Url::parse(&server.uri()).unwrap();
    ApiClient::new(Session::with_token(
        reqwest::Client::new(),
        base_url,
        "test-token",
    ))
}

fn zone_body(id: i64, name: &str, setpoint: f64) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "temperature": 20.8,
        "setpoint_temperature": setpoint,
        "status": "01",
        "speed": "2",
        "updated_at": "2024-06-15T10:30:00Z",
        "topic_info": {
            "id": 7,
            "is_online": true,
            "rssi": -58,
            "last_sync": "2024-06-15T10:29:55Z"
        }
    })
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn login_sends_username_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v2/login/"))
        .and(body_json(json!({"username": "roberto", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok-1"})))
        .expect(1)
        .mount(&server)
        .await;

    login(&server, &credentials("roberto")).await.unwrap();
}

#[tokio::test]
async fn login_sends_email_payload_for_addresses() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v2/login/"))
        .and(body_json(
            json!({"email": "roberto@example.com", "password": "hunter2"}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok-1"})))
        .expect(1)
        .mount(&server)
        .await;

    login(&server, &credentials("roberto@example.com"))
        .await
        .unwrap();
}

#[tokio::test]
async fn login_explicit_email_overrides_username() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v2/login/"))
        .and(body_json(
            json!({"email": "other@example.com", "password": "hunter2"}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-2"})))
        .expect(1)
        .mount(&server)
        .await;

    login(&server, &credentials("roberto").with_email("other@example.com"))
        .await
        .unwrap();
}

#[tokio::test]
async fn login_accepts_alternate_token_field_names() {
    for field in ["access_token", "token", "accessToken"] {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v2/login/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({field: "tok-x"})))
            .mount(&server)
            .await;

        login(&server, &credentials("roberto"))
            .await
            .unwrap_or_else(|e| panic!("field {field}: {e}"));
    }
}

#[tokio::test]
async fn login_without_token_field_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v2/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": "roberto"})))
        .mount(&server)
        .await;

    let result = login(&server, &credentials("roberto")).await;
    assert!(matches!(result, Err(Error::MissingToken)), "got: {result:?}");
}

#[tokio::test]
async fn login_client_error_fails_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v2/login/"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .expect(1)
        .mount(&server)
        .await;

    let result = login(&server, &credentials("roberto")).await;
    match result {
        Err(Error::Authentication { message }) => assert!(
            message.contains("Forbidden"),
            "body missing from message: {message}"
        ),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn login_retries_after_rate_limit() {
    let server = MockServer::start().await;

    // First attempt rate-limited with an immediate retry hint, second
    // attempt succeeds.
    Mock::given(method("POST"))
        .and(path("/auth/v2/login/"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v2/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok-3"})))
        .expect(1)
        .mount(&server)
        .await;

    login(&server, &credentials("roberto")).await.unwrap();
}

#[tokio::test]
async fn login_retries_after_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v2/login/"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v2/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok-4"})))
        .expect(1)
        .mount(&server)
        .await;

    // First retry waits the 2s backoff floor.
    login(&server, &credentials("roberto")).await.unwrap();
}

// ── Fetch ───────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_projects_normalizes_records() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/topics/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 7,
            "name": "Casa",
            "mode": "6",
            "is_online": true,
            "eco": false,
            "is_stop": false,
            "last_sync": "2024-06-15T10:29:55Z"
        }])))
        .mount(&server)
        .await;

    let projects = authed_client(&server).fetch_projects().await.unwrap();

    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].topic_id, 7);
    assert_eq!(projects[0].name, "Casa");
    assert_eq!(projects[0].mode, ProjectMode::Heat);
    assert!(projects[0].is_online);
    assert_eq!(projects[0].last_sync.as_deref(), Some("2024-06-15T10:29:55Z"));
}

#[tokio::test]
async fn fetch_zones_normalizes_records() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/devices/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([zone_body(42, "Living room", 22.0)])),
        )
        .mount(&server)
        .await;

    let zones = authed_client(&server).fetch_zones().await.unwrap();

    assert_eq!(zones.len(), 1);
    let zone = &zones[0];
    assert_eq!(zone.room_id, 42);
    assert_eq!(zone.current_temperature, Some(20.8));
    assert_eq!(zone.target_temperature, 22.0);
    assert_eq!(zone.status, ZoneStatus::Heat);
    assert_eq!(zone.fan_speed, FanSpeed::Medium);
    let topic = zone.topic.as_ref().unwrap();
    assert_eq!(topic.topic_id, 7);
    assert_eq!(topic.rssi, Some(-58));
}

#[tokio::test]
async fn fetch_maps_unauthorized_to_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/devices/"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let err = authed_client(&server).fetch_zones().await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }), "got: {err:?}");
    assert!(err.is_recoverable_with_cache());
}

#[tokio::test]
async fn undecodable_body_with_multibyte_text_is_an_error_not_a_panic() {
    let server = MockServer::start().await;

    // Byte 200 of this body falls inside the two-byte "é"; the error
    // preview must still come back intact.
    let body = format!("{}é le service est temporairement indisponible", "a".repeat(199));
    Mock::given(method("GET"))
        .and(path("/devices/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let err = authed_client(&server).fetch_zones().await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }), "got: {err:?}");
}

#[tokio::test]
async fn fetch_maps_other_errors_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/topics/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = authed_client(&server).fetch_projects().await.unwrap_err();
    match err {
        Error::Api { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
    assert!(!authed_err_recoverable(&server).await);
}

async fn authed_err_recoverable(server: &MockServer) -> bool {
    authed_client(server)
        .fetch_projects()
        .await
        .unwrap_err()
        .is_recoverable_with_cache()
}

// ── Updates ─────────────────────────────────────────────────────────

#[tokio::test]
async fn update_zone_sends_partial_patch() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/devices/42/"))
        .and(body_json(json!({"setpoint_temperature": 23.0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(zone_body(42, "Living room", 23.0)))
        .expect(1)
        .mount(&server)
        .await;

    let zone = authed_client(&server)
        .update_zone(42, &ZonePatch::setpoint(23.0))
        .await
        .unwrap();

    assert_eq!(zone.room_id, 42);
    assert_eq!(zone.target_temperature, 23.0);
}

#[tokio::test]
async fn update_project_returns_only_affected_fields() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/topics/7/"))
        .and(body_json(json!({"mode": "1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mode": "1",
            "last_sync": "2024-06-15T11:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let update = authed_client(&server)
        .update_project(7, &ProjectPatch::mode(ProjectMode::Cool))
        .await
        .unwrap();

    assert_eq!(update.mode, Some(ProjectMode::Cool));
    assert_eq!(update.last_sync.as_deref(), Some("2024-06-15T11:00:00Z"));
    assert_eq!(update.eco, None);
    assert_eq!(update.is_online, None);
}

#[tokio::test]
async fn update_errors_propagate() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/devices/42/"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "32"))
        .mount(&server)
        .await;

    let err = authed_client(&server)
        .update_zone(42, &ZonePatch::setpoint(23.0))
        .await
        .unwrap_err();

    match err {
        Error::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 32),
        other => panic!("expected RateLimited, got: {other:?}"),
    }
}
