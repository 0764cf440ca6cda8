//! Integration tests for the ipam-registry HTTP API
//!
//! Drives the router with `oneshot`; no socket is opened.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use ipam_common::api::{calculate_hash, HASH_HEADER, TIMESTAMP_HEADER};
use ipam_common::config::TomlConfig;
use ipam_common::db::init_memory_database;
use ipam_registry::{build_router, AppState};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::util::ServiceExt; // for `oneshot`

async fn setup_app(shared_secret: i64) -> Router {
    let pool = init_memory_database(&TomlConfig::default())
        .await
        .expect("Should open in-memory database");
    build_router(AppState::new(pool, "Douala", shared_secret))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.expect("Should read body").to_bytes().to_vec()
}

async fn body_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).expect("Should parse JSON")
}

/// POST an address and return its id
async fn create(app: &Router, address: &str, owners: Value) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/addresses",
            json!({ "address": address, "tags": ["20"], "owners": owners }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response.into_body()).await["id"]
        .as_str()
        .unwrap()
        .to_string()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let app = setup_app(42).await;

    let response = app.oneshot(empty_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "ipam-registry");
    assert!(body["version"].is_string());
}

// =============================================================================
// Request gate
// =============================================================================

#[tokio::test]
async fn test_gate_refuses_unsigned_mutation() {
    let app = setup_app(42).await;

    let response = app
        .oneshot(json_request("POST", "/api/addresses", json!({ "address": "10.0.0.1" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_gate_accepts_signed_mutation() {
    let app = setup_app(42).await;
    let timestamp = now_ms();

    let mut request = json_request("POST", "/api/addresses", json!({ "address": "10.0.0.1" }));
    let headers = request.headers_mut();
    headers.insert(TIMESTAMP_HEADER, timestamp.to_string().parse().unwrap());
    headers.insert(HASH_HEADER, calculate_hash(timestamp, 42).parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_gate_leaves_downloads_open() {
    let app = setup_app(42).await;

    for uri in ["/api/template", "/api/export", "/api/regions"] {
        let response = app.clone().oneshot(empty_request("GET", uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }
}

// =============================================================================
// Address records
// =============================================================================

#[tokio::test]
async fn test_create_then_duplicate_conflicts() {
    let app = setup_app(0).await;
    let id = create(&app, "10.0.0.1", json!(["Acme"])).await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/addresses", json!({ "address": "10.0.0.1" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "DUPLICATE_ADDRESS");
    assert_eq!(body["error"]["existing"]["id"], id.as_str());
    assert_eq!(body["error"]["existing"]["status"], "ACTIVE");
}

#[tokio::test]
async fn test_empty_address_is_bad_request() {
    let app = setup_app(0).await;

    let response = app
        .oneshot(json_request("POST", "/api/addresses", json!({ "address": " " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_address_errors() {
    let app = setup_app(0).await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/addresses/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(empty_request(
            "GET",
            "/api/addresses/00000000-0000-4000-8000-000000000000",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_owner_assignment_drives_status() {
    let app = setup_app(0).await;
    let id = create(&app, "10.0.0.1", json!([])).await;
    let uri = format!("/api/addresses/{}/owners", id);

    let response = app
        .clone()
        .oneshot(json_request("PUT", &uri, json!({ "owners": ["Acme"], "region": "Kribi" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response.into_body()).await["status"], "ACTIVE");

    let response = app
        .clone()
        .oneshot(json_request("PUT", &uri, json!({ "owners": [] })))
        .await
        .unwrap();
    assert_eq!(body_json(response.into_body()).await["status"], "INACTIVE");

    let response = app
        .oneshot(empty_request("GET", &format!("/api/addresses/{}", id)))
        .await
        .unwrap();
    let record = body_json(response.into_body()).await;
    assert_eq!(record["region"], "Kribi");
    assert_eq!(record["tags"], json!(["20"]));
    assert_eq!(record["owners"], json!([]));
}

#[tokio::test]
async fn test_retag_rename_and_delete() {
    let app = setup_app(0).await;
    let id = create(&app, "10.0.0.1", json!([])).await;
    let record_uri = format!("/api/addresses/{}", id);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("{}/tags", record_uri),
            json!({ "tags": ["413", "8"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("{}/address", record_uri),
            json!({ "address": "10.0.0.2" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(empty_request("GET", &record_uri))
        .await
        .unwrap();
    let record = body_json(response.into_body()).await;
    assert_eq!(record["address"], "10.0.0.2");
    assert_eq!(record["tags"], json!(["413", "8"]));

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &record_uri))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(empty_request("GET", &record_uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_record_endpoint() {
    let app = setup_app(0).await;
    let id = create(&app, "10.0.0.1", json!([])).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/addresses/{}", id),
            json!({ "address": "10.0.0.5", "tags": ["30"], "owners": ["Globex"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response.into_body()).await["status"], "ACTIVE");
}

// =============================================================================
// Import / template / export
// =============================================================================

#[tokio::test]
async fn test_import_template_via_http() {
    let app = setup_app(0).await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/template"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let template = body_bytes(response.into_body()).await;
    assert!(template.starts_with("\u{FEFF}".as_bytes()));

    let request = Request::builder()
        .method("POST")
        .uri("/api/import")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(template))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report = body_json(response.into_body()).await;
    assert_eq!(report["accepted"], 7);
    assert_eq!(report["duplicates"], 0);
    assert_eq!(report["rejected"], 0);

    let response = app.oneshot(empty_request("GET", "/api/export")).await.unwrap();
    let export = String::from_utf8(body_bytes(response.into_body()).await).unwrap();
    assert_eq!(export.lines().count(), 8);
}

#[tokio::test]
async fn test_import_empty_body_is_bad_request() {
    let app = setup_app(0).await;

    let response = app.oneshot(empty_request("POST", "/api/import")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_regions_listing() {
    let app = setup_app(0).await;

    let response = app.oneshot(empty_request("GET", "/api/regions")).await.unwrap();
    let body = body_json(response.into_body()).await;
    assert_eq!(body["default_region"], "Douala");
    assert_eq!(body["regions"][0], "Douala");
}
