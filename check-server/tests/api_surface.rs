//! HTTP surface tests: routing, status mapping, error bodies
//!
//! The engine itself is covered in the manager's unit tests; these drive
//! the real router with `tower::ServiceExt::oneshot`.

use axum::Router;
use axum::body::Body;
use check_server::api;
use check_server::core::{Config, ServerState};
use check_server::orders::OrdersManager;
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::util::ServiceExt;

fn test_config() -> Config {
    Config {
        work_dir: ".".into(),
        http_port: 0,
        log_level: "info".into(),
        request_timeout_ms: 5_000,
    }
}

fn app() -> Router {
    let manager = OrdersManager::open_in_memory().unwrap();
    let state = ServerState::with_manager(test_config(), manager);
    api::build_app(&state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(v) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn open_table(app: &Router, guest_count: u32) -> (String, u64) {
    let (status, body) = send(
        app,
        "POST",
        "/api/orders",
        Some(json!({
            "table_id": "T1",
            "employee_id": "emp-1",
            "guest_count": guest_count,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (
        body["order_id"].as_str().unwrap().to_string(),
        body["version"].as_u64().unwrap(),
    )
}

async fn add_item(app: &Router, order_id: &str, version: u64, name: &str, cents: i64) -> u64 {
    let (status, body) = send(
        app,
        "POST",
        &format!("/api/orders/{order_id}/items"),
        Some(json!({
            "items": [{ "name": name, "quantity": 1, "unit_price": cents }],
            "expected_version": version,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["version"].as_u64().unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_open_add_split_over_http() {
    let app = app();
    let (order_id, version) = open_table(&app, 3).await;
    let version = add_item(&app, &order_id, version, "Paella", 10_000).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/split"),
        Some(json!({ "strategy": "EVEN", "ways": 3, "expected_version": version })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let graph = &body["graph"];
    assert_eq!(graph["root"]["status"], "SPLIT");
    let children = graph["children"].as_array().unwrap();
    assert_eq!(children.len(), 3);
    let totals: Vec<i64> = children
        .iter()
        .map(|c| c["total"].as_i64().unwrap())
        .collect();
    assert_eq!(totals.iter().sum::<i64>(), 10_000);
    assert_eq!(totals, vec![3334, 3333, 3333]);
}

#[tokio::test]
async fn test_stale_version_maps_to_409() {
    let app = app();
    let (order_id, version) = open_table(&app, 2).await;
    add_item(&app, &order_id, version, "Stout", 700).await;

    // Same version again: stale
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/items"),
        Some(json!({
            "items": [{ "name": "Stout", "quantity": 1, "unit_price": 700 }],
            "expected_version": version,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    assert!(body["message"].as_str().unwrap().contains("Version conflict"));
}

#[tokio::test]
async fn test_unknown_order_maps_to_404() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/orders/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_validation_maps_to_400() {
    let app = app();
    let (order_id, version) = open_table(&app, 2).await;
    let version = add_item(&app, &order_id, version, "Cava", 4_500).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/split"),
        Some(json!({ "strategy": "EVEN", "ways": 1, "expected_version": version })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_payment_closes_order() {
    let app = app();
    let (order_id, version) = open_table(&app, 2).await;
    let version = add_item(&app, &order_id, version, "Tasting menu", 18_000).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/payments"),
        Some(json!({ "amount": 18_000, "method": "CARD", "expected_version": version })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["graph"]["root"]["status"], "PAID");

    // The table is free again
    let (status, _) = send(
        &app,
        "POST",
        "/api/orders",
        Some(json!({ "table_id": "T1", "employee_id": "emp-2", "guest_count": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_overpayment_maps_to_400() {
    let app = app();
    let (order_id, version) = open_table(&app, 2).await;
    let version = add_item(&app, &order_id, version, "Flan", 650).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/payments"),
        Some(json!({ "amount": 9_999, "method": "CASH", "expected_version": version })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_seat_mutation_and_views() {
    let app = app();
    let (order_id, version) = open_table(&app, 4).await;
    add_item(&app, &order_id, version, "Bravas", 850).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/seats"),
        Some(json!({ "action": "INSERT", "position": 2, "expected_seat_version": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seat_version"].as_u64().unwrap(), 1);

    let (status, body) = send(&app, "GET", &format!("/api/orders/{order_id}/seats"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 5);

    // Out-of-range position
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/seats"),
        Some(json!({ "action": "REMOVE", "position": 99, "expected_seat_version": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_POSITION");
}

#[tokio::test]
async fn test_by_seat_with_one_seat_maps_to_422() {
    let app = app();
    let (order_id, version) = open_table(&app, 4).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/items"),
        Some(json!({
            "items": [{
                "name": "Solo dish", "quantity": 1, "unit_price": 1_200,
                "seat": { "type": "SEAT", "number": 1 },
            }],
            "expected_version": version,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let version = body["version"].as_u64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/orders/{order_id}/split"),
        Some(json!({ "strategy": "BY_SEAT", "expected_version": version })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INSUFFICIENT_SEATS");
}

#[tokio::test]
async fn test_occupied_table_rejected() {
    let app = app();
    open_table(&app, 2).await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/orders",
        Some(json!({ "table_id": "T1", "employee_id": "emp-2", "guest_count": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
