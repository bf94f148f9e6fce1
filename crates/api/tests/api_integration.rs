//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> axum::Router {
    api::create_app(api::create_state(InMemoryStore::new()), get_metrics_handle())
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Creates a client and two products priced 10.00 and 5.00.
async fn seed(app: &axum::Router) -> (i64, i64, i64) {
    let (status, user) = send(
        app,
        "POST",
        "/users",
        Some(json!({
            "last_name": "Dupont",
            "first_name": "Marie",
            "email": "marie@example.com",
            "password": "marie-secret-42"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, steak) = send(
        app,
        "POST",
        "/products",
        Some(json!({"name": "Steak", "price": 10.0, "stock": 5})),
    )
    .await;
    let (_, salad) = send(
        app,
        "POST",
        "/products",
        Some(json!({"name": "Salad", "price": 5.0, "stock": 5})),
    )
    .await;

    (
        user["id"].as_i64().unwrap(),
        steak["id"].as_i64().unwrap(),
        salad["id"].as_i64().unwrap(),
    )
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_and_get_order() {
    let app = setup();
    let (client, steak, _) = seed(&app).await;

    let (status, created) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({"client_id": client, "lines": [{"product_id": steak, "quantity": 2}]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["total_amount"], 20.0);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["lines"].as_array().unwrap().len(), 1);

    let id = created["id"].as_i64().unwrap();
    let (status, order) = send(&app, "GET", &format!("/orders/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order, created);
}

#[tokio::test]
async fn test_replace_lines_ignores_client_total() {
    let app = setup();
    let (client, steak, salad) = seed(&app).await;
    let (_, created) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({"client_id": client, "lines": [{"product_id": steak, "quantity": 2}]})),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/orders/{id}"),
        Some(json!({
            "lines": [
                {"product_id": steak, "quantity": 2},
                {"product_id": salad, "quantity": 3}
            ],
            "total_amount": 1.0
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["total_amount"], 35.0);
    assert_eq!(updated["lines"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_status_only_update_accepts_legacy_token() {
    let app = setup();
    let (client, steak, _) = seed(&app).await;
    let (_, created) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({"client_id": client, "lines": [{"product_id": steak, "quantity": 1}]})),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/orders/{id}"),
        Some(json!({"status": "servie"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "served");
    assert_eq!(updated["lines"], created["lines"]);
    assert_eq!(updated["total_amount"], 10.0);
}

#[tokio::test]
async fn test_delete_order() {
    let app = setup();
    let (client, steak, salad) = seed(&app).await;
    let (_, created) = send(
        &app,
        "POST",
        "/orders",
        Some(json!({
            "client_id": client,
            "lines": [
                {"product_id": steak, "quantity": 1},
                {"product_id": salad, "quantity": 1}
            ]
        })),
    )
    .await;
    let uri = format!("/orders/{}", created["id"]);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_order_is_404() {
    let app = setup();

    let (status, _) = send(&app, "GET", "/orders/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "PATCH",
        "/orders/9999",
        Some(json!({"status": "ready"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_errors_are_400() {
    let app = setup();
    let (client, steak, _) = seed(&app).await;

    for body in [
        json!({"client_id": client, "lines": [{"product_id": steak, "quantity": 0}]}),
        json!({"client_id": client, "status": "cancelled", "lines": []}),
        json!({"client_id": client, "date": "tomorrow", "lines": []}),
        json!({"client_id": 424242, "lines": []}),
    ] {
        let (status, json) = send(&app, "POST", "/orders", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    let (_, orders) = send(&app, "GET", "/orders", None).await;
    assert_eq!(orders, json!([]));
}

#[tokio::test]
async fn test_out_of_range_amounts_are_400() {
    let app = setup();
    let (client, steak, _) = seed(&app).await;
    let (status, gold) = send(
        &app,
        "POST",
        "/products",
        Some(json!({"name": "Gold leaf", "price": 1.0e9, "stock": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let gold = gold["id"].as_i64().unwrap();

    for body in [
        json!({"client_id": client, "lines": [{"product_id": gold, "quantity": 4_000_000_000u64}]}),
        json!({"client_id": client, "lines": [{"product_id": steak, "quantity": 2_147_483_648u64}]}),
        json!({"client_id": client, "lines": [{"product_id": gold, "quantity": 2_147_483_647}]}),
    ] {
        let (status, json) = send(&app, "POST", "/orders", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    let (_, orders) = send(&app, "GET", "/orders", None).await;
    assert_eq!(orders, json!([]));
}

#[tokio::test]
async fn test_malformed_body_is_422() {
    let app = setup();

    let (status, _) = send(&app, "POST", "/orders", Some(json!({"lines": "nope"}))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_list_orders_by_client_and_day() {
    let app = setup();
    let (client, _, _) = seed(&app).await;

    for date in ["2024-05-01T09:00:00Z", "2024-05-01T21:30:00Z", "2024-05-03T12:00:00Z"] {
        let (status, _) = send(
            &app,
            "POST",
            "/orders",
            Some(json!({"client_id": client, "date": date, "lines": []})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, found) = send(
        &app,
        "GET",
        &format!("/orders?client_id={client}&date=2024-05-01"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 2);

    let (status, none) = send(&app, "GET", "/orders?date=2023-01-01", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(none, json!([]));

    let (status, _) = send(&app, "GET", "/orders?date=01-05-2024", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_product_with_unknown_category() {
    let app = setup();
    let (_, drinks) = send(&app, "POST", "/categories", Some(json!({"name": "Drinks"}))).await;

    let (status, json) = send(
        &app,
        "POST",
        "/products",
        Some(json!({"name": "Cola", "price": 2.5, "category_id": 77})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = json["error"].as_str().unwrap();
    assert!(message.contains(&format!("{} - Drinks", drinks["id"])));
}

#[tokio::test]
async fn test_users_and_login() {
    let app = setup();
    let (_, role) = send(&app, "POST", "/roles", Some(json!({"name": "serveur"}))).await;
    assert_eq!(role["name"], "waiter");

    let (status, user) = send(
        &app,
        "POST",
        "/users",
        Some(json!({
            "last_name": "Bernard",
            "first_name": "Luc",
            "email": "luc@example.com",
            "password": "luc-password-1",
            "role_id": role["id"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(user.get("password_hash").is_none());
    assert!(user.get("password").is_none());

    let (status, _) = send(
        &app,
        "POST",
        "/users",
        Some(json!({
            "last_name": "Other",
            "first_name": "Luc",
            "email": "luc@example.com",
            "password": "another-password"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, login) = send(
        &app,
        "POST",
        "/login",
        Some(json!({"email": "luc@example.com", "password": "luc-password-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["message"], "Login OK");
    assert_eq!(login["user"]["id"], user["id"]);

    let (status, _) = send(
        &app,
        "POST",
        "/login",
        Some(json!({"email": "luc@example.com", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, deleted) = send(&app, "DELETE", &format!("/roles/{}", role["id"]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["unassigned_users"], json!([user["id"]]));

    let (_, reloaded) = send(&app, "GET", "/users/by-email/luc@example.com", None).await;
    assert_eq!(reloaded["role_id"], Value::Null);
}

#[tokio::test]
async fn test_patch_null_clears_optional_fields() {
    let app = setup();
    let (_, product) = send(
        &app,
        "POST",
        "/products",
        Some(json!({"name": "Tarte", "description": "Aux pommes", "price": 6.5})),
    )
    .await;
    let product_uri = format!("/products/{}", product["id"]);

    let (_, renamed) = send(&app, "PATCH", &product_uri, Some(json!({"name": "Tarte fine"}))).await;
    assert_eq!(renamed["description"], "Aux pommes");

    let (status, cleared) =
        send(&app, "PATCH", &product_uri, Some(json!({"description": null}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["description"], Value::Null);
    assert_eq!(cleared["name"], "Tarte fine");

    let (_, user) = send(
        &app,
        "POST",
        "/users",
        Some(json!({
            "last_name": "Petit",
            "first_name": "Anne",
            "email": "anne@example.com",
            "address": "3 place du Marche",
            "phone": "0611223344",
            "password": "anne-password-9"
        })),
    )
    .await;
    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/users/{}", user["id"]),
        Some(json!({"phone": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["phone"], Value::Null);
    assert_eq!(updated["address"], "3 place du Marche");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    let (client, _, _) = seed(&app).await;
    send(
        &app,
        "POST",
        "/orders",
        Some(json!({"client_id": client, "lines": []})),
    )
    .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_created_total"));
}
