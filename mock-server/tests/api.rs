use axum::http::{self, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine};
use chargify_mock_server::app;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

const KEY: &str = "test-key";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn auth(key: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{key}:x")))
}

fn request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header(http::header::AUTHORIZATION, auth(KEY))
        .body(body.to_string())
        .unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let body = if body.is_null() { String::new() } else { body.to_string() };
    let resp = app.clone().oneshot(request(method, uri, &body)).await.unwrap();
    let status = resp.status();
    let bytes = body_bytes(resp).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn seed_product(app: &Router) -> i64 {
    let (status, family) = send(
        app,
        "POST",
        "/product_families",
        json!({"product_family": {"name": "Plans"}}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let family_id = family["product_family"]["id"].as_i64().unwrap();

    let (status, product) = send(
        app,
        "POST",
        &format!("/product_families/{family_id}/products"),
        json!({"product": {"name": "Basic", "handle": "basic", "price_in_cents": 1000, "interval": 1, "interval_unit": "month"}}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    product["product"]["id"].as_i64().unwrap()
}

async fn seed_customer(app: &Router, reference: &str) -> i64 {
    let (status, customer) = send(
        app,
        "POST",
        "/customers",
        json!({"customer": {"first_name": "Ada", "last_name": "Lovelace", "email": "ada@example.com", "reference": reference}}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    customer["customer"]["id"].as_i64().unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_credentials_are_rejected() {
    let resp = app(KEY)
        .oneshot(Request::builder().uri("/customers").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_bytes(resp).await, "HTTP Basic: Access denied.\n");
}

#[tokio::test]
async fn wrong_key_is_rejected() {
    let resp = app(KEY)
        .oneshot(
            Request::builder()
                .uri("/customers")
                .header(http::header::AUTHORIZATION, auth("other-key"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- customers ---

#[tokio::test]
async fn list_customers_empty() {
    let resp = app(KEY).oneshot(request("GET", "/customers", "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn create_customer_returns_envelope() {
    let app = app(KEY);
    let (status, body) = send(
        &app,
        "POST",
        "/customers",
        json!({"customer": {"first_name": "Ada", "last_name": "Lovelace", "email": "ada@example.com"}}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["customer"]["first_name"], "Ada");
    assert!(body["customer"]["id"].is_i64());
}

#[tokio::test]
async fn create_customer_reports_blank_fields() {
    let app = app(KEY);
    let (status, body) = send(&app, "POST", "/customers", json!({"customer": {"first_name": "Ada"}})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body,
        json!({"errors": ["Last name: cannot be blank.", "Email address: cannot be blank."]})
    );
}

#[tokio::test]
async fn get_customer_with_and_without_suffix() {
    let app = app(KEY);
    let id = seed_customer(&app, "ada").await;

    let (status, body) = send(&app, "GET", &format!("/customers/{id}.json"), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer"]["reference"], "ada");

    let (status, _) = send(&app, "GET", &format!("/customers/{id}"), Value::Null).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/customers/999.json", Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lookup_by_reference() {
    let app = app(KEY);
    let id = seed_customer(&app, "ada-1").await;

    let (status, body) = send(&app, "GET", "/customers/lookup.json?reference=ada-1", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer"]["id"], id);

    let (status, _) = send(&app, "GET", "/customers/lookup.json?reference=nobody", Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_customer_partial() {
    let app = app(KEY);
    let id = seed_customer(&app, "ada").await;
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/customers/{id}"),
        json!({"customer": {"organization": "Analytical Engines"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer"]["organization"], "Analytical Engines");
    assert_eq!(body["customer"]["email"], "ada@example.com");
}

#[tokio::test]
async fn search_and_paginate_customers() {
    let app = app(KEY);
    seed_customer(&app, "a").await;
    seed_customer(&app, "b").await;
    send(
        &app,
        "POST",
        "/customers",
        json!({"customer": {"first_name": "Alan", "last_name": "Turing", "email": "alan@example.com"}}),
    )
    .await;

    let (_, found) = send(&app, "GET", "/customers?q=turing", Value::Null).await;
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (_, page) = send(&app, "GET", "/customers?direction=desc&page=1&per_page=2", Value::Null).await;
    let page = page.as_array().unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0]["customer"]["first_name"], "Alan");
}

#[tokio::test]
async fn delete_customer_blocked_by_subscriptions() {
    let app = app(KEY);
    seed_product(&app).await;
    let id = seed_customer(&app, "ada").await;
    let (status, _) = send(
        &app,
        "POST",
        "/subscriptions",
        json!({"subscription": {"product_handle": "basic", "customer_id": id}}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, "DELETE", &format!("/customers/{id}"), Value::Null).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let other = seed_customer(&app, "other").await;
    let (status, body) = send(&app, "DELETE", &format!("/customers/{other}"), Value::Null).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
}

// --- products ---

#[tokio::test]
async fn product_lookup_and_archive() {
    let app = app(KEY);
    let id = seed_product(&app).await;

    let (status, body) = send(&app, "GET", "/products/handle/basic", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["id"], id);
    assert_eq!(body["product"]["product_family"]["handle"], "plans");

    let (status, body) = send(&app, "DELETE", &format!("/products/{id}"), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["product"]["archived_at"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        "/subscriptions",
        json!({"subscription": {"product_handle": "basic", "customer_attributes": {"first_name": "A", "last_name": "B", "email": "a@b.c"}}}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0], "Product: has been archived.");
}

#[tokio::test]
async fn family_products_listing() {
    let app = app(KEY);
    seed_product(&app).await;
    let (_, families) = send(&app, "GET", "/product_families.json", Value::Null).await;
    let family_id = families[0]["product_family"]["id"].as_i64().unwrap();

    let (status, products) = send(
        &app,
        "GET",
        &format!("/product_families/{family_id}/products.json"),
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products[0]["product"]["handle"], "basic");
}

// --- subscriptions ---

#[tokio::test]
async fn subscription_embeds_customer_and_product() {
    let app = app(KEY);
    seed_product(&app).await;
    let customer_id = seed_customer(&app, "ada").await;

    let (status, body) = send(
        &app,
        "POST",
        "/subscriptions",
        json!({"subscription": {"product_handle": "basic", "customer_reference": "ada"}}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let sub = &body["subscription"];
    assert_eq!(sub["state"], "active");
    assert_eq!(sub["customer"]["id"], customer_id);
    assert_eq!(sub["product"]["handle"], "basic");

    let (_, listed) = send(
        &app,
        "GET",
        &format!("/customers/{customer_id}/subscriptions.json"),
        Value::Null,
    )
    .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn subscription_needs_known_product() {
    let app = app(KEY);
    let customer_id = seed_customer(&app, "ada").await;
    let (status, body) = send(
        &app,
        "POST",
        "/subscriptions",
        json!({"subscription": {"product_handle": "missing", "customer_id": customer_id}}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0], "A valid Product must be specified.");
}

#[tokio::test]
async fn delayed_cancel_then_remove_then_cancel() {
    let app = app(KEY);
    seed_product(&app).await;
    let customer_id = seed_customer(&app, "ada").await;
    let (_, created) = send(
        &app,
        "POST",
        "/subscriptions",
        json!({"subscription": {"product_handle": "basic", "customer_id": customer_id}}),
    )
    .await;
    let id = created["subscription"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/subscriptions/{id}/delayed_cancel"),
        json!({"cancellation_message": "Too expensive", "reason_code": "price"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscription"]["cancel_at_end_of_period"], true);
    assert_eq!(body["subscription"]["reason_code"], "price");

    let (status, _) = send(&app, "DELETE", &format!("/subscriptions/{id}/delayed_cancel"), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, "GET", &format!("/subscriptions/{id}"), Value::Null).await;
    assert_eq!(body["subscription"]["cancel_at_end_of_period"], false);

    let (status, body) = send(&app, "DELETE", &format!("/subscriptions/{id}"), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscription"]["state"], "canceled");

    let (_, active) = send(&app, "GET", "/subscriptions.json?state=active", Value::Null).await;
    assert_eq!(active, json!([]));
}

// --- billing portal ---

#[tokio::test]
async fn portal_enable_and_fetch_link() {
    let app = app(KEY);
    let id = seed_customer(&app, "ada").await;

    let (status, _) = send(&app, "GET", &format!("/portal/customers/{id}/management_link"), Value::Null).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(&app, "POST", &format!("/portal/customers/{id}/enable?invite=1"), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["customer"]["portal_invite_last_sent_at"].is_string());

    let (status, _) = send(&app, "POST", &format!("/portal/customers/{id}/enable"), Value::Null).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, first) = send(&app, "GET", &format!("/portal/customers/{id}/management_link"), Value::Null).await;
    let (_, second) = send(&app, "GET", &format!("/portal/customers/{id}/management_link"), Value::Null).await;
    assert_eq!(first["fetch_count"], 1);
    assert_eq!(second["fetch_count"], 2);
    assert!(second["url"].as_str().unwrap().starts_with("https://"));
}
