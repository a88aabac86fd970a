//! A small in-memory imitation of the Chargify REST API.
//!
//! Covers customers, product families, products, subscriptions, and the
//! billing portal closely enough to drive the client's integration tests.
//! Requests must carry HTTP basic auth with the configured API key as the
//! username; the password is ignored.

pub mod store;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

use store::{
    CustomerFields, ProductFamilyFields, ProductFields, Store, Subscription, SubscriptionFields,
};

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    api_key: Arc<str>,
    db: Db,
}

#[derive(Debug)]
pub enum MockError {
    Unauthorized,
    NotFound,
    Invalid(Vec<String>),
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        match self {
            MockError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "HTTP Basic: Access denied.\n").into_response()
            }
            MockError::NotFound => StatusCode::NOT_FOUND.into_response(),
            MockError::Invalid(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "errors": errors }))).into_response()
            }
        }
    }
}

type ApiResult = Result<(StatusCode, Json<Value>), MockError>;

pub fn app(api_key: &str) -> Router {
    let state = AppState {
        api_key: Arc::from(api_key),
        db: Arc::new(RwLock::new(Store::default())),
    };
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route("/customers/lookup.json", get(lookup_customer))
        .route(
            "/customers/{id}",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/customers/{id}/subscriptions.json", get(customer_subscriptions))
        .route("/product_families", post(create_family))
        .route("/product_families.json", get(list_families))
        .route("/product_families/{id}", get(get_family))
        .route("/product_families/{id}/products", post(create_product))
        .route("/product_families/{id}/products.json", get(family_products))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(archive_product),
        )
        .route("/products/handle/{handle}", get(product_by_handle))
        .route("/subscriptions", post(create_subscription))
        .route("/subscriptions.json", get(list_subscriptions))
        .route(
            "/subscriptions/{id}",
            get(get_subscription)
                .put(update_subscription)
                .delete(cancel_subscription),
        )
        .route(
            "/subscriptions/{id}/delayed_cancel",
            post(delay_cancellation).delete(remove_delayed_cancellation),
        )
        .route("/portal/customers/{id}/enable", post(enable_portal))
        .route("/portal/customers/{id}/management_link", get(management_link))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

pub async fn run(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(api_key)).await
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let user = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .and_then(|pair| pair.split_once(':').map(|(user, _)| user.to_string()));
    if user.as_deref() != Some(&*state.api_key) {
        debug!(path = %request.uri().path(), "rejected request with bad credentials");
        return MockError::Unauthorized.into_response();
    }
    next.run(request).await
}

/// Ids arrive as whole path segments, with or without a `.json` suffix.
fn parse_id(raw: &str) -> Result<i64, MockError> {
    raw.trim_end_matches(".json")
        .parse()
        .map_err(|_| MockError::NotFound)
}

/// Reads `{"<key>": {...}}` from a request body. An empty body or a missing
/// key yields the default.
fn read_envelope<T: DeserializeOwned + Default>(body: &Bytes, key: &str) -> Result<T, MockError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let mut value: Value =
        serde_json::from_slice(body).map_err(|e| MockError::Invalid(vec![e.to_string()]))?;
    match value.get_mut(key).map(Value::take) {
        Some(inner) => {
            serde_json::from_value(inner).map_err(|e| MockError::Invalid(vec![e.to_string()]))
        }
        None => Ok(T::default()),
    }
}

fn enveloped<T: Serialize>(key: &str, value: &T) -> Value {
    let mut map = Map::new();
    map.insert(
        key.to_string(),
        serde_json::to_value(value).unwrap_or(Value::Null),
    );
    Value::Object(map)
}

fn list_of<T: Serialize>(key: &str, items: &[T]) -> Json<Value> {
    Json(Value::Array(items.iter().map(|item| enveloped(key, item)).collect()))
}

fn ok<T: Serialize>(key: &str, value: &T) -> ApiResult {
    Ok((StatusCode::OK, Json(enveloped(key, value))))
}

fn created<T: Serialize>(key: &str, value: &T) -> ApiResult {
    Ok((StatusCode::CREATED, Json(enveloped(key, value))))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub direction: Option<String>,
    pub q: Option<String>,
    pub state: Option<String>,
    pub product: Option<String>,
}

impl ListParams {
    fn paginate<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if self.direction.as_deref() == Some("desc") {
            items.reverse();
        }
        let per_page = self.per_page.unwrap_or(50).max(1);
        let page = self.page.unwrap_or(1).max(1);
        items
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .collect()
    }
}

// customers

async fn create_customer(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let fields: CustomerFields = read_envelope(&body, "customer")?;
    let customer = state
        .db
        .write()
        .await
        .create_customer(fields)
        .map_err(MockError::Invalid)?;
    debug!(id = customer.id, "customer created");
    created("customer", &customer)
}

async fn list_customers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Value> {
    let db = state.db.read().await;
    let customers = params.paginate(db.search_customers(params.q.as_deref()));
    list_of("customer", &customers)
}

#[derive(Deserialize)]
pub struct Lookup {
    reference: String,
}

async fn lookup_customer(State(state): State<AppState>, Query(lookup): Query<Lookup>) -> ApiResult {
    let db = state.db.read().await;
    let customer = db
        .customer_by_reference(&lookup.reference)
        .ok_or(MockError::NotFound)?;
    ok("customer", &customer)
}

async fn get_customer(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id)?;
    let db = state.db.read().await;
    let customer = db.customers.get(&id).ok_or(MockError::NotFound)?;
    ok("customer", customer)
}

async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult {
    let id = parse_id(&id)?;
    let fields: CustomerFields = read_envelope(&body, "customer")?;
    let customer = state
        .db
        .write()
        .await
        .update_customer(id, fields)
        .map_err(MockError::Invalid)?
        .ok_or(MockError::NotFound)?;
    ok("customer", &customer)
}

async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, MockError> {
    let id = parse_id(&id)?;
    let mut db = state.db.write().await;
    if !db.customers.contains_key(&id) {
        return Err(MockError::NotFound);
    }
    if db.subscriptions.values().any(|s| s.customer_id == id) {
        return Err(MockError::Invalid(vec![
            "Customer cannot be deleted while it has subscriptions.".to_string(),
        ]));
    }
    db.customers.remove(&id);
    db.portal_fetches.remove(&id);
    debug!(id, "customer deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn customer_subscriptions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, MockError> {
    let id = parse_id(&id)?;
    let db = state.db.read().await;
    if !db.customers.contains_key(&id) {
        return Err(MockError::NotFound);
    }
    Ok(list_of("subscription", &db.subscriptions_where(|s| s.customer_id == id)))
}

// product families and products

async fn create_family(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let fields: ProductFamilyFields = read_envelope(&body, "product_family")?;
    let family = state
        .db
        .write()
        .await
        .create_family(fields)
        .map_err(MockError::Invalid)?;
    created("product_family", &family)
}

async fn list_families(State(state): State<AppState>) -> Json<Value> {
    let db = state.db.read().await;
    let families: Vec<_> = db.families.values().cloned().collect();
    list_of("product_family", &families)
}

async fn get_family(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id)?;
    let db = state.db.read().await;
    let family = db.families.get(&id).ok_or(MockError::NotFound)?;
    ok("product_family", family)
}

async fn create_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult {
    let family_id = parse_id(&id)?;
    let fields: ProductFields = read_envelope(&body, "product")?;
    let product = state
        .db
        .write()
        .await
        .create_product(family_id, fields)
        .map_err(MockError::Invalid)?
        .ok_or(MockError::NotFound)?;
    debug!(id = product.id, handle = %product.handle, "product created");
    created("product", &product)
}

async fn family_products(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, MockError> {
    let family_id = parse_id(&id)?;
    let db = state.db.read().await;
    if !db.families.contains_key(&family_id) {
        return Err(MockError::NotFound);
    }
    let products: Vec<_> = db
        .products
        .values()
        .filter(|p| p.product_family.id == family_id)
        .cloned()
        .collect();
    Ok(list_of("product", &products))
}

async fn get_product(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id)?;
    let db = state.db.read().await;
    let product = db.products.get(&id).ok_or(MockError::NotFound)?;
    ok("product", product)
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult {
    let id = parse_id(&id)?;
    let fields: ProductFields = read_envelope(&body, "product")?;
    let product = state
        .db
        .write()
        .await
        .update_product(id, fields)
        .ok_or(MockError::NotFound)?;
    ok("product", &product)
}

async fn archive_product(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id)?;
    let mut db = state.db.write().await;
    let product = db.products.get_mut(&id).ok_or(MockError::NotFound)?;
    product.archived_at.get_or_insert_with(Utc::now);
    ok("product", &*product)
}

async fn product_by_handle(State(state): State<AppState>, Path(handle): Path<String>) -> ApiResult {
    let db = state.db.read().await;
    let product = db
        .product_by_handle(handle.trim_end_matches(".json"))
        .ok_or(MockError::NotFound)?;
    ok("product", &product)
}

// subscriptions

async fn create_subscription(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let fields: SubscriptionFields = read_envelope(&body, "subscription")?;
    let subscription = state
        .db
        .write()
        .await
        .create_subscription(fields)
        .map_err(MockError::Invalid)?;
    debug!(id = subscription.id, state = %subscription.state, "subscription created");
    created("subscription", &subscription)
}

async fn list_subscriptions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Value> {
    let db = state.db.read().await;
    let all = db.subscriptions_where(|s| params.state.as_deref().map_or(true, |st| s.state == st));
    let filtered: Vec<Subscription> = all
        .into_iter()
        .filter(|s| {
            params.product.as_deref().map_or(true, |p| {
                s.product.handle == p || s.product.id.to_string() == p
            })
        })
        .collect();
    list_of("subscription", &params.paginate(filtered))
}

async fn get_subscription(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id)?;
    let db = state.db.read().await;
    let subscription = db.subscription(id).ok_or(MockError::NotFound)?;
    ok("subscription", &subscription)
}

async fn update_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult {
    let id = parse_id(&id)?;
    let fields: SubscriptionFields = read_envelope(&body, "subscription")?;
    let mut db = state.db.write().await;
    if !db.subscriptions.contains_key(&id) {
        return Err(MockError::NotFound);
    }
    if let Some(handle) = fields.product_handle.as_deref() {
        let product = db.product_by_handle(handle).ok_or_else(|| {
            MockError::Invalid(vec!["A valid Product must be specified.".to_string()])
        })?;
        if let Some(record) = db.subscriptions.get_mut(&id) {
            record.product_id = product.id;
            record.updated_at = Utc::now();
        }
    }
    let subscription = db.subscription(id).ok_or(MockError::NotFound)?;
    ok("subscription", &subscription)
}

async fn cancel_subscription(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id)?;
    let mut db = state.db.write().await;
    let record = db.subscriptions.get_mut(&id).ok_or(MockError::NotFound)?;
    if record.state == "canceled" {
        return Err(MockError::Invalid(vec![
            "The subscription is already canceled.".to_string(),
        ]));
    }
    let now = Utc::now();
    record.state = "canceled".to_string();
    record.canceled_at = Some(now);
    record.delayed_cancel_at = None;
    record.updated_at = now;
    debug!(id, "subscription canceled");
    let subscription = db.subscription(id).ok_or(MockError::NotFound)?;
    ok("subscription", &subscription)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DelayedCancel {
    pub cancellation_message: Option<String>,
    pub reason_code: Option<String>,
}

async fn delay_cancellation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult {
    let id = parse_id(&id)?;
    let reason: DelayedCancel = if body.is_empty() {
        DelayedCancel::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| MockError::Invalid(vec![e.to_string()]))?
    };
    let mut db = state.db.write().await;
    let record = db.subscriptions.get_mut(&id).ok_or(MockError::NotFound)?;
    if record.state == "canceled" {
        return Err(MockError::Invalid(vec![
            "The subscription is already canceled.".to_string(),
        ]));
    }
    record.delayed_cancel_at = Some(record.current_period_ends_at);
    record.cancellation_message = reason.cancellation_message;
    record.reason_code = reason.reason_code;
    record.updated_at = Utc::now();
    let subscription = db.subscription(id).ok_or(MockError::NotFound)?;
    ok("subscription", &subscription)
}

async fn remove_delayed_cancellation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let mut db = state.db.write().await;
    let record = db.subscriptions.get_mut(&id).ok_or(MockError::NotFound)?;
    record.delayed_cancel_at = None;
    record.cancellation_message = None;
    record.reason_code = None;
    record.updated_at = Utc::now();
    Ok((
        StatusCode::OK,
        Json(json!({ "message": "This subscription will no longer be canceled" })),
    ))
}

// billing portal

#[derive(Debug, Default, Deserialize)]
pub struct Invite {
    invite: Option<String>,
}

async fn enable_portal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(invite): Query<Invite>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let mut db = state.db.write().await;
    let customer = db.customers.get_mut(&id).ok_or(MockError::NotFound)?;
    if customer.portal_customer_created_at.is_some() {
        return Err(MockError::Invalid(vec![
            "Billing Portal is already enabled for this customer.".to_string(),
        ]));
    }
    let now = Utc::now();
    customer.portal_customer_created_at = Some(now);
    if invite.invite.as_deref() == Some("1") {
        customer.portal_invite_last_sent_at = Some(now);
    }
    let customer = customer.clone();
    db.portal_fetches.insert(id, 0);
    ok("customer", &customer)
}

async fn management_link(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id)?;
    let mut db = state.db.write().await;
    let customer = db.customers.get(&id).ok_or(MockError::NotFound)?;
    let Some(created_at) = customer.portal_customer_created_at else {
        return Err(MockError::Invalid(vec![
            "Billing Portal is not enabled for this customer.".to_string(),
        ]));
    };
    let fetches = db.portal_fetches.entry(id).or_insert(0);
    *fetches += 1;
    let fetch_count = *fetches;
    Ok((
        StatusCode::OK,
        Json(json!({
            "url": format!("https://portal.example.com/{id}/manage/{fetch_count}"),
            "fetch_count": fetch_count,
            "created_at": created_at,
            "new_link_available_at": created_at + Duration::minutes(15),
            "expires_at": created_at + Duration::days(65),
        })),
    ))
}
