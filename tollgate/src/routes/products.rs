//! Product catalogue routes
//!
//! `/api/product` with the target selected by query string:
//! - POST               - create (201)
//! - GET ?id=           - one product (404 when absent)
//! - GET ?limit=        - newest first, default 10
//! - PUT ?id=           - replace name/price/quantity (404 when absent)
//! - DELETE ?id=        - remove (404 when absent)
//!
//! The service trusts the gateway in front of it and performs no
//! authorization of its own. The identity the gateway forwards is recorded
//! in the logs of every write.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::Full;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::gateway::{USER_ADMIN_HEADER, USER_ID_HEADER, USER_LOGIN_HEADER};
use super::health::{health_check, is_health_path};
use super::http::{
    cors_preflight, json_response, message_response, method_not_allowed, not_found_response,
    parse_json_body, parse_query, service_error_response,
};
use crate::server::RequestHandler;
use crate::types::{Result, ServiceError};

pub const PRODUCT_PATH: &str = "/api/product";
pub const PRODUCT_BODY_LIMIT: usize = 1024 * 1024;
pub const DEFAULT_LIST_LIMIT: usize = 10;

// =============================================================================
// Model
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Client-supplied fields; id and timestamps are assigned by the server
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub quantity: i64,
}

impl ProductInput {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::BadRequest("name must not be empty".into()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ServiceError::BadRequest("price must be a non-negative number".into()));
        }
        if self.quantity < 0 {
            return Err(ServiceError::BadRequest("quantity must not be negative".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProductQuery {
    id: Option<String>,
    limit: Option<String>,
}

impl ProductQuery {
    fn required_id(&self) -> Result<&str> {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(ServiceError::BadRequest("query parameter 'id' is required".into())),
        }
    }

    /// Unparsable or non-positive limits fall back to the default
    fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|l| l.parse::<usize>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIST_LIMIT)
    }
}

/// Caller identity as forwarded by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser {
    pub id: String,
    pub login: String,
    pub is_admin: bool,
}

impl ActingUser {
    /// `None` when the request did not come through the gateway
    pub fn from_request<B>(req: &Request<B>) -> Option<Self> {
        let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());

        Some(Self {
            id: header(USER_ID_HEADER)?.to_string(),
            login: header(USER_LOGIN_HEADER)?.to_string(),
            is_admin: header(USER_ADMIN_HEADER) == Some("true"),
        })
    }
}

fn actor(req: &Request<Bytes>) -> String {
    ActingUser::from_request(req)
        .map(|user| user.id)
        .unwrap_or_else(|| "anonymous".to_string())
}

// =============================================================================
// Store
// =============================================================================

struct Entry {
    seq: u64,
    product: Product,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    products: HashMap<String, Entry>,
}

/// In-memory product store
#[derive(Clone, Default)]
pub struct ProductStore {
    inner: Arc<RwLock<Inner>>,
}

impl ProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, input: ProductInput) -> Product {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            price: input.price,
            quantity: input.quantity,
            created_at: Utc::now(),
            updated_at: None,
        };

        let mut inner = self.inner.write().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.products.insert(
            product.id.clone(),
            Entry {
                seq,
                product: product.clone(),
            },
        );
        product
    }

    pub async fn get(&self, id: &str) -> Option<Product> {
        self.inner
            .read()
            .await
            .products
            .get(id)
            .map(|e| e.product.clone())
    }

    /// Newest first
    pub async fn list(&self, limit: usize) -> Vec<Product> {
        let inner = self.inner.read().await;
        let mut entries: Vec<&Entry> = inner.products.values().collect();
        entries.sort_by(|a, b| b.seq.cmp(&a.seq));
        entries
            .into_iter()
            .take(limit)
            .map(|e| e.product.clone())
            .collect()
    }

    pub async fn update(&self, id: &str, input: ProductInput) -> Option<Product> {
        let mut inner = self.inner.write().await;
        let entry = inner.products.get_mut(id)?;
        entry.product.name = input.name;
        entry.product.price = input.price;
        entry.product.quantity = input.quantity;
        entry.product.updated_at = Some(Utc::now());
        Some(entry.product.clone())
    }

    pub async fn delete(&self, id: &str) -> bool {
        self.inner.write().await.products.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.products.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn seed_demo_products(&self) {
        for (name, price, quantity) in [("Laptop", 1200.50, 10), ("Phone", 700.00, 25), ("Headphones", 150.00, 40)] {
            self.create(ProductInput {
                name: name.to_string(),
                price,
                quantity,
            })
            .await;
        }
        info!(count = self.len().await, "Seeded demo products");
    }
}

// =============================================================================
// Routes
// =============================================================================

/// Product service router
pub struct ProductState {
    store: ProductStore,
}

impl ProductState {
    pub fn new(store: ProductStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ProductStore {
        &self.store
    }
}

#[async_trait::async_trait]
impl RequestHandler for ProductState {
    fn name(&self) -> &'static str {
        "product-service"
    }

    fn body_limit(&self) -> usize {
        PRODUCT_BODY_LIMIT
    }

    async fn handle(&self, _addr: SocketAddr, req: Request<Bytes>) -> Response<Full<Bytes>> {
        handle_product_request(self, req).await
    }
}

pub async fn handle_product_request(state: &ProductState, req: Request<Bytes>) -> Response<Full<Bytes>> {
    let path = req.uri().path();

    if req.method() == Method::OPTIONS {
        return cors_preflight();
    }
    if req.method() == Method::GET && is_health_path(path) {
        return health_check("product-service", None);
    }
    if path != PRODUCT_PATH {
        return not_found_response(path);
    }

    let result = match *req.method() {
        Method::POST => create(state, &req).await,
        Method::GET => get(state, &req).await,
        Method::PUT => update(state, &req).await,
        Method::DELETE => delete(state, &req).await,
        _ => return method_not_allowed(),
    };

    result.unwrap_or_else(service_error_response)
}

fn query(req: &Request<Bytes>) -> Result<ProductQuery> {
    parse_query(req.uri().query())
}

async fn create(state: &ProductState, req: &Request<Bytes>) -> Result<Response<Full<Bytes>>> {
    let input: ProductInput = parse_json_body(req.body())?;
    input.validate()?;

    let product = state.store.create(input).await;
    info!(id = %product.id, name = %product.name, by = %actor(req), "Product created");
    Ok(json_response(StatusCode::CREATED, &product))
}

async fn get(state: &ProductState, req: &Request<Bytes>) -> Result<Response<Full<Bytes>>> {
    let query = query(req)?;

    if let Some(id) = query.id.as_deref().filter(|id| !id.is_empty()) {
        return match state.store.get(id).await {
            Some(product) => Ok(json_response(StatusCode::OK, &product)),
            None => Err(ServiceError::NotFound(format!("product {id}"))),
        };
    }

    let limit = query.limit();
    let products = state.store.list(limit).await;
    debug!(limit, count = products.len(), "Listed products");
    Ok(json_response(StatusCode::OK, &products))
}

async fn update(state: &ProductState, req: &Request<Bytes>) -> Result<Response<Full<Bytes>>> {
    let query = query(req)?;
    let id = query.required_id()?;
    let input: ProductInput = parse_json_body(req.body())?;
    input.validate()?;

    match state.store.update(id, input).await {
        Some(_) => {
            info!(id = %id, by = %actor(req), "Product updated");
            Ok(message_response(StatusCode::OK, "Product updated"))
        }
        None => Err(ServiceError::NotFound(format!("product {id}"))),
    }
}

async fn delete(state: &ProductState, req: &Request<Bytes>) -> Result<Response<Full<Bytes>>> {
    let query = query(req)?;
    let id = query.required_id()?;

    if state.store.delete(id).await {
        info!(id = %id, by = %actor(req), "Product deleted");
        Ok(message_response(StatusCode::OK, "Product deleted"))
    } else {
        Err(ServiceError::NotFound(format!("product {id}")))
    }
}
