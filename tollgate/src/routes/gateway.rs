//! Gateway routes
//!
//! Every request passes the authorization gate first. Authorized requests
//! are then either answered in-process (`/api/me`, health) or forwarded to
//! the service owning the path prefix.
//!
//! ```text
//! client → gateway ──(gate)──┬─ /api/auth*    → auth service
//!                            └─ /api/product* → product service
//! ```

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderName, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use tollgate_auth::{Authorization, Claims, Gate, GateError};

use super::health::{health_check, is_health_path};
use super::http::{cors_preflight, error_response, get_auth_header, json_response, not_found_response};
use crate::server::RequestHandler;
use crate::types::{Result, ServiceError};

pub const GATEWAY_BODY_LIMIT: usize = 1024 * 1024;
pub const ME_PATH: &str = "/api/me";
pub const AUTH_PREFIX: &str = "/api/auth";
pub const PRODUCT_PREFIX: &str = "/api/product";

/// Identity headers the gateway sets on forwarded requests.
/// Client-supplied copies are always stripped first.
pub const USER_ID_HEADER: &str = "x-auth-user-id";
pub const USER_LOGIN_HEADER: &str = "x-auth-login";
pub const USER_ADMIN_HEADER: &str = "x-auth-is-admin";

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Gateway router
pub struct GatewayState {
    gate: Gate,
    auth_service_url: String,
    product_service_url: String,
    http_client: reqwest::Client,
}

impl GatewayState {
    pub fn new(
        gate: Gate,
        auth_service_url: impl Into<String>,
        product_service_url: impl Into<String>,
        forward_timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(forward_timeout)
            .build()
            .map_err(|e| ServiceError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            gate,
            auth_service_url: auth_service_url.into(),
            product_service_url: product_service_url.into(),
            http_client,
        })
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    fn upstream_for(&self, path: &str) -> Option<&str> {
        if path.starts_with(AUTH_PREFIX) {
            Some(&self.auth_service_url)
        } else if path.starts_with(PRODUCT_PREFIX) {
            Some(&self.product_service_url)
        } else {
            None
        }
    }
}

#[async_trait::async_trait]
impl RequestHandler for GatewayState {
    fn name(&self) -> &'static str {
        "gateway"
    }

    fn body_limit(&self) -> usize {
        GATEWAY_BODY_LIMIT
    }

    async fn handle(&self, addr: SocketAddr, req: Request<Bytes>) -> Response<Full<Bytes>> {
        handle_gateway_request(self, addr, req).await
    }
}

/// Gate, then route
pub async fn handle_gateway_request(
    state: &GatewayState,
    addr: SocketAddr,
    mut req: Request<Bytes>,
) -> Response<Full<Bytes>> {
    // Preflight carries no credentials
    if req.method() == Method::OPTIONS {
        return cors_preflight();
    }

    let path = req.uri().path().to_string();

    let authorization = match state.gate.authorize(&path, get_auth_header(&req)).await {
        Ok(authorization) => authorization,
        Err(e) => {
            if let GateError::Unavailable(ref detail) = e {
                error!(path = %path, error = %detail, "Token verification unavailable");
            }
            let outcome = e.client_outcome();
            let status =
                StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return error_response(status, outcome.message());
        }
    };

    if let Authorization::Authenticated(claims) = authorization {
        req.extensions_mut().insert(claims);
    }

    if path == ME_PATH {
        return if req.method() == Method::GET {
            handle_me(&req)
        } else {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        };
    }

    if req.method() == Method::GET && is_health_path(&path) {
        return health_check("gateway", Some(state.gate.verifier_name()));
    }

    match state.upstream_for(&path) {
        Some(upstream) => forward(&state.http_client, upstream, addr, req).await,
        None => not_found_response(&path),
    }
}

/// GET /api/me - identity from the claims the gate attached
fn handle_me(req: &Request<Bytes>) -> Response<Full<Bytes>> {
    match req.extensions().get::<Claims>() {
        Some(claims) => json_response(StatusCode::OK, &claims.identity()),
        // Only reachable when /api/me is configured as public
        None => error_response(StatusCode::UNAUTHORIZED, "Unauthorized"),
    }
}

/// Forward a request to `upstream`, keeping path, query, method and body
async fn forward(
    client: &reqwest::Client,
    upstream: &str,
    addr: SocketAddr,
    req: Request<Bytes>,
) -> Response<Full<Bytes>> {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", upstream.trim_end_matches('/'), path_and_query);

    debug!(url = %url, "Forwarding request");

    let (parts, body) = req.into_parts();
    let mut headers = reqwest::header::HeaderMap::new();
    for (name, value) in parts.headers.iter() {
        if is_forwardable(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers.insert(
        HeaderName::from_static("x-forwarded-for"),
        HeaderValue::from_str(&addr.ip().to_string()).unwrap_or(HeaderValue::from_static("unknown")),
    );
    if let Some(claims) = parts.extensions.get::<Claims>() {
        insert_identity_headers(&mut headers, claims);
    }

    let result = client
        .request(parts.method.clone(), &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let response = match result {
        Ok(response) => response,
        Err(e) => return upstream_error(&url, e),
    };

    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or(HeaderValue::from_static("application/json"));

    match response.bytes().await {
        Ok(body) => {
            info!(status = %status, size = body.len(), url = %url, "Forwarded response");
            Response::builder()
                .status(status)
                .header(header::CONTENT_TYPE, content_type)
                .header("Access-Control-Allow-Origin", "*")
                .body(Full::new(body))
                .unwrap()
        }
        Err(e) => upstream_error(&url, e),
    }
}

fn is_forwardable(name: &HeaderName) -> bool {
    let name = name.as_str();
    name != header::HOST.as_str()
        && name != header::CONTENT_LENGTH.as_str()
        && !HOP_BY_HOP.contains(&name)
        && !name.starts_with("x-auth-")
}

fn insert_identity_headers(headers: &mut reqwest::header::HeaderMap, claims: &Claims) {
    for (name, value) in [
        (USER_ID_HEADER, claims.id.as_str()),
        (USER_LOGIN_HEADER, claims.login.as_str()),
        (USER_ADMIN_HEADER, if claims.is_admin { "true" } else { "false" }),
    ] {
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
}

fn upstream_error(url: &str, err: reqwest::Error) -> Response<Full<Bytes>> {
    if err.is_timeout() {
        warn!(error = %err, url = %url, "Upstream request timed out");
        error_response(StatusCode::GATEWAY_TIMEOUT, "Upstream service timed out")
    } else {
        warn!(error = %err, url = %url, "Failed to forward to upstream");
        error_response(StatusCode::BAD_GATEWAY, "Upstream service unavailable")
    }
}
