//! HTTP Routes for Authentication
//!
//! - POST /api/auth      - Authenticate and get a token
//! - GET  /auth/validate - Verify the bearer token (used by the gateway)
//! - GET  /auth/me       - Public identity of the bearer
//! - GET  /health        - Liveness

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::Full;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::{error, warn};

use tollgate_auth::{extract_bearer, Claims, GateError, LoginError, LoginService, PublicIdentity};

use super::health::{health_check, is_health_path};
use super::http::{
    cors_preflight, error_response, get_auth_header, json_response, method_not_allowed,
    not_found_response, parse_json_body, empty_response,
};
use crate::server::RequestHandler;

/// Login and token endpoints accept small bodies only
pub const AUTH_BODY_LIMIT: usize = 64 * 1024;

pub const LOGIN_PATH: &str = "/api/auth";
pub const VALIDATE_PATH: &str = "/auth/validate";
pub const ME_PATH: &str = "/auth/me";

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: PublicIdentity,
}

// =============================================================================
// State
// =============================================================================

/// Auth service router
pub struct AuthState {
    login: LoginService,
}

impl AuthState {
    pub fn new(login: LoginService) -> Self {
        Self { login }
    }
}

#[async_trait::async_trait]
impl RequestHandler for AuthState {
    fn name(&self) -> &'static str {
        "auth-service"
    }

    fn body_limit(&self) -> usize {
        AUTH_BODY_LIMIT
    }

    async fn handle(&self, _addr: SocketAddr, req: Request<Bytes>) -> Response<Full<Bytes>> {
        handle_auth_request(self, req).await
    }
}

/// Route an auth service request
pub async fn handle_auth_request(state: &AuthState, req: Request<Bytes>) -> Response<Full<Bytes>> {
    let path = req.uri().path().to_string();

    match (req.method(), path.as_str()) {
        (&Method::OPTIONS, _) => cors_preflight(),
        (&Method::POST, LOGIN_PATH) => handle_login(state, req.body()).await,
        (&Method::GET, VALIDATE_PATH) => handle_validate(state, &req),
        (&Method::GET, ME_PATH) => handle_me(state, &req).await,
        (&Method::GET, p) if is_health_path(p) => health_check("auth-service", None),
        (_, LOGIN_PATH | VALIDATE_PATH | ME_PATH) => method_not_allowed(),
        _ => not_found_response(&path),
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /api/auth
///
/// Unknown login and wrong password both answer 401 "Invalid credentials".
async fn handle_login(state: &AuthState, body: &Bytes) -> Response<Full<Bytes>> {
    let body: LoginRequest = match parse_json_body(body) {
        Ok(b) => b,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid request"),
    };

    match state.login.login(&body.login, &body.password).await {
        Ok(result) => json_response(
            StatusCode::OK,
            &LoginResponse {
                token: result.token,
                expires_at: result.expires_at,
                user: result.user,
            },
        ),
        Err(e) => {
            if matches!(e, LoginError::Store(_) | LoginError::Verification(_)) {
                error!(error = %e, "Login could not be completed");
            }
            let outcome = e.client_outcome();
            error_response(status_of(outcome.status_code()), outcome.message())
        }
    }
}

/// GET /auth/validate
///
/// 200 with an empty body for a valid token, 401 otherwise. The body names the failure
/// class only, never the internal reason.
fn handle_validate(state: &AuthState, req: &Request<Bytes>) -> Response<Full<Bytes>> {
    match verify_bearer(state, req) {
        Ok(_) => empty_response(StatusCode::OK),
        Err(GateError::MissingCredential) => {
            error_response(StatusCode::UNAUTHORIZED, "Authorization header is required")
        }
        Err(GateError::MalformedCredential) => {
            error_response(StatusCode::UNAUTHORIZED, "Invalid authorization format")
        }
        Err(_) => error_response(StatusCode::UNAUTHORIZED, "Invalid token"),
    }
}

/// GET /auth/me
async fn handle_me(state: &AuthState, req: &Request<Bytes>) -> Response<Full<Bytes>> {
    let claims = match verify_bearer(state, req) {
        Ok(claims) => claims,
        Err(e) => {
            let outcome = e.client_outcome();
            return error_response(status_of(outcome.status_code()), outcome.message());
        }
    };

    match state.login.identity(&claims.id).await {
        Ok(Some(identity)) => json_response(StatusCode::OK, &identity),
        Ok(None) => {
            warn!(id = %claims.id, "Token names an identity that no longer exists");
            error_response(StatusCode::UNAUTHORIZED, "Unauthorized")
        }
        Err(e) => {
            error!(error = %e, "Identity lookup failed");
            let outcome = e.client_outcome();
            error_response(status_of(outcome.status_code()), outcome.message())
        }
    }
}

fn verify_bearer(state: &AuthState, req: &Request<Bytes>) -> Result<Claims, GateError> {
    let result = extract_bearer(get_auth_header(req))
        .and_then(|token| state.login.maker().verify(token).map_err(GateError::from));

    if let Err(ref e) = result {
        warn!(path = %req.uri().path(), kind = e.kind(), "Token verification failed");
    }
    result
}

fn status_of(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
