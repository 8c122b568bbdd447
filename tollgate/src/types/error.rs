//! Error types for the HTTP services

use hyper::StatusCode;
use tollgate_auth::{ClientOutcome, GateError, LoginError};

/// Main error type for service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Carries the client-facing outcome of an auth failure
    #[error("{0}")]
    Auth(ClientOutcome),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Auth(outcome) => StatusCode::from_u16(outcome.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to status code and body tuple for HTTP response.
    ///
    /// Internal details never reach the body of a 5xx.
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = match self {
            Self::Auth(outcome) => outcome.message().to_string(),
            Self::Internal(_) | Self::Config(_) => ClientOutcome::ServerError.message().to_string(),
            other => other.to_string(),
        };
        (status, body)
    }
}

impl From<GateError> for ServiceError {
    fn from(err: GateError) -> Self {
        Self::Auth(err.client_outcome())
    }
}

impl From<LoginError> for ServiceError {
    fn from(err: LoginError) -> Self {
        Self::Auth(err.client_outcome())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("Invalid JSON: {}", err))
    }
}

impl From<hyper::Error> for ServiceError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;
