//! Authorization gate
//!
//! Decides, per request, whether a credential is required and whether the
//! one presented is valid:
//!
//! 1. Public path: authorized, no credential inspection at all.
//! 2. Otherwise an `Authorization: Bearer <token>` header is required.
//! 3. The token goes to a [`TokenVerifier`], either in-process
//!    ([`LocalVerifier`]) or delegated over HTTP ([`RemoteVerifier`]).
//! 4. On success the verified claims are handed back for the request context.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::claims::Claims;
use crate::error::{GateError, TokenError};
use crate::token::{decode_unverified, TokenMaker};

// =============================================================================
// Public path classification
// =============================================================================

/// One public path pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    Exact(String),
    Prefix(String),
}

impl PathMatcher {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathMatcher::Exact(p) => path == p,
            PathMatcher::Prefix(p) => path.starts_with(p.as_str()),
        }
    }
}

impl FromStr for PathMatcher {
    type Err = String;

    /// `/api/auth*` is a prefix match, `/health` an exact match
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.starts_with('/') {
            return Err(format!("public path must start with '/': {s:?}"));
        }
        match s.strip_suffix('*') {
            Some(prefix) => Ok(PathMatcher::Prefix(prefix.to_string())),
            None => Ok(PathMatcher::Exact(s.to_string())),
        }
    }
}

impl fmt::Display for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathMatcher::Exact(p) => write!(f, "{p}"),
            PathMatcher::Prefix(p) => write!(f, "{p}*"),
        }
    }
}

/// Ordered list of public path matchers. Everything else is protected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicPaths(Vec<PathMatcher>);

impl PublicPaths {
    pub fn new(matchers: Vec<PathMatcher>) -> Self {
        Self(matchers)
    }

    /// Parse a comma separated list such as `/api/auth*,/health`
    pub fn parse(list: &str) -> Result<Self, String> {
        list.split(',')
            .filter(|s| !s.trim().is_empty())
            .map(PathMatcher::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.0.iter().any(|m| m.matches(path))
    }

    pub fn matchers(&self) -> &[PathMatcher] {
        &self.0
    }
}

// =============================================================================
// Bearer extraction
// =============================================================================

/// Extract the token from an `Authorization` header value.
///
/// The value must be exactly two space-separated parts, the first `Bearer`.
pub fn extract_bearer(auth_header: Option<&str>) -> Result<&str, GateError> {
    let header = match auth_header {
        None => return Err(GateError::MissingCredential),
        Some(h) if h.is_empty() => return Err(GateError::MissingCredential),
        Some(h) => h,
    };

    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(GateError::MalformedCredential),
    }
}

// =============================================================================
// Token verification capability
// =============================================================================

/// Verify a bearer token and return its claims
#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, GateError>;

    /// Short label for logs
    fn name(&self) -> &'static str;
}

/// Verifies tokens in-process with the shared signing secret
#[derive(Clone)]
pub struct LocalVerifier {
    maker: TokenMaker,
}

impl LocalVerifier {
    pub fn new(maker: TokenMaker) -> Self {
        Self { maker }
    }
}

#[async_trait::async_trait]
impl TokenVerifier for LocalVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, GateError> {
        self.maker.verify(token).map_err(GateError::InvalidToken)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Delegates verification to a remote endpoint (`GET <url>` with the bearer
/// header). 200 accepts, 401 rejects, anything else is [`GateError::Unavailable`].
#[derive(Clone)]
pub struct RemoteVerifier {
    endpoint: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl RemoteVerifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GateError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GateError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into(),
            timeout,
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl TokenVerifier for RemoteVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, GateError> {
        let request = self
            .http_client
            .get(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"))
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| GateError::Unavailable("verification endpoint timed out".into()))?
            .map_err(|e| GateError::Unavailable(e.to_string()))?;

        let status = response.status();
        debug!(status = %status, endpoint = %self.endpoint, "Verification endpoint answered");

        match status {
            reqwest::StatusCode::OK => {
                // Signature and expiry were checked by the endpoint
                decode_unverified(token).map_err(GateError::InvalidToken)
            }
            reqwest::StatusCode::UNAUTHORIZED => {
                let reason = tokio::time::timeout(self.timeout, response.text())
                    .await
                    .ok()
                    .and_then(|r| r.ok())
                    .unwrap_or_default();
                Err(GateError::InvalidToken(TokenError::Rejected(
                    reason.trim().to_string(),
                )))
            }
            other => Err(GateError::Unavailable(format!(
                "unexpected status from verification endpoint: {other}"
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

// =============================================================================
// Gate
// =============================================================================

/// Terminal state of one request passing through the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// Public path; no credential was inspected
    Public,
    /// Protected path with a verified token
    Authenticated(Claims),
}

impl Authorization {
    pub fn claims(&self) -> Option<&Claims> {
        match self {
            Authorization::Public => None,
            Authorization::Authenticated(claims) => Some(claims),
        }
    }
}

/// Public path set plus one verifier
#[derive(Clone)]
pub struct Gate {
    public_paths: PublicPaths,
    verifier: Arc<dyn TokenVerifier>,
}

impl Gate {
    pub fn new(public_paths: PublicPaths, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            public_paths,
            verifier,
        }
    }

    pub fn public_paths(&self) -> &PublicPaths {
        &self.public_paths
    }

    pub fn verifier_name(&self) -> &'static str {
        self.verifier.name()
    }

    /// Decide whether a request for `path` carrying `auth_header` may proceed
    pub async fn authorize(
        &self,
        path: &str,
        auth_header: Option<&str>,
    ) -> Result<Authorization, GateError> {
        if self.public_paths.is_public(path) {
            debug!(path = %path, "Public path, no token required");
            return Ok(Authorization::Public);
        }

        let result = match extract_bearer(auth_header) {
            Ok(token) => self.verifier.verify(token).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(claims) => Ok(Authorization::Authenticated(claims)),
            Err(e) => {
                warn!(
                    path = %path,
                    verifier = self.verifier.name(),
                    kind = e.kind(),
                    "Request denied by gate"
                );
                Err(e)
            }
        }
    }
}
