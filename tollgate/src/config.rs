//! Configuration for the Tollgate services
//!
//! CLI arguments and environment variable handling using clap. Each binary
//! has its own `Args` and flattens [`CommonArgs`] for the shared options.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tollgate_auth::{resolve_lifetime, PublicPaths, SecretError, SigningSecret};

pub const DEFAULT_AUTH_LISTEN: &str = "0.0.0.0:8081";
pub const DEFAULT_GATEWAY_LISTEN: &str = "0.0.0.0:8080";
pub const DEFAULT_PRODUCT_LISTEN: &str = "0.0.0.0:8082";

/// Options shared by every service
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    /// Address to listen on (defaults per service)
    #[arg(long, env = "LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl CommonArgs {
    pub fn listen_or(&self, default: &str) -> Result<SocketAddr, String> {
        match self.listen {
            Some(addr) => Ok(addr),
            None => default
                .parse()
                .map_err(|e| format!("invalid default listen address {default}: {e}")),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self.log_level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(format!("LOG_LEVEL must be one of trace, debug, info, warn, error (got {other})")),
        }
    }
}

// =============================================================================
// Auth service
// =============================================================================

/// Auth service - login and token verification
#[derive(Parser, Debug, Clone)]
#[command(name = "auth-service")]
#[command(about = "Issues signed tokens for valid logins and verifies them")]
pub struct AuthArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// HMAC signing secret, at least 32 bytes
    #[arg(long, env = "JWT_SECRET_KEY", hide_env_values = true)]
    pub jwt_secret_key: Option<String>,

    /// Token lifetime: seconds, or segments like `1h`, `15m`, `1h30m`
    #[arg(long, env = "JWT_EXPIRY")]
    pub jwt_expiry: Option<String>,

    /// JSON file holding an array of credential records
    #[arg(long, env = "USERS_FILE")]
    pub users_file: Option<String>,

    /// Seed the demo users (defaults to true when no users file is given)
    #[arg(long, env = "SEED_DEMO_USERS", action = clap::ArgAction::Set)]
    pub seed_demo_users: Option<bool>,
}

impl AuthArgs {
    pub fn listen(&self) -> Result<SocketAddr, String> {
        self.common.listen_or(DEFAULT_AUTH_LISTEN)
    }

    pub fn signing_secret(&self) -> Result<SigningSecret, SecretError> {
        match &self.jwt_secret_key {
            Some(secret) => SigningSecret::new(secret.as_bytes()),
            None => Err(SecretError::Missing),
        }
    }

    /// Resolved token lifetime; warns and falls back when unusable
    pub fn token_lifetime(&self) -> Duration {
        resolve_lifetime(self.jwt_expiry.as_deref())
    }

    pub fn should_seed_demo_users(&self) -> bool {
        self.seed_demo_users.unwrap_or(self.users_file.is_none())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.common.validate()?;
        self.listen()?;
        self.signing_secret()
            .map_err(|e| format!("JWT_SECRET_KEY: {e}"))?;
        Ok(())
    }
}

// =============================================================================
// Gateway
// =============================================================================

/// Gateway - authorization gate in front of the backend services
#[derive(Parser, Debug, Clone)]
#[command(name = "gateway")]
#[command(about = "Authorizes every request and forwards it to the owning service")]
pub struct GatewayArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Base URL of the auth service
    #[arg(long, env = "AUTH_SERVICE_URL", default_value = "http://localhost:8081")]
    pub auth_service_url: String,

    /// Base URL of the product service
    #[arg(long, env = "PRODUCT_SERVICE_URL", default_value = "http://localhost:8082")]
    pub product_service_url: String,

    /// Comma separated public paths; a trailing `*` makes a prefix match
    #[arg(long, env = "PUBLIC_PATHS", default_value = "/api/auth*,/health,/healthz")]
    pub public_paths: String,

    /// Verify tokens in-process with this secret instead of asking the auth service
    #[arg(long, env = "JWT_SECRET_KEY", hide_env_values = true)]
    pub jwt_secret_key: Option<String>,

    /// Timeout for delegated token verification in milliseconds
    #[arg(long, env = "VERIFY_TIMEOUT_MS", default_value = "3000")]
    pub verify_timeout_ms: u64,

    /// Timeout for forwarded requests in milliseconds
    #[arg(long, env = "FORWARD_TIMEOUT_MS", default_value = "30000")]
    pub forward_timeout_ms: u64,
}

impl GatewayArgs {
    pub fn listen(&self) -> Result<SocketAddr, String> {
        self.common.listen_or(DEFAULT_GATEWAY_LISTEN)
    }

    pub fn public_paths(&self) -> Result<PublicPaths, String> {
        PublicPaths::parse(&self.public_paths)
    }

    /// `Some` when the gate should verify locally
    pub fn signing_secret(&self) -> Result<Option<SigningSecret>, SecretError> {
        self.jwt_secret_key
            .as_ref()
            .map(|s| SigningSecret::new(s.as_bytes()))
            .transpose()
    }

    pub fn validate_endpoint(&self) -> String {
        format!("{}/auth/validate", self.auth_service_url.trim_end_matches('/'))
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }

    pub fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forward_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.common.validate()?;
        self.listen()?;
        self.public_paths()?;
        self.signing_secret()
            .map_err(|e| format!("JWT_SECRET_KEY: {e}"))?;

        for (name, url) in [
            ("AUTH_SERVICE_URL", &self.auth_service_url),
            ("PRODUCT_SERVICE_URL", &self.product_service_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("{name} must be an http(s) URL (got {url})"));
            }
        }

        if self.verify_timeout_ms == 0 {
            return Err("VERIFY_TIMEOUT_MS must be greater than zero".to_string());
        }
        if self.forward_timeout_ms == 0 {
            return Err("FORWARD_TIMEOUT_MS must be greater than zero".to_string());
        }

        Ok(())
    }
}

// =============================================================================
// Product service
// =============================================================================

/// Product service - in-memory product catalogue
#[derive(Parser, Debug, Clone)]
#[command(name = "product-service")]
#[command(about = "Product catalogue served behind the gateway")]
pub struct ProductArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Seed a few demo products at startup
    #[arg(long, env = "SEED_DEMO_PRODUCTS", default_value = "false")]
    pub seed_demo_products: bool,
}

impl ProductArgs {
    pub fn listen(&self) -> Result<SocketAddr, String> {
        self.common.listen_or(DEFAULT_PRODUCT_LISTEN)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.common.validate()?;
        self.listen()?;
        Ok(())
    }
}
