//! Auth service - issues tokens for valid logins and verifies them
//!
//! Environment variables:
//!   JWT_SECRET_KEY  - HMAC signing secret, at least 32 bytes (required)
//!   JWT_EXPIRY      - token lifetime, e.g. `3600`, `15m`, `1h30m` (default 1h)
//!   USERS_FILE      - JSON array of credential records (optional)
//!   SEED_DEMO_USERS - seed admin/admin123 and user/user123
//!   LISTEN          - listen address (default 0.0.0.0:8081)

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use tollgate::{
    config::AuthArgs,
    logging::init_tracing,
    routes::AuthState,
    server,
};
use tollgate_auth::{demo_users, InMemoryCredentialStore, LoginService, TokenMaker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = AuthArgs::parse();
    init_tracing(&args.common);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let secret = args.signing_secret().context("signing secret")?;
    let lifetime = args.token_lifetime();
    let listen = args.listen().map_err(anyhow::Error::msg)?;

    let store = match &args.users_file {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading users file {path}"))?;
            InMemoryCredentialStore::from_json(&json)
                .with_context(|| format!("parsing users file {path}"))?
        }
        None => InMemoryCredentialStore::new(),
    };

    if args.should_seed_demo_users() {
        for record in demo_users().map_err(|e| anyhow::anyhow!("hashing demo users: {e}"))? {
            store.insert(record).await;
        }
    }

    info!("======================================");
    info!("  Tollgate auth service");
    info!("======================================");
    info!("Listen: {}", listen);
    info!("Token lifetime: {}s", lifetime.as_secs());
    info!("Users file: {}", args.users_file.as_deref().unwrap_or("-"));
    info!("Credentials loaded: {}", store.len().await);
    info!("======================================");

    let login = LoginService::new(Arc::new(store), TokenMaker::new(&secret), lifetime);
    let state = Arc::new(AuthState::new(login));
    let listener = server::bind(listen).await?;

    tokio::select! {
        result = server::run(listener, state) => {
            if let Err(e) = result {
                error!("Server error: {:?}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
