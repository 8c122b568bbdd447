//! Gateway - authorizes every request and forwards it to its owner
//!
//! Environment variables:
//!   AUTH_SERVICE_URL    - auth service base URL (default http://localhost:8081)
//!   PRODUCT_SERVICE_URL - product service base URL (default http://localhost:8082)
//!   PUBLIC_PATHS        - comma separated, trailing `*` = prefix
//!   JWT_SECRET_KEY      - verify in-process; without it the auth service is asked
//!   VERIFY_TIMEOUT_MS   - delegated verification timeout (default 3000)
//!   FORWARD_TIMEOUT_MS  - forwarded request timeout (default 30000)
//!   LISTEN              - listen address (default 0.0.0.0:8080)

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use tollgate::{config::GatewayArgs, logging::init_tracing, routes::GatewayState, server};
use tollgate_auth::{Gate, LocalVerifier, RemoteVerifier, TokenMaker, TokenVerifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = GatewayArgs::parse();
    init_tracing(&args.common);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let listen = args.listen().map_err(anyhow::Error::msg)?;
    let public_paths = args.public_paths().map_err(anyhow::Error::msg)?;

    let verifier: Arc<dyn TokenVerifier> = match args.signing_secret().context("signing secret")? {
        Some(secret) => Arc::new(LocalVerifier::new(TokenMaker::new(&secret))),
        None => Arc::new(
            RemoteVerifier::new(args.validate_endpoint(), args.verify_timeout())
                .context("building remote verifier")?,
        ),
    };

    info!("======================================");
    info!("  Tollgate gateway");
    info!("======================================");
    info!("Listen: {}", listen);
    info!("Auth service: {}", args.auth_service_url);
    info!("Product service: {}", args.product_service_url);
    info!("Verifier: {}", verifier.name());
    if verifier.name() == "remote" {
        info!("Validate endpoint: {}", args.validate_endpoint());
    }
    info!(
        "Public paths: {}",
        public_paths
            .matchers()
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!("======================================");

    let gate = Gate::new(public_paths, verifier);
    let state = Arc::new(GatewayState::new(
        gate,
        args.auth_service_url.clone(),
        args.product_service_url.clone(),
        args.forward_timeout(),
    )?);
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
