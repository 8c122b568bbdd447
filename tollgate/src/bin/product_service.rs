//! Product service - in-memory catalogue behind the gateway
//!
//! Environment variables:
//!   SEED_DEMO_PRODUCTS - seed a few products at startup (default false)
//!   LISTEN             - listen address (default 0.0.0.0:8082)

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use tollgate::{
    config::ProductArgs,
    logging::init_tracing,
    routes::{ProductState, ProductStore},
    server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = ProductArgs::parse();
    init_tracing(&args.common);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let listen = args.listen().map_err(anyhow::Error::msg)?;

    let store = ProductStore::new();
    if args.seed_demo_products {
        store.seed_demo_products().await;
    }

    info!("Tollgate product service on {} ({} products)", listen, store.len().await);

    let state = Arc::new(ProductState::new(store));
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
