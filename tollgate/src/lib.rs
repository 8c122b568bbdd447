//! Tollgate - token-gated API gateway
//!
//! Three small services built on `tollgate-auth`:
//! - `auth-service` issues tokens for valid logins and verifies them
//! - `gateway` authorizes every request and forwards it to its owner
//! - `product-service` is an in-memory catalogue behind the gateway

pub mod config;
pub mod logging;
pub mod routes;
pub mod server;
pub mod types;

pub use config::{AuthArgs, CommonArgs, GatewayArgs, ProductArgs};
pub use server::{bind, run, RequestHandler};
pub use types::{Result, ServiceError};
