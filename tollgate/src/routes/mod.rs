//! HTTP routes for the Tollgate services

pub mod auth_routes;
pub mod gateway;
pub mod health;
pub mod http;
pub mod products;

pub use auth_routes::{handle_auth_request, AuthState};
pub use gateway::{handle_gateway_request, GatewayState};
pub use health::health_check;
pub use products::{
    handle_product_request, ActingUser, Product, ProductInput, ProductState, ProductStore,
};
