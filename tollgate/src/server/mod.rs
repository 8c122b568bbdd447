//! HTTP server

pub mod http;

pub use http::{bind, run, RequestHandler};
