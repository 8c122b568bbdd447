//! Shared types for the HTTP services

pub mod error;

pub use error::{Result, ServiceError};
