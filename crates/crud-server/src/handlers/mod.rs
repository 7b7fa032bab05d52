//! HTTP handlers

pub mod address;
pub mod customer;
pub mod error;

pub use error::ApiError;

/// Liveness probe
pub async fn health() -> &'static str {
    "OK"
}
