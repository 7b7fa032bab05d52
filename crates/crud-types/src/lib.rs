//! CRUD Types - Pure entity definitions shared by the service crates
//!
//! This crate contains only plain data types with serde support and no
//! runtime dependencies.

pub mod address;
pub mod customer;

pub use address::*;
pub use customer::*;

/// Identity type used by every persisted entity
pub type EntityId = i64;
