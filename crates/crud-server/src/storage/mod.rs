//! Storage layer
//!
//! SQLite (embedded) for the address and customer tables.
//! DashMap (in-memory) for the per-entity read-through caches.

pub mod cache;
pub mod db;

pub use cache::{EntityCache, ExpiryPolicy};
pub use db::Database;
