//! CRUD Core Library
//!
//! Error type and repository ports shared by the storage and service layers.

// Re-export pure types from crud-types
pub use crud_types::*;

pub mod error;
pub mod ports;

pub use error::{CrudError, Result};
pub use ports::{AddressRepository, CustomerRepository};
