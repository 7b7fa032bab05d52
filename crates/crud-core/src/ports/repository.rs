//! Repository traits for persistence
//!
//! Repositories carry no business rules: `save` inserts when the entity has
//! no id and updates otherwise. Each mutating call is one storage
//! transaction.
//!
//! Services check existence before an update through their cache, outside
//! that transaction. The update itself is conditional on the row: a `save`
//! that matches no row returns `None` without writing, which services report
//! as not found. Check and write therefore act as one unit even when a
//! delete lands between them.

use crate::Result;
use async_trait::async_trait;
use crud_types::{Address, Customer, EntityId};

/// Address store
#[async_trait]
pub trait AddressRepository: Send + Sync {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<Address>>;
    async fn find_all(&self) -> Result<Vec<Address>>;
    /// Insert or update. Returns `None`, writing nothing, when updating an
    /// id that no longer exists.
    async fn save(&self, address: &Address) -> Result<Option<Address>>;
    /// Returns whether a row was removed.
    async fn delete(&self, id: EntityId) -> Result<bool>;
}

/// Customer store
///
/// Customers are returned with their address resolved; a reference to a
/// missing address reads back as `None`.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<Customer>>;
    async fn find_all(&self) -> Result<Vec<Customer>>;
    /// Same contract as [`AddressRepository::save`].
    async fn save(&self, customer: &Customer) -> Result<Option<Customer>>;
    async fn delete(&self, id: EntityId) -> Result<bool>;
}
