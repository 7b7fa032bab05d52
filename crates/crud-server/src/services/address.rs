//! Address service

use crate::storage::{EntityCache, ExpiryPolicy};
use crud_core::{Address, AddressRepository, CrudError, EntityId, Result};
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct AddressService {
    repository: Arc<dyn AddressRepository>,
    cache: EntityCache<Address>,
}

impl AddressService {
    pub fn new(repository: Arc<dyn AddressRepository>) -> Self {
        Self {
            repository,
            cache: EntityCache::new("addresses", ExpiryPolicy::Never),
        }
    }

    pub async fn read_all(&self) -> Result<Vec<Address>> {
        debug!("Reading all addresses");
        self.repository.find_all().await
    }

    pub async fn read(&self, id: EntityId) -> Result<Option<Address>> {
        // Try cache first
        if let Some(address) = self.cache.get(id) {
            debug!("Address {} served from cache", id);
            return Ok(Some(address));
        }

        // Fall back to database
        let address = self.repository.find_by_id(id).await?;
        if let Some(address) = &address {
            self.cache.insert(id, address.clone());
        }
        Ok(address)
    }

    pub async fn create(&self, address: Address) -> Result<Address> {
        if let Some(id) = address.address_id {
            error!("Attempted to create an address with id {}", id);
            return Err(CrudError::AlreadyExists(format!(
                "address {id}: the id must be empty to create a new entity"
            )));
        }

        let created = self
            .repository
            .save(&address)
            .await?
            .ok_or_else(|| CrudError::Database("address insert returned no row".to_string()))?;
        let id = created
            .address_id
            .ok_or_else(|| CrudError::Database("address insert assigned no id".to_string()))?;

        info!("Created address {}", id);
        self.cache.insert(id, created.clone());

        Ok(created)
    }

    pub async fn update(&self, address: Address) -> Result<Address> {
        let Some(id) = address.address_id else {
            error!("Attempted to update an address without an id");
            return Err(CrudError::NotFound("address without an id".to_string()));
        };

        if self.read(id).await?.is_none() {
            error!("Attempted to update address {}, which does not exist", id);
            return Err(CrudError::NotFound(format!("address {id}")));
        }

        match self.repository.save(&address).await? {
            Some(updated) => {
                info!("Updated address {}", id);
                self.cache.insert(id, updated.clone());
                Ok(updated)
            }
            None => {
                // Deleted between the check and the write
                self.cache.remove(id);
                Err(CrudError::NotFound(format!("address {id}")))
            }
        }
    }

    /// Fails with an integrity violation while any customer still links to
    /// the address.
    pub async fn delete(&self, id: EntityId) -> Result<()> {
        let removed = self.repository.delete(id).await?;
        self.cache.remove(id);

        if removed {
            info!("Deleted address {}", id);
        } else {
            debug!("Delete of address {} matched no row", id);
        }
        Ok(())
    }

    pub fn evict_cache(&self) {
        info!("Evicting address cache ({} entries)", self.cache.len());
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use crud_core::{Customer, CustomerRepository};

    fn lake_street() -> Address {
        Address {
            street_name: Some("Lake".to_string()),
            street_number: Some("33a".to_string()),
            street_type: Some("street".to_string()),
            city: Some("Takapuna".to_string()),
            country: Some("New Zealand".to_string()),
            ..Default::default()
        }
    }

    async fn setup() -> (Arc<Database>, AddressService) {
        let db = Arc::new(Database::in_memory().await.unwrap());
        let service = AddressService::new(db.clone());
        (db, service)
    }

    #[tokio::test]
    async fn test_read_all_empty() {
        let (_db, service) = setup().await;
        assert!(service.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let (_db, service) = setup().await;

        let created = service.create(lake_street()).await.unwrap();
        let id = created.address_id.expect("id assigned");
        assert_eq!(created.street_name.as_deref(), Some("Lake"));

        assert_eq!(service.read(id).await.unwrap(), Some(created.clone()));
        // Idempotent read
        assert_eq!(service.read(id).await.unwrap(), Some(created));
        assert_eq!(service.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_with_id_is_rejected() {
        let (_db, service) = setup().await;

        let result = service.create(lake_street().with_id(i64::MAX)).await;
        assert!(matches!(result, Err(CrudError::AlreadyExists(_))));
        assert!(service.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_rejected() {
        let (_db, service) = setup().await;
        let existing = service.create(lake_street()).await.unwrap();

        let result = service.update(lake_street().with_id(i64::MAX)).await;
        assert!(matches!(result, Err(CrudError::NotFound(_))));

        let result = service.update(lake_street()).await;
        assert!(matches!(result, Err(CrudError::NotFound(_))));

        assert_eq!(service.read_all().await.unwrap(), vec![existing]);
    }

    #[tokio::test]
    async fn test_update_of_row_deleted_behind_cache_is_rejected() {
        let (db, service) = setup().await;
        let created = service.create(lake_street()).await.unwrap();
        let id = created.address_id.unwrap();

        // Cache still holds the entry, so the existence check passes
        assert!(AddressRepository::delete(db.as_ref(), id).await.unwrap());

        let mut changed = created.clone();
        changed.suburb = Some("Hauraki".to_string());
        let result = service.update(changed).await;
        assert!(matches!(result, Err(CrudError::NotFound(_))));

        assert_eq!(service.read(id).await.unwrap(), None);
        assert!(service.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_then_read_reflects_change() {
        let (_db, service) = setup().await;
        let created = service.create(lake_street()).await.unwrap();
        let id = created.address_id.unwrap();

        // Warm the cache with the old value
        service.read(id).await.unwrap();

        let mut changed = created.clone();
        changed.street_name = Some("Lake test".to_string());
        let updated = service.update(changed.clone()).await.unwrap();
        assert_eq!(updated, changed);

        assert_eq!(service.read(id).await.unwrap(), Some(changed));
    }

    #[tokio::test]
    async fn test_delete_then_read_is_absent() {
        let (_db, service) = setup().await;
        let created = service.create(lake_street()).await.unwrap();
        let id = created.address_id.unwrap();

        service.delete(id).await.unwrap();
        assert_eq!(service.read(id).await.unwrap(), None);
        assert!(service.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_referenced_address_fails() {
        let (db, service) = setup().await;
        let created = service.create(lake_street()).await.unwrap();
        let id = created.address_id.unwrap();

        let customer = Customer {
            name: Some("Mele".to_string()),
            address: Some(created.clone()),
            ..Default::default()
        };
        CustomerRepository::save(db.as_ref(), &customer).await.unwrap();

        let result = service.delete(id).await;
        assert!(matches!(result, Err(CrudError::IntegrityViolation { .. })));

        service.evict_cache();
        assert_eq!(service.read(id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_evict_cache_reflects_storage() {
        let (db, service) = setup().await;
        let created = service.create(lake_street()).await.unwrap();
        let id = created.address_id.unwrap();

        // Change storage behind the service's back
        let mut changed = created.clone();
        changed.city = Some("Devonport".to_string());
        AddressRepository::save(db.as_ref(), &changed).await.unwrap();

        assert_eq!(service.read(id).await.unwrap(), Some(created));

        service.evict_cache();
        assert_eq!(service.read(id).await.unwrap(), Some(changed));
    }
}
