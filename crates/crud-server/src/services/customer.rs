//! Customer service

use super::AddressService;
use crate::storage::{EntityCache, ExpiryPolicy};
use crud_core::{CrudError, Customer, CustomerRepository, EntityId, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Idle window after which an unread customer drops out of the cache
pub const DEFAULT_CACHE_IDLE: Duration = Duration::from_secs(10 * 60);

pub struct CustomerService {
    repository: Arc<dyn CustomerRepository>,
    addresses: Arc<AddressService>,
    cache: EntityCache<Customer>,
}

impl CustomerService {
    pub fn new(
        repository: Arc<dyn CustomerRepository>,
        addresses: Arc<AddressService>,
        cache_idle: Duration,
    ) -> Self {
        Self {
            repository,
            addresses,
            cache: EntityCache::new("customers", ExpiryPolicy::Idle(cache_idle)),
        }
    }

    pub async fn read_all(&self) -> Result<Vec<Customer>> {
        debug!("Reading all customers");
        self.repository.find_all().await
    }

    pub async fn read(&self, id: EntityId) -> Result<Option<Customer>> {
        // Try cache first
        if let Some(customer) = self.cache.get(id) {
            debug!("Customer {} served from cache", id);
            return Ok(Some(customer));
        }

        // Fall back to database
        let customer = self.repository.find_by_id(id).await?;
        if let Some(customer) = &customer {
            self.cache.insert(id, customer.clone());
        }
        Ok(customer)
    }

    /// Embedded address payloads are replaced by the stored record with the
    /// same id. An unknown id unlinks the address.
    pub async fn create(&self, mut customer: Customer) -> Result<Customer> {
        if let Some(id) = customer.customer_id {
            error!("Attempted to create a customer with id {}", id);
            return Err(CrudError::AlreadyExists(format!(
                "customer {id}: the id must be empty to create a new entity"
            )));
        }

        self.resolve_address(&mut customer).await?;

        let created = self
            .repository
            .save(&customer)
            .await?
            .ok_or_else(|| CrudError::Database("customer insert returned no row".to_string()))?;
        let id = created
            .customer_id
            .ok_or_else(|| CrudError::Database("customer insert assigned no id".to_string()))?;

        info!("Created customer {}", id);
        self.cache.insert(id, created.clone());

        Ok(created)
    }

    /// Full replacement of an existing customer
    pub async fn update(&self, mut customer: Customer) -> Result<Customer> {
        let Some(id) = customer.customer_id else {
            error!("Attempted to update a customer without an id");
            return Err(CrudError::NotFound("customer without an id".to_string()));
        };

        if self.read(id).await?.is_none() {
            error!("Attempted to update customer {}, which does not exist", id);
            return Err(CrudError::NotFound(format!("customer {id}")));
        }

        self.resolve_address(&mut customer).await?;

        match self.repository.save(&customer).await? {
            Some(updated) => {
                info!("Updated customer {}", id);
                self.cache.insert(id, updated.clone());
                Ok(updated)
            }
            None => {
                // Deleted between the check and the write
                self.cache.remove(id);
                Err(CrudError::NotFound(format!("customer {id}")))
            }
        }
    }

    /// Link a customer to an address without resending the customer.
    /// An unknown address id clears the link.
    pub async fn update_customer_address(
        &self,
        customer_id: EntityId,
        address_id: EntityId,
    ) -> Result<Customer> {
        info!("Linking customer {} to address {}", customer_id, address_id);

        let Some(mut customer) = self.read(customer_id).await? else {
            error!("No customer {} to link to address {}", customer_id, address_id);
            return Err(CrudError::NotFound(format!("customer {customer_id}")));
        };

        customer.address = self.addresses.read(address_id).await?;
        if customer.address.is_none() {
            warn!("Address {} not found, unlinking customer {}", address_id, customer_id);
        }

        self.update(customer).await
    }

    /// Customers are never referenced by other rows, so this cannot trip an
    /// integrity check.
    pub async fn delete(&self, id: EntityId) -> Result<()> {
        let removed = self.repository.delete(id).await?;
        self.cache.remove(id);

        if removed {
            info!("Deleted customer {}", id);
        } else {
            debug!("Delete of customer {} matched no row", id);
        }
        Ok(())
    }

    pub fn evict_cache(&self) {
        info!("Evicting customer cache ({} entries)", self.cache.len());
        self.cache.clear();
    }

    async fn resolve_address(&self, customer: &mut Customer) -> Result<()> {
        if customer.address.is_none() {
            return Ok(());
        }

        let resolved = match customer.address_id() {
            Some(address_id) => self.addresses.read(address_id).await?,
            None => None,
        };
        if resolved.is_none() {
            warn!(
                "Embedded address {:?} does not resolve, storing customer without address",
                customer.address_id()
            );
        }
        customer.address = resolved;

        Ok(())
    }
}
