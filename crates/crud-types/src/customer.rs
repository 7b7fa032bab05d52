//! Customer types

use crate::{Address, EntityId};
use serde::{Deserialize, Serialize};

/// A customer with an optional link to an [`Address`].
///
/// The link is a weak reference: only the address id is stored, and it is
/// resolved to the full address record whenever the customer is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    /// Server-assigned; `None` until the customer has been persisted
    pub customer_id: Option<EntityId>,
    pub name: Option<String>,
    pub telephone_number: Option<String>,
    pub address: Option<Address>,
}

impl Customer {
    /// Id of the linked address, if any
    pub fn address_id(&self) -> Option<EntityId> {
        self.address.as_ref().and_then(|a| a.address_id)
    }
}
