//! Address types

use crate::EntityId;
use serde::{Deserialize, Serialize};

/// A postal address. Every attribute other than the id is free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    /// Server-assigned; `None` until the address has been persisted
    pub address_id: Option<EntityId>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub street_name: Option<String>,
    pub street_number: Option<String>,
    pub street_type: Option<String>,
    pub suburb: Option<String>,
}

impl Address {
    /// Copy of this address carrying the given identity
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.address_id = Some(id);
        self
    }
}
