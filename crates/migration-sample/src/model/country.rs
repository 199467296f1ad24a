use migration_framework::{CorrelationError, EntityId, EntityTypeKey};
use serde::{Deserialize, Serialize};

/// Entity type key under which country ids are relayed between the stores.
pub const COUNTRY: &str = "Country";

/// A country as stored by both the legacy and the replacement store.
///
/// `id` is `None` until a store has assigned one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: Option<u64>,
    pub iso2_code: String,
    pub name: String,
}

impl Country {
    /// Creates a country that has not been stored yet.
    pub fn new(iso2_code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            iso2_code: iso2_code.into(),
            name: name.into(),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// The id to relay to the replacement store after a legacy create.
    pub fn entity_id(&self) -> Option<EntityId> {
        self.id.map(EntityId::from)
    }

    pub fn entity_type() -> EntityTypeKey {
        EntityTypeKey::new(COUNTRY)
    }
}

/// Errors raised by a country store.
#[derive(Debug, thiserror::Error)]
pub enum CountryError {
    #[error("Country not found: {0}")]
    NotFound(String),
    #[error("Country {0} already exists")]
    DuplicateCode(String),
    #[error("Country id {0} is already taken")]
    DuplicateId(u64),
    #[error("Country {0} has no id")]
    MissingId(String),
    #[error("Id relay failed: {0}")]
    Correlation(#[from] CorrelationError),
    #[error("Store closed")]
    StoreClosed,
    #[error("Store dropped response channel")]
    StoreDropped,
    #[error("Migration error: {0}")]
    Migration(String),
}
