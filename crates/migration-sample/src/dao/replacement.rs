use super::CountryDao;
use crate::model::{Country, CountryError};
use crate::store::StoreClient;
use async_trait::async_trait;
use migration_framework::{CorrelatedCreate, CorrelationSlot, CorrelationStore, StoreAdapter};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// The replacement country store.
///
/// While a [`CorrelationStore`] is bound, every create takes its id from the store
/// instead of the table sequence, so both stores agree on ids.
#[derive(Debug)]
pub struct ReplacementCountryDao {
    store: StoreClient,
    correlation: CorrelationSlot,
}

impl ReplacementCountryDao {
    pub fn new(store: StoreClient) -> Self {
        Self {
            store,
            correlation: CorrelationSlot::new(),
        }
    }

    /// The id relayed for the country being created, if a correlation store is bound.
    fn relayed_id(&self) -> Result<Option<u64>, CountryError> {
        let Some(id) = self.correlation.pop(&Country::entity_type())? else {
            return Ok(None);
        };
        match id.as_u64() {
            Some(id) => Ok(Some(id)),
            None => {
                warn!(%id, "Relayed id is not numeric; using the table sequence");
                Ok(None)
            }
        }
    }
}

impl StoreAdapter for ReplacementCountryDao {
    fn correlated_create(&self) -> Option<&dyn CorrelatedCreate> {
        Some(self)
    }
}

impl CorrelatedCreate for ReplacementCountryDao {
    fn correlation_store(&self) -> Option<Arc<CorrelationStore>> {
        self.correlation.get()
    }

    fn set_correlation_store(&self, store: Arc<CorrelationStore>) {
        self.correlation.set(store);
    }
}

#[async_trait]
impl CountryDao for ReplacementCountryDao {
    #[instrument(skip(self))]
    async fn create_country(&self, country: Country) -> Result<Country, CountryError> {
        let id = self.relayed_id()?;
        debug!(?id, "Sending request");
        self.store.create(country, id).await
    }

    #[instrument(skip(self))]
    async fn update_country(&self, country: Country) -> Result<Country, CountryError> {
        debug!("Sending request");
        self.store.update(country).await
    }

    #[instrument(skip(self))]
    async fn get_country(&self, iso2_code: &str) -> Result<Option<Country>, CountryError> {
        debug!("Sending request");
        self.store.get(iso2_code).await
    }
}
