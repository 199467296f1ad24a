use super::CountryDao;
use crate::model::{Country, CountryError};
use crate::store::StoreClient;
use async_trait::async_trait;
use migration_framework::StoreAdapter;
use tracing::{debug, instrument};

/// The legacy country store.
#[derive(Debug, Clone)]
pub struct LegacyCountryDao {
    store: StoreClient,
}

impl LegacyCountryDao {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }
}

impl StoreAdapter for LegacyCountryDao {}

#[async_trait]
impl CountryDao for LegacyCountryDao {
    #[instrument(skip(self))]
    async fn create_country(&self, country: Country) -> Result<Country, CountryError> {
        debug!("Sending request");
        self.store.create(country, None).await
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
