//! # Country DAO Facade
//!
//! [`CountryDaoFacade`] is a [`CountryDao`] like any other, so application code holds an
//! `Arc<dyn CountryDao>` and never learns that two stores sit behind it. Each method
//! forwards to [`Facade::call_current`] with the matching [`CountryOperations`] entry.
//!
//! Errors raised by either store come back as the store's own [`CountryError`];
//! failures of the facade itself are reported as [`CountryError::Migration`].

use crate::dao::CountryDao;
use crate::model::{Country, CountryError, COUNTRY};
use async_trait::async_trait;
use migration_framework::{
    Facade, FacadeBuilder, FacadeError, Operation, StoreAdapter,
};
use std::sync::Arc;
use tracing::instrument;

/// The declared operations of [`CountryDao`].
#[derive(Debug, Clone)]
pub struct CountryOperations {
    pub create_country: Operation<dyn CountryDao, (Country,), Country>,
    pub update_country: Operation<dyn CountryDao, (Country,), Country>,
    pub get_country: Operation<dyn CountryDao, (String,), Option<Country>>,
}

impl CountryOperations {
    pub fn new() -> Self {
        Self {
            create_country: Operation::builder("create_country")
                .entity(COUNTRY)
                .create(Country::entity_id)
                .handler(|dao: Arc<dyn CountryDao>, (country,): (Country,)| async move {
                    dao.create_country(country).await
                }),
            update_country: Operation::builder("update_country")
                .entity(COUNTRY)
                .update()
                .handler(|dao: Arc<dyn CountryDao>, (country,): (Country,)| async move {
                    dao.update_country(country).await
                }),
            get_country: Operation::builder("get_country")
                .entity(COUNTRY)
                .read()
                .handler(|dao: Arc<dyn CountryDao>, (iso2_code,): (String,)| async move {
                    dao.get_country(&iso2_code).await
                }),
        }
    }

    /// Registers every operation on `builder`.
    pub fn register(&self, builder: FacadeBuilder<dyn CountryDao>) -> FacadeBuilder<dyn CountryDao> {
        builder
            .register(&self.create_country)
            .register(&self.update_country)
            .register(&self.get_country)
    }
}

impl Default for CountryOperations {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`CountryDao`] that migrates between a legacy and a replacement DAO.
pub struct CountryDaoFacade {
    facade: Facade<dyn CountryDao>,
    ops: CountryOperations,
}

impl CountryDaoFacade {
    /// Finishes `builder` with the country operations registered.
    pub fn build(builder: FacadeBuilder<dyn CountryDao>) -> Result<Self, FacadeError> {
        let ops = CountryOperations::new();
        let facade = ops.register(builder).build()?;
        Ok(Self { facade, ops })
    }

    pub fn facade(&self) -> &Facade<dyn CountryDao> {
        &self.facade
    }

    pub async fn shutdown(&self) {
        self.facade.shutdown().await;
    }
}

impl StoreAdapter for CountryDaoFacade {}

#[async_trait]
impl CountryDao for CountryDaoFacade {
    #[instrument(skip(self))]
    async fn create_country(&self, country: Country) -> Result<Country, CountryError> {
        self.facade
            .call_current(&self.ops.create_country, (country,))
            .await
            .map_err(into_country_error)
    }

    #[instrument(skip(self))]
    async fn update_country(&self, country: Country) -> Result<Country, CountryError> {
        self.facade
            .call_current(&self.ops.update_country, (country,))
            .await
            .map_err(into_country_error)
    }

    #[instrument(skip(self))]
    async fn get_country(&self, iso2_code: &str) -> Result<Option<Country>, CountryError> {
        self.facade
            .call_current(&self.ops.get_country, (iso2_code.to_string(),))
            .await
            .map_err(into_country_error)
    }
}

/// Hands back the store's own error unchanged when there is one.
fn into_country_error(err: FacadeError) -> CountryError {
    match err.into_adapter_error() {
        Ok(source) => match source.downcast::<CountryError>() {
            Ok(country_error) => *country_error,
            Err(other) => CountryError::Migration(other.to_string()),
        },
        Err(facade_error) => CountryError::Migration(facade_error.to_string()),
    }
}
