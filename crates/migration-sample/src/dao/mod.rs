//! # Country DAO
//!
//! The logical interface application code calls, and its two implementations:
//!
//! - [`LegacyCountryDao`]: the source store, assigning ids from its own table sequence.
//! - [`ReplacementCountryDao`]: the destination store, reusing the ids the legacy
//!   store generated when a correlation store is bound to it.
//!
//! [`CountryDaoFacade`](crate::facade::CountryDaoFacade) implements the same trait on
//! top of both, so call sites never change during the migration.

pub mod legacy;
pub mod replacement;

pub use legacy::LegacyCountryDao;
pub use replacement::ReplacementCountryDao;

use crate::model::{Country, CountryError};
use async_trait::async_trait;
use migration_framework::StoreAdapter;

#[async_trait]
pub trait CountryDao: StoreAdapter {
    /// Stores a new country and returns it with its assigned id.
    async fn create_country(&self, country: Country) -> Result<Country, CountryError>;

    /// Replaces an existing country, matched by id.
    async fn update_country(&self, country: Country) -> Result<Country, CountryError>;

    async fn get_country(&self, iso2_code: &str) -> Result<Option<Country>, CountryError>;
}
