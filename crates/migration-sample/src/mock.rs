//! # Mock Country DAO
//!
//! A scripted [`CountryDao`] for facade tests. Each method has its own
//! [`MockScript`], and the correlation capability can be switched on to observe how
//! the facade binds and feeds the correlation store.
//!
//! ```rust
//! use migration_sample::dao::CountryDao;
//! use migration_sample::mock::MockCountryDao;
//! use migration_sample::model::Country;
//!
//! #[tokio::main]
//! async fn main() {
//!     let dao = MockCountryDao::new();
//!     dao.expect_get("PL").return_ok(Some(Country::new("PL", "Poland").with_id(1)));
//!
//!     let found = dao.get_country("PL").await.unwrap();
//!     assert_eq!(found.unwrap().id, Some(1));
//!     dao.verify();
//! }
//! ```

use crate::dao::CountryDao;
use crate::model::{Country, CountryError};
use async_trait::async_trait;
use migration_framework::mock::{ExpectationBuilder, MockScript};
use migration_framework::{CorrelatedCreate, CorrelationSlot, CorrelationStore, EntityId, StoreAdapter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Reply<T> = Result<T, CountryError>;

/// A [`CountryDao`] answering from scripts.
#[derive(Default)]
pub struct MockCountryDao {
    creates: MockScript<Country, Reply<Country>>,
    updates: MockScript<Country, Reply<Country>>,
    gets: MockScript<String, Reply<Option<Country>>>,
    correlation: Option<CorrelationSlot>,
    store_lookups: AtomicUsize,
    store_binds: AtomicUsize,
    relayed: Mutex<Vec<EntityId>>,
}

impl MockCountryDao {
    /// A mock without the correlation capability.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that is correlation-capable and pops a relayed id on every create.
    pub fn correlated() -> Self {
        Self {
            correlation: Some(CorrelationSlot::new()),
            ..Self::default()
        }
    }

    pub fn expect_create(&self, country: Country) -> ExpectationBuilder<Country, Reply<Country>> {
        self.creates.expect(country)
    }

    pub fn expect_update(&self, country: Country) -> ExpectationBuilder<Country, Reply<Country>> {
        self.updates.expect(country)
    }

    pub fn expect_get(&self, iso2_code: &str) -> ExpectationBuilder<String, Reply<Option<Country>>> {
        self.gets.expect(iso2_code.to_string())
    }

    /// Total calls across all methods.
    pub fn call_count(&self) -> usize {
        self.creates.call_count() + self.updates.call_count() + self.gets.call_count()
    }

    pub fn create_calls(&self) -> Vec<Country> {
        self.creates.calls()
    }

    pub fn update_calls(&self) -> Vec<Country> {
        self.updates.calls()
    }

    pub fn get_calls(&self) -> Vec<String> {
        self.gets.calls()
    }

    /// How often the facade asked for the bound correlation store.
    pub fn store_lookups(&self) -> usize {
        self.store_lookups.load(Ordering::SeqCst)
    }

    /// How often the facade bound a correlation store.
    pub fn store_binds(&self) -> usize {
        self.store_binds.load(Ordering::SeqCst)
    }

    /// Ids popped by creates, in order.
    pub fn relayed_ids(&self) -> Vec<EntityId> {
        self.relayed.lock().unwrap().clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        self.creates.verify();
        self.updates.verify();
        self.gets.verify();
    }
}

impl StoreAdapter for MockCountryDao {
    fn correlated_create(&self) -> Option<&dyn CorrelatedCreate> {
        self.correlation.as_ref().map(|_| self as &dyn CorrelatedCreate)
    }
}

impl CorrelatedCreate for MockCountryDao {
    fn correlation_store(&self) -> Option<Arc<CorrelationStore>> {
        self.store_lookups.fetch_add(1, Ordering::SeqCst);
        self.correlation.as_ref().and_then(|slot| slot.get())
    }

    fn set_correlation_store(&self, store: Arc<CorrelationStore>) {
        self.store_binds.fetch_add(1, Ordering::SeqCst);
        if let Some(slot) = &self.correlation {
            slot.set(store);
        }
    }
}

#[async_trait]
impl CountryDao for MockCountryDao {
    async fn create_country(&self, country: Country) -> Result<Country, CountryError> {
        if let Some(slot) = &self.correlation {
            if let Some(id) = slot.pop(&Country::entity_type())? {
                self.relayed.lock().unwrap().push(id);
            }
        }
        self.creates.respond(country)
    }

    async fn update_country(&self, country: Country) -> Result<Country, CountryError> {
        self.updates.respond(country)
    }

    async fn get_country(&self, iso2_code: &str) -> Result<Option<Country>, CountryError> {
        self.gets.respond(iso2_code.to_string())
    }
}
