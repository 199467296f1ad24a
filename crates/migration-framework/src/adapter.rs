//! # Adapter Capabilities
//!
//! A wrapped interface (`CountryDao`, say) extends [`StoreAdapter`], which is how the
//! facade discovers optional capabilities of the adapters it is handed. Today there is
//! one: [`CorrelatedCreate`], implemented by destination adapters that want to reuse
//! the identifiers generated by the source store.

use crate::correlation::{CorrelationStore, EntityId, EntityTypeKey};
use crate::error::CorrelationError;
use std::sync::{Arc, OnceLock};
use tracing::warn;

/// Supertrait of every interface the facade can wrap.
pub trait StoreAdapter: Send + Sync {
    /// The correlation capability of this adapter, if it has one.
    fn correlated_create(&self) -> Option<&dyn CorrelatedCreate> {
        None
    }
}

/// An adapter that takes the identifiers of the entities it creates from a
/// [`CorrelationStore`].
pub trait CorrelatedCreate: Send + Sync {
    /// The store this adapter pops from, if one is bound.
    fn correlation_store(&self) -> Option<Arc<CorrelationStore>>;

    /// Binds the store this adapter pops from.
    fn set_correlation_store(&self, store: Arc<CorrelationStore>);
}

/// Set-once holder for a bound [`CorrelationStore`].
///
/// Embed one in an adapter and forward the [`CorrelatedCreate`] methods to it.
#[derive(Debug, Default)]
pub struct CorrelationSlot {
    store: OnceLock<Arc<CorrelationStore>>,
}

impl CorrelationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<CorrelationStore>> {
        self.store.get().cloned()
    }

    /// Binds `store`. A second bind is ignored; the first store stays in place.
    pub fn set(&self, store: Arc<CorrelationStore>) {
        if self.store.set(store).is_err() {
            warn!("Correlation store already bound; keeping the first one");
        }
    }

    pub fn is_bound(&self) -> bool {
        self.store.get().is_some()
    }

    /// Pops the next id for `entity_type` in the current caller context.
    ///
    /// `Ok(None)` when no store is bound, so the adapter generates its own id.
    pub fn pop(&self, entity_type: &EntityTypeKey) -> Result<Option<EntityId>, CorrelationError> {
        match self.store.get() {
            Some(store) => store.pop(entity_type).map(Some),
            None => Ok(None),
        }
    }
}
