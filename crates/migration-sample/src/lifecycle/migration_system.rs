use crate::dao::{CountryDao, LegacyCountryDao, ReplacementCountryDao};
use crate::facade::CountryDaoFacade;
use crate::store;
use migration_framework::{
    CorrelationConfig, CorrelationStore, Facade, FacadeConfig, FacadeError, FacadeStats,
    MigrationPhase, SwitchableOracle,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// The whole sample wired together: two store actors, their DAOs, the correlation
/// store, a switchable oracle and the facade in front of everything.
pub struct MigrationSystem {
    pub countries: Arc<CountryDaoFacade>,
    pub legacy: Arc<LegacyCountryDao>,
    pub replacement: Arc<ReplacementCountryDao>,
    pub oracle: Arc<SwitchableOracle>,
    pub correlation: Arc<CorrelationStore>,
    handles: Vec<JoinHandle<()>>,
}

impl MigrationSystem {
    /// Starts the system in `phase` with default settings.
    pub fn new(phase: MigrationPhase) -> Result<Self, FacadeError> {
        Self::with_config(phase, FacadeConfig::default(), CorrelationConfig::default())
    }

    /// Starts the system with settings read from `MIGRATION_*` environment variables.
    pub fn from_env(phase: MigrationPhase) -> Result<Self, FacadeError> {
        Self::with_config(phase, FacadeConfig::from_env()?, CorrelationConfig::from_env()?)
    }

    pub fn with_config(
        phase: MigrationPhase,
        config: FacadeConfig,
        correlation: CorrelationConfig,
    ) -> Result<Self, FacadeError> {
        // 1. Tables
        let (legacy_actor, legacy_client) = store::new("legacy");
        let (replacement_actor, replacement_client) = store::new("replacement");
        let handles = vec![
            tokio::spawn(legacy_actor.run()),
            tokio::spawn(replacement_actor.run()),
        ];

        // 2. DAOs and shared migration state
        let legacy = Arc::new(LegacyCountryDao::new(legacy_client));
        let replacement = Arc::new(ReplacementCountryDao::new(replacement_client));
        let oracle = Arc::new(SwitchableOracle::new(phase));
        let correlation = Arc::new(CorrelationStore::with_config(correlation));

        // 3. The facade
        let builder = Facade::<dyn CountryDao>::builder()
            .source(legacy.clone())
            .destination(replacement.clone())
            .oracle(oracle.clone())
            .correlation_store(correlation.clone())
            .config(config);
        let countries = Arc::new(CountryDaoFacade::build(builder)?);

        info!(%phase, "Migration system started");
        Ok(Self {
            countries,
            legacy,
            replacement,
            oracle,
            correlation,
            handles,
        })
    }

    /// Switches the migration phase for every later call.
    ///
    /// The facade always carries a correlation store here, so the replacement DAO
    /// expects a relayed id on every create. A create in
    /// [`MigrationPhase::DestinationProxy`] skips the legacy store, relays nothing, and
    /// fails with [`CountryError::Correlation`](crate::model::CountryError::Correlation).
    /// Reads and updates are unaffected. Creating after cutover needs a facade built
    /// without a correlation store.
    pub fn set_phase(&self, phase: MigrationPhase) {
        self.oracle.set_phase(phase);
    }

    pub fn stats(&self) -> FacadeStats {
        self.countries.facade().stats()
    }

    /// Stops the facade's workers, drops every store client and waits for the tables
    /// to shut down.
    ///
    /// Clones of the DAOs held elsewhere keep their table running; drop them first.
    pub async fn shutdown(self) -> Result<(), String> {
        self.countries.shutdown().await;
        drop(self.countries);
        drop(self.legacy);
        drop(self.replacement);
        self.correlation.clear();

        for handle in self.handles {
            handle.await.map_err(|e| e.to_string())?;
        }
        info!("Migration system stopped");
        Ok(())
    }
}
