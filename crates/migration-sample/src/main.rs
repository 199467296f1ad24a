//! # Country Migration Demo
//!
//! Walks a country table through a full cutover from the legacy store to the
//! replacement store:
//!
//! 1. **Initial**: Poland is created in the legacy store only.
//! 2. **Dual write**: Germany is created in both stores with the same id.
//! 3. **Dual read**: reading Germany agrees; reading Poland finds it missing from the
//!    replacement store, which is logged as an inconsistency and answered from legacy.
//! 4. **Destination proxy**: reads and updates go to the replacement store only.
//!
//! Run with `RUST_LOG=info` to see the phase switches and the inconsistency report.

use migration_framework::tracing::setup_tracing;
use migration_framework::{CallerContext, MigrationPhase};
use migration_sample::dao::CountryDao;
use migration_sample::lifecycle::MigrationSystem;
use migration_sample::model::Country;
use tracing::{info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let system = MigrationSystem::from_env(MigrationPhase::Initial).map_err(|e| e.to_string())?;
    let countries = system.countries.clone();

    // Each logical request runs under its own caller context.
    let span = tracing::info_span!("initial");
    let poland = CallerContext::generate()
        .scope(countries.create_country(Country::new("PL", "Poland")))
        .instrument(span)
        .await
        .map_err(|e| e.to_string())?;
    info!(id = ?poland.id, "Poland created in the legacy store");

    system.set_phase(MigrationPhase::DualWrite);
    let span = tracing::info_span!("dual_write");
    let germany = CallerContext::generate()
        .scope(countries.create_country(Country::new("DE", "Germany")))
        .instrument(span)
        .await
        .map_err(|e| e.to_string())?;
    let mirrored = system
        .replacement
        .get_country("DE")
        .await
        .map_err(|e| e.to_string())?;
    info!(legacy_id = ?germany.id, replacement_id = ?mirrored.and_then(|c| c.id), "Germany created in both stores");

    system.set_phase(MigrationPhase::DualRead);
    let span = tracing::info_span!("dual_read");
    async {
        let germany = countries.get_country("DE").await.map_err(|e| e.to_string())?;
        info!(found = germany.is_some(), "Germany read from both stores");

        let poland = countries.get_country("PL").await.map_err(|e| e.to_string())?;
        info!(found = poland.is_some(), "Poland answered by the legacy store");
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    system.set_phase(MigrationPhase::DestinationProxy);
    let span = tracing::info_span!("destination_proxy");
    async {
        let renamed = Country {
            name: "Federal Republic of Germany".to_string(),
            ..germany
        };
        countries.update_country(renamed).await.map_err(|e| e.to_string())?;

        let legacy_view = system.legacy.get_country("DE").await.map_err(|e| e.to_string())?;
        let replacement_view = countries.get_country("DE").await.map_err(|e| e.to_string())?;
        info!(
            legacy = ?legacy_view.map(|c| c.name),
            replacement = ?replacement_view.map(|c| c.name),
            "Update served by the replacement store only"
        );
        Ok::<_, String>(())
    }
    .instrument(span)
    .await?;

    let stats = system.stats();
    info!(calls = stats.calls, inconsistencies = stats.inconsistencies, "Migration facade statistics");

    drop(countries);
    system.shutdown().await?;

    info!("Demo completed successfully");
    Ok(())
}
