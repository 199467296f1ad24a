//! # System Lifecycle
//!
//! [`MigrationSystem`] is the conductor of the sample: it starts both store actors,
//! wires the DAOs to the facade, and shuts everything down in the right order.
//!
//! ## Startup
//!
//! 1. **Tables**: spawn the legacy and replacement [`StoreActor`](crate::store::StoreActor)s.
//! 2. **DAOs**: wrap each table's client in its DAO.
//! 3. **Migration state**: create the [`SwitchableOracle`](migration_framework::SwitchableOracle)
//!    and the [`CorrelationStore`](migration_framework::CorrelationStore). Both are owned here
//!    and handed to the facade explicitly.
//! 4. **Facade**: build the [`CountryDaoFacade`](crate::facade::CountryDaoFacade). The
//!    replacement DAO is bound to the correlation store on the first create that needs it.
//!
//! ## Shutdown
//!
//! 1. **Stop the worker pool**: in-flight destination legs finish first.
//! 2. **Drop all DAOs**: this closes the senders of both tables.
//! 3. **Await the tables**: each actor drains its queue and exits.
//!
//! ## Switching phases
//!
//! ```rust,ignore
//! let system = MigrationSystem::new(MigrationPhase::Initial)?;
//! system.set_phase(MigrationPhase::DualWrite);   // next call writes both stores
//! ```
//!
//! The oracle is read once at the start of each call, so a call in flight finishes
//! under the phase it started with.
//!
//! **Logging:** call [`setup_tracing`](migration_framework::tracing::setup_tracing) once
//! before starting the system.
//!
//! ```bash
//! RUST_LOG=info cargo run      # Phases, inconsistencies
//! RUST_LOG=debug cargo run     # Every leg and every relayed id
//! ```

pub mod migration_system;

pub use migration_system::*;
