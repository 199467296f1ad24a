//! # Migration Framework
//!
//! This crate provides the building blocks for migrating a data-access interface from a
//! legacy store to a replacement store **without touching its call sites**. Callers
//! keep talking to one interface; underneath, a [`Facade`] decides per call whether the
//! legacy (source) store, the replacement (destination) store, or both should serve it,
//! compares the answers, and reports any disagreement.
//!
//! ## Why a facade?
//!
//! A cutover is rarely a single switch. It goes through phases:
//!
//! 1. **Initial**: only the source store is used.
//! 2. **Dual write**: writes go to both stores and are compared; reads stay on the source.
//! 3. **Dual read**: reads go to both stores too, and are compared.
//! 4. **Destination proxy**: the destination store serves everything.
//!
//! Which phase is active is decided by a [`PhaseOracle`] (a feature-flag service in
//! production, a [`SwitchableOracle`] in tests and demos), consulted once per call.
//!
//! ## Architecture Overview
//!
//! ```text
//! caller ──► Facade::call ──► registry (kind) ──► oracle (LegPlan)
//!                                   │
//!            ┌──────────────────────┼────────────────────────┐
//!          Read / Update                                   Create
//!   destination on WorkerPool ║ source inline     source ──► CorrelationStore::push
//!            └──── join ──────┘                             ──► destination (pops id)
//!                                   │
//!                           reconcile + report
//! ```
//!
//! - **[`Operation`]**: a typed declaration of one interface member (name, kind, handler).
//! - **[`OperationRegistry`]**: the validated set of operations a facade accepts.
//! - **[`WorkerPool`]**: long-lived workers that run the concurrent destination leg.
//! - **[`CorrelationStore`]**: relays ids generated by the source store into destination
//!   creates, keyed by entity type and [`CallerContext`].
//! - **[`reconcile`]**: destination wins on agreement, source wins on disagreement.
//!
//! ## Wrapping an interface
//!
//! ```rust
//! use migration_framework::{
//!     CallerContext, Facade, MigrationPhase, Operation, StoreAdapter, SwitchableOracle,
//! };
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("store unavailable")]
//! struct StoreError;
//!
//! #[async_trait]
//! trait Greetings: StoreAdapter {
//!     async fn greeting(&self, lang: &str) -> Result<String, StoreError>;
//! }
//!
//! struct Legacy;
//! struct Replacement;
//! impl StoreAdapter for Legacy {}
//! impl StoreAdapter for Replacement {}
//!
//! #[async_trait]
//! impl Greetings for Legacy {
//!     async fn greeting(&self, _lang: &str) -> Result<String, StoreError> { Ok("hello".into()) }
//! }
//!
//! #[async_trait]
//! impl Greetings for Replacement {
//!     async fn greeting(&self, _lang: &str) -> Result<String, StoreError> { Ok("hello".into()) }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let greeting = Operation::<dyn Greetings, (String,), String>::builder("greeting")
//!         .entity("Greeting")
//!         .read()
//!         .handler(|store: Arc<dyn Greetings>, (lang,): (String,)| async move {
//!             store.greeting(&lang).await
//!         });
//!
//!     let facade = Facade::<dyn Greetings>::builder()
//!         .source(Arc::new(Legacy))
//!         .destination(Arc::new(Replacement))
//!         .oracle(Arc::new(SwitchableOracle::new(MigrationPhase::DualRead)))
//!         .register(&greeting)
//!         .build()
//!         .unwrap();
//!
//!     let ctx = CallerContext::generate();
//!     let text = facade.call(&ctx, &greeting, ("en".to_string(),)).await.unwrap();
//!     assert_eq!(text, "hello");
//!     assert_eq!(facade.stats().inconsistencies, 0);
//!     facade.shutdown().await;
//! }
//! ```
//!
//! ## Error handling
//!
//! Disagreements between the stores are not errors: they are logged at `error` level and
//! resolved by the rule above. [`FacadeError`] covers only wiring mistakes
//! ([`FacadeError::Configuration`]), store failures ([`BackendError`]) and an exhausted
//! [`CorrelationStore`] queue ([`CorrelationError`]). An adapter's own error travels
//! untouched inside [`BackendError::Invocation`].
//!
//! ## Testing
//!
//! See [`mock`] for the expectation queue used to build mock adapters.

pub mod adapter;
pub mod config;
pub mod correlation;
pub mod dispatch;
pub mod error;
pub mod facade;
pub mod mock;
pub mod operation;
pub mod oracle;
pub mod pool;
pub mod reconcile;
pub mod registry;
pub mod tracing;

pub use adapter::{CorrelatedCreate, CorrelationSlot, StoreAdapter};
pub use config::{CorrelationConfig, FacadeConfig};
pub use correlation::{CallerContext, CorrelationStore, EntityId, EntityTypeKey};
pub use dispatch::LegPlan;
pub use error::{AdapterError, BackendError, CorrelationError, FacadeError, StoreSide};
pub use facade::{Facade, FacadeBuilder, FacadeStats};
pub use operation::{render_call, Arguments, Operation, OperationBuilder, OperationKind, RoutingMarker};
pub use oracle::{MigrationPhase, PhaseFlags, PhaseOracle, SwitchableOracle};
pub use pool::{PendingCall, WorkerPool};
pub use reconcile::{reconcile, Reconciled};
pub use registry::OperationRegistry;
