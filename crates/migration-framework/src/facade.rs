//! # Facade
//!
//! [`Facade`] is the object a wrapped interface delegates to. It owns both adapters, the
//! phase oracle, the optional correlation store, the worker pool for concurrent legs and
//! the registry of declared operations. Everything is wired and validated by
//! [`FacadeBuilder::build`]; after that the facade is immutable and can be shared
//! between tasks behind an `Arc`.
//!
//! ```rust,ignore
//! let facade = Facade::builder()
//!     .source(legacy)
//!     .destination(replacement)
//!     .oracle(oracle.clone())
//!     .correlation_store(store.clone())
//!     .register(&ops.get_country)
//!     .register(&ops.create_country)
//!     .build()?;
//!
//! let country = facade
//!     .call(&CallerContext::generate(), &ops.get_country, ("PL".to_string(),))
//!     .await?;
//! ```

use crate::adapter::StoreAdapter;
use crate::config::FacadeConfig;
use crate::correlation::{CallerContext, CorrelationStore};
use crate::dispatch::LegPlan;
use crate::error::FacadeError;
use crate::operation::{Arguments, Operation, OperationKind, OperationSpec};
use crate::oracle::PhaseOracle;
use crate::pool::WorkerPool;
use crate::registry::OperationRegistry;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{info, instrument};

/// Counters of a facade since it was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacadeStats {
    /// Calls that reached a flow.
    pub calls: u64,
    /// Calls whose two results disagreed.
    pub inconsistencies: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    calls: AtomicU64,
    inconsistencies: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_inconsistency(&self) {
        self.inconsistencies.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> FacadeStats {
        FacadeStats {
            calls: self.calls.load(Ordering::Relaxed),
            inconsistencies: self.inconsistencies.load(Ordering::Relaxed),
        }
    }
}

/// Routes calls of the wrapped interface `S` to the source and destination stores.
pub struct Facade<S: StoreAdapter + ?Sized> {
    pub(crate) source: Arc<S>,
    pub(crate) destination: Arc<S>,
    pub(crate) oracle: Arc<dyn PhaseOracle>,
    pub(crate) correlation: Option<Arc<CorrelationStore>>,
    pub(crate) binding: OnceLock<bool>,
    pub(crate) pool: WorkerPool,
    pub(crate) registry: OperationRegistry,
    pub(crate) config: FacadeConfig,
    pub(crate) stats: StatsCounters,
}

impl<S: StoreAdapter + ?Sized + 'static> Facade<S> {
    pub fn builder() -> FacadeBuilder<S> {
        FacadeBuilder::default()
    }

    /// Runs `op` with `args` on behalf of the caller identified by `ctx`.
    ///
    /// The operation's kind comes from the registry; an operation the facade was not
    /// built with fails with a configuration error.
    #[instrument(skip_all, fields(operation = %op.name(), context = %ctx))]
    pub async fn call<A, R>(
        &self,
        ctx: &CallerContext,
        op: &Operation<S, A, R>,
        args: A,
    ) -> Result<R, FacadeError>
    where
        A: Arguments,
        R: PartialEq + Send + 'static,
    {
        let kind = self.registry.resolve(op.spec())?;
        self.stats.record_call();

        match kind {
            OperationKind::Read => {
                let plan = LegPlan::for_reads(self.oracle.as_ref());
                self.dual_call(ctx, kind, op, args, plan).await
            }
            OperationKind::Update => {
                let plan = LegPlan::for_writes(self.oracle.as_ref());
                self.dual_call(ctx, kind, op, args, plan).await
            }
            OperationKind::Create => {
                let plan = LegPlan::for_writes(self.oracle.as_ref());
                self.create(ctx, op, args, plan).await
            }
        }
    }

    /// [`Facade::call`] with the caller context currently in scope. Without a scope the
    /// call gets a fresh context of its own, so concurrent unscoped creates never share
    /// a correlation queue.
    pub async fn call_current<A, R>(&self, op: &Operation<S, A, R>, args: A) -> Result<R, FacadeError>
    where
        A: Arguments,
        R: PartialEq + Send + 'static,
    {
        let ctx = CallerContext::try_current().unwrap_or_else(CallerContext::generate);
        self.call(&ctx, op, args).await
    }

    /// Stops the worker pool. Later reads and updates that need the destination fail
    /// with [`BackendError::PoolClosed`](crate::BackendError::PoolClosed).
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }

    pub fn stats(&self) -> FacadeStats {
        self.stats.snapshot()
    }

    pub fn correlation_store(&self) -> Option<&Arc<CorrelationStore>> {
        self.correlation.as_ref()
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }
}

/// Wires and validates a [`Facade`].
pub struct FacadeBuilder<S: ?Sized> {
    source: Option<Arc<S>>,
    destination: Option<Arc<S>>,
    oracle: Option<Arc<dyn PhaseOracle>>,
    correlation: Option<Arc<CorrelationStore>>,
    config: FacadeConfig,
    operations: Vec<OperationSpec>,
}

impl<S: ?Sized> Default for FacadeBuilder<S> {
    fn default() -> Self {
        Self {
            source: None,
            destination: None,
            oracle: None,
            correlation: None,
            config: FacadeConfig::default(),
            operations: Vec::new(),
        }
    }
}

impl<S: StoreAdapter + ?Sized + 'static> FacadeBuilder<S> {
    /// The legacy store.
    pub fn source(mut self, adapter: Arc<S>) -> Self {
        self.source = Some(adapter);
        self
    }

    /// The replacement store.
    pub fn destination(mut self, adapter: Arc<S>) -> Self {
        self.destination = Some(adapter);
        self
    }

    pub fn oracle<O: PhaseOracle + 'static>(mut self, oracle: Arc<O>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// The store used to relay source-generated ids into destination creates. Without
    /// one, the destination generates its own ids.
    pub fn correlation_store(mut self, store: Arc<CorrelationStore>) -> Self {
        self.correlation = Some(store);
        self
    }

    pub fn config(mut self, config: FacadeConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds an operation of the wrapped interface. Validated by [`FacadeBuilder::build`].
    pub fn register<A, R>(mut self, op: &Operation<S, A, R>) -> Self {
        self.operations.push(op.spec().clone());
        self
    }

    /// Validates every registered operation and the configuration, then starts the
    /// worker pool. Must run inside a tokio runtime.
    pub fn build(self) -> Result<Facade<S>, FacadeError> {
        let source = self
            .source
            .ok_or_else(|| FacadeError::configuration("facade needs a source adapter"))?;
        let destination = self
            .destination
            .ok_or_else(|| FacadeError::configuration("facade needs a destination adapter"))?;
        let oracle = self
            .oracle
            .ok_or_else(|| FacadeError::configuration("facade needs a phase oracle"))?;

        let mut registry = OperationRegistry::new();
        for spec in &self.operations {
            registry.register(spec)?;
        }

        let pool = WorkerPool::start(&self.config)?;
        info!(
            operation_count = registry.len(),
            correlated = self.correlation.is_some(),
            "Migration facade built"
        );

        Ok(Facade {
            source,
            destination,
            oracle,
            correlation: self.correlation,
            binding: OnceLock::new(),
            pool,
            registry,
            config: self.config,
            stats: StatsCounters::default(),
        })
    }
}
