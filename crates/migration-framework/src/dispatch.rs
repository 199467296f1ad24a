//! # Dispatch Flows
//!
//! The three ways a call can travel through the facade.
//!
//! **Read and update** run the destination leg on the worker pool, call the source in
//! the caller's own task, then join:
//!
//! ```text
//! caller ──► submit(destination) ──► source ──► join(destination) ──► reconcile
//! ```
//!
//! **Create** is sequential, because the destination consumes the id the source just
//! generated:
//!
//! ```text
//! caller ──► source ──► push id ──► destination (pops id) ──► reconcile
//! ```
//!
//! Every leg runs inside [`CallerContext::scope`], so a destination adapter popping from
//! the correlation store sees the caller's context even on a pool worker. A source
//! failure aborts the call before the destination result is consumed; a destination
//! failure surfaces from the join.

use crate::adapter::{CorrelatedCreate, StoreAdapter};
use crate::correlation::{CallerContext, CorrelationStore, EntityId};
use crate::error::{BackendError, FacadeError, StoreSide};
use crate::facade::Facade;
use crate::operation::{render_call, Arguments, Operation, OperationKind};
use crate::oracle::PhaseOracle;
use crate::reconcile::{reconcile, report_inconsistency};
use std::sync::Arc;
use tracing::{debug, warn};

/// The oracle's answers for one call, taken once when the call starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegPlan {
    pub source: bool,
    pub destination: bool,
    pub check: bool,
}

impl LegPlan {
    pub fn for_reads(oracle: &dyn PhaseOracle) -> Self {
        Self {
            source: oracle.should_read_source(),
            destination: oracle.should_read_destination(),
            check: oracle.should_check_read_consistency(),
        }
    }

    pub fn for_writes(oracle: &dyn PhaseOracle) -> Self {
        Self {
            source: oracle.should_write_source(),
            destination: oracle.should_write_destination(),
            check: oracle.should_check_write_consistency(),
        }
    }
}

impl<S: StoreAdapter + ?Sized + 'static> Facade<S> {
    /// Read and update flow.
    pub(crate) async fn dual_call<A, R>(
        &self,
        ctx: &CallerContext,
        kind: OperationKind,
        op: &Operation<S, A, R>,
        args: A,
        plan: LegPlan,
    ) -> Result<R, FacadeError>
    where
        A: Arguments,
        R: PartialEq + Send + 'static,
    {
        let call = render_call(op.name(), &args);
        debug!(
            entity_type = %op.entity_type(),
            %kind,
            call = %call,
            source = plan.source,
            destination = plan.destination,
            check = plan.check,
            "{} {} {}",
            verb(kind),
            op.entity_type(),
            call
        );

        let pending = if plan.destination {
            debug!(side = %StoreSide::Destination, call = %call, "Submitting concurrent leg");
            let leg = ctx
                .clone()
                .scope(op.invoke(self.destination.clone(), args.clone()));
            Some(self.pool.submit(StoreSide::Destination, op.name(), leg).await?)
        } else {
            None
        };

        let source_result = if plan.source {
            Some(self.invoke_leg(StoreSide::Source, ctx, op, args).await?)
        } else {
            None
        };

        let destination_result = match pending {
            Some(pending) => {
                let joined = pending.join(self.config.join_timeout()).await?;
                Some(joined.map_err(|source| invocation_error(StoreSide::Destination, op, source))?)
            }
            None => None,
        };

        self.settle(op, &call, plan, source_result, destination_result)
    }

    /// Create flow.
    pub(crate) async fn create<A, R>(
        &self,
        ctx: &CallerContext,
        op: &Operation<S, A, R>,
        args: A,
        plan: LegPlan,
    ) -> Result<R, FacadeError>
    where
        A: Arguments,
        R: PartialEq + Send + 'static,
    {
        let call = render_call(op.name(), &args);
        debug!(
            entity_type = %op.entity_type(),
            call = %call,
            source = plan.source,
            destination = plan.destination,
            check = plan.check,
            "Creating {} {}",
            op.entity_type(),
            call
        );

        let source_entity = if plan.source {
            Some(self.invoke_leg(StoreSide::Source, ctx, op, args.clone()).await?)
        } else {
            None
        };

        let destination_entity = if plan.destination {
            let relayed = match self.bound_correlation_store() {
                Some(store) => source_entity
                    .as_ref()
                    .and_then(|entity| relay_id(store, ctx, op, entity, &call)),
                None => None,
            };

            match self.invoke_leg(StoreSide::Destination, ctx, op, args).await {
                Ok(entity) => Some(entity),
                Err(err) => {
                    if let Some((store, id)) = relayed {
                        store.discard(ctx, op.entity_type(), &id);
                    }
                    return Err(err);
                }
            }
        } else {
            None
        };

        self.settle(op, &call, plan, source_entity, destination_entity)
    }

    /// Runs one leg in the caller's task, inside the caller's context.
    async fn invoke_leg<A, R>(
        &self,
        side: StoreSide,
        ctx: &CallerContext,
        op: &Operation<S, A, R>,
        args: A,
    ) -> Result<R, FacadeError>
    where
        A: Arguments,
        R: Send + 'static,
    {
        debug!(%side, operation = op.name(), "Invoking leg");
        let adapter = match side {
            StoreSide::Source => self.source.clone(),
            StoreSide::Destination => self.destination.clone(),
        };
        ctx.clone()
            .scope(op.invoke(adapter, args))
            .await
            .map_err(|source| invocation_error(side, op, source))
    }

    /// Picks the returned value and reports a disagreement.
    fn settle<A, R>(
        &self,
        op: &Operation<S, A, R>,
        call: &str,
        plan: LegPlan,
        source: Option<R>,
        destination: Option<R>,
    ) -> Result<R, FacadeError>
    where
        R: PartialEq,
    {
        let winner = if plan.check && source.is_some() {
            let outcome = reconcile(source, destination);
            if outcome.mismatched {
                self.stats.record_inconsistency();
                report_inconsistency(op.entity_type(), op.name(), call);
            }
            outcome.winner
        } else {
            destination.or(source)
        };

        winner.ok_or_else(|| FacadeError::NoResult {
            operation: op.name().to_string(),
        })
    }

    /// The correlation store, bound to the destination adapter, when both the store and
    /// the capability are present.
    ///
    /// The adapter's binding methods run at most once for the lifetime of this facade.
    fn bound_correlation_store(&self) -> Option<&Arc<CorrelationStore>> {
        let store = self.correlation.as_ref()?;
        let capable = self.destination.correlated_create()?;
        let bound = *self.binding.get_or_init(|| bind(capable, store));
        bound.then_some(store)
    }
}

fn bind(capable: &dyn CorrelatedCreate, store: &Arc<CorrelationStore>) -> bool {
    match capable.correlation_store() {
        None => {
            debug!("Binding correlation store to destination adapter");
            capable.set_correlation_store(store.clone());
            true
        }
        Some(existing) if Arc::ptr_eq(&existing, store) => true,
        Some(_) => {
            warn!("Destination adapter already has another correlation store; ids will not be relayed");
            false
        }
    }
}

fn relay_id<S: ?Sized, A, R>(
    store: &Arc<CorrelationStore>,
    ctx: &CallerContext,
    op: &Operation<S, A, R>,
    entity: &R,
    call: &str,
) -> Option<(Arc<CorrelationStore>, EntityId)> {
    match op.extract_id(entity) {
        Some(id) => {
            store.push_for(ctx, op.entity_type(), id.clone());
            Some((store.clone(), id))
        }
        None => {
            warn!(
                entity_type = %op.entity_type(),
                call,
                "Source entity has no id; nothing to relay"
            );
            None
        }
    }
}

fn invocation_error<S: ?Sized, A, R>(
    side: StoreSide,
    op: &Operation<S, A, R>,
    source: crate::error::AdapterError,
) -> FacadeError {
    BackendError::Invocation {
        side,
        operation: op.name().to_string(),
        source,
    }
    .into()
}

fn verb(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Read => "Reading",
        OperationKind::Update => "Writing",
        OperationKind::Create => "Creating",
    }
}
