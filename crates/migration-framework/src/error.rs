//! # Facade Errors
//!
//! This module defines the error types surfaced by the migration facade. Each concern
//! gets its own enum and [`FacadeError`] composes them, so callers can match on the
//! category they care about while still using a single `Result` type.
//!
//! Inconsistencies between the two stores are **not** errors. They are logged and
//! resolved by picking the authoritative result. Only structural and backend
//! failures end up here.

use crate::correlation::{CallerContext, EntityTypeKey};
use std::fmt;
use std::time::Duration;

/// Boxed error returned by a store adapter, preserved unchanged.
pub type AdapterError = Box<dyn std::error::Error + Send + Sync>;

/// Which backing store a leg of a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreSide {
    /// The legacy store, authoritative on disagreement.
    Source,
    /// The replacement store, preferred on agreement.
    Destination,
}

impl fmt::Display for StoreSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreSide::Source => f.write_str("source"),
            StoreSide::Destination => f.write_str("destination"),
        }
    }
}

/// Top-level error returned by [`Facade`](crate::Facade) calls and construction.
#[derive(Debug, thiserror::Error)]
pub enum FacadeError {
    /// Wiring problem: missing or ambiguous kind tag, duplicate or unknown operation,
    /// invalid configuration value.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// One of the adapters failed, or the concurrent leg could not be joined.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The correlation store had nothing to hand out.
    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    /// Both legs were disabled for a call that completed. This is a dispatcher defect
    /// (or a misconfigured phase), never a valid outcome.
    #[error("No store produced a result for {operation}")]
    NoResult { operation: String },
}

impl FacadeError {
    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        FacadeError::Configuration(msg.into())
    }

    /// Returns `true` for every failure that came from (or while waiting on) a store.
    pub fn is_backend(&self) -> bool {
        matches!(self, FacadeError::Backend(_))
    }

    /// Unwraps the original adapter error, if this failure is an adapter invocation error.
    ///
    /// Wrapped interfaces use this to hand their callers the exact error the store raised.
    pub fn into_adapter_error(self) -> Result<AdapterError, FacadeError> {
        match self {
            FacadeError::Backend(BackendError::Invocation { source, .. }) => Ok(source),
            other => Err(other),
        }
    }
}

/// Failures of a backing-store call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The adapter returned an error. `source` is the adapter's own error, untouched.
    #[error("{side} store failed in {operation}: {source}")]
    Invocation {
        side: StoreSide,
        operation: String,
        #[source]
        source: AdapterError,
    },

    /// The join on the concurrent destination leg exceeded the configured bound.
    #[error("{side} store timed out in {operation} after {after:?}")]
    Timeout {
        side: StoreSide,
        operation: String,
        after: Duration,
    },

    /// The worker pool no longer accepts jobs.
    #[error("Worker pool closed")]
    PoolClosed,

    /// The worker dropped the response channel before answering (e.g. the adapter panicked).
    #[error("Worker dropped the result of {operation}")]
    WorkerLost { operation: String },
}

impl BackendError {
    /// The adapter error behind an [`BackendError::Invocation`], if any.
    pub fn adapter_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            BackendError::Invocation { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Failures of the correlation store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorrelationError {
    /// `pop` found no queue, or an empty queue, for the entity type and caller context.
    #[error("No ids found for {entity_type} context={context}")]
    EmptyQueue {
        entity_type: EntityTypeKey,
        context: CallerContext,
    },
}
