//! # Configuration
//!
//! Tunables for the facade's worker pool and the correlation store. Both structs are
//! plain serde values with sensible defaults, so they can be embedded in whatever
//! configuration file the surrounding application already loads, built in code with the
//! `with_*` methods, or read from the environment with `from_env()`.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `MIGRATION_POOL_SIZE` | [`FacadeConfig::pool_size`] | 4 |
//! | `MIGRATION_QUEUE_DEPTH` | [`FacadeConfig::queue_depth`] | 32 |
//! | `MIGRATION_JOIN_TIMEOUT_MS` | [`FacadeConfig::join_timeout_ms`] | unbounded |
//! | `MIGRATION_MAX_PENDING_IDS` | [`CorrelationConfig::max_pending_per_context`] | unbounded |

use crate::error::FacadeError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_POOL_SIZE: &str = "MIGRATION_POOL_SIZE";
pub const ENV_QUEUE_DEPTH: &str = "MIGRATION_QUEUE_DEPTH";
pub const ENV_JOIN_TIMEOUT_MS: &str = "MIGRATION_JOIN_TIMEOUT_MS";
pub const ENV_MAX_PENDING_IDS: &str = "MIGRATION_MAX_PENDING_IDS";

/// Worker pool and join settings of a [`Facade`](crate::Facade).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacadeConfig {
    /// Number of long-lived workers running destination legs.
    pub pool_size: usize,
    /// Capacity of the job channel feeding the workers. Submitters wait when it is full.
    pub queue_depth: usize,
    /// Upper bound on the wait for a concurrent destination leg. `None` waits forever.
    pub join_timeout_ms: Option<u64>,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            queue_depth: 32,
            join_timeout_ms: None,
        }
    }
}

impl FacadeConfig {
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn join_timeout(&self) -> Option<Duration> {
        self.join_timeout_ms.map(Duration::from_millis)
    }

    /// Defaults overridden by any `MIGRATION_*` variables that are set.
    pub fn from_env() -> Result<Self, FacadeError> {
        let mut config = Self::default();
        if let Some(pool_size) = env_value(ENV_POOL_SIZE)? {
            config.pool_size = pool_size;
        }
        if let Some(queue_depth) = env_value(ENV_QUEUE_DEPTH)? {
            config.queue_depth = queue_depth;
        }
        if let Some(timeout) = env_value(ENV_JOIN_TIMEOUT_MS)? {
            config.join_timeout_ms = Some(timeout);
        }
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the pool cannot run with.
    pub fn validate(&self) -> Result<(), FacadeError> {
        if self.pool_size == 0 {
            return Err(FacadeError::configuration("pool_size must be at least 1"));
        }
        if self.queue_depth == 0 {
            return Err(FacadeError::configuration("queue_depth must be at least 1"));
        }
        Ok(())
    }
}

/// Settings of a [`CorrelationStore`](crate::CorrelationStore).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Maximum ids waiting per `(entity type, caller context)`. Oldest ids are evicted
    /// beyond it. `None` leaves queues unbounded.
    pub max_pending_per_context: Option<usize>,
}

impl CorrelationConfig {
    pub fn with_max_pending(mut self, max: usize) -> Self {
        self.max_pending_per_context = Some(max);
        self
    }

    pub fn from_env() -> Result<Self, FacadeError> {
        Ok(Self {
            max_pending_per_context: env_value(ENV_MAX_PENDING_IDS)?,
        })
    }
}

fn env_value<T: FromStr>(name: &str) -> Result<Option<T>, FacadeError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| FacadeError::configuration(format!("{} has an invalid value: {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}
