//! # Correlation Store
//!
//! A keyed FIFO relay that carries an identifier generated by the source store into the
//! destination store's create call, without adding a parameter to that call.
//!
//! The facade pushes the source-generated id right before it invokes the destination
//! adapter; the destination adapter pops it while creating the entity and uses it
//! instead of generating its own.
//!
//! ## Scoping
//!
//! Queues are keyed by `(EntityTypeKey, CallerContext)`. The caller context is an
//! explicit value handed to [`Facade::call`](crate::Facade::call). While a leg runs, the
//! facade installs that value as a task-local (see [`CallerContext::scope`]), so an
//! adapter calling [`CorrelationStore::pop`] sees the same context the facade pushed
//! under, even when the leg executes on a pool worker. [`Facade::call_current`](crate::Facade::call_current)
//! gives every unscoped call a fresh context. Direct store access outside of any scope
//! falls back to the identity of the current thread.
//!
//! ## Concurrency
//!
//! Queues live in a sharded [`DashMap`]; pushes and pops for different contexts do not
//! serialize on one lock.

use crate::config::CorrelationConfig;
use crate::error::CorrelationError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

tokio::task_local! {
    static CURRENT_CONTEXT: CallerContext;
}

// =============================================================================
// KEYS & VALUES
// =============================================================================

/// Stable name of the kind of entity being created (e.g. `"Country"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityTypeKey(String);

impl EntityTypeKey {
    /// Key used by the untyped [`CorrelationStore::push_default`] / [`CorrelationStore::pop_default`].
    pub const DEFAULT: &'static str = "Object";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derives the key from a Rust type, following the first generic argument down to
    /// the innermost type and keeping its last path segment: `Option<sample::Country>`
    /// and `Result<sample::Country, sample::Error>` both become `"Country"`.
    pub fn of<T: ?Sized>() -> Self {
        let mut name = std::any::type_name::<T>();
        while let Some(pos) = name.find(['<', ',', '>']) {
            if name[pos..].starts_with('<') {
                name = &name[pos + 1..];
            } else {
                name = &name[..pos];
                break;
            }
        }
        let name = name.trim();
        let short = name.rsplit("::").next().unwrap_or(name);
        Self(short.to_string())
    }

    pub fn default_key() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityTypeKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// An identifier relayed from one store to the other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityId {
    Numeric(u64),
    Text(String),
}

impl EntityId {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            EntityId::Numeric(n) => Some(*n),
            EntityId::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            EntityId::Numeric(_) => None,
            EntityId::Text(s) => Some(s),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Numeric(n) => write!(f, "{}", n),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        EntityId::Numeric(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId::Text(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::Text(id.to_string())
    }
}

/// Identity of the logical caller a correlation queue belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerContext(String);

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

impl CallerContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh context, unique within this process.
    pub fn generate() -> Self {
        let n = NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed);
        Self(format!("ctx-{}", n))
    }

    /// Context derived from the identity of the current OS thread.
    pub fn from_current_thread() -> Self {
        Self(format!("{:?}", std::thread::current().id()))
    }

    /// The context installed by the innermost [`CallerContext::scope`], if any.
    pub fn try_current() -> Option<Self> {
        CURRENT_CONTEXT.try_with(|ctx| ctx.clone()).ok()
    }

    /// The context installed by the innermost [`CallerContext::scope`], or the current
    /// thread's context when no scope is active.
    ///
    /// Tasks sharing a worker thread share the thread's context, so callers that run
    /// concurrently must install their own scope.
    pub fn current() -> Self {
        Self::try_current().unwrap_or_else(Self::from_current_thread)
    }

    /// Runs `fut` with this context installed as the current one.
    pub async fn scope<F>(self, fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_CONTEXT.scope(self, fut).await
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// THE STORE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CorrelationKey {
    entity_type: EntityTypeKey,
    context: CallerContext,
}

/// FIFO identifier relay, one queue per `(entity type, caller context)`.
///
/// Owned explicitly by whoever builds the facade and shared as `Arc<CorrelationStore>`
/// with the facade and with correlation-capable destination adapters.
#[derive(Debug, Default)]
pub struct CorrelationStore {
    queues: DashMap<CorrelationKey, VecDeque<EntityId>>,
    config: CorrelationConfig,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CorrelationConfig) -> Self {
        Self {
            queues: DashMap::new(),
            config,
        }
    }

    /// Appends `id` to the queue of `entity_type` for the current caller context.
    pub fn push(&self, entity_type: &EntityTypeKey, id: impl Into<EntityId>) {
        self.push_for(&CallerContext::current(), entity_type, id);
    }

    /// Removes and returns the head of the queue of `entity_type` for the current caller context.
    pub fn pop(&self, entity_type: &EntityTypeKey) -> Result<EntityId, CorrelationError> {
        self.pop_for(&CallerContext::current(), entity_type)
    }

    /// Appends `id` to the tail of the `(entity_type, context)` queue, creating it if absent.
    ///
    /// Never fails. With `max_pending_per_context` configured, the oldest ids beyond
    /// the bound are evicted.
    pub fn push_for(
        &self,
        context: &CallerContext,
        entity_type: &EntityTypeKey,
        id: impl Into<EntityId>,
    ) {
        let id = id.into();
        debug!(entity_type = %entity_type, %context, %id, "Storing id");
        let mut queue = self.queues.entry(key(context, entity_type)).or_default();
        queue.push_back(id);

        if let Some(max) = self.config.max_pending_per_context {
            while queue.len() > max.max(1) {
                if let Some(evicted) = queue.pop_front() {
                    warn!(entity_type = %entity_type, %context, id = %evicted, "Evicted unclaimed id");
                }
            }
        }
    }

    /// Removes and returns the head of the `(entity_type, context)` queue.
    ///
    /// Fails with [`CorrelationError::EmptyQueue`] when the queue is absent or empty.
    pub fn pop_for(
        &self,
        context: &CallerContext,
        entity_type: &EntityTypeKey,
    ) -> Result<EntityId, CorrelationError> {
        let key = key(context, entity_type);
        debug!(entity_type = %entity_type, %context, "Restoring id");

        let popped = self
            .queues
            .get_mut(&key)
            .and_then(|mut queue| queue.pop_front());
        self.queues.remove_if(&key, |_, queue| queue.is_empty());

        popped.ok_or_else(|| CorrelationError::EmptyQueue {
            entity_type: entity_type.clone(),
            context: context.clone(),
        })
    }

    /// Removes the first queued occurrence of `id`. Returns whether anything was removed.
    ///
    /// The dispatcher uses this when a destination create fails after its id was pushed,
    /// so the id does not linger in the queue.
    pub fn discard(&self, context: &CallerContext, entity_type: &EntityTypeKey, id: &EntityId) -> bool {
        let key = key(context, entity_type);
        let removed = self
            .queues
            .get_mut(&key)
            .map(|mut queue| match queue.iter().position(|queued| queued == id) {
                Some(index) => queue.remove(index).is_some(),
                None => false,
            })
            .unwrap_or(false);
        self.queues.remove_if(&key, |_, queue| queue.is_empty());

        if removed {
            warn!(entity_type = %entity_type, %context, %id, "Discarded unclaimed id");
        }
        removed
    }

    /// Number of ids waiting in the `(entity_type, context)` queue.
    pub fn pending(&self, context: &CallerContext, entity_type: &EntityTypeKey) -> usize {
        self.queues
            .get(&key(context, entity_type))
            .map(|queue| queue.len())
            .unwrap_or(0)
    }

    /// `true` when no id is waiting under any key.
    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(|entry| entry.value().is_empty())
    }

    /// Drops every queued id.
    pub fn clear(&self) {
        self.queues.clear();
    }

    /// Untyped push, under [`EntityTypeKey::DEFAULT`].
    pub fn push_default(&self, id: impl Into<EntityId>) {
        self.push(&EntityTypeKey::default_key(), id);
    }

    /// Untyped pop, under [`EntityTypeKey::DEFAULT`].
    pub fn pop_default(&self) -> Result<EntityId, CorrelationError> {
        self.pop(&EntityTypeKey::default_key())
    }
}

fn key(context: &CallerContext, entity_type: &EntityTypeKey) -> CorrelationKey {
    CorrelationKey {
        entity_type: entity_type.clone(),
        context: context.clone(),
    }
}
