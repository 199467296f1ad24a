//! # Operations
//!
//! An [`Operation`] describes one member of the wrapped interface: its name, the entity
//! type it deals with, its declared [`OperationKind`], and a handler that performs the
//! call against *either* adapter. The same handler is applied to the source adapter and
//! to the destination adapter, which is what lets the facade run one logical call on
//! both stores.
//!
//! Operations are declared once, up front, and registered on the
//! [`FacadeBuilder`](crate::FacadeBuilder), which validates the kind tags eagerly.
//!
//! ```rust
//! use migration_framework::{EntityId, Operation};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Country { id: u64, code: String }
//!
//! trait CountryStore: Send + Sync {
//!     fn lookup(&self, code: &str) -> Option<Country>;
//! }
//!
//! let get_country = Operation::<dyn CountryStore, (String,), Option<Country>>::builder("get_country")
//!     .entity("Country")
//!     .read()
//!     .handler(|store: Arc<dyn CountryStore>, (code,): (String,)| async move {
//!         Ok::<_, std::io::Error>(store.lookup(&code))
//!     });
//! assert_eq!(get_country.name(), "get_country");
//! ```

use crate::correlation::{EntityId, EntityTypeKey};
use crate::error::{AdapterError, FacadeError};
use futures::future::{BoxFuture, FutureExt};
use std::fmt::{self, Debug};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Which dispatch flow an operation goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Read,
    Update,
    Create,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Read => f.write_str("Read"),
            OperationKind::Update => f.write_str("Update"),
            OperationKind::Create => f.write_str("Create"),
        }
    }
}

/// Reserved markers for bypassing dual dispatch. Recorded on the operation but not
/// acted upon by the dispatcher yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingMarker {
    SourceOnly,
    DestinationOnly,
}

// =============================================================================
// ARGUMENTS
// =============================================================================

/// The ordered argument list of an operation.
///
/// Implemented for tuples of up to six `Debug + Clone + Send` values; a single argument
/// is passed as a one-element tuple, `(code,)`.
pub trait Arguments: Clone + Send + 'static {
    /// Each argument rendered as literal text, in order.
    fn render(&self) -> Vec<String>;
}

impl Arguments for () {
    fn render(&self) -> Vec<String> {
        Vec::new()
    }
}

macro_rules! impl_arguments {
    ($($idx:tt : $ty:ident),+) => {
        impl<$($ty: Debug + Clone + Send + 'static),+> Arguments for ($($ty,)+) {
            fn render(&self) -> Vec<String> {
                vec![$(format!("{:?}", self.$idx)),+]
            }
        }
    };
}

impl_arguments!(0: A1);
impl_arguments!(0: A1, 1: A2);
impl_arguments!(0: A1, 1: A2, 2: A3);
impl_arguments!(0: A1, 1: A2, 2: A3, 3: A4);
impl_arguments!(0: A1, 1: A2, 2: A3, 3: A4, 4: A5);
impl_arguments!(0: A1, 1: A2, 2: A3, 3: A4, 4: A5, 5: A6);

/// Renders a call as literal text: `get_country("PL")`.
pub fn render_call<A: Arguments>(name: &str, args: &A) -> String {
    format!("{}({})", name, args.render().join(", "))
}

// =============================================================================
// OPERATION SPEC
// =============================================================================

/// The untyped declaration of an operation, as stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSpec {
    name: String,
    entity_type: EntityTypeKey,
    kinds: Vec<OperationKind>,
    markers: Vec<RoutingMarker>,
}

impl OperationSpec {
    pub fn new(name: impl Into<String>, entity_type: EntityTypeKey) -> Self {
        Self {
            name: name.into(),
            entity_type,
            kinds: Vec::new(),
            markers: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: OperationKind) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn with_marker(mut self, marker: RoutingMarker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_type(&self) -> &EntityTypeKey {
        &self.entity_type
    }

    pub fn kinds(&self) -> &[OperationKind] {
        &self.kinds
    }

    pub fn markers(&self) -> &[RoutingMarker] {
        &self.markers
    }

    /// The single declared kind, or a `ConfigurationError` when there is none or more
    /// than one.
    pub fn resolve_kind(&self) -> Result<OperationKind, FacadeError> {
        match self.kinds.as_slice() {
            [kind] => Ok(*kind),
            [] => Err(FacadeError::configuration(format!(
                "operation {} must declare exactly one of Read/Update/Create",
                self.name
            ))),
            many => Err(FacadeError::configuration(format!(
                "operation {} declares {:?}; it must declare exactly one of Read/Update/Create",
                self.name, many
            ))),
        }
    }
}

// =============================================================================
// TYPED OPERATION
// =============================================================================

/// Performs the call against one adapter.
pub type Handler<S, A, R> =
    Arc<dyn Fn(Arc<S>, A) -> BoxFuture<'static, Result<R, AdapterError>> + Send + Sync>;

/// Pulls the identifier out of an entity returned by a create call.
pub type IdExtractor<R> = Arc<dyn Fn(&R) -> Option<EntityId> + Send + Sync>;

/// A typed, declared operation of a wrapped interface `S`, taking arguments `A` and
/// returning `R`.
pub struct Operation<S: ?Sized, A, R> {
    spec: Arc<OperationSpec>,
    handler: Handler<S, A, R>,
    id_extractor: Option<IdExtractor<R>>,
}

impl<S: ?Sized, A, R> Clone for Operation<S, A, R> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            handler: self.handler.clone(),
            id_extractor: self.id_extractor.clone(),
        }
    }
}

impl<S: ?Sized, A, R> Debug for Operation<S, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("spec", &self.spec)
            .field("extracts_id", &self.id_extractor.is_some())
            .finish()
    }
}

impl<S: ?Sized, A, R> Operation<S, A, R> {
    /// Starts declaring an operation called `name`.
    pub fn builder(name: impl Into<String>) -> OperationBuilder<S, A, R> {
        OperationBuilder {
            name: name.into(),
            entity_type: None,
            kinds: Vec::new(),
            markers: Vec::new(),
            id_extractor: None,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn entity_type(&self) -> &EntityTypeKey {
        self.spec.entity_type()
    }

    pub fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    pub(crate) fn invoke(&self, store: Arc<S>, args: A) -> BoxFuture<'static, Result<R, AdapterError>> {
        (self.handler)(store, args)
    }

    pub(crate) fn extract_id(&self, entity: &R) -> Option<EntityId> {
        self.id_extractor.as_ref().and_then(|extract| extract(entity))
    }
}

/// Fluent declaration of an [`Operation`].
pub struct OperationBuilder<S: ?Sized, A, R> {
    name: String,
    entity_type: Option<EntityTypeKey>,
    kinds: Vec<OperationKind>,
    markers: Vec<RoutingMarker>,
    id_extractor: Option<IdExtractor<R>>,
    _marker: PhantomData<fn(Arc<S>, A)>,
}

impl<S: ?Sized, A, R> OperationBuilder<S, A, R> {
    /// Names the entity type used to namespace correlated ids and in inconsistency
    /// reports. Defaults to the short name of `R`.
    pub fn entity(mut self, entity_type: impl Into<EntityTypeKey>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Tags the operation as a read.
    pub fn read(mut self) -> Self {
        self.kinds.push(OperationKind::Read);
        self
    }

    /// Tags the operation as an update of an existing entity.
    pub fn update(mut self) -> Self {
        self.kinds.push(OperationKind::Update);
        self
    }

    /// Tags the operation as a create. `extract` reads the identifier the source store
    /// assigned, so it can be relayed to the destination store.
    pub fn create<F>(mut self, extract: F) -> Self
    where
        F: Fn(&R) -> Option<EntityId> + Send + Sync + 'static,
    {
        self.kinds.push(OperationKind::Create);
        self.id_extractor = Some(Arc::new(extract));
        self
    }

    pub fn source_only(mut self) -> Self {
        self.markers.push(RoutingMarker::SourceOnly);
        self
    }

    pub fn destination_only(mut self) -> Self {
        self.markers.push(RoutingMarker::DestinationOnly);
        self
    }

    /// Finishes the declaration with the function that performs the call on one adapter.
    pub fn handler<F, Fut, E>(self, handler: F) -> Operation<S, A, R>
    where
        S: 'static,
        A: 'static,
        R: Send + 'static,
        F: Fn(Arc<S>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        E: Into<AdapterError> + Send + 'static,
    {
        let entity_type = self.entity_type.unwrap_or_else(EntityTypeKey::of::<R>);
        let spec = OperationSpec {
            name: self.name,
            entity_type,
            kinds: self.kinds,
            markers: self.markers,
        };
        let handler: Handler<S, A, R> = Arc::new(move |store, args| {
            let call = handler(store, args);
            async move { call.await.map_err(Into::into) }.boxed()
        });

        Operation {
            spec: Arc::new(spec),
            handler,
            id_extractor: self.id_extractor,
        }
    }
}
