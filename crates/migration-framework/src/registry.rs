//! # Operation Registry
//!
//! The explicit list of operations a facade knows about. Every operation is validated
//! when it is registered, so a misdeclared interface fails while the facade is being
//! built rather than on its first call.

use crate::error::FacadeError;
use crate::operation::{OperationKind, OperationSpec};
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Clone)]
struct Registration {
    spec: OperationSpec,
    kind: OperationKind,
}

/// Operation name to declared kind, for one wrapped interface.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    entries: HashMap<String, Registration>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and records `spec`.
    ///
    /// Fails when the operation does not declare exactly one kind, or when another
    /// operation with the same name is already registered.
    pub fn register(&mut self, spec: &OperationSpec) -> Result<OperationKind, FacadeError> {
        let kind = spec.resolve_kind()?;
        if self.entries.contains_key(spec.name()) {
            return Err(FacadeError::configuration(format!(
                "operation {} is registered twice",
                spec.name()
            )));
        }

        for marker in spec.markers() {
            warn!(
                operation = spec.name(),
                ?marker,
                %kind,
                "Routing marker is accepted but not honoured; dispatching by kind"
            );
        }

        self.entries.insert(
            spec.name().to_string(),
            Registration {
                spec: spec.clone(),
                kind,
            },
        );
        Ok(kind)
    }

    /// The kind under which `spec` was registered.
    ///
    /// An unknown name, or a different declaration reusing a registered name, is a
    /// configuration error.
    pub fn resolve(&self, spec: &OperationSpec) -> Result<OperationKind, FacadeError> {
        match self.entries.get(spec.name()) {
            Some(registration) if registration.spec == *spec => Ok(registration.kind),
            Some(_) => Err(FacadeError::configuration(format!(
                "operation {} does not match its registered declaration",
                spec.name()
            ))),
            None => Err(FacadeError::configuration(format!(
                "operation {} is not registered",
                spec.name()
            ))),
        }
    }

    pub fn kind_of(&self, name: &str) -> Option<OperationKind> {
        self.entries.get(name).map(|registration| registration.kind)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
