//! # Result Reconciliation
//!
//! Picks the result a call returns when both stores may have answered. Equal results
//! favour the destination; anything else favours the source, which stays
//! authoritative until the cutover is complete.

use crate::correlation::EntityTypeKey;
use tracing::error;

/// Outcome of comparing the two legs of a call.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<R> {
    /// The result handed back to the caller. `None` only when neither leg ran.
    pub winner: Option<R>,
    /// `true` when the legs disagreed and an inconsistency must be reported.
    pub mismatched: bool,
}

/// Compares the source and destination results by value.
///
/// A leg that did not run is `None`; a missing leg never equals a present one.
pub fn reconcile<R: PartialEq>(source: Option<R>, destination: Option<R>) -> Reconciled<R> {
    if source == destination {
        Reconciled {
            winner: destination,
            mismatched: false,
        }
    } else {
        Reconciled {
            winner: source,
            mismatched: true,
        }
    }
}

/// Emits the inconsistency report for one call.
pub fn report_inconsistency(entity_type: &EntityTypeKey, operation: &str, call: &str) {
    error!(
        entity_type = %entity_type,
        operation,
        call,
        "{} inconsistency in {}",
        entity_type,
        call
    );
}
