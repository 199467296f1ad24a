//! # Tracing Setup
//!
//! The facade logs through `tracing` with structured fields instead of formatted
//! strings, so a subscriber can filter and index them:
//!
//! | Level | Emitted for | Fields |
//! |-------|-------------|--------|
//! | `error` | one inconsistency between the two stores | `entity_type`, `operation`, `call` |
//! | `warn` | evicted or discarded correlation ids, ignored routing markers | `entity_type`, `context`, `id` |
//! | `info` | facade built, pool started/stopped, phase switched | `operation_count`, `pool_size`, `phase` |
//! | `debug` | every flow and leg, every push/pop on the correlation store | `side`, `call`, `context` |
//!
//! **Usage:**
//! ```bash
//! RUST_LOG=info cargo run      # Lifecycle and inconsistencies
//! RUST_LOG=debug cargo run     # Every leg of every call
//! RUST_LOG=migration_framework=debug,migration_sample=info cargo run
//! ```
//!
//! An inconsistency looks like this with the compact formatter:
//!
//! ```text
//! ERROR Country inconsistency in get_country("PL") entity_type=Country operation="get_country" call="get_country(\"PL\")"
//! ```

/// Initializes a compact `tracing-subscriber` filtered by `RUST_LOG`.
///
/// Later calls are no-ops, so tests and binaries can both call it.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // entity_type identifies the source of a record
        .compact()
        .try_init();
}
