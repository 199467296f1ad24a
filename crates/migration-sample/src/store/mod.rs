//! # Country Store
//!
//! An actor-backed, in-memory country table. The sample runs two of them: one behind
//! the legacy DAO, one behind the replacement DAO.
//!
//! ## Usage
//!
//! ```rust
//! use migration_sample::model::Country;
//! use migration_sample::store;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (actor, client) = store::new("legacy");
//!     tokio::spawn(actor.run());
//!
//!     let created = client.create(Country::new("PL", "Poland"), None).await?;
//!     assert_eq!(created.id, Some(1));
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod client;
pub mod message;

pub use actor::StoreActor;
pub use client::StoreClient;
pub use message::{Response, StoreRequest};

/// Creates a table called `name` and its client.
pub fn new(name: &'static str) -> (StoreActor, StoreClient) {
    StoreActor::new(name, 32)
}
