//! # Domain Model
//!
//! Data types shared by both country stores and the facade in front of them.

pub mod country;

pub use country::*;
