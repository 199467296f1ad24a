//! # Country Migration Sample
//!
//! This library exposes the modules of the sample application for integration testing.

pub mod dao;
pub mod facade;
pub mod lifecycle;
pub mod mock;
pub mod model;
pub mod store;
