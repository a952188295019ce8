//! Catalog import subsystem.
//!
//! Pulls categories and products from external catalog APIs into the local
//! catalog. The `data` feature exposes the domain, persistence models and
//! repositories; the `worker` feature adds fetching, reconciliation and run
//! orchestration.

#[cfg(feature = "data")]
pub mod db;
#[cfg(feature = "data")]
pub mod domain;
#[cfg(feature = "data")]
pub mod error_conversions;
#[cfg(feature = "data")]
pub mod models;
#[cfg(feature = "data")]
pub mod repository;
#[cfg(feature = "data")]
pub mod schema;
#[cfg(feature = "worker")]
pub mod services;
