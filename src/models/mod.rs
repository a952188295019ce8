//! Diesel row types and their conversions into domain entities.

pub mod brand;
pub mod category;
#[cfg(feature = "worker")]
pub mod config;
pub mod product;
pub mod run;
pub mod source;
pub mod task;
