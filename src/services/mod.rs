//! Import worker: fetching, reconciliation and run orchestration.

pub mod categories;
pub mod errors;
pub mod fetcher;
#[cfg(any(test, feature = "test-util"))]
pub mod fixtures;
pub mod images;
pub mod orchestrator;
pub mod products;
pub mod runner;
pub mod storage;

pub use errors::{ImportError, ImportResult};
pub use orchestrator::ImportOrchestrator;
pub use runner::{execute_run, start_task_run};
