use std::time::Duration;

use thiserror::Error;

use pushkind_common::repository::errors::RepositoryError;

use crate::domain::run::ImportRunStatus;
use crate::domain::types::{ImportRunId, ImportTaskId, SourceConfigId};

/// Failure talking to an external source. Fatal to the fetch scope it occurs
/// in.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("undecodable response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Failure while reconciling one source record. Always recorded on the audit
/// trail and never propagated past the record.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("invalid field: {0}")]
    InvalidField(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<serde_json::Error> for ConversionError {
    fn from(err: serde_json::Error) -> Self {
        ConversionError::InvalidPayload(err.to_string())
    }
}

/// Blob storage failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage path: {0}")]
    InvalidPath(String),
    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Reasons an image could not be acquired. Logged by the acquirer and never
/// returned to its callers.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("relative image path {0} without a base url")]
    MissingBaseUrl(String),
    #[error("invalid image url {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors that end a run as `failed`.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("import run exceeded its time limit of {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("source {0} is not active")]
    InactiveSource(String),
    #[error("import task {0} not found")]
    TaskNotFound(ImportTaskId),
    #[error("import run {0} not found")]
    RunNotFound(ImportRunId),
    #[error("source {0} not found")]
    SourceNotFound(SourceConfigId),
    #[error("import run {id} is {status}, only pending runs can be executed")]
    InvalidRunState { id: ImportRunId, status: ImportRunStatus },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Convenient alias for results of import operations.
pub type ImportResult<T> = Result<T, ImportError>;
