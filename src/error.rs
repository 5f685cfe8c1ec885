//! Unified error type.

use thiserror::Error;

/// Infrastructure failures that stop the service: binding the listener,
/// reaching the database at startup.
///
/// Per-request failures are expressed as HTTP [`Response`](crate::Response)
/// values instead; see [`ApiError`](crate::api::ApiError).
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("database: {0}")]
    Database(#[from] crate::store::StoreError),

    #[error("invalid listen address `{0}`")]
    ListenAddr(String),
}
