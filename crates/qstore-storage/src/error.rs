//! Engine-level error type. Adapters (the RPC service, the sharding proxy)
//! translate this into transport-specific status codes; nothing in this
//! crate depends on `tonic`.

use thiserror::Error;

/// The six error kinds named for the storage engine and its adapters.
/// Malformed input never produces one of these — it is logged and skipped
/// at the call site instead, see [`crate::engine::StorageEngine::add_statements`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failure: {0}")]
    Io(#[from] rocksdb::Error),

    #[error("failed to create database directory: {0}")]
    Directory(#[source] std::io::Error),

    #[error("missing column family: {0}")]
    MissingColumnFamily(String),

    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("engine is not in a serving state")]
    NotServing,
}

pub type Result<T> = std::result::Result<T, StoreError>;
