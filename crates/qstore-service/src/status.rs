//! Error-kind to `tonic::Status` mapping (§7). Engine internals and wire
//! conversions return typed results; this module is the only place that
//! picks an RPC status code.

use qstore_storage::StoreError;
use tonic::Status;

use crate::convert::ConversionError;

pub fn store_error_to_status(err: StoreError) -> Status {
    match err {
        StoreError::NamespaceNotFound(key) => {
            Status::not_found(format!("namespace not found: {key}"))
        }
        StoreError::Cancelled => Status::cancelled("operation cancelled"),
        StoreError::NotServing => Status::unavailable("engine is not in a serving state"),
        StoreError::Io(_) | StoreError::Directory(_) | StoreError::MissingColumnFamily(_) => {
            Status::internal(err.to_string())
        }
    }
}

pub fn conversion_error_to_status(err: ConversionError) -> Status {
    Status::invalid_argument(err.to_string())
}
