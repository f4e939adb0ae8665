//! The RPC service (C7): wraps a [`qstore_storage::StorageEngine`] in the
//! generated `QuadStore`/`Sparql` tonic services, translating engine
//! results into `tonic::Status` per §7.

pub mod config;
pub mod convert;
pub mod quad_store;
pub mod serve;
pub mod sparql;
pub mod status;

pub use config::ServiceConfig;
pub use quad_store::QuadStoreService;
pub use serve::serve;
pub use sparql::SparqlService;
