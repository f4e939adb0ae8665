//! Binds a [`StorageEngine`] to a TCP listener and serves the `QuadStore`
//! and `Sparql` tonic services until the process is asked to shut down.

use tonic::transport::Server;
use tracing::info;

use qstore_proto::qstore::v1::quad_store_server::QuadStoreServer;
use qstore_proto::qstore::v1::sparql_server::SparqlServer;
use qstore_storage::{EngineConfig, StorageEngine};

use crate::config::ServiceConfig;
use crate::quad_store::QuadStoreService;
use crate::sparql::SparqlService;

/// Opens (creating if missing) the database directory named in `config`
/// and serves both RPC services on `config.bind_addr` until `shutdown`
/// resolves.
pub async fn serve(
    config: ServiceConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let engine_config = EngineConfig::new(&config.db_path)
        .with_block_cache_bytes(config.block_cache_bytes);
    let engine = StorageEngine::open(engine_config)?;

    info!(addr = %config.bind_addr, db = %config.db_path.display(), "starting quad store service");

    Server::builder()
        .add_service(QuadStoreServer::new(QuadStoreService::new(engine)))
        .add_service(SparqlServer::new(SparqlService))
        .serve_with_shutdown(config.bind_addr, shutdown)
        .await?;
    Ok(())
}
