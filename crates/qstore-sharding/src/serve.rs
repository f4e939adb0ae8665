//! Dials every backend named in a [`ShardingConfig`] and serves the
//! `QuadStore` surface on `config.bind_addr`, forwarding each call per the
//! routing table in §4.6. Unlike [`qstore_service::serve`] there is no
//! `Sparql` service here: the proxy is statement-level only (§4.6).

use tonic::transport::Server;
use tracing::info;

use qstore_proto::qstore::v1::quad_store_server::QuadStoreServer;

use crate::config::ShardingConfig;
use crate::proxy::ShardingProxy;

pub async fn serve(
    config: ShardingConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let proxy = ShardingProxy::connect(&config).await?;

    info!(
        addr = %config.bind_addr,
        backends = config.backends.len(),
        "starting sharding proxy"
    );

    Server::builder()
        .add_service(QuadStoreServer::new(proxy))
        .serve_with_shutdown(config.bind_addr, shutdown)
        .await?;
    Ok(())
}
