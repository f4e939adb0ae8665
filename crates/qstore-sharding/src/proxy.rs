//! The sharding proxy (C8): holds one persistent channel per backend and
//! exposes the same `QuadStore` RPC surface as a single engine, routing
//! each call per the table in §4.6.

use qstore_proto::qstore::v1::quad_store_client::QuadStoreClient;
use tonic::transport::Channel;

use crate::backend;
use crate::config::ShardingConfig;

#[derive(Clone)]
pub struct ShardingProxy {
    backends: Vec<QuadStoreClient<Channel>>,
}

impl ShardingProxy {
    /// Dials every backend in `config` and holds the resulting channels for
    /// the proxy's lifetime. `config.backends` must be non-empty: a
    /// sharding proxy over zero shards has nowhere to route statements.
    pub async fn connect(config: &ShardingConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(!config.backends.is_empty(), "sharding proxy requires at least one backend");
        let backends = backend::dial_all(&config.backends).await?;
        Ok(Self { backends })
    }

    pub(crate) fn backend_count(&self) -> usize {
        self.backends.len()
    }

    pub(crate) fn backend(&self, index: usize) -> QuadStoreClient<Channel> {
        self.backends[index].clone()
    }

    pub(crate) fn all_backends(&self) -> impl Iterator<Item = QuadStoreClient<Channel>> + '_ {
        self.backends.iter().cloned()
    }
}
