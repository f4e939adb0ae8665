//! Dialing the N backend channels a [`crate::proxy::ShardingProxy`] fans
//! out over. One channel per backend is opened once and held for the
//! proxy's lifetime (§4.6); `tonic::transport::Channel` clones are cheap,
//! so each call site clones its own client handle instead of locking one.

use qstore_proto::qstore::v1::quad_store_client::QuadStoreClient;
use tonic::transport::{Channel, Endpoint};

/// Connects to every backend address in order. The resulting vector's
/// index *is* the shard index used by the hash-route policy, so callers
/// must not reorder it after startup.
pub async fn dial_all(addresses: &[String]) -> Result<Vec<QuadStoreClient<Channel>>, tonic::transport::Error> {
    let mut clients = Vec::with_capacity(addresses.len());
    for addr in addresses {
        let endpoint = Endpoint::from_shared(addr.clone())?;
        clients.push(QuadStoreClient::connect(endpoint).await?);
    }
    Ok(clients)
}
