use std::net::SocketAddr;

/// Configuration for a sharding proxy instance: where it listens and the
/// ordered list of backend `QuadStore` addresses it fans requests out to.
/// The order is load-bearing — it is part of the hash-route function
/// (§4.6) and must not change without a full re-ingest.
#[derive(Debug, Clone)]
pub struct ShardingConfig {
    pub bind_addr: SocketAddr,
    pub backends: Vec<String>,
}

impl ShardingConfig {
    pub fn new(bind_addr: SocketAddr, backends: Vec<String>) -> Self {
        Self { bind_addr, backends }
    }
}
