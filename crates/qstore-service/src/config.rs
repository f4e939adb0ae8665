//! Service configuration (§6.3): bind address, database directory,
//! block-cache size and the optional sharding backend list, assembled by a
//! binary entry point (typically from `clap` flags, see the `qstore-cli`
//! crate) and passed into [`crate::serve`].

use std::net::SocketAddr;
use std::path::PathBuf;

/// Construction parameters for a launched single-engine `QuadStore`/
/// `Sparql` service. A process fronting multiple backends instead runs
/// [`qstore_sharding::serve`] with a `ShardingConfig` and never builds one
/// of these.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub block_cache_bytes: usize,
}

impl ServiceConfig {
    pub fn new(bind_addr: SocketAddr, db_path: impl Into<PathBuf>) -> Self {
        Self { bind_addr, db_path: db_path.into(), block_cache_bytes: 8 * 1024 * 1024 }
    }
}
