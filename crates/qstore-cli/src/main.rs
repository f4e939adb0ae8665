//! Binary entry point (§6.3): parses bind address, database directory,
//! block-cache size, and an optional list of sharding backends, then runs
//! either a single storage engine or a sharding proxy until `Ctrl-C`.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use qstore_service::ServiceConfig;
use qstore_sharding::ShardingConfig;

/// Quad store service: a quad-indexed storage engine exposed over a
/// streaming RPC surface, optionally fronted by a sharding proxy.
#[derive(Debug, Parser)]
#[command(name = "qstore", version, about)]
struct Args {
    /// Address this process listens on.
    #[arg(long, env = "QSTORE_BIND", default_value = "127.0.0.1:50051")]
    bind: SocketAddr,

    /// Database directory for a single storage engine. Required unless
    /// `--backend` is given at least once, in which case this process runs
    /// a sharding proxy instead and never opens a local engine.
    #[arg(long, env = "QSTORE_DB_PATH")]
    db_path: Option<PathBuf>,

    /// RocksDB block cache size in bytes.
    #[arg(long, env = "QSTORE_BLOCK_CACHE_BYTES", default_value_t = 8 * 1024 * 1024)]
    block_cache_bytes: usize,

    /// Backend address to fan out to; repeat for each shard. Given at
    /// least once, this process is a sharding proxy rather than an engine.
    #[arg(long = "backend")]
    backends: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    if !args.backends.is_empty() {
        let config = ShardingConfig::new(args.bind, args.backends);
        qstore_sharding::serve(config, shutdown).await
    } else {
        let db_path = args
            .db_path
            .ok_or_else(|| anyhow::anyhow!("--db-path is required unless --backend is given"))?;
        let mut config = ServiceConfig::new(args.bind, db_path);
        config.block_cache_bytes = args.block_cache_bytes;
        qstore_service::serve(config, shutdown).await
    }
}
