//! End-to-end sharding scenario: three in-process `StorageEngine`s behind
//! one proxy, driven entirely through the generated `QuadStore` trait
//! (no intermediate proxy-side network hop, but each backend is a real
//! tonic service over a loopback TCP socket, since `ShardingProxy` only
//! knows how to dial real channels).

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::Request;

use qstore_proto::qstore::v1 as wire;
use qstore_proto::qstore::v1::quad_store_server::{QuadStore, QuadStoreServer};
use qstore_service::QuadStoreService;
use qstore_sharding::{ShardingConfig, ShardingProxy};
use qstore_storage::{EngineConfig, StorageEngine};

fn statement(i: usize) -> wire::Statement {
    wire::Statement {
        subject: Some(wire::Resource {
            term: Some(wire::resource::Term::Uri(wire::Uri { iri: format!("http://ex/s{i}") })),
        }),
        predicate: Some(wire::Uri { iri: "http://ex/p".to_owned() }),
        object: Some(wire::Value {
            term: Some(wire::value::Term::StringLiteral(wire::StringLiteral {
                content: i.to_string(),
                language: None,
            })),
        }),
        context: None,
    }
}

/// Starts one backend `QuadStore` service over a real TCP loopback socket
/// backed by a temp-dir engine, returning its `http://` address and the
/// `TempDir` guard that must outlive the server.
async fn spawn_backend() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = StorageEngine::open(EngineConfig::new(dir.path())).expect("open engine");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        Server::builder()
            .add_service(QuadStoreServer::new(QuadStoreService::new(engine)))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .expect("backend server");
    });
    (dir, format!("http://{addr}"))
}

#[tokio::test]
async fn thousand_statements_across_three_shards_sum_and_dedupe() {
    let mut guards = Vec::new();
    let mut backends = Vec::new();
    for _ in 0..3 {
        let (dir, addr) = spawn_backend().await;
        guards.push(dir);
        backends.push(addr);
    }

    let config = ShardingConfig::new("127.0.0.1:0".parse().unwrap(), backends);
    // Connecting can race the backend's listener accepting its first
    // connection; retry briefly instead of sleeping a fixed amount.
    let proxy = loop {
        match ShardingProxy::connect(&config).await {
            Ok(proxy) => break proxy,
            Err(_) => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
        }
    };

    let statements: Vec<_> = (0..1000).map(statement).collect();
    let added = proxy
        .add_statements(Request::new(tokio_stream::iter(statements)))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(added.count, 1000);

    let size = proxy
        .size(Request::new(wire::ContextRequest::default()))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(size.count, 1000);

    let mut stream = proxy
        .get_statements(Request::new(wire::StatementPattern::default()))
        .await
        .unwrap()
        .into_inner();
    let mut seen = std::collections::HashSet::new();
    while let Some(item) = tokio_stream::StreamExt::next(&mut stream).await {
        let stmt = item.unwrap();
        let wire::resource::Term::Uri(uri) = stmt.subject.unwrap().term.unwrap() else {
            panic!("subject is always a URI in this test");
        };
        seen.insert(uri.iri);
    }
    assert_eq!(seen.len(), 1000);
}

#[tokio::test]
async fn sharding_proxy_requires_at_least_one_backend() {
    let config = ShardingConfig::new("127.0.0.1:0".parse().unwrap(), Vec::new());
    assert!(ShardingProxy::connect(&config).await.is_err());
}
