//! Starts a real `QuadStore` service on an ephemeral TCP port and drives it
//! with the generated client, exercising the streaming RPC surface (§6.1)
//! end to end the way a remote caller would.

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Endpoint, Server};
use tonic::Request;

use qstore_proto::qstore::v1 as wire;
use qstore_proto::qstore::v1::quad_store_client::QuadStoreClient;
use qstore_proto::qstore::v1::quad_store_server::QuadStoreServer;
use qstore_service::QuadStoreService;
use qstore_storage::{EngineConfig, StorageEngine};

fn uri(iri: &str) -> wire::Uri {
    wire::Uri { iri: iri.to_owned() }
}

fn uri_resource(iri: &str) -> wire::Resource {
    wire::Resource { term: Some(wire::resource::Term::Uri(uri(iri))) }
}

fn uri_value(iri: &str) -> wire::Value {
    wire::Value { term: Some(wire::value::Term::Uri(uri(iri))) }
}

fn statement(s: &str, p: &str, o: &str) -> wire::Statement {
    wire::Statement {
        subject: Some(uri_resource(s)),
        predicate: Some(uri(p)),
        object: Some(uri_value(o)),
        context: None,
    }
}

fn statement_in(s: &str, p: &str, o: &str, c: &str) -> wire::Statement {
    wire::Statement {
        subject: Some(uri_resource(s)),
        predicate: Some(uri(p)),
        object: Some(uri_value(o)),
        context: Some(uri_resource(c)),
    }
}

/// Boots a `QuadStore` service backed by a temp-dir engine on a loopback
/// port, returning a connected client. The server task is leaked for the
/// test's duration and torn down when the process exits; each test gets
/// its own temp dir and port so they don't interfere.
async fn connected_client() -> (tempfile::TempDir, QuadStoreClient<tonic::transport::Channel>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = StorageEngine::open(EngineConfig::new(dir.path())).expect("open engine");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        Server::builder()
            .add_service(QuadStoreServer::new(QuadStoreService::new(engine)))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .expect("server");
    });

    let endpoint = Endpoint::from_shared(format!("http://{addr}")).expect("endpoint");
    let client = loop {
        match QuadStoreClient::connect(endpoint.clone()).await {
            Ok(client) => break client,
            Err(_) => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
        }
    };
    (dir, client)
}

#[tokio::test]
async fn add_then_size_then_get_then_remove() {
    let (_dir, mut client) = connected_client().await;

    let added = client
        .add_statements(tokio_stream::iter(vec![statement(
            "http://ex/s1",
            "http://ex/p1",
            "http://ex/o1",
        )]))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(added.count, 1);

    let size = client
        .size(Request::new(wire::ContextRequest::default()))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(size.count, 1);

    let mut results = client
        .get_statements(Request::new(wire::StatementPattern::default()))
        .await
        .unwrap()
        .into_inner();
    let mut seen = 0;
    while tokio_stream::StreamExt::next(&mut results).await.is_some() {
        seen += 1;
    }
    assert_eq!(seen, 1);

    let removed = client
        .remove_statements(Request::new(wire::StatementPattern {
            subject: Some(uri_resource("http://ex/s1")),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(removed.count, 1);

    let size_after = client
        .size(Request::new(wire::ContextRequest::default()))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(size_after.count, 0);
}

#[tokio::test]
async fn size_and_clear_are_scoped_to_requested_contexts() {
    let (_dir, mut client) = connected_client().await;
    client
        .add_statements(tokio_stream::iter(vec![
            statement_in("http://ex/s1", "http://ex/p1", "http://ex/o1", "http://ex/g1"),
            statement_in("http://ex/s2", "http://ex/p1", "http://ex/o2", "http://ex/g2"),
            statement("http://ex/s3", "http://ex/p1", "http://ex/o3"),
        ]))
        .await
        .unwrap();

    let size = client
        .size(Request::new(wire::ContextRequest { contexts: vec![uri_resource("http://ex/g1")] }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(size.count, 1);

    // Repeating the same context twice in the request sums per-context
    // scans, reproducing the double-count the request's shape allows
    // (see DESIGN.md).
    let doubled = client
        .size(Request::new(wire::ContextRequest {
            contexts: vec![uri_resource("http://ex/g1"), uri_resource("http://ex/g1")],
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(doubled.count, 2);

    let cleared = client
        .clear(Request::new(wire::ContextRequest { contexts: vec![uri_resource("http://ex/g1")] }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(cleared.count, 1);

    let remaining = client
        .size(Request::new(wire::ContextRequest::default()))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(remaining.count, 2);
}

#[tokio::test]
async fn get_namespace_not_found_maps_to_not_found_status() {
    let (_dir, mut client) = connected_client().await;
    let err = client
        .get_namespace(Request::new(wire::NamespacePattern {
            prefix: Some("zz".to_owned()),
            uri: None,
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), tonic::Code::NotFound);
}

#[tokio::test]
async fn add_namespaces_then_get_namespace() {
    let (_dir, mut client) = connected_client().await;
    client
        .add_namespaces(tokio_stream::iter(vec![wire::Namespace {
            prefix: "ex".to_owned(),
            uri: "http://example.com/".to_owned(),
        }]))
        .await
        .unwrap();

    let ns = client
        .get_namespace(Request::new(wire::NamespacePattern {
            prefix: Some("ex".to_owned()),
            uri: None,
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(ns.uri, "http://example.com/");
}

#[tokio::test]
async fn update_stream_applies_add_and_remove_in_order() {
    let (_dir, mut client) = connected_client().await;
    let s1 = statement("http://ex/s1", "http://ex/p1", "http://ex/o1");
    client
        .add_statements(tokio_stream::iter(vec![s1.clone()]))
        .await
        .unwrap();

    let s3 = statement("http://ex/s1", "http://ex/p1", "http://ex/o3");
    let ops = vec![
        wire::UpdateRequest { op: Some(wire::update_request::Op::StmtRemoved(s1)) },
        wire::UpdateRequest { op: Some(wire::update_request::Op::StmtAdded(s3)) },
    ];
    let resp = client
        .update(tokio_stream::iter(ops))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(resp.statements_added, 1);
    assert_eq!(resp.statements_removed, 1);

    let size = client
        .size(Request::new(wire::ContextRequest::default()))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(size.count, 1);
}
