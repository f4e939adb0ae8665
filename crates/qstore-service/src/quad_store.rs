//! The `QuadStore` RPC service (C7): wraps a [`StorageEngine`] and streams
//! namespace/statement operations, `Update`, `Size`, `Clear`, and context
//! listing over the generated tonic server trait.

use std::pin::Pin;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{instrument, warn};

use qstore_model::{Namespace, Pattern, Statement};
use qstore_proto::qstore::v1 as wire;
use qstore_proto::qstore::v1::quad_store_server::QuadStore;
use qstore_storage::{StorageEngine, UpdateOp};

use crate::convert::{
    contexts_from_wire, namespace_from_wire, namespace_pattern_from_wire, namespace_to_wire,
    pattern_from_wire, resource_to_wire, statement_from_wire, statement_to_wire,
};
use crate::status::{conversion_error_to_status, store_error_to_status};

/// Outbound channel depth for server-streaming responses: enough to
/// decouple the engine's scan rate from the client's read rate without
/// buffering an unbounded amount of the result set in memory.
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// Inbound channel depth for the ingest bridge below: the async task that
/// pulls the client's gRPC stream can run this many items ahead of the
/// blocking engine call before `tx.send` starts applying backpressure,
/// bounding in-flight memory regardless of stream length (§4.3 "bulk
/// ingest pacing").
const INGEST_CHANNEL_CAPACITY: usize = 64;

/// Turns a `tokio::sync::mpsc::Receiver` into a plain synchronous
/// [`Iterator`] by blocking the calling (blocking-pool) thread on each
/// item, so a [`Streaming`] request can be pulled by an async task while
/// `StorageEngine::add_statements`/`update` — which only know how to pull
/// an `IntoIterator` — drive the pace from the other end via
/// backpressure on the channel, rather than the service collecting the
/// whole stream into a `Vec` up front.
struct BlockingRx<T> {
    rx: mpsc::Receiver<T>,
}

impl<T: Send> Iterator for BlockingRx<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rx.blocking_recv()
    }
}

pub struct QuadStoreService {
    engine: StorageEngine,
}

impl QuadStoreService {
    pub fn new(engine: StorageEngine) -> Self {
        Self { engine }
    }
}

type UnaryResult<T> = Result<Response<T>, Status>;
type StreamBody<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send + 'static>>;

#[tonic::async_trait]
impl QuadStore for QuadStoreService {
    #[instrument(skip(self, request))]
    async fn add_namespaces(
        &self,
        request: Request<Streaming<wire::Namespace>>,
    ) -> UnaryResult<wire::Count> {
        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::channel::<Namespace>(INGEST_CHANNEL_CAPACITY);
        let engine = self.engine.clone();
        let write_task =
            tokio::task::spawn_blocking(move || engine.add_namespaces(BlockingRx { rx }));

        while let Some(ns) = inbound.message().await? {
            if tx.send(namespace_from_wire(ns)).await.is_err() {
                break;
            }
        }
        drop(tx);

        let count = write_task
            .await
            .expect("add_namespaces writer task panicked")
            .map_err(store_error_to_status)?;
        Ok(Response::new(wire::Count { count }))
    }

    #[instrument(skip(self, request))]
    async fn get_namespace(
        &self,
        request: Request<wire::NamespacePattern>,
    ) -> UnaryResult<wire::Namespace> {
        let (prefix, uri) = namespace_pattern_from_wire(request.into_inner());
        let ns = self
            .engine
            .get_namespace(prefix.as_deref(), uri.as_deref())
            .map_err(store_error_to_status)?;
        Ok(Response::new(namespace_to_wire(&ns)))
    }

    type GetNamespacesStream = StreamBody<wire::Namespace>;

    #[instrument(skip(self, _request))]
    async fn get_namespaces(
        &self,
        _request: Request<wire::Empty>,
    ) -> UnaryResult<Self::GetNamespacesStream> {
        let namespaces = self
            .engine
            .get_namespaces(None, None)
            .map_err(store_error_to_status)?;
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            for ns in namespaces {
                if tx.send(Ok(namespace_to_wire(&ns))).await.is_err() {
                    // Peer cancelled or dropped the stream; stop producing.
                    break;
                }
            }
        });
        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }

    #[instrument(skip(self, request))]
    async fn add_statements(
        &self,
        request: Request<Streaming<wire::Statement>>,
    ) -> UnaryResult<wire::Count> {
        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::channel::<Statement>(INGEST_CHANNEL_CAPACITY);
        let engine = self.engine.clone();
        let write_task =
            tokio::task::spawn_blocking(move || engine.add_statements(BlockingRx { rx }));

        while let Some(stmt) = inbound.message().await? {
            match statement_from_wire(stmt) {
                Ok(stmt) => {
                    if tx.send(stmt).await.is_err() {
                        break;
                    }
                }
                Err(err) => warn!(error = %err, "skipping malformed statement in AddStatements"),
            }
        }
        drop(tx);

        let count = write_task
            .await
            .expect("add_statements writer task panicked")
            .map_err(store_error_to_status)?;
        Ok(Response::new(wire::Count { count }))
    }

    type GetStatementsStream = StreamBody<wire::Statement>;

    #[instrument(skip(self, request))]
    async fn get_statements(
        &self,
        request: Request<wire::StatementPattern>,
    ) -> UnaryResult<Self::GetStatementsStream> {
        let pattern = pattern_from_wire(request.into_inner()).map_err(conversion_error_to_status)?;
        stream_statements(&self.engine, pattern)
    }

    #[instrument(skip(self, request))]
    async fn remove_statements(
        &self,
        request: Request<wire::StatementPattern>,
    ) -> UnaryResult<wire::Count> {
        let pattern = pattern_from_wire(request.into_inner()).map_err(conversion_error_to_status)?;
        let count = self
            .engine
            .remove_statements(&pattern)
            .map_err(store_error_to_status)?;
        Ok(Response::new(wire::Count { count }))
    }

    type GetContextsStream = StreamBody<wire::Resource>;

    #[instrument(skip(self, _request))]
    async fn get_contexts(
        &self,
        _request: Request<wire::Empty>,
    ) -> UnaryResult<Self::GetContextsStream> {
        let contexts = self.engine.get_contexts().map_err(store_error_to_status)?;
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            for ctx in contexts {
                if tx.send(Ok(resource_to_wire(&ctx))).await.is_err() {
                    break;
                }
            }
        });
        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }

    #[instrument(skip(self, request))]
    async fn update(
        &self,
        request: Request<Streaming<wire::UpdateRequest>>,
    ) -> UnaryResult<wire::UpdateResponse> {
        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::channel::<UpdateOp>(INGEST_CHANNEL_CAPACITY);
        let engine = self.engine.clone();
        let write_task = tokio::task::spawn_blocking(move || engine.update(BlockingRx { rx }));

        while let Some(op) = inbound.message().await? {
            let mapped = match op.op {
                Some(wire::update_request::Op::NsAdded(ns)) => {
                    Some(UpdateOp::AddNamespace(namespace_from_wire(ns)))
                }
                Some(wire::update_request::Op::NsRemoved(prefix)) => {
                    Some(UpdateOp::RemoveNamespace(prefix))
                }
                Some(wire::update_request::Op::StmtAdded(stmt)) => match statement_from_wire(stmt) {
                    Ok(stmt) => Some(UpdateOp::AddStatement(stmt)),
                    Err(err) => {
                        warn!(error = %err, "skipping malformed statement in Update");
                        None
                    }
                },
                Some(wire::update_request::Op::StmtRemoved(stmt)) => match statement_from_wire(stmt) {
                    Ok(stmt) => Some(UpdateOp::RemoveStatement(stmt)),
                    Err(err) => {
                        warn!(error = %err, "skipping malformed statement in Update");
                        None
                    }
                },
                None => {
                    warn!("skipping empty UpdateRequest");
                    None
                }
            };
            if let Some(op) = mapped {
                if tx.send(op).await.is_err() {
                    break;
                }
            }
        }
        drop(tx);

        let counts = write_task
            .await
            .expect("update writer task panicked")
            .map_err(store_error_to_status)?;
        Ok(Response::new(wire::UpdateResponse {
            namespaces_added: counts.namespaces_added,
            namespaces_removed: counts.namespaces_removed,
            statements_added: counts.statements_added,
            statements_removed: counts.statements_removed,
        }))
    }

    #[instrument(skip(self, request))]
    async fn clear(&self, request: Request<wire::ContextRequest>) -> UnaryResult<wire::Count> {
        let contexts = contexts_from_wire(request.into_inner()).map_err(conversion_error_to_status)?;
        let count = self.engine.clear_in_contexts(&contexts).map_err(store_error_to_status)?;
        Ok(Response::new(wire::Count { count }))
    }

    #[instrument(skip(self, request))]
    async fn size(&self, request: Request<wire::ContextRequest>) -> UnaryResult<wire::Count> {
        let contexts = contexts_from_wire(request.into_inner()).map_err(conversion_error_to_status)?;
        let count = self.engine.size_in_contexts(&contexts).map_err(store_error_to_status)?;
        Ok(Response::new(wire::Count { count }))
    }
}

fn stream_statements(
    engine: &StorageEngine,
    pattern: Pattern,
) -> UnaryResult<StreamBody<wire::Statement>> {
    let iter = engine.get_statements(&pattern).map_err(store_error_to_status)?;
    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        // `iter` owns the engine's snapshot and range cursor; dropping it
        // (on loop exit, either exhaustion or peer cancellation) releases
        // them, matching the explicit-close ownership model (§3.3, §9).
        let mut iter = iter;
        for stmt in &mut iter {
            if tx.send(Ok(statement_to_wire(&stmt))).await.is_err() {
                break;
            }
        }
        iter.close();
    });
    Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
}
