//! Implements the generated `QuadStore` server trait for
//! [`ShardingProxy`], routing each call per the table in §4.6: fanout,
//! hash-route, or random-backend.

use std::collections::HashSet;
use std::pin::Pin;

use futures::Stream;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{instrument, warn};

use qstore_proto::qstore::v1 as wire;
use qstore_proto::qstore::v1::quad_store_server::QuadStore;
use qstore_service::convert::{resource_from_wire, statement_from_wire};
use qstore_storage::key::shard_hash;

use crate::proxy::ShardingProxy;

const STREAM_CHANNEL_CAPACITY: usize = 64;
const WRITER_CHANNEL_CAPACITY: usize = 64;

type UnaryResult<T> = Result<Response<T>, Status>;
type StreamBody<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send + 'static>>;

/// Awaits every spawned backend task, collecting successes and surfacing
/// the first non-OK status observed — but only after every task has run
/// to completion, so a failing backend never leaves an orphaned writer
/// (§4.6 failure semantics).
async fn await_all<T>(handles: Vec<JoinHandle<Result<T, Status>>>) -> Result<Vec<T>, Status> {
    let mut first_err = None;
    let mut oks = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(Ok(value)) => oks.push(value),
            Ok(Err(status)) => first_err.get_or_insert(status),
            Err(join_err) => {
                first_err.get_or_insert(Status::internal(format!("backend task panicked: {join_err}")))
            }
        };
    }
    match first_err {
        Some(status) => Err(status),
        None => Ok(oks),
    }
}

#[tonic::async_trait]
impl QuadStore for ShardingProxy {
    #[instrument(skip(self, request))]
    async fn add_namespaces(
        &self,
        request: Request<Streaming<wire::Namespace>>,
    ) -> UnaryResult<wire::Count> {
        let mut inbound = request.into_inner();
        let mut namespaces = Vec::new();
        while let Some(ns) = inbound.message().await? {
            namespaces.push(ns);
        }

        let handles: Vec<_> = self
            .all_backends()
            .map(|mut client| {
                let namespaces = namespaces.clone();
                tokio::spawn(async move {
                    client
                        .add_namespaces(tokio_stream::iter(namespaces))
                        .await
                        .map(Response::into_inner)
                })
            })
            .collect();

        let counts = await_all(handles).await?;
        // Namespaces are fanned out identically to every backend, so the
        // counts aren't additive; the first backend's count is
        // representative of "how many of these were newly created".
        let count = counts.first().map_or(0, |c| c.count);
        Ok(Response::new(wire::Count { count }))
    }

    #[instrument(skip(self, request))]
    async fn get_namespace(
        &self,
        request: Request<wire::NamespacePattern>,
    ) -> UnaryResult<wire::Namespace> {
        let pattern = request.into_inner();
        let index = rand::thread_rng().gen_range(0..self.backend_count());
        self.backend(index).get_namespace(pattern).await
    }

    type GetNamespacesStream = StreamBody<wire::Namespace>;

    #[instrument(skip(self, request))]
    async fn get_namespaces(
        &self,
        request: Request<wire::Empty>,
    ) -> UnaryResult<Self::GetNamespacesStream> {
        let empty = request.into_inner();
        let index = rand::thread_rng().gen_range(0..self.backend_count());
        let stream = self.backend(index).get_namespaces(empty).await?.into_inner();
        Ok(Response::new(Box::pin(stream)))
    }

    #[instrument(skip(self, request))]
    async fn add_statements(
        &self,
        request: Request<Streaming<wire::Statement>>,
    ) -> UnaryResult<wire::Count> {
        let n = self.backend_count();
        let mut senders = Vec::with_capacity(n);
        let mut handles = Vec::with_capacity(n);
        for mut client in self.all_backends() {
            let (tx, rx) = mpsc::channel::<wire::Statement>(WRITER_CHANNEL_CAPACITY);
            senders.push(tx);
            handles.push(tokio::spawn(async move {
                client
                    .add_statements(ReceiverStream::new(rx))
                    .await
                    .map(Response::into_inner)
            }));
        }

        let mut inbound = request.into_inner();
        while let Some(stmt) = inbound.message().await? {
            let Ok(model_stmt) = statement_from_wire(stmt.clone()) else {
                warn!("skipping malformed statement in sharded AddStatements");
                continue;
            };
            let index = usize::try_from(shard_hash(&model_stmt) % n as u64)
                .expect("shard index fits in usize: n is a small backend count");
            // Closing this send half is what lets each backend's
            // `add_statements` call see end-of-stream once every inbound
            // statement has been dispatched to exactly one writer.
            if senders[index].send(stmt).await.is_err() {
                warn!(backend = index, "shard writer stream closed early");
            }
        }
        drop(senders);

        let counts = await_all(handles).await?;
        // Statements are hash-routed to exactly one shard each, so the
        // per-backend counts are disjoint and summing them is correct.
        let count = counts.iter().map(|c| c.count).sum();
        Ok(Response::new(wire::Count { count }))
    }

    type GetStatementsStream = StreamBody<wire::Statement>;

    #[instrument(skip(self, request))]
    async fn get_statements(
        &self,
        request: Request<wire::StatementPattern>,
    ) -> UnaryResult<Self::GetStatementsStream> {
        let pattern = request.into_inner();
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        for mut client in self.all_backends() {
            let pattern = pattern.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut stream = match client.get_statements(pattern).await {
                    Ok(resp) => resp.into_inner(),
                    Err(status) => {
                        let _ = tx.send(Err(status)).await;
                        return;
                    }
                };
                // `tx` is cloned per backend task but `mpsc::Sender::send`
                // already serializes concurrent callers, giving the "at
                // most one write in flight" exclusion §4.6 calls for
                // without a separate lock.
                while let Some(item) = tokio_stream::StreamExt::next(&mut stream).await {
                    if tx.send(item).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);
        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }

    #[instrument(skip(self, request))]
    async fn remove_statements(
        &self,
        request: Request<wire::StatementPattern>,
    ) -> UnaryResult<wire::Count> {
        let pattern = request.into_inner();
        let handles: Vec<_> = self
            .all_backends()
            .map(|mut client| {
                let pattern = pattern.clone();
                tokio::spawn(async move {
                    client.remove_statements(pattern).await.map(Response::into_inner)
                })
            })
            .collect();
        let counts = await_all(handles).await?;
        let count = counts.iter().map(|c| c.count).sum();
        Ok(Response::new(wire::Count { count }))
    }

    type GetContextsStream = StreamBody<wire::Resource>;

    #[instrument(skip(self, request))]
    async fn get_contexts(
        &self,
        request: Request<wire::Empty>,
    ) -> UnaryResult<Self::GetContextsStream> {
        let empty = request.into_inner();
        let handles: Vec<_> = self
            .all_backends()
            .map(|mut client| {
                let empty = empty.clone();
                tokio::spawn(async move {
                    let mut stream = client.get_contexts(empty).await?.into_inner();
                    let mut contexts = Vec::new();
                    while let Some(item) = tokio_stream::StreamExt::next(&mut stream).await {
                        contexts.push(item?);
                    }
                    Ok::<_, Status>(contexts)
                })
            })
            .collect();

        let per_backend = await_all(handles).await?;
        let mut seen = HashSet::new();
        let mut deduped = Vec::new();
        for wire_ctx in per_backend.into_iter().flatten() {
            let Ok(model_ctx) = resource_from_wire(wire_ctx.clone()) else {
                continue;
            };
            if seen.insert(model_ctx) {
                deduped.push(wire_ctx);
            }
        }

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            for ctx in deduped {
                if tx.send(Ok(ctx)).await.is_err() {
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
        let n = self.backend_count();
        let mut senders: Vec<mpsc::Sender<wire::UpdateRequest>> = Vec::with_capacity(n);
        let mut handles: Vec<JoinHandle<Result<wire::UpdateResponse, Status>>> = Vec::with_capacity(n);
        for mut client in self.all_backends() {
            let (tx, rx) = mpsc::channel(WRITER_CHANNEL_CAPACITY);
            senders.push(tx);
            handles.push(tokio::spawn(async move {
                client.update(ReceiverStream::new(rx)).await.map(Response::into_inner)
            }));
        }

        let mut inbound = request.into_inner();
        while let Some(op) = inbound.message().await? {
            match op.op.clone() {
                // Namespace operations apply everywhere; fan out a copy to
                // every backend, same as a standalone AddNamespaces call.
                Some(wire::update_request::Op::NsAdded(_)) | Some(wire::update_request::Op::NsRemoved(_)) => {
                    for tx in &senders {
                        if tx.send(op.clone()).await.is_err() {
                            warn!("shard writer stream closed early during namespace update");
                        }
                    }
                }
                // Statement operations route by the same hash as
                // AddStatements, so a remove lands on the shard its
                // matching add did.
                Some(wire::update_request::Op::StmtAdded(stmt)) | Some(wire::update_request::Op::StmtRemoved(stmt)) => {
                    match statement_from_wire(stmt) {
                        Ok(model_stmt) => {
                            let index = usize::try_from(shard_hash(&model_stmt) % n as u64)
                                .expect("shard index fits in usize: n is a small backend count");
                            if senders[index].send(op).await.is_err() {
                                warn!(backend = index, "shard writer stream closed early");
                            }
                        }
                        Err(err) => warn!(error = %err, "skipping malformed statement in sharded Update"),
                    }
                }
                None => warn!("skipping empty UpdateRequest"),
            }
        }
        drop(senders);

        let responses = await_all(handles).await?;
        let namespaces_added = responses.first().map_or(0, |r| r.namespaces_added);
        let namespaces_removed = responses.first().map_or(0, |r| r.namespaces_removed);
        let statements_added = responses.iter().map(|r| r.statements_added).sum();
        let statements_removed = responses.iter().map(|r| r.statements_removed).sum();
        Ok(Response::new(wire::UpdateResponse {
            namespaces_added,
            namespaces_removed,
            statements_added,
            statements_removed,
        }))
    }

    #[instrument(skip(self, request))]
    async fn clear(&self, request: Request<wire::ContextRequest>) -> UnaryResult<wire::Count> {
        let ctx = request.into_inner();
        let handles: Vec<_> = self
            .all_backends()
            .map(|mut client| {
                let ctx = ctx.clone();
                tokio::spawn(async move { client.clear(ctx).await.map(Response::into_inner) })
            })
            .collect();
        let counts = await_all(handles).await?;
        let count = counts.iter().map(|c| c.count).sum();
        Ok(Response::new(wire::Count { count }))
    }

    #[instrument(skip(self, request))]
    async fn size(&self, request: Request<wire::ContextRequest>) -> UnaryResult<wire::Count> {
        let ctx = request.into_inner();
        let handles: Vec<_> = self
            .all_backends()
            .map(|mut client| {
                let ctx = ctx.clone();
                tokio::spawn(async move { client.size(ctx).await.map(Response::into_inner) })
            })
            .collect();
        let counts = await_all(handles).await?;
        let count = counts.iter().map(|c| c.count).sum();
        Ok(Response::new(wire::Count { count }))
    }
}
