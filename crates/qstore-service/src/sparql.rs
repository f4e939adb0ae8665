//! The `Sparql` RPC service: the wire-level surface for `TupleQuery`,
//! `GraphQuery` and `AskQuery` (§6.1). The SPARQL evaluator itself is an
//! external collaborator out of scope for this repo (§1); only the
//! [`qstore_storage::TripleSource`] contract it would consume is
//! implemented and tested. Every handler here returns `UNIMPLEMENTED`.

use std::pin::Pin;

use futures::Stream;
use tonic::{Request, Response, Status};

use qstore_proto::qstore::v1 as wire;
use qstore_proto::qstore::v1::sparql_server::Sparql;

#[derive(Debug, Default)]
pub struct SparqlService;

type StreamBody<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send + 'static>>;

fn unimplemented() -> Status {
    Status::unimplemented(
        "SPARQL query evaluation is not implemented by this service; \
         only the TripleSource contract it would consume is",
    )
}

#[tonic::async_trait]
impl Sparql for SparqlService {
    type TupleQueryStream = StreamBody<wire::VariableBinding>;

    async fn tuple_query(
        &self,
        _request: Request<wire::SparqlQuery>,
    ) -> Result<Response<Self::TupleQueryStream>, Status> {
        Err(unimplemented())
    }

    type GraphQueryStream = StreamBody<wire::Statement>;

    async fn graph_query(
        &self,
        _request: Request<wire::SparqlQuery>,
    ) -> Result<Response<Self::GraphQueryStream>, Status> {
        Err(unimplemented())
    }

    async fn ask_query(
        &self,
        _request: Request<wire::SparqlQuery>,
    ) -> Result<Response<wire::AskResult>, Status> {
        Err(unimplemented())
    }
}
