//! Generated protobuf/gRPC types and service stubs for the quad store wire
//! protocol (§6.1): `QuadStore` and `Sparql`, compiled from
//! `proto/qstore.proto` by `build.rs` via `tonic-build`.

#![allow(clippy::all)]

pub mod qstore {
    pub mod v1 {
        tonic::include_proto!("qstore.v1");
    }
}
