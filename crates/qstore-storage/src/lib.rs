//! The quad-indexed storage engine (C3-C6): key codec, pattern planner,
//! RocksDB-backed engine, and the triple source adapter consumed by an
//! external SPARQL evaluator.

pub mod codec;
pub mod engine;
pub mod error;
pub mod key;
pub mod planner;
pub mod triple_source;

pub use engine::{EngineConfig, StatementIterator, StorageEngine, UpdateCounts, UpdateOp, DEFAULT_BATCH_SIZE};
pub use error::{Result, StoreError};
pub use triple_source::TripleSource;
