//! The storage engine (C5): a RocksDB-backed key-value store wrapped around
//! the key codec (C3) and pattern planner (C4), with parallel per-index
//! batch writes and snapshot-consistent read iterators.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rocksdb::{
    BlockBasedOptions, Cache, ColumnFamilyDescriptor, DBRawIterator, Options, WriteBatch, DB,
};
use tracing::{debug, instrument, warn};

use qstore_model::{matches, Namespace, Pattern, Statement};

use crate::codec::{decode_statement, decode_str, encode_statement, encode_str};
use crate::error::{Result, StoreError};
use crate::key::{Bound, FieldHashes, IndexKind, KEY_LEN};
use crate::planner::{self, Plan};

const NS_PREFIX_CF: &str = "ns_prefix";
const NS_URI_CF: &str = "ns_uri";
const META_CF: &str = "meta";

fn all_column_families() -> Vec<&'static str> {
    let mut cfs: Vec<&'static str> = IndexKind::all().iter().map(|k| k.column_family()).collect();
    cfs.push(NS_PREFIX_CF);
    cfs.push(NS_URI_CF);
    cfs.push(META_CF);
    cfs
}

/// Lower bound on the sub-batch flush size (§4.3: "100 000 - 1 000 000 ops, configurable").
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// Construction parameters for a [`StorageEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub block_cache_bytes: usize,
    pub batch_size: usize,
}

impl EngineConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_bytes: 8 * 1024 * 1024,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_block_cache_bytes(mut self, bytes: usize) -> Self {
        self.block_cache_bytes = bytes;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// `Open -> Serving -> Closing -> Closed` (§4.7). `Open` only exists while
/// the constructor is running; once [`StorageEngine::open`] returns, the
/// engine is already `Serving`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Serving,
    Closing,
    Closed,
}

/// Per-kind counts returned by [`StorageEngine::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateCounts {
    pub namespaces_added: u64,
    pub namespaces_removed: u64,
    pub statements_added: u64,
    pub statements_removed: u64,
}

/// A single operation within an [`StorageEngine::update`] stream, tagged the
/// same way the wire `UpdateRequest` union is (§6.1).
pub enum UpdateOp {
    AddNamespace(Namespace),
    RemoveNamespace(String),
    AddStatement(Statement),
    RemoveStatement(Statement),
}

/// The quad-indexed storage engine (C5). Cheap to clone: internally an
/// `Arc<DB>` plus a small amount of configuration.
#[derive(Clone)]
pub struct StorageEngine {
    db: Arc<DB>,
    batch_size: usize,
    state: Arc<Mutex<EngineState>>,
}

impl StorageEngine {
    /// Opens (creating if missing) the on-disk database at `config.path`,
    /// with all seven logical tables (§4.3) as RocksDB column families.
    /// `Open -> Serving` happens here: every column family is described up
    /// front and the database is opened against the full set in one call,
    /// so there is no window where only some indexes exist.
    #[instrument(skip(config), fields(path = %config.path.display()))]
    pub fn open(config: EngineConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.path).map_err(StoreError::Directory)?;

        let cache = Cache::new_lru_cache(config.block_cache_bytes);
        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_block_cache(&cache);
        block_opts.set_bloom_filter(10.0, false);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = all_column_families()
            .into_iter()
            .map(|name| {
                let mut opts = Options::default();
                opts.set_block_based_table_factory(&block_opts);
                ColumnFamilyDescriptor::new(name, opts)
            })
            .collect();

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let db = DB::open_cf_descriptors(&db_opts, &config.path, cf_descriptors)?;
        debug!("storage engine opened, entering Serving state");

        Ok(Self {
            db: Arc::new(db),
            batch_size: config.batch_size.max(1),
            state: Arc::new(Mutex::new(EngineState::Serving)),
        })
    }

    fn require_serving(&self) -> Result<()> {
        match *self.state.lock().unwrap_or_else(|e| e.into_inner()) {
            EngineState::Serving => Ok(()),
            EngineState::Closing | EngineState::Closed => Err(StoreError::NotServing),
        }
    }

    /// `Serving -> Closing -> Closed`. Any in-flight batch writes spawned
    /// from other clones of this engine finish on their own scoped threads
    /// before they return control to their caller, so there is nothing left
    /// to drain here beyond marking the engine unusable for new operations.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = EngineState::Closing;
        *state = EngineState::Closed;
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::MissingColumnFamily(name.to_owned()))
    }

    // ---- namespaces ---------------------------------------------------

    /// `AddNamespaces`: written to `ns_prefix` then `ns_uri`, in that order,
    /// so a reader can never observe a fresh URI lookup without the
    /// matching prefix lookup already being live (§4.3 "namespace writes").
    #[instrument(skip(self, namespaces))]
    pub fn add_namespaces(&self, namespaces: impl IntoIterator<Item = Namespace>) -> Result<u64> {
        self.require_serving()?;
        let mut count = 0u64;
        for ns in namespaces {
            self.write_namespace(&ns)?;
            count += 1;
        }
        Ok(count)
    }

    fn write_namespace(&self, ns: &Namespace) -> Result<()> {
        let record = encode_namespace(ns);
        let mut prefix_batch = WriteBatch::default();
        prefix_batch.put_cf(self.cf(NS_PREFIX_CF)?, encode_str(ns.prefix()), &record);
        self.db.write(prefix_batch)?;

        let mut uri_batch = WriteBatch::default();
        uri_batch.put_cf(self.cf(NS_URI_CF)?, encode_str(ns.uri()), &record);
        self.db.write(uri_batch)?;
        Ok(())
    }

    fn remove_namespace_record(&self, ns: &Namespace) -> Result<()> {
        // Reverse order on delete: `ns_uri` before `ns_prefix`.
        let mut uri_batch = WriteBatch::default();
        uri_batch.delete_cf(self.cf(NS_URI_CF)?, encode_str(ns.uri()));
        self.db.write(uri_batch)?;

        let mut prefix_batch = WriteBatch::default();
        prefix_batch.delete_cf(self.cf(NS_PREFIX_CF)?, encode_str(ns.prefix()));
        self.db.write(prefix_batch)?;
        Ok(())
    }

    /// `GetNamespace`: looks a single namespace up by prefix or URI,
    /// returning `NamespaceNotFound` (mapped to `NOT_FOUND` at the RPC
    /// layer) when neither side of the pattern matches anything.
    pub fn get_namespace(&self, prefix: Option<&str>, uri: Option<&str>) -> Result<Namespace> {
        self.require_serving()?;
        if let Some(prefix) = prefix {
            if let Some(bytes) = self.db.get_cf(self.cf(NS_PREFIX_CF)?, encode_str(prefix))? {
                if let Some(ns) = decode_namespace(&bytes) {
                    return Ok(ns);
                }
            }
        }
        if let Some(uri) = uri {
            if let Some(bytes) = self.db.get_cf(self.cf(NS_URI_CF)?, encode_str(uri))? {
                if let Some(ns) = decode_namespace(&bytes) {
                    return Ok(ns);
                }
            }
        }
        Err(StoreError::NamespaceNotFound(
            prefix.or(uri).unwrap_or_default().to_owned(),
        ))
    }

    /// `GetNamespaces`: a lazy iterator filtered by an optional prefix/URI
    /// pattern; matching either side of the pair is sufficient, mirroring
    /// `GetNamespace`'s lookup order.
    pub fn get_namespaces(
        &self,
        prefix: Option<&str>,
        uri: Option<&str>,
    ) -> Result<Vec<Namespace>> {
        self.require_serving()?;
        let cf = self.cf(NS_PREFIX_CF)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_, value) = item?;
            let Some(ns) = decode_namespace(&value) else {
                warn!("skipping malformed namespace record");
                continue;
            };
            if prefix.is_some_and(|p| p != ns.prefix()) {
                continue;
            }
            if uri.is_some_and(|u| u != ns.uri()) {
                continue;
            }
            out.push(ns);
        }
        Ok(out)
    }

    // ---- statements -----------------------------------------------------

    /// `AddStatements`: buffers the stream into fixed-size sub-batches and
    /// flushes each across all four index column families in parallel
    /// before accepting the next sub-batch, bounding memory to roughly
    /// `4 * batch_size * avg_stmt_bytes` (§4.3 "bulk ingest pacing").
    #[instrument(skip(self, statements))]
    pub fn add_statements(&self, statements: impl IntoIterator<Item = Statement>) -> Result<u64> {
        self.require_serving()?;
        let mut total = 0u64;
        let mut pending = Vec::with_capacity(self.batch_size);
        for stmt in statements {
            pending.push(stmt);
            if pending.len() >= self.batch_size {
                total += self.flush_add_batch(std::mem::take(&mut pending))?;
            }
        }
        if !pending.is_empty() {
            total += self.flush_add_batch(pending)?;
        }
        Ok(total)
    }

    fn flush_add_batch(&self, statements: Vec<Statement>) -> Result<u64> {
        let count = statements.len() as u64;
        let per_index = self.build_add_batches(&statements)?;
        self.write_parallel(per_index)?;
        Ok(count)
    }

    fn build_add_batches(&self, statements: &[Statement]) -> Result<[WriteBatch; 4]> {
        let mut batches = [
            WriteBatch::default(),
            WriteBatch::default(),
            WriteBatch::default(),
            WriteBatch::default(),
        ];
        for stmt in statements {
            let hashes = FieldHashes::from_statement(stmt);
            let value = encode_statement(stmt);
            for (slot, kind) in batches.iter_mut().zip(IndexKind::all()) {
                let key = hashes.build_key(kind, Bound::Lower);
                slot.put_cf(self.cf(kind.column_family())?, key, &value);
            }
        }
        Ok(batches)
    }

    /// `RemoveStatements`: scans the planner-chosen index for `pattern`
    /// under one point-in-time snapshot, collects the matching keys, then
    /// deletes every statement from all four indexes (§4.3 "remove by
    /// pattern"). The scan and the delete sharing one snapshot means
    /// statements added concurrently after the scan began are never
    /// removed.
    #[instrument(skip(self))]
    pub fn remove_statements(&self, pattern: &Pattern) -> Result<u64> {
        self.require_serving()?;
        // A freshly created raw iterator already reflects a single
        // point-in-time view of the column family, same as the teacher
        // crate relies on (no separate `Snapshot` object is needed to get
        // that property) — so the scan below and any statements added
        // after this call starts never interact.
        let plan = planner::plan(pattern);
        let hashes = FieldHashes::from_pattern(pattern);
        let lower = hashes.build_key(plan.index, Bound::Lower);
        let upper = hashes.build_key(plan.index, Bound::Upper);

        let mut to_remove = Vec::new();
        let cf = self.cf(plan.index.column_family())?;
        let mut iter = self.db.raw_iterator_cf(cf);
        iter.seek(lower);
        while let Some(key) = iter.key() {
            if key > upper.as_slice() {
                break;
            }
            let value = iter.value().unwrap_or_default();
            if let Some(stmt) = decode_statement(value) {
                if !plan.needs_filter || matches(pattern, &stmt) {
                    to_remove.push(stmt);
                }
            } else {
                warn!("skipping malformed statement record during remove scan");
            }
            iter.next();
        }
        drop(iter);

        let count = to_remove.len() as u64;
        if !to_remove.is_empty() {
            let batches = self.build_remove_batches(&to_remove)?;
            self.write_parallel(batches)?;
        }
        Ok(count)
    }

    fn build_remove_batches(&self, statements: &[Statement]) -> Result<[WriteBatch; 4]> {
        let mut batches = [
            WriteBatch::default(),
            WriteBatch::default(),
            WriteBatch::default(),
            WriteBatch::default(),
        ];
        for stmt in statements {
            let hashes = FieldHashes::from_statement(stmt);
            for (slot, kind) in batches.iter_mut().zip(IndexKind::all()) {
                let key = hashes.build_key(kind, Bound::Lower);
                slot.delete_cf(self.cf(kind.column_family())?, key);
            }
        }
        Ok(batches)
    }

    /// Runs four column-family batch writes in parallel on scoped threads,
    /// one per quad index — the minimum useful parallelism named in §5.
    /// The call blocks until every thread has finished; if more than one
    /// fails, the first error observed is returned (fatal to the calling
    /// operation per §7 error kind 2), but every thread is still joined
    /// first so there is no orphaned write left running.
    fn write_parallel(&self, batches: [WriteBatch; 4]) -> Result<()> {
        let db = &self.db;
        let results: Vec<Result<()>> = std::thread::scope(|scope| {
            let handles: Vec<_> = batches
                .into_iter()
                .map(|batch| scope.spawn(move || db.write(batch).map_err(StoreError::from)))
                .collect();
            handles.into_iter().map(|h| h.join().expect("writer thread panicked")).collect()
        });
        results.into_iter().collect::<Result<Vec<()>>>().map(|_| ())
    }

    /// `GetStatements`: a snapshot-consistent, non-buffering iterator over
    /// the planner-chosen index, filtered in-memory when the plan requires
    /// it. Callers must drive it to completion or call
    /// [`StatementIterator::close`] to release the snapshot early.
    pub fn get_statements(&self, pattern: &Pattern) -> Result<StatementIterator> {
        self.require_serving()?;
        let plan = planner::plan(pattern);
        let hashes = FieldHashes::from_pattern(pattern);
        let lower = hashes.build_key(plan.index, Bound::Lower);
        let upper = hashes.build_key(plan.index, Bound::Upper);
        let cf = self.cf(plan.index.column_family())?;

        let mut raw = self.db.raw_iterator_cf(cf);
        raw.seek(&lower[..]);

        Ok(StatementIterator {
            // SAFETY: `raw` borrows `self.db` for `'_`; we extend that to
            // `'static` and keep the database alive for at least as long by
            // holding our own `Arc<DB>` clone alongside it. This is the same
            // `StaticDBRowIterator` technique the teacher crate uses to hand
            // out snapshot iterators whose lifetime isn't tied to the
            // borrow-checker's view of the store.
            iter: unsafe { std::mem::transmute::<DBRawIterator<'_>, DBRawIterator<'static>>(raw) },
            _db: Arc::clone(&self.db),
            upper,
            plan,
            pattern: pattern.clone(),
            closed: false,
        })
    }

    /// `Size`: the cardinality of the SPOC index, which holds exactly one
    /// entry per distinct stored statement.
    pub fn size(&self) -> Result<u64> {
        self.require_serving()?;
        let cf = self.cf(IndexKind::Spoc.column_family())?;
        Ok(self.db.iterator_cf(cf, rocksdb::IteratorMode::Start).count() as u64)
    }

    /// `Size` restricted to a `ContextRequest` (§6.1): an empty context list
    /// means "whole database" and falls back to [`Self::size`]; a non-empty
    /// list sums one CSPO scan per named context, exactly as the source
    /// does. Per §9's open question this is preserved as-is, including the
    /// double-count it produces if the same context resource is repeated in
    /// the request — see DESIGN.md for why that quirk is kept rather than
    /// silently deduplicated.
    pub fn size_in_contexts(&self, contexts: &[qstore_model::Resource]) -> Result<u64> {
        if contexts.is_empty() {
            return self.size();
        }
        self.require_serving()?;
        let mut total = 0u64;
        for ctx in contexts {
            let pattern = Pattern::new().with_context(ctx.clone());
            total += self.get_statements(&pattern)?.count() as u64;
        }
        Ok(total)
    }

    /// `GetContexts`: every distinct named-graph resource observed across
    /// stored statements, deduplicated.
    pub fn get_contexts(&self) -> Result<Vec<qstore_model::Resource>> {
        self.require_serving()?;
        let cf = self.cf(IndexKind::Cspo.column_family())?;
        let mut contexts = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_, value) = item?;
            let Some(stmt) = decode_statement(&value) else {
                warn!("skipping malformed statement record while listing contexts");
                continue;
            };
            if let Some(ctx) = stmt.context() {
                if seen.insert(ctx.clone()) {
                    contexts.push(ctx.clone());
                }
            }
        }
        Ok(contexts)
    }

    /// `Clear`: removes every statement, unconditionally. Implemented as
    /// `RemoveStatements` over the empty (all-wildcard) pattern so it goes
    /// through the same snapshot-then-delete path.
    pub fn clear(&self) -> Result<u64> {
        self.remove_statements(&Pattern::new())
    }

    /// `Clear` restricted to a `ContextRequest`: an empty context list
    /// clears the whole database ([`Self::clear`]); a non-empty list
    /// removes only the statements in each named context, one
    /// `RemoveStatements` call per context.
    pub fn clear_in_contexts(&self, contexts: &[qstore_model::Resource]) -> Result<u64> {
        if contexts.is_empty() {
            return self.clear();
        }
        let mut total = 0u64;
        for ctx in contexts {
            let pattern = Pattern::new().with_context(ctx.clone());
            total += self.remove_statements(&pattern)?;
        }
        Ok(total)
    }

    /// `Update`: applies a tagged stream of add/remove operations, honoring
    /// §4.3's ordering for namespaces and the fixed-size sub-batch flush for
    /// statements. Statement adds and removes are processed in arrival
    /// order within one sub-batch (see DESIGN.md for the cross-sub-batch
    /// ordering open question).
    #[instrument(skip(self, ops))]
    pub fn update(&self, ops: impl IntoIterator<Item = UpdateOp>) -> Result<UpdateCounts> {
        self.require_serving()?;
        let mut counts = UpdateCounts::default();
        let mut pending_add = Vec::with_capacity(self.batch_size);
        let mut pending_remove = Vec::with_capacity(self.batch_size);

        let flush = |add: &mut Vec<Statement>, remove: &mut Vec<Statement>| -> Result<(u64, u64)> {
            let mut added = 0u64;
            let mut removed = 0u64;
            if !remove.is_empty() {
                let batches = self.build_remove_batches(remove)?;
                self.write_parallel(batches)?;
                removed = remove.len() as u64;
                remove.clear();
            }
            if !add.is_empty() {
                let batches = self.build_add_batches(add)?;
                self.write_parallel(batches)?;
                added = add.len() as u64;
                add.clear();
            }
            Ok((added, removed))
        };

        for op in ops {
            match op {
                UpdateOp::AddNamespace(ns) => {
                    self.write_namespace(&ns)?;
                    counts.namespaces_added += 1;
                }
                UpdateOp::RemoveNamespace(prefix) => match self.get_namespace(Some(&prefix), None)
                {
                    Ok(ns) => {
                        self.remove_namespace_record(&ns)?;
                        counts.namespaces_removed += 1;
                    }
                    Err(StoreError::NamespaceNotFound(_)) => {}
                    Err(err) => return Err(err),
                },
                UpdateOp::AddStatement(stmt) => {
                    pending_add.push(stmt);
                    if pending_add.len() >= self.batch_size {
                        let (added, removed) = flush(&mut pending_add, &mut pending_remove)?;
                        counts.statements_added += added;
                        counts.statements_removed += removed;
                    }
                }
                UpdateOp::RemoveStatement(stmt) => {
                    pending_remove.push(stmt);
                    if pending_remove.len() >= self.batch_size {
                        let (added, removed) = flush(&mut pending_add, &mut pending_remove)?;
                        counts.statements_added += added;
                        counts.statements_removed += removed;
                    }
                }
            }
        }
        let (added, removed) = flush(&mut pending_add, &mut pending_remove)?;
        counts.statements_added += added;
        counts.statements_removed += removed;
        Ok(counts)
    }
}

fn encode_namespace(ns: &Namespace) -> Vec<u8> {
    let mut buf = Vec::new();
    let prefix = ns.prefix().as_bytes();
    buf.extend_from_slice(&(prefix.len() as u32).to_be_bytes());
    buf.extend_from_slice(prefix);
    buf.extend_from_slice(ns.uri().as_bytes());
    buf
}

fn decode_namespace(bytes: &[u8]) -> Option<Namespace> {
    let len = u32::from_be_bytes(bytes.get(0..4)?.try_into().ok()?) as usize;
    let prefix = decode_str(bytes.get(4..4 + len)?)?;
    let uri = decode_str(bytes.get(4 + len..)?)?;
    Some(Namespace::new(prefix, uri))
}

/// A snapshot-consistent iterator over `GetStatements` results. Holds an
/// open RocksDB snapshot and range cursor; callers should call
/// [`Self::close`] on every exit path (early `break`, cancellation, …) to
/// release it deterministically, though `Drop` releases it regardless.
pub struct StatementIterator {
    iter: DBRawIterator<'static>,
    // Kept only to extend the underlying DB's lifetime past the raw
    // iterator's borrow; see the `unsafe` block in `get_statements`.
    _db: Arc<DB>,
    upper: [u8; KEY_LEN],
    plan: Plan,
    pattern: Pattern,
    closed: bool,
}

impl StatementIterator {
    /// Releases the snapshot and cursor early. Safe to call more than once;
    /// safe to skip, since `Drop` does the same thing.
    pub fn close(mut self) {
        self.closed = true;
    }
}

impl Iterator for StatementIterator {
    type Item = Statement;

    fn next(&mut self) -> Option<Statement> {
        if self.closed {
            return None;
        }
        loop {
            let key = self.iter.key()?;
            if key > self.upper.as_slice() {
                self.closed = true;
                return None;
            }
            let value = self.iter.value().unwrap_or_default();
            let decoded = decode_statement(value);
            self.iter.next();
            match decoded {
                Some(stmt) => {
                    if !self.plan.needs_filter || matches(&self.pattern, &stmt) {
                        return Some(stmt);
                    }
                }
                None => warn!("skipping malformed statement record during scan"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qstore_model::{BlankNode, Resource, StringLiteral, Uri, Value};
    use tempfile::tempdir;

    fn open_engine() -> (tempfile::TempDir, StorageEngine) {
        let dir = tempdir().expect("tempdir");
        let engine = StorageEngine::open(EngineConfig::new(dir.path())).expect("open engine");
        (dir, engine)
    }

    fn stmt(s: &str, p: &str, o: &str) -> Statement {
        Statement::in_default_graph(
            Resource::Uri(Uri::new(s)),
            Uri::new(p),
            Value::Uri(Uri::new(o)),
        )
    }

    #[test]
    fn scenario_1_insert_query_remove() {
        let (_dir, engine) = open_engine();
        let s = stmt("http://ex/s1", "http://ex/p1", "http://ex/o1");
        engine.add_statements([s.clone()]).unwrap();
        assert_eq!(engine.size().unwrap(), 1);

        let all: Vec<_> = engine.get_statements(&Pattern::new()).unwrap().collect();
        assert_eq!(all, vec![s.clone()]);

        let removed = engine
            .remove_statements(&Pattern::new().with_subject(Resource::Uri(Uri::new("http://ex/s1"))))
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(engine.size().unwrap(), 0);
    }

    #[test]
    fn scenario_2_shared_subject_predicate_lookup() {
        let (_dir, engine) = open_engine();
        engine
            .add_statements([
                stmt("http://ex/s1", "http://ex/p1", "http://ex/o1"),
                stmt("http://ex/s1", "http://ex/p2", "http://ex/o2"),
                stmt("http://ex/s1", "http://ex/p3", "http://ex/o3"),
            ])
            .unwrap();

        let by_subject = engine
            .get_statements(&Pattern::new().with_subject(Resource::Uri(Uri::new("http://ex/s1"))))
            .unwrap()
            .count();
        assert_eq!(by_subject, 3);

        let by_predicate = engine
            .get_statements(&Pattern::new().with_predicate(Uri::new("http://ex/p2")))
            .unwrap()
            .count();
        assert_eq!(by_predicate, 1);
    }

    #[test]
    fn scenario_3_filtered_subject_object_scan() {
        let (_dir, engine) = open_engine();
        engine
            .add_statements([
                stmt("http://ex/s1", "http://ex/p1", "http://ex/o1"),
                stmt("http://ex/s1", "http://ex/p2", "http://ex/o1"),
                stmt("http://ex/s1", "http://ex/p3", "http://ex/o2"),
                stmt("http://ex/s2", "http://ex/p1", "http://ex/o1"),
                stmt("http://ex/s2", "http://ex/p2", "http://ex/o2"),
            ])
            .unwrap();

        let pattern = Pattern::new()
            .with_subject(Resource::Uri(Uri::new("http://ex/s1")))
            .with_object(Value::Uri(Uri::new("http://ex/o1")));
        let plan = planner::plan(&pattern);
        assert!(plan.needs_filter);

        let found = engine.get_statements(&pattern).unwrap().count();
        assert_eq!(found, 2);
    }

    #[test]
    fn scenario_4_namespace_lookup() {
        let (_dir, engine) = open_engine();
        engine
            .add_namespaces([Namespace::new("ex", "http://example.com/")])
            .unwrap();

        assert_eq!(
            engine.get_namespaces(Some("ex"), None).unwrap().len(),
            1
        );
        assert_eq!(
            engine
                .get_namespaces(None, Some("http://example.com/"))
                .unwrap()
                .len(),
            1
        );
        assert!(engine.get_namespaces(Some("zz"), None).unwrap().is_empty());
        assert!(engine.get_namespace(Some("zz"), None).is_err());
    }

    #[test]
    fn scenario_5_update_stream_net_zero_size() {
        let (_dir, engine) = open_engine();
        let s1 = stmt("http://ex/s1", "http://ex/p1", "http://ex/o1");
        engine.add_statements([s1.clone()]).unwrap();

        let s3 = stmt("http://ex/s1", "http://ex/p1", "http://ex/o3");
        engine
            .update([
                UpdateOp::RemoveStatement(s1.clone()),
                UpdateOp::AddStatement(s3.clone()),
            ])
            .unwrap();

        assert_eq!(engine.size().unwrap(), 1);
        assert_eq!(
            engine
                .get_statements(&Pattern::from_statement(&s1))
                .unwrap()
                .count(),
            0
        );
        assert_eq!(
            engine
                .get_statements(&Pattern::from_statement(&s3))
                .unwrap()
                .count(),
            1
        );
    }

    #[test]
    fn size_and_clear_in_contexts_scope_to_named_graphs() {
        let (_dir, engine) = open_engine();
        let g1 = Resource::Uri(Uri::new("http://ex/g1"));
        let g2 = Resource::Uri(Uri::new("http://ex/g2"));
        let in_g1 = Statement::new(
            Resource::Uri(Uri::new("http://ex/s1")),
            Uri::new("http://ex/p1"),
            Value::Uri(Uri::new("http://ex/o1")),
            Some(g1.clone()),
        );
        let in_g2 = Statement::new(
            Resource::Uri(Uri::new("http://ex/s2")),
            Uri::new("http://ex/p1"),
            Value::Uri(Uri::new("http://ex/o2")),
            Some(g2),
        );
        let default_graph = stmt("http://ex/s3", "http://ex/p1", "http://ex/o3");
        engine
            .add_statements([in_g1.clone(), in_g2.clone(), default_graph.clone()])
            .unwrap();

        assert_eq!(engine.size_in_contexts(&[]).unwrap(), 3);
        assert_eq!(engine.size_in_contexts(&[g1.clone()]).unwrap(), 1);
        // Repeating a context sums its scan twice, reproducing the
        // documented double-count (see DESIGN.md).
        assert_eq!(engine.size_in_contexts(&[g1.clone(), g1.clone()]).unwrap(), 2);

        assert_eq!(engine.clear_in_contexts(&[g1]).unwrap(), 1);
        assert_eq!(engine.size().unwrap(), 2);
    }

    #[test]
    fn add_is_idempotent_at_the_statement_level() {
        let (_dir, engine) = open_engine();
        let s = stmt("http://ex/s1", "http://ex/p1", "http://ex/o1");
        engine.add_statements([s.clone()]).unwrap();
        engine.add_statements([s.clone()]).unwrap();
        assert_eq!(engine.size().unwrap(), 1);
    }

    #[test]
    fn remove_of_absent_statement_is_a_no_op() {
        let (_dir, engine) = open_engine();
        let pattern = Pattern::from_statement(&stmt("http://ex/s1", "http://ex/p1", "http://ex/o1"));
        assert_eq!(engine.remove_statements(&pattern).unwrap(), 0);
    }

    #[test]
    fn update_remove_namespace_of_absent_prefix_is_a_no_op() {
        let (_dir, engine) = open_engine();
        let counts = engine
            .update([UpdateOp::RemoveNamespace("zz".to_owned())])
            .unwrap();
        assert_eq!(counts.namespaces_removed, 0);
    }

    #[test]
    fn update_remove_namespace_removes_an_existing_prefix() {
        let (_dir, engine) = open_engine();
        engine
            .add_namespaces([Namespace::new("ex", "http://example.com/")])
            .unwrap();
        let counts = engine
            .update([UpdateOp::RemoveNamespace("ex".to_owned())])
            .unwrap();
        assert_eq!(counts.namespaces_removed, 1);
        assert!(engine.get_namespace(Some("ex"), None).is_err());
    }

    #[test]
    fn empty_pattern_yields_every_statement() {
        let (_dir, engine) = open_engine();
        engine
            .add_statements([
                stmt("http://ex/s1", "http://ex/p1", "http://ex/o1"),
                stmt("http://ex/s2", "http://ex/p2", "http://ex/o2"),
            ])
            .unwrap();
        assert_eq!(engine.get_statements(&Pattern::new()).unwrap().count(), 2);
    }

    #[test]
    fn default_graph_and_named_graph_statements_are_distinct() {
        let (_dir, engine) = open_engine();
        let default_graph = stmt("http://ex/s1", "http://ex/p1", "http://ex/o1");
        let named_graph = Statement::new(
            Resource::Uri(Uri::new("http://ex/s1")),
            Uri::new("http://ex/p1"),
            Value::Uri(Uri::new("http://ex/o1")),
            Some(Resource::BlankNode(BlankNode::new("g1"))),
        );
        engine
            .add_statements([default_graph.clone(), named_graph.clone()])
            .unwrap();
        assert_eq!(engine.size().unwrap(), 2);

        let contexts = engine.get_contexts().unwrap();
        assert_eq!(contexts, vec![Resource::BlankNode(BlankNode::new("g1"))]);
    }

    #[test]
    fn literal_language_variants_are_distinct_statements() {
        let (_dir, engine) = open_engine();
        let plain = Statement::in_default_graph(
            Resource::Uri(Uri::new("http://ex/s1")),
            Uri::new("http://ex/p1"),
            Value::StringLiteral(StringLiteral::new("hello")),
        );
        let empty_lang = Statement::in_default_graph(
            Resource::Uri(Uri::new("http://ex/s1")),
            Uri::new("http://ex/p1"),
            Value::StringLiteral(StringLiteral::with_language("hello", "")),
        );
        engine.add_statements([plain, empty_lang]).unwrap();
        assert_eq!(engine.size().unwrap(), 2);
    }

    #[test]
    fn close_marks_engine_unusable_for_new_operations() {
        let (_dir, engine) = open_engine();
        engine.close();
        assert!(engine.add_statements([]).is_err());
        assert!(engine.size().is_err());
    }

    #[test]
    fn statement_iterator_close_releases_before_exhaustion() {
        let (_dir, engine) = open_engine();
        engine
            .add_statements([
                stmt("http://ex/s1", "http://ex/p1", "http://ex/o1"),
                stmt("http://ex/s2", "http://ex/p2", "http://ex/o2"),
            ])
            .unwrap();
        let mut iter = engine.get_statements(&Pattern::new()).unwrap();
        assert!(iter.next().is_some());
        iter.close();
    }

    #[test]
    fn bulk_ingest_respects_small_batch_size() {
        let dir = tempdir().expect("tempdir");
        let engine = StorageEngine::open(EngineConfig::new(dir.path()).with_batch_size(2)).unwrap();
        let stmts: Vec<_> = (0..7)
            .map(|i| stmt("http://ex/s1", &format!("http://ex/p{i}"), "http://ex/o1"))
            .collect();
        let added = engine.add_statements(stmts).unwrap();
        assert_eq!(added, 7);
        assert_eq!(engine.size().unwrap(), 7);
    }
}
