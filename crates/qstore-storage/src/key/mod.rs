//! The quad key codec (C3): per-field MurmurHash3 hashing, sentinel-filled
//! unset fields, and the four fixed-order 64-byte key layouts used by the
//! storage engine's column families.

mod murmur3;

use qstore_model::{Pattern, Resource, Statement, Uri, Value};

/// Seed used for every field hash. Chosen to match the original backend this
/// codec is ported from; changing it would silently invalidate any
/// previously written database.
pub const HASH_SEED: u64 = 13;

pub const FIELD_LEN: usize = 16;
pub const KEY_LEN: usize = FIELD_LEN * 4;

const LOWER_FILL: u8 = 0x00;
const UPPER_FILL: u8 = 0xFF;

/// Which of the four column families a pattern should be queried against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Spoc,
    Cspo,
    Opsc,
    Pcos,
}

impl IndexKind {
    pub fn column_family(self) -> &'static str {
        match self {
            Self::Spoc => "spoc",
            Self::Cspo => "cspo",
            Self::Opsc => "opsc",
            Self::Pcos => "pcos",
        }
    }

    pub fn all() -> [Self; 4] {
        [Self::Spoc, Self::Cspo, Self::Opsc, Self::Pcos]
    }
}

/// Lower (`0x00`-filled) or upper (`0xFF`-filled) bound for an unset field,
/// used to build the two ends of a range scan over a partially bound
/// pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Lower,
    Upper,
}

fn tagged_bytes(tag: u8, content: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(content.len() + 1);
    buf.push(tag);
    buf.extend_from_slice(content.as_bytes());
    buf
}

fn hash_uri(uri: &Uri) -> [u8; FIELD_LEN] {
    murmur3::hash_bytes16(&tagged_bytes(b'U', uri.as_str()), HASH_SEED)
}

fn hash_resource(resource: &Resource) -> [u8; FIELD_LEN] {
    let tag = match resource {
        Resource::Uri(_) => b'U',
        Resource::BlankNode(_) => b'B',
    };
    murmur3::hash_bytes16(&tagged_bytes(tag, resource.as_str()), HASH_SEED)
}

fn hash_value(value: &Value) -> [u8; FIELD_LEN] {
    match value {
        Value::Uri(u) => murmur3::hash_bytes16(&tagged_bytes(b'U', u.as_str()), HASH_SEED),
        Value::BlankNode(b) => murmur3::hash_bytes16(&tagged_bytes(b'B', b.as_str()), HASH_SEED),
        Value::StringLiteral(lit) => {
            let content = match lit.language() {
                Some(lang) => format!("{}\u{0}{lang}", lit.content()),
                None => lit.content().to_owned(),
            };
            murmur3::hash_bytes16(&tagged_bytes(b'S', &content), HASH_SEED)
        }
        Value::DatatypeLiteral(lit) => {
            let content = format!("{}\u{0}{}", lit.content(), lit.datatype().as_str());
            murmur3::hash_bytes16(&tagged_bytes(b'D', &content), HASH_SEED)
        }
    }
}

/// The four per-field hashes extracted from a statement or a query pattern,
/// each `None` when that field is unbound.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldHashes {
    pub subject: Option<[u8; FIELD_LEN]>,
    pub predicate: Option<[u8; FIELD_LEN]>,
    pub object: Option<[u8; FIELD_LEN]>,
    pub context: Option<[u8; FIELD_LEN]>,
}

impl FieldHashes {
    pub fn from_statement(stmt: &Statement) -> Self {
        Self {
            subject: Some(hash_resource(stmt.subject())),
            predicate: Some(hash_uri(stmt.predicate())),
            object: Some(hash_value(stmt.object())),
            context: stmt.context().map(hash_resource),
        }
    }

    pub fn from_pattern(pattern: &Pattern) -> Self {
        Self {
            subject: pattern.subject.as_ref().map(hash_resource),
            predicate: pattern.predicate.as_ref().map(hash_uri),
            object: pattern.object.as_ref().map(hash_value),
            context: pattern.context.as_ref().map(hash_resource),
        }
    }

    /// Builds the 64-byte key for the given index ordering and bound,
    /// filling every unbound field with the bound's sentinel byte.
    pub fn build_key(&self, kind: IndexKind, bound: Bound) -> [u8; KEY_LEN] {
        let fill = match bound {
            Bound::Lower => LOWER_FILL,
            Bound::Upper => UPPER_FILL,
        };
        let field = |slot: Option<[u8; FIELD_LEN]>| slot.unwrap_or([fill; FIELD_LEN]);

        let ordered = match kind {
            IndexKind::Spoc => [self.subject, self.predicate, self.object, self.context],
            IndexKind::Cspo => [self.context, self.subject, self.predicate, self.object],
            IndexKind::Opsc => [self.object, self.predicate, self.subject, self.context],
            IndexKind::Pcos => [self.predicate, self.context, self.object, self.subject],
        };

        let mut key = [0u8; KEY_LEN];
        for (i, slot) in ordered.into_iter().enumerate() {
            key[i * FIELD_LEN..(i + 1) * FIELD_LEN].copy_from_slice(&field(slot));
        }
        key
    }
}

/// Unsigned lexicographic comparison over raw key bytes, matching the
/// custom comparator RocksDB is configured with for every index column
/// family.
pub fn compare_keys(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    a.cmp(b)
}

/// Hashes the canonical encoding of a whole statement (all four fields) and
/// folds the 128-bit MurmurHash3 digest down to 64 bits, for use as a
/// shard routing key (§4.6: "hash the canonical serialized form of the
/// statement"). Reuses the same hash primitive the key codec builds the
/// four indexes from, so the proxy and the engine agree on one hash family
/// instead of introducing a second one just for routing.
pub fn shard_hash(stmt: &Statement) -> u64 {
    let mut buf = Vec::new();
    buf.extend_from_slice(&hash_resource(stmt.subject()));
    buf.extend_from_slice(&hash_uri(stmt.predicate()));
    buf.extend_from_slice(&hash_value(stmt.object()));
    if let Some(ctx) = stmt.context() {
        buf.extend_from_slice(&hash_resource(ctx));
    }
    fold64(&murmur3::hash_bytes16(&buf, HASH_SEED))
}

fn fold64(bytes: &[u8; FIELD_LEN]) -> u64 {
    let (hi, lo) = bytes.split_at(8);
    let hi = u64::from_be_bytes(hi.try_into().expect("split_at(8) yields an 8-byte slice"));
    let lo = u64::from_be_bytes(lo.try_into().expect("split_at(8) yields an 8-byte slice"));
    hi ^ lo
}

#[cfg(test)]
mod tests {
    use super::*;
    use qstore_model::{BlankNode, StringLiteral};

    fn sample_statement() -> Statement {
        Statement::in_default_graph(
            Resource::Uri(Uri::new("http://example.com/s")),
            Uri::new("http://example.com/p"),
            Value::StringLiteral(StringLiteral::new("o")),
        )
    }

    #[test]
    fn key_is_64_bytes() {
        let hashes = FieldHashes::from_statement(&sample_statement());
        for kind in IndexKind::all() {
            assert_eq!(hashes.build_key(kind, Bound::Lower).len(), KEY_LEN);
        }
    }

    #[test]
    fn unset_fields_get_sentinel_fill() {
        let pattern = Pattern::new().with_predicate(Uri::new("http://example.com/p"));
        let hashes = FieldHashes::from_pattern(&pattern);
        let lo = hashes.build_key(IndexKind::Pcos, Bound::Lower);
        let hi = hashes.build_key(IndexKind::Pcos, Bound::Upper);
        // PCOS order is predicate, context, object, subject: predicate is
        // bound so the first 16 bytes are identical between lo/hi, the rest
        // differ because they're sentinel-filled.
        assert_eq!(&lo[0..16], &hi[0..16]);
        assert_eq!(&lo[16..], [0x00; 48]);
        assert_eq!(&hi[16..], [0xFF; 48]);
    }

    #[test]
    fn distinct_resources_hash_differently() {
        let uri = Resource::Uri(Uri::new("http://example.com/x"));
        let bnode = Resource::BlankNode(BlankNode::new("http://example.com/x"));
        assert_ne!(hash_resource(&uri), hash_resource(&bnode));
    }

    #[test]
    fn orderings_place_fields_differently() {
        let hashes = FieldHashes::from_statement(&sample_statement());
        let spoc = hashes.build_key(IndexKind::Spoc, Bound::Lower);
        let cspo = hashes.build_key(IndexKind::Cspo, Bound::Lower);
        // Default graph statement: context is unset, so CSPO starts with
        // the sentinel fill while SPOC doesn't.
        assert_eq!(&cspo[0..16], &[0x00; 16]);
        assert_ne!(&spoc[0..16], &[0x00; 16]);
    }

    #[test]
    fn shard_hash_is_deterministic_and_whole_statement_keyed() {
        let a = sample_statement();
        let b = Statement::in_default_graph(
            Resource::Uri(Uri::new("http://example.com/s")),
            Uri::new("http://example.com/p"),
            Value::StringLiteral(StringLiteral::new("a different object")),
        );
        assert_eq!(shard_hash(&a), shard_hash(&a));
        // Same subject, different object: the whole statement is hashed,
        // so the routing key differs.
        assert_ne!(shard_hash(&a), shard_hash(&b));
    }

    #[test]
    fn lower_key_le_upper_key() {
        let hashes = FieldHashes::from_statement(&sample_statement());
        for kind in IndexKind::all() {
            let lo = hashes.build_key(kind, Bound::Lower);
            let hi = hashes.build_key(kind, Bound::Upper);
            assert!(compare_keys(&lo, &hi) != std::cmp::Ordering::Greater);
        }
    }
}
