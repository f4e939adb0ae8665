//! Binary encoding for the statement value stored under every index key.
//! This is an internal on-disk representation, not an RDF serialization
//! format (Turtle/N-Triples/etc. stay out of scope) — it only needs to be
//! stable across the process that wrote it and the process that reads it
//! back.

use qstore_model::namespace_table;
use qstore_model::{BlankNode, DatatypeLiteral, Resource, Statement, StringLiteral, Uri, Value};

const TAG_URI: u8 = 1;
const TAG_BLANK_NODE: u8 = 2;
const TAG_STRING_LITERAL: u8 = 3;
const TAG_DATATYPE_LITERAL: u8 = 4;

fn write_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn read_str(buf: &[u8], pos: &mut usize) -> Option<String> {
    let len = u32::from_be_bytes(buf.get(*pos..*pos + 4)?.try_into().ok()?) as usize;
    *pos += 4;
    let bytes = buf.get(*pos..*pos + len)?;
    *pos += len;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Writes a URI with its well-known namespace prefix substituted (C2),
/// so stored statement values carry the compressed form (§4.3, §6.2).
fn write_uri_str(buf: &mut Vec<u8>, uri: &str) {
    write_str(buf, &namespace_table::encode(uri));
}

/// Reverses [`write_uri_str`], expanding any prefix token back to its full
/// namespace URI before the caller constructs a [`Uri`].
fn read_uri_str(buf: &[u8], pos: &mut usize) -> Option<String> {
    Some(namespace_table::decode(&read_str(buf, pos)?))
}

fn write_resource(buf: &mut Vec<u8>, resource: &Resource) {
    match resource {
        Resource::Uri(u) => {
            buf.push(TAG_URI);
            write_uri_str(buf, u.as_str());
        }
        Resource::BlankNode(b) => {
            buf.push(TAG_BLANK_NODE);
            write_str(buf, b.as_str());
        }
    }
}

fn read_resource(buf: &[u8], pos: &mut usize) -> Option<Resource> {
    let tag = *buf.get(*pos)?;
    *pos += 1;
    match tag {
        TAG_URI => Some(Resource::Uri(Uri::new(read_uri_str(buf, pos)?))),
        TAG_BLANK_NODE => Some(Resource::BlankNode(BlankNode::new(read_str(buf, pos)?))),
        _ => None,
    }
}

fn write_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Uri(u) => {
            buf.push(TAG_URI);
            write_uri_str(buf, u.as_str());
        }
        Value::BlankNode(b) => {
            buf.push(TAG_BLANK_NODE);
            write_str(buf, b.as_str());
        }
        Value::StringLiteral(lit) => {
            buf.push(TAG_STRING_LITERAL);
            write_str(buf, lit.content());
            match lit.language() {
                Some(lang) => {
                    buf.push(1);
                    write_str(buf, lang);
                }
                None => buf.push(0),
            }
        }
        Value::DatatypeLiteral(lit) => {
            buf.push(TAG_DATATYPE_LITERAL);
            write_str(buf, lit.content());
            write_uri_str(buf, lit.datatype().as_str());
        }
    }
}

fn read_value(buf: &[u8], pos: &mut usize) -> Option<Value> {
    let tag = *buf.get(*pos)?;
    *pos += 1;
    match tag {
        TAG_URI => Some(Value::Uri(Uri::new(read_uri_str(buf, pos)?))),
        TAG_BLANK_NODE => Some(Value::BlankNode(BlankNode::new(read_str(buf, pos)?))),
        TAG_STRING_LITERAL => {
            let content = read_str(buf, pos)?;
            let has_lang = *buf.get(*pos)?;
            *pos += 1;
            let lit = if has_lang == 1 {
                StringLiteral::with_language(content, read_str(buf, pos)?)
            } else {
                StringLiteral::new(content)
            };
            Some(Value::StringLiteral(lit))
        }
        TAG_DATATYPE_LITERAL => {
            let content = read_str(buf, pos)?;
            let datatype = Uri::new(read_uri_str(buf, pos)?);
            Some(Value::DatatypeLiteral(DatatypeLiteral::new(content, datatype)))
        }
        _ => None,
    }
}

pub fn encode_statement(stmt: &Statement) -> Vec<u8> {
    let mut buf = Vec::new();
    write_resource(&mut buf, stmt.subject());
    write_uri_str(&mut buf, stmt.predicate().as_str());
    write_value(&mut buf, stmt.object());
    match stmt.context() {
        Some(ctx) => {
            buf.push(1);
            write_resource(&mut buf, ctx);
        }
        None => buf.push(0),
    }
    buf
}

/// Returns `None` on malformed bytes — callers treat this the same as any
/// other malformed-input case: log and skip, never panic.
pub fn decode_statement(bytes: &[u8]) -> Option<Statement> {
    let mut pos = 0;
    let subject = read_resource(bytes, &mut pos)?;
    let predicate = Uri::new(read_uri_str(bytes, &mut pos)?);
    let object = read_value(bytes, &mut pos)?;
    let has_context = *bytes.get(pos)?;
    pos += 1;
    let context = if has_context == 1 {
        Some(read_resource(bytes, &mut pos)?)
    } else {
        None
    };
    Some(Statement::new(subject, predicate, object, context))
}

pub fn encode_str(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

pub fn decode_str(bytes: &[u8]) -> Option<String> {
    String::from_utf8(bytes.to_vec()).ok()
}
