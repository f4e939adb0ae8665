//! Conversions between the in-memory quad model (C1) and the generated
//! wire types (§6.1). Malformed wire messages (a `oneof` left unset, an
//! empty required field) are never fatal — they surface as
//! `ConversionError` and the RPC layer maps them to `INVALID_ARGUMENT` or
//! skips the offending item, per §7 error kind 1.

use qstore_model::{
    BlankNode, DatatypeLiteral, Namespace, Pattern, Resource, Statement, StringLiteral, Uri, Value,
};
use qstore_proto::qstore::v1 as wire;

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

pub fn uri_from_wire(uri: wire::Uri) -> Uri {
    Uri::new(uri.iri)
}

pub fn uri_to_wire(uri: &Uri) -> wire::Uri {
    wire::Uri { iri: uri.as_str().to_owned() }
}

pub fn resource_from_wire(resource: wire::Resource) -> Result<Resource, ConversionError> {
    match resource.term {
        Some(wire::resource::Term::Uri(u)) => Ok(Resource::Uri(uri_from_wire(u))),
        Some(wire::resource::Term::BlankNode(b)) => Ok(Resource::BlankNode(BlankNode::new(b.id))),
        None => Err(ConversionError::MissingField("resource.term")),
    }
}

pub fn resource_to_wire(resource: &Resource) -> wire::Resource {
    let term = match resource {
        Resource::Uri(u) => wire::resource::Term::Uri(uri_to_wire(u)),
        Resource::BlankNode(b) => {
            wire::resource::Term::BlankNode(wire::BlankNode { id: b.as_str().to_owned() })
        }
    };
    wire::Resource { term: Some(term) }
}

pub fn value_from_wire(value: wire::Value) -> Result<Value, ConversionError> {
    match value.term {
        Some(wire::value::Term::Uri(u)) => Ok(Value::Uri(uri_from_wire(u))),
        Some(wire::value::Term::BlankNode(b)) => Ok(Value::BlankNode(BlankNode::new(b.id))),
        Some(wire::value::Term::StringLiteral(lit)) => Ok(Value::StringLiteral(match lit.language {
            Some(lang) => StringLiteral::with_language(lit.content, lang),
            None => StringLiteral::new(lit.content),
        })),
        Some(wire::value::Term::DatatypeLiteral(lit)) => Ok(Value::DatatypeLiteral(
            DatatypeLiteral::new(lit.content, Uri::new(lit.datatype_iri)),
        )),
        None => Err(ConversionError::MissingField("value.term")),
    }
}

pub fn value_to_wire(value: &Value) -> wire::Value {
    let term = match value {
        Value::Uri(u) => wire::value::Term::Uri(uri_to_wire(u)),
        Value::BlankNode(b) => {
            wire::value::Term::BlankNode(wire::BlankNode { id: b.as_str().to_owned() })
        }
        Value::StringLiteral(lit) => wire::value::Term::StringLiteral(wire::StringLiteral {
            content: lit.content().to_owned(),
            language: lit.language().map(str::to_owned),
        }),
        Value::DatatypeLiteral(lit) => wire::value::Term::DatatypeLiteral(wire::DatatypeLiteral {
            content: lit.content().to_owned(),
            datatype_iri: lit.datatype().as_str().to_owned(),
        }),
    };
    wire::Value { term: Some(term) }
}

pub fn namespace_from_wire(ns: wire::Namespace) -> Namespace {
    Namespace::new(ns.prefix, ns.uri)
}

pub fn namespace_to_wire(ns: &Namespace) -> wire::Namespace {
    wire::Namespace { prefix: ns.prefix().to_owned(), uri: ns.uri().to_owned() }
}

pub fn statement_from_wire(stmt: wire::Statement) -> Result<Statement, ConversionError> {
    let subject = resource_from_wire(stmt.subject.ok_or(ConversionError::MissingField("subject"))?)?;
    let predicate = uri_from_wire(stmt.predicate.ok_or(ConversionError::MissingField("predicate"))?);
    let object = value_from_wire(stmt.object.ok_or(ConversionError::MissingField("object"))?)?;
    let context = stmt.context.map(resource_from_wire).transpose()?;
    Ok(Statement::new(subject, predicate, object, context))
}

pub fn statement_to_wire(stmt: &Statement) -> wire::Statement {
    wire::Statement {
        subject: Some(resource_to_wire(stmt.subject())),
        predicate: Some(uri_to_wire(stmt.predicate())),
        object: Some(value_to_wire(stmt.object())),
        context: stmt.context().map(resource_to_wire),
    }
}

/// A `StatementPattern` wire message has the same shape as `Statement` but
/// every field is genuinely optional (wildcard), so this is intentionally
/// infallible — an absent field means "unbound", not "malformed".
pub fn pattern_from_wire(pattern: wire::StatementPattern) -> Result<Pattern, ConversionError> {
    let mut out = Pattern::new();
    if let Some(subject) = pattern.subject {
        out = out.with_subject(resource_from_wire(subject)?);
    }
    if let Some(predicate) = pattern.predicate {
        out = out.with_predicate(uri_from_wire(predicate));
    }
    if let Some(object) = pattern.object {
        out = out.with_object(value_from_wire(object)?);
    }
    if let Some(context) = pattern.context {
        out = out.with_context(resource_from_wire(context)?);
    }
    Ok(out)
}

pub fn namespace_pattern_from_wire(pattern: wire::NamespacePattern) -> (Option<String>, Option<String>) {
    (pattern.prefix, pattern.uri)
}

/// A `ContextRequest`'s resources are never wildcards, so a malformed
/// entry (an empty `oneof`) is a genuine conversion error rather than
/// "unbound" — unlike [`pattern_from_wire`].
pub fn contexts_from_wire(request: wire::ContextRequest) -> Result<Vec<Resource>, ConversionError> {
    request.contexts.into_iter().map(resource_from_wire).collect()
}
