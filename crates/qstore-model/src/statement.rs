use std::fmt;

use crate::term::{Resource, Uri, Value};

/// A prefix/URI pair registered with the store, e.g. `("rdf:", "http://www.w3.org/1999/02/22-rdf-syntax-ns#")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    prefix: String,
    uri: String,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.prefix, self.uri)
    }
}

/// A single RDF quad: subject, predicate, object and an optional graph context.
///
/// An unset `context` denotes the default graph — there is no separate
/// sentinel variant for it, the absence itself carries that meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    subject: Resource,
    predicate: Uri,
    object: Value,
    context: Option<Resource>,
}

impl Statement {
    pub fn new(subject: Resource, predicate: Uri, object: Value, context: Option<Resource>) -> Self {
        Self {
            subject,
            predicate,
            object,
            context,
        }
    }

    pub fn in_default_graph(subject: Resource, predicate: Uri, object: Value) -> Self {
        Self::new(subject, predicate, object, None)
    }

    pub fn subject(&self) -> &Resource {
        &self.subject
    }

    pub fn predicate(&self) -> &Uri {
        &self.predicate
    }

    pub fn object(&self) -> &Value {
        &self.object
    }

    pub fn context(&self) -> Option<&Resource> {
        self.context.as_ref()
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(ctx) => write!(
                f,
                "{} {{ {} {} {} . }}",
                ctx, self.subject, self.predicate, self.object
            ),
            None => write!(f, "{} {} {} .", self.subject, self.predicate, self.object),
        }
    }
}

/// A query pattern over statement fields, every field optional (wildcard).
///
/// This is the input to the pattern planner (C4) and to storage engine
/// read/remove operations; it intentionally mirrors `Statement`'s shape but
/// with every field behind `Option`, instead of reusing sentinel terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Pattern {
    pub subject: Option<Resource>,
    pub predicate: Option<Uri>,
    pub object: Option<Value>,
    pub context: Option<Resource>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subject(mut self, subject: Resource) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_predicate(mut self, predicate: Uri) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_object(mut self, object: Value) -> Self {
        self.object = Some(object);
        self
    }

    pub fn with_context(mut self, context: Resource) -> Self {
        self.context = Some(context);
        self
    }

    pub fn has_subject(&self) -> bool {
        self.subject.is_some()
    }

    pub fn has_predicate(&self) -> bool {
        self.predicate.is_some()
    }

    pub fn has_object(&self) -> bool {
        self.object.is_some()
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Builds the exact-match pattern for a concrete statement.
    pub fn from_statement(stmt: &Statement) -> Self {
        Self {
            subject: Some(stmt.subject().clone()),
            predicate: Some(stmt.predicate().clone()),
            object: Some(stmt.object().clone()),
            context: stmt.context().cloned(),
        }
    }
}

/// Free matching predicate shared by the storage engine's post-filter and
/// its remove-by-pattern path: unset pattern fields match anything, set
/// fields require exact equality.
pub fn matches(pattern: &Pattern, stmt: &Statement) -> bool {
    if let Some(ctx) = &pattern.context {
        if stmt.context() != Some(ctx) {
            return false;
        }
    }
    if let Some(subject) = &pattern.subject {
        if stmt.subject() != subject {
            return false;
        }
    }
    if let Some(predicate) = &pattern.predicate {
        if stmt.predicate() != predicate {
            return false;
        }
    }
    if let Some(object) = &pattern.object {
        if stmt.object() != object {
            return false;
        }
    }
    true
}
