//! The triple source adapter (C6): the narrow contract an external SPARQL
//! evaluator depends on, translating `Option`-wildcard arguments into a
//! [`Pattern`] and delegating to the [`StorageEngine`] without buffering.

use qstore_model::{Resource, Statement, Uri, Value};

use crate::engine::{StatementIterator, StorageEngine};
use crate::error::Result;
use qstore_model::Pattern;

/// Implemented by anything an external SPARQL evaluator can pull triples
/// from. The storage engine is the only implementor in this repo; the
/// SPARQL algebra and execution themselves stay out of scope (§1).
pub trait TripleSource {
    /// Existence check with wildcards; `true` iff at least one stored
    /// statement matches the given (possibly partial) pattern.
    fn has_statement(
        &self,
        subject: Option<&Resource>,
        predicate: Option<&Uri>,
        object: Option<&Value>,
        context: Option<&Resource>,
    ) -> Result<bool>;

    /// Streaming enumeration of statements matching the given (possibly
    /// partial) pattern. The caller owns the returned iterator and should
    /// drive it to completion or close it explicitly.
    fn get_statements(
        &self,
        subject: Option<&Resource>,
        predicate: Option<&Uri>,
        object: Option<&Value>,
        context: Option<&Resource>,
    ) -> Result<StatementIterator>;
}

fn pattern_of(
    subject: Option<&Resource>,
    predicate: Option<&Uri>,
    object: Option<&Value>,
    context: Option<&Resource>,
) -> Pattern {
    let mut pattern = Pattern::new();
    if let Some(s) = subject {
        pattern = pattern.with_subject(s.clone());
    }
    if let Some(p) = predicate {
        pattern = pattern.with_predicate(p.clone());
    }
    if let Some(o) = object {
        pattern = pattern.with_object(o.clone());
    }
    if let Some(c) = context {
        pattern = pattern.with_context(c.clone());
    }
    pattern
}

impl TripleSource for StorageEngine {
    fn has_statement(
        &self,
        subject: Option<&Resource>,
        predicate: Option<&Uri>,
        object: Option<&Value>,
        context: Option<&Resource>,
    ) -> Result<bool> {
        let pattern = pattern_of(subject, predicate, object, context);
        let mut iter = self.get_statements(&pattern)?;
        Ok(iter.next().is_some())
    }

    fn get_statements(
        &self,
        subject: Option<&Resource>,
        predicate: Option<&Uri>,
        object: Option<&Value>,
        context: Option<&Resource>,
    ) -> Result<StatementIterator> {
        let pattern = pattern_of(subject, predicate, object, context);
        StorageEngine::get_statements(self, &pattern)
    }
}
