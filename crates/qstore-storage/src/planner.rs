//! The pattern planner (C4): a strict, first-match-wins decision over which
//! of the four indexes to scan for a given query pattern, and whether the
//! index scan alone is selective enough or needs a post-filter pass.

use qstore_model::Pattern;

use crate::key::IndexKind;

/// The chosen index plus whether matches pulled off that index still need
/// to be checked against the full pattern before being returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub index: IndexKind,
    pub needs_filter: bool,
}

/// Picks an index for `pattern` using the six-branch policy: subject-bound
/// patterns prefer SPOC (or CSPO if context is also bound), object-bound
/// patterns use OPSC, predicate-bound patterns use PCOS, context-only
/// patterns use CSPO, and the unbound pattern falls back to SPOC.
pub fn plan(pattern: &Pattern) -> Plan {
    if pattern.has_subject() {
        let index = if pattern.has_context() {
            IndexKind::Cspo
        } else {
            IndexKind::Spoc
        };
        let needs_filter = !pattern.has_predicate() && pattern.has_object();
        Plan { index, needs_filter }
    } else if pattern.has_object() {
        Plan {
            index: IndexKind::Opsc,
            needs_filter: pattern.has_context(),
        }
    } else if pattern.has_predicate() {
        Plan {
            index: IndexKind::Pcos,
            needs_filter: false,
        }
    } else if pattern.has_context() {
        Plan {
            index: IndexKind::Cspo,
            needs_filter: false,
        }
    } else {
        Plan {
            index: IndexKind::Spoc,
            needs_filter: false,
        }
    }
}
