//! RDF term, statement and namespace types shared by every other crate in
//! the workspace, plus the well-known namespace prefix table (C2).

pub mod namespace_table;
mod statement;
mod term;

pub use statement::{matches, Namespace, Pattern, Statement};
pub use term::{BlankNode, DatatypeLiteral, Resource, StringLiteral, Uri, Value};
