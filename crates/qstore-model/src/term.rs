use std::fmt;

/// An RDF URI reference, e.g. `<http://example.com/s>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uri(String);

impl Uri {
    pub fn new(iri: impl Into<String>) -> Self {
        Self(iri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl From<String> for Uri {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Uri {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A blank node, identified by an opaque label that is only unique within a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlankNode(String);

impl BlankNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.0)
    }
}

/// A plain string literal, optionally carrying a non-empty language tag.
///
/// A literal with an absent language tag and one with an empty-but-present
/// tag are distinct values (see spec boundary behaviors).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringLiteral {
    content: String,
    language: Option<String>,
}

impl StringLiteral {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            language: None,
        }
    }

    pub fn with_language(content: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            language: Some(language.into()),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

impl fmt::Display for StringLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.content)?;
        if let Some(lang) = &self.language {
            write!(f, "@{lang}")?;
        }
        Ok(())
    }
}

/// A literal whose content is interpreted under an explicit datatype URI.
///
/// The datatype is copied by value into the literal rather than shared by
/// reference, keeping terms flat-comparable (see design notes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatatypeLiteral {
    content: String,
    datatype: Uri,
}

impl DatatypeLiteral {
    pub fn new(content: impl Into<String>, datatype: Uri) -> Self {
        Self {
            content: content.into(),
            datatype,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn datatype(&self) -> &Uri {
        &self.datatype
    }
}

impl fmt::Display for DatatypeLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"^^{}", self.content, self.datatype)
    }
}

/// The sum type `URI | BlankNode`, used for subjects and (named graph) contexts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    Uri(Uri),
    BlankNode(BlankNode),
}

impl Resource {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Uri(u) => u.as_str(),
            Self::BlankNode(b) => b.as_str(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uri(u) => write!(f, "{u}"),
            Self::BlankNode(b) => write!(f, "{b}"),
        }
    }
}

impl From<Uri> for Resource {
    fn from(u: Uri) -> Self {
        Self::Uri(u)
    }
}

impl From<BlankNode> for Resource {
    fn from(b: BlankNode) -> Self {
        Self::BlankNode(b)
    }
}

/// The sum type `URI | BlankNode | StringLiteral | DatatypeLiteral`, used for objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Uri(Uri),
    BlankNode(BlankNode),
    StringLiteral(StringLiteral),
    DatatypeLiteral(DatatypeLiteral),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uri(u) => write!(f, "{u}"),
            Self::BlankNode(b) => write!(f, "{b}"),
            Self::StringLiteral(s) => write!(f, "{s}"),
            Self::DatatypeLiteral(d) => write!(f, "{d}"),
        }
    }
}

impl From<Uri> for Value {
    fn from(u: Uri) -> Self {
        Self::Uri(u)
    }
}

impl From<BlankNode> for Value {
    fn from(b: BlankNode) -> Self {
        Self::BlankNode(b)
    }
}

impl From<StringLiteral> for Value {
    fn from(s: StringLiteral) -> Self {
        Self::StringLiteral(s)
    }
}

impl From<DatatypeLiteral> for Value {
    fn from(d: DatatypeLiteral) -> Self {
        Self::DatatypeLiteral(d)
    }
}

impl From<Resource> for Value {
    fn from(r: Resource) -> Self {
        match r {
            Resource::Uri(u) => Self::Uri(u),
            Resource::BlankNode(b) => Self::BlankNode(b),
        }
    }
}
