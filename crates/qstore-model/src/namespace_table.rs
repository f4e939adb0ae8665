//! The closed, compile-time table of well-known namespace prefixes used to
//! compress URIs before they are persisted, and decompress them on the way
//! out. Order matters: encoding/decoding both use first-hit match against
//! this table, so iteration must be deterministic — a `HashMap` would not do.

/// `(prefix, uri)` pairs, in match-priority order.
const WELL_KNOWN_NAMESPACES: &[(&str, &str)] = &[
    ("skos:", "http://www.w3.org/2004/02/skos/core#"),
    ("rdf:", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs:", "http://www.w3.org/2000/01/rdf-schema#"),
    ("owl:", "http://www.w3.org/2002/07/owl#"),
    ("xmls:", "http://www.w3.org/2001/XMLSchema#"),
    ("foaf:", "http://xmlns.com/foaf/0.1/"),
    ("dcterms:", "http://purl.org/dc/terms/"),
    ("dcelems:", "http://purl.org/dc/elements/1.1/"),
    ("dctypes:", "http://purl.org/dc/dcmitype/"),
    ("dbpedia:", "http://dbpedia.org/resource/"),
];

/// Replaces a URI's well-known namespace prefix with its short form, e.g.
/// `http://www.w3.org/1999/02/22-rdf-syntax-ns#type` becomes `rdf:type`.
///
/// Returns the input unchanged if no entry in the table matches.
pub fn encode(uri: &str) -> String {
    for (prefix, namespace_uri) in WELL_KNOWN_NAMESPACES {
        if let Some(suffix) = uri.strip_prefix(namespace_uri) {
            return format!("{prefix}{suffix}");
        }
    }
    uri.to_owned()
}

/// Reverses [`encode`]: expands a short-form token back to its full URI.
///
/// Returns the input unchanged if no entry in the table matches.
pub fn decode(token: &str) -> String {
    for (prefix, namespace_uri) in WELL_KNOWN_NAMESPACES {
        if let Some(suffix) = token.strip_prefix(prefix) {
            return format!("{namespace_uri}{suffix}");
        }
    }
    token.to_owned()
}
