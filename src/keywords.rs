//! Static keyword lists offered as completions for each syntax.

use once_cell::sync::Lazy;

use crate::graph::Syntax;

const TURTLE: &[&str] = &["a", "prefix", "base", "PREFIX", "BASE"];

const TRIG_EXTRA: &[&str] = &["graph", "GRAPH"];

const SPARQL_11: &[&str] = &[
    "BASE", "PREFIX", "SELECT", "DISTINCT", "REDUCED", "AS", "CONSTRUCT", "WHERE", "DESCRIBE",
    "ASK", "FROM", "NAMED", "GROUP", "BY", "HAVING", "ORDER", "ASC", "DESC", "LIMIT", "OFFSET",
    "VALUES", "LOAD", "SILENT", "INTO", "CLEAR", "DROP", "CREATE", "ADD", "TO", "MOVE", "COPY",
    "WITH", "DELETE", "INSERT", "USING", "DEFAULT", "GRAPH", "ALL", "OPTIONAL", "SERVICE", "BIND",
    "UNDEF", "MINUS", "UNION", "FILTER", "a", "IN", "NOT", "EXISTS", "SEPARATOR", "true", "false",
];

const SPARQL_11_FUNCTIONS: &[&str] = &[
    "STR", "LANG", "LANGMATCHES", "DATATYPE", "BOUND", "IRI", "URI", "BNODE", "RAND", "ABS",
    "CEIL", "FLOOR", "ROUND", "CONCAT", "STRLEN", "UCASE", "LCASE", "ENCODE_FOR_URI", "CONTAINS",
    "STRSTARTS", "STRENDS", "STRBEFORE", "STRAFTER", "YEAR", "MONTH", "DAY", "HOURS", "MINUTES",
    "SECONDS", "TIMEZONE", "TZ", "NOW", "UUID", "STRUUID", "MD5", "SHA1", "SHA256", "SHA384",
    "SHA512", "COALESCE", "IF", "STRLANG", "STRDT", "sameTerm", "isIRI", "isURI", "isBLANK",
    "isLITERAL", "isNUMERIC", "REGEX", "SUBSTR", "REPLACE", "COUNT", "SUM", "MIN", "MAX", "AVG",
    "SAMPLE", "GROUP_CONCAT", "GROUP BY", "ORDER BY", "NOT IN", "NOT EXISTS",
];

const SPARQL_12_FUNCTIONS: &[&str] = &[
    "hasLANG", "hasLANGDIR", "STRLANGDIR", "isTRIPLE", "TRIPLE", "SUBJECT", "PREDICATE", "OBJECT",
];

const JSONLD: &[&str] = &[
    "@context", "@vocab", "@base", "@id", "@type", "@language", "@container", "@list", "@set",
    "@index", "@graph", "@value",
];

const RDFXML: &[&str] = &[
    "rdf:Description", "rdf:RDF", "rdf:about", "rdf:ID", "rdf:nodeID", "rdf:resource",
    "rdf:datatype", "rdf:parseType", "xmlns", "xml:lang", "xml:base",
];

static TRIG: Lazy<Vec<&'static str>> =
    Lazy::new(|| TURTLE.iter().chain(TRIG_EXTRA).copied().collect());

fn sparql_base() -> impl Iterator<Item = &'static str> {
    SPARQL_11
        .iter()
        .chain(SPARQL_11_FUNCTIONS)
        .chain(SPARQL_12_FUNCTIONS)
        .copied()
}

/// SPARQL keywords are case-insensitive, so all-uppercase ones are offered in
/// lowercase too.
static SPARQL_LOWERCASE: Lazy<Vec<String>> = Lazy::new(|| {
    sparql_base()
        .filter(|kw| !kw.chars().any(char::is_lowercase))
        .map(str::to_lowercase)
        .collect()
});

static SPARQL: Lazy<Vec<&'static str>> = Lazy::new(|| {
    sparql_base()
        .chain(SPARQL_LOWERCASE.iter().map(String::as_str))
        .collect()
});

pub fn keywords(syntax: Syntax) -> &'static [&'static str] {
    match syntax {
        Syntax::Turtle => TURTLE,
        Syntax::TriG => TRIG.as_slice(),
        Syntax::Sparql => SPARQL.as_slice(),
        Syntax::JsonLd => JSONLD,
        Syntax::RdfXml => RDFXML,
    }
}
