//! In-memory RDF graph documents and the parsers that produce them.
//!
//! Documents are read with oxigraph's RDF parsers and flattened into a
//! [`GraphDocument`]: one [`Node`] per subject, in order of first appearance,
//! with its declared types split out from the remaining properties. Named
//! graphs in TriG are merged into that single node list.
//!
//! # Extension point
//!
//! When a [`SymbolValidator`] is installed, Turtle and TriG text is also
//! scanned for prefixed names outside of prefix declarations. The validator
//! sees the prefixes declared so far and may reject a symbol, which fails the
//! parse with a positioned [`ParseError`]. Whichever of a rejected symbol and a
//! syntax error comes first in the text is reported. The language server
//! installs a validator that knows which vocabulary terms exist; plain loading
//! uses [`NoValidation`].
//!
//! ```
//! use rdfls::graph::{Parser, Syntax};
//!
//! let doc = Parser::new(Syntax::Turtle)
//!     .parse("@prefix ex: <http://example.org/> . ex:a a ex:Thing .")
//!     .unwrap();
//! assert_eq!(doc.nodes[0].types, vec!["http://example.org/Thing".to_string()]);
//! ```

mod read;
mod serialize;
mod symbols;

pub use serialize::{compact_iri, normalize, to_turtle};

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use oxigraph::io::RdfFormat;

use crate::error::{ParseError, SyntaxErrorKind};

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";
pub const RDFS_IS_DEFINED_BY: &str = "http://www.w3.org/2000/01/rdf-schema#isDefinedBy";

/// Prefix to namespace bindings in scope while reading a document.
/// The empty prefix is stored under `""`.
pub type PrefixMap = BTreeMap<String, String>;

/// The textual syntaxes understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syntax {
    Turtle,
    TriG,
    Sparql,
    JsonLd,
    RdfXml,
}

impl Syntax {
    /// Map an editor language identifier to a syntax.
    pub fn from_language_id(id: &str) -> Option<Syntax> {
        match id.to_ascii_lowercase().as_str() {
            "turtle" | "ttl" => Some(Syntax::Turtle),
            "trig" => Some(Syntax::TriG),
            "sparql" | "rq" => Some(Syntax::Sparql),
            "jsonld" | "json-ld" | "json" => Some(Syntax::JsonLd),
            "rdf" | "xml" | "rdfxml" | "rdf-xml" | "owl" => Some(Syntax::RdfXml),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Syntax> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Syntax::from_language_id)
    }

    /// Map an HTTP `Content-Type` value to a syntax, ignoring parameters.
    pub fn from_media_type(media_type: &str) -> Option<Syntax> {
        let essence = media_type.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "text/turtle" | "application/x-turtle" | "text/n3" | "application/n-triples" => {
                Some(Syntax::Turtle)
            }
            "application/trig" => Some(Syntax::TriG),
            "application/ld+json" | "application/json" => Some(Syntax::JsonLd),
            "application/rdf+xml" | "application/xml" | "text/xml" => Some(Syntax::RdfXml),
            _ => None,
        }
    }

    /// Sniff the syntax of a document from its first significant character.
    pub fn guess(text: &str) -> Syntax {
        let head = text.trim_start();
        if head.starts_with('{') || head.starts_with('[') {
            Syntax::JsonLd
        } else if head.starts_with("<?xml") || head.starts_with("<rdf:RDF") {
            Syntax::RdfXml
        } else {
            Syntax::TriG
        }
    }

    /// The oxigraph format for syntaxes that describe a graph. SPARQL is a
    /// query language and JSON-LD has no reader here.
    pub fn rdf_format(&self) -> Option<RdfFormat> {
        match self {
            Syntax::Turtle => Some(RdfFormat::Turtle),
            Syntax::TriG => Some(RdfFormat::TriG),
            Syntax::RdfXml => Some(RdfFormat::RdfXml),
            Syntax::Sparql | Syntax::JsonLd => None,
        }
    }

    pub fn language_id(&self) -> &'static str {
        match self {
            Syntax::Turtle => "turtle",
            Syntax::TriG => "trig",
            Syntax::Sparql => "sparql",
            Syntax::JsonLd => "jsonld",
            Syntax::RdfXml => "rdf",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub value: String,
    pub language: Option<String>,
    pub datatype: Option<String>,
}

impl Literal {
    pub fn plain(value: impl Into<String>) -> Self {
        Literal {
            value: value.into(),
            language: None,
            datatype: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal(Literal),
}

impl Term {
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }
}

/// All statements about one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: Term,
    pub types: Vec<String>,
    pub properties: Vec<(String, Vec<Term>)>,
}

impl Node {
    fn new(id: Term) -> Self {
        Node {
            id,
            types: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn iri(&self) -> Option<&str> {
        self.id.as_iri()
    }

    pub fn values(&self, predicate: &str) -> &[Term] {
        self.properties
            .iter()
            .find(|(p, _)| p == predicate)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }
}

/// A parsed, flattened RDF document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphDocument {
    pub prefixes: PrefixMap,
    pub base: Option<String>,
    pub nodes: Vec<Node>,
    index: HashMap<Term, usize>,
}

impl GraphDocument {
    /// Record one statement. `rdf:type` statements with an IRI object become
    /// node types; everything else is kept as a property value.
    pub fn add(&mut self, subject: Term, predicate: &str, object: Term) {
        let at = match self.index.get(&subject) {
            Some(at) => *at,
            None => {
                self.nodes.push(Node::new(subject.clone()));
                self.index.insert(subject, self.nodes.len() - 1);
                self.nodes.len() - 1
            }
        };
        let node = &mut self.nodes[at];

        if let (RDF_TYPE, Term::Iri(ty)) = (predicate, &object) {
            if !node.types.contains(ty) {
                node.types.push(ty.clone());
            }
            return;
        }

        match node.properties.iter_mut().find(|(p, _)| p == predicate) {
            Some((_, values)) => {
                if !values.contains(&object) {
                    values.push(object);
                }
            }
            None => node.properties.push((predicate.to_string(), vec![object])),
        }
    }

    pub fn node(&self, id: &Term) -> Option<&Node> {
        self.index.get(id).map(|at| &self.nodes[*at])
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn statement_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| {
                node.types.len()
                    + node
                        .properties
                        .iter()
                        .map(|(_, values)| values.len())
                        .sum::<usize>()
            })
            .sum()
    }
}

/// Hook invoked for each prefixed name resolved while parsing.
pub trait SymbolValidator {
    /// `symbol` is the name as written, e.g. `schema:name`; `prefixes` holds
    /// the declarations seen so far.
    fn validate(&self, symbol: &str, prefixes: &PrefixMap) -> Result<(), SyntaxErrorKind>;
}

/// Accepts every symbol.
pub struct NoValidation;

impl SymbolValidator for NoValidation {
    fn validate(&self, _symbol: &str, _prefixes: &PrefixMap) -> Result<(), SyntaxErrorKind> {
        Ok(())
    }
}

/// Configured entry point to the syntax readers.
pub struct Parser<'v> {
    syntax: Syntax,
    base: Option<String>,
    validator: Option<&'v dyn SymbolValidator>,
}

impl Parser<'static> {
    pub fn new(syntax: Syntax) -> Self {
        Parser {
            syntax,
            base: None,
            validator: None,
        }
    }
}

impl<'v> Parser<'v> {
    /// Base IRI used to resolve relative references.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_validator<'w>(self, validator: &'w dyn SymbolValidator) -> Parser<'w> {
        Parser {
            syntax: self.syntax,
            base: self.base,
            validator: Some(validator),
        }
    }

    pub fn parse(&self, text: &str) -> Result<GraphDocument, ParseError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let Some(format) = self.syntax.rdf_format() else {
            return Err(ParseError::malformed(
                1,
                1,
                format!("{} documents cannot be read as a graph", self.syntax.language_id()),
            ));
        };
        let parsed = read::parse(text, format, self.base.as_deref());

        let validator = match (self.validator, self.syntax) {
            (Some(validator), Syntax::Turtle | Syntax::TriG) => validator,
            _ => return parsed,
        };
        match (symbols::check(text, validator), parsed) {
            (Ok(()), parsed) => parsed,
            (Err(rejected), Err(malformed)) if malformed.position() < rejected.position() => {
                Err(malformed)
            }
            (Err(rejected), _) => Err(rejected),
        }
    }
}
