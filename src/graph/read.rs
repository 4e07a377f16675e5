use oxigraph::io::{RdfFormat, RdfParseError, RdfParser};
use oxigraph::model as ox;

use super::{GraphDocument, Literal, Term, RDF_LANG_STRING, XSD_STRING};
use crate::error::ParseError;

/// Read `text` into a flattened document. Quads from every graph are merged.
pub(super) fn parse(
    text: &str,
    format: RdfFormat,
    base: Option<&str>,
) -> Result<GraphDocument, ParseError> {
    let mut parser = RdfParser::from_format(format);
    if let Some(base) = base {
        parser = parser
            .with_base_iri(base)
            .map_err(|e| ParseError::malformed(1, 1, format!("Invalid base IRI <{base}>: {e}")))?;
    }

    let mut doc = GraphDocument {
        base: base.map(str::to_string),
        ..GraphDocument::default()
    };
    let mut reader = parser.for_reader(text.as_bytes());
    for quad in reader.by_ref() {
        let quad = quad.map_err(|e| to_parse_error(text, e))?;
        let Some(subject) = subject_term(&quad.subject) else {
            continue;
        };
        let Some(object) = object_term(&quad.object) else {
            continue;
        };
        doc.add(subject, quad.predicate.as_str(), object);
    }
    doc.prefixes = reader
        .prefixes()
        .map(|(name, iri)| (name.to_string(), iri.to_string()))
        .collect();
    Ok(doc)
}

// Quoted triples have no place in a flattened vocabulary and are skipped.
#[allow(unreachable_patterns)]
fn subject_term(subject: &ox::Subject) -> Option<Term> {
    match subject {
        ox::Subject::NamedNode(node) => Some(Term::Iri(node.as_str().to_string())),
        ox::Subject::BlankNode(node) => Some(Term::Blank(node.as_str().to_string())),
        _ => None,
    }
}

#[allow(unreachable_patterns)]
fn object_term(object: &ox::Term) -> Option<Term> {
    match object {
        ox::Term::NamedNode(node) => Some(Term::Iri(node.as_str().to_string())),
        ox::Term::BlankNode(node) => Some(Term::Blank(node.as_str().to_string())),
        ox::Term::Literal(literal) => Some(Term::Literal(literal_value(literal))),
        _ => None,
    }
}

fn literal_value(literal: &ox::Literal) -> Literal {
    let datatype = literal.datatype().as_str();
    Literal {
        value: literal.value().to_string(),
        language: literal.language().map(str::to_string),
        datatype: (datatype != XSD_STRING && datatype != RDF_LANG_STRING)
            .then(|| datatype.to_string()),
    }
}

fn to_parse_error(text: &str, error: RdfParseError) -> ParseError {
    match error {
        RdfParseError::Syntax(error) => {
            let (line, column) = match error.location() {
                Some(range) => position_at(text, range.start.line, range.start.column),
                None => (1, 1),
            };
            ParseError::malformed(line, column, error.to_string())
        }
        RdfParseError::Io(error) => ParseError::malformed(1, 1, error.to_string()),
    }
}

/// Convert oxigraph's zero-based location into the 1-based position reported
/// to callers, clamped to the text.
fn position_at(text: &str, line: u64, column: u64) -> (usize, usize) {
    let line_count = text.split('\n').count();
    let line = usize::try_from(line).unwrap_or(usize::MAX).min(line_count - 1);
    let width = text
        .split('\n')
        .nth(line)
        .map(|l| l.trim_end_matches('\r').chars().count())
        .unwrap_or(0);
    let column = usize::try_from(column).unwrap_or(usize::MAX).min(width);
    (line + 1, column + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Parser, Syntax, RDFS_COMMENT, RDF_TYPE};

    const ONTOLOGY: &str = r##"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#"
         xmlns:owl="http://www.w3.org/2002/07/owl#"
         xml:base="http://example.org/ns">
  <owl:Class rdf:about="#Issue">
    <rdfs:comment xml:lang="en">A numbered issue.</rdfs:comment>
    <rdfs:isDefinedBy rdf:resource=""/>
  </owl:Class>
  <rdf:Description rdf:about="#volume">
    <rdf:type rdf:resource="http://www.w3.org/2002/07/owl#DatatypeProperty"/>
  </rdf:Description>
</rdf:RDF>
"##;

    #[test]
    fn test_turtle_nodes_in_order() {
        let doc = Parser::new(Syntax::Turtle)
            .parse(
                "@prefix ex: <http://example.org/> .\n\
                 ex:b a ex:Class .\n\
                 ex:a ex:p \"plain\", \"tagged\"@en, \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> .\n",
            )
            .unwrap();

        let ids: Vec<_> = doc.nodes.iter().filter_map(|n| n.iri()).collect();
        assert_eq!(ids, vec!["http://example.org/b", "http://example.org/a"]);
        assert_eq!(doc.prefixes.get("ex").map(String::as_str), Some("http://example.org/"));

        let values = doc.nodes[1].values("http://example.org/p");
        assert_eq!(values[0], Term::Literal(Literal::plain("plain")));
        assert_eq!(
            values[1],
            Term::Literal(Literal {
                value: "tagged".into(),
                language: Some("en".into()),
                datatype: None,
            })
        );
        assert_eq!(
            values[2],
            Term::Literal(Literal {
                value: "1".into(),
                language: None,
                datatype: Some("http://www.w3.org/2001/XMLSchema#integer".into()),
            })
        );
    }

    #[test]
    fn test_escaped_dot_in_local_name() {
        let doc = Parser::new(Syntax::Turtle)
            .parse("@prefix ex: <http://example.org/> .\nex:a ex:b ex:c\\. .\n")
            .unwrap();

        let values = doc.nodes[0].values("http://example.org/b");
        assert_eq!(values, &[Term::Iri("http://example.org/c.".into())]);
    }

    #[test]
    fn test_leading_byte_order_mark_is_skipped() {
        let doc = Parser::new(Syntax::Turtle)
            .parse("\u{feff}@prefix ex: <http://example.org/> .\nex:a a ex:Thing .\n")
            .unwrap();

        assert_eq!(doc.nodes[0].types, vec!["http://example.org/Thing".to_string()]);
    }

    #[test]
    fn test_trig_graphs_are_merged() {
        let doc = Parser::new(Syntax::TriG)
            .parse(
                "PREFIX ex: <http://example.org/>\n\
                 ex:g1 { ex:a a ex:C . }\n\
                 ex:g2 { ex:a ex:p ex:b . }\n",
            )
            .unwrap();

        assert_eq!(doc.nodes.len(), 1);
        assert_eq!(doc.statement_count(), 2);
    }

    #[test]
    fn test_relative_iris_use_base() {
        let doc = Parser::new(Syntax::Turtle)
            .with_base("http://example.org/ns")
            .parse("<#Thing> a <#Class> .")
            .unwrap();

        assert_eq!(doc.nodes[0].iri(), Some("http://example.org/ns#Thing"));
        assert_eq!(doc.base.as_deref(), Some("http://example.org/ns"));
    }

    #[test]
    fn test_rdf_xml_descriptions() {
        let doc = Parser::new(Syntax::RdfXml).parse(ONTOLOGY).unwrap();

        let issue = doc
            .node(&Term::Iri("http://example.org/ns#Issue".into()))
            .unwrap();
        assert_eq!(issue.types, vec!["http://www.w3.org/2002/07/owl#Class".to_string()]);
        assert_eq!(
            issue.values(RDFS_COMMENT),
            &[Term::Literal(Literal {
                value: "A numbered issue.".into(),
                language: Some("en".into()),
                datatype: None,
            })]
        );

        let volume = doc
            .node(&Term::Iri("http://example.org/ns#volume".into()))
            .unwrap();
        assert!(volume.values(RDF_TYPE).is_empty());
        assert_eq!(volume.types.len(), 1);
    }

    #[test]
    fn test_syntax_error_position_is_one_based() {
        let err = Parser::new(Syntax::Turtle)
            .parse("@prefix ex: <http://example.org/> .\nex:a ex:b \"open\n")
            .unwrap_err();

        assert!(err.line >= 2);
        assert!(err.column >= 1);
    }

    #[test]
    fn test_sparql_is_not_a_graph() {
        assert!(Parser::new(Syntax::Sparql).parse("SELECT * {}").is_err());
        assert!(Parser::new(Syntax::JsonLd).parse("{}").is_err());
    }

    #[test]
    fn test_position_at_clamps() {
        assert_eq!(position_at("ab\ncd", 0, 0), (1, 1));
        assert_eq!(position_at("ab\ncd", 1, 9), (2, 3));
        assert_eq!(position_at("ab", 7, 0), (1, 1));
    }
}
