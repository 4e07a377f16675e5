//! Normalization and Turtle output for graph documents.

use std::collections::BTreeSet;
use std::io;

use oxigraph::io::{RdfFormat, RdfSerializer};
use oxigraph::model as ox;

use super::{GraphDocument, Literal, Node, PrefixMap, Term, RDF_TYPE};

fn is_plain_local(local: &str) -> bool {
    !local.starts_with(['-', '.'])
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

/// Find the prefix that compacts `iri`, preferring the longest namespace.
fn best_prefix<'p>(iri: &str, prefixes: &'p PrefixMap) -> Option<(&'p str, usize)> {
    prefixes
        .iter()
        .filter(|(_, namespace)| !namespace.is_empty())
        .filter(|(_, namespace)| {
            iri.strip_prefix(namespace.as_str())
                .is_some_and(is_plain_local)
        })
        .max_by_key(|(prefix, namespace)| (namespace.len(), std::cmp::Reverse(prefix.len())))
        .map(|(prefix, namespace)| (prefix.as_str(), namespace.len()))
}

/// Render `iri` as `prefix:local` when a prefix applies, else as `<iri>`.
pub fn compact_iri(iri: &str, prefixes: &PrefixMap) -> String {
    match best_prefix(iri, prefixes) {
        Some((prefix, at)) => format!("{prefix}:{}", &iri[at..]),
        None => format!("<{iri}>"),
    }
}

fn document_iris(doc: &GraphDocument) -> impl Iterator<Item = &str> {
    doc.nodes.iter().flat_map(|node| {
        node.iri()
            .into_iter()
            .chain(node.types.iter().map(String::as_str))
            .chain(node.properties.iter().flat_map(|(predicate, values)| {
                std::iter::once(predicate.as_str()).chain(values.iter().filter_map(
                    |value| match value {
                        Term::Iri(iri) => Some(iri.as_str()),
                        Term::Literal(Literal {
                            datatype: Some(datatype),
                            ..
                        }) => Some(datatype.as_str()),
                        _ => None,
                    },
                ))
            }))
    })
}

/// Produce the canonical form stored in the on-disk cache: identified nodes
/// sorted by IRI ahead of blank nodes, and only those prefixes (from the
/// document's own declarations, then `known`) that are actually used.
pub fn normalize(doc: &GraphDocument, known: &PrefixMap) -> GraphDocument {
    let mut candidates = known.clone();
    // a document's own bindings win over the registry
    for (prefix, namespace) in &doc.prefixes {
        candidates.retain(|_, ns| *ns != *namespace);
        candidates.insert(prefix.clone(), namespace.clone());
    }

    let used: BTreeSet<&str> = document_iris(doc)
        .filter_map(|iri| best_prefix(iri, &candidates).map(|(prefix, _)| prefix))
        .collect();

    let mut nodes = doc.nodes.clone();
    nodes.sort_by(|a, b| {
        let key = |node: &Node| match &node.id {
            Term::Iri(iri) => (0, iri.clone()),
            other => (1, format!("{other:?}")),
        };
        key(a).cmp(&key(b))
    });

    let mut normalized = GraphDocument {
        prefixes: candidates
            .iter()
            .filter(|(prefix, _)| used.contains(prefix.as_str()))
            .map(|(prefix, namespace)| (prefix.clone(), namespace.clone()))
            .collect(),
        base: None,
        ..Default::default()
    };
    for node in nodes {
        for ty in &node.types {
            normalized.add(node.id.clone(), RDF_TYPE, Term::Iri(ty.clone()));
        }
        for (predicate, values) in &node.properties {
            for value in values {
                normalized.add(node.id.clone(), predicate, value.clone());
            }
        }
    }
    normalized
}

fn to_model(term: &Term) -> ox::Term {
    match term {
        Term::Iri(iri) => ox::NamedNode::new_unchecked(iri.as_str()).into(),
        Term::Blank(label) => ox::BlankNode::new_unchecked(label.as_str()).into(),
        Term::Literal(literal) => match (&literal.language, &literal.datatype) {
            (Some(language), _) => ox::Literal::new_language_tagged_literal_unchecked(
                literal.value.as_str(),
                language.as_str(),
            ),
            (None, Some(datatype)) => ox::Literal::new_typed_literal(
                literal.value.as_str(),
                ox::NamedNode::new_unchecked(datatype.as_str()),
            ),
            (None, None) => ox::Literal::new_simple_literal(literal.value.as_str()),
        }
        .into(),
    }
}

fn to_subject(term: &Term) -> Option<ox::Subject> {
    match term {
        Term::Iri(iri) => Some(ox::NamedNode::new_unchecked(iri.as_str()).into()),
        Term::Blank(label) => Some(ox::BlankNode::new_unchecked(label.as_str()).into()),
        Term::Literal(_) => None,
    }
}

/// Serialize `doc` as Turtle using its prefixes. Statements are written node by
/// node, so each subject starts a new line.
pub fn to_turtle(doc: &GraphDocument) -> io::Result<String> {
    let mut serializer = RdfSerializer::from_format(RdfFormat::Turtle);
    for (prefix, namespace) in &doc.prefixes {
        serializer = serializer
            .with_prefix(prefix.as_str(), namespace.as_str())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    }

    let rdf_type = ox::NamedNode::new_unchecked(RDF_TYPE);
    let mut writer = serializer.for_writer(Vec::new());
    for node in &doc.nodes {
        let Some(subject) = to_subject(&node.id) else {
            continue;
        };
        for ty in &node.types {
            writer.serialize_triple(&ox::Triple::new(
                subject.clone(),
                rdf_type.clone(),
                ox::NamedNode::new_unchecked(ty.as_str()),
            ))?;
        }
        for (predicate, values) in &node.properties {
            let predicate = ox::NamedNode::new_unchecked(predicate.as_str());
            for value in values {
                writer.serialize_triple(&ox::Triple::new(
                    subject.clone(),
                    predicate.clone(),
                    to_model(value),
                ))?;
            }
        }
    }
    let bytes = writer.finish()?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
