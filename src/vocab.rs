//! The vocabulary cache.
//!
//! For each namespace the cache loads the document that defines it, extracts
//! the terms it declares and memoizes the result. Where a namespace is loaded
//! from depends on its effective source:
//!
//! | Source                   | Loaded from                                   | Reloaded                    |
//! |--------------------------|-----------------------------------------------|-----------------------------|
//! | local file               | the file itself                               | when its mtime advances     |
//! | remote, cached on disk   | `<cache_dir>/<percent-encoded source>.ttl`    | never                       |
//! | remote, not cached yet   | the network, then written to the cache file   | never                       |
//!
//! Entries are never evicted. The working set is the handful of vocabularies
//! touched during one editor session.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info};

use crate::error::{ResolveError, Result};
use crate::fetch::Fetch;
use crate::graph::{
    compact_iri, normalize, to_turtle, GraphDocument, Parser, Syntax, Term, RDFS_COMMENT,
    RDFS_IS_DEFINED_BY,
};
use crate::prefixes::PrefixRegistry;
use crate::terms::split_iri;

/// Machine-readable dumps fetched instead of the namespace IRI itself.
pub const DEFAULT_VOCAB_SOURCES: &[(&str, &str)] = &[
    (
        "https://schema.org/",
        "https://schema.org/version/latest/schemaorg-current-https.ttl",
    ),
    (
        "http://schema.org/",
        "https://schema.org/version/latest/schemaorg-current-http.ttl",
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyTerm {
    pub local_name: String,
    /// First declared type, compacted for display.
    pub resource_type: Option<String>,
    pub comment: Option<String>,
}

/// Terms of one namespace keyed by local name.
pub type TermMap = BTreeMap<String, VocabularyTerm>;

#[derive(Debug, Default)]
struct CacheEntry {
    source_modified_at: Option<SystemTime>,
    terms: Option<Arc<TermMap>>,
    known_local_names: Option<HashSet<String>>,
}

pub struct VocabularyCache {
    cache_dir: PathBuf,
    sources: HashMap<String, String>,
    entries: HashMap<String, CacheEntry>,
    fetcher: Arc<dyn Fetch>,
    loads: usize,
}

impl VocabularyCache {
    pub fn new(cache_dir: impl Into<PathBuf>, fetcher: Arc<dyn Fetch>) -> VocabularyCache {
        VocabularyCache {
            cache_dir: cache_dir.into(),
            sources: DEFAULT_VOCAB_SOURCES
                .iter()
                .map(|(namespace, source)| (namespace.to_string(), source.to_string()))
                .collect(),
            entries: HashMap::new(),
            fetcher,
            loads: 0,
        }
    }

    /// Add or replace source overrides.
    pub fn with_sources<I, K, V>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.sources
            .extend(sources.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Where the definition of `namespace` is read from.
    pub fn source_for<'a>(&'a self, namespace: &'a str) -> &'a str {
        self.sources
            .get(namespace)
            .map(String::as_str)
            .unwrap_or(namespace)
    }

    /// The on-disk copy of a remote source.
    pub fn cache_path(&self, source: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.ttl", urlencoding::encode(source)))
    }

    /// The file a definition lookup for `namespace` should scan: the source
    /// itself when it is local, else its on-disk copy.
    pub fn document_path(&self, namespace: &str) -> PathBuf {
        let source = self.source_for(namespace);
        local_file(source).unwrap_or_else(|| self.cache_path(source))
    }

    /// Number of times a vocabulary document has been read and extracted.
    pub fn load_count(&self) -> usize {
        self.loads
    }

    /// Local names recorded the first time `namespace` was extracted.
    pub fn known_local_names(&self, namespace: &str) -> Option<&HashSet<String>> {
        self.entries
            .get(namespace)
            .and_then(|entry| entry.known_local_names.as_ref())
    }

    /// The terms defined in `namespace`, loading its vocabulary if needed.
    pub fn terms(&mut self, namespace: &str, prefixes: &PrefixRegistry) -> Result<Arc<TermMap>> {
        let source = self.source_for(namespace).to_string();

        let (doc, modified) = match local_file(&source) {
            Some(path) => {
                let modified = fs::metadata(&path)?.modified()?;
                if let Some(entry) = self.entries.get(namespace) {
                    if let (Some(terms), Some(seen)) = (&entry.terms, entry.source_modified_at) {
                        if modified <= seen {
                            return Ok(terms.clone());
                        }
                    }
                }
                debug!("Parse file: {}", path.display());
                (read_file(&path)?, Some(modified))
            }
            None => {
                if let Some(terms) = self.entries.get(namespace).and_then(|e| e.terms.clone()) {
                    return Ok(terms);
                }
                (self.load_remote(&source, prefixes)?, None)
            }
        };

        self.loads += 1;
        let terms = Arc::new(extract_terms(&doc, namespace, prefixes));
        let entry = self.entries.entry(namespace.to_string()).or_default();
        entry.source_modified_at = modified;
        entry.terms = Some(terms.clone());
        if entry.known_local_names.is_none() {
            entry.known_local_names = Some(terms.keys().cloned().collect());
        }
        info!("Loaded {} terms for <{}>", terms.len(), namespace);
        Ok(terms)
    }

    fn load_remote(&self, source: &str, prefixes: &PrefixRegistry) -> Result<GraphDocument> {
        let cache_path = self.cache_path(source);
        let cached = fs::metadata(&cache_path).is_ok_and(|meta| meta.len() > 0);

        if cached {
            debug!("Load local copy of <{}> from {}", source, cache_path.display());
            let text = fs::read_to_string(&cache_path)?;
            return parse_document(&text, Syntax::Turtle, None, &cache_path.to_string_lossy());
        }

        debug!("Fetching <{}> to {}", source, cache_path.display());
        let fetched = self.fetcher.fetch(source)?;
        let doc = parse_document(&fetched.body, fetched.syntax(), Some(&fetched.url), source)?;
        let normalized = normalize(&doc, prefixes.as_map());

        fs::create_dir_all(&self.cache_dir)?;
        fs::write(&cache_path, to_turtle(&normalized)?)?;
        Ok(normalized)
    }
}

/// A source that names an existing local file, as a path or `file:` URL.
fn local_file(source: &str) -> Option<PathBuf> {
    let path = match source.strip_prefix("file://") {
        Some(path) => PathBuf::from(urlencoding::decode(path).ok()?.into_owned()),
        None => PathBuf::from(source),
    };
    path.is_file().then_some(path)
}

fn read_file(path: &Path) -> Result<GraphDocument> {
    let text = fs::read_to_string(path)?;
    let syntax = Syntax::from_path(path).unwrap_or_else(|| Syntax::guess(&text));
    parse_document(&text, syntax, None, &path.to_string_lossy())
}

fn parse_document(
    text: &str,
    syntax: Syntax,
    base: Option<&str>,
    source_url: &str,
) -> Result<GraphDocument> {
    if syntax.rdf_format().is_none() {
        return Err(ResolveError::Unsupported(source_url.to_string()));
    }
    let parser = match base {
        Some(base) => Parser::new(syntax).with_base(base),
        None => Parser::new(syntax),
    };
    parser.parse(text).map_err(|error| ResolveError::Parse {
        source_url: source_url.to_string(),
        error,
    })
}

/// Collect the nodes of `doc` that are terms of `namespace`: identified,
/// typed and carrying `rdfs:isDefinedBy`. A repeated identifier replaces the
/// earlier entry.
pub fn extract_terms(doc: &GraphDocument, namespace: &str, prefixes: &PrefixRegistry) -> TermMap {
    let mut terms = TermMap::new();
    for node in &doc.nodes {
        let Some(iri) = node.iri() else {
            continue;
        };
        if node.types.is_empty() || node.values(RDFS_IS_DEFINED_BY).is_empty() {
            continue;
        }
        let (term_namespace, local_name) = split_iri(iri);
        if term_namespace != namespace || local_name.is_empty() {
            continue;
        }

        let resource_type = node.types.first().map(|ty| display_iri(ty, doc, prefixes));
        terms.insert(
            local_name.to_string(),
            VocabularyTerm {
                local_name: local_name.to_string(),
                resource_type,
                comment: first_comment(node.values(RDFS_COMMENT)),
            },
        );
    }
    terms
}

/// Registry prefixes first, then the document's own declarations.
fn display_iri(iri: &str, doc: &GraphDocument, prefixes: &PrefixRegistry) -> String {
    let compacted = prefixes.compact(iri);
    if compacted != iri {
        return compacted;
    }
    let local = compact_iri(iri, &doc.prefixes);
    if local.starts_with('<') {
        iri.to_string()
    } else {
        local
    }
}

/// The first plain string comment, else the first language-tagged one.
fn first_comment(values: &[Term]) -> Option<String> {
    let literals = || {
        values.iter().filter_map(|value| match value {
            Term::Literal(literal) => Some(literal),
            _ => None,
        })
    };
    literals()
        .find(|literal| literal.language.is_none())
        .or_else(|| literals().find(|literal| literal.language.is_some()))
        .map(|literal| literal.value.clone())
}
