//! The prefix registry.
//!
//! Maps short prefixes to namespace IRIs and back. The table is loaded from a
//! persisted Turtle file at startup and grows lazily: a prefix that is not
//! known yet is looked up on a remote prefix service, and whatever that
//! service returns is merged in and written back to disk.
//!
//! A namespace can be bound to several prefixes (`schema` and `sdo` both name
//! `http://schema.org/`). The namespace to prefix direction keeps the first
//! prefix registered for a namespace, so compaction is stable.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::error::{ResolveError, Result};
use crate::fetch::Fetch;
use crate::graph::{Parser, PrefixMap, Syntax};

/// `{prefix}` is replaced by the prefix being resolved.
pub const DEFAULT_LOOKUP_TEMPLATE: &str = "https://prefix.cc/{prefix}.file.ttl";

pub struct PrefixRegistry {
    by_prefix: PrefixMap,
    by_namespace: HashMap<String, String>,
    store: Option<PathBuf>,
    lookup_template: String,
    /// Prefixes the remote service could not resolve in this session.
    unresolvable: HashSet<String>,
    fetcher: Arc<dyn Fetch>,
}

impl PrefixRegistry {
    /// A registry that is never persisted.
    pub fn in_memory(fetcher: Arc<dyn Fetch>) -> PrefixRegistry {
        PrefixRegistry {
            by_prefix: BTreeMap::new(),
            by_namespace: HashMap::new(),
            store: None,
            lookup_template: DEFAULT_LOOKUP_TEMPLATE.to_string(),
            unresolvable: HashSet::new(),
            fetcher,
        }
    }

    /// Load the registry persisted at `store`. A missing or unreadable file
    /// gives an empty registry that will be created on the first lookup.
    pub fn load(store: impl Into<PathBuf>, fetcher: Arc<dyn Fetch>) -> PrefixRegistry {
        let store = store.into();
        let mut registry = PrefixRegistry {
            store: Some(store.clone()),
            ..PrefixRegistry::in_memory(fetcher)
        };

        match fs::read_to_string(&store) {
            Ok(text) => match Parser::new(Syntax::Turtle).parse(&text) {
                Ok(doc) => {
                    for (prefix, namespace) in doc.prefixes {
                        registry.register(&prefix, &namespace);
                    }
                    debug!(
                        "Loaded {} prefixes from {}",
                        registry.by_prefix.len(),
                        store.display()
                    );
                }
                Err(err) => warn!("Ignoring malformed prefix file {}: {}", store.display(), err),
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("Could not read prefix file {}: {}", store.display(), err),
        }
        registry
    }

    pub fn with_lookup_template(mut self, template: impl Into<String>) -> Self {
        self.lookup_template = template.into();
        self
    }

    pub fn store(&self) -> Option<&Path> {
        self.store.as_deref()
    }

    /// Bind `prefix` to `namespace`, replacing any previous binding of the
    /// prefix and keeping both directions consistent.
    pub fn register(&mut self, prefix: &str, namespace: &str) {
        if let Some(previous) = self
            .by_prefix
            .insert(prefix.to_string(), namespace.to_string())
        {
            if previous != namespace && self.by_namespace.get(&previous).map(String::as_str) == Some(prefix) {
                self.by_namespace.remove(&previous);
                // fall back to another prefix still bound to the old namespace
                if let Some(other) = self
                    .by_prefix
                    .iter()
                    .find(|(_, ns)| **ns == previous)
                    .map(|(p, _)| p.clone())
                {
                    self.by_namespace.insert(previous, other);
                }
            }
        }
        self.by_namespace
            .entry(namespace.to_string())
            .or_insert_with(|| prefix.to_string());
        self.unresolvable.remove(prefix);
    }

    /// The namespace bound to `prefix`, asking the remote service on a miss.
    /// Resolution failures are logged and reported as `None`.
    pub fn lookup(&mut self, prefix: &str) -> Option<String> {
        if let Some(namespace) = self.by_prefix.get(prefix) {
            return Some(namespace.clone());
        }
        if prefix.is_empty() || self.unresolvable.contains(prefix) {
            return None;
        }

        if let Err(err) = self.fetch_prefix(prefix) {
            warn!("Prefix lookup for {}: failed: {}", prefix, err);
        }
        if let Err(err) = self.save() {
            warn!("Could not persist prefix registry: {}", err);
        }

        match self.by_prefix.get(prefix) {
            Some(namespace) => Some(namespace.clone()),
            None => {
                self.unresolvable.insert(prefix.to_string());
                None
            }
        }
    }

    /// The namespace bound to `prefix` without touching the network.
    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.by_prefix.get(prefix).map(String::as_str)
    }

    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        self.by_namespace.get(namespace).map(String::as_str)
    }

    /// Every `(prefix, namespace)` pair, sorted by prefix.
    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_prefix
            .iter()
            .map(|(prefix, namespace)| (prefix.as_str(), namespace.as_str()))
    }

    pub fn as_map(&self) -> &PrefixMap {
        &self.by_prefix
    }

    pub fn len(&self) -> usize {
        self.by_prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_prefix.is_empty()
    }

    /// `prefix:local` if the namespace of `iri` is registered, else `iri`.
    pub fn compact(&self, iri: &str) -> String {
        let (namespace, local) = crate::terms::split_iri(iri);
        match self.prefix_for(namespace) {
            Some(prefix) if !namespace.is_empty() => format!("{prefix}:{local}"),
            _ => iri.to_string(),
        }
    }

    /// Rewrite the persisted file, one declaration per line.
    pub fn save(&self) -> io::Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        if let Some(parent) = store.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = self
            .by_prefix
            .iter()
            .map(|(prefix, namespace)| format!("PREFIX {prefix}: <{namespace}>\n"))
            .join("");
        fs::write(store, text)
    }

    fn fetch_prefix(&mut self, prefix: &str) -> Result<()> {
        let url = self
            .lookup_template
            .replace("{prefix}", &urlencoding::encode(prefix));
        info!("Resolving prefix {}: from <{}>", prefix, url);

        let fetched = self.fetcher.fetch(&url)?;
        let doc = Parser::new(Syntax::Turtle)
            .parse(&fetched.body)
            .map_err(|error| ResolveError::Parse {
                source_url: url.clone(),
                error,
            })?;
        for (prefix, namespace) in &doc.prefixes {
            self.register(prefix, namespace);
        }
        Ok(())
    }
}
