//! The resolution engine: one owner for the prefix registry and the
//! vocabulary cache, and the entry point for every editor request.
//!
//! All operations take `&mut self`. The caches are mutated in place without
//! internal locking, so a concurrent host must serialize access.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tracing::info;

use crate::completion::{self, Completion};
use crate::config::Settings;
use crate::diagnostics::{self, ParseDiagnostic};
use crate::fetch::{Fetch, HttpFetcher};
use crate::gotodef::{self, Definition};
use crate::graph::{PrefixMap, Syntax};
use crate::prefixes::PrefixRegistry;
use crate::vocab::VocabularyCache;

/// Name of the persisted prefix registry inside the cache directory.
pub const PREFIX_FILE: &str = "prefixes.ttl";

pub struct Engine {
    pub(crate) settings: Settings,
    pub(crate) vocab: VocabularyCache,
    pub(crate) prefixes: PrefixRegistry,
}

impl Engine {
    /// Build an engine that talks to the network over HTTP.
    pub fn new(settings: Settings) -> anyhow::Result<Engine> {
        let fetcher = HttpFetcher::new(Duration::from_secs(settings.fetch_timeout_secs))
            .context("Could not create HTTP client")?;
        Engine::with_fetcher(settings, Arc::new(fetcher))
    }

    pub fn with_fetcher(settings: Settings, fetcher: Arc<dyn Fetch>) -> anyhow::Result<Engine> {
        let cache_dir = settings
            .resolve_cache_dir()
            .context("Could not find or create a cache directory")?;
        info!("Using vocabulary cache in {}", cache_dir.display());

        let prefixes = PrefixRegistry::load(cache_dir.join(PREFIX_FILE), fetcher.clone())
            .with_lookup_template(settings.prefix_lookup_url.clone());
        let vocab = VocabularyCache::new(cache_dir, fetcher)
            .with_sources(settings.vocab_sources.clone());

        Ok(Engine {
            settings,
            vocab,
            prefixes,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn prefixes(&mut self) -> &mut PrefixRegistry {
        &mut self.prefixes
    }

    pub fn vocabularies(&mut self) -> &mut VocabularyCache {
        &mut self.vocab
    }

    pub fn completions<S: AsRef<str>>(
        &mut self,
        lines: &[S],
        line: usize,
        character: usize,
        syntax: Syntax,
    ) -> Vec<Completion> {
        completion::completions(self, lines, line, character, syntax)
    }

    pub fn definition<S: AsRef<str>>(
        &mut self,
        lines: &[S],
        line: usize,
        character: usize,
    ) -> Option<Definition> {
        gotodef::definition(self, lines, line, character)
    }

    pub fn check<S: AsRef<str>>(&self, lines: &[S], syntax: Syntax) -> Vec<ParseDiagnostic> {
        diagnostics::check(&self.vocab, lines, syntax)
    }

    /// The namespace `prefix` is bound to in the buffer.
    pub fn expand_prefix<S: AsRef<str>>(&self, lines: &[S], prefix: &str) -> Option<String> {
        self.local_prefixes(lines).remove(prefix)
    }

    /// The prefix the buffer binds to `namespace`.
    pub fn to_prefix<S: AsRef<str>>(&self, lines: &[S], namespace: &str) -> Option<String> {
        self.local_prefixes(lines)
            .into_iter()
            .find(|(_, ns)| ns == namespace)
            .map(|(prefix, _)| prefix)
    }

    pub fn local_prefixes<S: AsRef<str>>(&self, lines: &[S]) -> PrefixMap {
        completion::local_prefixes(lines, self.settings.max_line_scan)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::test_engine;

    const BUFFER: &[&str] = &[
        "@prefix dc: <http://purl.org/dc/terms/> .",
        "@prefix dcterms: <http://purl.org/dc/terms/> .",
    ];

    #[test]
    fn test_expand_and_to_prefix() {
        let (_temp_dir, engine, _) = test_engine(&[]);

        assert_eq!(
            engine.expand_prefix(BUFFER, "dcterms").as_deref(),
            Some("http://purl.org/dc/terms/")
        );
        assert_eq!(engine.expand_prefix(BUFFER, "foaf"), None);
        // first in prefix order
        assert_eq!(
            engine.to_prefix(BUFFER, "http://purl.org/dc/terms/").as_deref(),
            Some("dc")
        );
    }

    #[test]
    fn test_registry_is_persisted_in_cache_dir() {
        let (_temp_dir, mut engine, _) = test_engine(&[]);
        engine.prefixes().register("dc", "http://purl.org/dc/terms/");
        engine.prefixes().save().unwrap();

        let store = engine.prefixes().store().unwrap().to_path_buf();
        assert!(store.ends_with("prefixes.ttl"));
        assert!(std::fs::read_to_string(store).unwrap().contains("PREFIX dc:"));
    }
}
