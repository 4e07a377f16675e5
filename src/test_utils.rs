//! Shared test utilities for rdfls.
//!
//! This module provides common helpers used across multiple test modules.
//! It is only compiled when running tests.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use crate::config::Settings;
use crate::engine::Engine;
use crate::error::{ResolveError, Result};
use crate::fetch::{Fetch, FetchedDocument};

/// A small slice of the Bibliographic Ontology.
pub const BIBO_TTL: &str = r#"@prefix bibo: <http://purl.org/ontology/bibo/> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix dcterms: <http://purl.org/dc/terms/> .

<http://purl.org/ontology/bibo/> a owl:Ontology ;
    dcterms:title "The Bibliographic Ontology" .

bibo:AcademicArticle a owl:Class ;
    rdfs:subClassOf bibo:Article ;
    rdfs:isDefinedBy <http://purl.org/ontology/bibo/> ;
    rdfs:comment "A scholarly academic article, typically published in a journal."@en .

bibo:Article a owl:Class ;
    rdfs:isDefinedBy <http://purl.org/ontology/bibo/> ;
    rdfs:comment "A written composition in prose."@en .

bibo:Book a owl:Class ;
    rdfs:isDefinedBy <http://purl.org/ontology/bibo/> ;
    rdfs:comment "A written or printed work of fiction or nonfiction."@en .

bibo:authorList a owl:ObjectProperty ;
    rdfs:isDefinedBy <http://purl.org/ontology/bibo/> ;
    rdfs:comment "An ordered list of authors." .
"#;

/// Creates a temporary cache directory for testing.
///
/// Returns a tuple of (TempDir, PathBuf) where:
/// - TempDir: The temp directory handle (must be kept alive for the test duration)
/// - PathBuf: The path to the cache subdirectory
pub fn create_test_cache_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let cache_dir = temp_dir.path().join("rdf-graph-cache");
    fs::create_dir(&cache_dir).expect("Failed to create cache subdirectory");
    (temp_dir, cache_dir)
}

/// A [`Fetch`] that serves canned documents and records every request.
/// Unknown URLs fail like a 404.
#[derive(Default)]
pub struct RecordingFetcher {
    documents: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl RecordingFetcher {
    pub fn new() -> Arc<RecordingFetcher> {
        Arc::new(RecordingFetcher::default())
    }

    pub fn with_document(self: Arc<Self>, url: &str, body: &str) -> Arc<Self> {
        self.documents
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetch for RecordingFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.documents.lock().unwrap().get(url) {
            Some(body) => Ok(FetchedDocument {
                url: url.to_string(),
                body: body.clone(),
                syntax: None,
            }),
            None => Err(ResolveError::Http {
                url: url.to_string(),
                message: "404 Not Found".to_string(),
            }),
        }
    }
}

/// Builds an engine over a fresh cache directory whose network serves
/// `documents` as `(url, body)` pairs.
///
/// # Example
///
/// ```ignore
/// let (_temp_dir, mut engine, fetcher) = test_engine(&[("http://purl.org/ontology/bibo/", BIBO_TTL)]);
/// ```
pub fn test_engine(documents: &[(&str, &str)]) -> (TempDir, Engine, Arc<RecordingFetcher>) {
    let (temp_dir, cache_dir) = create_test_cache_dir();
    let fetcher = documents
        .iter()
        .fold(RecordingFetcher::new(), |fetcher, (url, body)| {
            fetcher.with_document(url, body)
        });
    let settings = Settings {
        cache_dir: Some(cache_dir.to_string_lossy().into_owned()),
        ..Settings::default()
    };
    let engine = Engine::with_fetcher(settings, fetcher.clone()).expect("Failed to build engine");
    (temp_dir, engine, fetcher)
}
