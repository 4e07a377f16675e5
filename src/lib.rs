//! rdfls: a Language Server Protocol implementation for RDF vocabularies
//!
//! This crate provides the core functionality for the rdfls server: code
//! intelligence for Turtle, TriG, SPARQL, JSON-LD and RDF/XML documents that
//! understands the vocabularies their prefixes point to.
//!
//! # Overview
//!
//! - **Completion**: namespace declarations, vocabulary terms and keywords
//! - **Go to definition**: jump from `prefix:term` into the vocabulary document
//! - **Diagnostics**: syntax errors, undeclared prefixes and unknown terms
//!
//! # Architecture
//!
//! - [`terms`]: text utilities for the token under the cursor and IRI splitting
//! - [`prefixes`]: the persisted, lazily resolved prefix registry
//! - [`vocab`]: the per-namespace vocabulary cache and term extraction
//! - [`graph`]: RDF readers, the symbol validation hook and Turtle output
//! - [`completion`], [`gotodef`], [`diagnostics`]: the request handlers
//! - [`engine`]: owns the caches and answers requests
//! - [`server`]: the `tower-lsp` front end
//!
//! # Usage
//!
//! ```no_run
//! use rdfls::config::Settings;
//! use rdfls::engine::Engine;
//! use rdfls::graph::Syntax;
//!
//! let mut engine = Engine::new(Settings::default())?;
//! let buffer = ["@prefix bibo: <http://purl.org/ontology/bibo/> .", "<> a bibo:Art"];
//! for completion in engine.completions(&buffer, 1, 13, Syntax::Turtle) {
//!     println!("{} {:?}", completion.label, completion.detail);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

// Text and data model
pub mod error;
pub mod graph;
pub mod terms;

// Caches
pub mod fetch;
pub mod prefixes;
pub mod vocab;

// LSP feature modules
pub mod completion;
pub mod diagnostics;
pub mod gotodef;
pub mod keywords;

// Configuration and wiring
pub mod config;
pub mod engine;
pub mod server;

// Test utilities (only available in test builds)
#[cfg(test)]
pub mod test_utils;
