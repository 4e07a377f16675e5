//! Completion at a cursor position.
//!
//! Every request is classified on its own, from the line under the cursor:
//!
//! - **Namespace declaration**: the text before the first `:` on the line is a
//!   prefix declaration keyword (`@prefix`, `prefix`, `PREFIX`) or an `xmlns`
//!   attribute. Offers the namespace for a completed prefix, or registered
//!   prefix declarations.
//! - **Term**: anything else. Offers the terms of the vocabulary the typed
//!   prefix points to, or a mix of declared prefixes, vocabulary terms and
//!   syntax keywords.

use once_cell::sync::Lazy;
use regex::Regex;
use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind, Documentation};
use tracing::warn;

use crate::engine::Engine;
use crate::graph::{PrefixMap, Syntax};
use crate::keywords::keywords;
use crate::terms::get_term_at;

/// One prefix declaration in Turtle, SPARQL, JSON-LD or RDF/XML form.
static MATCH_NS_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:@prefix\s+|xmlns:?|vocab|prefix\s+|PREFIX\s+|")(?:@vocab|(\w*))"?[:=]\s*[<"'](.+?)[>"']"#,
    )
    .unwrap()
});

/// The `(prefix, namespace)` pairs declared on `line`. `@vocab` and default
/// namespaces yield the empty prefix.
pub fn declarations(line: &str) -> impl Iterator<Item = (String, String)> + '_ {
    MATCH_NS_DECL.captures_iter(line).map(|caps| {
        (
            caps.get(1).map_or("", |m| m.as_str()).to_string(),
            caps[2].to_string(),
        )
    })
}

/// Prefixes declared in the first `max_lines` lines of a buffer. A later
/// declaration of the same prefix replaces an earlier one.
pub fn local_prefixes<S: AsRef<str>>(lines: &[S], max_lines: usize) -> PrefixMap {
    lines
        .iter()
        .take(max_lines)
        .flat_map(|line| declarations(line.as_ref()).collect::<Vec<_>>())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Completion {
    pub label: String,
    pub detail: Option<String>,
    pub documentation: Option<String>,
}

impl Completion {
    fn plain(label: impl Into<String>) -> Self {
        Completion {
            label: label.into(),
            detail: None,
            documentation: None,
        }
    }

    pub fn to_lsp(&self) -> CompletionItem {
        CompletionItem {
            label: self.label.clone(),
            kind: Some(if self.detail.is_some() {
                CompletionItemKind::REFERENCE
            } else {
                CompletionItemKind::KEYWORD
            }),
            detail: self.detail.clone(),
            documentation: self.documentation.clone().map(Documentation::String),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclarationForm {
    /// `prefix: <namespace>`
    Turtle,
    /// `prefix="namespace"`
    XmlAttribute,
}

impl DeclarationForm {
    fn detect(line: &str) -> Option<DeclarationForm> {
        let head = line.split(':').next().unwrap_or("").trim();
        if head.starts_with("@prefix") || head.starts_with("prefix") || head.starts_with("PREFIX") {
            Some(DeclarationForm::Turtle)
        } else if head == "xmlns" || head.ends_with(" xmlns") {
            Some(DeclarationForm::XmlAttribute)
        } else {
            None
        }
    }

    /// What to insert after a completed prefix.
    fn namespace_value(self, namespace: &str) -> String {
        match self {
            DeclarationForm::Turtle => format!(" <{namespace}>"),
            DeclarationForm::XmlAttribute => format!("=\"{namespace}\""),
        }
    }

    fn declaration(self, prefix: &str, namespace: &str) -> String {
        match self {
            DeclarationForm::Turtle => format!("{prefix}: <{namespace}>"),
            DeclarationForm::XmlAttribute => format!("{prefix}=\"{namespace}\""),
        }
    }
}

/// Completions for the cursor at `character` (the position after the last
/// typed character) on line `line` of `lines`.
pub fn completions<S: AsRef<str>>(
    engine: &mut Engine,
    lines: &[S],
    line: usize,
    character: usize,
    syntax: Syntax,
) -> Vec<Completion> {
    let Some(text) = lines.get(line).map(|text| text.as_ref()) else {
        return Vec::new();
    };
    let term = character
        .checked_sub(1)
        .and_then(|at| get_term_at(text, at))
        .unwrap_or_default();

    let mut results = match DeclarationForm::detect(text) {
        Some(form) => declaration_completions(engine, form, &term),
        None => term_completions(engine, lines, &term, syntax),
    };
    if let Some(max) = engine.settings.max_completions {
        results.truncate(max);
    }
    results
}

fn declaration_completions(engine: &mut Engine, form: DeclarationForm, term: &str) -> Vec<Completion> {
    let term = match form {
        DeclarationForm::XmlAttribute => term
            .strip_prefix("xmlns:")
            .or_else(|| term.strip_prefix("xmlns"))
            .unwrap_or(term),
        DeclarationForm::Turtle => term,
    };

    if let Some(prefix) = term.strip_suffix(':') {
        return engine
            .prefixes
            .lookup(prefix)
            .map(|namespace| Completion::plain(form.namespace_value(&namespace)))
            .into_iter()
            .collect();
    }

    let typed = term.rsplit(':').next().unwrap_or(term);
    engine
        .prefixes
        .namespaces()
        .filter(|(prefix, _)| prefix.starts_with(typed))
        .map(|(prefix, namespace)| Completion::plain(form.declaration(prefix, namespace)))
        .collect()
}

fn term_completions<S: AsRef<str>>(
    engine: &mut Engine,
    lines: &[S],
    term: &str,
    syntax: Syntax,
) -> Vec<Completion> {
    let local_map = local_prefixes(lines, engine.settings.max_line_scan);
    let (prefix, typed) = match term.split_once(':') {
        Some((prefix, local)) => (prefix, Some(local)),
        None => (term, None),
    };

    let terms = match local_map.get(prefix) {
        Some(namespace) => match engine.vocab.terms(namespace, &engine.prefixes) {
            Ok(terms) => Some(terms),
            Err(err) => {
                warn!("No terms for <{}>: {}", namespace, err);
                None
            }
        },
        None => None,
    };

    if let (Some(terms), Some(local)) = (&terms, typed) {
        if !terms.is_empty() {
            return terms
                .values()
                .filter(|t| t.local_name.starts_with(local))
                .map(|t| Completion {
                    label: t.local_name.clone(),
                    detail: t.resource_type.clone(),
                    documentation: t.comment.clone(),
                })
                .collect();
        }
    }

    let typed = typed.unwrap_or(term);
    local_map
        .keys()
        .map(|prefix| format!("{prefix}:"))
        .chain(terms.iter().flat_map(|terms| terms.keys().cloned()))
        .chain(keywords(syntax).iter().map(|kw| kw.to_string()))
        .filter(|candidate| candidate.starts_with(typed))
        .map(Completion::plain)
        .collect()
}
