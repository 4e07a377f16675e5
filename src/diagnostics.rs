use itertools::Itertools;
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};
use tracing::debug;

use crate::error::{ParseError, SyntaxErrorKind};
use crate::graph::{Parser, PrefixMap, Syntax, SymbolValidator};
use crate::vocab::VocabularyCache;

/// Rejects prefixed names whose prefix is undeclared, or whose local name is
/// missing from a vocabulary that has already been loaded. Vocabularies that
/// were never loaded are not fetched just to validate against them.
pub struct VocabularyValidator<'a> {
    vocab: &'a VocabularyCache,
}

impl<'a> VocabularyValidator<'a> {
    pub fn new(vocab: &'a VocabularyCache) -> Self {
        VocabularyValidator { vocab }
    }
}

impl SymbolValidator for VocabularyValidator<'_> {
    fn validate(&self, symbol: &str, prefixes: &PrefixMap) -> Result<(), SyntaxErrorKind> {
        let Some((prefix, local_name)) = symbol.split_once(':') else {
            return Ok(());
        };
        let Some(namespace) = prefixes.get(prefix) else {
            return Err(SyntaxErrorKind::UndeclaredPrefix(symbol.to_string()));
        };

        match self.vocab.known_local_names(namespace) {
            Some(known) if !known.is_empty() && !known.contains(local_name) => {
                Err(SyntaxErrorKind::UndefinedTerm {
                    term: symbol.to_string(),
                    namespace: namespace.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// A problem found in a buffer. Positions are zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseDiagnostic {
    pub fn to_lsp(&self) -> Diagnostic {
        let position = Position {
            line: self.line as u32,
            character: self.column as u32,
        };
        Diagnostic {
            range: Range {
                start: position,
                end: position,
            },
            severity: Some(DiagnosticSeverity::ERROR),
            source: Some("rdfls".into()),
            message: self.message.clone(),
            ..Default::default()
        }
    }
}

/// Relative IRIs in an editor buffer resolve against this.
const BUFFER_BASE: &str = "file:///";

/// Parse the whole buffer with vocabulary validation installed. The parsers
/// stop at the first error, so at most one diagnostic is produced. SPARQL
/// queries are not checked and JSON-LD is only checked for well-formed JSON.
pub fn check<S: AsRef<str>>(
    vocab: &VocabularyCache,
    lines: &[S],
    syntax: Syntax,
) -> Vec<ParseDiagnostic> {
    let text = lines.iter().map(|line| line.as_ref()).join("\n");
    let result = match syntax {
        Syntax::Sparql => return Vec::new(),
        Syntax::JsonLd => check_json(&text),
        _ => {
            let validator = VocabularyValidator::new(vocab);
            Parser::new(syntax)
                .with_base(BUFFER_BASE)
                .with_validator(&validator)
                .parse(&text)
                .map(|doc| debug!("Checked {} statements", doc.statement_count()))
        }
    };

    match result {
        Ok(()) => Vec::new(),
        Err(err) => vec![ParseDiagnostic {
            line: err.line.saturating_sub(1),
            column: err.column.saturating_sub(1),
            message: err.kind.to_string(),
        }],
    }
}

fn check_json(text: &str) -> Result<(), ParseError> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|_| ())
        .map_err(|err| ParseError::malformed(err.line(), err.column(), err.to_string()))
}
