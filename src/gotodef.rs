use std::borrow::Cow;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use ropey::Rope;
use tower_lsp::lsp_types::{LocationLink, Position, Range, Url};
use tracing::{debug, warn};

use crate::completion::declarations;
use crate::engine::Engine;
use crate::terms::{get_term_at, is_term_char};

/// Where a vocabulary term is defined: a line in a cached or local
/// vocabulary document. Positions are zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub source: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl Definition {
    /// Editors differ in what they accept; a single link works in most.
    pub fn to_lsp(&self) -> Option<Vec<LocationLink>> {
        let position = Position {
            line: self.line as u32,
            character: self.column as u32,
        };
        let range = Range {
            start: position,
            end: position,
        };
        Some(vec![LocationLink {
            origin_selection_range: None,
            target_uri: Url::from_file_path(&self.source).ok()?,
            target_range: range,
            target_selection_range: range,
        }])
    }
}

pub fn definition<S: AsRef<str>>(
    engine: &mut Engine,
    lines: &[S],
    line: usize,
    character: usize,
) -> Option<Definition> {
    let term = get_term_at(lines.get(line)?.as_ref(), character)?;
    let (prefix, local_name) = term.split_once(':')?;
    let namespace = engine.local_prefixes(lines).remove(prefix)?;

    let source = engine.vocab.document_path(&namespace);
    if !source.is_file() {
        // first visit: loading the vocabulary writes the cached copy
        if let Err(err) = engine.vocab.terms(&namespace, &engine.prefixes) {
            warn!("No definition source for <{}>: {}", namespace, err);
            return None;
        }
    }

    let document = match File::open(&source).and_then(|file| Rope::from_reader(BufReader::new(file))) {
        Ok(document) => document,
        Err(err) => {
            warn!("Could not read {}: {}", source.display(), err);
            return None;
        }
    };
    let (line, column) =
        find_term_definition(&document, &namespace, local_name, engine.settings.max_line_scan);
    debug!("{} is defined at {}:{}", term, source.display(), line + 1);

    Some(Definition {
        source,
        line,
        column,
    })
}

/// Find the line that starts the description of `namespace` + `local_name` in
/// a vocabulary document. Prefixes are read from the first `max_line_scan`
/// lines; the first prefix declared for a namespace is the one used. Falls
/// back to the top of the document.
pub fn find_term_definition(
    document: &Rope,
    namespace: &str,
    local_name: &str,
    max_line_scan: usize,
) -> (usize, usize) {
    let expanded = format!("<{namespace}{local_name}>");
    let mut declared: Vec<(String, String)> = Vec::new();

    for (at_line, line) in document.lines().enumerate() {
        let line: Cow<str> = line.into();
        if at_line < max_line_scan {
            for (prefix, ns) in declarations(&line) {
                if !declared.iter().any(|(_, seen)| *seen == ns) {
                    declared.push((prefix, ns));
                }
            }
        }

        let rendered = match declared.iter().find(|(_, ns)| ns == namespace) {
            Some((prefix, _)) => Cow::Owned(format!("{prefix}:{local_name}")),
            None => Cow::Borrowed(expanded.as_str()),
        };
        let defines = line
            .strip_prefix(&*rendered)
            .is_some_and(|rest| !rest.starts_with(is_term_char));
        if defines {
            return (at_line, 0);
        }
    }
    (0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_engine, BIBO_TTL};

    /// Test: the definition of a prefixed term points into the cached copy
    #[test]
    fn test_definition_in_cached_vocabulary() {
        let (_temp_dir, mut engine, _) =
            test_engine(&[("http://purl.org/ontology/bibo/", BIBO_TTL)]);
        let lines = [
            "@prefix bibo: <http://purl.org/ontology/bibo/> .",
            "<> a bibo:Book .",
        ];

        let found = engine.definition(&lines, 1, 8).unwrap();
        assert_eq!(
            found.source,
            engine.vocab.cache_path("http://purl.org/ontology/bibo/")
        );
        let cached = std::fs::read_to_string(&found.source).unwrap();
        assert!(cached
            .lines()
            .nth(found.line)
            .unwrap()
            .starts_with("bibo:Book "));
        assert_eq!(found.column, 0);
    }

    #[test]
    fn test_no_definition_without_declared_prefix() {
        let (_temp_dir, mut engine, fetcher) = test_engine(&[]);
        let lines = ["<> a bibo:Book ."];

        assert_eq!(engine.definition(&lines, 0, 8), None);
        assert_eq!(engine.definition(&lines, 0, 2), None);
        assert!(fetcher.calls().is_empty());
    }

    #[test]
    fn test_find_term_definition_rules() {
        let document = Rope::from_str(
            "@prefix ex: <http://example.org/ns#> .\n\
             @prefix alias: <http://example.org/ns#> .\n\
             \n\
             ex:ThingLike a ex:Class .\n\
             ex:Thing a ex:Class .\n\
             <http://example.org/other/Thing> a ex:Class .\n",
        );

        assert_eq!(
            find_term_definition(&document, "http://example.org/ns#", "Thing", 80),
            (4, 0)
        );
        assert_eq!(
            find_term_definition(&document, "http://example.org/other/", "Thing", 80),
            (5, 0)
        );
        assert_eq!(
            find_term_definition(&document, "http://example.org/ns#", "Missing", 80),
            (0, 0)
        );
        // declarations past the scan window are ignored
        assert_eq!(
            find_term_definition(&document, "http://example.org/ns#", "Thing", 1),
            (4, 0)
        );
        assert_eq!(
            find_term_definition(&document, "http://example.org/ns#", "Thing", 0),
            (0, 0)
        );
    }
}
