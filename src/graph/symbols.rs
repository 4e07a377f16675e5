//! Prefixed-name scanner for Turtle and TriG buffers.
//!
//! This is not a parser. It walks the text once, skipping IRIs, strings,
//! comments and blank node labels, records prefix declarations as they appear
//! and hands every other prefixed name to a [`SymbolValidator`]. Syntax errors
//! are left to the RDF reader.

use super::{PrefixMap, SymbolValidator};
use crate::error::ParseError;

/// Validate every prefixed name in `text`, stopping at the first rejection.
pub(super) fn check(text: &str, validator: &dyn SymbolValidator) -> Result<(), ParseError> {
    let mut scanner = Scanner {
        chars: text.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
        prefixes: PrefixMap::new(),
    };
    scanner.run(validator)
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    prefixes: PrefixMap,
}

/// A name token with escapes removed.
struct Name {
    text: String,
    line: usize,
    column: usize,
}

fn is_name_start(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | ':' | '-') || c as u32 > 0x7f
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || matches!(c, '.' | '%' | '\\')
}

impl Scanner {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn looking_at(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn run(&mut self, validator: &dyn SymbolValidator) -> Result<(), ParseError> {
        while let Some(c) = self.peek() {
            match c {
                '#' => self.skip_comment(),
                '<' => {
                    self.iri();
                }
                '"' | '\'' => self.skip_string(c),
                '@' => {
                    self.bump();
                    let word = self.word();
                    if word == "prefix" {
                        self.prefix_declaration();
                    }
                }
                '_' if self.peek_at(1) == Some(':') => {
                    self.name();
                }
                c if is_name_start(c) => {
                    let name = self.name();
                    if name.text.eq_ignore_ascii_case("prefix") {
                        self.prefix_declaration();
                    } else if name.text.contains(':') {
                        validator
                            .validate(&name.text, &self.prefixes)
                            .map_err(|kind| ParseError::new(name.line, name.column, kind))?;
                    }
                }
                _ => {
                    self.bump();
                }
            }
        }
        Ok(())
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.bump();
        }
    }

    /// Read `<...>` and return its content.
    fn iri(&mut self) -> String {
        self.bump();
        let mut iri = String::new();
        while let Some(c) = self.bump() {
            if c == '>' || c == '\n' {
                break;
            }
            iri.push(c);
        }
        iri
    }

    fn skip_string(&mut self, quote: char) {
        let long = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        let delimiter = if long { 3 } else { 1 };
        for _ in 0..delimiter {
            self.bump();
        }
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                self.bump();
                continue;
            }
            if !long && c == '\n' {
                return;
            }
            if c == quote && (!long || self.looking_at(&quote.to_string().repeat(3))) {
                for _ in 0..delimiter {
                    self.bump();
                }
                return;
            }
            self.bump();
        }
    }

    /// Letters after `@`: a directive or a language tag.
    fn word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '-') {
                break;
            }
            word.push(c);
            self.bump();
        }
        word
    }

    fn name(&mut self) -> Name {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        // length up to the last escaped character, which is never trimmed
        let mut escaped = 0;
        while let Some(c) = self.peek() {
            if !is_name_char(c) {
                break;
            }
            self.bump();
            if c == '\\' {
                if let Some(c) = self.bump() {
                    text.push(c);
                    escaped = text.len();
                }
                continue;
            }
            text.push(c);
        }
        // an unescaped trailing '.' ends the statement rather than the name
        while text.len() > escaped && text.ends_with('.') {
            text.pop();
            self.pos -= 1;
            self.column -= 1;
        }
        Name { text, line, column }
    }

    /// After `@prefix` or `PREFIX`: record `name: <namespace>`. Anything
    /// unexpected is left for the reader to report.
    fn prefix_declaration(&mut self) {
        self.skip_ws();
        let mut prefix = String::new();
        while let Some(c) = self.peek() {
            if c == ':' {
                break;
            }
            if !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.')) {
                return;
            }
            prefix.push(c);
            self.bump();
        }
        self.bump();
        self.skip_ws();
        if self.peek() == Some('<') {
            let namespace = self.iri();
            self.prefixes.insert(prefix, namespace);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyntaxErrorKind;
    use crate::graph::{NoValidation, Parser, Syntax};

    /// Rejects every symbol, naming it in the message.
    struct RejectAll;

    impl SymbolValidator for RejectAll {
        fn validate(&self, symbol: &str, _prefixes: &PrefixMap) -> Result<(), SyntaxErrorKind> {
            Err(SyntaxErrorKind::Malformed(format!("rejected {symbol}")))
        }
    }

    /// Rejects symbols whose prefix is not declared yet.
    struct DeclaredOnly;

    impl SymbolValidator for DeclaredOnly {
        fn validate(&self, symbol: &str, prefixes: &PrefixMap) -> Result<(), SyntaxErrorKind> {
            match symbol.split_once(':') {
                Some((prefix, _)) if !prefixes.contains_key(prefix) => {
                    Err(SyntaxErrorKind::UndeclaredPrefix(symbol.to_string()))
                }
                _ => Ok(()),
            }
        }
    }

    fn rejected(text: &str) -> ParseError {
        check(text, &RejectAll).unwrap_err()
    }

    #[test]
    fn test_prefix_declarations_are_skipped() {
        let err = rejected(
            "@prefix ex: <http://example.org/> .\n\
             PREFIX dc: <http://purl.org/dc/terms/>\n\
             <http://s> dc:title \"x\" .",
        );
        assert_eq!((err.line, err.column), (3, 12));
        assert_eq!(err.kind, SyntaxErrorKind::Malformed("rejected dc:title".into()));
    }

    #[test]
    fn test_iris_strings_and_comments_are_skipped() {
        let text = "# ex:comment\n\
                    <http://a:b> <http://c> \"ex:x\", '''ex:y\n'''@en-GB, \"\\\"ex:z\" .\n\
                    _:b1 <http://p> 1.5 .";
        assert!(check(text, &RejectAll).is_ok());
    }

    #[test]
    fn test_datatype_names_are_validated() {
        let err = rejected("<http://s> <http://p> \"1\"^^xsd:integer .");
        assert_eq!(err.kind, SyntaxErrorKind::Malformed("rejected xsd:integer".into()));
        assert_eq!(err.column, 28);
    }

    #[test]
    fn test_trailing_dot_ends_the_name() {
        let err = rejected("<http://s> <http://p> ex:b.");
        assert_eq!(err.kind, SyntaxErrorKind::Malformed("rejected ex:b".into()));
    }

    #[test]
    fn test_escaped_dot_stays_in_the_name() {
        let err = rejected("<http://s> <http://p> ex:c\\. .");
        assert_eq!(err.kind, SyntaxErrorKind::Malformed("rejected ex:c.".into()));

        let err = rejected("<http://s> <http://p> ex:c\\.. .");
        assert_eq!(err.kind, SyntaxErrorKind::Malformed("rejected ex:c.".into()));
    }

    #[test]
    fn test_prefixes_in_scope_follow_declarations() {
        let err = check(
            "@prefix ex: <http://example.org/> .\nex:a ex:b ex:c .\nex:a ex:b xyz:Foo .",
            &DeclaredOnly,
        )
        .unwrap_err();
        assert_eq!((err.line, err.column), (3, 11));
        assert_eq!(err.kind, SyntaxErrorKind::UndeclaredPrefix("xyz:Foo".into()));
    }

    #[test]
    fn test_parser_accepts_escaped_dot_with_validation() {
        let doc = Parser::new(Syntax::Turtle)
            .with_validator(&DeclaredOnly)
            .parse("@prefix ex: <http://example.org/> .\nex:a ex:b ex:c\\. .\n")
            .unwrap();
        assert_eq!(doc.statement_count(), 1);
    }

    #[test]
    fn test_parser_skips_byte_order_mark_with_validation() {
        let doc = Parser::new(Syntax::Turtle)
            .with_validator(&DeclaredOnly)
            .parse("\u{feff}@prefix ex: <http://example.org/> .\nex:a a ex:Thing .\n")
            .unwrap();
        assert_eq!(doc.nodes[0].types, vec!["http://example.org/Thing".to_string()]);
    }

    #[test]
    fn test_rejection_wins_over_later_syntax_error() {
        let err = Parser::new(Syntax::Turtle)
            .with_validator(&DeclaredOnly)
            .parse("@prefix ex: <http://example.org/> .\nex:a ex:b xyz:Foo .\nex:a ex:b")
            .unwrap_err();
        assert_eq!(err.position(), (2, 11));
        assert_eq!(err.kind, SyntaxErrorKind::UndeclaredPrefix("xyz:Foo".into()));
    }

    #[test]
    fn test_earlier_syntax_error_wins_over_rejection() {
        let err = Parser::new(Syntax::Turtle)
            .with_validator(&DeclaredOnly)
            .parse("@prefix ex: <http://example.org/> .\nex:a ex:b ;; ] .\nex:a ex:b xyz:Foo .")
            .unwrap_err();
        assert_eq!(err.line, 2);
        assert!(matches!(err.kind, SyntaxErrorKind::Malformed(_)));
    }

    #[test]
    fn test_no_validation_accepts_everything() {
        assert!(check("<http://s> <http://p> xyz:Foo .", &NoValidation).is_ok());
    }
}
