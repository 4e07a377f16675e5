//! Text utilities for locating CURIEs and splitting IRIs.

/// Characters allowed inside a CURIE as typed in a buffer.
pub fn is_term_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_')
}

/// IRI delimiters from RFC 3986 section 2.2 that end a namespace.
fn is_iri_delimiter(c: char) -> bool {
    matches!(c, ':' | '/' | '?' | '#' | '[' | ']' | '@')
}

/// Extract the CURIE-like token that contains the character at `offset`.
///
/// `offset` is a character index into `line`. Returns `None` when the offset
/// is past the end of the line or points at a character that cannot be part
/// of a term.
///
/// ```
/// use rdfls::terms::get_term_at;
///
/// assert_eq!(get_term_at("some rdf:term here", 7).as_deref(), Some("rdf:term"));
/// assert_eq!(get_term_at("some rdf:term here", 17).as_deref(), Some("here"));
/// assert_eq!(get_term_at("<> a bibo:Article", 16).as_deref(), Some("bibo:Article"));
/// assert_eq!(get_term_at("some rdf:term here", 4), None);
/// ```
pub fn get_term_at(line: &str, offset: usize) -> Option<String> {
    let chars: Vec<char> = line.chars().collect();
    if !chars.get(offset).copied().is_some_and(is_term_char) {
        return None;
    }

    let start = chars[..offset]
        .iter()
        .rposition(|c| !is_term_char(*c))
        .map_or(0, |i| i + 1);
    let end = chars[offset..]
        .iter()
        .position(|c| !is_term_char(*c))
        .map_or(chars.len(), |i| offset + i);

    Some(chars[start..end].iter().collect())
}

/// Split an IRI into namespace and local name at the last delimiter.
///
/// ```
/// use rdfls::terms::split_iri;
///
/// assert_eq!(split_iri("http://example.org/ns#term"), ("http://example.org/ns#", "term"));
/// assert_eq!(split_iri("http://example.org/ns/term"), ("http://example.org/ns/", "term"));
/// assert_eq!(split_iri("urn:x-test:a"), ("urn:x-test:", "a"));
/// ```
pub fn split_iri(iri: &str) -> (&str, &str) {
    match iri.rfind(is_iri_delimiter) {
        // every delimiter is one byte wide
        Some(at) => iri.split_at(at + 1),
        None => ("", iri),
    }
}

/// Map an offset counted in UTF-16 code units, as LSP positions are, to a
/// character index into `line`. An offset inside a surrogate pair moves to the
/// next character; offsets past the end keep their overshoot.
///
/// ```
/// use rdfls::terms::utf16_to_char_offset;
///
/// assert_eq!(utf16_to_char_offset("a😀b", 3), 2);
/// assert_eq!(utf16_to_char_offset("ab", 5), 5);
/// ```
pub fn utf16_to_char_offset(line: &str, offset: usize) -> usize {
    let mut units = 0;
    let mut chars = 0;
    for c in line.chars() {
        if units >= offset {
            return chars;
        }
        units += c.len_utf16();
        chars += 1;
    }
    chars + offset.saturating_sub(units)
}

/// The inverse of [`utf16_to_char_offset`].
pub fn char_to_utf16_offset(line: &str, offset: usize) -> usize {
    let count = line.chars().count();
    let units: usize = line.chars().take(offset).map(char::len_utf16).sum();
    units + offset.saturating_sub(count)
}
