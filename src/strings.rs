//! Small string utilities shared by the handlers and the escape engine.

use once_cell::sync::Lazy;
use regex::Regex;

/// Escapes a string for inclusion in a double-quoted HTML attribute.
pub fn escape_attr_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

static ENTITY_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(?:[A-Za-z][A-Za-z0-9]*|#[0-9]+|#[xX][0-9a-fA-F]+);").unwrap());

static NAMED_ENTITIES: Lazy<std::collections::HashSet<&'static str>> = Lazy::new(|| {
    entities::ENTITIES
        .iter()
        .filter(|e| e.entity.ends_with(';'))
        .map(|e| e.entity)
        .collect()
});

/// Escapes every `&` that would re-parse as a character reference.
///
/// MediaWiki decodes references even inside `<nowiki>`, so literal text
/// like `&amp;` must always round-trip as `&amp;amp;`. A bare `&`, or a
/// `&word;` that is not a real named reference, is left alone.
pub fn escape_entity_prefixes(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in ENTITY_PREFIX_RE.find_iter(text) {
        let is_reference =
            m.as_str().as_bytes()[1] == b'#' || NAMED_ENTITIES.contains(m.as_str());
        out.push_str(&text[last..m.start()]);
        if is_reference {
            out.push_str("&amp;");
            out.push_str(&text[m.start() + 1..m.end()]);
        } else {
            out.push_str(m.as_str());
        }
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

/// Splits a text run into its body and its trailing newline run. The
/// trailing run stays outside any `<nowiki>` fence.
pub fn split_trailing_newlines(text: &str) -> (&str, &str) {
    let cut = text.trim_end_matches(['\n', '\r']).len();
    text.split_at(cut)
}
