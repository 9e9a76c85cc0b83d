//! A miniature synchronous wikitext re-tokenizer.
//!
//! The escape engine needs to know whether a text run, re-parsed as
//! wikitext, would produce anything other than plain text. This scanner
//! answers that question: it walks the run once and reports every
//! construct an actual re-parse would recognize. It is deliberately not a
//! full parser; it only has to be right about *whether* a construct starts,
//! not about its contents.
//!
//! Start-of-line state is threaded explicitly: `sol` gives the state at
//! the beginning of the run, and `sol_after_nl` controls whether a newline
//! inside the run re-enables start-of-line constructs (it does not inside
//! an indent-pre, where the serializer emits a space after every newline).

use crate::constants::{url_protocol, BEHAVIOR_SWITCHES, EXTENSION_TAGS, HTML5_TAGS};

/// How a literal tag in a text run was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Start,
    End,
    SelfClosing,
}

/// A wikitext construct that a re-parse of the scanned text would produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WtConstruct {
    /// A run of two or more apostrophes (bold/italic toggles).
    QuoteRun(usize),
    /// A `=…=` heading line.
    Heading,
    /// A `*`/`#`/`:`/`;` bullet run at start of line.
    ListItem,
    /// A leading space followed by content (indent-pre trigger).
    IndentPre,
    /// Four or more dashes at start of line.
    Hr,
    /// `{|` at start of line.
    TableOpen,
    /// A `[[…]]` pair.
    Wikilink,
    /// A `[…]` bracket pair; `valid_url` is true when the content begins
    /// with a known external-link protocol.
    ExtLink { valid_url: bool },
    /// A bare URL that would auto-link.
    UrlLink,
    /// A bare ISBN/RFC/PMID magic link.
    MagicLink,
    /// `{{` or `{{{` (template or parameter).
    Template,
    /// Three to five tildes.
    Signature,
    /// A `__WORD__` behavior switch.
    BehaviorSwitch,
    /// A literal `<…>` tag.
    Tag { name: String, kind: TagKind },
    /// An HTML comment.
    Comment,
}

impl WtConstruct {
    /// Whether a re-parse producing this construct forces the surrounding
    /// text run into a `<nowiki>` fence.
    ///
    /// Bracketed text without a valid URL, bare URLs, and comments
    /// re-parse to output equivalent to the literal text, so they never
    /// force a fence. A literal tag only matters when the parser would
    /// actually treat it as markup, i.e. when it is whitelisted HTML or a
    /// registered extension tag.
    pub fn triggers_fence(&self) -> bool {
        match self {
            WtConstruct::ExtLink { valid_url } => *valid_url,
            WtConstruct::UrlLink | WtConstruct::Comment => false,
            WtConstruct::Tag { name, .. } => {
                HTML5_TAGS.contains(name.as_str()) || EXTENSION_TAGS.contains(name.as_str())
            }
            _ => true,
        }
    }

    fn is_link(&self) -> bool {
        matches!(
            self,
            WtConstruct::Wikilink | WtConstruct::ExtLink { valid_url: true }
        )
    }
}

/// Scans `text` and returns the constructs a re-parse would produce.
pub fn scan(text: &str, sol: bool, sol_after_nl: bool) -> Vec<WtConstruct> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut sol = sol;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];

        if sol {
            match c {
                b'=' => {
                    if line_is_heading(line_at(text, i)) {
                        out.push(WtConstruct::Heading);
                    }
                }
                b'*' | b'#' | b':' | b';' => {
                    out.push(WtConstruct::ListItem);
                    i += bullet_run_len(&bytes[i..]);
                    sol = false;
                    continue;
                }
                b' ' | b'\t' => {
                    if line_has_content(line_at(text, i)) {
                        out.push(WtConstruct::IndentPre);
                    }
                }
                b'-' => {
                    if bytes[i..].starts_with(b"----") {
                        out.push(WtConstruct::Hr);
                        i += dash_run_len(&bytes[i..]);
                        sol = false;
                        continue;
                    }
                }
                b'{' => {
                    if bytes.get(i + 1) == Some(&b'|') {
                        out.push(WtConstruct::TableOpen);
                        i += 2;
                        sol = false;
                        continue;
                    }
                }
                _ => {}
            }
        }

        match c {
            b'\n' => {
                sol = sol_after_nl;
                i += 1;
                continue;
            }
            b'\'' => {
                let run = quote_run_len(&bytes[i..]);
                if run >= 2 {
                    out.push(WtConstruct::QuoteRun(run));
                }
                i += run;
                sol = false;
                continue;
            }
            b'[' => {
                if bytes.get(i + 1) == Some(&b'[') {
                    if text[i + 2..].contains("]]") {
                        out.push(WtConstruct::Wikilink);
                    }
                    i += 2;
                    sol = false;
                    continue;
                }
                if let Some(close) = find_on_line(&bytes[i + 1..], b']') {
                    let valid_url = url_protocol(&text[i + 1..]).is_some() && close > 0;
                    out.push(WtConstruct::ExtLink { valid_url });
                }
            }
            b'{' => {
                if bytes.get(i + 1) == Some(&b'{') {
                    out.push(WtConstruct::Template);
                    i += brace_run_len(&bytes[i..]);
                    sol = false;
                    continue;
                }
            }
            b'~' => {
                let run = tilde_run_len(&bytes[i..]);
                if (3..=5).contains(&run) {
                    out.push(WtConstruct::Signature);
                }
                i += run;
                sol = false;
                continue;
            }
            b'_' => {
                if let Some(len) = behavior_switch_len(&text[i..]) {
                    out.push(WtConstruct::BehaviorSwitch);
                    i += len;
                    sol = false;
                    continue;
                }
            }
            b'<' => {
                if bytes[i..].starts_with(b"<!--") {
                    out.push(WtConstruct::Comment);
                    i = match text[i + 4..].find("-->") {
                        Some(end) => i + 4 + end + 3,
                        None => bytes.len(),
                    };
                    continue;
                }
                if let Some((construct, len)) = scan_tag(&text[i..]) {
                    out.push(construct);
                    i += len;
                    sol = false;
                    continue;
                }
            }
            b'R' | b'P' | b'I' => {
                if word_boundary_before(bytes, i) {
                    if let Some(len) = magic_link_len(&text[i..]) {
                        out.push(WtConstruct::MagicLink);
                        i += len;
                        sol = false;
                        continue;
                    }
                }
            }
            _ => {}
        }

        if c.is_ascii_alphabetic() && word_boundary_before(bytes, i) {
            if url_protocol(&text[i..]).is_some() {
                if let Some(len) = url_len(&text[i..]) {
                    out.push(WtConstruct::UrlLink);
                    i += len;
                    sol = false;
                    continue;
                }
            }
        }

        if !c.is_ascii_whitespace() {
            sol = false;
        }
        i += 1;
    }

    out
}

/// Links-only pass: whether the text contains a complete wikilink or a
/// bracketed external link. Used by the line-level escape analysis.
pub fn has_bracket_pair(text: &str, sol: bool) -> bool {
    scan(text, sol, true).iter().any(WtConstruct::is_link)
}

fn line_at(text: &str, start: usize) -> &str {
    match text[start..].find('\n') {
        Some(end) => &text[start..start + end],
        None => &text[start..],
    }
}

fn line_is_heading(line: &str) -> bool {
    let trimmed = line.trim_end_matches([' ', '\t']);
    trimmed.len() >= 3 && trimmed.starts_with('=') && trimmed.ends_with('=')
}

fn line_has_content(line: &str) -> bool {
    line.bytes().any(|b| !b.is_ascii_whitespace())
}

fn bullet_run_len(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .take_while(|b| matches!(b, b'*' | b'#' | b':' | b';'))
        .count()
}

fn quote_run_len(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| **b == b'\'').count()
}

fn dash_run_len(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| **b == b'-').count()
}

fn brace_run_len(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| **b == b'{').count()
}

fn tilde_run_len(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| **b == b'~').count()
}

fn find_on_line(bytes: &[u8], needle: u8) -> Option<usize> {
    for (ix, b) in bytes.iter().enumerate() {
        if *b == needle {
            return Some(ix);
        }
        if *b == b'\n' {
            return None;
        }
    }
    None
}

fn word_boundary_before(bytes: &[u8], i: usize) -> bool {
    i == 0 || !bytes[i - 1].is_ascii_alphanumeric()
}

fn behavior_switch_len(rest: &str) -> Option<usize> {
    let inner = rest.strip_prefix("__")?;
    let word_len = inner
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .count();
    if word_len == 0 || !inner[word_len..].starts_with("__") {
        return None;
    }
    if !BEHAVIOR_SWITCHES.contains(inner[..word_len].to_ascii_lowercase().as_str()) {
        return None;
    }
    Some(2 + word_len + 2)
}

fn magic_link_len(rest: &str) -> Option<usize> {
    let kind = ["ISBN", "RFC", "PMID"]
        .iter()
        .find(|k| rest.starts_with(*k))?;
    let after = &rest[kind.len()..];
    let spaces = after.bytes().take_while(|b| *b == b' ').count();
    if spaces == 0 {
        return None;
    }
    let digits = after[spaces..]
        .bytes()
        .take_while(|b| b.is_ascii_digit() || matches!(b, b'-' | b'X' | b'x'))
        .count();
    if digits == 0 || !after.as_bytes()[spaces].is_ascii_digit() {
        return None;
    }
    Some(kind.len() + spaces + digits)
}

fn url_len(rest: &str) -> Option<usize> {
    let proto = url_protocol(rest)?;
    let tail = &rest[proto.len()..];
    let body = tail
        .bytes()
        .take_while(|b| !b.is_ascii_whitespace() && !matches!(b, b'[' | b']' | b'<' | b'>' | b'"'))
        .count();
    if body == 0 {
        return None;
    }
    Some(proto.len() + body)
}

fn scan_tag(rest: &str) -> Option<(WtConstruct, usize)> {
    let bytes = rest.as_bytes();
    debug_assert_eq!(bytes[0], b'<');
    let mut i = 1;
    let kind_end = if bytes.get(i) == Some(&b'/') {
        i += 1;
        true
    } else {
        false
    };
    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    if i == name_start || !bytes[name_start].is_ascii_alphabetic() {
        return None;
    }
    let name = rest[name_start..i].to_ascii_lowercase();
    let close = find_on_line(&bytes[i..], b'>').map(|off| i + off)?;
    let kind = if kind_end {
        TagKind::End
    } else if close > 0 && bytes[close - 1] == b'/' {
        TagKind::SelfClosing
    } else {
        TagKind::Start
    };
    Some((WtConstruct::Tag { name, kind }, close + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fences(text: &str, sol: bool) -> bool {
        scan(text, sol, true).iter().any(WtConstruct::triggers_fence)
    }

    #[test]
    fn plain_text_is_plain() {
        assert!(scan("just words, nothing else.", true, true).is_empty());
    }

    #[test]
    fn quotes_and_headings() {
        assert_eq!(scan("''x''", false, true), vec![
            WtConstruct::QuoteRun(2),
            WtConstruct::QuoteRun(2)
        ]);
        assert!(fences("=Heading=", true));
        assert!(!fences("=Heading=", false));
        assert!(!fences("a = b", true));
    }

    #[test]
    fn sol_constructs_need_sol() {
        assert!(fences("* item", true));
        assert!(!fences("* item", false));
        assert!(fences("x\n* item", false));
        assert!(fences(" pre", true));
        assert!(fences("----", true));
        assert!(fences("{| cls", true));
    }

    #[test]
    fn indent_pre_suppressed_without_sol_after_nl() {
        assert!(fences("a\n b", false));
        assert!(scan("a\n b", false, false)
            .iter()
            .all(|c| !c.triggers_fence()));
    }

    #[test]
    fn links() {
        assert!(fences("see [[Foo]]", false));
        assert!(!fences("see [[Foo", false));
        assert!(fences("[http://x.org label]", false));
        assert!(!fences("[just brackets]", false));
        assert!(!fences("visit http://example.org now", false));
        assert!(has_bracket_pair("a [[b]] c", false));
        assert!(!has_bracket_pair("a ] c", false));
    }

    #[test]
    fn tags_and_switches() {
        assert!(fences("a <b>bold</b>", false));
        assert!(!fences("a <madeup>tag</madeup>", false));
        assert!(fences("a <nowiki>x</nowiki>", false));
        assert!(fences("__NOTOC__", false));
        assert!(!fences("__shouting__", false));
        assert!(!fences("a <!-- note --> b", false));
    }

    #[test]
    fn magic_links() {
        assert!(fences("ISBN 0-306-40615-2", false));
        assert!(fences("see RFC 2616.", false));
        assert!(!fences("RFCs are fine", false));
    }
}
