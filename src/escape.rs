//! The escape engine: decides whether a text run must be wrapped in a
//! `<nowiki>…</nowiki>` fence so that a re-parse leaves it as plain text.
//!
//! The strategy is all-or-nothing: if any substring of a run would require
//! escaping, the whole run is fenced. Cheap checks run first; the mini
//! re-tokenizer is the backstop.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{URL_TRIGGER_RE, WT_SPECIAL_CHARS};
use crate::retokenize;
use crate::strings::split_trailing_newlines;

/// Context pushed by a handler whose content needs extra escaping rules.
/// The top of the serializer's context stack is consulted for every text
/// run serialized inside that construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscapeContext {
    /// Inside `=…=` heading content.
    Heading,
    /// Inside a native list item.
    ListItem,
    /// Inside external-link content (`[url …]`).
    Link,
    /// Inside `''`/`'''` formatting.
    Quote,
    /// Inside a `!`-style table header cell.
    TableHeader,
    /// Inside `[[…|…]]` wikilink content.
    Wikilink,
    /// Inside anchor content that a `]` would terminate.
    Anchor,
    /// Inside a `|`-style table cell.
    TableCell {
        /// Whether the cell's dsr open width is exactly one (`|`, no
        /// attribute segment), making a leading `-`/`+` ambiguous.
        open_width_one: bool,
        /// Whether the cell uses `||` row syntax.
        row_syntax: bool,
        /// Whether the cell carries attributes.
        has_attrs: bool,
    },
}

impl EscapeContext {
    fn forces_fence(&self, text: &str, line: &LineState) -> bool {
        match self {
            EscapeContext::Heading => {
                let accumulated = line.text.trim_end_matches('\n');
                accumulated.len() >= 2
                    && accumulated.starts_with('=')
                    && accumulated.ends_with('=')
            }
            EscapeContext::ListItem => text.starts_with(['#', '*', ':', ';']),
            EscapeContext::Link => text.contains(']'),
            EscapeContext::Quote => text.starts_with('\'') || text.ends_with('\''),
            EscapeContext::TableHeader => text.contains("!!"),
            EscapeContext::Wikilink => text.starts_with('|') || text.ends_with(']'),
            EscapeContext::Anchor => text.ends_with(']'),
            EscapeContext::TableCell {
                open_width_one,
                row_syntax,
                has_attrs,
            } => {
                text.contains('|')
                    || (text.starts_with(['-', '+'])
                        && *open_width_one
                        && !*row_syntax
                        && !*has_attrs)
            }
        }
    }
}

/// Accumulated inline text of the block element currently being
/// serialized, plus the analysis flags the piece-wise escape fallback
/// consults.
#[derive(Debug, Clone, Default)]
pub struct LineState {
    /// Concatenated text of the block's inline text nodes.
    pub text: String,
    /// Number of text nodes contributing to `text`.
    pub num_pieces: usize,
    /// Whether `analyze` ran for this block.
    pub processed: bool,
    pub has_bracket_pair: bool,
    pub has_heading_pair: bool,
}

impl LineState {
    /// Resets the accumulator on entry to a new block element.
    pub fn reset(&mut self) {
        *self = LineState::default();
    }

    /// Computes the pair flags for the accumulated line.
    pub fn analyze(&mut self, sol: bool) {
        if self.processed {
            return;
        }
        self.processed = true;
        let trimmed = self.text.trim_end_matches('\n');
        self.has_heading_pair =
            trimmed.len() >= 2 && trimmed.starts_with('=') && trimmed.ends_with('=');
        self.has_bracket_pair = retokenize::has_bracket_pair(&self.text, sol);
    }
}

static INDENT_PRE_TRIGGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|\n)[ \t]+\S").unwrap());
static LEADING_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]+\S").unwrap());
static NL_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]+\S").unwrap());
static BRACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{\{|\{\{|\}\}\}|\}\}").unwrap());
static TILDES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"~{3,5}").unwrap());
static SOL_LEAD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t#*:;=]").unwrap());
static SOL_DASHES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^----").unwrap());
static NOWIKI_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(/?nowiki)>").unwrap());

fn has_special_char(text: &str) -> bool {
    text.bytes().any(|b| WT_SPECIAL_CHARS[b as usize])
}

fn contains_any(text: &str, set: &[u8]) -> bool {
    text.bytes().any(|b| set.contains(&b))
}

/// Decides whether `text` needs a fence and returns the emitted form.
///
/// `sol` is the serializer's start-of-line state, `context` the innermost
/// escape context, and `line` the block-scoped line accumulator.
pub fn escape_wikitext(
    text: &str,
    sol: bool,
    context: Option<&EscapeContext>,
    in_indent_pre: bool,
    line: &LineState,
) -> String {
    let full_check_needed = URL_TRIGGER_RE.is_match(text);

    // Pure whitespace, or text with no wikitext-special characters and no
    // pre trigger, needs no analysis at all.
    if !full_check_needed
        && !has_special_char(text)
        && !INDENT_PRE_TRIGGER_RE.is_match(text)
    {
        return text.to_string();
    }

    if let Some(ctx) = context {
        if ctx.forces_fence(text, line) {
            return escaped_text(text);
        }
    }

    // Template/parameter braces and signatures survive no context.
    if BRACES_RE.is_match(text) || TILDES_RE.is_match(text) {
        return escaped_text(text);
    }

    // A leading space before content would open an indent-pre. Inside an
    // indent-pre the transform re-emits the space itself, so the trigger
    // is moot there.
    if !in_indent_pre
        && ((sol && LEADING_SPACE_RE.is_match(text)) || NL_SPACE_RE.is_match(text))
    {
        return escaped_text(text);
    }

    if !full_check_needed {
        if !sol && !text.contains("''") && !contains_any(text, b"<>]") {
            return text.to_string();
        }
        if sol
            && !SOL_LEAD_RE.is_match(text)
            && !contains_any(text, b"<[]>|'!")
            && !SOL_DASHES_RE.is_match(text)
        {
            return text.to_string();
        }
    }

    // A literal nowiki tag can never be emitted raw; its entity form
    // re-parses back to the literal text whether or not we fence.
    let text = NOWIKI_TAG_RE.replace_all(text, "&lt;$1&gt;").into_owned();

    let constructs = retokenize::scan(&text, sol, !in_indent_pre);
    if constructs.iter().any(retokenize::WtConstruct::triggers_fence) {
        return escaped_text(&text);
    }

    // Last resort: the line this text belongs to was assembled from
    // several pieces, and the pieces jointly form a heading or a bracket
    // pair even though no single piece does.
    if line.num_pieces > 1 {
        if (line.has_heading_pair && text.starts_with('='))
            || (line.has_bracket_pair && text.contains(']'))
        {
            return escaped_text(&text);
        }
    }

    text
}

/// Encodes a fenced run: trailing newlines stay outside the fence so they
/// keep separating lines.
fn escaped_text(text: &str) -> String {
    let (body, trailing) = split_trailing_newlines(text);
    format!("<nowiki>{}</nowiki>{}", body, trailing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn esc(text: &str, sol: bool) -> String {
        escape_wikitext(text, sol, None, false, &LineState::default())
    }

    #[test]
    fn plain_text_untouched() {
        assert_eq!(esc("hello there", true), "hello there");
        assert_eq!(esc("   \n ", true), "   \n ");
        assert_eq!(esc("1 + 1 = 2", false), "1 + 1 = 2");
    }

    #[test]
    fn unconditional_fences() {
        assert_eq!(esc("a {{tpl}} b", false), "<nowiki>a {{tpl}} b</nowiki>");
        assert_eq!(esc("sign ~~~~", false), "<nowiki>sign ~~~~</nowiki>");
        assert_eq!(esc(" pre", true), "<nowiki> pre</nowiki>");
        assert_eq!(esc(" not pre", false), " not pre");
        assert_eq!(esc("a\n b", false), "<nowiki>a\n b</nowiki>");
    }

    #[test]
    fn sol_constructs() {
        assert_eq!(esc("* list", true), "<nowiki>* list</nowiki>");
        assert_eq!(esc("* list", false), "* list");
        assert_eq!(esc("=h=", true), "<nowiki>=h=</nowiki>");
    }

    #[test]
    fn quotes_fenced() {
        assert_eq!(esc("it''s", false), "<nowiki>it''s</nowiki>");
        assert_eq!(esc("it's", false), "it's");
    }

    #[test]
    fn trailing_newlines_stay_outside() {
        assert_eq!(esc("''x''\n\n", false), "<nowiki>''x''</nowiki>\n\n");
    }

    #[test]
    fn nowiki_literals_entity_escaped() {
        assert_eq!(esc("a <nowiki>b</nowiki> c", false), "a &lt;nowiki&gt;b&lt;/nowiki&gt; c");
    }

    #[test]
    fn contextual_cell() {
        let ctx = EscapeContext::TableCell {
            open_width_one: true,
            row_syntax: false,
            has_attrs: false,
        };
        let line = LineState::default();
        assert_eq!(
            escape_wikitext("a|b", false, Some(&ctx), false, &line),
            "<nowiki>a|b</nowiki>"
        );
        assert_eq!(
            escape_wikitext("-c", false, Some(&ctx), false, &line),
            "<nowiki>-c</nowiki>"
        );
        assert_eq!(escape_wikitext("c-", false, Some(&ctx), false, &line), "c-");
    }

    #[test]
    fn contextual_wikilink() {
        let line = LineState::default();
        assert_eq!(
            escape_wikitext("|x", false, Some(&EscapeContext::Wikilink), false, &line),
            "<nowiki>|x</nowiki>"
        );
        assert_eq!(
            escape_wikitext("x]", false, Some(&EscapeContext::Wikilink), false, &line),
            "<nowiki>x]</nowiki>"
        );
    }

    #[test]
    fn piecewise_line_analysis() {
        let mut line = LineState {
            text: "=x [[y]] z=".to_string(),
            num_pieces: 2,
            ..Default::default()
        };
        line.analyze(true);
        assert!(line.has_heading_pair);
        assert!(line.has_bracket_pair);
        assert_eq!(
            escape_wikitext("=x ", true, None, false, &line),
            "<nowiki>=x </nowiki>"
        );
    }
}
