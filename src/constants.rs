//! Static wikitext tables: tag whitelists, link protocols, image option
//! vocabularies, and the patterns that force a full escape analysis.

use once_cell::sync::Lazy;
use phf::{phf_map, phf_set, Map, Set};
use regex::Regex;

/// HTML5 tags that MediaWiki accepts in wikitext. A tag outside this set
/// re-parses as literal text, so it never forces a fence. Explicit `<a>`
/// tags are forbidden in wikitext and intentionally absent.
pub static HTML5_TAGS: Set<&'static str> = phf_set! {
    "abbr",
    "b", "bdi", "bdo", "big", "blockquote", "br",
    "caption", "center", "cite", "code",
    "data", "dd", "del", "dfn", "div", "dl", "dt",
    "em",
    "font",
    "h1", "h2", "h3", "h4", "h5", "h6", "hr",
    "i", "ins",
    "kbd",
    "li",
    "mark",
    "ol",
    "p", "pre",
    "q",
    "rb", "rp", "rt", "rtc", "ruby",
    "s", "samp", "small", "span", "strike", "strong", "sub", "sup",
    "table", "td", "th", "time", "tr", "tt",
    "u", "ul",
    "var",
    "wbr",
};

/// Extension tags registered with the parser. These re-parse as extension
/// invocations, so their appearance in a text run forces a fence.
pub static EXTENSION_TAGS: Set<&'static str> = phf_set! {
    "gallery",
    "includeonly",
    "math",
    "noinclude",
    "nowiki",
    "onlyinclude",
    "poem",
    "pre",
    "ref",
    "references",
    "source",
    "syntaxhighlight",
    "timeline",
};

/// Void HTML elements: no closing tag, ever.
pub static VOID_ELEMENTS: Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
};

/// Protocols that introduce external links. Lowercased; entries that end
/// in `:` take no slashes.
pub static PROTOCOLS: Set<&'static str> = phf_set! {
    "bitcoin:",
    "ftp://",
    "ftps://",
    "geo:",
    "git://",
    "gopher://",
    "http://",
    "https://",
    "irc://",
    "ircs://",
    "magnet:",
    "mailto:",
    "mms://",
    "news:",
    "nntp://",
    "redis://",
    "sftp://",
    "sms:",
    "ssh://",
    "svn://",
    "tel:",
    "telnet://",
    "urn:",
    "worldwind://",
    "xmpp:",
};

/// Words that toggle page behavior when doubly underscored (`__NOTOC__`).
pub static BEHAVIOR_SWITCHES: Set<&'static str> = phf_set! {
    "disambig",
    "forcetoc",
    "hiddencat",
    "index",
    "newsectionlink",
    "nocontentconvert",
    "noeditsection",
    "nogallery",
    "noindex",
    "nonewsectionlink",
    "notitleconvert",
    "notoc",
    "staticredirect",
    "toc",
};

/// Magic-word aliases for simple (valueless) image options, keyed by
/// `img_` plus the alias as written, mapping to the canonical option key
/// recorded in `optList`.
pub static SIMPLE_IMG_OPTIONS: Map<&'static str, &'static str> = phf_map! {
    "img_baseline" => "valign",
    "img_border" => "border",
    "img_bottom" => "valign",
    "img_center" => "halign",
    "img_centre" => "halign",
    "img_frame" => "format",
    "img_framed" => "format",
    "img_frameless" => "format",
    "img_left" => "halign",
    "img_middle" => "valign",
    "img_none" => "halign",
    "img_right" => "halign",
    "img_sub" => "valign",
    "img_super" => "valign",
    "img_text_bottom" => "valign",
    "img_text_top" => "valign",
    "img_thumb" => "format",
    "img_thumbnail" => "format",
    "img_top" => "valign",
};

/// Reverse map for prefixed image options: canonical option key to the
/// localized magic-word template the value is interpolated into.
pub static PREFIX_IMG_OPTIONS_RM: Map<&'static str, &'static str> = phf_map! {
    "alt" => "alt=$1",
    "lang" => "lang=$1",
    "link" => "link=$1",
    "page" => "page=$1",
    "upright" => "upright=$1",
};

/// Magic links recognized inline. Their bare appearance in text would
/// re-parse as a link, so they force a full escape analysis.
pub static URL_TRIGGER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:RFC|PMID|ISBN)\b").unwrap());

/// Characters that can begin or continue a wikitext construct. Text runs
/// containing none of these need no escape analysis at all.
pub static WT_SPECIAL_CHARS: [bool; 256] = build_special_chars();

const fn build_special_chars() -> [bool; 256] {
    let mut table = [false; 256];
    let specials = b"<>[]-+|'!=#*:;~{}";
    let mut i = 0;
    while i < specials.len() {
        table[specials[i] as usize] = true;
        i += 1;
    }
    table
}

/// Returns the protocol prefix of `s`, if `s` begins with a known
/// external-link protocol.
pub fn url_protocol(s: &str) -> Option<&'static str> {
    PROTOCOLS
        .iter()
        .find(|proto| {
            s.len() >= proto.len()
                && s.as_bytes()[..proto.len()].eq_ignore_ascii_case(proto.as_bytes())
        })
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_excludes_anchors() {
        assert!(!HTML5_TAGS.contains("a"));
        assert!(HTML5_TAGS.contains("span"));
    }

    #[test]
    fn protocol_detection() {
        assert_eq!(url_protocol("https://example.org"), Some("https://"));
        assert_eq!(url_protocol("MAILTO:x@y"), Some("mailto:"));
        assert_eq!(url_protocol("example.org"), None);
    }

    #[test]
    fn special_char_table() {
        assert!(WT_SPECIAL_CHARS[b'[' as usize]);
        assert!(WT_SPECIAL_CHARS[b'~' as usize]);
        assert!(!WT_SPECIAL_CHARS[b'a' as usize]);
    }
}
