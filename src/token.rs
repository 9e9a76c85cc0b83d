//! The intermediate token stream between the DOM walker and the token
//! serializer.
//!
//! Tokens are ephemeral: a handler synthesizes one per element boundary,
//! the token serializer consumes it immediately, and only a lightweight
//! sliding window of recent tokens is retained for look-behind decisions.

use crate::nodes::DataParsoid;

/// Tag payload shared by start, end, and self-closing tokens.
#[derive(Debug, Clone, Default)]
pub struct TagData {
    /// Lowercased element name.
    pub name: String,
    /// Attributes in source order, minus `data-parsoid`.
    pub attrs: Vec<(String, String)>,
    /// Round-trip metadata for the element.
    pub dp: DataParsoid,
    /// The `about` id grouping template-generated content, if any.
    pub about: Option<String>,
    /// Tag name of the enclosing element, provided by the walker for
    /// context-sensitive handlers (paragraph suppression, implicit rows).
    pub parent: Option<String>,
    /// Set by the walker when an ancestor table or list was written with
    /// HTML tag syntax; structural children then inherit it.
    pub inherited_html: bool,
}

impl TagData {
    /// A bare tag with a name and nothing else.
    pub fn named(name: &str) -> Self {
        TagData {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Whether this tag must be serialized with HTML syntax.
    pub fn uses_html_syntax(&self) -> bool {
        self.dp.is_html_syntax() || self.inherited_html
    }
}

/// One token of the intermediate stream.
#[derive(Debug, Clone)]
pub enum WtToken {
    StartTag(TagData),
    EndTag(TagData),
    SelfClosing(TagData),
    Text(String),
    Comment(String),
    Newline,
    Eof,
}

impl WtToken {
    /// The tag payload, for the three tag-shaped variants.
    pub fn tag(&self) -> Option<&TagData> {
        match self {
            WtToken::StartTag(t) | WtToken::EndTag(t) | WtToken::SelfClosing(t) => Some(t),
            _ => None,
        }
    }

    /// Whether this is a start tag with the given name.
    pub fn is_start_of(&self, name: &str) -> bool {
        matches!(self, WtToken::StartTag(t) if t.name == name)
    }

    /// Whether this is an end tag with the given name.
    pub fn is_end_of(&self, name: &str) -> bool {
        matches!(self, WtToken::EndTag(t) if t.name == name)
    }
}
