//! The HTML DOM payloads consumed by the serializer.
//!
//! Upstream (the wikitext→HTML pipeline, an external collaborator) hands us
//! a DOM whose element nodes carry round-trip metadata in a `data-parsoid`
//! attribute. The preprocessor decodes that JSON once into the typed
//! [`DataParsoid`] record stored alongside the node value.

use std::cell::RefCell;
use std::fmt;

use serde::de::{Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use typed_arena::Arena;

use crate::arena_dom::Node;

/// A DOM node payload: the node value plus its decoded round-trip metadata.
#[derive(Debug, Clone, Default)]
pub struct DomData {
    /// What kind of node this is.
    pub value: NodeValue,
    /// Round-trip metadata decoded from the `data-parsoid` attribute.
    pub dp: DataParsoid,
}

/// A DOM node linked into an arena-backed tree.
pub type HtmlNode<'a> = Node<'a, RefCell<DomData>>;

/// The core DOM node enum.
#[derive(Debug, Clone, Default)]
pub enum NodeValue {
    /// The synthetic root above `<body>`'s children.
    #[default]
    Document,
    /// An element with a tag name and ordered attributes.
    Element(ElementData),
    /// A text node.
    Text(String),
    /// A comment node. The content excludes the `<!--`/`-->` delimiters.
    Comment(String),
}

/// Tag name and attributes of an element node.
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    /// Lowercased tag name.
    pub name: String,
    /// Attributes in source order.
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    /// Looks up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A document source range: the element's span in the original wikitext as
/// `[start, end, open_width, close_width]`. Individual entries may be
/// absent (serialized as `null`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dsr {
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub open_width: Option<usize>,
    pub close_width: Option<usize>,
}

impl<'de> Deserialize<'de> for Dsr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DsrVisitor;

        impl<'de> Visitor<'de> for DsrVisitor {
            type Value = Dsr;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a dsr array of up to four offsets")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Dsr, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut slots = [None; 4];
                for slot in slots.iter_mut() {
                    match seq.next_element::<Option<i64>>()? {
                        Some(v) => *slot = v.and_then(|n| usize::try_from(n).ok()),
                        None => break,
                    }
                }
                // Drain any extra entries rather than erroring out.
                while seq.next_element::<serde_json::Value>()?.is_some() {}
                Ok(Dsr {
                    start: slots[0],
                    end: slots[1],
                    open_width: slots[2],
                    close_width: slots[3],
                })
            }
        }

        deserializer.deserialize_seq(DsrVisitor)
    }
}

/// One entry of an image's `optList`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImgOpt {
    /// Canonical option key (`halign`, `format`, `width`, `caption`, …).
    #[serde(default)]
    pub k: String,
    /// Option value as written; `null` for the caption placeholder that
    /// refers to the actual `<figcaption>` content.
    #[serde(default)]
    pub v: Option<String>,
}

/// Round-trip metadata attached to a DOM node.
///
/// All fields default when absent; unknown fields are ignored so newer
/// producers do not break older serializers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataParsoid {
    /// Verbatim source span for the whole node.
    pub src: Option<String>,
    /// Document source range in the original wikitext.
    pub dsr: Option<Dsr>,
    /// `"html"` when the element was written with HTML tag syntax.
    pub stx: Option<String>,
    /// `"row"` for inline (`||`/`!!`/`:`-on-the-same-line) cells and items.
    pub stx_v: Option<String>,
    #[serde(rename = "startTagSrc")]
    pub start_tag_src: Option<String>,
    #[serde(rename = "endTagSrc")]
    pub end_tag_src: Option<String>,
    #[serde(rename = "attrSepSrc")]
    pub attr_sep_src: Option<String>,
    /// Link trail characters absorbed into the link content.
    pub tail: Option<String>,
    /// Link prefix characters absorbed into the link content.
    pub prefix: Option<String>,
    /// Whether the link was written with the pipe trick (`[[Foo (bar)|]]`).
    pub pipetrick: bool,
    #[serde(rename = "autoInsertedStart")]
    pub auto_inserted_start: bool,
    #[serde(rename = "autoInsertedEnd")]
    pub auto_inserted_end: bool,
    #[serde(rename = "selfClose")]
    pub self_close: bool,
    #[serde(rename = "noClose")]
    pub no_close: bool,
    /// A newline the parser stripped from the start of an HTML `<pre>`.
    #[serde(rename = "strippedNL")]
    pub stripped_nl: bool,
    /// Dashes beyond the minimal four of a horizontal rule.
    pub extra_dashes: Option<usize>,
    /// Set when content followed a horizontal rule on the same line.
    #[serde(rename = "lineContent")]
    pub line_content: bool,
    /// Verbatim source of a page-property magic word.
    #[serde(rename = "magicSrc")]
    pub magic_src: Option<String>,
    /// Ordered image options.
    #[serde(rename = "optList")]
    pub opt_list: Option<Vec<ImgOpt>>,
    /// Localized names of the image options, keyed like `optList`.
    #[serde(rename = "optNames")]
    pub opt_names: Option<std::collections::HashMap<String, String>>,
    #[serde(rename = "srcContent")]
    pub src_content: Option<String>,
    #[serde(rename = "srcTagName")]
    pub src_tag_name: Option<String>,
}

impl DataParsoid {
    /// Whether the element was written with HTML tag syntax.
    pub fn is_html_syntax(&self) -> bool {
        self.stx.as_deref() == Some("html")
    }

    /// Whether the element was written with inline row syntax (`||`, `!!`,
    /// or a `dd` on the same line as its `dt`).
    pub fn is_row_syntax(&self) -> bool {
        self.stx_v.as_deref() == Some("row")
    }
}

/// Elements that begin a new logical line of wikitext. Used by the walker
/// to scope line accumulation and by the preprocessor's sourceless newline
/// normalization.
pub fn is_block_tag(name: &str) -> bool {
    matches!(
        name,
        "body"
            | "blockquote"
            | "caption"
            | "dd"
            | "div"
            | "dl"
            | "dt"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "hr"
            | "li"
            | "ol"
            | "p"
            | "pre"
            | "table"
            | "tbody"
            | "td"
            | "th"
            | "tr"
            | "ul"
    )
}

impl<'a> Node<'a, RefCell<DomData>> {
    /// The element name, or `None` for non-element nodes.
    pub fn element_name(&self) -> Option<String> {
        match self.data.borrow().value {
            NodeValue::Element(ref e) => Some(e.name.clone()),
            _ => None,
        }
    }

    /// Whether this node is an element with the given name.
    pub fn is_element_named(&self, name: &str) -> bool {
        matches!(self.data.borrow().value, NodeValue::Element(ref e) if e.name == name)
    }

    /// Whether this node is an element.
    pub fn is_element(&self) -> bool {
        matches!(self.data.borrow().value, NodeValue::Element(..))
    }

    /// Whether this node is a text node.
    pub fn is_text(&self) -> bool {
        matches!(self.data.borrow().value, NodeValue::Text(..))
    }

    /// An attribute of this element, cloned out of the payload.
    pub fn attr(&self, name: &str) -> Option<String> {
        match self.data.borrow().value {
            NodeValue::Element(ref e) => e.attr(name).map(str::to_string),
            _ => None,
        }
    }

    /// The `about` attribute used to group template-generated content.
    pub fn about(&self) -> Option<String> {
        self.attr("about")
    }

    /// The `typeof` attribute carrying `mw:…` type annotations.
    pub fn type_of(&self) -> Option<String> {
        self.attr("typeof")
    }

    /// The first child that is an element.
    pub fn first_element_child(&'a self) -> Option<&'a HtmlNode<'a>> {
        self.children().find(|c| c.is_element())
    }

    /// Whether this element is a block-level wikitext construct.
    pub fn is_block(&self) -> bool {
        match self.data.borrow().value {
            NodeValue::Element(ref e) => is_block_tag(&e.name),
            NodeValue::Document => true,
            _ => false,
        }
    }
}

/// Allocates an element node.
pub fn new_element<'a>(
    arena: &'a Arena<HtmlNode<'a>>,
    name: &str,
    attrs: Vec<(String, String)>,
) -> &'a HtmlNode<'a> {
    arena.alloc(Node::new(RefCell::new(DomData {
        value: NodeValue::Element(ElementData {
            name: name.to_string(),
            attrs,
        }),
        dp: DataParsoid::default(),
    })))
}

/// Allocates a text node.
pub fn new_text<'a>(arena: &'a Arena<HtmlNode<'a>>, content: &str) -> &'a HtmlNode<'a> {
    arena.alloc(Node::new(RefCell::new(DomData {
        value: NodeValue::Text(content.to_string()),
        dp: DataParsoid::default(),
    })))
}

/// Allocates a comment node.
pub fn new_comment<'a>(arena: &'a Arena<HtmlNode<'a>>, content: &str) -> &'a HtmlNode<'a> {
    arena.alloc(Node::new(RefCell::new(DomData {
        value: NodeValue::Comment(content.to_string()),
        dp: DataParsoid::default(),
    })))
}

/// Allocates the synthetic document root.
pub fn new_document<'a>(arena: &'a Arena<HtmlNode<'a>>) -> &'a HtmlNode<'a> {
    arena.alloc(Node::new(RefCell::new(DomData::default())))
}
