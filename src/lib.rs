//! rewiki — a round-tripping HTML→wikitext serializer.
//!
//! Given an HTML DOM produced from MediaWiki wikitext and annotated with
//! round-trip metadata (`data-parsoid` attributes, `mw:…` type
//! annotations), [`serialize_document`] emits wikitext whose re-parse
//! yields an equivalent DOM. When the original wikitext is available in
//! [`Env::page_src`], inter-element whitespace and comments are spliced
//! back verbatim from the recorded source ranges.
//!
//! ```
//! use rewiki::{nodes, serialize_document, Arena, Options};
//!
//! let arena = Arena::new();
//! let body = nodes::new_element(&arena, "body", vec![]);
//! let p = nodes::new_element(&arena, "p", vec![]);
//! p.append(nodes::new_text(&arena, "Hello, "));
//! let b = nodes::new_element(&arena, "b", vec![]);
//! b.append(nodes::new_text(&arena, "world"));
//! p.append(b);
//! body.append(p);
//!
//! let wikitext = serialize_document(body, &Options::default()).unwrap();
//! assert_eq!(wikitext, "Hello, '''world'''\n");
//! ```
//!
//! The wikitext→HTML direction, template expansion, and all I/O live in
//! external collaborators; this crate is the serializer core only.

use std::sync::Arc;

pub use typed_arena::Arena;

pub mod arena_dom;
mod constants;
mod escape;
mod handlers;
mod links;
pub mod nodes;
mod preprocess;
mod retokenize;
mod serializer;
mod strings;
mod token;

#[cfg(test)]
mod tests;

pub use nodes::HtmlNode;

/// Canonicalizes wiki titles for link-target comparison.
///
/// The serializer only ever uses this to decide whether a link's content
/// matches its target; hosts with real site configuration (namespace
/// aliases, case-folding rules) plug theirs in via [`Options::normalizer`].
pub trait TitleNormalizer {
    /// Normalizes `title`. With `fold_underscores`, underscores are
    /// treated as spaces.
    fn normalize(&self, title: &str, fold_underscores: bool) -> String;
}

/// The default normalizer: trims, optionally folds underscores to spaces,
/// and uppercases the first letter.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTitleNormalizer;

impl TitleNormalizer for DefaultTitleNormalizer {
    fn normalize(&self, title: &str, fold_underscores: bool) -> String {
        let mut t = title.trim().to_string();
        if fold_underscores {
            t = t.replace('_', " ");
        }
        let mut chars = t.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => t,
        }
    }
}

/// The parser environment the serializer was handed.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "bon", derive(bon::Builder))]
pub struct Env {
    /// Name of the page being serialized, for logging only.
    #[cfg_attr(feature = "bon", builder(default))]
    pub page_name: String,
    /// The original wikitext. Its presence enables separator splicing
    /// from recorded source ranges.
    pub page_src: Option<String>,
    /// Emit walker/separator trace output through the `log` crate.
    #[cfg_attr(feature = "bon", builder(default))]
    pub trace: bool,
}

/// Serializer options.
#[derive(Default, Clone)]
#[cfg_attr(feature = "bon", derive(bon::Builder))]
pub struct Options {
    /// The parser environment.
    #[cfg_attr(feature = "bon", builder(default))]
    pub env: Env,
    /// Title normalizer; [`DefaultTitleNormalizer`] when absent.
    pub normalizer: Option<Arc<dyn TitleNormalizer>>,
    /// Opaque selective-serialization cookie, forwarded with every chunk
    /// and never interpreted.
    pub serialize_info: Option<String>,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("env", &self.env)
            .field(
                "normalizer",
                if self.normalizer.is_some() {
                    &"Some(..)"
                } else {
                    &"None"
                },
            )
            .field("serialize_info", &self.serialize_info)
            .finish()
    }
}

impl Options {
    pub(crate) fn normalize_title(&self, title: &str, fold_underscores: bool) -> String {
        match &self.normalizer {
            Some(n) => n.normalize(title, fold_underscores),
            None => DefaultTitleNormalizer.normalize(title, fold_underscores),
        }
    }
}

/// A fatal serialization error. Everything recoverable is logged and
/// worked around instead.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// The `data-parsoid` attribute of an element failed to decode.
    #[error("invalid data-parsoid on <{tag}>: {source}")]
    InvalidDataParsoid {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Serializes a DOM to a single wikitext string.
pub fn serialize_document<'a>(
    root: &'a HtmlNode<'a>,
    options: &Options,
) -> Result<String, SerializeError> {
    let mut out = String::new();
    serialize_document_chunked(root, options, &mut |chunk, _| out.push_str(chunk))?;
    Ok(out)
}

/// Serializes a DOM, delivering output chunks (and the forwarded
/// serialize-info cookie) to `on_chunk` in document order.
pub fn serialize_document_chunked<'a>(
    root: &'a HtmlNode<'a>,
    options: &Options,
    on_chunk: &mut dyn FnMut(&str, Option<&str>),
) -> Result<(), SerializeError> {
    serializer::serialize_dom(root, options, on_chunk)
}
