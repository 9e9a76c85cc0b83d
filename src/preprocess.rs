//! The pre-serialization DOM pass.
//!
//! One walk over the tree before the serializer runs: decode every
//! `data-parsoid` attribute into its typed record, collect
//! template-generated attribute sources into the shadow table, coalesce
//! text nodes, lift inter-element whitespace (and comments) out of the
//! tree into a separator side table, float diff markers leftward, and
//! normalize syntactic newlines away when no original source is available.

use std::collections::HashMap;

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::nodes::{DataParsoid, HtmlNode, NodeValue};
use crate::serializer::TplAttrs;
use crate::SerializeError;

/// Everything the preprocessor hands to the serializer.
#[derive(Debug, Default)]
pub struct Preprocessed {
    /// Template `about` id → attribute source shadow table.
    pub tpl_attrs: HashMap<String, TplAttrs>,
    /// Separator text preceding an element child, keyed by node identity.
    pub sep_before: HashMap<usize, String>,
    /// Separator text after the last element child, keyed by the parent.
    pub sep_trailing: HashMap<usize, String>,
}

static OBJECT_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^mw:(objectAttr|objectAttrKey|objectAttrVal)#(.+)$").unwrap());

fn node_key(node: &HtmlNode) -> usize {
    node as *const _ as usize
}

/// Runs the pre-walk. Fails only on undecodable `data-parsoid`.
pub fn preprocess<'a>(
    root: &'a HtmlNode<'a>,
    has_src: bool,
) -> Result<Preprocessed, SerializeError> {
    let mut out = Preprocessed::default();
    decode_data_parsoid(root)?;
    collect_tpl_attrs(root, &mut out.tpl_attrs);
    coalesce_text(root);
    if has_src {
        float_diff_markers(root);
        extract_separators(root, &mut out);
    } else {
        normalize_block_newlines(root);
    }
    Ok(out)
}

/// Decodes `data-parsoid` JSON into the node's typed record and drops the
/// attribute so the HTML fallback never re-emits it.
fn decode_data_parsoid<'a>(node: &'a HtmlNode<'a>) -> Result<(), SerializeError> {
    let decoded = {
        let mut data = node.data.borrow_mut();
        let NodeValue::Element(ref mut element) = data.value else {
            drop(data);
            for child in node.children() {
                decode_data_parsoid(child)?;
            }
            return Ok(());
        };
        match element
            .attrs
            .iter()
            .position(|(k, _)| k == "data-parsoid")
        {
            Some(ix) => {
                let (_, json) = element.attrs.remove(ix);
                let tag = element.name.clone();
                Some((tag, json))
            }
            None => None,
        }
    };

    if let Some((tag, json)) = decoded {
        let dp: DataParsoid = serde_json::from_str(&json)
            .map_err(|source| SerializeError::InvalidDataParsoid { tag, source })?;
        node.data.borrow_mut().dp = dp;
    }

    for child in node.children() {
        decode_data_parsoid(child)?;
    }
    Ok(())
}

/// Collects `mw:objectAttr*` meta nodes into the shadow table and detaches
/// them; they are bookkeeping, not content.
fn collect_tpl_attrs<'a>(node: &'a HtmlNode<'a>, table: &mut HashMap<String, TplAttrs>) {
    let children: Vec<_> = node.children().collect();
    for child in children {
        if child.is_element_named("meta") {
            let property = child.attr("property").unwrap_or_default();
            if let Some(caps) = OBJECT_ATTR_RE.captures(&property) {
                let Some(about) = child.about() else {
                    warn!("objectAttr meta without about id; dropping");
                    child.detach();
                    continue;
                };
                let Some(src) = child.data.borrow().dp.src.clone() else {
                    warn!("objectAttr meta without recorded source; dropping");
                    child.detach();
                    continue;
                };
                let attr = caps[2].to_string();
                let entry = table.entry(about).or_default();
                match &caps[1] {
                    "objectAttr" => entry.kvs.insert(attr, src),
                    "objectAttrKey" => entry.ks.insert(attr, src),
                    _ => entry.vs.insert(attr, src),
                };
                child.detach();
                continue;
            }
        }
        collect_tpl_attrs(child, table);
    }
}

/// Concatenates adjacent text nodes and removes empty ones.
fn coalesce_text<'a>(node: &'a HtmlNode<'a>) {
    let children: Vec<_> = node.children().collect();
    let mut prev_text: Option<&'a HtmlNode<'a>> = None;
    for child in children {
        let is_text = child.is_text();
        if is_text {
            let content = match child.data.borrow().value {
                NodeValue::Text(ref t) => t.clone(),
                _ => unreachable!(),
            };
            if content.is_empty() {
                child.detach();
                continue;
            }
            if let Some(prev) = prev_text {
                if let NodeValue::Text(ref mut t) = prev.data.borrow_mut().value {
                    t.push_str(&content);
                }
                child.detach();
                continue;
            }
            prev_text = Some(child);
        } else {
            prev_text = None;
            coalesce_text(child);
        }
    }
}

/// Moves `mw:DiffMarker` metas leftward past whitespace runs so they sit
/// against the previous sentinel element and stop splitting separator
/// runs.
fn float_diff_markers<'a>(node: &'a HtmlNode<'a>) {
    let children: Vec<_> = node.children().collect();
    for child in children.iter().copied() {
        if is_diff_marker(child) {
            let mut target: Option<&'a HtmlNode<'a>> = None;
            let mut cursor = child.previous_sibling();
            while let Some(prev) = cursor {
                if is_whitespace_text(prev) {
                    target = Some(prev);
                    cursor = prev.previous_sibling();
                } else {
                    break;
                }
            }
            if let Some(first_ws) = target {
                first_ws.insert_before(child);
            }
        }
    }
    for child in children {
        if child.is_element() {
            float_diff_markers(child);
        }
    }
}

/// Replaces runs of whitespace-only text and comments that sit between
/// element children with side-table entries carrying their concatenated
/// source form. Skipped inside `pre` and entity spans, where whitespace is
/// content.
fn extract_separators<'a>(node: &'a HtmlNode<'a>, out: &mut Preprocessed) {
    let is_container = match node.data.borrow().value {
        NodeValue::Document => true,
        NodeValue::Element(ref e) => {
            e.name != "pre"
                && !(e.name == "span"
                    && e.attr("typeof").is_some_and(|t| t.contains("mw:Entity")))
        }
        _ => false,
    };
    let children: Vec<_> = node.children().collect();

    if is_container && children.iter().any(|c| c.is_element()) {
        let mut run: Vec<&'a HtmlNode<'a>> = Vec::new();
        for child in children.iter().copied() {
            if is_whitespace_text(child) || child_is_comment(child) {
                run.push(child);
                continue;
            }
            if !run.is_empty() {
                if child.is_element() && run_starts_at_boundary(&run) {
                    let sep = run_source(&run);
                    for member in run.drain(..) {
                        member.detach();
                    }
                    out.sep_before.insert(node_key(child), sep);
                } else {
                    run.clear();
                }
            }
        }
        if !run.is_empty() && run_starts_at_boundary(&run) {
            let sep = run_source(&run);
            for member in run.drain(..) {
                member.detach();
            }
            out.sep_trailing.insert(node_key(node), sep);
        }
    }

    for child in node.children() {
        if child.is_element() {
            extract_separators(child, out);
        }
    }
}

/// A run only separates when it is delimited by element children (or the
/// container boundary), not when it trails inline content text.
fn run_starts_at_boundary(run: &[&HtmlNode]) -> bool {
    match run.first().and_then(|first| first.previous_sibling()) {
        None => true,
        Some(prev) => prev.is_element(),
    }
}

fn run_source(run: &[&HtmlNode]) -> String {
    let mut out = String::new();
    for member in run {
        match member.data.borrow().value {
            NodeValue::Text(ref t) => out.push_str(t),
            NodeValue::Comment(ref c) => {
                out.push_str("<!--");
                out.push_str(c);
                out.push_str("-->");
            }
            _ => {}
        }
    }
    out
}

/// Without source, the newlines around block elements are syntactic; the
/// serializer regenerates them, so drop them from neighboring text.
fn normalize_block_newlines<'a>(node: &'a HtmlNode<'a>) {
    let children: Vec<_> = node.children().collect();
    for (ix, child) in children.iter().copied().enumerate() {
        if !child.is_text() {
            if child.is_element() {
                normalize_block_newlines(child);
            }
            continue;
        }
        let next_is_block = children.get(ix + 1).is_some_and(|n| n.is_block());
        let prev_is_block = ix
            .checked_sub(1)
            .and_then(|p| children.get(p))
            .is_some_and(|p| p.is_block());
        if !next_is_block && !prev_is_block {
            continue;
        }
        let mut data = child.data.borrow_mut();
        if let NodeValue::Text(ref mut t) = data.value {
            if next_is_block {
                while t.ends_with('\n') {
                    t.pop();
                }
            }
            if prev_is_block && t.starts_with('\n') {
                let stripped = t.trim_start_matches('\n').to_string();
                *t = stripped;
            }
        }
        drop(data);
        let now_empty = matches!(child.data.borrow().value, NodeValue::Text(ref t) if t.is_empty());
        if now_empty {
            child.detach();
        }
    }
}

fn is_whitespace_text(node: &HtmlNode) -> bool {
    matches!(
        node.data.borrow().value,
        NodeValue::Text(ref t) if !t.is_empty() && t.bytes().all(|b| b.is_ascii_whitespace())
    )
}

fn child_is_comment(node: &HtmlNode) -> bool {
    matches!(node.data.borrow().value, NodeValue::Comment(..))
}

fn is_diff_marker(node: &HtmlNode) -> bool {
    node.is_element_named("meta")
        && node.type_of().as_deref() == Some("mw:DiffMarker")
}
