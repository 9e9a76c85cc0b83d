//! Link and figure reconstruction.
//!
//! Anchors, category/language/interwiki `<link>`s, and figures bypass the
//! token pipeline: they serialize their whole subtree into a string and
//! emit it directly, because the wikitext form depends on comparing the
//! rendered content against the link target.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{PREFIX_IMG_OPTIONS_RM, SIMPLE_IMG_OPTIONS};
use crate::escape::EscapeContext;
use crate::nodes::{HtmlNode, ImgOpt, NodeValue};
use crate::serializer::State;
use crate::SerializeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkType {
    Wikilink,
    Category,
    Language,
    Interwiki,
    ExtLink,
    Numbered,
    Url,
    Magic,
}

fn link_type(rel: &str) -> Option<LinkType> {
    if rel.contains("mw:WikiLink/Category") {
        Some(LinkType::Category)
    } else if rel.contains("mw:WikiLink/Language") {
        Some(LinkType::Language)
    } else if rel.contains("mw:WikiLink/Interwiki") {
        Some(LinkType::Interwiki)
    } else if rel.contains("mw:WikiLink") {
        Some(LinkType::Wikilink)
    } else if rel.contains("mw:ExtLink/Numbered") {
        Some(LinkType::Numbered)
    } else if rel.contains("mw:ExtLink/URL") {
        Some(LinkType::Url)
    } else if rel.contains("mw:ExtLink/ISBN")
        || rel.contains("mw:ExtLink/RFC")
        || rel.contains("mw:ExtLink/PMID")
    {
        Some(LinkType::Magic)
    } else if rel.contains("mw:ExtLink") {
        Some(LinkType::ExtLink)
    } else {
        None
    }
}

/// Serializes an `<a>` or `<link>` node. Returns `false` when the `rel`
/// names no link type we understand, in which case the caller falls back
/// to HTML serialization.
pub fn serialize_link<'d>(
    state: &mut State<'_, '_>,
    node: &'d HtmlNode<'d>,
) -> Result<bool, SerializeError> {
    let rel = node.attr("rel").unwrap_or_default();
    let Some(ty) = link_type(&rel) else {
        // TODO: decide whether near-simple anchors without round-trip
        // metadata should downgrade to `[url text]` instead of raw HTML;
        // for now everything unknown takes the HTML path.
        return Ok(false);
    };

    let dp = node.data.borrow().dp.clone();
    let href = shadow_value(state, node, "href");

    match ty {
        LinkType::Wikilink | LinkType::Category | LinkType::Language | LinkType::Interwiki => {
            let mut target = href.strip_prefix("./").unwrap_or(&href).to_string();

            let mut content;
            if ty == LinkType::Category {
                // The sort key travels in the fragment.
                match target.split_once('#') {
                    Some((t, key)) => {
                        content = key.to_string();
                        target = t.to_string();
                    }
                    None => content = String::new(),
                }
            } else {
                content = state.capture_children(node, Some(EscapeContext::Wikilink))?;
            }

            // Tail/prefix recovery: peel recorded trail characters off the
            // content so `[[Foo|bar]]s` does not become `[[Foo|bars]]`.
            let mut tail = String::new();
            let mut prefix = String::new();
            if let Some(t) = dp.tail.as_deref() {
                if !t.is_empty() && content.ends_with(t) {
                    content.truncate(content.len() - t.len());
                    tail = t.to_string();
                }
            }
            if let Some(p) = dp.prefix.as_deref() {
                if !p.is_empty() && content.starts_with(p) {
                    content = content[p.len()..].to_string();
                    prefix = p.to_string();
                }
            }

            let was_piped = dp.stx.as_deref() == Some("piped") || dp.pipetrick;
            let can_use_simple = if ty == LinkType::Category {
                content.is_empty()
            } else {
                titles_match(state, &content, &target) && !was_piped
            };
            let can_use_pipe_trick = dp.pipetrick
                && titles_match(state, &content, &strip_pipe_trick_chars(&target));

            let mut res = String::new();
            res.push_str(&prefix);
            res.push_str("[[");
            res.push_str(&target);
            if can_use_simple {
                // Bare target.
            } else if can_use_pipe_trick {
                res.push('|');
            } else if content.is_empty() {
                // Guard against pre-save-transform filling the empty pipe.
                res.push_str("|<nowiki/>");
            } else {
                res.push('|');
                res.push_str(&content);
            }
            res.push_str("]]");
            res.push_str(&tail);
            state.emit_content(&res, false);

            if ty != LinkType::Category {
                emit_tail_guard(state, node);
            }
        }
        LinkType::ExtLink => {
            let content = state.capture_children(node, Some(EscapeContext::Link))?;
            state.emit_content(&format!("[{} {}]", href, content), false);
        }
        LinkType::Numbered => {
            state.emit_content(&format!("[{}]", href), false);
        }
        LinkType::Url => {
            state.emit_content(&href, false);
        }
        LinkType::Magic => {
            // ISBN/RFC/PMID links round-trip as their bare text.
            state.emit_content(&raw_inner_text(node), false);
        }
    }
    Ok(true)
}

/// A wikilink immediately followed by trail letters would absorb them on
/// re-parse; an empty nowiki keeps them out of the link.
fn emit_tail_guard<'d>(state: &mut State<'_, '_>, node: &'d HtmlNode<'d>) {
    let follows_with_trail = node.next_sibling().is_some_and(|next| {
        matches!(
            next.data.borrow().value,
            NodeValue::Text(ref t) if t.starts_with(|c: char| c.is_ascii_lowercase())
        )
    });
    if follows_with_trail {
        state.emit_content("<nowiki/>", false);
    }
}

fn titles_match(state: &State<'_, '_>, content: &str, target: &str) -> bool {
    if content == target {
        return true;
    }
    let options = state.options;
    options.normalize_title(content, false) == options.normalize_title(target, false)
        || options.normalize_title(content, true) == options.normalize_title(target, true)
}

static PAREN_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?) \([^)]*\)$").unwrap());

/// The pipe trick's hidden-text rule: drop the namespace prefix and any
/// parenthesized or comma suffix.
fn strip_pipe_trick_chars(target: &str) -> String {
    let no_ns = match target.split_once(':') {
        Some((_, rest)) => rest,
        None => target,
    };
    if let Some(caps) = PAREN_SUFFIX_RE.captures(no_ns) {
        return caps[1].to_string();
    }
    match no_ns.split_once(", ") {
        Some((head, _)) => head.to_string(),
        None => no_ns.to_string(),
    }
}

fn shadow_value(state: &State<'_, '_>, node: &HtmlNode, attr: &str) -> String {
    let raw = node.attr(attr).unwrap_or_default();
    if let Some(about) = node.about() {
        if let Some(shadow) = state.tpl_attrs.get(&about) {
            if let Some(src) = shadow.vs.get(attr) {
                return src.clone();
            }
        }
    }
    raw
}

fn raw_inner_text<'d>(node: &'d HtmlNode<'d>) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text<'d>(node: &'d HtmlNode<'d>, out: &mut String) {
    for child in node.children() {
        let recurse = {
            let data = child.data.borrow();
            match data.value {
                NodeValue::Text(ref t) => {
                    out.push_str(t);
                    false
                }
                NodeValue::Element(..) => true,
                _ => false,
            }
        };
        if recurse {
            collect_text(child, out);
        }
    }
}

// ---------------------------------------------------------------------------
// Figures

/// Reconstructs a `[[File:…|opt|…|caption]]` link from a `<figure>`.
pub fn serialize_figure<'d>(
    state: &mut State<'_, '_>,
    node: &'d HtmlNode<'d>,
) -> Result<(), SerializeError> {
    let Some(img) = find_img(node) else {
        warn!("figure without an <img>; emitting nothing");
        return Ok(());
    };
    let resource_raw = shadow_value(state, img, "resource");
    let resource = resource_raw
        .strip_prefix("./")
        .unwrap_or(&resource_raw)
        .to_string();

    let figure_dp = node.data.borrow().dp.clone();
    let opt_list = match figure_dp.opt_list {
        Some(list) => list,
        None => img.data.borrow().dp.opt_list.clone().unwrap_or_default(),
    };
    let caption_node = node
        .last_child()
        .filter(|last| last.is_element_named("figcaption"));

    let mut opts: Vec<String> = Vec::new();
    let mut pending_size: Option<(Option<String>, Option<String>)> = None;

    for ImgOpt { k, v } in &opt_list {
        let is_size = k == "width" || k == "height";
        if !is_size {
            flush_size(&mut opts, &mut pending_size);
        }
        match k.as_str() {
            "width" => {
                pending_size.get_or_insert((None, None)).0 = v.clone();
            }
            "height" => {
                pending_size.get_or_insert((None, None)).1 = v.clone();
            }
            "caption" => {
                let text = match v {
                    Some(literal) => literal.clone(),
                    None => match caption_node {
                        Some(caption) => {
                            state.capture_children(caption, Some(EscapeContext::Anchor))?
                        }
                        None => String::new(),
                    },
                };
                opts.push(text);
            }
            _ => {
                let value = v.clone().unwrap_or_default();
                let simple_key = format!("img_{}", value);
                if SIMPLE_IMG_OPTIONS.get(&simple_key).copied() == Some(k.as_str()) {
                    opts.push(value);
                } else if let Some(template) = PREFIX_IMG_OPTIONS_RM.get(k.as_str()) {
                    opts.push(template.replace("$1", &value));
                } else {
                    warn!("unrecognized image option {}={:?}; dropping", k, v);
                }
            }
        }
    }
    flush_size(&mut opts, &mut pending_size);

    let mut res = String::from("[[");
    res.push_str(&resource);
    for opt in &opts {
        res.push('|');
        res.push_str(opt);
    }
    res.push_str("]]");
    state.emit_content(&res, false);
    Ok(())
}

/// Width and height arrive as separate options but serialize as one;
/// the pair is flushed only once the next non-size option (or the end of
/// the list) proves both dimensions have been seen.
fn flush_size(opts: &mut Vec<String>, pending: &mut Option<(Option<String>, Option<String>)>) {
    if let Some((w, h)) = pending.take() {
        let text = match (w, h) {
            (Some(w), Some(h)) => format!("{}x{}px", w, h),
            (Some(w), None) => format!("{}px", w),
            (None, Some(h)) => format!("x{}px", h),
            (None, None) => return,
        };
        opts.push(text);
    }
}

fn find_img<'d>(node: &'d HtmlNode<'d>) -> Option<&'d HtmlNode<'d>> {
    for child in node.children() {
        if child.is_element_named("img") {
            return Some(child);
        }
        if child.is_element() {
            if let Some(img) = find_img(child) {
                return Some(img);
            }
        }
    }
    None
}
