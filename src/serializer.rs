//! The serializer core: the per-call state record, the DOM walker, the
//! separator engine, and the token serializer.
//!
//! Output is produced in strict document order. Handler-driven newlines
//! are buffered while original source is available so that separators
//! spliced from the source win over synthesized ones.

use std::collections::HashMap;

use log::{trace, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::escape::{escape_wikitext, EscapeContext, LineState};
use crate::handlers::{
    handler_for, serialize_html_end, serialize_html_start, Emit, TokenHandler,
};
use crate::links;
use crate::nodes::{HtmlNode, NodeValue};
use crate::preprocess::{self, Preprocessed};
use crate::strings::escape_entity_prefixes;
use crate::token::{TagData, WtToken};
use crate::{Options, SerializeError};

/// One frame per open native-syntax list.
#[derive(Debug, Clone, Default)]
pub struct ListFrame {
    /// Cumulative bullet prefix including this list's own bullet.
    pub bullets: String,
    /// Bullet of the item currently open at this level.
    pub item_bullet: String,
    /// Items (and nested lists) seen so far at this level.
    pub item_count: u32,
}

/// List and single-line state stashed while a table is open; lists do not
/// cross table boundaries.
#[derive(Debug, Default)]
pub struct TableSnapshot {
    pub list_stack: Vec<ListFrame>,
    pub single_line_mode: u32,
}

/// Template-generated attribute sources for one `about` group.
#[derive(Debug, Clone, Default)]
pub struct TplAttrs {
    /// Whole `key=value` pair sources, by attribute name.
    pub kvs: HashMap<String, String>,
    /// Key-only sources.
    pub ks: HashMap<String, String>,
    /// Value-only sources.
    pub vs: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SepKind {
    Start,
    InterElement,
    End,
}

/// Serializer state, created fresh for every top-level call and threaded
/// mutably through the whole walk.
pub struct State<'a, 'o> {
    pub options: &'o Options,
    /// Original wikitext, when the parser environment provided it.
    pub src: Option<&'o str>,
    out: &'a mut dyn FnMut(&str, Option<&str>),
    serialize_info: Option<&'o str>,
    capture: Vec<String>,

    pub on_newline: bool,
    pub on_start_of_line: bool,
    pub single_line_mode: u32,
    pub list_stack: Vec<ListFrame>,
    pub table_stack: Vec<TableSnapshot>,
    pub wte_handler_stack: Vec<EscapeContext>,
    pub tpl_attrs: HashMap<String, TplAttrs>,
    pub curr_line: LineState,
    pub buffered_separator: Option<String>,
    pub separator_emitted_from_src: bool,
    pub prev_token: Option<WtToken>,
    pub curr_token: Option<WtToken>,
    pub prev_tag_token: Option<WtToken>,
    pub curr_tag_token: Option<WtToken>,
    pub in_nowiki: bool,
    pub in_html_pre: bool,
    pub in_indent_pre: bool,
    /// Sliding window of the last emitted characters, for apostrophe
    /// adjacency checks.
    pub last_res: String,
    pub active_template_id: Option<String>,
    /// Depth of suppressed paragraph pairs.
    pub ignore_p_tag: u32,

    sep_before: HashMap<usize, String>,
    sep_trailing: HashMap<usize, String>,
}

static SEP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^(?:\s|<!--.*?-->)*$").unwrap());

const LAST_RES_WINDOW: usize = 100;

fn node_key(node: &HtmlNode) -> usize {
    node as *const _ as usize
}

/// Serializes a preprocessed DOM to wikitext chunks.
pub fn serialize_dom<'d>(
    root: &'d HtmlNode<'d>,
    options: &Options,
    on_chunk: &mut dyn FnMut(&str, Option<&str>),
) -> Result<(), SerializeError> {
    let Preprocessed {
        tpl_attrs,
        sep_before,
        sep_trailing,
    } = preprocess::preprocess(root, options.env.page_src.is_some())?;

    let mut state = State::new(options, on_chunk);
    state.tpl_attrs = tpl_attrs;
    state.sep_before = sep_before;
    state.sep_trailing = sep_trailing;

    state.serialize_node(root)?;
    state.serialize_token(WtToken::Eof)?;
    state.flush_buffered();

    debug_assert!(state.list_stack.is_empty());
    debug_assert!(state.table_stack.is_empty());
    debug_assert!(state.wte_handler_stack.is_empty());
    Ok(())
}

impl<'a, 'o> State<'a, 'o> {
    fn new(options: &'o Options, out: &'a mut dyn FnMut(&str, Option<&str>)) -> Self {
        State {
            options,
            src: options.env.page_src.as_deref(),
            out,
            serialize_info: options.serialize_info.as_deref(),
            capture: Vec::new(),
            on_newline: true,
            on_start_of_line: true,
            single_line_mode: 0,
            list_stack: Vec::new(),
            table_stack: Vec::new(),
            wte_handler_stack: Vec::new(),
            tpl_attrs: HashMap::new(),
            curr_line: LineState::default(),
            buffered_separator: None,
            separator_emitted_from_src: false,
            prev_token: None,
            curr_token: None,
            prev_tag_token: None,
            curr_tag_token: None,
            in_nowiki: false,
            in_html_pre: false,
            in_indent_pre: false,
            last_res: String::new(),
            active_template_id: None,
            ignore_p_tag: 0,
            sep_before: HashMap::new(),
            sep_trailing: HashMap::new(),
        }
    }

    pub fn has_src(&self) -> bool {
        self.src.is_some()
    }

    // -- chunk emission ----------------------------------------------------

    fn push_out(&mut self, s: &str) {
        if let Some(buf) = self.capture.last_mut() {
            buf.push_str(s);
            return;
        }
        (self.out)(s, self.serialize_info);
        self.last_res.push_str(s);
        if self.last_res.len() > LAST_RES_WINDOW {
            let cut = self.last_res.len() - LAST_RES_WINDOW;
            let cut = (cut..self.last_res.len())
                .find(|i| self.last_res.is_char_boundary(*i))
                .unwrap_or(cut);
            self.last_res.drain(..cut);
        }
    }

    fn flush_buffered(&mut self) {
        if let Some(sep) = self.buffered_separator.take() {
            self.push_out(&sep);
        }
    }

    /// Emits content, flushing any pending buffered separator first.
    pub fn emit_content(&mut self, s: &str, sol_transparent: bool) {
        if s.is_empty() {
            return;
        }
        self.flush_buffered();
        self.push_out(s);
        if s.ends_with('\n') {
            self.on_newline = true;
            self.on_start_of_line = true;
        } else if sol_transparent {
            self.on_newline = false;
        } else {
            self.on_newline = false;
            self.on_start_of_line = false;
        }
    }

    /// Queues a handler-driven newline. While source is available it sits
    /// in the one-slot buffer so a spliced separator can supersede it.
    fn buffer_newline(&mut self) {
        if self.src.is_some() {
            self.buffered_separator
                .get_or_insert_with(String::new)
                .push('\n');
        } else {
            self.push_out("\n");
        }
        self.on_newline = true;
        self.on_start_of_line = true;
    }

    fn emit_separator_text(&mut self, s: &str) {
        self.buffered_separator = None;
        self.separator_emitted_from_src = true;
        if self.options.env.trace {
            trace!("separator from source: {:?}", s);
        }
        if s.is_empty() {
            return;
        }
        self.push_out(s);
        self.on_newline = s.ends_with('\n');
        self.on_start_of_line = self.on_newline;
    }

    /// Serializes `node`'s children into a string instead of the output,
    /// optionally under an extra escape context and with start-of-line
    /// state cleared (link delimiters precede the content).
    pub fn capture_children<'d>(
        &mut self,
        node: &'d HtmlNode<'d>,
        ctx: Option<EscapeContext>,
    ) -> Result<String, SerializeError> {
        let pushed = ctx.is_some();
        if let Some(ctx) = ctx {
            self.wte_handler_stack.push(ctx);
        }
        let (nl, sol) = (self.on_newline, self.on_start_of_line);
        self.on_newline = false;
        self.on_start_of_line = false;
        self.capture.push(String::new());

        let mut result = Ok(());
        for child in node.children() {
            result = self.serialize_node(child);
            if result.is_err() {
                break;
            }
        }

        let buf = self.capture.pop().unwrap_or_default();
        if pushed {
            self.wte_handler_stack.pop();
        }
        self.on_newline = nl;
        self.on_start_of_line = sol;
        result.map(|_| buf)
    }

    // -- DOM walker --------------------------------------------------------

    pub fn serialize_node<'d>(&mut self, node: &'d HtmlNode<'d>) -> Result<(), SerializeError> {
        enum Kind {
            Document,
            Element,
            Text(String),
            Comment(String),
        }
        let kind = match node.data.borrow().value {
            NodeValue::Document => Kind::Document,
            NodeValue::Element(..) => Kind::Element,
            NodeValue::Text(ref t) => Kind::Text(t.clone()),
            NodeValue::Comment(ref c) => Kind::Comment(c.clone()),
        };
        match kind {
            Kind::Document => self.serialize_children(node),
            Kind::Element => self.serialize_element(node),
            Kind::Text(text) => {
                if !self.curr_line.processed {
                    self.gather_line(node);
                }
                self.serialize_token(WtToken::Text(text))
            }
            Kind::Comment(comment) => self.serialize_token(WtToken::Comment(comment)),
        }
    }

    fn serialize_element<'d>(&mut self, node: &'d HtmlNode<'d>) -> Result<(), SerializeError> {
        let (name, attrs, dp) = {
            let data = node.data.borrow();
            match data.value {
                NodeValue::Element(ref e) => (e.name.clone(), e.attrs.clone(), data.dp.clone()),
                _ => unreachable!(),
            }
        };
        let about = node.about();
        let type_of = node.type_of().unwrap_or_default();

        // Template-generated content: the invocation source is emitted once
        // and the expanded subtree skipped for as long as the about id
        // matches.
        if let Some(active) = self.active_template_id.clone() {
            if about.as_deref() == Some(active.as_str()) {
                if self.options.env.trace {
                    trace!("skipping template content for {}", active);
                }
                return Ok(());
            }
            self.active_template_id = None;
        }
        if type_of.starts_with("mw:Object") {
            self.active_template_id = about.clone();
            let mut tag = TagData::named("mw:TemplateSource");
            tag.dp = dp;
            return self.serialize_token(WtToken::SelfClosing(tag));
        }

        // Node-level handlers bypass token emission entirely.
        match name.as_str() {
            "a" | "link" => {
                if links::serialize_link(self, node)? {
                    return Ok(());
                }
            }
            "figure" => return links::serialize_figure(self, node),
            "span" => {
                if self.serialize_generated_span(node, &type_of)? {
                    return Ok(());
                }
            }
            _ => {}
        }

        if node.is_block() {
            self.curr_line.reset();
        }

        let tag = TagData {
            name: name.clone(),
            attrs,
            dp: dp.clone(),
            about,
            parent: node.parent().and_then(|p| p.element_name()),
            inherited_html: inherits_html(node, &name),
        };

        let void = crate::constants::VOID_ELEMENTS.contains(name.as_str());
        if void || dp.self_close {
            return self.serialize_token(WtToken::SelfClosing(tag));
        }

        self.serialize_token(WtToken::StartTag(tag.clone()))?;

        // Wikitext strips the first newline of an HTML pre; restore it.
        if name == "pre" && dp.is_html_syntax() {
            if dp.stripped_nl {
                self.emit_content("\n", false);
            }
            if let Some(first) = node.first_child() {
                let starts_with_nl = matches!(
                    first.data.borrow().value,
                    NodeValue::Text(ref t) if t.starts_with('\n')
                );
                if starts_with_nl {
                    self.emit_content("\n", false);
                }
            }
        }

        self.serialize_children(node)?;

        if node.is_block() {
            self.curr_line.reset();
        }

        self.serialize_token(WtToken::EndTag(tag))
    }

    fn serialize_children<'d>(&mut self, parent: &'d HtmlNode<'d>) -> Result<(), SerializeError> {
        let mut prev_elem: Option<&'d HtmlNode<'d>> = None;
        let mut pending_meta_sep: Option<String> = None;

        for child in parent.children() {
            if is_separator_meta(child) {
                pending_meta_sep = child.attr("data-sep");
                continue;
            }
            let sentinel = child.is_element() && !is_diff_marker(child);
            if sentinel {
                match prev_elem {
                    None => self.emit_separator(
                        parent,
                        child,
                        SepKind::Start,
                        pending_meta_sep.take(),
                    ),
                    Some(prev) => self.emit_separator(
                        prev,
                        child,
                        SepKind::InterElement,
                        pending_meta_sep.take(),
                    ),
                }
            }
            self.serialize_node(child)?;
            if sentinel {
                prev_elem = Some(child);
            }
        }

        if let Some(last) = prev_elem {
            self.emit_separator(last, parent, SepKind::End, pending_meta_sep.take());
        }
        Ok(())
    }

    /// Emits the inner text of a generated-content span (`mw:Nowiki`,
    /// `mw:Entity`, `mw:DiffMarker`), or reports that the span is ordinary.
    fn serialize_generated_span<'d>(
        &mut self,
        node: &'d HtmlNode<'d>,
        type_of: &str,
    ) -> Result<bool, SerializeError> {
        if type_of.contains("mw:Nowiki") {
            self.in_nowiki = true;
            for child in node.children() {
                self.serialize_node(child)?;
            }
            self.in_nowiki = false;
            return Ok(true);
        }
        if type_of.contains("mw:Entity") {
            let text = match node.data.borrow().dp.src.clone() {
                Some(src) => src,
                None => inline_text(node),
            };
            self.emit_content(&text, false);
            return Ok(true);
        }
        if type_of.contains("mw:DiffMarker") {
            self.emit_content(&inline_text(node), false);
            return Ok(true);
        }
        Ok(false)
    }

    /// Fills the line accumulator with the inline text of the enclosing
    /// block, so the escape engine can reason about the whole line even
    /// when it is assembled from several pieces.
    fn gather_line<'d>(&mut self, text_node: &'d HtmlNode<'d>) {
        let block = text_node
            .ancestors()
            .skip(1)
            .find(|a| a.is_block())
            .unwrap_or(text_node);
        let mut text = String::new();
        let mut pieces = 0;
        collect_inline_text(block, &mut text, &mut pieces);
        self.curr_line.text = text;
        self.curr_line.num_pieces = pieces;
        self.curr_line.analyze(self.on_start_of_line);
    }

    // -- separator engine --------------------------------------------------

    fn emit_separator<'d>(
        &mut self,
        n1: &'d HtmlNode<'d>,
        n2: &'d HtmlNode<'d>,
        kind: SepKind,
        meta_sep: Option<String>,
    ) {
        let recorded = meta_sep.or_else(|| match kind {
            SepKind::Start | SepKind::InterElement => {
                self.sep_before.get(&node_key(n2)).cloned()
            }
            SepKind::End => self.sep_trailing.get(&node_key(n2)).cloned(),
        });
        if let Some(sep) = recorded {
            if SEP_RE.is_match(&sep) {
                self.emit_separator_text(&sep);
                return;
            }
            warn!("recorded separator is not whitespace/comments; ignoring");
        }

        let Some(src) = self.src else { return };
        let d1 = n1.data.borrow().dp.dsr;
        let d2 = n2.data.borrow().dp.dsr;
        let range = match (kind, d1, d2) {
            (SepKind::Start, Some(d1), Some(d2)) => d1
                .start
                .zip(d1.open_width)
                .map(|(s, w)| s + w)
                .zip(d2.start),
            (SepKind::InterElement, Some(d1), Some(d2)) => d1.end.zip(d2.start),
            (SepKind::End, Some(d1), Some(d2)) => {
                d1.end.zip(d2.end.zip(d2.close_width).map(|(e, w)| e.saturating_sub(w)))
            }
            _ => None,
        };
        let Some((i1, i2)) = range else { return };
        if i1 > i2 || i2 > src.len() || !src.is_char_boundary(i1) || !src.is_char_boundary(i2) {
            return;
        }
        let span = &src[i1..i2];
        if SEP_RE.is_match(span) {
            let span = span.to_string();
            self.emit_separator_text(&span);
        }
    }

    // -- token serializer --------------------------------------------------

    pub fn serialize_token(&mut self, token: WtToken) -> Result<(), SerializeError> {
        self.prev_token = self.curr_token.replace(token.clone());
        if token.tag().is_some() {
            self.prev_tag_token = self.curr_tag_token.replace(token.clone());
        }

        match token {
            WtToken::Text(ref t) => {
                self.serialize_text(t);
                Ok(())
            }
            WtToken::Comment(ref c) => {
                // Comments are start-of-line transparent.
                let text = format!("<!--{}-->", c);
                self.emit_content(&text, true);
                Ok(())
            }
            WtToken::Newline => {
                self.emit_content("\n", false);
                Ok(())
            }
            WtToken::Eof => Ok(()),
            WtToken::StartTag(ref tag) | WtToken::EndTag(ref tag)
            | WtToken::SelfClosing(ref tag) => {
                let tag = tag.clone();
                self.serialize_tag_token(&token, &tag)
            }
        }
    }

    fn serialize_tag_token(
        &mut self,
        token: &WtToken,
        tag: &TagData,
    ) -> Result<(), SerializeError> {
        // Synthesized template-source tokens carry verbatim wikitext.
        if tag.name.starts_with("mw:") {
            if let Some(src) = tag.dp.src.clone() {
                self.emit_content(&src, false);
            } else {
                warn!("template subtree with no recorded source; emitting nothing");
            }
            return Ok(());
        }

        let is_end = matches!(token, WtToken::EndTag(..));
        let native = if tag.uses_html_syntax() {
            None
        } else {
            handler_for(&tag.name)
        };

        let Some(handler) = native else {
            return self.serialize_html_fallback(token, tag, is_end);
        };

        let th: Option<&TokenHandler> = if is_end {
            handler.end.as_ref()
        } else {
            handler.start.as_ref()
        };

        if !is_end {
            if let Some(ctx) = handler.escape_context {
                if matches!(token, WtToken::StartTag(..)) {
                    self.wte_handler_stack.push(ctx(tag));
                }
            }
        }

        if let Some(th) = th {
            if !th.ignore {
                self.apply_token_handler(th, tag, is_end);
            }
        }

        if is_end && handler.escape_context.is_some() {
            self.wte_handler_stack.pop();
        }
        Ok(())
    }

    fn apply_token_handler(&mut self, th: &TokenHandler, tag: &TagData, is_end: bool) {
        let emit = match th.handle {
            Some(f) => f(self, tag),
            None => Emit::empty(),
        };
        let starts_line = emit.starts_line.unwrap_or(th.starts_line);
        let ends_line = emit.ends_line.unwrap_or(th.ends_line);

        // Auto-inserted tags produce no output but still update state.
        let suppressed = (!is_end && tag.dp.auto_inserted_start)
            || (is_end && tag.dp.auto_inserted_end);

        if !suppressed {
            if starts_line && !self.on_start_of_line && self.single_line_mode == 0 {
                self.buffer_newline();
            }
            if !emit.text.is_empty() {
                self.emit_content(&emit.text, th.sol_transparent);
            }
            if th.emits_nl {
                self.emit_content("\n", false);
            }
            if ends_line && !self.on_newline {
                self.buffer_newline();
            }
        }

        if th.single_line > 0 {
            self.single_line_mode += th.single_line as u32;
        } else if th.single_line < 0 {
            self.single_line_mode = self
                .single_line_mode
                .saturating_sub((-th.single_line) as u32);
        }
    }

    fn serialize_html_fallback(
        &mut self,
        token: &WtToken,
        tag: &TagData,
        is_end: bool,
    ) -> Result<(), SerializeError> {
        let text = if is_end {
            serialize_html_end(tag)
        } else {
            serialize_html_start(self, tag)
        };
        self.emit_content(&text, false);
        if tag.name == "pre" {
            self.in_html_pre = matches!(token, WtToken::StartTag(..));
        }
        Ok(())
    }

    fn serialize_text(&mut self, raw: &str) {
        let mut text = escape_entity_prefixes(raw);
        if !self.in_nowiki && !self.in_html_pre {
            let ctx = self.wte_handler_stack.last().cloned();
            text = escape_wikitext(
                &text,
                self.on_start_of_line,
                ctx.as_ref(),
                self.in_indent_pre,
                &self.curr_line,
            );
        }
        if self.in_indent_pre {
            text = indent_pre_transform(&text);
            if self.on_start_of_line && !text.starts_with(' ') {
                text.insert(0, ' ');
            }
        }
        if self.single_line_mode > 0 {
            text = text.replace('\n', "");
        }
        self.emit_content(&text, false);
    }
}

/// Prefixes every interior newline with a space, keeping an indent-pre's
/// lines inside the block.
fn indent_pre_transform(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        out.push(c);
        if c == '\n' && i + 1 < text.len() {
            out.push(' ');
        }
    }
    out
}

fn is_separator_meta(node: &HtmlNode) -> bool {
    node.is_element_named("meta")
        && node.type_of().as_deref() == Some("mw:Separator")
}

fn is_diff_marker(node: &HtmlNode) -> bool {
    node.is_element_named("meta")
        && node.type_of().as_deref() == Some("mw:DiffMarker")
}

fn inline_text<'d>(node: &'d HtmlNode<'d>) -> String {
    let mut out = String::new();
    let mut pieces = 0;
    collect_inline_text(node, &mut out, &mut pieces);
    out
}

fn collect_inline_text<'d>(node: &'d HtmlNode<'d>, out: &mut String, pieces: &mut usize) {
    for child in node.children() {
        let is_text = {
            let data = child.data.borrow();
            match data.value {
                NodeValue::Text(ref t) => {
                    out.push_str(t);
                    *pieces += 1;
                    true
                }
                _ => false,
            }
        };
        if !is_text && child.is_element() && !child.is_block() {
            collect_inline_text(child, out, pieces);
        }
    }
}

/// Structural children written without their own syntax marker inherit
/// HTML syntax from the enclosing table or list.
fn inherits_html<'d>(node: &'d HtmlNode<'d>, name: &str) -> bool {
    if node.data.borrow().dp.stx.is_some() {
        return false;
    }
    let group: &[&str] = match name {
        "tbody" | "tr" | "td" | "th" | "caption" => &["table"],
        "li" => &["ul", "ol"],
        "dt" | "dd" => &["dl"],
        _ => return false,
    };
    for ancestor in node.ancestors().skip(1) {
        let Some(ancestor_name) = ancestor.element_name() else {
            continue;
        };
        if group.contains(&ancestor_name.as_str()) {
            return ancestor.data.borrow().dp.is_html_syntax();
        }
    }
    false
}
