//! Per-element wikitext emission.
//!
//! Every serializable element has a [`TagHandler`] record: a `start` and an
//! `end` entry with line-position flags, plus an optional escape context
//! that governs text runs inside the element. Handlers are immutable
//! statics; anything position-dependent is returned in the [`Emit`] value
//! rather than written back into the handler.
//!
//! Elements without a registered handler, and elements whose metadata says
//! they were written with HTML tag syntax, fall through to the default
//! HTML tag serializer at the bottom of this module.

use crate::constants::VOID_ELEMENTS;
use crate::escape::EscapeContext;
use crate::serializer::{ListFrame, State, TableSnapshot};
use crate::strings::escape_attr_value;
use crate::token::{TagData, WtToken};

/// What a handler produced: the text to emit and, when the construct is
/// position-dependent, overrides for the handler's static line flags.
#[derive(Debug, Default)]
pub struct Emit {
    pub text: String,
    pub starts_line: Option<bool>,
    pub ends_line: Option<bool>,
}

impl Emit {
    pub fn text(text: impl Into<String>) -> Self {
        Emit {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Emit::default()
    }

    fn on_own_line(text: impl Into<String>) -> Self {
        Emit {
            text: text.into(),
            starts_line: Some(true),
            ..Default::default()
        }
    }

    fn inline(text: impl Into<String>) -> Self {
        Emit {
            text: text.into(),
            starts_line: Some(false),
            ..Default::default()
        }
    }
}

pub type HandleFn = for<'a, 'o, 's> fn(&'s mut State<'a, 'o>, &TagData) -> Emit;

/// One direction (start or end) of a tag handler.
pub struct TokenHandler {
    pub handle: Option<HandleFn>,
    pub starts_line: bool,
    pub ends_line: bool,
    pub emits_nl: bool,
    pub single_line: i8,
    pub ignore: bool,
    pub sol_transparent: bool,
}

impl TokenHandler {
    const fn of(handle: HandleFn) -> Self {
        TokenHandler {
            handle: Some(handle),
            starts_line: false,
            ends_line: false,
            emits_nl: false,
            single_line: 0,
            ignore: false,
            sol_transparent: false,
        }
    }

    const fn flags() -> Self {
        TokenHandler {
            handle: None,
            starts_line: false,
            ends_line: false,
            emits_nl: false,
            single_line: 0,
            ignore: false,
            sol_transparent: false,
        }
    }

    const fn ignored() -> Self {
        let mut th = Self::flags();
        th.ignore = true;
        th
    }

    const fn starts_line(mut self) -> Self {
        self.starts_line = true;
        self
    }

    const fn ends_line(mut self) -> Self {
        self.ends_line = true;
        self
    }

    const fn single_line(mut self, delta: i8) -> Self {
        self.single_line = delta;
        self
    }

    const fn sol_transparent(mut self) -> Self {
        self.sol_transparent = true;
        self
    }
}

/// A registered element handler.
pub struct TagHandler {
    pub start: Option<TokenHandler>,
    pub end: Option<TokenHandler>,
    /// Escape context pushed while the element's content serializes.
    pub escape_context: Option<fn(&TagData) -> EscapeContext>,
}

/// Looks up the native-syntax handler for an element name.
pub fn handler_for(name: &str) -> Option<&'static TagHandler> {
    match name {
        "b" | "i" => Some(&QUOTE),
        "body" => Some(&BODY),
        "br" => Some(&BR),
        "caption" => Some(&CAPTION),
        "dd" | "dt" | "li" => Some(&LIST_ITEM),
        "dl" => Some(&DL),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(&HEADING),
        "hr" => Some(&HR),
        "meta" => Some(&META),
        "ol" => Some(&OL),
        "p" => Some(&P),
        "pre" => Some(&PRE),
        "table" => Some(&TABLE),
        "tbody" => Some(&TBODY),
        "td" => Some(&TD),
        "th" => Some(&TH),
        "tr" => Some(&TR),
        "ul" => Some(&UL),
        _ => None,
    }
}

static BODY: TagHandler = TagHandler {
    start: Some(TokenHandler::ignored()),
    end: Some(TokenHandler::ignored()),
    escape_context: None,
};

static TBODY: TagHandler = TagHandler {
    start: Some(TokenHandler::ignored()),
    end: Some(TokenHandler::ignored()),
    escape_context: None,
};

// ---------------------------------------------------------------------------
// Headings

static HEADING: TagHandler = TagHandler {
    start: Some(TokenHandler::of(heading_start).starts_line()),
    end: Some(TokenHandler::of(heading_end).ends_line()),
    escape_context: Some(heading_ctx),
};

fn heading_ctx(_: &TagData) -> EscapeContext {
    EscapeContext::Heading
}

fn heading_level(name: &str) -> usize {
    usize::from(name.as_bytes()[1] - b'0')
}

fn heading_start(_state: &mut State, tag: &TagData) -> Emit {
    Emit::text("=".repeat(heading_level(&tag.name)))
}

fn heading_end(state: &mut State, tag: &TagData) -> Emit {
    let delims = "=".repeat(heading_level(&tag.name));
    // An empty heading's delimiters would fuse into one run on re-parse.
    let empty = state
        .prev_token
        .as_ref()
        .is_some_and(|t| t.is_start_of(&tag.name));
    if empty {
        Emit::text(format!("<nowiki/>{}", delims))
    } else {
        Emit::text(delims)
    }
}

// ---------------------------------------------------------------------------
// Lists

static UL: TagHandler = TagHandler {
    start: Some(TokenHandler::of(ul_start)),
    end: Some(TokenHandler::of(list_end).ends_line()),
    escape_context: None,
};

static OL: TagHandler = TagHandler {
    start: Some(TokenHandler::of(ol_start)),
    end: Some(TokenHandler::of(list_end).ends_line()),
    escape_context: None,
};

static DL: TagHandler = TagHandler {
    start: Some(TokenHandler::of(dl_start)),
    end: Some(TokenHandler::of(list_end).ends_line()),
    escape_context: None,
};

// Item ends emit nothing: a following item supplies its own line break
// (the repeat-token rule), and `;term:def` pairs must stay on one line.
static LIST_ITEM: TagHandler = TagHandler {
    start: Some(TokenHandler::of(list_item_start)),
    end: Some(TokenHandler::flags()),
    escape_context: Some(list_item_ctx),
};

fn list_item_ctx(_: &TagData) -> EscapeContext {
    EscapeContext::ListItem
}

fn ul_start(state: &mut State, tag: &TagData) -> Emit {
    list_start(state, tag, "*")
}

fn ol_start(state: &mut State, tag: &TagData) -> Emit {
    list_start(state, tag, "#")
}

fn dl_start(state: &mut State, tag: &TagData) -> Emit {
    list_start(state, tag, "")
}

fn list_start(state: &mut State, _tag: &TagData, bullet: &str) -> Emit {
    // Lists end the single-line constraint of an enclosing table cell.
    if state.single_line_mode > 0 {
        state.single_line_mode -= 1;
    }

    if state.list_stack.is_empty() {
        state.list_stack.push(ListFrame {
            bullets: bullet.to_string(),
            item_bullet: String::new(),
            item_count: 0,
        });
        return Emit::on_own_line(bullet);
    }

    let prev_is_item_start = state.prev_token.as_ref().is_some_and(|t| {
        matches!(t, WtToken::StartTag(td) if matches!(td.name.as_str(), "li" | "dt" | "dd"))
    });
    let cur = state.list_stack.last_mut().unwrap();
    let bullets = format!("{}{}{}", cur.bullets, cur.item_bullet, bullet);
    cur.item_count += 1;
    // A nested list right after its item's bullet stays on that line;
    // anywhere else it needs the full prefix on a fresh line.
    let nested_mid_list = cur.item_count > 1 && !prev_is_item_start;
    let emit = if nested_mid_list {
        Emit::on_own_line(bullets.clone())
    } else {
        Emit::inline(bullet)
    };
    state.list_stack.push(ListFrame {
        bullets,
        item_bullet: String::new(),
        item_count: 0,
    });
    emit
}

fn list_end(state: &mut State, _tag: &TagData) -> Emit {
    state.list_stack.pop();
    Emit::empty()
}

fn item_bullet(name: &str) -> &'static str {
    match name {
        "dt" => ";",
        "dd" => ":",
        _ => "",
    }
}

fn list_item_start(state: &mut State, tag: &TagData) -> Emit {
    let bullet = item_bullet(&tag.name);
    let Some(cur) = state.list_stack.last_mut() else {
        return Emit::text(bullet);
    };
    cur.item_count += 1;
    cur.item_bullet = bullet.to_string();
    let full_prefix = format!("{}{}", cur.bullets, bullet);
    let item_count = cur.item_count;

    let repeated = state
        .prev_token
        .as_ref()
        .is_some_and(|t| t.is_end_of(&tag.name));
    let multiline_dt_dd = tag.name == "dd"
        && !tag.dp.is_row_syntax()
        && state
            .prev_tag_token
            .as_ref()
            .is_some_and(|t| t.is_end_of("dt"));

    if item_count > 1 && (state.on_start_of_line || repeated || multiline_dt_dd) {
        Emit::on_own_line(full_prefix)
    } else {
        Emit::inline(bullet)
    }
}

// ---------------------------------------------------------------------------
// Tables

static TABLE: TagHandler = TagHandler {
    start: Some(TokenHandler::of(table_start).starts_line()),
    end: Some(TokenHandler::of(table_end).starts_line().ends_line()),
    escape_context: None,
};

static TR: TagHandler = TagHandler {
    start: Some(TokenHandler::of(tr_start)),
    end: Some(TokenHandler::flags()),
    escape_context: None,
};

static TD: TagHandler = TagHandler {
    start: Some(TokenHandler::of(td_start).single_line(1)),
    end: Some(TokenHandler::flags().single_line(-1)),
    escape_context: Some(td_ctx),
};

static TH: TagHandler = TagHandler {
    start: Some(TokenHandler::of(th_start).single_line(1)),
    end: Some(TokenHandler::flags().single_line(-1)),
    escape_context: Some(th_ctx),
};

static CAPTION: TagHandler = TagHandler {
    start: Some(TokenHandler::of(caption_start).starts_line().single_line(1)),
    end: Some(TokenHandler::flags().single_line(-1)),
    escape_context: Some(td_ctx),
};

fn td_ctx(tag: &TagData) -> EscapeContext {
    EscapeContext::TableCell {
        open_width_one: tag
            .dp
            .dsr
            .is_some_and(|d| d.open_width == Some(1)),
        row_syntax: tag.dp.is_row_syntax(),
        has_attrs: has_real_attrs(tag),
    }
}

fn th_ctx(_: &TagData) -> EscapeContext {
    EscapeContext::TableHeader
}

fn has_real_attrs(tag: &TagData) -> bool {
    tag.attrs
        .iter()
        .any(|(k, _)| k != "about" && k != "typeof")
}

fn table_start(state: &mut State, tag: &TagData) -> Emit {
    // Lists do not cross table boundaries; stash and clear.
    state.table_stack.push(TableSnapshot {
        list_stack: std::mem::take(&mut state.list_stack),
        single_line_mode: state.single_line_mode,
    });
    state.single_line_mode = 0;

    let open = tag.dp.start_tag_src.clone().unwrap_or_else(|| "{|".to_string());
    let attrs = serialize_attributes(state, tag);
    if attrs.is_empty() {
        Emit::text(open)
    } else {
        let sep = tag.dp.attr_sep_src.as_deref().unwrap_or(" ");
        Emit::text(format!("{}{}{}", open, sep, attrs))
    }
}

fn table_end(state: &mut State, tag: &TagData) -> Emit {
    if let Some(snapshot) = state.table_stack.pop() {
        state.list_stack = snapshot.list_stack;
        state.single_line_mode = snapshot.single_line_mode;
    }
    Emit::text(tag.dp.end_tag_src.clone().unwrap_or_else(|| "|}".to_string()))
}

fn tr_start(state: &mut State, tag: &TagData) -> Emit {
    let implicit_first_row = tag.dp.start_tag_src.is_none()
        && state
            .prev_token
            .as_ref()
            .is_some_and(|t| t.is_start_of("tbody") || t.is_start_of("table"));
    if implicit_first_row {
        return Emit::inline("");
    }

    let open = tag.dp.start_tag_src.clone().unwrap_or_else(|| "|-".to_string());
    let attrs = serialize_attributes(state, tag);
    if attrs.is_empty() {
        Emit::on_own_line(open)
    } else {
        Emit::on_own_line(format!("{} {}", open, attrs))
    }
}

fn td_start(state: &mut State, tag: &TagData) -> Emit {
    cell_start(state, tag, "|", "||")
}

fn th_start(state: &mut State, tag: &TagData) -> Emit {
    cell_start(state, tag, "!", "!!")
}

fn cell_start(state: &mut State, tag: &TagData, sol_sep: &str, row_sep: &str) -> Emit {
    let row_syntax = tag.dp.is_row_syntax();
    let sep = match tag.dp.start_tag_src.clone() {
        Some(src) => src,
        None if row_syntax => row_sep.to_string(),
        None => sol_sep.to_string(),
    };
    let attrs = serialize_attributes(state, tag);
    let text = if attrs.is_empty() {
        sep
    } else {
        // With attributes the cell body needs its own delimiter.
        format!("{}{}|", sep, attrs)
    };
    if row_syntax {
        Emit::inline(text)
    } else {
        Emit::on_own_line(text)
    }
}

fn caption_start(state: &mut State, tag: &TagData) -> Emit {
    let open = tag.dp.start_tag_src.clone().unwrap_or_else(|| "|+".to_string());
    let attrs = serialize_attributes(state, tag);
    if attrs.is_empty() {
        Emit::text(open)
    } else {
        Emit::text(format!("{}{}|", open, attrs))
    }
}

// ---------------------------------------------------------------------------
// Paragraphs and breaks

static P: TagHandler = TagHandler {
    start: Some(TokenHandler::of(p_start).starts_line()),
    end: Some(TokenHandler::of(p_end).ends_line()),
    escape_context: None,
};

static BR: TagHandler = TagHandler {
    start: Some(TokenHandler::of(br_start)),
    end: Some(TokenHandler::flags()),
    escape_context: None,
};

static HR: TagHandler = TagHandler {
    start: Some(TokenHandler::of(hr_start).starts_line()),
    end: Some(TokenHandler::flags()),
    escape_context: None,
};

fn p_suppressed(tag: &TagData) -> bool {
    matches!(
        tag.parent.as_deref(),
        Some("li") | Some("dt") | Some("dd") | Some("td")
    )
}

fn p_start(state: &mut State, tag: &TagData) -> Emit {
    if p_suppressed(tag) {
        state.ignore_p_tag += 1;
        return Emit::inline("");
    }
    if state.has_src() {
        // The separator engine reconstructs the paragraph's blank lines.
        return Emit::on_own_line("");
    }
    let after_sibling_break = state.prev_tag_token.as_ref().is_some_and(|t| {
        t.is_end_of("p") || matches!(t, WtToken::SelfClosing(td) if td.name == "br")
    });
    if after_sibling_break {
        // A single newline already separates us from the previous block.
        Emit::on_own_line("\n")
    } else {
        Emit::on_own_line("")
    }
}

fn p_end(state: &mut State, tag: &TagData) -> Emit {
    if state.ignore_p_tag > 0 && p_suppressed(tag) {
        state.ignore_p_tag -= 1;
        return Emit {
            text: String::new(),
            starts_line: None,
            ends_line: Some(false),
        };
    }
    Emit::empty()
}

fn br_start(_state: &mut State, _tag: &TagData) -> Emit {
    Emit::text("\n")
}

fn hr_start(_state: &mut State, tag: &TagData) -> Emit {
    let dashes = "-".repeat(4 + tag.dp.extra_dashes.unwrap_or(0));
    Emit {
        text: dashes,
        starts_line: Some(true),
        // `----text` keeps trailing content on the rule's line.
        ends_line: Some(!tag.dp.line_content),
    }
}

// ---------------------------------------------------------------------------
// Preformatted text

static PRE: TagHandler = TagHandler {
    start: Some(TokenHandler::of(pre_start).starts_line()),
    end: Some(TokenHandler::of(pre_end).ends_line()),
    escape_context: None,
};

fn pre_start(state: &mut State, _tag: &TagData) -> Emit {
    // Indent-pre: the text transform opens every line with a space.
    state.in_indent_pre = true;
    Emit::empty()
}

fn pre_end(state: &mut State, _tag: &TagData) -> Emit {
    state.in_indent_pre = false;
    Emit::empty()
}

// ---------------------------------------------------------------------------
// Inline formatting

static QUOTE: TagHandler = TagHandler {
    start: Some(TokenHandler::of(quote_start)),
    end: Some(TokenHandler::of(quote_end)),
    escape_context: Some(quote_ctx),
};

fn quote_ctx(_: &TagData) -> EscapeContext {
    EscapeContext::Quote
}

fn quote_delims(name: &str) -> &'static str {
    if name == "b" {
        "'''"
    } else {
        "''"
    }
}

fn quote_start(state: &mut State, tag: &TagData) -> Emit {
    let delims = quote_delims(&tag.name);
    // Five apostrophes just before us would merge with ours on re-parse.
    if state.last_res.ends_with("'''''") {
        Emit::text(format!("<nowiki/>{}", delims))
    } else {
        Emit::text(delims)
    }
}

fn quote_end(_state: &mut State, tag: &TagData) -> Emit {
    Emit::text(quote_delims(&tag.name))
}

// ---------------------------------------------------------------------------
// Meta markers

static META: TagHandler = TagHandler {
    start: Some(TokenHandler::of(meta_start).sol_transparent()),
    end: Some(TokenHandler::flags()),
    escape_context: None,
};

fn meta_start(state: &mut State, tag: &TagData) -> Emit {
    let type_of = tag
        .attrs
        .iter()
        .find(|(k, _)| k == "typeof")
        .map(|(_, v)| v.as_str())
        .unwrap_or("");
    let property = tag
        .attrs
        .iter()
        .find(|(k, _)| k == "property")
        .map(|(_, v)| v.as_str())
        .unwrap_or("");

    match type_of {
        "mw:tag" => {
            let content = tag
                .attrs
                .iter()
                .find(|(k, _)| k == "content")
                .map(|(_, v)| v.as_str())
                .unwrap_or("");
            match content {
                "nowiki" => {
                    state.in_nowiki = true;
                    Emit::text("<nowiki>")
                }
                "/nowiki" => {
                    state.in_nowiki = false;
                    Emit::text("</nowiki>")
                }
                other => Emit::text(format!("<{}>", other)),
            }
        }
        "mw:IncludeOnly" => include_tag(tag, "<includeonly>"),
        "mw:IncludeOnly/End" => include_tag(tag, "</includeonly>"),
        "mw:NoInclude" => include_tag(tag, "<noinclude>"),
        "mw:NoInclude/End" => include_tag(tag, "</noinclude>"),
        "mw:OnlyInclude" => include_tag(tag, "<onlyinclude>"),
        "mw:OnlyInclude/End" => include_tag(tag, "</onlyinclude>"),
        // Separators and diff markers are handled out of band.
        "mw:DiffMarker" | "mw:Separator" => Emit::empty(),
        _ => {
            if let Some(name) = property.strip_prefix("mw:PageProp/") {
                let word = match tag.dp.magic_src.clone() {
                    Some(src) => src,
                    None => format!("__{}__", name.to_ascii_uppercase()),
                };
                Emit::text(word)
            } else {
                Emit::text(serialize_html_start(state, tag))
            }
        }
    }
}

fn include_tag(tag: &TagData, fallback: &str) -> Emit {
    Emit::text(tag.dp.src.clone().unwrap_or_else(|| fallback.to_string()))
}

// ---------------------------------------------------------------------------
// Default HTML tag serialization

/// Serializes attributes, substituting template-generated sources from the
/// shadow table when the element belongs to a template's `about` group.
/// `data-parsoid` never reaches this point; the preprocessor strips it.
pub fn serialize_attributes(state: &State, tag: &TagData) -> String {
    let shadow = tag
        .about
        .as_ref()
        .and_then(|about| state.tpl_attrs.get(about));
    let mut out = String::new();
    for (k, v) in &tag.attrs {
        if !out.is_empty() {
            out.push(' ');
        }
        if let Some(shadow) = shadow {
            if let Some(src) = shadow.kvs.get(k) {
                out.push_str(src);
                continue;
            }
            let key = shadow.ks.get(k).map(String::as_str).unwrap_or(k);
            let value = shadow.vs.get(k).map(String::as_str).unwrap_or(v);
            push_attr(&mut out, key, value);
            continue;
        }
        push_attr(&mut out, k, v);
    }
    out
}

fn push_attr(out: &mut String, key: &str, value: &str) {
    if value.is_empty() {
        out.push_str(key);
    } else {
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attr_value(value));
        out.push('"');
    }
}

/// Emits an opening HTML tag. An auto-inserted start produces nothing,
/// even for a self-closing tag.
pub fn serialize_html_start(state: &State, tag: &TagData) -> String {
    if tag.dp.auto_inserted_start {
        return String::new();
    }
    let close = if tag.dp.self_close || VOID_ELEMENTS.contains(tag.name.as_str()) {
        "/"
    } else {
        ""
    };
    let attrs = serialize_attributes(state, tag);
    if attrs.is_empty() {
        format!("<{}{}>", tag.name, close)
    } else {
        format!("<{} {}{}>", tag.name, attrs, close)
    }
}

/// Emits a closing HTML tag, or nothing for void/self-closed/auto-inserted
/// elements.
pub fn serialize_html_end(tag: &TagData) -> String {
    if tag.dp.auto_inserted_end
        || tag.dp.self_close
        || tag.dp.no_close
        || VOID_ELEMENTS.contains(tag.name.as_str())
    {
        return String::new();
    }
    format!("</{}>", tag.name)
}
