//! Shared test helpers: build a DOM in an arena, serialize it, compare.

use crate::nodes::{self, DataParsoid, Dsr, HtmlNode};
use crate::{serialize_document, Arena, Env, Options};

mod escaping;
mod figures;
mod headings;
mod links;
mod lists;
mod meta;
mod pre;

pub(crate) fn compare_strs(output: &str, expected: &str, kind: &str) {
    if output != expected {
        println!("Running {} test", kind);
        println!("Got:");
        println!("==============================");
        println!("{}", output);
        println!("==============================");
        println!();
        println!("Expected:");
        println!("==============================");
        println!("{}", expected);
        println!("==============================");
        println!();
    }
    assert_eq!(output, expected);
}

pub(crate) fn body<'a>(arena: &'a Arena<HtmlNode<'a>>) -> &'a HtmlNode<'a> {
    nodes::new_element(arena, "body", vec![])
}

pub(crate) fn el<'a>(arena: &'a Arena<HtmlNode<'a>>, name: &str) -> &'a HtmlNode<'a> {
    nodes::new_element(arena, name, vec![])
}

pub(crate) fn el_attrs<'a>(
    arena: &'a Arena<HtmlNode<'a>>,
    name: &str,
    attrs: &[(&str, &str)],
) -> &'a HtmlNode<'a> {
    nodes::new_element(
        arena,
        name,
        attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

pub(crate) fn text<'a>(arena: &'a Arena<HtmlNode<'a>>, content: &str) -> &'a HtmlNode<'a> {
    nodes::new_text(arena, content)
}

/// Mutates a node's round-trip metadata in place.
pub(crate) fn dp(node: &HtmlNode, f: impl FnOnce(&mut DataParsoid)) {
    f(&mut node.data.borrow_mut().dp);
}

pub(crate) fn set_dsr(node: &HtmlNode, start: usize, end: usize, ow: usize, cw: usize) {
    dp(node, |d| {
        d.dsr = Some(Dsr {
            start: Some(start),
            end: Some(end),
            open_width: Some(ow),
            close_width: Some(cw),
        })
    });
}

pub(crate) fn wt<'a>(root: &'a HtmlNode<'a>) -> String {
    serialize_document(root, &Options::default()).unwrap()
}

pub(crate) fn wt_with_src<'a>(root: &'a HtmlNode<'a>, src: &str) -> String {
    let options = Options {
        env: Env {
            page_src: Some(src.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    serialize_document(root, &options).unwrap()
}
