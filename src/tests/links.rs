use super::*;

fn wikilink<'a>(
    arena: &'a Arena<HtmlNode<'a>>,
    href: &str,
    content: Option<&str>,
) -> &'a HtmlNode<'a> {
    let a = el_attrs(arena, "a", &[("rel", "mw:WikiLink"), ("href", href)]);
    if let Some(content) = content {
        a.append(text(arena, content));
    }
    a
}

fn in_paragraph<'a>(
    arena: &'a Arena<HtmlNode<'a>>,
    children: &[&'a HtmlNode<'a>],
) -> &'a HtmlNode<'a> {
    let root = body(arena);
    let p = el(arena, "p");
    root.append(p);
    for &child in children {
        p.append(child);
    }
    root
}

#[test]
fn simple_link() {
    let arena = Arena::new();
    let a = wikilink(&arena, "./Foo", Some("Foo"));
    let root = in_paragraph(&arena, &[a]);

    compare_strs(&wt(root), "[[Foo]]\n", "links/simple");
}

#[test]
fn simple_by_normalization() {
    let arena = Arena::new();
    let a = wikilink(&arena, "./Foo_bar", Some("Foo bar"));
    let root = in_paragraph(&arena, &[a]);

    compare_strs(&wt(root), "[[Foo_bar]]\n", "links/normalized");
}

#[test]
fn piped_link_with_tail() {
    let arena = Arena::new();
    let a = wikilink(&arena, "./Foo", Some("bars"));
    dp(a, |d| {
        d.stx = Some("piped".to_string());
        d.tail = Some("s".to_string());
    });
    let root = in_paragraph(&arena, &[a]);

    // The trail letter leaves the content: never `[[Foo|bars]]`.
    compare_strs(&wt(root), "[[Foo|bar]]s\n", "links/tail");
}

#[test]
fn category_with_sort_key() {
    let arena = Arena::new();
    let root = body(&arena);
    let link = el_attrs(
        &arena,
        "link",
        &[("rel", "mw:WikiLink/Category"), ("href", "./Category:X#key")],
    );
    root.append(link);

    compare_strs(&wt(root), "[[Category:X|key]]", "links/category");
}

#[test]
fn category_without_sort_key() {
    let arena = Arena::new();
    let root = body(&arena);
    let link = el_attrs(
        &arena,
        "link",
        &[("rel", "mw:WikiLink/Category"), ("href", "./Category:X")],
    );
    root.append(link);

    compare_strs(&wt(root), "[[Category:X]]", "links/category-bare");
}

#[test]
fn pipe_trick_preserved() {
    let arena = Arena::new();
    let a = wikilink(&arena, "./Foo (bar)", Some("Foo"));
    dp(a, |d| d.pipetrick = true);
    let root = in_paragraph(&arena, &[a]);

    compare_strs(&wt(root), "[[Foo (bar)|]]\n", "links/pipetrick");
}

#[test]
fn empty_content_gets_guard() {
    let arena = Arena::new();
    let a = wikilink(&arena, "./Foo", None);
    let root = in_paragraph(&arena, &[a]);

    compare_strs(&wt(root), "[[Foo|<nowiki/>]]\n", "links/empty");
}

#[test]
fn trail_letters_guarded() {
    let arena = Arena::new();
    let a = wikilink(&arena, "./Foo", Some("Foo"));
    let after = text(&arena, "bar");
    let root = in_paragraph(&arena, &[a, after]);

    compare_strs(&wt(root), "[[Foo]]<nowiki/>bar\n", "links/trail");
}

#[test]
fn trail_uppercase_needs_no_guard() {
    let arena = Arena::new();
    let a = wikilink(&arena, "./Foo", Some("Foo"));
    let after = text(&arena, "Bar");
    let root = in_paragraph(&arena, &[a, after]);

    compare_strs(&wt(root), "[[Foo]]Bar\n", "links/trail-upper");
}

#[test]
fn external_link() {
    let arena = Arena::new();
    let a = el_attrs(
        &arena,
        "a",
        &[("rel", "mw:ExtLink"), ("href", "http://example.org")],
    );
    a.append(text(&arena, "label"));
    let root = in_paragraph(&arena, &[a]);

    compare_strs(&wt(root), "[http://example.org label]\n", "links/ext");
}

#[test]
fn numbered_external_link() {
    let arena = Arena::new();
    let a = el_attrs(
        &arena,
        "a",
        &[("rel", "mw:ExtLink/Numbered"), ("href", "http://example.org")],
    );
    a.append(text(&arena, "[1]"));
    let root = in_paragraph(&arena, &[a]);

    compare_strs(&wt(root), "[http://example.org]\n", "links/numbered");
}

#[test]
fn bare_url_link() {
    let arena = Arena::new();
    let a = el_attrs(
        &arena,
        "a",
        &[("rel", "mw:ExtLink/URL"), ("href", "http://example.org")],
    );
    a.append(text(&arena, "http://example.org"));
    let root = in_paragraph(&arena, &[a]);

    compare_strs(&wt(root), "http://example.org\n", "links/url");
}

#[test]
fn isbn_magic_link() {
    let arena = Arena::new();
    let a = el_attrs(
        &arena,
        "a",
        &[("rel", "mw:ExtLink/ISBN"), ("href", "./Special:BookSources")],
    );
    a.append(text(&arena, "ISBN 0-306-40615-2"));
    let root = in_paragraph(&arena, &[a]);

    compare_strs(&wt(root), "ISBN 0-306-40615-2\n", "links/isbn");
}

#[test]
fn interwiki_link() {
    let arena = Arena::new();
    let a = el_attrs(
        &arena,
        "a",
        &[("rel", "mw:WikiLink/Interwiki"), ("href", "./es:Foo")],
    );
    a.append(text(&arena, "es:Foo"));
    let root = in_paragraph(&arena, &[a]);

    compare_strs(&wt(root), "[[es:Foo]]\n", "links/interwiki");
}

#[test]
fn unknown_rel_falls_back_to_html() {
    let arena = Arena::new();
    let a = el_attrs(&arena, "a", &[("href", "http://example.org")]);
    a.append(text(&arena, "label"));
    let root = in_paragraph(&arena, &[a]);

    compare_strs(
        &wt(root),
        "<a href=\"http://example.org\">label</a>\n",
        "links/fallback",
    );
}
