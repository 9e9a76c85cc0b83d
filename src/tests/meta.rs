use super::*;

#[test]
fn nowiki_tag_pair() {
    let arena = Arena::new();
    let root = body(&arena);
    let p = el(&arena, "p");
    root.append(p);
    p.append(el_attrs(
        &arena,
        "meta",
        &[("typeof", "mw:tag"), ("content", "nowiki")],
    ));
    p.append(text(&arena, "''x''"));
    p.append(el_attrs(
        &arena,
        "meta",
        &[("typeof", "mw:tag"), ("content", "/nowiki")],
    ));

    compare_strs(&wt(root), "<nowiki>''x''</nowiki>\n", "meta/nowiki");
}

#[test]
fn page_prop_magic_word() {
    let arena = Arena::new();
    let root = body(&arena);
    root.append(el_attrs(
        &arena,
        "meta",
        &[("property", "mw:PageProp/notoc")],
    ));

    compare_strs(&wt(root), "__NOTOC__", "meta/pageprop");
}

#[test]
fn page_prop_keeps_recorded_spelling() {
    let arena = Arena::new();
    let root = body(&arena);
    let meta = el_attrs(&arena, "meta", &[("property", "mw:PageProp/notoc")]);
    dp(meta, |d| d.magic_src = Some("__NoToC__".to_string()));
    root.append(meta);

    compare_strs(&wt(root), "__NoToC__", "meta/pageprop-src");
}

#[test]
fn includeonly_uses_recorded_source() {
    let arena = Arena::new();
    let root = body(&arena);
    let meta = el_attrs(&arena, "meta", &[("typeof", "mw:IncludeOnly")]);
    dp(meta, |d| d.src = Some("<includeonly>x</includeonly>".to_string()));
    root.append(meta);

    compare_strs(&wt(root), "<includeonly>x</includeonly>", "meta/include");
}

#[test]
fn noinclude_pair_defaults() {
    let arena = Arena::new();
    let root = body(&arena);
    root.append(el_attrs(&arena, "meta", &[("typeof", "mw:NoInclude")]));
    root.append(el_attrs(&arena, "meta", &[("typeof", "mw:NoInclude/End")]));

    compare_strs(&wt(root), "<noinclude></noinclude>", "meta/noinclude");
}

#[test]
fn nowiki_span_emits_inner_text_raw() {
    let arena = Arena::new();
    let root = body(&arena);
    let p = el(&arena, "p");
    root.append(p);
    let span = el_attrs(&arena, "span", &[("typeof", "mw:Nowiki")]);
    span.append(text(&arena, "''x''"));
    p.append(span);

    compare_strs(&wt(root), "''x''\n", "meta/nowiki-span");
}

#[test]
fn entity_span_prefers_source() {
    let arena = Arena::new();
    let root = body(&arena);
    let p = el(&arena, "p");
    root.append(p);
    let span = el_attrs(&arena, "span", &[("typeof", "mw:Entity")]);
    dp(span, |d| d.src = Some("&nbsp;".to_string()));
    span.append(text(&arena, "\u{a0}"));
    p.append(span);

    compare_strs(&wt(root), "&nbsp;\n", "meta/entity-span");
}

#[test]
fn diff_and_separator_markers_suppressed() {
    let arena = Arena::new();
    let root = body(&arena);
    let p = el(&arena, "p");
    root.append(p);
    p.append(text(&arena, "a"));
    p.append(el_attrs(&arena, "meta", &[("typeof", "mw:DiffMarker")]));
    p.append(text(&arena, "b"));

    compare_strs(&wt(root), "ab\n", "meta/markers");
}
