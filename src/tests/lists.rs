use super::*;

fn li_with<'a>(arena: &'a Arena<HtmlNode<'a>>, content: &str) -> &'a HtmlNode<'a> {
    let li = el(arena, "li");
    li.append(text(arena, content));
    li
}

#[test]
fn nested_bullets() {
    let arena = Arena::new();
    let root = body(&arena);
    let ul = el(&arena, "ul");
    root.append(ul);

    let li_a = li_with(&arena, " a");
    ul.append(li_a);
    let inner = el(&arena, "ul");
    inner.append(li_with(&arena, " b"));
    li_a.append(inner);
    ul.append(li_with(&arena, " c"));

    compare_strs(&wt(root), "* a\n** b\n* c\n", "lists/nested");
}

#[test]
fn flat_items_break_lines() {
    let arena = Arena::new();
    let root = body(&arena);
    let ul = el(&arena, "ul");
    root.append(ul);
    ul.append(li_with(&arena, " a"));
    ul.append(li_with(&arena, " b"));

    compare_strs(&wt(root), "* a\n* b\n", "lists/flat");
}

#[test]
fn ordered_inside_unordered_shares_line() {
    let arena = Arena::new();
    let root = body(&arena);
    let ul = el(&arena, "ul");
    root.append(ul);
    let li = el(&arena, "li");
    ul.append(li);
    let ol = el(&arena, "ol");
    ol.append(li_with(&arena, " x"));
    li.append(ol);

    compare_strs(&wt(root), "*# x\n", "lists/mixed");
}

#[test]
fn definition_pair_multiline() {
    let arena = Arena::new();
    let root = body(&arena);
    let dl = el(&arena, "dl");
    root.append(dl);
    let dt = el(&arena, "dt");
    dt.append(text(&arena, "t"));
    dl.append(dt);
    let dd = el(&arena, "dd");
    dd.append(text(&arena, "d"));
    dl.append(dd);

    compare_strs(&wt(root), ";t\n:d\n", "lists/dt-dd");
}

#[test]
fn definition_pair_single_line() {
    let arena = Arena::new();
    let root = body(&arena);
    let dl = el(&arena, "dl");
    root.append(dl);
    let dt = el(&arena, "dt");
    dt.append(text(&arena, "t"));
    dl.append(dt);
    let dd = el(&arena, "dd");
    dp(dd, |d| d.stx_v = Some("row".to_string()));
    dd.append(text(&arena, "d"));
    dl.append(dd);

    compare_strs(&wt(root), ";t:d\n", "lists/dt-dd-row");
}

#[test]
fn list_item_text_fenced() {
    let arena = Arena::new();
    let root = body(&arena);
    let ul = el(&arena, "ul");
    root.append(ul);
    ul.append(li_with(&arena, "#looks like a bullet"));

    compare_strs(
        &wt(root),
        "*<nowiki>#looks like a bullet</nowiki>\n",
        "lists/escape",
    );
}
