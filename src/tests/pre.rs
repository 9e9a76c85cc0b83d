use super::*;

#[test]
fn indent_pre_spaces_every_line() {
    let arena = Arena::new();
    let root = body(&arena);
    let pre = el(&arena, "pre");
    pre.append(text(&arena, " a\nb"));
    root.append(pre);

    compare_strs(&wt(root), " a\n b\n", "pre/indent");
}

#[test]
fn indent_pre_supplies_leading_space() {
    let arena = Arena::new();
    let root = body(&arena);
    let pre = el(&arena, "pre");
    pre.append(text(&arena, "a\nb"));
    root.append(pre);

    compare_strs(&wt(root), " a\n b\n", "pre/indent-lead");
}

#[test]
fn indent_pre_text_still_escaped() {
    let arena = Arena::new();
    let root = body(&arena);
    let pre = el(&arena, "pre");
    pre.append(text(&arena, "a ''b'' c"));
    root.append(pre);

    // Markup stays live inside an indent-pre; the whole run is fenced.
    compare_strs(&wt(root), " <nowiki>a ''b'' c</nowiki>\n", "pre/escape");
}

#[test]
fn html_pre_duplicates_leading_newline() {
    let arena = Arena::new();
    let root = body(&arena);
    let pre = el(&arena, "pre");
    dp(pre, |d| d.stx = Some("html".to_string()));
    pre.append(text(&arena, "\nfoo"));
    root.append(pre);

    compare_strs(&wt(root), "<pre>\n\nfoo</pre>", "pre/html-nl");
}

#[test]
fn html_pre_restores_stripped_newline() {
    let arena = Arena::new();
    let root = body(&arena);
    let pre = el(&arena, "pre");
    dp(pre, |d| {
        d.stx = Some("html".to_string());
        d.stripped_nl = true;
    });
    pre.append(text(&arena, "foo"));
    root.append(pre);

    compare_strs(&wt(root), "<pre>\nfoo</pre>", "pre/html-stripped");
}

#[test]
fn html_pre_content_not_escaped() {
    let arena = Arena::new();
    let root = body(&arena);
    let pre = el(&arena, "pre");
    dp(pre, |d| d.stx = Some("html".to_string()));
    pre.append(text(&arena, "* ''raw'' {{stuff}}"));
    root.append(pre);

    compare_strs(
        &wt(root),
        "<pre>* ''raw'' {{stuff}}</pre>",
        "pre/html-raw",
    );
}
