use super::*;

#[test]
fn heading_paragraph_heading_with_source() {
    let src = "= H =\n\nparagraph\n\n= H2 =";
    let arena = Arena::new();
    let root = body(&arena);
    set_dsr(root, 0, 24, 0, 0);

    let h1 = el(&arena, "h1");
    set_dsr(h1, 0, 5, 1, 1);
    h1.append(text(&arena, " H "));
    root.append(h1);

    let p = el(&arena, "p");
    set_dsr(p, 7, 16, 0, 0);
    p.append(text(&arena, "paragraph"));
    root.append(p);

    let h2 = el(&arena, "h1");
    set_dsr(h2, 18, 24, 1, 1);
    h2.append(text(&arena, " H2 "));
    root.append(h2);

    // Blank-line separators come back verbatim from the source ranges.
    compare_strs(&wt_with_src(root, src), src, "headings/source");
}

#[test]
fn sourceless_heading_then_paragraph() {
    let arena = Arena::new();
    let root = body(&arena);
    let h2 = el(&arena, "h2");
    h2.append(text(&arena, "H"));
    root.append(h2);
    let p = el(&arena, "p");
    p.append(text(&arena, "x"));
    root.append(p);

    compare_strs(&wt(root), "==H==\nx\n", "headings/sourceless");
}

#[test]
fn empty_heading_keeps_delimiters_apart() {
    let arena = Arena::new();
    let root = body(&arena);
    root.append(el(&arena, "h2"));

    compare_strs(&wt(root), "==<nowiki/>==\n", "headings/empty");
}

#[test]
fn heading_shaped_content_fenced() {
    let arena = Arena::new();
    let root = body(&arena);
    let h2 = el(&arena, "h2");
    h2.append(text(&arena, "=x="));
    root.append(h2);

    compare_strs(&wt(root), "==<nowiki>=x=</nowiki>==\n", "headings/escape");
}
