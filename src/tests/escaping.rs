use super::*;
use ntest::test_case;

fn paragraph_wt(content: &str) -> String {
    let arena = Arena::new();
    let root = body(&arena);
    let p = el(&arena, "p");
    p.append(text(&arena, content));
    root.append(p);
    wt(root)
}

#[test_case("just words, nothing special.", "just words, nothing special.\n")]
#[test_case("1 + 1 = 2", "1 + 1 = 2\n")]
#[test_case("foo ''bar''", "<nowiki>foo ''bar''</nowiki>\n")]
#[test_case("* not a list", "<nowiki>* not a list</nowiki>\n")]
#[test_case("a {{b}} c", "<nowiki>a {{b}} c</nowiki>\n")]
#[test_case("sign here ~~~~", "<nowiki>sign here ~~~~</nowiki>\n")]
#[test_case("see [[Foo]]", "<nowiki>see [[Foo]]</nowiki>\n")]
fn paragraph_text(input: &str, expected: &str) {
    compare_strs(&paragraph_wt(input), expected, "escaping/paragraph");
}

#[test]
fn entities_always_reescaped() {
    compare_strs(
        &paragraph_wt("five &amp; six & seven"),
        "five &amp;amp; six & seven\n",
        "escaping/entities",
    );
}

#[test]
fn nowiki_literals_become_entities() {
    compare_strs(
        &paragraph_wt("a <nowiki>b</nowiki> c"),
        "a &lt;nowiki&gt;b&lt;/nowiki&gt; c\n",
        "escaping/nowiki-literal",
    );
}

#[test]
fn unknown_tags_are_harmless() {
    compare_strs(
        &paragraph_wt("a <madeup>tag</madeup> b"),
        "a <madeup>tag</madeup> b\n",
        "escaping/unknown-tag",
    );
}

#[test]
fn line_pieces_fence_heading_fragments() {
    let arena = Arena::new();
    let root = body(&arena);
    let p = el(&arena, "p");
    p.append(text(&arena, "=x "));
    let b = el(&arena, "b");
    b.append(text(&arena, "y"));
    p.append(b);
    p.append(text(&arena, " z="));
    root.append(p);

    // Fencing the leading piece is enough: the line no longer starts
    // with a heading delimiter, so the trailing `=` is inert.
    compare_strs(
        &wt(root),
        "<nowiki>=x </nowiki>'''y''' z=\n",
        "escaping/pieces",
    );
}
