use super::*;
use crate::nodes::ImgOpt;

fn opt(k: &str, v: Option<&str>) -> ImgOpt {
    ImgOpt {
        k: k.to_string(),
        v: v.map(str::to_string),
    }
}

fn figure_with<'a>(
    arena: &'a Arena<HtmlNode<'a>>,
    opts: Vec<ImgOpt>,
    caption: Option<&str>,
) -> &'a HtmlNode<'a> {
    let root = body(arena);
    let figure = el(arena, "figure");
    dp(figure, |d| d.opt_list = Some(opts));
    root.append(figure);
    let img = el_attrs(arena, "img", &[("resource", "./File:Foo.jpg")]);
    figure.append(img);
    if let Some(caption) = caption {
        let figcaption = el(arena, "figcaption");
        figcaption.append(text(arena, caption));
        figure.append(figcaption);
    }
    root
}

#[test]
fn thumb_with_width_and_caption() {
    let arena = Arena::new();
    let root = figure_with(
        &arena,
        vec![
            opt("format", Some("thumb")),
            opt("width", Some("120")),
            opt("caption", None),
        ],
        Some("A caption"),
    );

    compare_strs(
        &wt(root),
        "[[File:Foo.jpg|thumb|120px|A caption]]",
        "figures/thumb",
    );
}

#[test]
fn width_and_height_pair_up() {
    let arena = Arena::new();
    let root = figure_with(
        &arena,
        vec![
            opt("width", Some("120")),
            opt("height", Some("80")),
            opt("caption", Some("cap")),
        ],
        None,
    );

    compare_strs(&wt(root), "[[File:Foo.jpg|120x80px|cap]]", "figures/size");
}

#[test]
fn trailing_size_flushed_at_end() {
    let arena = Arena::new();
    let root = figure_with(&arena, vec![opt("width", Some("64"))], None);

    compare_strs(&wt(root), "[[File:Foo.jpg|64px]]", "figures/size-last");
}

#[test]
fn alignment_and_prefixed_options() {
    let arena = Arena::new();
    let root = figure_with(
        &arena,
        vec![opt("halign", Some("left")), opt("alt", Some("alt text"))],
        None,
    );

    compare_strs(
        &wt(root),
        "[[File:Foo.jpg|left|alt=alt text]]",
        "figures/options",
    );
}

#[test]
fn figure_without_img_emits_nothing() {
    let arena = Arena::new();
    let root = body(&arena);
    root.append(el(&arena, "figure"));

    compare_strs(&wt(root), "", "figures/malformed");
}
