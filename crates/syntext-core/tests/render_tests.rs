//! End-to-end tests: source text in, HTML out.

use pretty_assertions::assert_eq;
use rstest::rstest;
use syntext_core::ast::Block;
use syntext_core::{
    render, ErrorKind, Highlighter, MetaValue, RenderOptions, Result, TagCall, TagHandler,
};

fn html(input: &str) -> String {
    render(input, &RenderOptions::default()).unwrap().html
}

fn error_kind(input: &str) -> (ErrorKind, u32) {
    let err = render(input, &RenderOptions::default()).unwrap_err();
    (err.kind(), err.line())
}

// ============================================================================
// Basic Documents
// ============================================================================

#[test]
fn test_heading_and_paragraph() {
    assert_eq!(
        html("# Title\n\nHello *world*."),
        "<h1 id=\"title\">Title</h1>\n<p>Hello <em>world</em>.</p>"
    );
}

#[test]
fn test_empty_input() {
    assert_eq!(html(""), "");
    assert_eq!(html("\n\n   \n"), "");
}

#[test]
fn test_plain_text_is_escaped_once() {
    assert_eq!(html("just some words"), "<p>just some words</p>");
    assert_eq!(html("a < b & c"), "<p>a &lt; b &amp; c</p>");
}

#[test]
fn test_entity_is_not_double_escaped() {
    assert_eq!(html("Fish &amp; chips"), "<p>Fish &amp; chips</p>");
    assert_eq!(html("&#169; &copy;"), "<p>&#169; &copy;</p>");
}

#[test]
fn test_output_is_deterministic() {
    let input = "# A\n\n* x\n* y\n\nText[^].\n\n::: footnote\n    Note.\n\n::: insert toc";
    let first = html(input);
    for _ in 0..5 {
        assert_eq!(html(input), first);
    }
}

#[test]
fn test_leading_indent_is_not_content() {
    assert_eq!(html("  indented text"), "<p>indented text</p>");
}

// ============================================================================
// Headings
// ============================================================================

#[rstest]
#[case("# One", "<h1 id=\"one\">One</h1>")]
#[case("### Three ###", "<h3 id=\"three\">Three</h3>")]
#[case("Title\n=====", "<h1 id=\"title\">Title</h1>")]
#[case("Sub\n---", "<h2 id=\"sub\">Sub</h2>")]
#[case("=====\nBoxed\n=====", "<h1 id=\"boxed\">Boxed</h1>")]
#[case("-----\nBoxed\n-----", "<h2 id=\"boxed\">Boxed</h2>")]
#[case("# 2024 Plans", "<h1 id=\"id-2024-plans\">2024 Plans</h1>")]
fn test_heading_forms(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(html(input), expected);
}

#[test]
fn test_duplicate_anchors_get_suffixes() {
    assert_eq!(
        html("# Intro\n\n# Intro\n\n# Intro"),
        "<h1 id=\"intro\">Intro</h1>\n<h1 id=\"intro-2\">Intro</h1>\n<h1 id=\"intro-3\">Intro</h1>"
    );
}

#[test]
fn test_decoration_line_is_dropped() {
    assert_eq!(html("=====\n\ntext"), "<p>text</p>");
}

#[test]
fn test_tagged_heading_uses_explicit_id() {
    assert_eq!(
        html("::: h2 #custom\n    Custom Heading"),
        "<h2 id=\"custom\">Custom Heading</h2>"
    );
}

// ============================================================================
// Lists
// ============================================================================

#[test]
fn test_compact_list() {
    assert_eq!(
        html("* a\n* b"),
        "<ul>\n<li>a</li>\n<li>b</li>\n</ul>"
    );
}

#[test]
fn test_marker_family_change_starts_new_list() {
    assert_eq!(
        html("* a\n* b\n- c\n- d"),
        "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n<ul>\n<li>c</li>\n<li>d</li>\n</ul>"
    );
}

#[test]
fn test_blank_line_makes_block_list() {
    assert_eq!(
        html("* a\n\n* b"),
        "<ul>\n<li>\n<p>a</p>\n</li>\n<li>\n<p>b</p>\n</li>\n</ul>"
    );
}

#[test]
fn test_single_item_list_is_block() {
    assert_eq!(html("* only"), "<ul>\n<li>\n<p>only</p>\n</li>\n</ul>");
}

#[test]
fn test_ordered_list_start() {
    assert_eq!(
        html("3. c\n4. d"),
        "<ol start=\"3\">\n<li>c</li>\n<li>d</li>\n</ol>"
    );
    assert_eq!(html("#. a\n#. b"), "<ol>\n<li>a</li>\n<li>b</li>\n</ol>");
}

#[test]
fn test_nested_list() {
    assert_eq!(
        html("* a\n  * b\n  * c\n* d"),
        "<ul>\n<li>a\n<ul>\n<li>b</li>\n<li>c</li>\n</ul>\n</li>\n<li>d</li>\n</ul>"
    );
}

#[test]
fn test_bracket_list_is_always_block() {
    assert_eq!(
        html("(*) one\n(*) two"),
        "<ul>\n<li>\n<p>one</p>\n</li>\n<li>\n<p>two</p>\n</li>\n</ul>"
    );
}

#[test]
fn test_definition_list() {
    assert_eq!(
        html("[[ Term ]]\n    Meaning."),
        "<dl>\n<dt>Term</dt>\n<dd>Meaning.</dd>\n</dl>"
    );
}

// ============================================================================
// Inline Spans
// ============================================================================

#[test]
fn test_inline_formatting() {
    assert_eq!(
        html("**bold**, ***both***, `a<b`, ``ver*b*``"),
        "<p><strong>bold</strong>, <strong><em>both</em></strong>, <code>a&lt;b</code>, <code>ver*b*</code></p>"
    );
}

#[test]
fn test_dashes_and_scripts() {
    assert_eq!(
        html("a -- b --- c x^{2} H_{2}O"),
        "<p>a &ndash; b &mdash; c x<sup>2</sup> H<sub>2</sub>O</p>"
    );
}

#[test]
fn test_links_and_autolinks() {
    assert_eq!(
        html("[site](http://u.org \"T\") and <https://x.org>"),
        "<p><a href=\"http://u.org\" title=\"T\">site</a> and <a href=\"https://x.org\">https://x.org</a></p>"
    );
}

#[test]
fn test_inline_html_passes_through() {
    assert_eq!(html("a <span>x</span> b"), "<p>a <span>x</span> b</p>");
}

#[rstest]
#[case("*open", "<p>*open</p>")]
#[case("**open", "<p>**open</p>")]
#[case(r"\*not\*", "<p>*not*</p>")]
#[case("`open", "<p>`open</p>")]
fn test_unmatched_delimiters_are_literal(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(html(input), expected);
}

#[test]
fn test_escaped_marker_is_not_a_list() {
    assert_eq!(html(r"\* not a list"), "<p>* not a list</p>");
}

#[test]
fn test_nested_verbatim_drops_block_indent() {
    assert_eq!(
        html("::: div\n    ``a\n    b``"),
        "<div>\n<p><code>a\nb</code></p>\n</div>"
    );
}

#[test]
fn test_soft_break_joins_lines() {
    assert_eq!(html("one\ntwo"), "<p>one\ntwo</p>");
}

// ============================================================================
// References
// ============================================================================

#[test]
fn test_reference_defined_after_use() {
    assert_eq!(
        html("See [the site][ref].\n\n[ref]: http://example.com"),
        "<p>See <a href=\"http://example.com\">the site</a>.</p>"
    );
}

#[test]
fn test_reference_with_title_on_next_line() {
    assert_eq!(
        html("[x][Ref]\n\n[ref]:\n    http://x.org\n    \"Title\""),
        "<p><a href=\"http://x.org\" title=\"Title\">x</a></p>"
    );
}

#[test]
fn test_empty_label_uses_link_text() {
    assert_eq!(
        html("[Rust][]\n\n[rust]: https://rust-lang.org"),
        "<p><a href=\"https://rust-lang.org\">Rust</a></p>"
    );
}

#[test]
fn test_unresolved_reference_is_plain_text() {
    assert_eq!(html("[text][nope]"), "<p>text</p>");
    assert_eq!(html("![alt][nope]"), "<p>alt</p>");
}

#[test]
fn test_image_reference() {
    assert_eq!(
        html("![logo][]\n\n![logo]: /img/logo.png"),
        "<p><img src=\"/img/logo.png\" alt=\"logo\"></p>"
    );
}

#[test]
fn test_image_reference_falls_back_to_links() {
    assert_eq!(
        html("![pic][p]\n\n[p]: /p.png"),
        "<p><img src=\"/p.png\" alt=\"pic\"></p>"
    );
}

// ============================================================================
// Footnotes
// ============================================================================

#[test]
fn test_auto_numbered_footnotes() {
    let input = "Alpha[^] and beta[^].\n\n::: footnote\n    First note.\n\n::: footnote\n    Second note.";
    assert_eq!(
        html(input),
        "<p>Alpha<sup class=\"footnote-ref\" id=\"fnref:1\"><a href=\"#fn:1\">1</a></sup> \
and beta<sup class=\"footnote-ref\" id=\"fnref:2\"><a href=\"#fn:2\">2</a></sup>.</p>\n\
<dl class=\"footnotes\">\n\
<div id=\"fn:1\"><dt><a href=\"#fnref:1\">1</a></dt><dd>First note.</dd></div>\n\
<div id=\"fn:2\"><dt><a href=\"#fnref:2\">2</a></dt><dd>Second note.</dd></div>\n\
</dl>"
    );
}

#[test]
fn test_repeated_reference_has_one_backlink_anchor() {
    let out = html("A[^n] B[^n]\n\n::: footnote n\n    Named.");
    assert_eq!(out.matches("id=\"fnref:n\"").count(), 1);
    assert_eq!(out.matches("href=\"#fn:n\"").count(), 2);
}

#[test]
fn test_undefined_footnote_has_no_link() {
    assert_eq!(
        html("See[^missing]."),
        "<p>See<sup class=\"footnote-ref\">missing</sup>.</p>"
    );
}

#[test]
fn test_second_footnote_insert_is_empty() {
    let out = html(
        "::: insert footnotes\n\nText[^].\n\n::: footnote\n    Note.\n\n::: insert footnotes",
    );
    assert_eq!(out.matches("<dl class=\"footnotes\">").count(), 1);
    assert_eq!(out.matches("id=\"fn:1\"").count(), 1);
}

#[test]
fn test_footnote_insert_position() {
    let out = html("::: insert footnotes\n\nText[^].\n\n::: footnote\n    Note.");
    assert!(out.starts_with("<dl class=\"footnotes\">"));
    assert_eq!(out.matches("<dl class=\"footnotes\">").count(), 1);
}

// ============================================================================
// Table of Contents
// ============================================================================

const TOC_DOC: &str = "::: insert toc\n\n# Top\n\n## A\n\n### A.1\n\n## B";

#[test]
fn test_toc_omits_level_one() {
    assert_eq!(
        html(TOC_DOC),
        "<ul class=\"toc\">\n\
<li><a href=\"#a\">A</a>\n<ul>\n<li><a href=\"#a-1\">A.1</a></li>\n</ul>\n</li>\n\
<li><a href=\"#b\">B</a></li>\n\
</ul>\n\
<h1 id=\"top\">Top</h1>\n<h2 id=\"a\">A</h2>\n<h3 id=\"a-1\">A.1</h3>\n<h2 id=\"b\">B</h2>"
    );
}

#[test]
fn test_footnote_headings_stay_out_of_toc() {
    let out = html(
        "# Top\n\n## Sub\n\ntext[^]\n\n::: footnote\n    ## In footnote\n\n::: insert toc",
    );
    assert!(out.contains("<a href=\"#sub\">Sub</a>"));
    assert!(!out.contains("href=\"#in-footnote\""));
    assert!(out.contains("<h2 id=\"in-footnote\">In footnote</h2>"));
}

#[test]
fn test_fulltoc_includes_every_heading() {
    let out = html(&TOC_DOC.replace("insert toc", "insert fulltoc"));
    assert!(out.starts_with("<ul class=\"toc\">\n<li><a href=\"#top\">Top</a>\n<ul>\n"));
    for anchor in ["#top", "#a", "#a-1", "#b"] {
        assert!(out.contains(&format!("href=\"{}\"", anchor)), "missing {}", anchor);
    }
}

// ============================================================================
// Raw HTML
// ============================================================================

#[test]
fn test_raw_div_passes_through_unchanged() {
    let input = "<div>\n  <p>raw *not em*</p>\n</div>";
    assert_eq!(html(input), input);
}

#[test]
fn test_nested_raw_html_is_relative_to_its_block() {
    assert_eq!(
        html("::: div\n    <div>\n      <p>raw</p>\n    </div>"),
        "<div>\n<div>\n  <p>raw</p>\n</div>\n</div>"
    );
}

#[test]
fn test_raw_html_inside_list_item() {
    assert_eq!(
        html("* item\n\n  <div>\n    <p>x</p>\n  </div>"),
        "<ul>\n<li>\n<p>item</p>\n<div>\n  <p>x</p>\n</div>\n</li>\n</ul>"
    );
}

#[test]
fn test_raw_block_then_paragraph() {
    assert_eq!(
        html("<div class=\"x\">hi</div>\n\nafter"),
        "<div class=\"x\">hi</div>\n<p>after</p>"
    );
}

// ============================================================================
// Tables
// ============================================================================

#[test]
fn test_table_alignment_classes() {
    assert_eq!(
        html("| a | b | c |\n|:---|:--:|---:|\n| 1 | 2 | 3 |"),
        "<table>\n<thead>\n<tr>\n\
<th class=\"left\">a</th>\n<th class=\"center\">b</th>\n<th class=\"right\">c</th>\n\
</tr>\n</thead>\n<tbody>\n<tr>\n\
<td class=\"left\">1</td>\n<td class=\"center\">2</td>\n<td class=\"right\">3</td>\n\
</tr>\n</tbody>\n</table>"
    );
}

#[test]
fn test_table_with_border_and_footer() {
    let input = "::: table\n    +---+---+\n    | a | b |\n    +---+---+\n    | 1 | 2 |\n    \
| 3 | 4 |\n    +---+---+\n    | s | t |\n    +---+---+";
    assert_eq!(
        html(input),
        "<table>\n<thead>\n<tr>\n<th>a</th>\n<th>b</th>\n</tr>\n</thead>\n\
<tbody>\n<tr>\n<td>1</td>\n<td>2</td>\n</tr>\n<tr>\n<td>3</td>\n<td>4</td>\n</tr>\n</tbody>\n\
<tfoot>\n<tr>\n<th>s</th>\n<th>t</th>\n</tr>\n</tfoot>\n</table>"
    );
}

// ============================================================================
// Tags
// ============================================================================

#[rstest]
#[case(":div .note #intro\n    Hello.", "<div id=\"intro\" class=\"note\">\n<p>Hello.</p>\n</div>")]
#[case("::: infobox\n    Careful.", "<div class=\"infobox\">\n<p>Careful.</p>\n</div>")]
#[case("::: alertbox .big\n    Stop.", "<div class=\"alertbox big\">\n<p>Stop.</p>\n</div>")]
#[case("::: div nl2lb\n    one\n    two", "<div>\n<p>one<br>\ntwo</p>\n</div>")]
#[case("::: div raw\n    *not* parsed", "<div>\n*not* parsed\n</div>")]
#[case("::: comment\n    note", "<!--\nnote\n-->")]
#[case("::: ignore\n    hidden\n\nshown", "<p>shown</p>")]
#[case("::: raw\n    <b>as is</b>", "<b>as is</b>")]
#[case("::: link http://x.org\n    Click", "<a href=\"http://x.org\">Click</a>")]
#[case(":hr", "<hr>")]
#[case("::: -----", "<hr>")]
#[case(":br", "<br>")]
#[case(":span .k\n    *x*", "<span class=\"k\"><em>x</em></span>")]
#[case(":pre\n    a < b", "<pre>a &lt; b</pre>")]
#[case("::: .note\n    x", "<div class=\"note\">\n<p>x</p>\n</div>")]
fn test_builtin_tags(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(html(input), expected);
}

#[rstest]
#[case("::: nl2lb\n    one\n    two", "<p>one<br>\ntwo</p>")]
#[case(":nl2br\n    a\n    b\n\n    c", "<p>a<br>\nb</p>\n<p>c</p>")]
fn test_line_break_tags_wrap_nothing(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(html(input), expected);
}

#[test]
fn test_raw_modifier_reaches_nested_blocks() {
    assert_eq!(
        html("::: div raw\n    ::: div\n        * a\n        * *b*"),
        "<div>\n::: div\n    * a\n    * *b*\n</div>"
    );
}

#[test]
fn test_nl2lb_modifier_reaches_nested_list() {
    assert_eq!(
        html("::: div nl2lb\n    * one\n      two\n    * three"),
        "<div>\n<ul>\n<li>one<br>\ntwo</li>\n<li>three</li>\n</ul>\n</div>"
    );
}

#[test]
fn test_nl2lb_modifier_reaches_nested_tag() {
    assert_eq!(
        html("::: div nl2lb\n    ::: div .inner\n        one\n        two"),
        "<div>\n<div class=\"inner\">\n<p>one<br>\ntwo</p>\n</div>\n</div>"
    );
}

#[test]
fn test_terminator_line_is_consumed() {
    assert_eq!(
        html("::: div\n    a\n:::\n\nafter"),
        "<div>\n<p>a</p>\n</div>\n<p>after</p>"
    );
}

#[test]
fn test_quote_with_caption() {
    assert_eq!(
        html("::: quote \"Someone Famous\"\n    Words."),
        "<blockquote>\n<p>Words.</p>\n</blockquote>\n<p class=\"blockquote-caption\">Someone Famous</p>"
    );
}

#[test]
fn test_image_with_caption() {
    assert_eq!(
        html("::: image /a.png\n    [Alt text]\n    A caption."),
        "<figure>\n<img src=\"/a.png\" alt=\"Alt text\">\n<figcaption>A caption.</figcaption>\n</figure>"
    );
}

#[test]
fn test_self_linked_image() {
    assert_eq!(
        html(":!image /b.png .wide"),
        "<a href=\"/b.png\" class=\"wide\"><img src=\"/b.png\" alt=\"\"></a>"
    );
}

#[test]
fn test_plain_image_keeps_attributes_on_img() {
    assert_eq!(
        html(":image /c.png #pic"),
        "<img src=\"/c.png\" alt=\"\" id=\"pic\">"
    );
}

#[test]
fn test_code_tag_escapes() {
    assert_eq!(
        html("::: code rust\n    let x = 1 < 2;"),
        "<pre class=\"lang-rust\" data-lang=\"rust\">let x = 1 &lt; 2;</pre>"
    );
}

#[test]
fn test_indented_code_block() {
    assert_eq!(
        html("    fn main() {}\n        inner"),
        "<pre>fn main() {}\n    inner</pre>"
    );
}

struct Upper;

impl Highlighter for Upper {
    fn highlight(&self, lang: &str, code: &str) -> Option<String> {
        (lang == "rust").then(|| format!("<b>{}</b>", code.to_uppercase()))
    }
}

#[test]
fn test_highlighter_output_replaces_code() {
    let options = RenderOptions::new().with_pygmentize(true).with_highlighter(Upper);
    let out = render("::: code rust\n    fn x", &options).unwrap();
    assert_eq!(
        out.html,
        "<pre class=\"lang-rust pygments\" data-lang=\"rust\"><b>FN X</b></pre>"
    );

    let out = render("::: code text\n    a<b", &options).unwrap();
    assert_eq!(out.html, "<pre class=\"lang-text\" data-lang=\"text\">a&lt;b</pre>");
}

#[test]
fn test_highlighter_needs_pygmentize() {
    let options = RenderOptions::new().with_highlighter(Upper);
    let out = render("::: code rust\n    fn x", &options).unwrap();
    assert_eq!(out.html, "<pre class=\"lang-rust\" data-lang=\"rust\">fn x</pre>");
}

struct Badge;

impl TagHandler for Badge {
    fn handle<'a>(&self, call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        let label = call.args.join(" ");
        Ok(Some(Block::RawHtml(syntext_core::ast::Raw {
            content: format!("<span class=\"badge\">{}</span>", label).into(),
            span: call.span,
        })))
    }
}

#[test]
fn test_custom_tag_overrides_html_element() {
    let options = RenderOptions::new().with_tag("div", Badge);
    let out = render(":div new stuff", &options).unwrap();
    assert_eq!(out.html, "<span class=\"badge\">new stuff</span>");
}

// ============================================================================
// Front Matter and Configuration
// ============================================================================

#[test]
fn test_front_matter_is_extracted() {
    let out = render(
        "---\ntitle: Hello\ndraft: false\n---\n# Body",
        &RenderOptions::default(),
    )
    .unwrap();
    assert_eq!(out.html, "<h1 id=\"body\">Body</h1>");
    assert_eq!(out.meta.get("title"), Some(&MetaValue::Str("Hello".into())));
    assert_eq!(out.meta.get("draft"), Some(&MetaValue::Bool(false)));
}

#[test]
fn test_yaml_front_matter() {
    let out = render(
        "---\ntitle: Notes\ntags:\n  - rust\n  - text\n---\nBody",
        &RenderOptions::default(),
    )
    .unwrap();
    assert_eq!(out.html, "<p>Body</p>");
    assert_eq!(out.meta.get("title"), Some(&MetaValue::Str("Notes".into())));
    assert_eq!(
        out.meta.get("tags"),
        Some(&MetaValue::List(vec![
            MetaValue::Str("rust".into()),
            MetaValue::Str("text".into()),
        ]))
    );
}

#[test]
fn test_malformed_front_matter_is_content() {
    let out = render("---\ntitle: [oops\n---\nBody", &RenderOptions::default()).unwrap();
    assert!(out.meta.is_empty());
    assert!(out.html.ends_with("<p>Body</p>"));
}

#[rstest]
#[case(4, "<pre>code</pre>")]
#[case(2, "<p>code</p>")]
fn test_tab_size(#[case] tab_size: usize, #[case] expected: &str) {
    let options = RenderOptions::new().with_tab_size(tab_size);
    assert_eq!(render("\tcode", &options).unwrap().html, expected);
}

#[test]
fn test_crlf_input() {
    assert_eq!(html("# A\r\n\r\ntext\r\n"), "<h1 id=\"a\">A</h1>\n<p>text</p>");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_tag() {
    assert_eq!(error_kind("text\n\n::: bogus\n    body"), (ErrorKind::UnknownTag, 3));
    let err = render("::: bogus", &RenderOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "line 1: unknown tag 'bogus'");
}

#[test]
fn test_unmatched_html_tag() {
    assert_eq!(error_kind("<section>\nbody"), (ErrorKind::UnmatchedHtmlTag, 1));
}

#[test]
fn test_duplicate_id() {
    assert_eq!(error_kind("::: div #a #b\n    x"), (ErrorKind::DuplicateId, 1));
}

#[rstest]
#[case("| a | b |\n|---|---|\n| 1 |", 3, "row has 1 cells, expected 2")]
#[case("| a | b |\n|:--|\n| 1 | 2 |", 2, "alignment row has 1 columns, expected 2")]
#[case("| a | b |\n|:-:-|--|\n| 1 | 2 |", 2, "malformed alignment row")]
fn test_invalid_table(#[case] input: &str, #[case] line: u32, #[case] reason: &str) {
    let err = render(input, &RenderOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTable);
    assert_eq!(err.line(), line);
    assert!(err.to_string().ends_with(reason), "{}", err);
}

#[test]
fn test_excessive_nesting() {
    let input: Vec<String> = (0..70)
        .map(|depth| format!("{}::: div", " ".repeat(depth * 4)))
        .collect();
    let (kind, _) = error_kind(&input.join("\n"));
    assert_eq!(kind, ErrorKind::ExcessiveNesting);
}

#[test]
fn test_moderate_nesting_is_fine() {
    let input: Vec<String> = (0..20)
        .map(|depth| format!("{}* level", "  ".repeat(depth)))
        .collect();
    let out = html(&input.join("\n"));
    assert_eq!(out.matches("<ul>").count(), 20);
}

#[test]
fn test_error_line_accounts_for_front_matter() {
    assert_eq!(
        error_kind("---\na: 1\n---\n::: bogus"),
        (ErrorKind::UnknownTag, 4)
    );
}
