//! HTML serialization of a resolved [`Document`].
//!
//! The writer is a plain read of the tree: all references, footnote labels
//! and anchors must already be assigned by [`resolve`](crate::resolve).
//! Text is escaped with `html-escape`; raw HTML, entities and highlighter
//! output are written unchanged.

use html_escape::{encode_double_quoted_attribute_to_string, encode_text_to_string};

use crate::ast::{
    AttributeSet, Block, CodeBlock, Dash, Document, Figure, Footnote, FootnoteRef, Image, Inline,
    InsertKind, Link, LinkTarget, List, Quote, RowKind, Table, TagBody, TaggedBlock,
};
use crate::options::RenderOptions;
use crate::resolve::{toc_entries, TocEntry};

/// Serialize a resolved document. The result has no leading or trailing
/// whitespace.
pub fn to_html(doc: &Document<'_>, options: &RenderOptions) -> String {
    let mut writer = HtmlWriter::new(doc, options);
    writer.blocks(&doc.blocks);
    let mut out = writer.out;
    out.truncate(out.trim_end().len());
    match out.len() - out.trim_start().len() {
        0 => out,
        lead => out.split_off(lead),
    }
}

struct HtmlWriter<'d, 'a> {
    doc: &'d Document<'a>,
    options: &'d RenderOptions,
    out: String,
    /// The footnote list appears once, at the first placeholder.
    footnotes_written: bool,
}

impl<'d, 'a> HtmlWriter<'d, 'a> {
    fn new(doc: &'d Document<'a>, options: &'d RenderOptions) -> Self {
        Self {
            doc,
            options,
            out: String::with_capacity(4096),
            footnotes_written: false,
        }
    }

    #[inline]
    fn text(&mut self, text: &str) {
        encode_text_to_string(text, &mut self.out);
    }

    #[inline]
    fn attr(&mut self, name: &str, value: &str) {
        self.out.push(' ');
        self.out.push_str(name);
        self.out.push_str("=\"");
        encode_double_quoted_attribute_to_string(value, &mut self.out);
        self.out.push('"');
    }

    fn newline(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    /// Attributes in output order: id, classes, named, flags.
    fn attrs(&mut self, attrs: &AttributeSet) {
        if let Some(id) = &attrs.id {
            self.attr("id", id);
        }
        if !attrs.classes.is_empty() {
            self.attr("class", &attrs.classes.join(" "));
        }
        for (name, value) in &attrs.named {
            self.attr(name, value);
        }
        for flag in &attrs.flags {
            self.out.push(' ');
            self.out.push_str(flag);
        }
    }

    fn open(&mut self, tag: &str, attrs: &AttributeSet) {
        self.out.push('<');
        self.out.push_str(tag);
        self.attrs(attrs);
        self.out.push('>');
    }

    fn close(&mut self, tag: &str) {
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    fn blocks(&mut self, blocks: &[Block<'a>]) {
        for block in blocks {
            self.block(block);
        }
    }

    fn block(&mut self, block: &Block<'a>) {
        match block {
            Block::Paragraph(p) => {
                self.out.push_str("<p>");
                self.inlines(&p.content);
                self.out.push_str("</p>\n");
            }
            Block::Heading(h) => {
                let tag = heading_tag(h.level);
                self.out.push('<');
                self.out.push_str(tag);
                self.attr("id", &h.anchor);
                self.out.push('>');
                self.inlines(&h.content);
                self.close(tag);
                self.out.push('\n');
            }
            Block::List(list) => self.list(list, list.compact),
            Block::BlockList(list) => self.list(list, false),
            Block::DefinitionList(dl) => {
                self.out.push_str("<dl>\n");
                for item in &dl.items {
                    self.out.push_str("<dt>");
                    self.inlines(&item.term);
                    self.out.push_str("</dt>\n<dd>");
                    self.compact_blocks(&item.blocks);
                    self.out.push_str("</dd>\n");
                }
                self.out.push_str("</dl>\n");
            }
            Block::CodeBlock(code) => self.code_block(code),
            Block::Table(table) => self.table(table),
            Block::HorizontalRule(_) => self.out.push_str("<hr>\n"),
            Block::RawHtml(raw) => {
                self.out.push_str(&raw.content);
                self.out.push('\n');
            }
            Block::Comment(raw) => {
                self.out.push_str("<!--\n");
                self.out.push_str(&raw.content);
                self.out.push_str("\n-->\n");
            }
            Block::TaggedBlock(tagged) => self.tagged_block(tagged),
            Block::Quote(quote) => self.quote(quote),
            Block::Figure(figure) => self.figure(figure),
            Block::Group(children) => self.blocks(children),
            Block::Insert(insert) => match insert.kind {
                InsertKind::Toc => self.toc(false),
                InsertKind::FullToc => self.toc(true),
                InsertKind::Footnotes => {
                    let doc = self.doc;
                    self.footnotes(&doc.footnotes);
                }
            },
        }
    }

    /// A single paragraph is written bare; anything else as blocks.
    fn compact_blocks(&mut self, blocks: &[Block<'a>]) {
        match blocks {
            [Block::Paragraph(p)] => self.inlines(&p.content),
            _ => {
                self.out.push('\n');
                self.blocks(blocks);
            }
        }
    }

    fn list(&mut self, list: &List<'a>, compact: bool) {
        let tag = if list.ordered { "ol" } else { "ul" };
        self.out.push('<');
        self.out.push_str(tag);
        if let Some(start) = list.start {
            self.attr("start", &start.to_string());
        }
        self.out.push_str(">\n");

        for item in &list.items {
            self.out.push_str("<li>");
            if compact {
                for (i, block) in item.blocks.iter().enumerate() {
                    match block {
                        Block::Paragraph(p) => {
                            if i > 0 {
                                self.newline();
                            }
                            self.inlines(&p.content);
                        }
                        other => {
                            self.out.push('\n');
                            self.block(other);
                        }
                    }
                }
            } else {
                self.out.push('\n');
                self.blocks(&item.blocks);
            }
            self.out.push_str("</li>\n");
        }

        self.close(tag);
        self.out.push('\n');
    }

    fn code_block(&mut self, code: &CodeBlock<'a>) {
        let mut attrs = AttributeSet::new();
        if let Some(lang) = &code.lang {
            attrs.add_class(&format!("lang-{}", lang));
            attrs.set("data-lang", lang.to_string());
        }

        let highlighted = match (&code.lang, self.options.active_highlighter()) {
            (Some(lang), Some(highlighter)) => highlighter.highlight(lang, &code.content),
            _ => None,
        };
        if highlighted.is_some() {
            attrs.add_class("pygments");
        }

        attrs.id = code.attrs.id.clone();
        for class in &code.attrs.classes {
            attrs.add_class(class);
        }
        for (name, value) in &code.attrs.named {
            attrs.set(name, value.as_str());
        }
        attrs.flags = code.attrs.flags.clone();

        self.open("pre", &attrs);
        match highlighted {
            Some(html) => self.out.push_str(&html),
            None => self.text(&code.content),
        }
        self.out.push_str("</pre>\n");
    }

    fn table(&mut self, table: &Table<'a>) {
        self.open("table", &table.attrs);
        self.out.push('\n');

        let mut section: Option<RowKind> = None;
        for row in &table.rows {
            if section != Some(row.kind) {
                if let Some(kind) = section {
                    self.close(section_tag(kind));
                    self.out.push('\n');
                }
                self.out.push('<');
                self.out.push_str(section_tag(row.kind));
                self.out.push_str(">\n");
                section = Some(row.kind);
            }

            let cell_tag = if row.kind == RowKind::Body { "td" } else { "th" };
            self.out.push_str("<tr>\n");
            for (i, cell) in row.cells.iter().enumerate() {
                self.out.push('<');
                self.out.push_str(cell_tag);
                if let Some(class) = table.alignments.get(i).and_then(|a| a.class()) {
                    self.attr("class", class);
                }
                self.out.push('>');
                self.inlines(cell);
                self.close(cell_tag);
                self.out.push('\n');
            }
            self.out.push_str("</tr>\n");
        }
        if let Some(kind) = section {
            self.close(section_tag(kind));
            self.out.push('\n');
        }

        self.out.push_str("</table>\n");
    }

    fn tagged_block(&mut self, tagged: &TaggedBlock<'a>) {
        let tag = tagged.tag.as_str();
        self.open(tag, &tagged.attrs);
        match &tagged.body {
            TagBody::Empty => {}
            TagBody::Blocks(children) => {
                self.out.push('\n');
                self.blocks(children);
                self.close(tag);
            }
            TagBody::Inline(content) => {
                self.inlines(content);
                self.close(tag);
            }
            TagBody::Raw(text) => {
                self.out.push('\n');
                self.out.push_str(text);
                self.out.push('\n');
                self.close(tag);
            }
            TagBody::Escaped(text) => {
                self.text(text);
                self.close(tag);
            }
        }
        self.out.push('\n');
    }

    fn quote(&mut self, quote: &Quote<'a>) {
        self.open("blockquote", &quote.attrs);
        self.out.push('\n');
        self.blocks(&quote.blocks);
        self.out.push_str("</blockquote>\n");
        if let Some(caption) = &quote.caption {
            self.out.push_str("<p class=\"blockquote-caption\">");
            self.text(caption);
            self.out.push_str("</p>\n");
        }
    }

    fn figure(&mut self, figure: &Figure<'a>) {
        let Some(caption) = &figure.caption else {
            self.image_element(figure, &figure.attrs);
            self.out.push('\n');
            return;
        };

        self.open("figure", &figure.attrs);
        self.out.push('\n');
        self.image_element(figure, &AttributeSet::new());
        self.out.push_str("\n<figcaption>");
        self.inlines(caption);
        self.out.push_str("</figcaption>\n</figure>\n");
    }

    /// `attrs` go on the outermost element: the link when self-linked.
    fn image_element(&mut self, figure: &Figure<'a>, attrs: &AttributeSet) {
        if figure.self_link {
            self.out.push_str("<a");
            self.attr("href", &figure.src);
            self.attrs(attrs);
            self.out.push('>');
        }
        self.out.push_str("<img");
        self.attr("src", &figure.src);
        self.attr("alt", figure.alt.as_deref().unwrap_or(""));
        if !figure.self_link {
            self.attrs(attrs);
        }
        self.out.push('>');
        if figure.self_link {
            self.out.push_str("</a>");
        }
    }

    fn toc(&mut self, full: bool) {
        let doc = self.doc;
        let entries = toc_entries(&doc.headings, full);
        if entries.is_empty() {
            return;
        }
        self.out.push_str("<ul class=\"toc\">\n");
        self.toc_items(&entries);
        self.out.push_str("</ul>\n");
    }

    fn toc_items(&mut self, entries: &[TocEntry<'_>]) {
        for entry in entries {
            self.out.push_str("<li><a");
            self.attr("href", &format!("#{}", entry.heading.anchor));
            self.out.push('>');
            self.text(&entry.heading.text);
            self.out.push_str("</a>");
            if !entry.children.is_empty() {
                self.out.push_str("\n<ul>\n");
                self.toc_items(&entry.children);
                self.out.push_str("</ul>\n");
            }
            self.out.push_str("</li>\n");
        }
    }

    fn footnotes(&mut self, footnotes: &'d [Footnote<'a>]) {
        if footnotes.is_empty() || self.footnotes_written {
            return;
        }
        self.footnotes_written = true;
        self.out.push_str("<dl class=\"footnotes\">\n");
        for footnote in footnotes {
            let label = footnote.label.as_str();
            self.out.push_str("<div");
            self.attr("id", &format!("fn:{}", label));
            self.out.push_str("><dt><a");
            self.attr("href", &format!("#fnref:{}", label));
            self.out.push('>');
            self.text(label);
            self.out.push_str("</a></dt><dd>");
            self.compact_blocks(&footnote.blocks);
            self.out.push_str("</dd></div>\n");
        }
        self.out.push_str("</dl>\n");
    }

    // ========================================================================
    // Inlines
    // ========================================================================

    fn inlines(&mut self, inlines: &[Inline<'a>]) {
        for inline in inlines {
            self.inline(inline);
        }
    }

    fn wrap(&mut self, tag: &str, children: &[Inline<'a>]) {
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push('>');
        self.inlines(children);
        self.close(tag);
    }

    fn inline(&mut self, inline: &Inline<'a>) {
        match inline {
            Inline::Text(text) => self.text(text),
            Inline::Emphasis(children) => self.wrap("em", children),
            Inline::Strong(children) => self.wrap("strong", children),
            Inline::BoldItalic(children) => {
                self.out.push_str("<strong>");
                self.wrap("em", children);
                self.out.push_str("</strong>");
            }
            Inline::Code(code) | Inline::Verbatim(code) => {
                self.out.push_str("<code>");
                self.text(code);
                self.out.push_str("</code>");
            }
            Inline::Link(link) => self.link(link),
            Inline::Image(image) => self.image(image),
            Inline::Dash(Dash::En) => self.out.push_str("&ndash;"),
            Inline::Dash(Dash::Em) => self.out.push_str("&mdash;"),
            Inline::Superscript(children) => self.wrap("sup", children),
            Inline::Subscript(children) => self.wrap("sub", children),
            Inline::FootnoteRef(r) => self.footnote_ref(r),
            Inline::RawHtml(html) => self.out.push_str(html),
            Inline::SoftBreak => self.out.push('\n'),
            Inline::HardBreak => self.out.push_str("<br>\n"),
        }
    }

    fn link(&mut self, link: &Link<'a>) {
        let LinkTarget::Direct(url) = &link.target else {
            self.inlines(&link.children);
            return;
        };
        self.out.push_str("<a");
        self.attr("href", url);
        if let Some(title) = &link.title {
            self.attr("title", title);
        }
        self.out.push('>');
        self.inlines(&link.children);
        self.out.push_str("</a>");
    }

    fn image(&mut self, image: &Image<'a>) {
        let LinkTarget::Direct(url) = &image.target else {
            self.text(&image.alt);
            return;
        };
        self.out.push_str("<img");
        self.attr("src", url);
        self.attr("alt", &image.alt);
        if let Some(title) = &image.title {
            self.attr("title", title);
        }
        self.out.push('>');
    }

    fn footnote_ref(&mut self, r: &FootnoteRef<'a>) {
        let label = r
            .label
            .as_deref()
            .or(r.id.as_deref())
            .unwrap_or_default();
        self.out.push_str("<sup class=\"footnote-ref\"");
        if r.defined && r.first {
            self.attr("id", &format!("fnref:{}", label));
        }
        self.out.push('>');
        if r.defined {
            self.out.push_str("<a");
            self.attr("href", &format!("#fn:{}", label));
            self.out.push('>');
            self.text(label);
            self.out.push_str("</a>");
        } else {
            self.text(label);
        }
        self.out.push_str("</sup>");
    }
}

fn heading_tag(level: u8) -> &'static str {
    match level {
        1 => "h1",
        2 => "h2",
        3 => "h3",
        4 => "h4",
        5 => "h5",
        _ => "h6",
    }
}

fn section_tag(kind: RowKind) -> &'static str {
    match kind {
        RowKind::Header => "thead",
        RowKind::Body => "tbody",
        RowKind::Footer => "tfoot",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Paragraph;
    use crate::span::Span;
    use std::borrow::Cow;

    #[test]
    fn test_attribute_order_and_escaping() {
        let doc = Document::default();
        let options = RenderOptions::default();
        let mut writer = HtmlWriter::new(&doc, &options);
        let mut attrs = AttributeSet::new().with_class("a").with_class("b");
        attrs.id = Some("x".to_string());
        attrs.set("title", "say \"hi\"");
        attrs.add_flag("hidden");
        writer.open("div", &attrs);
        assert_eq!(
            writer.out,
            "<div id=\"x\" class=\"a b\" title=\"say &quot;hi&quot;\" hidden>"
        );
    }

    #[test]
    fn test_output_is_trimmed() {
        let doc = Document {
            blocks: vec![Block::Paragraph(Paragraph {
                content: vec![Inline::Text(Cow::Borrowed("a < b"))],
                span: Span::default(),
            })],
            ..Document::default()
        };
        assert_eq!(to_html(&doc, &RenderOptions::default()), "<p>a &lt; b</p>");
    }
}
