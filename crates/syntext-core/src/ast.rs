//! Abstract Syntax Tree types for syntext documents.
//!
//! The block parser builds a tree of [`Block`]s whose text leaves carry
//! [`Inline`] spans, plus side tables of reference definitions, footnotes
//! and headings. The resolver rewrites the tree once; after that it is only
//! read by the HTML writer.
//!
//! Text borrows from the normalized source (`Cow<'a, str>`) wherever the
//! parser can slice instead of allocate.

use std::collections::HashMap;

use crate::span::Span;

/// Borrowed or owned string type for zero-copy parsing.
pub type CowStr<'a> = std::borrow::Cow<'a, str>;

/// A compiled document: block tree plus the tables collected while parsing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document<'a> {
    /// Content blocks in document order.
    pub blocks: Vec<Block<'a>>,
    /// Link reference definitions keyed by normalized label.
    pub link_refs: HashMap<String, LinkDef>,
    /// Image reference definitions keyed by normalized label.
    pub image_refs: HashMap<String, LinkDef>,
    /// Footnote bodies in definition order.
    pub footnotes: Vec<Footnote<'a>>,
    /// Every heading in document order, with its anchor.
    pub headings: Vec<HeadingEntry>,
}

/// Target of a reference definition line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDef {
    pub url: String,
    pub title: Option<String>,
}

/// A footnote body registered by a `footnote` tagged block.
#[derive(Debug, Clone, PartialEq)]
pub struct Footnote<'a> {
    /// Explicit id from the tag header; `None` means auto-numbered.
    pub id: Option<String>,
    /// Label shown in the output, assigned by the resolver.
    pub label: String,
    pub blocks: Vec<Block<'a>>,
    pub span: Span,
}

impl Footnote<'_> {
    #[inline]
    pub fn is_auto(&self) -> bool {
        self.id.is_none()
    }
}

/// One entry of the heading table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingEntry {
    pub level: u8,
    /// Plain text of the heading content.
    pub text: String,
    /// Unique anchor id.
    pub anchor: String,
}

/// Classes, id, boolean and named attributes from a block header.
///
/// Classes keep insertion order and collapse duplicates. A named attribute
/// set twice keeps its first position and its last value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributeSet {
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub flags: Vec<String>,
    pub named: Vec<(String, String)>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.classes.is_empty() && self.flags.is_empty() && self.named.is_empty()
    }

    pub fn add_class(&mut self, class: &str) {
        if !class.is_empty() && !self.classes.iter().any(|c| c == class) {
            self.classes.push(class.to_string());
        }
    }

    pub fn add_flag(&mut self, flag: &str) {
        if !self.flags.iter().any(|f| f == flag) {
            self.flags.push(flag.to_string());
        }
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.named.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.named.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.named
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Builder form of [`add_class`](Self::add_class).
    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }
}

/// Block-level AST nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Block<'a> {
    Paragraph(Paragraph<'a>),
    Heading(Heading<'a>),
    /// Marker list (`*`, `-`, `+`, `•`, `1.`, `#.`).
    List(List<'a>),
    /// Bracket-marker list (`(*)`, `(#)`); items are always block-level.
    BlockList(List<'a>),
    DefinitionList(DefinitionList<'a>),
    CodeBlock(CodeBlock<'a>),
    Table(Table<'a>),
    HorizontalRule(Span),
    /// Opaque HTML emitted unchanged.
    RawHtml(Raw<'a>),
    /// `<!-- ... -->` comment.
    Comment(Raw<'a>),
    /// Any tag handled as an HTML element.
    TaggedBlock(TaggedBlock<'a>),
    Quote(Quote<'a>),
    Figure(Figure<'a>),
    /// Placeholder replaced by generated content when rendering.
    Insert(Insert),
    /// Blocks written in place with no wrapping element.
    Group(Vec<Block<'a>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph<'a> {
    pub content: Vec<Inline<'a>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heading<'a> {
    /// Heading level (1-6).
    pub level: u8,
    pub content: Vec<Inline<'a>>,
    pub anchor: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct List<'a> {
    pub ordered: bool,
    /// First number of an ordered list, when it is not 1.
    pub start: Option<u64>,
    /// Compact items render without paragraph wrapping.
    pub compact: bool,
    pub items: Vec<ListItem<'a>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem<'a> {
    pub blocks: Vec<Block<'a>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionList<'a> {
    pub items: Vec<Definition<'a>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Definition<'a> {
    pub term: Vec<Inline<'a>>,
    pub blocks: Vec<Block<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock<'a> {
    /// Language argument, used for classes and by the highlighter.
    pub lang: Option<CowStr<'a>>,
    pub content: CowStr<'a>,
    pub attrs: AttributeSet,
    pub span: Span,
}

/// Column alignment from a table's alignment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Default,
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn class(self) -> Option<&'static str> {
        match self {
            Alignment::Default => None,
            Alignment::Left => Some("left"),
            Alignment::Center => Some("center"),
            Alignment::Right => Some("right"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Header,
    Body,
    Footer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table<'a> {
    pub rows: Vec<TableRow<'a>>,
    /// One entry per column.
    pub alignments: Vec<Alignment>,
    pub attrs: AttributeSet,
    pub span: Span,
}

impl Table<'_> {
    pub fn has_header(&self) -> bool {
        self.rows.iter().any(|r| r.kind == RowKind::Header)
    }

    pub fn has_footer(&self) -> bool {
        self.rows.iter().any(|r| r.kind == RowKind::Footer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow<'a> {
    pub cells: Vec<Vec<Inline<'a>>>,
    pub kind: RowKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Raw<'a> {
    pub content: CowStr<'a>,
    pub span: Span,
}

/// Body of an element produced by a tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TagBody<'a> {
    /// Void element: no body, no closing tag.
    Empty,
    /// Nested blocks.
    Blocks(Vec<Block<'a>>),
    /// Inline content.
    Inline(Vec<Inline<'a>>),
    /// Text emitted unchanged.
    Raw(CowStr<'a>),
    /// Text emitted HTML-escaped.
    Escaped(CowStr<'a>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaggedBlock<'a> {
    /// HTML element name written to the output.
    pub tag: String,
    pub args: Vec<String>,
    pub attrs: AttributeSet,
    pub body: TagBody<'a>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote<'a> {
    pub blocks: Vec<Block<'a>>,
    /// Attribution shown after the quote.
    pub caption: Option<String>,
    pub attrs: AttributeSet,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure<'a> {
    pub src: String,
    pub alt: Option<String>,
    pub caption: Option<Vec<Inline<'a>>>,
    /// Wrap the image in a link to itself.
    pub self_link: bool,
    pub attrs: AttributeSet,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertKind {
    Toc,
    FullToc,
    Footnotes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insert {
    pub kind: InsertKind,
    pub span: Span,
}

/// Inline-level AST nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline<'a> {
    Text(CowStr<'a>),
    /// `*text*`
    Emphasis(Vec<Inline<'a>>),
    /// `**text**`
    Strong(Vec<Inline<'a>>),
    /// `***text***`
    BoldItalic(Vec<Inline<'a>>),
    /// `` `code` ``
    Code(CowStr<'a>),
    /// ``` ``verbatim`` ```
    Verbatim(CowStr<'a>),
    Link(Link<'a>),
    Image(Image<'a>),
    Dash(Dash),
    /// `^{text}`
    Superscript(Vec<Inline<'a>>),
    /// `_{text}`
    Subscript(Vec<Inline<'a>>),
    FootnoteRef(FootnoteRef<'a>),
    /// Inline HTML tag, comment or entity, emitted unchanged.
    RawHtml(CowStr<'a>),
    /// Newline folded to whitespace.
    SoftBreak,
    /// Newline rendered as `<br>` (nl2lb mode).
    HardBreak,
}

fn owned(s: CowStr<'_>) -> CowStr<'static> {
    CowStr::Owned(s.into_owned())
}

fn owned_all(inlines: Vec<Inline<'_>>) -> Vec<Inline<'static>> {
    inlines.into_iter().map(Inline::into_owned).collect()
}

impl Inline<'_> {
    /// Detach from the text the span was parsed from.
    pub fn into_owned(self) -> Inline<'static> {
        match self {
            Inline::Text(t) => Inline::Text(owned(t)),
            Inline::Emphasis(c) => Inline::Emphasis(owned_all(c)),
            Inline::Strong(c) => Inline::Strong(owned_all(c)),
            Inline::BoldItalic(c) => Inline::BoldItalic(owned_all(c)),
            Inline::Code(t) => Inline::Code(owned(t)),
            Inline::Verbatim(t) => Inline::Verbatim(owned(t)),
            Inline::Link(link) => Inline::Link(Link {
                target: link.target.into_owned(),
                title: link.title.map(owned),
                children: owned_all(link.children),
            }),
            Inline::Image(img) => Inline::Image(Image {
                target: img.target.into_owned(),
                alt: owned(img.alt),
                title: img.title.map(owned),
            }),
            Inline::Dash(d) => Inline::Dash(d),
            Inline::Superscript(c) => Inline::Superscript(owned_all(c)),
            Inline::Subscript(c) => Inline::Subscript(owned_all(c)),
            Inline::FootnoteRef(r) => Inline::FootnoteRef(FootnoteRef {
                id: r.id.map(owned),
                label: r.label,
                defined: r.defined,
                first: r.first,
            }),
            Inline::RawHtml(t) => Inline::RawHtml(owned(t)),
            Inline::SoftBreak => Inline::SoftBreak,
            Inline::HardBreak => Inline::HardBreak,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget<'a> {
    Direct(CowStr<'a>),
    /// Label to look up; empty means "use the link text".
    Reference(CowStr<'a>),
}

impl LinkTarget<'_> {
    pub fn into_owned(self) -> LinkTarget<'static> {
        match self {
            LinkTarget::Direct(url) => LinkTarget::Direct(owned(url)),
            LinkTarget::Reference(label) => LinkTarget::Reference(owned(label)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link<'a> {
    pub target: LinkTarget<'a>,
    pub title: Option<CowStr<'a>>,
    pub children: Vec<Inline<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image<'a> {
    pub target: LinkTarget<'a>,
    pub alt: CowStr<'a>,
    pub title: Option<CowStr<'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dash {
    En,
    Em,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FootnoteRef<'a> {
    /// Explicit id, or `None` for the next auto index.
    pub id: Option<CowStr<'a>>,
    /// Label assigned by the resolver.
    pub label: Option<String>,
    /// Whether a footnote body exists for this reference.
    pub defined: bool,
    /// First reference to its footnote; carries the back-link anchor.
    pub first: bool,
}

/// Plain text of inline content, as used for anchors, TOC entries and
/// reference lookup by link text.
pub fn plain_text(inlines: &[Inline<'_>]) -> String {
    let mut out = String::new();
    push_plain_text(inlines, &mut out);
    out
}

fn push_plain_text(inlines: &[Inline<'_>], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(t) | Inline::Code(t) | Inline::Verbatim(t) => out.push_str(t),
            Inline::Emphasis(c)
            | Inline::Strong(c)
            | Inline::BoldItalic(c)
            | Inline::Superscript(c)
            | Inline::Subscript(c) => push_plain_text(c, out),
            Inline::Link(link) => push_plain_text(&link.children, out),
            Inline::Image(img) => out.push_str(&img.alt),
            Inline::Dash(Dash::En) => out.push('\u{2013}'),
            Inline::Dash(Dash::Em) => out.push('\u{2014}'),
            Inline::SoftBreak | Inline::HardBreak => out.push(' '),
            Inline::FootnoteRef(_) | Inline::RawHtml(_) => {}
        }
    }
}
