//! Tag dispatch.
//!
//! Tagged blocks (`::: name args`) and shorthand blocks (`:name args`) are
//! turned into output nodes by a [`TagHandler`] looked up by name in a
//! [`TagRegistry`]. Names without a handler fall back to:
//!
//! - `hr` and all-dash names (`---`): a horizontal rule;
//! - any HTML element name: the element itself, wrapping the block body;
//!
//! and anything else is an [`UnknownTag`](crate::CompileError::UnknownTag)
//! error.
//!
//! Handlers see the block through a [`TagCall`], which gives access to the
//! header, the dedented body lines and the parser for nested content.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ast::{
    AttributeSet, Block, CodeBlock, CowStr, Figure, Inline, Insert, InsertKind, Quote, Raw,
    Table, TagBody, TaggedBlock,
};
use crate::error::{CompileError, Result};
use crate::inline::parse_lines;
use crate::lexer::{block_text, join_lines, trim_blank, Line};
use crate::options::RenderOptions;
use crate::parser::Context;
use crate::span::Span;

/// Turns a tagged block into an output node.
///
/// Returning `Ok(None)` drops the block from the output (used by tags such
/// as `footnote` that only record data).
pub trait TagHandler: Send + Sync {
    fn handle<'a>(&self, call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>>;
}

/// Parser services available to tag handlers.
pub(crate) trait TagHost<'a> {
    fn source(&self) -> &'a str;
    fn options(&self) -> &RenderOptions;
    fn parse_blocks(&mut self, lines: &[Line<'a>], ctx: Context) -> Result<Vec<Block<'a>>>;
    fn parse_table(&mut self, lines: &[Line<'a>], attrs: AttributeSet, ctx: Context)
        -> Result<Table<'a>>;
    fn add_footnote(&mut self, id: Option<String>, blocks: Vec<Block<'a>>, span: Span);
    fn add_heading(
        &mut self,
        level: u8,
        content: &[Inline<'a>],
        id: Option<&str>,
        in_toc: bool,
    ) -> String;
}

/// One tagged block being dispatched.
pub struct TagCall<'c, 'a> {
    /// Tag name as written in the header.
    pub tag: &'c str,
    /// Positional arguments, with the `nl2lb`/`nl2br`/`raw` modifiers removed.
    pub args: Vec<String>,
    pub attrs: AttributeSet,
    pub span: Span,
    /// Line of the block header.
    pub line: u32,
    body: &'c [Line<'a>],
    ctx: Context,
    host: &'c mut dyn TagHost<'a>,
}

impl<'c, 'a> TagCall<'c, 'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        tag: &'c str,
        args: Vec<String>,
        attrs: AttributeSet,
        span: Span,
        line: u32,
        body: &'c [Line<'a>],
        ctx: Context,
        host: &'c mut dyn TagHost<'a>,
    ) -> Self {
        Self {
            tag,
            args,
            attrs,
            span,
            line,
            body,
            ctx,
            host,
        }
    }

    /// Body lines with the common indentation removed.
    pub fn body(&self) -> &[Line<'a>] {
        self.body
    }

    /// Whether nested content must be passed through unprocessed.
    pub fn is_raw(&self) -> bool {
        self.ctx.raw
    }

    pub fn nl2lb(&self) -> bool {
        self.ctx.nl2lb
    }

    pub fn options(&self) -> &RenderOptions {
        self.host.options()
    }

    /// Body as text, lines joined with `\n`.
    pub fn body_text(&self) -> CowStr<'a> {
        lines_text(self.body)
    }

    /// Body parsed as nested blocks.
    pub fn children(&mut self) -> Result<Vec<Block<'a>>> {
        self.blocks_of(self.body)
    }

    /// Parse some lines of the body as nested blocks.
    pub fn blocks_of(&mut self, lines: &[Line<'a>]) -> Result<Vec<Block<'a>>> {
        if self.ctx.raw {
            return Ok(raw_block(lines));
        }
        self.host.parse_blocks(lines, self.ctx.nested())
    }

    /// Body parsed as inline content.
    pub fn body_inline(&self) -> Vec<Inline<'a>> {
        self.inline_of(self.body)
    }

    /// Parse some lines of the body as inline content.
    pub fn inline_of(&self, lines: &[Line<'a>]) -> Vec<Inline<'a>> {
        let lines = trim_blank(lines);
        if self.ctx.raw {
            return vec![Inline::RawHtml(block_text(self.host.source(), lines))];
        }
        parse_lines(self.host.source(), lines, self.ctx.nl2lb)
    }

    /// Body parsed as table rows.
    pub fn table(&mut self) -> Result<Table<'a>> {
        let attrs = std::mem::take(&mut self.attrs);
        self.host.parse_table(self.body, attrs, self.ctx)
    }

    /// Record a footnote body.
    pub fn add_footnote(&mut self, id: Option<String>, blocks: Vec<Block<'a>>) {
        self.host.add_footnote(id, blocks, self.span);
    }

    /// Record a heading for the table of contents and return its anchor.
    pub fn add_heading(&mut self, level: u8, content: &[Inline<'a>]) -> String {
        let id = self.attrs.id.clone();
        self.host
            .add_heading(level, content, id.as_deref(), !self.ctx.footnote)
    }
}

fn lines_text<'a>(lines: &[Line<'a>]) -> CowStr<'a> {
    match lines {
        [] => Cow::Borrowed(""),
        [only] => Cow::Borrowed(only.text),
        _ => Cow::Owned(join_lines(lines)),
    }
}

fn raw_block<'a>(lines: &[Line<'a>]) -> Vec<Block<'a>> {
    let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
        return Vec::new();
    };
    vec![Block::RawHtml(Raw {
        content: lines_text(lines),
        span: first.span.merge(last.span),
    })]
}

/// Name-to-handler table.
///
/// Cloning is cheap; handlers are shared.
#[derive(Clone, Default)]
pub struct TagRegistry {
    handlers: HashMap<String, Arc<dyn TagHandler>>,
}

impl TagRegistry {
    /// An empty registry: only the `hr` and HTML element fallbacks apply.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("code", CodeTag);
        registry.register("comment", CommentTag);
        registry.register("footnote", FootnoteTag);
        registry.register("ignore", IgnoreTag);
        registry.register("image", ImageTag { self_link: false });
        registry.register("!image", ImageTag { self_link: true });
        registry.register("infobox", BoxTag);
        registry.register("alertbox", BoxTag);
        registry.register("insert", InsertTag);
        registry.register("link", LinkTag);
        registry.register("nl2lb", LineBreakTag);
        registry.register("nl2br", LineBreakTag);
        registry.register("quote", QuoteTag);
        registry.register("raw", RawTag);
        registry.register("table", TableTag);
        registry
    }

    pub fn register(&mut self, name: &str, handler: impl TagHandler + 'static) {
        self.handlers.insert(name.to_string(), Arc::new(handler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Run the handler for `call.tag`, or the rule / HTML element fallback.
    pub fn dispatch<'a>(&self, call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        if let Some(handler) = self.handlers.get(call.tag) {
            log::trace!("tag '{}' -> registered handler", call.tag);
            return handler.handle(call);
        }
        if is_rule_name(call.tag) {
            return RuleTag.handle(call);
        }
        if is_html_element(call.tag) {
            log::trace!("tag '{}' -> html element", call.tag);
            return HtmlTag.handle(call);
        }
        Err(CompileError::unknown_tag(call.tag, call.line))
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_set().entries(names).finish()
    }
}

fn is_rule_name(tag: &str) -> bool {
    tag == "hr" || (!tag.is_empty() && tag.bytes().all(|b| b == b'-'))
}

// ============================================================================
// HTML element classes
// ============================================================================

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose body is inline content.
const LEAF_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "button", "caption", "cite", "dt", "em", "figcaption", "h1", "h2", "h3",
    "h4", "h5", "h6", "i", "label", "legend", "mark", "option", "p", "q", "s", "select", "small",
    "span", "strong", "sub", "summary", "sup", "td", "th", "time", "title", "u",
];

/// Elements whose body is text passed through unchanged.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements whose body is text, escaped.
const ESCAPED_TEXT_ELEMENTS: &[&str] = &["pre", "textarea"];

/// Elements that wrap nested blocks.
const CONTAINER_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "audio", "blockquote", "body", "canvas", "center", "dd",
    "details", "dialog", "div", "dl", "fieldset", "figure", "footer", "form", "head", "header",
    "hgroup", "html", "li", "main", "menu", "nav", "noscript", "object", "ol", "optgroup",
    "output", "picture", "section", "table", "tbody", "template", "tfoot", "thead", "tr", "ul",
    "video",
];

fn is_html_element(tag: &str) -> bool {
    [
        VOID_ELEMENTS,
        LEAF_ELEMENTS,
        RAW_TEXT_ELEMENTS,
        ESCAPED_TEXT_ELEMENTS,
        CONTAINER_ELEMENTS,
    ]
    .iter()
    .any(|class| class.contains(&tag))
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag.as_bytes() {
        [b'h', d @ b'1'..=b'6'] => Some(d - b'0'),
        _ => None,
    }
}

// ============================================================================
// Built-in handlers
// ============================================================================

/// Any HTML element used as a tag.
struct HtmlTag;

impl TagHandler for HtmlTag {
    fn handle<'a>(&self, mut call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        let tag = call.tag;
        let body = if VOID_ELEMENTS.contains(&tag) {
            TagBody::Empty
        } else if RAW_TEXT_ELEMENTS.contains(&tag) {
            TagBody::Raw(call.body_text())
        } else if ESCAPED_TEXT_ELEMENTS.contains(&tag) {
            TagBody::Escaped(call.body_text())
        } else if LEAF_ELEMENTS.contains(&tag) {
            TagBody::Inline(call.body_inline())
        } else {
            TagBody::Blocks(call.children()?)
        };

        if let (Some(level), TagBody::Inline(content)) = (heading_level(tag), &body) {
            let anchor = call.add_heading(level, content);
            call.attrs.id = Some(anchor);
        }

        Ok(Some(Block::TaggedBlock(TaggedBlock {
            tag: tag.to_string(),
            args: call.args,
            attrs: call.attrs,
            body,
            span: call.span,
        })))
    }
}

/// `hr` and all-dash tag names.
struct RuleTag;

impl TagHandler for RuleTag {
    fn handle<'a>(&self, call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        Ok(Some(Block::TaggedBlock(TaggedBlock {
            tag: "hr".to_string(),
            args: call.args,
            attrs: call.attrs,
            body: TagBody::Empty,
            span: call.span,
        })))
    }
}

/// `code [lang]`: escaped code, optionally highlighted.
struct CodeTag;

impl TagHandler for CodeTag {
    fn handle<'a>(&self, call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        let content = call.body_text();
        Ok(Some(Block::CodeBlock(CodeBlock {
            lang: call.args.into_iter().next().map(Cow::Owned),
            content,
            attrs: call.attrs,
            span: call.span,
        })))
    }
}

/// `comment`: an HTML comment with the body verbatim.
struct CommentTag;

impl TagHandler for CommentTag {
    fn handle<'a>(&self, call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        Ok(Some(Block::Comment(Raw {
            content: call.body_text(),
            span: call.span,
        })))
    }
}

/// `raw`: body passed through untouched.
struct RawTag;

impl TagHandler for RawTag {
    fn handle<'a>(&self, call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        Ok(Some(Block::RawHtml(Raw {
            content: call.body_text(),
            span: call.span,
        })))
    }
}

/// `ignore`: body dropped.
struct IgnoreTag;

impl TagHandler for IgnoreTag {
    fn handle<'a>(&self, _call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        Ok(None)
    }
}

/// `nl2lb` / `nl2br`: nested blocks with hard line breaks, no wrapper.
struct LineBreakTag;

impl TagHandler for LineBreakTag {
    fn handle<'a>(&self, mut call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        call.ctx.nl2lb = true;
        Ok(Some(Block::Group(call.children()?)))
    }
}

/// `infobox` / `alertbox`: a `div` classed with the tag name.
struct BoxTag;

impl TagHandler for BoxTag {
    fn handle<'a>(&self, mut call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        let children = call.children()?;
        let mut attrs = AttributeSet::new().with_class(call.tag);
        for class in &call.attrs.classes {
            attrs.add_class(class);
        }
        attrs.id = call.attrs.id.take();
        attrs.flags = std::mem::take(&mut call.attrs.flags);
        attrs.named = std::mem::take(&mut call.attrs.named);

        Ok(Some(Block::TaggedBlock(TaggedBlock {
            tag: "div".to_string(),
            args: call.args,
            attrs,
            body: TagBody::Blocks(children),
            span: call.span,
        })))
    }
}

/// `link url`: an `<a>` around inline content.
struct LinkTag;

impl TagHandler for LinkTag {
    fn handle<'a>(&self, mut call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        if call.attrs.get("href").is_none() {
            let href = call.args.first().cloned().unwrap_or_default();
            call.attrs.set("href", href);
        }
        let body = TagBody::Inline(call.body_inline());
        Ok(Some(Block::TaggedBlock(TaggedBlock {
            tag: "a".to_string(),
            args: call.args,
            attrs: call.attrs,
            body,
            span: call.span,
        })))
    }
}

/// `quote [caption]`: a blockquote with optional attribution.
struct QuoteTag;

impl TagHandler for QuoteTag {
    fn handle<'a>(&self, mut call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        let blocks = call.children()?;
        Ok(Some(Block::Quote(Quote {
            blocks,
            caption: call.args.into_iter().next(),
            attrs: call.attrs,
            span: call.span,
        })))
    }
}

/// `image url` / `!image url`.
///
/// A first body line of the form `[text]` is the alt text; the remaining
/// lines are a caption, which wraps the image in a figure.
struct ImageTag {
    self_link: bool,
}

impl TagHandler for ImageTag {
    fn handle<'a>(&self, call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        let mut lines = trim_blank(call.body());
        let mut alt = None;
        if let Some(first) = lines.first() {
            if let Some(text) = first
                .text
                .strip_prefix('[')
                .and_then(|t| t.strip_suffix(']'))
            {
                alt = Some(text.to_string());
                lines = trim_blank(&lines[1..]);
            }
        }

        let caption = (!lines.is_empty()).then(|| call.inline_of(lines));
        Ok(Some(Block::Figure(Figure {
            src: call.args.first().cloned().unwrap_or_default(),
            alt,
            caption,
            self_link: self.self_link,
            attrs: call.attrs,
            span: call.span,
        })))
    }
}

/// `table`: pipe-delimited rows.
struct TableTag;

impl TagHandler for TableTag {
    fn handle<'a>(&self, mut call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        Ok(Some(Block::Table(call.table()?)))
    }
}

/// `insert toc|fulltoc|footnotes`: generated content placeholder.
struct InsertTag;

impl TagHandler for InsertTag {
    fn handle<'a>(&self, call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        let keyword = call.args.first().map(String::as_str).unwrap_or("");
        let kind = match keyword {
            "toc" => InsertKind::Toc,
            "fulltoc" => InsertKind::FullToc,
            "footnotes" => InsertKind::Footnotes,
            other => {
                log::warn!("line {}: unknown insert '{}' ignored", call.line, other);
                return Ok(None);
            }
        };
        Ok(Some(Block::Insert(Insert {
            kind,
            span: call.span,
        })))
    }
}

/// `footnote [id]`: records the body; renders nothing in place.
struct FootnoteTag;

impl TagHandler for FootnoteTag {
    fn handle<'a>(&self, mut call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
        call.ctx.footnote = true;
        let blocks = call.children()?;
        let id = call.args.first().cloned();
        call.add_footnote(id, blocks);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_names() {
        assert!(is_rule_name("hr"));
        assert!(is_rule_name("-----"));
        assert!(!is_rule_name("-x-"));
        assert!(!is_rule_name(""));
    }

    #[test]
    fn test_element_classes() {
        assert!(is_html_element("div"));
        assert!(is_html_element("span"));
        assert!(is_html_element("img"));
        assert!(!is_html_element("bogus"));
        assert_eq!(heading_level("h3"), Some(3));
        assert_eq!(heading_level("h7"), None);
    }

    #[test]
    fn test_builtins_registered() {
        let registry = TagRegistry::with_builtins();
        for name in ["code", "comment", "image", "!image", "insert", "footnote", "table", "nl2lb"] {
            assert!(registry.contains(name), "missing {}", name);
        }
        assert!(!TagRegistry::new().contains("code"));
    }
}
