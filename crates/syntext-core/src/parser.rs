//! Block structure parser.
//!
//! Parses the normalized source into a tree of [`Block`]s. The parser is a
//! recursive descent over lines: a construct's body is every following line
//! that is blank or indented deeper than the construct's marker, and nested
//! bodies are dedented before recursion, so each recursive call sees its
//! content starting at column 0.
//!
//! While parsing, reference definitions, footnote bodies and headings are
//! collected into the [`Document`] side tables for the resolver.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{
    plain_text, Alignment, AttributeSet, Block, CodeBlock, Definition, DefinitionList, Document,
    Footnote, Heading, HeadingEntry, Inline, LinkDef, List, ListItem, Paragraph, Raw, RowKind,
    Table, TableRow,
};
use crate::attrs::{parse_args, parse_header};
use crate::error::{CompileError, Result};
use crate::html_block::{self, Detection};
use crate::inline::{parse_inlines, parse_lines};
use crate::lexer::{block_text, dedent, trim_blank, Lexer, Line};
use crate::options::RenderOptions;
use crate::resolve::{anchor_id, normalize_label};
use crate::span::{LineIndex, Span};
use crate::tags::{TagCall, TagHost};

/// Maximum number of nested block contexts.
pub const MAX_NESTING_DEPTH: usize = 64;

static LINK_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}(!?)\[([^\]^][^\]]*)\]:(?:\s+(\S+))?(?:\s+(.+))?$").unwrap()
});

static SHORTHAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:([A-Za-z!-][A-Za-z0-9_-]*)(?:\s+(.*))?$").unwrap());

/// Inherited state of one nesting level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    pub depth: usize,
    /// Newlines in inline content become hard breaks.
    pub nl2lb: bool,
    /// Nested content is passed through unprocessed.
    pub raw: bool,
    /// Inside a footnote body; headings stay out of the table of contents.
    pub footnote: bool,
}

impl Context {
    #[inline]
    pub fn nested(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }
}

/// Block structure parser.
///
/// ```rust
/// use syntext_core::{Parser, RenderOptions};
///
/// let options = RenderOptions::default();
/// let doc = Parser::new(&options).parse("# Title\n\nSome *text*.").unwrap();
/// assert_eq!(doc.blocks.len(), 2);
/// assert_eq!(doc.headings[0].anchor, "title");
/// ```
pub struct Parser<'o> {
    options: &'o RenderOptions,
}

impl<'o> Parser<'o> {
    pub fn new(options: &'o RenderOptions) -> Self {
        Self { options }
    }

    /// Parse normalized source into an unresolved document.
    pub fn parse<'a>(&self, source: &'a str) -> Result<Document<'a>> {
        let lines: Vec<Line<'a>> = Lexer::new(source).collect();
        let mut state = BlockParser {
            source,
            index: LineIndex::new(source),
            options: self.options,
            doc: Document::default(),
            anchors: HashSet::new(),
        };

        let blocks = state.parse_lines(&lines, Context::default())?;
        let mut doc = state.doc;
        doc.blocks = blocks;

        log::debug!(
            "parsed {} lines into {} blocks ({} headings, {} footnotes, {} references)",
            lines.len(),
            doc.blocks.len(),
            doc.headings.len(),
            doc.footnotes.len(),
            doc.link_refs.len() + doc.image_refs.len()
        );
        Ok(doc)
    }
}

struct BlockParser<'a, 'o> {
    source: &'a str,
    index: LineIndex,
    options: &'o RenderOptions,
    doc: Document<'a>,
    anchors: HashSet<String>,
}

impl<'a, 'o> BlockParser<'a, 'o> {
    #[inline]
    fn line_of(&self, line: &Line<'_>) -> u32 {
        self.index.line_of(line.span.start)
    }

    fn parse_lines(&mut self, lines: &[Line<'a>], ctx: Context) -> Result<Vec<Block<'a>>> {
        if ctx.depth > MAX_NESTING_DEPTH {
            let line = lines.first().map_or(1, |l| self.line_of(l));
            return Err(CompileError::excessive_nesting(MAX_NESTING_DEPTH, line));
        }

        let mut blocks = Vec::with_capacity(16);
        let mut pos = 0;
        while pos < lines.len() {
            if lines[pos].is_blank() {
                pos += 1;
                continue;
            }
            pos = self.parse_block(lines, pos, ctx, &mut blocks)?;
        }
        Ok(blocks)
    }

    /// Parse the block starting at `lines[pos]`, returning the index after it.
    fn parse_block(
        &mut self,
        lines: &[Line<'a>],
        pos: usize,
        ctx: Context,
        blocks: &mut Vec<Block<'a>>,
    ) -> Result<usize> {
        let line = lines[pos];

        match html_block::detect(lines, pos) {
            Detection::Block { end } => {
                let raw = &lines[pos..=end];
                blocks.push(Block::RawHtml(Raw {
                    content: block_text(self.source, raw),
                    span: line.span.merge(lines[end].span),
                }));
                return Ok(end + 1);
            }
            Detection::Unmatched { tag } => {
                return Err(CompileError::unmatched_html_tag(tag, self.line_of(&line)));
            }
            Detection::None => {}
        }

        if line.indent() >= 4 {
            return Ok(self.parse_code_block(lines, pos, blocks));
        }

        if let Some(next) = self.parse_boxed_heading(lines, pos, ctx, blocks) {
            return Ok(next);
        }

        if is_rule(&line) {
            blocks.push(Block::HorizontalRule(line.span));
            return Ok(pos + 1);
        }

        if let Some((level, text)) = hash_heading(&line) {
            let content = parse_inlines(text, ctx.nl2lb);
            blocks.push(self.heading(level, content, line.span, ctx));
            return Ok(pos + 1);
        }

        // decoration lines not attached to any heading
        if underline_char(&line).is_some() || is_colon_line(&line) {
            return Ok(pos + 1);
        }

        if definition_term(&line).is_some() {
            return self.parse_definition_list(lines, pos, ctx, blocks);
        }

        if let Some(marker) = list_marker(&line) {
            return self.parse_list(lines, pos, marker, ctx, blocks);
        }

        if tag_header(&line).is_some() {
            return self.parse_tagged_block(lines, pos, ctx, blocks);
        }

        if let Some(next) = self.parse_link_definition(lines, pos) {
            return Ok(next);
        }

        self.parse_paragraph(lines, pos, ctx, blocks)
    }

    // ========================================================================
    // Headings
    // ========================================================================

    fn heading(
        &mut self,
        level: u8,
        content: Vec<Inline<'a>>,
        span: Span,
        ctx: Context,
    ) -> Block<'a> {
        let anchor = self.register_heading(level, &content, None, !ctx.footnote);
        Block::Heading(Heading {
            level,
            content,
            anchor,
            span,
        })
    }

    /// Reserve a unique anchor for a heading and, with `in_toc`, list it in
    /// the heading table.
    fn register_heading(
        &mut self,
        level: u8,
        content: &[Inline<'_>],
        id: Option<&str>,
        in_toc: bool,
    ) -> String {
        let text = plain_text(content);
        let anchor = match id {
            Some(id) => id.to_string(),
            None => {
                let base = anchor_id(&text);
                let mut anchor = base.clone();
                let mut n = 1;
                while self.anchors.contains(&anchor) {
                    n += 1;
                    anchor = format!("{}-{}", base, n);
                }
                anchor
            }
        };
        self.anchors.insert(anchor.clone());
        if in_toc {
            self.doc.headings.push(HeadingEntry {
                level,
                text,
                anchor: anchor.clone(),
            });
        }
        anchor
    }

    /// A text line between two identical `=`/`-` lines.
    fn parse_boxed_heading(
        &mut self,
        lines: &[Line<'a>],
        pos: usize,
        ctx: Context,
        blocks: &mut Vec<Block<'a>>,
    ) -> Option<usize> {
        let over = underline_char(&lines[pos])?;
        let title = lines.get(pos + 1)?;
        let under = lines.get(pos + 2)?;
        if title.is_blank() || underline_char(title).is_some() || underline_char(under) != Some(over)
        {
            return None;
        }

        let level = if over == b'=' { 1 } else { 2 };
        let content = parse_inlines(title.content(), ctx.nl2lb);
        blocks.push(self.heading(level, content, lines[pos].span.merge(under.span), ctx));
        Some(pos + 3)
    }

    // ========================================================================
    // Code blocks
    // ========================================================================

    fn parse_code_block(
        &mut self,
        lines: &[Line<'a>],
        pos: usize,
        blocks: &mut Vec<Block<'a>>,
    ) -> usize {
        let end = body_end(lines, pos, 3);
        let body = dedent(&lines[pos..end]);
        blocks.push(Block::CodeBlock(CodeBlock {
            lang: None,
            content: block_text(self.source, &body),
            attrs: AttributeSet::new(),
            span: lines[pos].span.merge(lines[end - 1].span),
        }));
        end
    }

    // ========================================================================
    // Lists
    // ========================================================================

    fn parse_list(
        &mut self,
        lines: &[Line<'a>],
        pos: usize,
        first: Marker,
        ctx: Context,
        blocks: &mut Vec<Block<'a>>,
    ) -> Result<usize> {
        let start = pos;
        let mut items = Vec::new();
        let mut loose = first.family.is_bracketed();
        let mut pos = pos;
        let mut marker = first;

        let next = loop {
            let end = body_end(lines, pos + 1, marker.indent);

            let mut item_lines = Vec::with_capacity(end - pos);
            item_lines.push(lines[pos].skip(marker.width).dedent(usize::MAX));
            item_lines.extend(dedent(&lines[pos + 1..end]));
            let body = trim_blank(&item_lines);
            if body.iter().any(Line::is_blank) {
                loose = true;
            }

            items.push(ListItem {
                blocks: self.parse_lines(body, ctx.nested())?,
                span: lines[pos].span.merge(lines[end - 1].span),
            });

            let mut after = end;
            while after < lines.len() && lines[after].is_blank() {
                after += 1;
            }
            match lines.get(after).and_then(list_marker) {
                Some(m) if m.family == first.family => {
                    if after > end {
                        loose = true;
                    }
                    marker = m;
                    pos = after;
                }
                _ => break end,
            }
        };

        if items.len() == 1 {
            loose = true;
        }

        let list = List {
            ordered: first.family.is_ordered(),
            start: first.number.filter(|&n| n != 1),
            compact: !loose,
            items,
            span: lines[start].span.merge(lines[next - 1].span),
        };
        blocks.push(if first.family.is_bracketed() {
            Block::BlockList(list)
        } else {
            Block::List(list)
        });
        Ok(next)
    }

    fn parse_definition_list(
        &mut self,
        lines: &[Line<'a>],
        pos: usize,
        ctx: Context,
        blocks: &mut Vec<Block<'a>>,
    ) -> Result<usize> {
        let start = pos;
        let mut pos = pos;
        let mut items = Vec::new();

        let next = loop {
            let line = lines[pos];
            let term_text = definition_term(&line).unwrap_or_default();
            let end = body_end(lines, pos + 1, line.indent());
            let body = dedent(trim_blank(&lines[pos + 1..end]));

            items.push(Definition {
                term: parse_inlines(term_text, ctx.nl2lb),
                blocks: self.parse_lines(&body, ctx.nested())?,
            });

            let mut after = end;
            while after < lines.len() && lines[after].is_blank() {
                after += 1;
            }
            match lines.get(after) {
                Some(l) if definition_term(l).is_some() => pos = after,
                _ => break end,
            }
        };

        blocks.push(Block::DefinitionList(DefinitionList {
            items,
            span: lines[start].span.merge(lines[next - 1].span),
        }));
        Ok(next)
    }

    // ========================================================================
    // Tagged blocks
    // ========================================================================

    fn parse_tagged_block(
        &mut self,
        lines: &[Line<'a>],
        pos: usize,
        ctx: Context,
        blocks: &mut Vec<Block<'a>>,
    ) -> Result<usize> {
        let line = lines[pos];
        let line_no = self.line_of(&line);
        let (tag, mut args, attrs) = match tag_header(&line) {
            Some(HeaderForm::Tagged(text)) => {
                let header = parse_header(text, line_no)?;
                (header.tag, header.args, header.attrs)
            }
            Some(HeaderForm::Shorthand(name, text)) => {
                let (args, attrs) = parse_args(text, line_no)?;
                (name.to_string(), args, attrs)
            }
            None => return Ok(pos + 1),
        };

        let indent = line.indent();
        let end = body_end(lines, pos + 1, indent);
        let body = dedent(trim_blank(&lines[pos + 1..end]));

        let mut next = end;
        let mut last = lines[end - 1];
        let mut after = end;
        while after < lines.len() && lines[after].is_blank() {
            after += 1;
        }
        if let Some(terminator) = lines.get(after) {
            if is_colon_line(terminator) && terminator.indent() == indent {
                next = after + 1;
                last = *terminator;
            }
        }

        let mut tag_ctx = ctx;
        args.retain(|arg| match arg.as_str() {
            "nl2lb" | "nl2br" => {
                tag_ctx.nl2lb = true;
                false
            }
            "raw" => {
                tag_ctx.raw = true;
                false
            }
            _ => true,
        });

        let options = self.options;
        let span = line.span.merge(last.span);
        let call = TagCall::new(&tag, args, attrs, span, line_no, &body, tag_ctx, self);
        if let Some(block) = options.tags.dispatch(call)? {
            blocks.push(block);
        }
        Ok(next)
    }

    // ========================================================================
    // Reference definitions
    // ========================================================================

    /// `[label]: url "title"`, with url and title optionally on following
    /// indented lines.
    fn parse_link_definition(&mut self, lines: &[Line<'a>], pos: usize) -> Option<usize> {
        let caps = LINK_DEF.captures(lines[pos].text)?;
        let image = !caps[1].is_empty();
        let label = normalize_label(&caps[2]);
        let mut url = caps.get(3).map(|m| m.as_str().to_string());
        let mut title = caps.get(4).map(|m| m.as_str());
        let mut next = pos + 1;

        if url.is_none() {
            let line = lines.get(next).filter(|l| l.indent() > 0 && !l.is_blank())?;
            let (u, t) = match line.content().split_once(char::is_whitespace) {
                Some((u, t)) => (u, Some(t.trim())),
                None => (line.content(), None),
            };
            url = Some(u.to_string());
            title = t;
            next += 1;
        }
        if title.is_none() {
            if let Some(line) = lines.get(next) {
                if line.indent() > 0 && unquote_title(line.content()).is_some() {
                    title = Some(line.content());
                    next += 1;
                }
            }
        }

        let title = match title {
            Some(t) => Some(unquote_title(t)?.to_string()),
            None => None,
        };
        let url = url?;
        let url = url
            .strip_prefix('<')
            .and_then(|u| u.strip_suffix('>'))
            .map(str::to_string)
            .unwrap_or(url);

        let table = if image {
            &mut self.doc.image_refs
        } else {
            &mut self.doc.link_refs
        };
        table.entry(label).or_insert(LinkDef { url, title });
        Some(next)
    }

    // ========================================================================
    // Paragraphs and tables
    // ========================================================================

    fn parse_paragraph(
        &mut self,
        lines: &[Line<'a>],
        pos: usize,
        ctx: Context,
        blocks: &mut Vec<Block<'a>>,
    ) -> Result<usize> {
        let mut end = pos + 1;
        while end < lines.len() {
            let line = &lines[end];
            if line.is_blank() {
                break;
            }
            if let Some(c) = underline_char(line) {
                let level = if c == b'=' { 1 } else { 2 };
                let content = parse_lines(self.source, &lines[pos..end], ctx.nl2lb);
                blocks.push(self.heading(
                    level,
                    content,
                    lines[pos].span.merge(line.span),
                    ctx,
                ));
                return Ok(end + 1);
            }
            if interrupts_paragraph(line) {
                break;
            }
            end += 1;
        }

        let para = &lines[pos..end];
        let span = para[0].span.merge(para[para.len() - 1].span);
        if is_table(para) {
            let table = self.parse_table(para, AttributeSet::new(), ctx)?;
            blocks.push(Block::Table(table));
        } else {
            blocks.push(Block::Paragraph(Paragraph {
                content: parse_lines(self.source, para, ctx.nl2lb),
                span,
            }));
        }
        Ok(end)
    }

    fn parse_table(
        &mut self,
        lines: &[Line<'a>],
        attrs: AttributeSet,
        ctx: Context,
    ) -> Result<Table<'a>> {
        let rows: Vec<Line<'a>> = lines.iter().filter(|l| !l.is_blank()).copied().collect();
        let span = match (rows.first(), rows.last()) {
            (Some(first), Some(last)) => first.span.merge(last.span),
            _ => Span::default(),
        };

        // decorative border rows
        let mut inner = rows.as_slice();
        if inner.first().is_some_and(|l| is_separator(l.text)) {
            inner = &inner[1..];
        }
        if inner.last().is_some_and(|l| is_separator(l.text)) {
            inner = &inner[..inner.len() - 1];
        }

        let mut alignments = None;
        if let Some(row) = rows.iter().find(|l| is_separator(l.text) && l.text.contains(':')) {
            alignments = Some(parse_alignments(row.text, self.line_of(row))?);
        }

        let has_header = inner.len() > 2 && is_separator(inner[1].text);
        let has_footer = inner.len() > 3 && is_separator(inner[inner.len() - 2].text);

        let mut table_rows = Vec::with_capacity(inner.len());
        let mut columns = None;
        for (i, line) in inner.iter().enumerate() {
            if is_separator(line.text) {
                continue;
            }
            let cells: Vec<Vec<Inline<'a>>> = split_cells(line.text)
                .into_iter()
                .map(|cell| parse_inlines(cell, ctx.nl2lb))
                .collect();

            let expected = *columns.get_or_insert(cells.len());
            if cells.len() != expected {
                return Err(CompileError::invalid_table(
                    format!("row has {} cells, expected {}", cells.len(), expected),
                    self.line_of(line),
                ));
            }

            let kind = if i == 0 && has_header {
                RowKind::Header
            } else if i == inner.len() - 1 && has_footer {
                RowKind::Footer
            } else {
                RowKind::Body
            };
            table_rows.push(TableRow { cells, kind });
        }

        let columns = columns.unwrap_or(0);
        let alignments = match alignments {
            Some(a) if a.len() != columns && columns > 0 => {
                let line = rows
                    .iter()
                    .find(|l| is_separator(l.text) && l.text.contains(':'))
                    .map_or(1, |l| self.line_of(l));
                return Err(CompileError::invalid_table(
                    format!("alignment row has {} columns, expected {}", a.len(), columns),
                    line,
                ));
            }
            Some(a) => a,
            None => vec![Alignment::Default; columns],
        };

        Ok(Table {
            rows: table_rows,
            alignments,
            attrs,
            span,
        })
    }
}

impl<'a> TagHost<'a> for BlockParser<'a, '_> {
    fn source(&self) -> &'a str {
        self.source
    }

    fn options(&self) -> &RenderOptions {
        self.options
    }

    fn parse_blocks(&mut self, lines: &[Line<'a>], ctx: Context) -> Result<Vec<Block<'a>>> {
        self.parse_lines(lines, ctx)
    }

    fn parse_table(
        &mut self,
        lines: &[Line<'a>],
        attrs: AttributeSet,
        ctx: Context,
    ) -> Result<Table<'a>> {
        BlockParser::parse_table(self, lines, attrs, ctx)
    }

    fn add_footnote(&mut self, id: Option<String>, blocks: Vec<Block<'a>>, span: Span) {
        self.doc.footnotes.push(Footnote {
            id,
            label: String::new(),
            blocks,
            span,
        });
    }

    fn add_heading(
        &mut self,
        level: u8,
        content: &[Inline<'a>],
        id: Option<&str>,
        in_toc: bool,
    ) -> String {
        self.register_heading(level, content, id, in_toc)
    }
}

// ============================================================================
// Line classification
// ============================================================================

/// End (exclusive) of the body starting at `from`: lines that are blank or
/// indented more than `margin`, without trailing blank lines.
fn body_end(lines: &[Line<'_>], from: usize, margin: usize) -> usize {
    let mut end = from;
    for (i, line) in lines.iter().enumerate().skip(from) {
        if line.is_blank() {
            continue;
        }
        if line.indent() <= margin {
            break;
        }
        end = i + 1;
    }
    end
}

/// `***`, `---` or `* * *`.
fn is_rule(line: &Line<'_>) -> bool {
    if line.indent() > 3 {
        return false;
    }
    let content = line.content().as_bytes();
    let Some(&c) = content.first() else {
        return false;
    };
    (c == b'*' || c == b'-')
        && content.iter().all(|&b| b == c || b == b' ')
        && content.iter().filter(|&&b| b == c).count() >= 3
}

/// `#`-prefixed heading: level and text with any closing `#` run removed.
fn hash_heading<'a>(line: &Line<'a>) -> Option<(u8, &'a str)> {
    if line.indent() > 3 {
        return None;
    }
    let content = line.content();
    let level = content.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &content[level..];
    if !(rest.is_empty() || rest.starts_with(' ')) {
        return None;
    }

    let text = rest.trim();
    let stripped = text.trim_end_matches('#');
    let text = if stripped.is_empty() || stripped.ends_with(' ') {
        stripped.trim_end()
    } else {
        text
    };
    Some((level as u8, text))
}

/// The repeated character of an all-`=` or all-`-` line.
fn underline_char(line: &Line<'_>) -> Option<u8> {
    if line.indent() > 3 {
        return None;
    }
    let content = line.content().as_bytes();
    let &c = content.first()?;
    (content.len() >= 2 && (c == b'=' || c == b'-') && content.iter().all(|&b| b == c))
        .then_some(c)
}

fn is_colon_line(line: &Line<'_>) -> bool {
    let content = line.content();
    !content.is_empty() && content.bytes().all(|b| b == b':')
}

/// Term text of a `[[term]]` line.
fn definition_term<'a>(line: &Line<'a>) -> Option<&'a str> {
    if line.indent() > 3 {
        return None;
    }
    let term = line.content().strip_prefix("[[")?.strip_suffix("]]")?;
    Some(term.trim())
}

enum HeaderForm<'a> {
    /// `::: tag args`
    Tagged(&'a str),
    /// `:tag args`
    Shorthand(&'a str, &'a str),
}

fn tag_header<'a>(line: &Line<'a>) -> Option<HeaderForm<'a>> {
    if line.indent() > 3 {
        return None;
    }
    let content = line.content();
    if content.starts_with(":::") {
        let rest = content.trim_start_matches(':');
        return (!rest.trim().is_empty()).then_some(HeaderForm::Tagged(rest));
    }
    let caps = SHORTHAND.captures(content)?;
    let name = caps.get(1)?.as_str();
    let args = caps.get(2).map_or("", |m| m.as_str());
    Some(HeaderForm::Shorthand(name, args))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Star,
    Dash,
    Plus,
    Bullet,
    Number,
    Hash,
    /// `(*)`
    BracketStar,
    /// `(#)`
    BracketHash,
}

impl Family {
    fn is_ordered(self) -> bool {
        matches!(self, Family::Number | Family::Hash | Family::BracketHash)
    }

    fn is_bracketed(self) -> bool {
        matches!(self, Family::BracketStar | Family::BracketHash)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Marker {
    family: Family,
    indent: usize,
    /// Bytes up to the end of the marker, indentation included.
    width: usize,
    number: Option<u64>,
}

fn list_marker(line: &Line<'_>) -> Option<Marker> {
    let indent = line.indent();
    if indent > 3 {
        return None;
    }
    let rest = line.content();
    let bytes = rest.as_bytes();

    let (family, len, number) = if rest.starts_with("(*)") {
        (Family::BracketStar, 3, None)
    } else if rest.starts_with("(#)") {
        (Family::BracketHash, 3, None)
    } else if rest.starts_with('•') {
        (Family::Bullet, '•'.len_utf8(), None)
    } else {
        match bytes.first()? {
            b'*' => (Family::Star, 1, None),
            b'-' => (Family::Dash, 1, None),
            b'+' => (Family::Plus, 1, None),
            b'#' if bytes.get(1) == Some(&b'.') => (Family::Hash, 2, None),
            b'0'..=b'9' => {
                let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
                if digits > 9 || bytes.get(digits) != Some(&b'.') {
                    return None;
                }
                (Family::Number, digits + 1, rest[..digits].parse().ok())
            }
            _ => return None,
        }
    };

    let after = &bytes[len..];
    if !(after.is_empty() || after[0] == b' ') {
        return None;
    }
    Some(Marker {
        family,
        indent,
        width: indent + len,
        number,
    })
}

/// Lines that end a paragraph without a blank line.
fn interrupts_paragraph(line: &Line<'_>) -> bool {
    if line.indent() > 3 {
        return false;
    }
    if is_rule(line) || hash_heading(line).is_some() || definition_term(line).is_some() {
        return true;
    }
    if tag_header(line).is_some() {
        return true;
    }
    match list_marker(line) {
        Some(m) if m.family == Family::Number => m.number == Some(1),
        Some(_) => true,
        None => false,
    }
}

fn unquote_title(text: &str) -> Option<&str> {
    let text = text.trim();
    let bytes = text.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    match (bytes[0], bytes[bytes.len() - 1]) {
        (b'"', b'"') | (b'\'', b'\'') | (b'(', b')') => Some(&text[1..text.len() - 1]),
        _ => None,
    }
}

// ============================================================================
// Table rows
// ============================================================================

/// A border or alignment row: only `-`, `:`, `|`, `+` and spaces.
fn is_separator(text: &str) -> bool {
    text.contains('-')
        && text
            .bytes()
            .all(|b| matches!(b, b'-' | b':' | b'|' | b'+' | b' '))
}

/// A paragraph made of pipe rows with a separator below the first row.
fn is_table(lines: &[Line<'_>]) -> bool {
    lines.len() >= 2
        && lines.iter().all(|l| l.text.contains('|'))
        && lines[1..].iter().any(|l| is_separator(l.text))
}

fn strip_border(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix(['|', '+']).unwrap_or(text);
    match text.strip_suffix(['|', '+']) {
        Some(inner) if !inner.ends_with('\\') => inner,
        _ => text,
    }
}

/// Split a row on unescaped pipes.
fn split_cells(text: &str) -> Vec<&str> {
    let text = strip_border(text);
    let bytes = text.as_bytes();
    let mut cells = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'|' => {
                cells.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    cells.push(text[start..].trim());
    cells
}

fn parse_alignments(text: &str, line: u32) -> Result<Vec<Alignment>> {
    strip_border(text)
        .split(['|', '+'])
        .map(|cell| {
            let cell = cell.trim();
            let left = cell.starts_with(':');
            let right = cell.len() > 1 && cell.ends_with(':');
            let dashes = cell.trim_start_matches(':').trim_end_matches(':');
            if dashes.is_empty() || !dashes.bytes().all(|b| b == b'-') {
                return Err(CompileError::invalid_table("malformed alignment row", line));
            }
            Ok(match (left, right) {
                (true, true) => Alignment::Center,
                (true, false) => Alignment::Left,
                (false, true) => Alignment::Right,
                (false, false) => Alignment::Default,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> Line<'_> {
        Line {
            text,
            span: Span::new(0, text.len() as u32),
        }
    }

    #[test]
    fn test_rules() {
        assert!(is_rule(&line("---")));
        assert!(is_rule(&line(" * * *")));
        assert!(!is_rule(&line("-*-")));
        assert!(!is_rule(&line("--")));
    }

    #[test]
    fn test_hash_heading() {
        assert_eq!(hash_heading(&line("## Title ##")), Some((2, "Title")));
        assert_eq!(hash_heading(&line("# C#")), Some((1, "C#")));
        assert_eq!(hash_heading(&line("#hashtag")), None);
        assert_eq!(hash_heading(&line("####### seven")), None);
    }

    #[test]
    fn test_list_markers() {
        let m = list_marker(&line("12. twelve")).unwrap();
        assert_eq!(m.family, Family::Number);
        assert_eq!(m.number, Some(12));
        assert_eq!(m.width, 3);
        assert_eq!(list_marker(&line("• dot")).unwrap().family, Family::Bullet);
        assert_eq!(list_marker(&line("(#) x")).unwrap().family, Family::BracketHash);
        assert_eq!(list_marker(&line("#. x")).unwrap().family, Family::Hash);
        assert!(list_marker(&line("**bold**")).is_none());
        assert!(list_marker(&line("1.5 apples")).is_none());
    }

    #[test]
    fn test_body_end_skips_trailing_blanks() {
        let src = "head\n  a\n\n  b\n\n\nnext";
        let lines: Vec<_> = Lexer::new(src).collect();
        assert_eq!(body_end(&lines, 1, 0), 4);
    }

    #[test]
    fn test_split_cells() {
        assert_eq!(split_cells("| a | b \\| c |"), vec!["a", "b \\| c"]);
        assert_eq!(split_cells("x|y"), vec!["x", "y"]);
    }

    #[test]
    fn test_alignments() {
        let aligns = parse_alignments("|:---|:--:|---:|---|", 1).unwrap();
        assert_eq!(
            aligns,
            vec![
                Alignment::Left,
                Alignment::Center,
                Alignment::Right,
                Alignment::Default
            ]
        );
        assert!(parse_alignments("|:-:-|", 3).is_err());
    }

    #[test]
    fn test_shorthand_header() {
        assert!(matches!(
            tag_header(&line(":div .note")),
            Some(HeaderForm::Shorthand("div", ".note"))
        ));
        assert!(matches!(tag_header(&line("::: quote")), Some(HeaderForm::Tagged(" quote"))));
        assert!(tag_header(&line(":::")).is_none());
        assert!(tag_header(&line(":smile: text")).is_none());
    }
}
