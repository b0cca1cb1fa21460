//! Resolution pass.
//!
//! Runs once over a fully parsed [`Document`]:
//!
//! 1. reference links and images are replaced by their definitions, or
//!    degraded to plain content when the label is unknown;
//! 2. footnotes and footnote references are numbered;
//! 3. a footnote placeholder is appended when footnotes exist but the
//!    document has no `insert footnotes` block.
//!
//! Tables of contents are built from the heading table on demand by
//! [`toc_entries`].

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use crate::ast::{
    plain_text, Block, Document, FootnoteRef, HeadingEntry, Inline, Insert, InsertKind, LinkDef,
    LinkTarget, TagBody,
};
use crate::span::Span;

/// Anchor id for heading text: lower-cased, non-alphanumeric runs turned
/// into single hyphens.
///
/// ```rust
/// use syntext_core::resolve::anchor_id;
///
/// assert_eq!(anchor_id("Hello, World!"), "hello-world");
/// assert_eq!(anchor_id("2nd try"), "id-2nd-try");
/// assert_eq!(anchor_id("???"), "id");
/// ```
pub fn anchor_id(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut gap = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if gap && !out.is_empty() {
                out.push('-');
            }
            gap = false;
            out.extend(c.to_lowercase());
        } else {
            gap = true;
        }
    }

    if out.is_empty() {
        return "id".to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "id-");
    }
    out
}

/// Lookup key for a reference label: lower-cased, whitespace collapsed.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Resolve references and number footnotes in place.
pub fn resolve(doc: &mut Document<'_>) {
    let Document {
        blocks,
        link_refs,
        image_refs,
        footnotes,
        ..
    } = &mut *doc;

    let refs = References {
        links: link_refs,
        images: image_refs,
    };
    visit_inline_lists(blocks, &mut |inlines| refs.resolve(inlines));
    for footnote in footnotes.iter_mut() {
        visit_inline_lists(&mut footnote.blocks, &mut |inlines| refs.resolve(inlines));
    }

    number_footnotes(doc);

    if !doc.footnotes.is_empty() && !has_insert(&doc.blocks, InsertKind::Footnotes) {
        doc.blocks.push(Block::Insert(Insert {
            kind: InsertKind::Footnotes,
            span: Span::default(),
        }));
    }

    log::debug!(
        "resolved {} headings, {} footnotes",
        doc.headings.len(),
        doc.footnotes.len()
    );
}

// ============================================================================
// References
// ============================================================================

struct References<'r> {
    links: &'r HashMap<String, LinkDef>,
    images: &'r HashMap<String, LinkDef>,
}

impl References<'_> {
    fn resolve<'a>(&self, inlines: &mut Vec<Inline<'a>>) {
        if !inlines.iter().any(needs_resolution) {
            return;
        }

        let mut out = Vec::with_capacity(inlines.len());
        for inline in inlines.drain(..) {
            match inline {
                Inline::Link(mut link) => {
                    self.resolve(&mut link.children);
                    let LinkTarget::Reference(label) = &link.target else {
                        out.push(Inline::Link(link));
                        continue;
                    };
                    let key = lookup_key(label, || plain_text(&link.children));
                    match self.links.get(&key) {
                        Some(def) => {
                            link.target = LinkTarget::Direct(Cow::Owned(def.url.clone()));
                            link.title = def.title.clone().map(Cow::Owned);
                            out.push(Inline::Link(link));
                        }
                        None => {
                            log::warn!("unresolved link reference '{}'", key);
                            out.append(&mut link.children);
                        }
                    }
                }
                Inline::Image(mut image) => {
                    let LinkTarget::Reference(label) = &image.target else {
                        out.push(Inline::Image(image));
                        continue;
                    };
                    let key = lookup_key(label, || image.alt.to_string());
                    match self.images.get(&key).or_else(|| self.links.get(&key)) {
                        Some(def) => {
                            image.target = LinkTarget::Direct(Cow::Owned(def.url.clone()));
                            image.title = def.title.clone().map(Cow::Owned);
                            out.push(Inline::Image(image));
                        }
                        None => {
                            log::warn!("unresolved image reference '{}'", key);
                            out.push(Inline::Text(image.alt));
                        }
                    }
                }
                mut other => {
                    if let Some(children) = children_mut(&mut other) {
                        self.resolve(children);
                    }
                    out.push(other);
                }
            }
        }
        *inlines = out;
    }
}

fn lookup_key(label: &str, fallback: impl FnOnce() -> String) -> String {
    if label.is_empty() {
        normalize_label(&fallback())
    } else {
        normalize_label(label)
    }
}

fn needs_resolution(inline: &Inline<'_>) -> bool {
    match inline {
        Inline::Link(link) => {
            matches!(link.target, LinkTarget::Reference(_))
                || link.children.iter().any(needs_resolution)
        }
        Inline::Image(image) => matches!(image.target, LinkTarget::Reference(_)),
        Inline::Emphasis(c)
        | Inline::Strong(c)
        | Inline::BoldItalic(c)
        | Inline::Superscript(c)
        | Inline::Subscript(c) => c.iter().any(needs_resolution),
        _ => false,
    }
}

fn children_mut<'i, 'a>(inline: &'i mut Inline<'a>) -> Option<&'i mut Vec<Inline<'a>>> {
    match inline {
        Inline::Emphasis(c)
        | Inline::Strong(c)
        | Inline::BoldItalic(c)
        | Inline::Superscript(c)
        | Inline::Subscript(c) => Some(c),
        Inline::Link(link) => Some(&mut link.children),
        _ => None,
    }
}

// ============================================================================
// Footnotes
// ============================================================================

/// Hands out auto-numbered labels, skipping numbers taken by explicit ids.
struct LabelAllocator<'r> {
    reserved: &'r HashSet<u64>,
    next: u64,
}

impl<'r> LabelAllocator<'r> {
    fn new(reserved: &'r HashSet<u64>) -> Self {
        Self { reserved, next: 1 }
    }

    fn next_label(&mut self) -> String {
        while self.reserved.contains(&self.next) {
            self.next += 1;
        }
        let label = self.next.to_string();
        self.next += 1;
        label
    }
}

/// Number footnote bodies and references.
///
/// The k-th auto-numbered reference (main text first, then footnote bodies)
/// and the k-th auto-numbered footnote body receive the same label.
fn number_footnotes<'a>(doc: &mut Document<'a>) {
    let mut reserved = HashSet::new();
    for footnote in &doc.footnotes {
        if let Some(n) = footnote.id.as_deref().and_then(|id| id.parse::<u64>().ok()) {
            reserved.insert(n);
        }
    }
    let mut collect = |inlines: &mut Vec<Inline<'a>>| {
        for_each_footnote_ref(inlines, &mut |r| {
            if let Some(n) = r.id.as_deref().and_then(|id| id.parse::<u64>().ok()) {
                reserved.insert(n);
            }
        });
    };
    visit_inline_lists(&mut doc.blocks, &mut collect);
    for footnote in doc.footnotes.iter_mut() {
        visit_inline_lists(&mut footnote.blocks, &mut collect);
    }

    let mut defs = LabelAllocator::new(&reserved);
    let mut defined = HashSet::new();
    for footnote in doc.footnotes.iter_mut() {
        footnote.label = match &footnote.id {
            Some(id) => id.clone(),
            None => defs.next_label(),
        };
        if !defined.insert(footnote.label.clone()) {
            log::warn!("footnote '{}' defined more than once", footnote.label);
        }
    }

    let mut refs = LabelAllocator::new(&reserved);
    let mut seen = HashSet::new();
    let mut assign = |inlines: &mut Vec<Inline<'a>>| {
        for_each_footnote_ref(inlines, &mut |r| {
            let label = match &r.id {
                Some(id) => id.to_string(),
                None => refs.next_label(),
            };
            r.defined = defined.contains(&label);
            if !r.defined {
                log::warn!("footnote reference '{}' has no footnote", label);
            }
            r.first = seen.insert(label.clone());
            r.label = Some(label);
        });
    };
    visit_inline_lists(&mut doc.blocks, &mut assign);
    for footnote in doc.footnotes.iter_mut() {
        visit_inline_lists(&mut footnote.blocks, &mut assign);
    }
}

fn for_each_footnote_ref<'a>(
    inlines: &mut [Inline<'a>],
    f: &mut dyn FnMut(&mut FootnoteRef<'a>),
) {
    for inline in inlines {
        match inline {
            Inline::FootnoteRef(r) => f(r),
            other => {
                if let Some(children) = children_mut(other) {
                    for_each_footnote_ref(children, f);
                }
            }
        }
    }
}

// ============================================================================
// Traversal
// ============================================================================

/// Call `f` on every inline sequence in `blocks`, in document order.
fn visit_inline_lists<'a>(blocks: &mut [Block<'a>], f: &mut dyn FnMut(&mut Vec<Inline<'a>>)) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => f(&mut p.content),
            Block::Heading(h) => f(&mut h.content),
            Block::List(list) | Block::BlockList(list) => {
                for item in &mut list.items {
                    visit_inline_lists(&mut item.blocks, f);
                }
            }
            Block::DefinitionList(dl) => {
                for item in &mut dl.items {
                    f(&mut item.term);
                    visit_inline_lists(&mut item.blocks, f);
                }
            }
            Block::Table(table) => {
                for row in &mut table.rows {
                    for cell in &mut row.cells {
                        f(cell);
                    }
                }
            }
            Block::TaggedBlock(tagged) => match &mut tagged.body {
                TagBody::Blocks(children) => visit_inline_lists(children, f),
                TagBody::Inline(content) => f(content),
                TagBody::Empty | TagBody::Raw(_) | TagBody::Escaped(_) => {}
            },
            Block::Quote(quote) => visit_inline_lists(&mut quote.blocks, f),
            Block::Group(children) => visit_inline_lists(children, f),
            Block::Figure(figure) => {
                if let Some(caption) = &mut figure.caption {
                    f(caption);
                }
            }
            Block::CodeBlock(_)
            | Block::HorizontalRule(_)
            | Block::RawHtml(_)
            | Block::Comment(_)
            | Block::Insert(_) => {}
        }
    }
}

fn has_insert(blocks: &[Block<'_>], kind: InsertKind) -> bool {
    blocks.iter().any(|block| match block {
        Block::Insert(insert) => insert.kind == kind,
        Block::List(list) | Block::BlockList(list) => {
            list.items.iter().any(|item| has_insert(&item.blocks, kind))
        }
        Block::DefinitionList(dl) => dl.items.iter().any(|item| has_insert(&item.blocks, kind)),
        Block::TaggedBlock(tagged) => match &tagged.body {
            TagBody::Blocks(children) => has_insert(children, kind),
            _ => false,
        },
        Block::Quote(quote) => has_insert(&quote.blocks, kind),
        Block::Group(children) => has_insert(children, kind),
        _ => false,
    })
}

// ============================================================================
// Table of contents
// ============================================================================

/// One node of a table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry<'h> {
    pub heading: &'h HeadingEntry,
    /// Deeper headings up to the next heading of this level or above.
    pub children: Vec<TocEntry<'h>>,
}

/// Nest headings by level. `full` keeps level-1 headings; otherwise they
/// are left out and their subheadings move up.
pub fn toc_entries(headings: &[HeadingEntry], full: bool) -> Vec<TocEntry<'_>> {
    let selected: Vec<&HeadingEntry> = headings
        .iter()
        .filter(|h| full || h.level > 1)
        .collect();
    nest(&selected)
}

fn nest<'h>(headings: &[&'h HeadingEntry]) -> Vec<TocEntry<'h>> {
    let mut entries = Vec::new();
    let mut i = 0;
    while i < headings.len() {
        let level = headings[i].level;
        let mut end = i + 1;
        while end < headings.len() && headings[end].level > level {
            end += 1;
        }
        entries.push(TocEntry {
            heading: headings[i],
            children: nest(&headings[i + 1..end]),
        });
        i = end;
    }
    entries
}
