//! # Syntext Core
//!
//! A compiler from an indentation-structured, Markdown-like markup to HTML.
//!
//! Compilation runs in fixed stages over one whole document:
//!
//! 1. normalization: line endings and tab expansion;
//! 2. front matter extraction ([`meta`]);
//! 3. block structure parsing ([`parser`]), which dispatches tagged blocks
//!    through the [`TagRegistry`] and collects references, footnotes and
//!    headings;
//! 4. resolution of references, footnote numbers and tables of contents
//!    ([`resolve`]);
//! 5. HTML serialization ([`html`]).
//!
//! ## Quick Start
//!
//! ```rust
//! use syntext_core::{render, RenderOptions};
//!
//! let out = render("# Title\n\nHello *world*.", &RenderOptions::default()).unwrap();
//! assert_eq!(out.html, "<h1 id=\"title\">Title</h1>\n<p>Hello <em>world</em>.</p>");
//! ```
//!
//! ## Errors
//!
//! Structural problems abort compilation with a [`CompileError`] carrying the
//! source line:
//!
//! ```rust
//! use syntext_core::{render, ErrorKind, RenderOptions};
//!
//! let err = render("text\n\n::: bogus\n    body", &RenderOptions::default()).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::UnknownTag);
//! assert_eq!(err.line(), 3);
//! ```
//!
//! Unresolved references and footnotes are not errors; they degrade to
//! plain text and are reported through the `log` facade.
//!
//! ## Custom tags
//!
//! ```rust
//! use syntext_core::ast::{Block, Raw};
//! use syntext_core::{render, RenderOptions, Result, TagCall, TagHandler};
//!
//! struct Shout;
//!
//! impl TagHandler for Shout {
//!     fn handle<'a>(&self, call: TagCall<'_, 'a>) -> Result<Option<Block<'a>>> {
//!         Ok(Some(Block::RawHtml(Raw {
//!             content: call.body_text().to_uppercase().into(),
//!             span: call.span,
//!         })))
//!     }
//! }
//!
//! let options = RenderOptions::new().with_tag("shout", Shout);
//! let out = render("::: shout\n    hey", &options).unwrap();
//! assert_eq!(out.html, "HEY");
//! ```

pub mod ast;
pub mod attrs;
pub mod error;
pub mod html;
pub mod html_block;
pub mod inline;
pub mod lexer;
pub mod meta;
pub mod options;
pub mod parser;
pub mod resolve;
pub mod span;
pub mod tags;

pub use ast::{AttributeSet, Block, Document, Inline};
pub use error::{CompileError, ErrorKind, Result};
pub use meta::{MetaValue, Metadata};
pub use options::{Highlighter, RenderOptions, DEFAULT_TAB_SIZE};
pub use parser::{Context, Parser, MAX_NESTING_DEPTH};
pub use tags::{TagCall, TagHandler, TagRegistry};

/// Output of [`render`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub html: String,
    /// Front matter, empty when the document has none.
    pub meta: Metadata,
}

/// Compile a document to HTML.
pub fn render(input: &str, options: &RenderOptions) -> Result<Rendered> {
    if options.pygmentize && options.highlighter.is_none() {
        log::warn!("pygmentize requested but no highlighter is configured");
    }

    let source = lexer::normalize(input, options.tab_size);
    let front = meta::split_front_matter(&source);
    if !front.meta.is_empty() {
        log::debug!("front matter: {} entries", front.meta.len());
    }

    let doc = compile(front.body, options).map_err(|e| e.offset_lines(front.lines))?;
    let html = html::to_html(&doc, options);
    log::debug!("rendered {} bytes of html", html.len());

    Ok(Rendered {
        html,
        meta: front.meta,
    })
}

/// Parse and resolve normalized source (tabs expanded, no front matter).
///
/// Line numbers in errors are relative to `source`.
pub fn compile<'a>(source: &'a str, options: &RenderOptions) -> Result<Document<'a>> {
    let mut doc = Parser::new(options).parse(source)?;
    resolve::resolve(&mut doc);
    Ok(doc)
}
