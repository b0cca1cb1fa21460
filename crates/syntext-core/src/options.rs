//! Render configuration.
//!
//! [`RenderOptions`] is passed explicitly through parsing, resolution and
//! HTML output; nothing in the crate reads global settings.

use std::fmt;
use std::sync::Arc;

use crate::tags::{TagHandler, TagRegistry};

/// Default width of a tab stop.
pub const DEFAULT_TAB_SIZE: usize = 4;

/// Syntax highlighter for `code` blocks.
///
/// Returns highlighted HTML for `code`, or `None` when the language is not
/// supported, in which case the code is emitted escaped.
pub trait Highlighter: Send + Sync {
    fn highlight(&self, lang: &str, code: &str) -> Option<String>;
}

/// Options for one compilation.
///
/// ```rust
/// use syntext_core::RenderOptions;
///
/// let options = RenderOptions::new().with_tab_size(2).with_pygmentize(true);
/// assert_eq!(options.tab_size, 2);
/// ```
#[derive(Clone)]
pub struct RenderOptions {
    /// Columns per tab stop when expanding tabs.
    pub tab_size: usize,
    /// Hand `code` blocks with a language to the highlighter.
    pub pygmentize: bool,
    pub highlighter: Option<Arc<dyn Highlighter>>,
    /// Built-in and custom tag handlers.
    pub tags: TagRegistry,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self {
            tab_size: DEFAULT_TAB_SIZE,
            pygmentize: false,
            highlighter: None,
            tags: TagRegistry::with_builtins(),
        }
    }

    pub fn with_tab_size(mut self, tab_size: usize) -> Self {
        self.tab_size = tab_size;
        self
    }

    pub fn with_pygmentize(mut self, pygmentize: bool) -> Self {
        self.pygmentize = pygmentize;
        self
    }

    pub fn with_highlighter(mut self, highlighter: impl Highlighter + 'static) -> Self {
        self.highlighter = Some(Arc::new(highlighter));
        self
    }

    /// Register a custom tag, replacing any handler of the same name.
    pub fn with_tag(mut self, name: &str, handler: impl TagHandler + 'static) -> Self {
        self.tags.register(name, handler);
        self
    }

    /// The highlighter to use, if highlighting is enabled.
    pub(crate) fn active_highlighter(&self) -> Option<&dyn Highlighter> {
        if !self.pygmentize {
            return None;
        }
        self.highlighter.as_deref()
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOptions")
            .field("tab_size", &self.tab_size)
            .field("pygmentize", &self.pygmentize)
            .field("highlighter", &self.highlighter.is_some())
            .field("tags", &self.tags)
            .finish()
    }
}
