//! Raw HTML block detection.
//!
//! A line starting at the context margin with a block-level HTML opening tag
//! begins a raw block. The block runs until the tag is balanced again,
//! counting nested tags of the same name, and is emitted untouched.

use memchr::memchr_iter;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::lexer::Line;

static OPENING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<([A-Za-z][A-Za-z0-9]*)(?:[\s/>]|$)").unwrap());

/// Tags that open a raw HTML block.
pub const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "canvas", "dd", "details", "div", "dl",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "head", "header", "hgroup", "li", "main", "nav", "noscript", "ol", "output", "p", "pre",
    "script", "section", "style", "table", "tfoot", "title", "ul", "video",
];

/// Result of probing a line for a raw HTML block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection<'a> {
    /// Not an HTML block opener.
    None,
    /// Raw block spanning `lines[start..=end]`.
    Block { end: usize },
    /// Opener whose tag is never closed.
    Unmatched { tag: &'a str },
}

/// Block-level tag opened at the start of `line`, if any.
pub fn opening_tag<'a>(line: &Line<'a>) -> Option<&'a str> {
    let text = line.text;
    let name = OPENING_TAG.captures(text)?.get(1)?.as_str();
    BLOCK_TAGS
        .iter()
        .any(|t| t.eq_ignore_ascii_case(name))
        .then_some(name)
}

/// Probe `lines[start]` for a raw HTML block.
pub fn detect<'a>(lines: &[Line<'a>], start: usize) -> Detection<'a> {
    let Some(tag) = lines.get(start).and_then(opening_tag) else {
        return Detection::None;
    };

    let mut depth = 0i64;
    for (i, line) in lines.iter().enumerate().skip(start) {
        depth += tag_balance(line.text, tag);
        if depth <= 0 {
            return Detection::Block { end: i };
        }
    }
    Detection::Unmatched { tag }
}

/// Opening minus closing occurrences of `tag` on one line.
fn tag_balance(text: &str, tag: &str) -> i64 {
    let bytes = text.as_bytes();
    let mut balance = 0;
    for pos in memchr_iter(b'<', bytes) {
        let (closing, name_start) = match bytes.get(pos + 1) {
            Some(b'/') => (true, pos + 2),
            _ => (false, pos + 1),
        };
        let name_end = name_start + tag.len();
        let Some(name) = text.get(name_start..name_end) else {
            continue;
        };
        if !name.eq_ignore_ascii_case(tag) {
            continue;
        }
        let boundary = bytes
            .get(name_end)
            .map_or(true, |&b| b == b'>' || b == b'/' || b.is_ascii_whitespace());
        if !boundary {
            continue;
        }
        if closing {
            balance -= 1;
        } else if !self_closing(&bytes[name_end..]) {
            balance += 1;
        }
    }
    balance
}

/// Whether the tag starting just before `rest` ends with `/>`.
fn self_closing(rest: &[u8]) -> bool {
    match rest.iter().position(|&b| b == b'>') {
        Some(end) => end > 0 && rest[end - 1] == b'/',
        None => false,
    }
}
