//! Inline span parser.
//!
//! Single left-to-right scan over the text of one block. Plain runs are
//! borrowed from the source; the scanner jumps from one special byte to the
//! next and tries the constructs that can start there, in this order of
//! precedence: verbatim (` `` `), code (`` ` ``), emphasis runs (`*`),
//! images and links (`![`, `[`), dashes (`--`, `---`), super/subscripts
//! (`^{`, `_{`), inline HTML and entities (`<`, `&`).
//!
//! Anything that does not match degrades to literal text.

use std::borrow::Cow;

use memchr::{memchr, memmem};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{Dash, FootnoteRef, Image, Inline, Link, LinkTarget};
use crate::lexer::{block_text, Line};

/// Inline constructs nested deeper than this are left as text.
pub const MAX_INLINE_DEPTH: usize = 64;

static INLINE_HTML: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?s:<!--.*?-->|</?[A-Za-z][A-Za-z0-9-]*(?:\s[^<>]*)?/?>)").unwrap()
});

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(?:#[0-9]{1,7}|#[xX][0-9A-Fa-f]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});").unwrap()
});

static AUTOLINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<((?:[A-Za-z][A-Za-z0-9+.-]*://|mailto:)[^\s<>]+)>").unwrap());

const SPECIAL: [bool; 256] = {
    let mut table = [false; 256];
    let specials = b"\\`*[!<&-^_\n";
    let mut i = 0;
    while i < specials.len() {
        table[specials[i] as usize] = true;
        i += 1;
    }
    table
};

/// Parse inline spans from the text of one block.
///
/// With `nl2lb` set, newlines become hard line breaks instead of soft ones.
pub fn parse_inlines(text: &str, nl2lb: bool) -> Vec<Inline<'_>> {
    if text.is_empty() {
        return Vec::new();
    }
    InlineParser::new(text, nl2lb, 0).parse()
}

/// Parse inline spans from a run of lines of one block.
///
/// Continuation lines are taken relative to the block's margin, so code and
/// verbatim spans keep only their own indentation.
pub fn parse_lines<'a>(source: &'a str, lines: &[Line<'a>], nl2lb: bool) -> Vec<Inline<'a>> {
    match block_text(source, lines) {
        Cow::Borrowed(text) => parse_inlines(text.trim_start(), nl2lb),
        Cow::Owned(text) => parse_inlines(text.trim_start(), nl2lb)
            .into_iter()
            .map(Inline::into_owned)
            .collect::<Vec<Inline<'static>>>(),
    }
}

struct InlineParser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    nl2lb: bool,
    depth: usize,
}

impl<'a> InlineParser<'a> {
    fn new(text: &'a str, nl2lb: bool, depth: usize) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            nl2lb,
            depth,
        }
    }

    fn nested(&self, text: &'a str) -> Vec<Inline<'a>> {
        if text.is_empty() {
            return Vec::new();
        }
        InlineParser::new(text, self.nl2lb, self.depth + 1).parse()
    }

    fn parse(&mut self) -> Vec<Inline<'a>> {
        if self.depth >= MAX_INLINE_DEPTH {
            return vec![Inline::Text(Cow::Borrowed(self.text))];
        }

        let mut inlines = Vec::with_capacity(8);
        let mut text_start = 0;

        while self.pos < self.bytes.len() {
            let next_special = self.find_next_special();
            if next_special >= self.bytes.len() {
                break;
            }

            self.pos = next_special;
            let parsed = match self.bytes[self.pos] {
                b'\\' => self.try_parse_escape(&mut inlines, &mut text_start),
                b'`' => self.try_parse_code(&mut inlines, &mut text_start),
                b'*' => self.try_parse_asterisks(&mut inlines, &mut text_start),
                b'!' => self.try_parse_image(&mut inlines, &mut text_start),
                b'[' => self.try_parse_bracket(&mut inlines, &mut text_start),
                b'-' => self.try_parse_dash(&mut inlines, &mut text_start),
                b'^' | b'_' => self.try_parse_script(&mut inlines, &mut text_start),
                b'<' => self.try_parse_angle(&mut inlines, &mut text_start),
                b'&' => self.try_parse_entity(&mut inlines, &mut text_start),
                b'\n' => self.parse_newline(&mut inlines, &mut text_start),
                _ => false,
            };

            if !parsed {
                self.pos += 1;
            }
        }

        if text_start < self.bytes.len() {
            inlines.push(self.text_node(text_start, self.bytes.len()));
        }

        inlines
    }

    #[inline(always)]
    fn find_next_special(&self) -> usize {
        self.bytes[self.pos..]
            .iter()
            .position(|&b| SPECIAL[b as usize])
            .map_or(self.bytes.len(), |offset| self.pos + offset)
    }

    #[inline(always)]
    fn text_node(&self, start: usize, end: usize) -> Inline<'a> {
        Inline::Text(Cow::Borrowed(&self.text[start..end]))
    }

    #[inline(always)]
    fn flush_text(&self, inlines: &mut Vec<Inline<'a>>, text_start: &mut usize) {
        if *text_start < self.pos {
            inlines.push(self.text_node(*text_start, self.pos));
        }
        *text_start = self.pos;
    }

    /// Push `node`, first flushing pending text, and continue at `end`.
    fn emit(
        &mut self,
        inlines: &mut Vec<Inline<'a>>,
        text_start: &mut usize,
        node: Inline<'a>,
        end: usize,
    ) -> bool {
        self.flush_text(inlines, text_start);
        inlines.push(node);
        self.pos = end;
        *text_start = end;
        true
    }

    #[inline(always)]
    fn byte_at(&self, pos: usize) -> Option<u8> {
        self.bytes.get(pos).copied()
    }

    fn try_parse_escape(&mut self, inlines: &mut Vec<Inline<'a>>, text_start: &mut usize) -> bool {
        match self.byte_at(self.pos + 1) {
            Some(b) if b.is_ascii_punctuation() => {
                // drop the backslash; the escaped byte starts the next text run
                self.flush_text(inlines, text_start);
                *text_start = self.pos + 1;
                self.pos += 2;
                true
            }
            _ => false,
        }
    }

    fn try_parse_code(&mut self, inlines: &mut Vec<Inline<'a>>, text_start: &mut usize) -> bool {
        let start = self.pos;

        if self.byte_at(start + 1) == Some(b'`') {
            if let Some(offset) = memmem::find(&self.bytes[start + 2..], b"``") {
                let close = start + 2 + offset;
                let node = Inline::Verbatim(Cow::Borrowed(&self.text[start + 2..close]));
                return self.emit(inlines, text_start, node, close + 2);
            }
            // an unmatched pair stays literal as a whole
            self.pos += 2;
            return true;
        }

        match memchr(b'`', &self.bytes[start + 1..]) {
            Some(offset) => {
                let close = start + 1 + offset;
                let node = Inline::Code(Cow::Borrowed(&self.text[start + 1..close]));
                self.emit(inlines, text_start, node, close + 1)
            }
            None => false,
        }
    }

    fn run_length(&self, pos: usize, byte: u8) -> usize {
        self.bytes[pos..].iter().take_while(|&&b| b == byte).count()
    }

    fn try_parse_asterisks(
        &mut self,
        inlines: &mut Vec<Inline<'a>>,
        text_start: &mut usize,
    ) -> bool {
        let start = self.pos;
        let run = self.run_length(start, b'*');

        let opens = self
            .byte_at(start + run)
            .is_some_and(|b| !b.is_ascii_whitespace());
        if opens {
            for n in (1..=run.min(3)).rev() {
                let content_start = start + n;
                if let Some(close) = self.find_closing_run(content_start, n) {
                    let inner = self.nested(&self.text[content_start..close]);
                    let node = match n {
                        1 => Inline::Emphasis(inner),
                        2 => Inline::Strong(inner),
                        _ => Inline::BoldItalic(inner),
                    };
                    return self.emit(inlines, text_start, node, close + n);
                }
            }
        }

        // no match: the whole run is literal text
        self.pos = start + run;
        true
    }

    /// Find where a closing run of `n` asterisks starts.
    ///
    /// Runs that open nested emphasis inside the content are matched first,
    /// so `*a **b** c*` closes at the last asterisk. Escapes and code spans
    /// are skipped.
    fn find_closing_run(&self, from: usize, n: usize) -> Option<usize> {
        let mut pending: Vec<usize> = Vec::new();
        let mut i = from + 1;

        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b'`' => i = self.skip_code(i),
                b'*' => {
                    let run = self.run_length(i, b'*');
                    let can_close = !self.bytes[i - 1].is_ascii_whitespace();
                    let can_open = self
                        .byte_at(i + run)
                        .is_some_and(|b| !b.is_ascii_whitespace());

                    if can_close {
                        let mut left = run;
                        while let Some(top) = pending.last_mut() {
                            if left >= *top {
                                left -= *top;
                                pending.pop();
                            } else {
                                *top -= left;
                                left = 0;
                                break;
                            }
                        }
                        if pending.is_empty() && left >= n {
                            return Some(i + run - n);
                        }
                    } else if can_open {
                        pending.push(run.min(3));
                    }
                    i += run;
                }
                _ => i += 1,
            }
        }

        None
    }

    /// Position just after a code or verbatim span starting at `pos`, or
    /// `pos + 1` if the backtick is unmatched.
    fn skip_code(&self, pos: usize) -> usize {
        if self.byte_at(pos + 1) == Some(b'`') {
            return match memmem::find(&self.bytes[pos + 2..], b"``") {
                Some(offset) => pos + 2 + offset + 2,
                None => pos + 2,
            };
        }
        match memchr(b'`', &self.bytes[pos + 1..]) {
            Some(offset) => pos + 1 + offset + 1,
            None => pos + 1,
        }
    }

    /// Index of the `]` matching the `[` at `open`, tolerating nested
    /// brackets, escapes and code spans.
    fn find_closing_bracket(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = open + 1;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b'`' => i = self.skip_code(i),
                b'[' => {
                    depth += 1;
                    i += 1;
                }
                b']' if depth == 0 => return Some(i),
                b']' => {
                    depth -= 1;
                    i += 1;
                }
                _ => i += 1,
            }
        }
        None
    }

    /// Index of the `)` matching the `(` at `open`.
    fn find_closing_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = open + 1;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b'(' => {
                    depth += 1;
                    i += 1;
                }
                b')' if depth == 0 => return Some(i),
                b')' => {
                    depth -= 1;
                    i += 1;
                }
                _ => i += 1,
            }
        }
        None
    }

    /// Parse what follows a `[text]`: `(url "title")` or `[ref]`.
    ///
    /// Returns the target, optional title and end position.
    fn parse_destination(
        &self,
        after: usize,
    ) -> Option<(LinkTarget<'a>, Option<Cow<'a, str>>, usize)> {
        match self.byte_at(after)? {
            b'(' => {
                let close = self.find_closing_paren(after)?;
                let inner = self.text[after + 1..close].trim();
                let (url, rest) = match inner.find(char::is_whitespace) {
                    Some(split) => (&inner[..split], inner[split..].trim()),
                    None => (inner, ""),
                };
                let url = url
                    .strip_prefix('<')
                    .and_then(|u| u.strip_suffix('>'))
                    .unwrap_or(url);
                let title = unquote(rest).map(Cow::Borrowed);
                Some((LinkTarget::Direct(Cow::Borrowed(url)), title, close + 1))
            }
            b'[' => {
                let close = after + 1 + memchr(b']', &self.bytes[after + 1..])?;
                let label = &self.text[after + 1..close];
                Some((LinkTarget::Reference(Cow::Borrowed(label.trim())), None, close + 1))
            }
            _ => None,
        }
    }

    fn try_parse_image(&mut self, inlines: &mut Vec<Inline<'a>>, text_start: &mut usize) -> bool {
        let start = self.pos;
        if self.byte_at(start + 1) != Some(b'[') {
            return false;
        }
        let Some(close) = self.find_closing_bracket(start + 1) else {
            return false;
        };
        let Some((target, title, end)) = self.parse_destination(close + 1) else {
            return false;
        };

        let node = Inline::Image(Image {
            target,
            alt: Cow::Borrowed(&self.text[start + 2..close]),
            title,
        });
        self.emit(inlines, text_start, node, end)
    }

    fn try_parse_bracket(&mut self, inlines: &mut Vec<Inline<'a>>, text_start: &mut usize) -> bool {
        if self.byte_at(self.pos + 1) == Some(b'^') && self.try_parse_footnote_ref(inlines, text_start)
        {
            return true;
        }
        self.try_parse_link(inlines, text_start)
    }

    fn try_parse_footnote_ref(
        &mut self,
        inlines: &mut Vec<Inline<'a>>,
        text_start: &mut usize,
    ) -> bool {
        let id_start = self.pos + 2;
        let Some(offset) = memchr(b']', &self.bytes[id_start..]) else {
            return false;
        };
        let close = id_start + offset;
        let id = &self.text[id_start..close];
        if id.contains(|c: char| c.is_whitespace() || c == '[') {
            return false;
        }

        let node = Inline::FootnoteRef(FootnoteRef {
            id: (!id.is_empty()).then_some(Cow::Borrowed(id)),
            label: None,
            defined: false,
            first: false,
        });
        self.emit(inlines, text_start, node, close + 1)
    }

    fn try_parse_link(&mut self, inlines: &mut Vec<Inline<'a>>, text_start: &mut usize) -> bool {
        let start = self.pos;
        let Some(close) = self.find_closing_bracket(start) else {
            return false;
        };
        let Some((target, title, end)) = self.parse_destination(close + 1) else {
            return false;
        };

        let children = self.nested(&self.text[start + 1..close]);
        let node = Inline::Link(Link {
            target,
            title,
            children,
        });
        self.emit(inlines, text_start, node, end)
    }

    fn try_parse_dash(&mut self, inlines: &mut Vec<Inline<'a>>, text_start: &mut usize) -> bool {
        let start = self.pos;
        let run = self.run_length(start, b'-');
        let dash = match run {
            2 => Dash::En,
            3 => Dash::Em,
            _ => {
                self.pos = start + run;
                return true;
            }
        };
        self.emit(inlines, text_start, Inline::Dash(dash), start + run)
    }

    fn try_parse_script(&mut self, inlines: &mut Vec<Inline<'a>>, text_start: &mut usize) -> bool {
        let start = self.pos;
        if self.byte_at(start + 1) != Some(b'{') {
            return false;
        }

        let mut depth = 0usize;
        let mut i = start + 2;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 1,
                b'{' => depth += 1,
                b'}' if depth == 0 => {
                    let inner = self.nested(&self.text[start + 2..i]);
                    let node = if self.bytes[start] == b'^' {
                        Inline::Superscript(inner)
                    } else {
                        Inline::Subscript(inner)
                    };
                    return self.emit(inlines, text_start, node, i + 1);
                }
                b'}' => depth -= 1,
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn try_parse_angle(&mut self, inlines: &mut Vec<Inline<'a>>, text_start: &mut usize) -> bool {
        let rest = &self.text[self.pos..];

        if let Some(caps) = AUTOLINK.captures(rest) {
            let (Some(whole), Some(url)) = (caps.get(0), caps.get(1)) else {
                return false;
            };
            let url = &rest[url.start()..url.end()];
            let end = self.pos + whole.end();
            let node = Inline::Link(Link {
                target: LinkTarget::Direct(Cow::Borrowed(url)),
                title: None,
                children: vec![Inline::Text(Cow::Borrowed(url))],
            });
            return self.emit(inlines, text_start, node, end);
        }

        match INLINE_HTML.find(rest) {
            Some(m) => {
                let end = self.pos + m.end();
                let node = Inline::RawHtml(Cow::Borrowed(&rest[..m.end()]));
                self.emit(inlines, text_start, node, end)
            }
            None => false,
        }
    }

    fn try_parse_entity(&mut self, inlines: &mut Vec<Inline<'a>>, text_start: &mut usize) -> bool {
        let rest = &self.text[self.pos..];
        match ENTITY.find(rest) {
            Some(m) => {
                let end = self.pos + m.end();
                let node = Inline::RawHtml(Cow::Borrowed(&rest[..m.end()]));
                self.emit(inlines, text_start, node, end)
            }
            None => false,
        }
    }

    fn parse_newline(&mut self, inlines: &mut Vec<Inline<'a>>, text_start: &mut usize) -> bool {
        let mut text_end = self.pos;
        while text_end > *text_start && self.bytes[text_end - 1] == b' ' {
            text_end -= 1;
        }
        if *text_start < text_end {
            inlines.push(self.text_node(*text_start, text_end));
        }
        inlines.push(if self.nl2lb {
            Inline::HardBreak
        } else {
            Inline::SoftBreak
        });

        // indentation of the next source line is not content
        let mut next = self.pos + 1;
        while self.byte_at(next) == Some(b' ') {
            next += 1;
        }
        self.pos = next;
        *text_start = next;
        true
    }
}

/// Strip matching `"..."`, `'...'` or `(...)` around a link title.
fn unquote(s: &str) -> Option<&str> {
    if s.len() < 2 {
        return None;
    }
    let inner = &s[1..s.len() - 1];
    match (s.as_bytes()[0], s.as_bytes()[s.len() - 1]) {
        (b'"', b'"') | (b'\'', b'\'') | (b'(', b')') => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline<'_> {
        Inline::Text(Cow::Borrowed(s))
    }

    #[test]
    fn test_plain_text_is_one_node() {
        assert_eq!(parse_inlines("just words", false), vec![text("just words")]);
    }

    #[test]
    fn test_escape_drops_backslash() {
        assert_eq!(
            parse_inlines(r"a \*b\* c", false),
            vec![text("a "), text("*b"), text("* c")]
        );
    }

    #[test]
    fn test_nested_emphasis_closes_on_outer_run() {
        let inlines = parse_inlines("*a **b** c*", false);
        assert_eq!(
            inlines,
            vec![Inline::Emphasis(vec![
                text("a "),
                Inline::Strong(vec![text("b")]),
                text(" c"),
            ])]
        );
    }

    #[test]
    fn test_strong_with_trailing_emphasis() {
        let inlines = parse_inlines("**bold *it***", false);
        assert_eq!(
            inlines,
            vec![Inline::Strong(vec![
                text("bold "),
                Inline::Emphasis(vec![text("it")]),
            ])]
        );
    }

    #[test]
    fn test_unclosed_run_is_literal() {
        assert_eq!(parse_inlines("**open", false), vec![text("**open")]);
    }

    #[test]
    fn test_newline_folds_indentation() {
        assert_eq!(
            parse_inlines("one\n   two", true),
            vec![text("one"), Inline::HardBreak, text("two")]
        );
    }

    #[test]
    fn test_depth_cap_degrades_to_text() {
        let deep = "^{".repeat(MAX_INLINE_DEPTH + 5) + &"}".repeat(MAX_INLINE_DEPTH + 5);
        let inlines = parse_inlines(&deep, false);
        assert_eq!(inlines.len(), 1);
    }
}
