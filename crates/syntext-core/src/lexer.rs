//! Source normalization and line splitting.
//!
//! The block parser works on indentation, so the source is normalized
//! first: CRLF becomes LF and tabs are expanded to spaces. The lexer then
//! splits the normalized text into [`Line`]s that borrow from it, using
//! `memchr` for newline scanning.

use std::borrow::Cow;

use memchr::memchr;

use crate::span::Span;

/// Normalize line endings and expand tabs to `tab_size` columns.
///
/// Returns the input unchanged (borrowed) when there is nothing to do.
pub fn normalize(input: &str, tab_size: usize) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    if memchr(b'\t', bytes).is_none() && memchr(b'\r', bytes).is_none() {
        return Cow::Borrowed(input);
    }

    let tab_size = tab_size.max(1);
    let mut out = String::with_capacity(input.len() + input.len() / 8);
    let mut column = 0usize;
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                // bare CR counts as a line ending too
                if chars.peek() != Some(&'\n') {
                    out.push('\n');
                    column = 0;
                }
            }
            '\n' => {
                out.push('\n');
                column = 0;
            }
            '\t' => {
                let width = tab_size - column % tab_size;
                out.extend(std::iter::repeat(' ').take(width));
                column += width;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    Cow::Owned(out)
}

/// A single line of the normalized source with its byte span.
///
/// Trailing whitespace is excluded from `text`. Dedenting a line slices it,
/// so `span` always points at exactly the bytes of `text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub text: &'a str,
    pub span: Span,
}

impl<'a> Line<'a> {
    #[inline(always)]
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of leading spaces.
    #[inline]
    pub fn indent(&self) -> usize {
        self.text.bytes().take_while(|&b| b == b' ').count()
    }

    /// The line without its leading spaces.
    #[inline]
    pub fn content(&self) -> &'a str {
        &self.text[self.indent()..]
    }

    /// Remove up to `n` leading spaces.
    #[inline]
    pub fn dedent(&self, n: usize) -> Line<'a> {
        let cut = self.indent().min(n);
        Line {
            text: &self.text[cut..],
            span: Span::new(self.span.start + cut as u32, self.span.end),
        }
    }

    /// Drop the first `n` bytes, keeping the span in step.
    #[inline]
    pub fn skip(&self, n: usize) -> Line<'a> {
        let n = n.min(self.text.len());
        Line {
            text: &self.text[n..],
            span: Span::new(self.span.start + n as u32, self.span.end),
        }
    }
}

/// Splits normalized source into lines.
pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Lexer<'a> {
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            offset: 0,
        }
    }

    #[inline(always)]
    pub fn is_eof(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    fn read_line(&mut self) -> Option<Line<'a>> {
        if self.is_eof() {
            return None;
        }

        let start = self.offset;
        let end = match memchr(b'\n', &self.bytes[start..]) {
            Some(pos) => start + pos,
            None => self.bytes.len(),
        };
        self.offset = if end < self.bytes.len() { end + 1 } else { end };

        let mut text_end = end;
        while text_end > start && matches!(self.bytes[text_end - 1], b' ' | b'\r' | b'\t') {
            text_end -= 1;
        }

        Some(Line {
            text: &self.input[start..text_end],
            span: Span::new(start as u32, text_end as u32),
        })
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Line<'a>;

    #[inline]
    fn next(&mut self) -> Option<Line<'a>> {
        self.read_line()
    }
}

/// Smallest indentation among the non-blank lines.
pub fn common_indent(lines: &[Line<'_>]) -> usize {
    lines
        .iter()
        .filter(|l| !l.is_blank())
        .map(Line::indent)
        .min()
        .unwrap_or(0)
}

/// Strip the common indentation from every line.
pub fn dedent<'a>(lines: &[Line<'a>]) -> Vec<Line<'a>> {
    let n = common_indent(lines);
    lines.iter().map(|l| l.dedent(n)).collect()
}

/// Drop leading and trailing blank lines.
pub fn trim_blank<'s, 'a>(mut lines: &'s [Line<'a>]) -> &'s [Line<'a>] {
    while let [first, rest @ ..] = lines {
        if !first.is_blank() {
            break;
        }
        lines = rest;
    }
    while let [rest @ .., last] = lines {
        if !last.is_blank() {
            break;
        }
        lines = rest;
    }
    lines
}

/// Text of a run of consecutive lines, relative to their own margin.
///
/// Borrows the source when the lines sit there unchanged, one newline apart.
/// Lines dedented by an enclosing block are joined into a new string so the
/// stripped margin does not leak into the text.
pub fn block_text<'a>(source: &'a str, lines: &[Line<'a>]) -> Cow<'a, str> {
    match lines {
        [] => Cow::Borrowed(""),
        [only] => Cow::Borrowed(only.text),
        [first, .., last] => {
            let contiguous = lines.windows(2).all(|pair| {
                source.get(pair[0].span.end as usize..pair[1].span.start as usize) == Some("\n")
            });
            if contiguous {
                Cow::Borrowed(&source[first.span.start as usize..last.span.end as usize])
            } else {
                Cow::Owned(join_lines(lines))
            }
        }
    }
}

/// Join lines with `\n`, used where indentation must not leak through.
pub fn join_lines(lines: &[Line<'_>]) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line.text);
    }
    out
}
