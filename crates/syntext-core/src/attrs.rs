//! Block header parsing.
//!
//! A header is the text after a block marker such as `:div` or `::: tag`:
//!
//! ```text
//! tag [args...] [.class] [#id] [&flag] [name=value] [name="value with spaces"]
//! ```
//!
//! Tokens are separated by spaces; single or double quotes at the start of a
//! token (or right after `name=`) group it, and a backslash inside quotes
//! escapes the next character. Trailing tokens
//! made only of colons are ignored. Anything that is not a class, id, flag or
//! named attribute is a positional argument, left for the tag handler to
//! interpret.

use crate::ast::AttributeSet;
use crate::error::{CompileError, Result};

/// A parsed block header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub tag: String,
    pub args: Vec<String>,
    pub attrs: AttributeSet,
}

#[derive(Debug, PartialEq, Eq)]
struct Token {
    text: String,
    /// The whole token was one quoted string.
    quoted: bool,
}

/// Parse a header line into tag name, arguments and attributes.
///
/// A header that starts directly with attributes (`::: .note`) names the
/// `div` tag.
pub fn parse_header(text: &str, line: u32) -> Result<Header> {
    let mut tokens = tokenize(text);
    strip_trailing_colons(&mut tokens);

    let tag = match tokens.first() {
        Some(first) if !first.quoted && !is_attribute_token(&first.text) => {
            tokens.remove(0).text
        }
        _ => "div".to_string(),
    };
    let (args, attrs) = classify(tokens, line)?;
    Ok(Header { tag, args, attrs })
}

/// Parse header arguments (no tag name) into positional args and attributes.
pub fn parse_args(text: &str, line: u32) -> Result<(Vec<String>, AttributeSet)> {
    let mut tokens = tokenize(text);
    strip_trailing_colons(&mut tokens);
    classify(tokens, line)
}

fn classify(tokens: Vec<Token>, line: u32) -> Result<(Vec<String>, AttributeSet)> {
    let mut args = Vec::new();
    let mut attrs = AttributeSet::new();

    for token in tokens {
        if token.quoted {
            args.push(token.text);
            continue;
        }
        let text = token.text.as_str();
        if let Some(class) = text.strip_prefix('.').filter(|c| is_name(c)) {
            attrs.add_class(class);
        } else if let Some(id) = text.strip_prefix('#').filter(|c| is_name(c)) {
            set_id(&mut attrs, id, line)?;
        } else if let Some(flag) = text.strip_prefix('&').filter(|c| is_name(c)) {
            attrs.add_flag(flag);
        } else if let Some((name, value)) = text.split_once('=').filter(|(n, _)| is_name(n)) {
            match name {
                "class" => value.split_whitespace().for_each(|c| attrs.add_class(c)),
                "id" => set_id(&mut attrs, value, line)?,
                _ => attrs.set(name, value),
            }
        } else {
            args.push(token.text);
        }
    }

    Ok((args, attrs))
}

fn set_id(attrs: &mut AttributeSet, id: &str, line: u32) -> Result<()> {
    if attrs.id.is_some() {
        return Err(CompileError::duplicate_id(id, line));
    }
    attrs.id = Some(id.to_string());
    Ok(())
}

fn is_attribute_token(text: &str) -> bool {
    let mut chars = text.chars();
    (matches!(chars.next(), Some('.' | '#' | '&')) && chars.next().is_some()) || text.contains('=')
}

/// Attribute and class names: letters, digits, `-`, `_`, `:`, `.`.
fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.'))
}

fn strip_trailing_colons(tokens: &mut Vec<Token>) {
    while tokens
        .last()
        .is_some_and(|t| !t.quoted && !t.text.is_empty() && t.text.bytes().all(|b| b == b':'))
    {
        tokens.pop();
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut buf = String::new();
        let mut quoted_parts = 0;
        let mut plain_parts = false;
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            chars.next();
            if (c == '"' || c == '\'') && (buf.is_empty() || buf.ends_with('=')) {
                quoted_parts += 1;
                while let Some(q) = chars.next() {
                    match q {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                buf.push(escaped);
                            }
                        }
                        _ if q == c => break,
                        _ => buf.push(q),
                    }
                }
            } else {
                plain_parts = true;
                buf.push(c);
            }
        }

        tokens.push(Token {
            text: buf,
            quoted: quoted_parts > 0 && !plain_parts,
        });
    }

    tokens
}
