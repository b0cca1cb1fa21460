//! Front matter.
//!
//! A document may start with a YAML mapping between two `---` lines (the
//! closing line may also be `...`). The block is removed before compilation
//! and returned as [`Metadata`].
//!
//! ```text
//! ---
//! title: "Release notes"
//! draft: false
//! tags:
//!   - rust
//!   - text processing
//! ---
//! ```

use std::fmt;

use serde_yaml::{Mapping, Value};

use crate::lexer::{Lexer, Line};

/// A typed front matter value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Null,
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    List(Vec<MetaValue>),
    Map(Metadata),
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Null => Ok(()),
            MetaValue::Str(s) => f.write_str(s),
            MetaValue::Bool(b) => write!(f, "{}", b),
            MetaValue::Int(i) => write!(f, "{}", i),
            MetaValue::Float(x) => write!(f, "{}", x),
            MetaValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            MetaValue::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&Value> for MetaValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => MetaValue::Null,
            Value::Bool(b) => MetaValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => MetaValue::Int(i),
                None => MetaValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => MetaValue::Str(s.clone()),
            Value::Sequence(items) => MetaValue::List(items.iter().map(MetaValue::from).collect()),
            Value::Mapping(map) => MetaValue::Map(Metadata::from(map)),
            Value::Tagged(tagged) => MetaValue::from(&tagged.value),
        }
    }
}

/// Front matter entries in source order. A repeated key keeps its first
/// position and its last value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    entries: Vec<(String, MetaValue)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: MetaValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&Mapping> for Metadata {
    fn from(map: &Mapping) -> Self {
        let mut meta = Metadata::new();
        for (key, value) in map {
            if let Some(key) = key_string(key) {
                meta.insert(key, MetaValue::from(value));
            }
        }
        meta
    }
}

/// Scalar keys only; sequence and mapping keys are dropped.
fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => key_string(&tagged.value),
        _ => None,
    }
}

/// Result of splitting front matter off a document.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter<'a> {
    pub meta: Metadata,
    /// The document without its front matter.
    pub body: &'a str,
    /// Number of source lines the front matter occupied.
    pub lines: u32,
}

/// Split a leading front matter block off `source`.
///
/// Without a well-formed block (opening and closing delimiter around a
/// non-empty YAML mapping) the whole source is the body.
pub fn split_front_matter(source: &str) -> FrontMatter<'_> {
    let none = FrontMatter {
        meta: Metadata::new(),
        body: source,
        lines: 0,
    };

    let mut lexer = Lexer::new(source);
    let yaml_start = match lexer.next() {
        Some(first) if first.text == "---" => next_line_start(source, &first),
        _ => return none,
    };

    let mut count = 1u32;
    for line in lexer {
        count += 1;
        if line.text != "---" && line.text != "..." {
            continue;
        }
        let yaml = &source[yaml_start..line.span.start as usize];
        let meta = match serde_yaml::from_str::<Mapping>(yaml) {
            Ok(map) => Metadata::from(&map),
            Err(err) => {
                log::debug!("leading block is not front matter: {}", err);
                return none;
            }
        };
        if meta.is_empty() {
            return none;
        }
        return FrontMatter {
            meta,
            body: &source[next_line_start(source, &line)..],
            lines: count,
        };
    }
    none
}

fn next_line_start(source: &str, line: &Line<'_>) -> usize {
    let end = line.span.end as usize;
    match source[end..].find('\n') {
        Some(pos) => end + pos + 1,
        None => source.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_front_matter() {
        let fm = split_front_matter("---\ntitle: Hello\ncount: 3\n---\n# Body\n");
        assert_eq!(fm.body, "# Body\n");
        assert_eq!(fm.lines, 4);
        assert_eq!(fm.meta.get("title"), Some(&MetaValue::Str("Hello".into())));
        assert_eq!(fm.meta.get("count"), Some(&MetaValue::Int(3)));
        assert_eq!(fm.meta.len(), 2);
    }

    #[test]
    fn test_yaml_values() {
        let fm = split_front_matter(
            "---\ntags:\n  - rust\n  - \"b, c\"\nratio: 1.5\nversion: v1.2.3\nauthor:\n  name: Ann\nempty:\n---\n",
        );
        assert_eq!(
            fm.meta.get("tags"),
            Some(&MetaValue::List(vec![
                MetaValue::Str("rust".into()),
                MetaValue::Str("b, c".into()),
            ]))
        );
        assert_eq!(fm.meta.get("ratio"), Some(&MetaValue::Float(1.5)));
        assert_eq!(fm.meta.get("version"), Some(&MetaValue::Str("v1.2.3".into())));
        match fm.meta.get("author") {
            Some(MetaValue::Map(author)) => {
                assert_eq!(author.get("name"), Some(&MetaValue::Str("Ann".into())));
            }
            other => panic!("expected map, got {:?}", other),
        }
        assert_eq!(fm.meta.get("empty"), Some(&MetaValue::Null));
        assert_eq!(fm.body, "");
    }

    #[test]
    fn test_dots_close_front_matter() {
        let fm = split_front_matter("---\na: 1\n...");
        assert_eq!(fm.body, "");
        assert_eq!(fm.meta.get("a"), Some(&MetaValue::Int(1)));
    }

    #[test]
    fn test_rule_is_not_front_matter() {
        let src = "---\nJust a paragraph between rules.\n---\n";
        let fm = split_front_matter(src);
        assert_eq!(fm.body, src);
        assert!(fm.meta.is_empty());
    }

    #[test]
    fn test_invalid_yaml_is_not_front_matter() {
        let src = "---\ntitle: [unclosed\n---\ntext";
        assert_eq!(split_front_matter(src).body, src);
    }

    #[test]
    fn test_unclosed_is_not_front_matter() {
        let src = "---\ntitle: x\n";
        assert_eq!(split_front_matter(src).body, src);
    }
}
