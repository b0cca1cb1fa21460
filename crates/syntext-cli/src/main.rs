//! syntext - compile syntext markup to HTML
//!
//! Usage:
//!   syntext [OPTIONS] < input.stx > output.html
//!
//! The document is read from standard input and the HTML written to
//! standard output. Compile errors go to standard error with exit status 1.

use std::io::{self, Read, Write};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use syntext_core::ast::{Block, Dash, Inline, LinkTarget, TagBody};
use syntext_core::{lexer, meta, MetaValue, Metadata, RenderOptions, DEFAULT_TAB_SIZE};

#[derive(Debug, Parser)]
#[command(name = "syntext", version, about = "Compile syntext markup from stdin to HTML")]
struct Cli {
    /// Print the parsed tree, the front matter and the HTML
    #[arg(short, long)]
    debug: bool,

    /// Mark code blocks for syntax highlighting
    #[arg(short, long)]
    pygmentize: bool,

    /// Columns per tab stop
    #[arg(short, long = "tabsize", value_name = "N", default_value_t = DEFAULT_TAB_SIZE)]
    tabsize: usize,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(e) = run(&cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let level = if debug { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read standard input")?;
    log::info!("read {} bytes", input.len());

    let options = RenderOptions::new()
        .with_tab_size(cli.tabsize)
        .with_pygmentize(cli.pygmentize);

    if cli.debug {
        return print_debug(&input, &options);
    }

    let rendered = syntext_core::render(&input, &options)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", rendered.html)?;
    Ok(())
}

// =============================================================================
// Debug Output
// =============================================================================

fn print_debug(input: &str, options: &RenderOptions) -> Result<()> {
    let source = lexer::normalize(input, options.tab_size);
    let front = meta::split_front_matter(&source);
    let doc =
        syntext_core::compile(front.body, options).map_err(|e| e.offset_lines(front.lines))?;
    let rendered = syntext_core::render(input, options)?;

    let mut out = io::stdout().lock();
    writeln!(out, "=== AST ===")?;
    for (i, block) in doc.blocks.iter().enumerate() {
        writeln!(out, "[{}] {}", i + 1, describe_block(block))?;
        write_block_details(&mut out, block, 1)?;
    }

    writeln!(out, "=== META ===")?;
    let report = MetaReport {
        front_matter_lines: front.lines,
        entries: convert_metadata(&front.meta),
    };
    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;

    writeln!(out, "=== HTML ===")?;
    writeln!(out, "{}", rendered.html)?;
    Ok(())
}

#[derive(Serialize)]
struct MetaReport {
    front_matter_lines: u32,
    entries: serde_json::Map<String, serde_json::Value>,
}

fn convert_metadata(meta: &Metadata) -> serde_json::Map<String, serde_json::Value> {
    meta.iter()
        .map(|(k, v)| (k.to_string(), convert_meta_value(v)))
        .collect()
}

fn convert_meta_value(value: &MetaValue) -> serde_json::Value {
    match value {
        MetaValue::Null => serde_json::Value::Null,
        MetaValue::Str(s) => serde_json::Value::String(s.clone()),
        MetaValue::Bool(b) => serde_json::Value::Bool(*b),
        MetaValue::Int(i) => serde_json::Value::Number((*i).into()),
        MetaValue::Float(f) => serde_json::json!(*f),
        MetaValue::List(items) => {
            serde_json::Value::Array(items.iter().map(convert_meta_value).collect())
        }
        MetaValue::Map(map) => serde_json::Value::Object(convert_metadata(map)),
    }
}

fn describe_block(block: &Block) -> String {
    match block {
        Block::Paragraph(_) => "Paragraph".to_string(),
        Block::Heading(h) => format!("Heading (level {}, #{})", h.level, h.anchor),
        Block::List(l) => format!(
            "List ({}, {}, {} items)",
            if l.ordered { "ordered" } else { "unordered" },
            if l.compact { "compact" } else { "block" },
            l.items.len()
        ),
        Block::BlockList(l) => format!(
            "BlockList ({}, {} items)",
            if l.ordered { "ordered" } else { "unordered" },
            l.items.len()
        ),
        Block::DefinitionList(d) => format!("DefinitionList ({} terms)", d.items.len()),
        Block::CodeBlock(c) => {
            format!("CodeBlock (lang: {})", c.lang.as_deref().unwrap_or("none"))
        }
        Block::Table(t) => format!(
            "Table ({} rows, {} columns)",
            t.rows.len(),
            t.alignments.len()
        ),
        Block::HorizontalRule(_) => "HorizontalRule".to_string(),
        Block::RawHtml(_) => "RawHtml".to_string(),
        Block::Comment(_) => "Comment".to_string(),
        Block::TaggedBlock(t) => format!("TaggedBlock <{}>", t.tag),
        Block::Quote(q) => format!("Quote (caption: {:?})", q.caption),
        Block::Figure(f) => format!("Figure (src: {})", f.src),
        Block::Group(g) => format!("Group ({} blocks)", g.len()),
        Block::Insert(i) => format!("Insert ({:?})", i.kind),
    }
}

fn write_block_details(out: &mut impl Write, block: &Block, indent: usize) -> io::Result<()> {
    let prefix = "  ".repeat(indent);

    match block {
        Block::Paragraph(p) => {
            writeln!(out, "{}Content: {}", prefix, format_inlines(&p.content))?;
        }
        Block::Heading(h) => {
            writeln!(out, "{}Content: {}", prefix, format_inlines(&h.content))?;
        }
        Block::List(l) | Block::BlockList(l) => {
            for (i, item) in l.items.iter().enumerate() {
                writeln!(out, "{}Item {}:", prefix, i + 1)?;
                write_blocks(out, &item.blocks, indent + 1)?;
            }
        }
        Block::DefinitionList(d) => {
            for item in &d.items {
                writeln!(out, "{}Term: {}", prefix, format_inlines(&item.term))?;
                write_blocks(out, &item.blocks, indent + 1)?;
            }
        }
        Block::CodeBlock(c) => {
            let preview: String = c.content.chars().take(60).collect();
            let ellipsis = if c.content.chars().count() > 60 { "..." } else { "" };
            writeln!(
                out,
                "{}Content: {}{}",
                prefix,
                preview.replace('\n', "\\n"),
                ellipsis
            )?;
        }
        Block::Table(t) => {
            for (i, row) in t.rows.iter().enumerate() {
                let cells: Vec<String> = row.cells.iter().map(|c| format_inlines(c)).collect();
                writeln!(
                    out,
                    "{}Row {} ({:?}): {}",
                    prefix,
                    i + 1,
                    row.kind,
                    cells.join(" | ")
                )?;
            }
        }
        Block::TaggedBlock(t) => match &t.body {
            TagBody::Blocks(children) => write_blocks(out, children, indent)?,
            TagBody::Inline(content) => {
                writeln!(out, "{}Content: {}", prefix, format_inlines(content))?
            }
            TagBody::Raw(text) | TagBody::Escaped(text) => {
                writeln!(out, "{}Text: {}", prefix, text.replace('\n', "\\n"))?
            }
            TagBody::Empty => {}
        },
        Block::Quote(q) => write_blocks(out, &q.blocks, indent)?,
        Block::Group(g) => write_blocks(out, g, indent)?,
        Block::Figure(f) => {
            if let Some(caption) = &f.caption {
                writeln!(out, "{}Caption: {}", prefix, format_inlines(caption))?;
            }
        }
        Block::HorizontalRule(_) | Block::RawHtml(_) | Block::Comment(_) | Block::Insert(_) => {}
    }
    Ok(())
}

fn write_blocks(out: &mut impl Write, blocks: &[Block], indent: usize) -> io::Result<()> {
    let prefix = "  ".repeat(indent);
    for block in blocks {
        writeln!(out, "{}{}", prefix, describe_block(block))?;
        write_block_details(out, block, indent + 1)?;
    }
    Ok(())
}

fn format_inlines(inlines: &[Inline]) -> String {
    let mut result = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(t) => result.push_str(t),
            Inline::Emphasis(c) => {
                result.push('*');
                result.push_str(&format_inlines(c));
                result.push('*');
            }
            Inline::Strong(c) => {
                result.push_str("**");
                result.push_str(&format_inlines(c));
                result.push_str("**");
            }
            Inline::BoldItalic(c) => {
                result.push_str("***");
                result.push_str(&format_inlines(c));
                result.push_str("***");
            }
            Inline::Code(c) => {
                result.push('`');
                result.push_str(c);
                result.push('`');
            }
            Inline::Verbatim(c) => {
                result.push_str("``");
                result.push_str(c);
                result.push_str("``");
            }
            Inline::Link(l) => {
                result.push('[');
                result.push_str(&format_inlines(&l.children));
                match &l.target {
                    LinkTarget::Direct(url) => {
                        result.push_str("](");
                        result.push_str(url);
                        result.push(')');
                    }
                    LinkTarget::Reference(label) => {
                        result.push_str("][");
                        result.push_str(label);
                        result.push(']');
                    }
                }
            }
            Inline::Image(img) => {
                result.push_str("![");
                result.push_str(&img.alt);
                result.push(']');
                if let LinkTarget::Direct(url) = &img.target {
                    result.push('(');
                    result.push_str(url);
                    result.push(')');
                }
            }
            Inline::Dash(Dash::En) => result.push_str("--"),
            Inline::Dash(Dash::Em) => result.push_str("---"),
            Inline::Superscript(c) => {
                result.push_str("^{");
                result.push_str(&format_inlines(c));
                result.push('}');
            }
            Inline::Subscript(c) => {
                result.push_str("_{");
                result.push_str(&format_inlines(c));
                result.push('}');
            }
            Inline::FootnoteRef(f) => {
                result.push_str("[^");
                result.push_str(f.label.as_deref().unwrap_or(""));
                result.push(']');
            }
            Inline::RawHtml(html) => result.push_str(html),
            Inline::SoftBreak => result.push(' '),
            Inline::HardBreak => result.push_str("\\n"),
        }
    }
    result
}
