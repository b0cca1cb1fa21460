//! Tests for the `syntext` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn syntext() -> Command {
    let mut cmd = Command::cargo_bin("syntext").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Conversion
// ============================================================================

#[test]
fn test_stdin_to_html() {
    syntext()
        .write_stdin("# Title\n\nHello *world*.")
        .assert()
        .success()
        .stdout("<h1 id=\"title\">Title</h1>\n<p>Hello <em>world</em>.</p>\n");
}

#[test]
fn test_empty_input_prints_newline() {
    syntext().write_stdin("").assert().success().stdout("\n");
}

#[test]
fn test_tabsize_flag() {
    syntext()
        .args(["--tabsize", "2"])
        .write_stdin("\tcode")
        .assert()
        .success()
        .stdout("<p>code</p>\n");

    syntext()
        .args(["-t", "8"])
        .write_stdin("\tcode")
        .assert()
        .success()
        .stdout("<pre>code</pre>\n");
}

#[test]
fn test_pygmentize_without_highlighter_warns() {
    syntext()
        .arg("--pygmentize")
        .write_stdin("::: code rust\n    let x = 1;")
        .assert()
        .success()
        .stdout("<pre class=\"lang-rust\" data-lang=\"rust\">let x = 1;</pre>\n")
        .stderr(predicate::str::contains("no highlighter"));
}

#[test]
fn test_front_matter_is_not_rendered() {
    syntext()
        .write_stdin("---\ntitle: Doc\n---\ntext")
        .assert()
        .success()
        .stdout("<p>text</p>\n");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_compile_error_exits_nonzero() {
    syntext()
        .write_stdin("intro\n\n::: bogus\n    body")
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("error: line 3: unknown tag 'bogus'"));
}

#[test]
fn test_invalid_tabsize_is_rejected() {
    syntext()
        .args(["--tabsize", "wide"])
        .write_stdin("x")
        .assert()
        .failure();
}

// ============================================================================
// Debug and Info Flags
// ============================================================================

#[test]
fn test_debug_sections() {
    syntext()
        .arg("--debug")
        .write_stdin("---\ntitle: \"Doc\"\ncount: 3\n---\n# Head\n\n* a\n* b")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("=== AST ===")
                .and(predicate::str::contains("Heading (level 1, #head)"))
                .and(predicate::str::contains("List (unordered, compact, 2 items)"))
                .and(predicate::str::contains("=== META ==="))
                .and(predicate::str::contains("\"title\": \"Doc\""))
                .and(predicate::str::contains("\"count\": 3"))
                .and(predicate::str::contains("=== HTML ==="))
                .and(predicate::str::contains("<h1 id=\"head\">Head</h1>")),
        );
}

#[test]
fn test_debug_meta_keeps_yaml_structure() {
    syntext()
        .arg("--debug")
        .write_stdin("---\ntags:\n  - a\n  - b\n---\nx")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"front_matter_lines\": 5")
                .and(predicate::str::contains("\"tags\": ["))
                .and(predicate::str::contains("<p>x</p>")),
        );
}

#[test]
fn test_version_flag() {
    syntext()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_flags() {
    syntext()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("--debug")
                .and(predicate::str::contains("--pygmentize"))
                .and(predicate::str::contains("--tabsize")),
        );
}
