use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn content_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("header.md"), "HEADER MARKER\n").expect("write header");
    fs::write(dir.path().join("footer.md"), "FOOTER MARKER\n").expect("write footer");
    fs::write(
        dir.path().join("doc.md"),
        "# Hello\n\n```go\nfmt.Println(\"hi\")\n```\n\n<script>alert(1)</script>\n",
    )
    .expect("write doc");
    dir
}

fn mdsite() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mdsite"));
    cmd.env_remove("MDSITE_CONFIG_FILE").env("RUST_LOG", "error");
    cmd
}

#[test]
fn render_prints_a_full_page() {
    let dir = content_dir();

    mdsite()
        .arg("render")
        .arg("--content-directory")
        .arg(dir.path())
        .arg(dir.path().join("doc.md"))
        .assert()
        .success()
        .stdout(predicate::str::contains("<!DOCTYPE html>"))
        .stdout(predicate::str::contains("HEADER MARKER"))
        .stdout(predicate::str::contains("FOOTER MARKER"))
        .stdout(predicate::str::contains("<span class=\"codeblock-lang\">GO</span>"))
        .stdout(predicate::str::contains("alert(1)").not());
}

#[test]
fn render_fragment_skips_components() {
    let dir = content_dir();

    mdsite()
        .arg("render")
        .arg("--fragment")
        .arg("--content-directory")
        .arg(dir.path())
        .arg(dir.path().join("doc.md"))
        .assert()
        .success()
        .stdout(predicate::str::contains("<h1 id=\"hello\">Hello</h1>"))
        .stdout(predicate::str::contains("HEADER MARKER").not())
        .stdout(predicate::str::contains("<html").not());
}

#[test]
fn render_without_sanitizing_keeps_raw_html() {
    let dir = content_dir();

    mdsite()
        .arg("render")
        .arg("--no-sanitize")
        .arg("--content-directory")
        .arg(dir.path())
        .arg(dir.path().join("doc.md"))
        .assert()
        .success()
        .stdout(predicate::str::contains("<script>alert(1)</script>"));
}

#[test]
fn missing_input_file_fails() {
    let dir = tempfile::tempdir().expect("temp dir");

    mdsite()
        .arg("render")
        .arg(dir.path().join("absent.md"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("application error"));
}
