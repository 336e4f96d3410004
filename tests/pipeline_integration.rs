//! End-to-end tests driving the `bib` binary.
//!
//! Covers pool scanning, metadata inspection with provenance, and a full
//! pipeline run against a disabled backend.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn bib_binary() -> std::path::PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.push("bib");
    path
}

/// Minimal valid PDF with an optional Info dictionary and one page of
/// text. Builds the body then the xref with correct byte offsets so
/// lopdf can parse it. `text` must not contain parentheses or
/// backslashes.
fn minimal_pdf(author: Option<&str>, text: &str) -> Vec<u8> {
    let stream = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET\n", text);

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}endstream endobj\n",
            stream.len(),
            stream
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let o6 = out.len();
    if let Some(author) = author {
        out.extend_from_slice(
            format!(
                "6 0 obj << /Author ({}) /Producer (bibtest) >> endobj\n",
                author
            )
            .as_bytes(),
        );
    }

    let count = if author.is_some() { 7 } else { 6 };
    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", count).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    if author.is_some() {
        out.extend_from_slice(format!("{:010} 00000 n \n", o6).as_bytes());
    }

    if author.is_some() {
        out.extend_from_slice(
            format!("trailer << /Size {} /Root 1 0 R /Info 6 0 R >>\n", count).as_bytes(),
        );
    } else {
        out.extend_from_slice(format!("trailer << /Size {} /Root 1 0 R >>\n", count).as_bytes());
    }
    out.extend_from_slice(b"startxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn setup_env() -> (TempDir, std::path::PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("config")).unwrap();
    fs::create_dir_all(root.join("pool")).unwrap();

    let config_content = format!(
        r#"[pool]
root = "{}/pool"

[extraction]
max_pages = 4

[cache]
ttl_secs = 3600
fingerprint = "path"

[backend]
provider = "disabled"
"#,
        root.display()
    );

    fs::write(root.join("config").join("bib.toml"), config_content).unwrap();
    (tmp, root.join("config").join("bib.toml"))
}

fn run_bib(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = bib_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run bib: {}", e));
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn scan_lists_pool_pdfs() {
    let (tmp, config_path) = setup_env();
    let pool = tmp.path().join("pool");
    fs::write(pool.join("a.pdf"), minimal_pdf(None, "alpha")).unwrap();
    fs::write(pool.join("b.PDF"), minimal_pdf(None, "beta")).unwrap();
    fs::write(pool.join("notes.txt"), b"not a pdf").unwrap();

    let (stdout, stderr, success) = run_bib(&config_path, &["scan"]);
    assert!(success, "scan failed: stdout={}, stderr={}", stdout, stderr);
    assert!(
        stdout.contains("documents found: 2"),
        "expected 2 documents, got: {}",
        stdout
    );
    assert!(stdout.contains("a.pdf"));
    assert!(stdout.contains("b.PDF"));
    assert!(!stdout.contains("notes.txt"));
}

#[test]
fn inspect_prefers_embedded_author_and_text_publisher() {
    let (tmp, config_path) = setup_env();
    let pdf = tmp.path().join("pool").join("doc.pdf");
    fs::write(
        &pdf,
        minimal_pdf(Some("Jane Doe"), "Published by Acme Press 2020"),
    )
    .unwrap();

    let (stdout, stderr, success) = run_bib(&config_path, &["inspect", pdf.to_str().unwrap()]);
    assert!(
        success,
        "inspect failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(
        stdout.contains("author: Jane Doe  (source: metadata)"),
        "embedded author should win with metadata provenance, got: {}",
        stdout
    );
    assert!(
        stdout.contains("publisher: Acme Press  (source: text)"),
        "publisher should come from the body text, got: {}",
        stdout
    );
}

#[test]
fn inspect_falls_back_to_text_author() {
    let (tmp, config_path) = setup_env();
    let pdf = tmp.path().join("pool").join("noinfo.pdf");
    fs::write(&pdf, minimal_pdf(None, "A study by John Smith of things")).unwrap();

    let (stdout, _, success) = run_bib(&config_path, &["inspect", pdf.to_str().unwrap()]);
    assert!(success, "inspect failed: {}", stdout);
    assert!(
        stdout.contains("author: John Smith  (source: text)"),
        "text by-line should supply the author, got: {}",
        stdout
    );
}

#[test]
fn inspect_json_emits_full_record() {
    let (tmp, config_path) = setup_env();
    let pdf = tmp.path().join("pool").join("doc.pdf");
    fs::write(
        &pdf,
        minimal_pdf(Some("Jane Doe"), "Published by Acme Press 2020"),
    )
    .unwrap();

    let (stdout, _, success) = run_bib(&config_path, &["inspect", pdf.to_str().unwrap(), "--json"]);
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["author"], "Jane Doe");
    assert_eq!(value["author_found_in_metadata"], true);
    assert_eq!(value["publisher"], "Acme Press");
    assert_eq!(value["publisher_found_in_metadata"], false);
    assert_eq!(value["page_count"], 1);
}

#[test]
fn inspect_missing_file_fails() {
    let (_tmp, config_path) = setup_env();
    let (stdout, stderr, success) = run_bib(&config_path, &["inspect", "/no/such/file.pdf"]);
    assert!(!success, "inspect of a missing file must fail: {}", stdout);
    assert!(
        stderr.contains("PDF file not found"),
        "expected a not-found message, got: {}",
        stderr
    );
}

#[test]
fn run_with_disabled_backend_completes_with_embedded_errors() {
    let (tmp, config_path) = setup_env();
    let pdf = tmp.path().join("pool").join("doc.pdf");
    fs::write(
        &pdf,
        minimal_pdf(Some("Jane Doe"), "Published by Acme Press 2020"),
    )
    .unwrap();

    let (stdout, stderr, success) = run_bib(&config_path, &["run", pdf.to_str().unwrap()]);
    assert!(success, "run failed: stdout={}, stderr={}", stdout, stderr);
    assert!(
        stdout.contains("author: Jane Doe"),
        "metadata stages must still work, got: {}",
        stdout
    );
    assert!(
        stdout.contains("General AI Error"),
        "backend failures belong in the prose fields, got: {}",
        stdout
    );
    assert!(stdout.contains("ok"), "run should finish: {}", stdout);
}

#[test]
fn run_missing_pdf_short_circuits() {
    let (_tmp, config_path) = setup_env();
    let (stdout, _, success) = run_bib(&config_path, &["run", "/no/such/file.pdf"]);
    assert!(success, "run reports document errors in its output: {}", stdout);
    assert!(
        stdout.contains("error:"),
        "final state should carry the error, got: {}",
        stdout
    );
    assert!(
        stdout.contains("skipped (upstream failure"),
        "downstream stages must be skipped, got: {}",
        stdout
    );
}

#[test]
fn run_json_emits_pipeline_state() {
    let (tmp, config_path) = setup_env();
    let pdf = tmp.path().join("pool").join("doc.pdf");
    fs::write(&pdf, minimal_pdf(Some("Jane Doe"), "Some body text here")).unwrap();

    let (stdout, _, success) = run_bib(&config_path, &["run", pdf.to_str().unwrap(), "--json"]);
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["status"], "complete");
    assert_eq!(value["metadata"]["author"], "Jane Doe");
}
