use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ask_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ask");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let docs_dir = root.join("docs");
    fs::create_dir_all(&docs_dir).unwrap();
    fs::write(
        docs_dir.join("alpha.md"),
        "# Alpha Document\n\nThis is the alpha document about Rust programming.\n\nIt contains information about cargo and crates.",
    ).unwrap();
    fs::write(
        docs_dir.join("beta.md"),
        "# Beta Document\n\nThis document discusses Python and machine learning.\n\nDeep learning frameworks like PyTorch are covered.",
    ).unwrap();
    fs::write(
        docs_dir.join("gamma.txt"),
        "Gamma plain text file.\n\nContains notes about deployment and infrastructure.\n\nKubernetes and Docker are mentioned here.",
    ).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/askdocs.sqlite"

[chunking]
max_chars = 2048
overlap_chars = 64

[retrieval]
top_k = 4
max_search_iterations = 3

[llm]
provider = "openai"
model = "gpt-4o-mini"

[connectors.filesystem]
root = "{}/docs"
include_globs = ["**/*.md", "**/*.txt"]
exclude_globs = []
follow_symlinks = false
"#,
        root.display(),
        root.display()
    );

    let config_path = config_dir.join("askdocs.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ask(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ask_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ask binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ask(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_ask(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_ask(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_sync_filesystem() {
    let (_tmp, config_path) = setup_test_env();

    run_ask(&config_path, &["init"]);
    let (stdout, stderr, success) = run_ask(&config_path, &["sync", "filesystem"]);
    assert!(success, "sync failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("upserted documents: 3"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_sync_idempotent_no_duplicates() {
    let (_tmp, config_path) = setup_test_env();

    run_ask(&config_path, &["init"]);

    let (stdout1, _, _) = run_ask(&config_path, &["sync", "filesystem"]);
    assert!(stdout1.contains("upserted documents: 3"));

    // A second sync must upsert the same 3 documents, not create
    // duplicates.
    let (stdout2, _, _) = run_ask(&config_path, &["sync", "filesystem"]);
    assert!(stdout2.contains("upserted documents: 3"));
}

#[test]
fn test_sync_dry_run_writes_nothing() {
    let (_tmp, config_path) = setup_test_env();

    run_ask(&config_path, &["init"]);
    let (stdout, _, success) = run_ask(&config_path, &["sync", "filesystem", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("items found: 3"));

    // Nothing was written, so chat must still refuse to start.
    let (_, stderr, chat_success) = run_ask(&config_path, &["chat"]);
    assert!(!chat_success);
    assert!(stderr.contains("No documents indexed"));
}

#[test]
fn test_sync_unknown_connector_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_ask(&config_path, &["init"]);
    let (_, stderr, success) = run_ask(&config_path, &["sync", "gopher"]);
    assert!(!success);
    assert!(stderr.contains("Unknown connector"));
}

#[test]
fn test_keyword_search_finds_matching_chunk() {
    let (_tmp, config_path) = setup_test_env();

    run_ask(&config_path, &["init"]);
    run_ask(&config_path, &["sync", "filesystem"]);

    let (stdout, stderr, success) = run_ask(&config_path, &["search", "Kubernetes deployment"]);
    assert!(success, "search failed: stderr={}", stderr);
    assert!(
        stdout.contains("Kubernetes"),
        "expected the gamma chunk in results, got: {}",
        stdout
    );
}

#[test]
fn test_search_no_results_on_unknown_term() {
    let (_tmp, config_path) = setup_test_env();

    run_ask(&config_path, &["init"]);
    run_ask(&config_path, &["sync", "filesystem"]);

    let (stdout, _, success) = run_ask(&config_path, &["search", "xyzzyplugh"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_chat_fatal_without_documents() {
    let (_tmp, config_path) = setup_test_env();

    run_ask(&config_path, &["init"]);

    // No sync ran: the conversation cannot start.
    let (_, stderr, success) = run_ask(&config_path, &["chat"]);
    assert!(!success);
    assert!(
        stderr.contains("No documents indexed"),
        "expected fatal startup error, got: {}",
        stderr
    );
}

#[test]
fn test_sources_lists_connectors() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_ask(&config_path, &["sources"]);
    assert!(success);
    assert!(stdout.contains("filesystem"));
    assert!(stdout.contains("confluence"));
    assert!(stdout.contains("mantis"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (tmp, _) = setup_test_env();
    let bad_config = tmp.path().join("config").join("bad.toml");
    fs::write(
        &bad_config,
        r#"[db]
path = "/tmp/x.sqlite"

[chunking]
max_chars = 64
overlap_chars = 64

[llm]
provider = "openai"
model = "gpt-4o-mini"
"#,
    )
    .unwrap();

    let (_, stderr, success) = run_ask(&bad_config, &["init"]);
    assert!(!success);
    assert!(stderr.contains("overlap_chars"));
}
