use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn engram_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("engram");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    // Memory corpus
    fs::write(
        root.join("MEMORY.md"),
        "# Memory Index\n\nTop-level notes about the engram project and its search pipeline.",
    )
    .unwrap();

    let memory_dir = root.join("memory");
    fs::create_dir_all(&memory_dir).unwrap();
    fs::write(
        memory_dir.join("2026-01-10.md"),
        "# Rust Notes\n\nRust ownership and borrowing rules for the chunker refactor.\n\nCargo workspaces are covered elsewhere.",
    )
    .unwrap();
    fs::write(
        memory_dir.join("2026-01-11.md"),
        "# Deployment\n\nKubernetes deployment checklist and rollback procedure.",
    )
    .unwrap();
    fs::write(
        memory_dir.join("2026-01-12.md"),
        "# Python Notes\n\nPython asyncio pitfalls when porting scripts.",
    )
    .unwrap();

    // Claude transcripts
    let claude_dir = root.join("claude");
    fs::create_dir_all(&claude_dir).unwrap();
    fs::write(
        claude_dir.join("session-alpha.jsonl"),
        concat!(
            r#"{"type":"user","timestamp":"2026-02-01T10:00:00Z","message":{"content":"Why does the tokenizer drop punctuation?"}}"#,
            "\n",
            r#"{"type":"assistant","timestamp":"2026-02-01T10:00:10Z","message":{"content":[{"type":"text","text":"Punctuation is a separator by design of the tokenizer."}]}}"#,
            "\n",
        ),
    )
    .unwrap();

    // Codex transcripts: one relevant session, one for another repo,
    // one old session for the since filter.
    let codex_dir = root.join("codex");
    fs::create_dir_all(&codex_dir).unwrap();
    fs::write(
        codex_dir.join("session-one.jsonl"),
        concat!(
            r#"{"type":"session_meta","payload":{"id":"s1","timestamp":"2026-02-02T09:00:00Z","cwd":"/home/dev/engram"}}"#,
            "\n",
            r#"{"type":"response_item","payload":{"type":"message","role":"user","content":[{"type":"input_text","text":"teach the ranker about fusion weights"}]}}"#,
            "\n",
        ),
    )
    .unwrap();
    fs::write(
        codex_dir.join("session-two.jsonl"),
        concat!(
            r#"{"type":"session_meta","payload":{"id":"s2","timestamp":"2026-02-02T09:30:00Z","cwd":"/home/dev/unrelated-project"}}"#,
            "\n",
            r#"{"type":"response_item","payload":{"type":"message","role":"user","content":[{"type":"input_text","text":"fusion weights for someone else"}]}}"#,
            "\n",
        ),
    )
    .unwrap();
    fs::write(
        codex_dir.join("session-old.jsonl"),
        concat!(
            r#"{"type":"session_meta","payload":{"id":"s3","timestamp":"2025-06-01T09:00:00Z","cwd":"/home/dev/engram"}}"#,
            "\n",
            r#"{"type":"response_item","payload":{"type":"message","role":"user","content":[{"type":"input_text","text":"ancient fusion question"}]}}"#,
            "\n",
        ),
    )
    .unwrap();
    fs::write(
        codex_dir.join("session-three.jsonl"),
        concat!(
            r#"{"type":"session_meta","payload":{"id":"s4","timestamp":"2026-02-03T11:00:00Z","cwd":"/home/dev/engram"}}"#,
            "\n",
            r#"{"type":"response_item","payload":{"type":"message","role":"user","content":[{"type":"input_text","text":"upgrade the cache eviction policy"}]}}"#,
            "\n",
        ),
    )
    .unwrap();

    let config_content = format!(
        r#"[corpus]
memory_file = "{root}/MEMORY.md"
memory_dir = "{root}/memory"
claude_root = "{root}/claude"
codex_root = "{root}/codex"
repo_name = "engram"

[embedding]
cache_path = "{root}/cache/embeddings.json"
"#,
        root = root.display()
    );

    let config_path = root.join("engram.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_engram(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = engram_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run engram binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_keyword_search_finds_memory_note() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_engram(&config_path, &["search", "kubernetes rollback"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("2026-01-11.md"), "missing hit: {}", stdout);
    assert!(stdout.contains("excerpt:"));
}

#[test]
fn test_keyword_search_excludes_zero_scores() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_engram(&config_path, &["search", "asyncio"]);
    assert!(success);
    assert!(stdout.contains("2026-01-12.md"));
    // Documents sharing no terms with the query are not displayed.
    assert!(!stdout.contains("2026-01-11.md"));
    assert!(!stdout.contains("session-alpha"));
}

#[test]
fn test_search_ranks_best_match_first() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_engram(&config_path, &["search", "rust ownership borrowing"]);
    assert!(success);
    let first = stdout.lines().next().unwrap_or_default();
    assert!(
        first.contains("2026-01-10.md"),
        "expected rust note first: {}",
        stdout
    );
}

#[test]
fn test_source_filter_claude_only() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_engram(
        &config_path,
        &["search", "tokenizer punctuation", "--source", "claude"],
    );
    assert!(success);
    assert!(stdout.contains("claude / claude:session-alpha"));
    assert!(!stdout.contains("memory /"));
}

#[test]
fn test_session_label_shown_for_transcript_hits() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_engram(
        &config_path,
        &["search", "punctuation separator", "--source", "claude"],
    );
    assert!(success);
    assert!(
        stdout.contains("session: \"Why does the tokenizer drop punctuation?\""),
        "missing session label: {}",
        stdout
    );
}

#[test]
fn test_codex_cwd_mismatch_excluded() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_engram(
        &config_path,
        &["search", "fusion weights", "--source", "codex"],
    );
    assert!(success);
    assert!(stdout.contains("session-one"));
    assert!(
        !stdout.contains("session-two"),
        "irrelevant repo leaked in: {}",
        stdout
    );
}

#[test]
fn test_since_filter_rejects_old_sessions() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_engram(
        &config_path,
        &[
            "search",
            "fusion",
            "--source",
            "codex",
            "--since",
            "2026-01-01",
        ],
    );
    assert!(success);
    assert!(stdout.contains("session-one"));
    assert!(!stdout.contains("session-old"), "old session leaked: {}", stdout);
}

#[test]
fn test_invalid_since_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_engram(&config_path, &["search", "x", "--since", "nonsense"]);
    assert!(!success);
    assert!(stderr.contains("Invalid --since"), "stderr: {}", stderr);
}

#[test]
fn test_unknown_mode_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_engram(&config_path, &["search", "x", "--mode", "psychic"]);
    assert!(!success);
    assert!(stderr.contains("Unknown search mode"));
}

#[test]
fn test_hybrid_without_provider_fails_fast() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_engram(&config_path, &["search", "x", "--mode", "hybrid"]);
    assert!(!success, "hybrid must not silently fall back to keyword");
    assert!(stderr.contains("requires embeddings"), "stderr: {}", stderr);
}

#[test]
fn test_unknown_provider_rejected_at_config_load() {
    let (tmp, _) = setup_test_env();
    let root = tmp.path();

    let config_content = format!(
        r#"[corpus]
memory_file = "{root}/MEMORY.md"
memory_dir = "{root}/memory"

[embedding]
provider = "sentencepiece"
model = "m"
dims = 8
"#,
        root = root.display()
    );
    let config_path = root.join("bad.toml");
    fs::write(&config_path, config_content).unwrap();

    let (_, stderr, success) = run_engram(&config_path, &["search", "x"]);
    assert!(!success);
    assert!(stderr.contains("Unknown embedding provider"));
}

#[test]
fn test_empty_corpus_reports_no_results() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    let config_content = format!(
        r#"[corpus]
memory_file = "{root}/MEMORY.md"
memory_dir = "{root}/memory"
"#,
        root = root.display()
    );
    let config_path = root.join("engram.toml");
    fs::write(&config_path, config_content).unwrap();

    let (stdout, _, success) = run_engram(&config_path, &["search", "anything"]);
    assert!(success, "empty corpus is not an error");
    assert!(stdout.contains("No results."));
}

#[test]
fn test_limit_caps_results() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_engram(&config_path, &["search", "notes", "--limit", "1"]);
    assert!(success);
    let hits = stdout.lines().filter(|l| l.contains("] memory /")).count();
    assert!(hits <= 1, "limit ignored: {}", stdout);
}

#[test]
fn test_json_output_parses() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_engram(
        &config_path,
        &["search", "kubernetes", "--json", "--explain"],
    );
    assert!(success);

    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON output");
    let results = parsed.as_array().expect("JSON array");
    assert!(!results.is_empty());
    let first = &results[0];
    assert!(first.get("score").is_some());
    assert!(first.get("location").is_some());
    assert!(first.get("snippet").is_some());
    assert!(first["explain"].get("bm25").is_some());
}

#[test]
fn test_search_deterministic_across_runs() {
    let (_tmp, config_path) = setup_test_env();

    let (a, _, _) = run_engram(&config_path, &["search", "notes project"]);
    let (b, _, _) = run_engram(&config_path, &["search", "notes project"]);
    assert_eq!(a, b, "identical corpus must yield identical ranking");
}

#[test]
fn test_stats_counts_corpus() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_engram(&config_path, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Memory files:  4"), "stdout: {}", stdout);
    assert!(stdout.contains("Sessions:      4"), "stdout: {}", stdout);
    assert!(stdout.contains("Messages:      5"), "stdout: {}", stdout);
}

#[test]
fn test_cache_info_and_clear() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_engram(&config_path, &["cache", "info"]);
    assert!(success);
    assert!(stdout.contains("entries: 0"));

    let (stdout, _, success) = run_engram(&config_path, &["cache", "clear"]);
    assert!(success);
    assert!(stdout.contains("nothing to remove"));
}
