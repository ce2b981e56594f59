//! Corpus and cache overview.
//!
//! Provides a quick summary of what a search would see: memory files and
//! chunk counts, transcript sessions and message counts, and embedding
//! cache coverage. Used by `engram stats` to give confidence that the
//! corpus paths and cache are wired up as expected.

use anyhow::Result;
use std::collections::HashSet;

use crate::cache::EmbedCache;
use crate::config::Config;
use crate::memory;
use crate::models::TranscriptSource;
use crate::transcript;

/// Run the stats command: scan the corpus and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let chunks = memory::load_memory_chunks(config)?;
    let memory_files: HashSet<&str> = chunks.iter().map(|c| c.file_path.as_str()).collect();

    let repo_name = config.corpus.repo_name.as_deref();
    let max_bytes = config.corpus.max_transcript_bytes;

    let mut messages = Vec::new();
    if let Some(root) = &config.corpus.claude_root {
        messages.extend(
            transcript::scan_root(root, TranscriptSource::Claude, repo_name, None, max_bytes)
                .await?,
        );
    }
    if let Some(root) = &config.corpus.codex_root {
        messages.extend(
            transcript::scan_root(root, TranscriptSource::Codex, repo_name, None, max_bytes)
                .await?,
        );
    }

    let sessions: HashSet<(&str, &str)> = messages
        .iter()
        .map(|m| (m.source.as_str(), m.session_id.as_str()))
        .collect();

    let cache_path = &config.embedding.cache_path;
    let cache_entries = if cache_path.exists() {
        EmbedCache::open(cache_path, false).map(|c| c.len()).unwrap_or(0)
    } else {
        0
    };
    let cache_size = std::fs::metadata(cache_path).map(|m| m.len()).unwrap_or(0);

    println!("Engram — Corpus Stats");
    println!("=====================");
    println!();
    println!("  Memory files:  {}", memory_files.len());
    println!("  Memory chunks: {}", chunks.len());
    println!("  Sessions:      {}", sessions.len());
    println!("  Messages:      {}", messages.len());
    println!();
    println!("  Cache:         {}", cache_path.display());
    println!("  Entries:       {}", cache_entries);
    println!("  Size:          {}", format_bytes(cache_size));

    // Per-source breakdown
    let claude_count = messages
        .iter()
        .filter(|m| m.source == TranscriptSource::Claude)
        .count();
    let codex_count = messages
        .iter()
        .filter(|m| m.source == TranscriptSource::Codex)
        .count();

    println!();
    println!("  By source:");
    println!("  {:<10} {:>8}", "SOURCE", "ITEMS");
    println!("  {}", "-".repeat(20));
    println!("  {:<10} {:>8}", "memory", chunks.len());
    println!("  {:<10} {:>8}", "claude", claude_count);
    println!("  {:<10} {:>8}", "codex", codex_count);
    println!();

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
