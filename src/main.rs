//! # Engram CLI (`engram`)
//!
//! The `engram` binary searches a local memory corpus and agent session
//! transcripts with BM25 and optional embedding-based hybrid ranking.
//!
//! ## Usage
//!
//! ```bash
//! engram --config ./engram.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `engram search "<query>"` | Rank memory chunks and transcript messages |
//! | `engram stats` | Summarize the corpus and embedding cache |
//! | `engram cache info` | Show cache location and entry count |
//! | `engram cache clear` | Delete the embedding cache file |
//!
//! ## Examples
//!
//! ```bash
//! # Keyword search across everything
//! engram search "tokio runtime panic"
//!
//! # Hybrid search, memory notes only
//! engram search "retry backoff policy" --mode hybrid --source memory
//!
//! # Rebuild the embedding cache while searching
//! engram search "release steps" --mode hybrid --reindex
//! ```

mod bm25;
mod cache;
mod cache_cmd;
mod chunk;
mod config;
mod embedding;
mod memory;
mod models;
mod rank;
mod redact;
mod search;
mod stats;
mod tokenize;
mod transcript;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::search::SearchOptions;

/// Engram — a local-first hybrid search engine for agent memory notes
/// and session transcripts.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file describing the corpus paths, chunking bounds,
/// retrieval weights, and embedding provider.
#[derive(Parser)]
#[command(
    name = "engram",
    about = "Engram — local-first hybrid search over agent memory and session transcripts",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./engram.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Search the memory corpus and session transcripts.
    ///
    /// Ranks every in-scope memory chunk and transcript message against
    /// the query. `keyword` mode uses BM25 only; `hybrid` fuses BM25
    /// with embedding cosine similarity and requires an embedding
    /// provider in config.
    Search {
        /// The search query string.
        query: String,

        /// Search mode: `keyword` (BM25) or `hybrid` (BM25 + semantic).
        #[arg(long, default_value = "keyword")]
        mode: String,

        /// Restrict to one corpus: `memory`, `claude`, or `codex`.
        #[arg(long)]
        source: Option<String>,

        /// Only include sessions starting on or after this date (YYYY-MM-DD).
        #[arg(long)]
        since: Option<String>,

        /// Maximum number of results to print.
        #[arg(long)]
        limit: Option<usize>,

        /// Discard the embedding cache and rebuild it during this search.
        #[arg(long)]
        reindex: bool,

        /// Print the scoring breakdown for each result.
        #[arg(long)]
        explain: bool,

        /// Emit results as JSON instead of formatted text.
        #[arg(long)]
        json: bool,
    },

    /// Summarize the corpus and embedding cache.
    Stats,

    /// Manage the embedding cache file.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Embedding cache subcommands.
#[derive(Subcommand)]
enum CacheAction {
    /// Show cache location, entry count, and size.
    Info,
    /// Delete the cache file; the next hybrid search rebuilds it.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Search {
            query,
            mode,
            source,
            since,
            limit,
            reindex,
            explain,
            json,
        } => {
            let opts = SearchOptions {
                mode,
                source,
                since,
                limit,
                reindex,
                explain,
                json,
            };
            search::run_search(&cfg, &query, &opts).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Info => {
                cache_cmd::run_cache_info(&cfg)?;
            }
            CacheAction::Clear => {
                cache_cmd::run_cache_clear(&cfg)?;
            }
        },
    }

    Ok(())
}
