//! # Engram
//!
//! A local-first hybrid search engine for agent memory notes and
//! session transcripts.
//!
//! Engram chunks a curated markdown memory corpus, extracts messages
//! from Claude and Codex JSONL session logs, and ranks everything
//! against a query with BM25 — optionally fused with cached
//! embedding-based semantic similarity.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌───────────┐
//! │ MEMORY.md   │──▶│   Chunker    │──▶│           │
//! │ memory/*.md │   └─────────────┘   │   BM25    │
//! ├─────────────┤   ┌─────────────┐   │     +     │──▶ ranked results
//! │ *.jsonl     │──▶│  Extractors  │──▶│  cosine   │
//! │ transcripts │   └─────────────┘   │  fusion   │
//! └─────────────┘        │            └─────┬─────┘
//!                        ▼                  │
//!                  ┌───────────┐      ┌──────────┐
//!                  │  redact    │─────▶│ embedding │
//!                  │ + cache    │      │ provider  │
//!                  └───────────┘      └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! engram search "deployment checklist"              # BM25 only
//! engram search "how did we fix the race" --mode hybrid
//! engram search "chunking" --source memory --since 2026-01-01
//! engram stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`tokenize`] | Query/corpus tokenization |
//! | [`chunk`] | Markdown chunking |
//! | [`bm25`] | Okapi BM25 scoring |
//! | [`redact`] | Best-effort secret redaction |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`cache`] | Content-addressed embedding cache |
//! | [`rank`] | Score normalization and fusion |
//! | [`memory`] | Memory corpus loading |
//! | [`transcript`] | Claude/Codex transcript extraction |
//! | [`search`] | Search orchestration |

pub mod bm25;
pub mod cache;
pub mod cache_cmd;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod memory;
pub mod models;
pub mod rank;
pub mod redact;
pub mod search;
pub mod stats;
pub mod tokenize;
pub mod transcript;
