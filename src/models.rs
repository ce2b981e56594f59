//! Core data models used throughout Engram.
//!
//! These types represent the chunks, transcript messages, and ranked
//! results that flow through the scoring pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A bounded slice of a markdown file's prose, the unit of indexing.
///
/// The `id` is a content fingerprint of `(file_path, idx, text)`, so
/// identical content at the same position resolves to the same identity
/// across runs. Chunks are rebuilt fresh on every invocation and never
/// persisted; only their derived embeddings are cached.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub file_path: String,
    pub idx: usize,
    pub text: String,
}

/// Speaker role within a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Which transcript format a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSource {
    Claude,
    Codex,
}

impl TranscriptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptSource::Claude => "claude",
            TranscriptSource::Codex => "codex",
        }
    }
}

/// One conversational turn extracted from a JSONL session file.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub role: Role,
    pub text: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub session_id: String,
    pub session_date: Option<DateTime<Utc>>,
    /// First 120 chars of the session's first user message, carried on
    /// every message of the session as a display label.
    pub first_user_message: String,
    pub source: TranscriptSource,
}

/// Anything the ranker can score: a memory chunk or a transcript message.
#[derive(Debug, Clone)]
pub enum SearchItem {
    Memory(Chunk),
    Session(MessageRecord),
}

impl SearchItem {
    pub fn text(&self) -> &str {
        match self {
            SearchItem::Memory(c) => &c.text,
            SearchItem::Session(m) => &m.text,
        }
    }

    /// Human-readable source location for display.
    pub fn location(&self) -> String {
        match self {
            SearchItem::Memory(c) => format!("{}#{}", c.file_path, c.idx),
            SearchItem::Session(m) => format!("{}:{}", m.source.as_str(), m.session_id),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SearchItem::Memory(c) => &c.file_path,
            SearchItem::Session(m) => &m.first_user_message,
        }
    }

    pub fn source_name(&self) -> &'static str {
        match self {
            SearchItem::Memory(_) => "memory",
            SearchItem::Session(m) => m.source.as_str(),
        }
    }
}

/// A scored item produced by the ranker, in final display order.
#[derive(Debug, Clone)]
pub struct RankedResult {
    /// Index into the item set the ranking was computed over.
    pub item_idx: usize,
    pub bm25: f64,
    pub cosine: Option<f64>,
    pub combined: Option<f64>,
}

impl RankedResult {
    /// The score the active mode ranked by.
    pub fn score(&self) -> f64 {
        self.combined.unwrap_or(self.bm25)
    }
}

/// Serialized search result for `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResultItem {
    pub score: f64,
    pub source: String,
    pub location: String,
    pub label: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<ScoreExplanation>,
}

/// Scoring breakdown for a search result (populated with `--explain`).
#[derive(Debug, Clone, Serialize)]
pub struct ScoreExplanation {
    pub bm25: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cosine: Option<f64>,
    pub keyword_weight: f64,
    pub semantic_weight: f64,
}
