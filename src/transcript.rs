//! Transcript extractors for Claude and Codex session logs.
//!
//! Both variants turn a JSONL session file into a uniform stream of
//! [`MessageRecord`]s, reading line by line so memory stays proportional
//! to one line rather than one file. Each line decodes defensively into
//! a tagged shape — malformed JSON or an unknown shape maps to a skip,
//! never a structural error. Files over the configured size ceiling are
//! skipped whole with a warning.
//!
//! A `since` cutoff short-circuits: as soon as a session's start date is
//! known to precede the cutoff, parsing stops and the session is
//! rejected wholesale. Sessions are never partially included by date.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use walkdir::WalkDir;

use crate::models::{MessageRecord, Role, TranscriptSource};

/// Result of decoding a single transcript line.
enum LineOutcome {
    Message(MessageRecord),
    Skip,
    /// Stop reading this file; the session is rejected wholesale.
    Stop,
}

/// Scan a transcript root for `*.jsonl` session files and extract all
/// messages. Corruption in one file is warned about and never aborts
/// the others.
pub async fn scan_root(
    root: &Path,
    source: TranscriptSource,
    repo_name: Option<&str>,
    since: Option<NaiveDate>,
    max_bytes: u64,
) -> Result<Vec<MessageRecord>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<_> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "jsonl"))
        .collect();
    paths.sort();

    let mut messages = Vec::new();
    for path in paths {
        let extracted = match source {
            TranscriptSource::Claude => extract_claude(&path, since, max_bytes).await,
            TranscriptSource::Codex => extract_codex(&path, repo_name, since, max_bytes).await,
        };
        match extracted {
            Ok(records) => messages.extend(records),
            Err(e) => eprintln!("Warning: skipping {}: {}", path.display(), e),
        }
    }

    Ok(messages)
}

// ============ Claude variant ============

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClaudeLine {
    User {
        message: ClaudeMessage,
        #[serde(default)]
        timestamp: Option<String>,
    },
    Assistant {
        message: ClaudeMessage,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(other)]
    Skip,
}

#[derive(Deserialize)]
struct ClaudeMessage {
    #[serde(default)]
    content: ClaudeContent,
}

/// `message.content` is either a raw string or an ordered list of typed
/// blocks; only `text`-typed blocks contribute.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClaudeContent {
    Text(String),
    Blocks(Vec<ClaudeBlock>),
}

impl Default for ClaudeContent {
    fn default() -> Self {
        ClaudeContent::Text(String::new())
    }
}

#[derive(Deserialize)]
struct ClaudeBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl ClaudeContent {
    fn text(&self) -> String {
        match self {
            ClaudeContent::Text(s) => s.clone(),
            ClaudeContent::Blocks(blocks) => blocks
                .iter()
                .filter(|b| b.kind == "text")
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Extract messages from one Claude session file.
pub async fn extract_claude(
    path: &Path,
    since: Option<NaiveDate>,
    max_bytes: u64,
) -> Result<Vec<MessageRecord>> {
    let Some(reader) = open_bounded(path, max_bytes).await? else {
        return Ok(Vec::new());
    };

    let session_id = file_stem(path);
    let mut session_date: Option<DateTime<Utc>> = None;
    let mut records: Vec<MessageRecord> = Vec::new();
    let mut label = String::new();

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let outcome = claude_line(&line, &session_id, since, &mut session_date);
        match outcome {
            LineOutcome::Message(mut record) => {
                if label.is_empty() && record.role == Role::User {
                    label = session_label(&record.text);
                }
                record.session_date = session_date;
                records.push(record);
            }
            LineOutcome::Skip => {}
            LineOutcome::Stop => return Ok(Vec::new()),
        }
    }

    finalize_session(&mut records, &label, session_date);
    Ok(records)
}

fn claude_line(
    line: &str,
    session_id: &str,
    since: Option<NaiveDate>,
    session_date: &mut Option<DateTime<Utc>>,
) -> LineOutcome {
    let parsed: ClaudeLine = match serde_json::from_str(line) {
        Ok(p) => p,
        Err(_) => return LineOutcome::Skip,
    };

    let (role, message, timestamp) = match parsed {
        ClaudeLine::User { message, timestamp } => (Role::User, message, timestamp),
        ClaudeLine::Assistant { message, timestamp } => (Role::Assistant, message, timestamp),
        ClaudeLine::Skip => return LineOutcome::Skip,
    };

    let timestamp = timestamp.as_deref().and_then(parse_timestamp);

    // The first timestamp seen fixes the session start date; a session
    // older than the cutoff is rejected wholesale.
    if session_date.is_none() {
        *session_date = timestamp;
        if let (Some(date), Some(cutoff)) = (*session_date, since) {
            if date.date_naive() < cutoff {
                return LineOutcome::Stop;
            }
        }
    }

    let text = message.content.text();
    if text.trim().is_empty() {
        return LineOutcome::Skip;
    }

    LineOutcome::Message(MessageRecord {
        role,
        text,
        timestamp,
        session_id: session_id.to_string(),
        session_date: *session_date,
        first_user_message: String::new(),
        source: TranscriptSource::Claude,
    })
}

// ============ Codex variant ============

#[derive(Deserialize)]
#[serde(tag = "type")]
enum CodexLine {
    #[serde(rename = "session_meta")]
    SessionMeta {
        payload: CodexMeta,
    },
    #[serde(rename = "response_item")]
    ResponseItem {
        payload: CodexPayload,
        #[serde(default)]
        timestamp: Option<String>,
    },
    #[serde(other)]
    Skip,
}

#[derive(Deserialize)]
struct CodexMeta {
    #[serde(default)]
    cwd: String,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Deserialize)]
struct CodexPayload {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Vec<CodexBlock>,
}

#[derive(Deserialize)]
struct CodexBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Extract messages from one Codex session file.
///
/// The `session_meta` line decides relevance: the session belongs to the
/// target repository only if its cwd contains `repo_name`. Until that
/// line is seen, every other line is ignored; a mismatch rejects the
/// whole file regardless of content.
pub async fn extract_codex(
    path: &Path,
    repo_name: Option<&str>,
    since: Option<NaiveDate>,
    max_bytes: u64,
) -> Result<Vec<MessageRecord>> {
    let Some(reader) = open_bounded(path, max_bytes).await? else {
        return Ok(Vec::new());
    };

    let session_id = file_stem(path);
    let mut session_date: Option<DateTime<Utc>> = None;
    let mut relevant = false;
    let mut records: Vec<MessageRecord> = Vec::new();
    let mut label = String::new();

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let outcome = codex_line(
            &line,
            &session_id,
            repo_name,
            since,
            &mut relevant,
            &mut session_date,
        );
        match outcome {
            LineOutcome::Message(mut record) => {
                if label.is_empty() && record.role == Role::User {
                    label = session_label(&record.text);
                }
                record.session_date = session_date;
                records.push(record);
            }
            LineOutcome::Skip => {}
            LineOutcome::Stop => return Ok(Vec::new()),
        }
    }

    finalize_session(&mut records, &label, session_date);
    Ok(records)
}

fn codex_line(
    line: &str,
    session_id: &str,
    repo_name: Option<&str>,
    since: Option<NaiveDate>,
    relevant: &mut bool,
    session_date: &mut Option<DateTime<Utc>>,
) -> LineOutcome {
    let parsed: CodexLine = match serde_json::from_str(line) {
        Ok(p) => p,
        Err(_) => return LineOutcome::Skip,
    };

    match parsed {
        CodexLine::SessionMeta { payload } => {
            if let Some(name) = repo_name {
                if !payload.cwd.contains(name) {
                    return LineOutcome::Stop;
                }
            }
            *session_date = payload.timestamp.as_deref().and_then(parse_timestamp);
            if let (Some(date), Some(cutoff)) = (*session_date, since) {
                if date.date_naive() < cutoff {
                    return LineOutcome::Stop;
                }
            }
            *relevant = true;
            LineOutcome::Skip
        }
        CodexLine::ResponseItem { payload, timestamp } => {
            if !*relevant {
                return LineOutcome::Skip;
            }
            if payload.kind != "message" {
                return LineOutcome::Skip;
            }
            let role = match payload.role.as_deref() {
                Some("user") => Role::User,
                Some("assistant") => Role::Assistant,
                _ => return LineOutcome::Skip,
            };

            let text = payload
                .content
                .iter()
                .filter(|b| matches!(b.kind.as_str(), "input_text" | "output_text" | "text"))
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let text = text.trim().to_string();

            if text.is_empty() || is_codex_noise(&text) {
                return LineOutcome::Skip;
            }

            LineOutcome::Message(MessageRecord {
                role,
                text,
                timestamp: timestamp.as_deref().and_then(parse_timestamp),
                session_id: session_id.to_string(),
                session_date: *session_date,
                first_user_message: String::new(),
                source: TranscriptSource::Codex,
            })
        }
        CodexLine::Skip => LineOutcome::Skip,
    }
}

/// Injected context rather than genuine conversation.
fn is_codex_noise(text: &str) -> bool {
    let t = text.trim_start();
    t.starts_with('<') || t.starts_with("User instructions:")
}

// ============ Shared helpers ============

/// Open a transcript for buffered line reading, or `None` if the file
/// exceeds the size ceiling (skipped whole, with a warning — never
/// truncated).
async fn open_bounded(
    path: &Path,
    max_bytes: u64,
) -> Result<Option<BufReader<tokio::fs::File>>> {
    let meta = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    if meta.len() > max_bytes {
        eprintln!(
            "Warning: skipping oversize transcript {} ({} bytes > {} limit)",
            path.display(),
            meta.len(),
            max_bytes
        );
        return Ok(None);
    }

    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Some(BufReader::new(file)))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// First 120 chars of a message, whitespace-collapsed.
fn session_label(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(120).collect()
}

/// Backfill the session label and date onto every record of the session.
fn finalize_session(
    records: &mut [MessageRecord],
    label: &str,
    session_date: Option<DateTime<Utc>>,
) {
    for record in records.iter_mut() {
        record.first_user_message = label.to_string();
        if record.session_date.is_none() {
            record.session_date = session_date;
        }
    }
}
