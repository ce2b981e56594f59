//! Paragraph-boundary markdown chunker.
//!
//! Splits note text into [`Chunk`]s bounded by a configurable `max_chars`
//! limit. Splitting occurs on blank-line boundaries to preserve semantic
//! coherence within each chunk; fenced code blocks are stripped first
//! because they are not prose and pollute both lexical and semantic
//! signal.
//!
//! Each chunk receives a deterministic fingerprint derived from its file
//! path, ordinal position, and text, so unchanged content keeps the same
//! identity across runs and its cached embedding stays valid.

use sha2::{Digest, Sha256};

use crate::models::Chunk;

/// Split markdown into chunks, respecting `max_chars`/`min_chars`.
/// Returns chunks in source order with contiguous indices starting at 0.
/// Empty or whitespace-only input yields no chunks.
pub fn chunk_markdown(file_path: &str, text: &str, max_chars: usize, min_chars: usize) -> Vec<Chunk> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let paragraphs = split_paragraphs(&normalized);
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut buf = String::new();

    let flush = |buf: &mut String, chunks: &mut Vec<Chunk>| {
        if !buf.is_empty() {
            let idx = chunks.len();
            chunks.push(make_chunk(file_path, idx, buf));
            buf.clear();
        }
    };

    for para in &paragraphs {
        let para_chars = para.chars().count();

        // An oversize paragraph flushes the buffer and is hard-split into
        // consecutive max_chars-sized slices; no boundary is respected
        // inside it, which bounds every chunk except this case.
        if para_chars > max_chars {
            flush(&mut buf, &mut chunks);
            let chars: Vec<char> = para.chars().collect();
            for slice in chars.chunks(max_chars) {
                let piece: String = slice.iter().collect();
                let idx = chunks.len();
                chunks.push(make_chunk(file_path, idx, &piece));
            }
            continue;
        }

        if buf.is_empty() {
            buf.push_str(para);
            continue;
        }

        let buf_chars = buf.chars().count();
        if buf_chars < min_chars || buf_chars + 2 + para_chars <= max_chars {
            buf.push_str("\n\n");
            buf.push_str(para);
        } else {
            flush(&mut buf, &mut chunks);
            buf.push_str(para);
        }
    }

    flush(&mut buf, &mut chunks);
    chunks
}

/// Strip fenced code blocks, normalize line endings, strip trailing
/// whitespace per line, and trim the result.
fn normalize(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let mut out = String::with_capacity(text.len());
    let mut in_fence = false;

    for line in text.split('\n') {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out.trim().to_string()
}

/// Split normalized text on blank-line boundaries.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut buf = String::new();

    for line in text.split('\n') {
        if line.trim().is_empty() {
            if !buf.is_empty() {
                paragraphs.push(std::mem::take(&mut buf));
            }
        } else {
            if !buf.is_empty() {
                buf.push('\n');
            }
            buf.push_str(line);
        }
    }
    if !buf.is_empty() {
        paragraphs.push(buf);
    }

    paragraphs
}

fn make_chunk(file_path: &str, idx: usize, text: &str) -> Chunk {
    Chunk {
        id: fingerprint(file_path, idx, text),
        file_path: file_path.to_string(),
        idx,
        text: text.to_string(),
    }
}

/// Content fingerprint of `(file_path, idx, text)`.
pub fn fingerprint(file_path: &str, idx: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_path.as_bytes());
    hasher.update([0u8]);
    hasher.update(idx.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..16].to_string()
}
