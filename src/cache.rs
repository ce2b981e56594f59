//! Content-addressed embedding cache.
//!
//! A pure memoization table mapping a fingerprint of
//! `(provider, model, dims, sanitized-text)` to a vector, persisted as a
//! flat JSON file. The same key always maps to the same vector; nothing
//! is ever invalidated except by an explicit reindex, which discards the
//! entire file before repopulating.
//!
//! The file is rewritten atomically as a whole (temp file + rename).
//! Concurrent invocations racing on it can lose updates — last writer
//! wins — which is acceptable for a single-user local tool.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::EmbeddingConfig;
use crate::embedding::{self, EmbeddingProvider};
use crate::redact::sanitize;

/// One cached embedding. The vector is base64 of packed LE f32.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub model: String,
    pub dims: usize,
    pub vector: String,
}

/// On-disk embedding cache with in-memory working set.
pub struct EmbedCache {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
    dirty: bool,
}

impl EmbedCache {
    /// Open the cache file. With `reindex`, the existing file is treated
    /// as empty on read (a full rebuild) but still written afterward.
    pub fn open(path: &Path, reindex: bool) -> Result<Self> {
        let entries = if reindex || !path.exists() {
            HashMap::new()
        } else {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read cache file: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse cache file: {}", path.display()))?
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
            // A reindex rewrites the file even if nothing new is added.
            dirty: reindex,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, entry: CacheEntry) {
        self.entries.insert(key, entry);
        self.dirty = true;
    }

    /// Persist the cache if it changed: serialize the whole map to a
    /// sibling temp file, then rename over the target.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create cache directory: {}", parent.display())
                })?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        let content = serde_json::to_string(&self.entries)?;
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write cache file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace cache file: {}", self.path.display()))?;

        self.dirty = false;
        Ok(())
    }
}

/// Fingerprint of `(provider, model, dims, sanitized-text)`.
pub fn cache_key(provider: &str, model: &str, dims: usize, sanitized_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider.as_bytes());
    hasher.update([0u8]);
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(dims.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(sanitized_text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Fetch-or-compute embeddings for a batch of texts.
///
/// Texts are sanitized, keyed, and partitioned into cached vs missing.
/// Missing texts are embedded in sequential batches of
/// `config.batch_size`; batches execute in strict order and the first
/// failed batch aborts the rest. The cache is flushed once after any
/// invocation that added entries.
///
/// Returns one vector per input text, in input order.
pub async fn get_or_compute(
    cache: &mut EmbedCache,
    provider: &dyn EmbeddingProvider,
    config: &EmbeddingConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let model = provider.model_name().to_string();
    let dims = provider.dims();

    let sanitized: Vec<String> = texts.iter().map(|t| sanitize(t)).collect();
    let keys: Vec<String> = sanitized
        .iter()
        .map(|t| cache_key(&config.provider, &model, dims, t))
        .collect();

    let mut vectors: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
    let mut missing: Vec<usize> = Vec::new();

    for (i, key) in keys.iter().enumerate() {
        match cache.get(key) {
            Some(entry) => vectors[i] = Some(embedding::unpack_vector(&entry.vector)?),
            None => missing.push(i),
        }
    }

    let had_misses = !missing.is_empty();

    for batch in missing.chunks(config.batch_size) {
        let batch_texts: Vec<String> = batch.iter().map(|&i| sanitized[i].clone()).collect();
        let embedded = embedding::embed_texts(provider, config, &batch_texts).await?;

        for (&i, vec) in batch.iter().zip(embedded.iter()) {
            cache.insert(
                keys[i].clone(),
                CacheEntry {
                    model: model.clone(),
                    dims,
                    vector: embedding::pack_vector(vec),
                },
            );
            vectors[i] = Some(vec.clone());
        }
    }

    if had_misses {
        cache.flush()?;
    }

    vectors
        .into_iter()
        .map(|v| v.ok_or_else(|| anyhow::anyhow!("Embedding missing from batch response")))
        .collect()
}
