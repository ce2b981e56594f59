use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// The fixed top-level memory file.
    pub memory_file: PathBuf,
    /// Directory of dated memory notes (`*.md`).
    pub memory_dir: PathBuf,
    /// Root of Claude session transcripts (`*.jsonl`).
    #[serde(default)]
    pub claude_root: Option<PathBuf>,
    /// Root of Codex session transcripts (`*.jsonl`).
    #[serde(default)]
    pub codex_root: Option<PathBuf>,
    /// Repository name used to decide whether a Codex session belongs
    /// to this project (substring match against the session cwd).
    #[serde(default)]
    pub repo_name: Option<String>,
    /// Transcript files larger than this are skipped with a warning.
    #[serde(default = "default_max_transcript_bytes")]
    pub max_transcript_bytes: u64,
}

fn default_max_transcript_bytes() -> u64 {
    500 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            min_chars: default_min_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    1200
}
fn default_min_chars() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Weight of the normalized BM25 signal in hybrid fusion.
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,
    /// Weight of the normalized cosine signal in hybrid fusion.
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,
    /// Candidate pool size per signal before fusion.
    #[serde(default = "default_candidate_window")]
    pub candidate_window: usize,
    #[serde(default = "default_final_limit")]
    pub final_limit: usize,
    #[serde(default = "default_bm25_k1")]
    pub bm25_k1: f64,
    #[serde(default = "default_bm25_b")]
    pub bm25_b: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            keyword_weight: default_keyword_weight(),
            semantic_weight: default_semantic_weight(),
            candidate_window: default_candidate_window(),
            final_limit: default_final_limit(),
            bm25_k1: default_bm25_k1(),
            bm25_b: default_bm25_b(),
        }
    }
}

fn default_keyword_weight() -> f64 {
    0.45
}
fn default_semantic_weight() -> f64 {
    0.55
}
fn default_candidate_window() -> usize {
    80
}
fn default_final_limit() -> usize {
    12
}
fn default_bm25_k1() -> f64 {
    1.2
}
fn default_bm25_b() -> f64 {
    0.75
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Flat-file embedding cache location.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            cache_path: default_cache_path(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    96
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_cache_path() -> PathBuf {
    PathBuf::from(".engram/embeddings.json")
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }
    if config.chunking.min_chars > config.chunking.max_chars {
        anyhow::bail!("chunking.min_chars must be <= chunking.max_chars");
    }

    // Validate retrieval
    if config.retrieval.final_limit < 1 {
        anyhow::bail!("retrieval.final_limit must be >= 1");
    }
    if config.retrieval.candidate_window < 1 {
        anyhow::bail!("retrieval.candidate_window must be >= 1");
    }
    if config.retrieval.keyword_weight < 0.0 || config.retrieval.semantic_weight < 0.0 {
        anyhow::bail!("retrieval weights must be >= 0");
    }
    if config.retrieval.keyword_weight + config.retrieval.semantic_weight <= 0.0 {
        anyhow::bail!("retrieval weights must not both be zero");
    }
    if config.retrieval.bm25_k1 <= 0.0 {
        anyhow::bail!("retrieval.bm25_k1 must be > 0");
    }
    if !(0.0..=1.0).contains(&config.retrieval.bm25_b) {
        anyhow::bail!("retrieval.bm25_b must be in [0.0, 1.0]");
    }

    // Validate embedding
    if config.embedding.is_enabled() {
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be > 0");
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(config)
}
