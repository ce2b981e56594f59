use anyhow::{bail, Result};
use chrono::NaiveDate;

use crate::bm25::{self, Bm25Params, CorpusStats, DocTerms};
use crate::cache::{self, EmbedCache};
use crate::config::Config;
use crate::embedding;
use crate::memory;
use crate::models::{
    RankedResult, ScoreExplanation, SearchItem, SearchResultItem, TranscriptSource,
};
use crate::rank::{self, FusionParams};
use crate::tokenize::tokenize;
use crate::transcript;

const SNIPPET_CHARS: usize = 240;

/// Options for one search invocation, parsed from the CLI.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// `"keyword"` or `"hybrid"`.
    pub mode: String,
    /// Restrict to `memory`, `claude`, or `codex`.
    pub source: Option<String>,
    /// Only include sessions starting on or after this date (YYYY-MM-DD).
    pub since: Option<String>,
    pub limit: Option<usize>,
    /// Discard the embedding cache before searching (full rebuild).
    pub reindex: bool,
    pub explain: bool,
    pub json: bool,
}

pub async fn run_search(config: &Config, query: &str, opts: &SearchOptions) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    match opts.mode.as_str() {
        "keyword" | "hybrid" => {}
        _ => bail!("Unknown search mode: {}. Use keyword or hybrid.", opts.mode),
    }

    // Hybrid requires embeddings; never silently degrade to lexical-only.
    if opts.mode == "hybrid" && !config.embedding.is_enabled() {
        bail!("Mode 'hybrid' requires embeddings. Set [embedding] provider in config.");
    }

    if let Some(src) = opts.source.as_deref() {
        match src {
            "memory" | "claude" | "codex" => {}
            _ => bail!("Unknown source: {}. Use memory, claude, or codex.", src),
        }
    }

    let since = match opts.since.as_deref() {
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| anyhow::anyhow!("Invalid --since date (expected YYYY-MM-DD): {}", raw))?,
        ),
        None => None,
    };

    let items = collect_items(config, opts.source.as_deref(), since).await?;
    if items.is_empty() {
        println!("No results.");
        return Ok(());
    }

    // BM25 for every item, in both modes — it is the keyword half of
    // hybrid fusion.
    let query_terms = tokenize(query);
    let docs: Vec<DocTerms> = items.iter().map(|i| DocTerms::from_text(i.text())).collect();
    let stats = CorpusStats::compute(&docs, &query_terms);
    let params = Bm25Params {
        k1: config.retrieval.bm25_k1,
        b: config.retrieval.bm25_b,
    };
    let bm25_scores: Vec<f64> = docs
        .iter()
        .map(|d| bm25::score(&query_terms, d, &stats, params))
        .collect();

    let ranked: Vec<RankedResult> = match opts.mode.as_str() {
        "keyword" => rank::rank_keyword(&bm25_scores)
            .into_iter()
            // Zero-score items sort last and are filtered from display.
            .filter(|r| r.bm25 > 0.0)
            .collect(),
        _ => {
            let cosine_scores = cosine_scores(config, query, &items, opts.reindex).await?;
            let fusion = FusionParams {
                keyword_weight: config.retrieval.keyword_weight,
                semantic_weight: config.retrieval.semantic_weight,
                candidate_window: config.retrieval.candidate_window,
            };
            rank::rank_hybrid(&bm25_scores, &cosine_scores, fusion)
        }
    };

    if ranked.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let limit = opts.limit.unwrap_or(config.retrieval.final_limit);
    let results = to_result_items(&ranked, &items, config, opts, limit);

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results(&results, &items, &ranked);
    }

    Ok(())
}

/// Gather the in-scope item set: memory chunks plus transcript messages,
/// honoring the source filter and the since cutoff.
async fn collect_items(
    config: &Config,
    source: Option<&str>,
    since: Option<NaiveDate>,
) -> Result<Vec<SearchItem>> {
    let mut items = Vec::new();

    if source.is_none() || source == Some("memory") {
        for chunk in memory::load_memory_chunks(config)? {
            items.push(SearchItem::Memory(chunk));
        }
    }

    let repo_name = config.corpus.repo_name.as_deref();
    let max_bytes = config.corpus.max_transcript_bytes;

    if source.is_none() || source == Some("claude") {
        if let Some(root) = &config.corpus.claude_root {
            let messages =
                transcript::scan_root(root, TranscriptSource::Claude, repo_name, since, max_bytes)
                    .await?;
            items.extend(messages.into_iter().map(SearchItem::Session));
        }
    }

    if source.is_none() || source == Some("codex") {
        if let Some(root) = &config.corpus.codex_root {
            let messages =
                transcript::scan_root(root, TranscriptSource::Codex, repo_name, since, max_bytes)
                    .await?;
            items.extend(messages.into_iter().map(SearchItem::Session));
        }
    }

    Ok(items)
}

/// Compute cosine similarity of every item against the query embedding,
/// fetching vectors through the cache.
async fn cosine_scores(
    config: &Config,
    query: &str,
    items: &[SearchItem],
    reindex: bool,
) -> Result<Vec<f64>> {
    let provider = embedding::create_provider(&config.embedding)?;
    let mut embed_cache = EmbedCache::open(&config.embedding.cache_path, reindex)?;

    let texts: Vec<String> = items.iter().map(|i| i.text().to_string()).collect();
    let item_vectors = cache::get_or_compute(
        &mut embed_cache,
        provider.as_ref(),
        &config.embedding,
        &texts,
    )
    .await?;

    // The query embedding is cached identically to chunk embeddings;
    // get_or_compute persists again if it was a miss.
    let query_vectors = cache::get_or_compute(
        &mut embed_cache,
        provider.as_ref(),
        &config.embedding,
        &[query.to_string()],
    )
    .await?;
    let query_vec = query_vectors
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty query embedding"))?;

    Ok(item_vectors
        .iter()
        .map(|v| embedding::cosine_similarity(v, &query_vec))
        .collect())
}

fn to_result_items(
    ranked: &[RankedResult],
    items: &[SearchItem],
    config: &Config,
    opts: &SearchOptions,
    limit: usize,
) -> Vec<SearchResultItem> {
    ranked
        .iter()
        .take(limit)
        .map(|r| {
            let item = &items[r.item_idx];
            let explain = opts.explain.then(|| ScoreExplanation {
                bm25: r.bm25,
                cosine: r.cosine,
                keyword_weight: config.retrieval.keyword_weight,
                semantic_weight: config.retrieval.semantic_weight,
            });
            SearchResultItem {
                score: r.score(),
                source: item.source_name().to_string(),
                location: item.location(),
                label: item.label().to_string(),
                snippet: snippet(item.text()),
                explain,
            }
        })
        .collect()
}

fn print_results(results: &[SearchResultItem], items: &[SearchItem], ranked: &[RankedResult]) {
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.2}] {} / {}",
            i + 1,
            result.score,
            result.source,
            result.location
        );
        if let SearchItem::Session(m) = &items[ranked[i].item_idx] {
            if let Some(date) = m.session_date {
                println!("    date: {}", date.format("%Y-%m-%d"));
            }
            if !m.first_user_message.is_empty() {
                println!("    session: \"{}\"", m.first_user_message);
            }
        }
        if let Some(ref explain) = result.explain {
            match explain.cosine {
                Some(cosine) => println!(
                    "    scores: bm25={:.3} cosine={:.3} weights={}/{}",
                    explain.bm25, cosine, explain.keyword_weight, explain.semantic_weight
                ),
                None => println!("    scores: bm25={:.3}", explain.bm25),
            }
        }
        println!("    excerpt: \"{}\"", result.snippet);
        println!();
    }
}

/// A single-line excerpt of the item text.
fn snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out: String = flat.chars().take(SNIPPET_CHARS).collect();
    if flat.chars().count() > SNIPPET_CHARS {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_flattens_and_caps() {
        let text = "line one\nline two\n\n   spaced    out";
        assert_eq!(snippet(text), "line one line two spaced out");

        let long = "word ".repeat(200);
        let s = snippet(&long);
        assert!(s.chars().count() <= SNIPPET_CHARS + 3);
        assert!(s.ends_with("..."));
    }

    #[tokio::test]
    async fn test_unknown_mode_rejected() {
        let config = test_config();
        let opts = SearchOptions {
            mode: "semantic-ish".to_string(),
            source: None,
            since: None,
            limit: None,
            reindex: false,
            explain: false,
            json: false,
        };
        let err = run_search(&config, "query", &opts).await.unwrap_err();
        assert!(err.to_string().contains("Unknown search mode"));
    }

    #[tokio::test]
    async fn test_hybrid_requires_embedding_provider() {
        let config = test_config();
        let opts = SearchOptions {
            mode: "hybrid".to_string(),
            source: None,
            since: None,
            limit: None,
            reindex: false,
            explain: false,
            json: false,
        };
        let err = run_search(&config, "query", &opts).await.unwrap_err();
        assert!(err.to_string().contains("requires embeddings"));
    }

    #[tokio::test]
    async fn test_invalid_since_rejected() {
        let config = test_config();
        let opts = SearchOptions {
            mode: "keyword".to_string(),
            source: None,
            since: Some("last tuesday".to_string()),
            limit: None,
            reindex: false,
            explain: false,
            json: false,
        };
        let err = run_search(&config, "query", &opts).await.unwrap_err();
        assert!(err.to_string().contains("Invalid --since"));
    }

    fn test_config() -> Config {
        use crate::config::CorpusConfig;
        Config {
            corpus: CorpusConfig {
                memory_file: "MEMORY.md".into(),
                memory_dir: "memory".into(),
                claude_root: None,
                codex_root: None,
                repo_name: None,
                max_transcript_bytes: 500 * 1024 * 1024,
            },
            chunking: Default::default(),
            retrieval: Default::default(),
            embedding: Default::default(),
        }
    }
}
