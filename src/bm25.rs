//! Okapi BM25 lexical scorer.
//!
//! Scores term overlap between a query and a document, weighted by term
//! rarity (idf) and document length normalization. Corpus statistics are
//! recomputed per query over exactly the in-scope item set — they are
//! never cached, because correctness depends on the current candidate
//! universe.

use std::collections::HashMap;

use crate::tokenize::{term_frequencies, tokenize};

/// BM25 tuning parameters. Defaults k1 = 1.2, b = 0.75.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Tokenized view of one document, ready for scoring.
#[derive(Debug, Clone)]
pub struct DocTerms {
    pub tf: HashMap<String, usize>,
    pub len: usize,
}

impl DocTerms {
    pub fn from_text(text: &str) -> Self {
        let tokens = tokenize(text);
        let (tf, len) = term_frequencies(&tokens);
        Self { tf, len }
    }
}

/// Per-query corpus statistics: document frequency for the query terms
/// only (not the full vocabulary), total document count, and average
/// document length.
#[derive(Debug, Clone)]
pub struct CorpusStats {
    pub df: HashMap<String, usize>,
    pub total_docs: usize,
    pub avg_len: f64,
}

impl CorpusStats {
    /// Compute statistics over the given document set for the given
    /// query terms.
    pub fn compute(docs: &[DocTerms], query_terms: &[String]) -> Self {
        let total_docs = docs.len();
        let total_len: usize = docs.iter().map(|d| d.len).sum();
        let avg_len = if total_docs == 0 {
            0.0
        } else {
            total_len as f64 / total_docs as f64
        };

        let mut df: HashMap<String, usize> = HashMap::new();
        for term in query_terms {
            if df.contains_key(term) {
                continue;
            }
            let count = docs.iter().filter(|d| d.tf.contains_key(term)).count();
            df.insert(term.clone(), count);
        }

        Self {
            df,
            total_docs,
            avg_len,
        }
    }
}

/// Score one document against the query terms.
///
/// Returns 0.0 for a document sharing no terms with the query, for a
/// zero-length document, and for a degenerate corpus (one document or
/// fewer).
pub fn score(query_terms: &[String], doc: &DocTerms, stats: &CorpusStats, params: Bm25Params) -> f64 {
    if doc.len == 0 || stats.total_docs <= 1 || stats.avg_len <= 0.0 {
        return 0.0;
    }

    let n = stats.total_docs as f64;
    let mut total = 0.0;
    let mut seen: Vec<&str> = Vec::new();

    for term in query_terms {
        // Each distinct query term contributes once.
        if seen.contains(&term.as_str()) {
            continue;
        }
        seen.push(term);

        let tf = match doc.tf.get(term) {
            Some(&tf) => tf as f64,
            None => continue,
        };
        let df = *stats.df.get(term).unwrap_or(&0) as f64;

        let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
        let len_norm = 1.0 - params.b + params.b * (doc.len as f64 / stats.avg_len);
        let denom = tf + params.k1 * len_norm;
        if denom > 0.0 {
            total += idf * (tf * (params.k1 + 1.0)) / denom;
        }
    }

    total
}
