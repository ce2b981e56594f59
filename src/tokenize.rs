//! Query and corpus tokenization.
//!
//! A token is a maximal run of lowercase alphanumeric-or-underscore
//! characters; everything else separates. The same function is used for
//! both the corpus and the query side — ranking correctness depends on
//! the two never diverging.

use std::collections::HashMap;

/// Split text into lowercase index terms. Pure and deterministic.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Term-frequency map plus token count for one document.
pub fn term_frequencies(tokens: &[String]) -> (HashMap<String, usize>, usize) {
    let mut tf = HashMap::new();
    for token in tokens {
        *tf.entry(token.clone()).or_insert(0) += 1;
    }
    (tf, tokens.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_splits() {
        let tokens = tokenize("Hello, World! foo_bar v2");
        assert_eq!(tokens, vec!["hello", "world", "foo_bar", "v2"]);
    }

    #[test]
    fn test_drops_empty_tokens() {
        let tokens = tokenize("---  ,, !!");
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let first = tokenize("Some Mixed-Case text, with punctuation_and_more!");
        let rejoined = first.join(" ");
        let second = tokenize(&rejoined);
        assert_eq!(first, second);
    }

    #[test]
    fn test_never_returns_empty_tokens() {
        for input in ["", "   ", "a  b", "..a..", "__", "é ü"] {
            for token in tokenize(input) {
                assert!(!token.is_empty(), "empty token from {:?}", input);
            }
        }
    }

    #[test]
    fn test_term_frequencies() {
        let tokens = tokenize("fox jumps fox");
        let (tf, len) = term_frequencies(&tokens);
        assert_eq!(len, 3);
        assert_eq!(tf.get("fox"), Some(&2));
        assert_eq!(tf.get("jumps"), Some(&1));
    }
}
