//! Lexical tokenization for similarity scoring and keyword extraction.
//!
//! Text is lowercased, stripped of every character that is neither
//! alphanumeric nor whitespace, split on whitespace, and filtered by a minimum
//! length and a fixed English stop-word list. The output is deterministic for
//! a given input and never fails; empty input yields an empty set.

use std::collections::btree_set;
use std::collections::{BTreeSet, HashMap, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::defaults::TOKEN_MIN_LENGTH;

/// Common English function words ignored by the tokenizer.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
        "any", "are", "aren", "around", "as", "at", "be", "because", "been", "before", "being",
        "below", "between", "both", "but", "by", "can", "cannot", "could", "couldn", "did",
        "didn", "do", "does", "doesn", "doing", "don", "down", "during", "each", "either",
        "else", "even", "ever", "every", "few", "for", "from", "further", "get", "gets", "got",
        "had", "hadn", "has", "hasn", "have", "haven", "having", "he", "her", "here", "hers",
        "herself", "him", "himself", "his", "how", "however", "i", "if", "in", "into", "is",
        "isn", "it", "its", "itself", "just", "let", "like", "may", "me", "might", "more",
        "most", "much", "must", "mustn", "my", "myself", "neither", "no", "nor", "not", "now",
        "of", "off", "often", "on", "once", "one", "only", "or", "other", "ought", "our", "ours",
        "ourselves", "out", "over", "own", "per", "quite", "rather", "really", "same", "shall",
        "she", "should", "shouldn", "since", "so", "some", "still", "such", "than", "that",
        "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they",
        "this", "those", "though", "through", "thus", "to", "too", "under", "until", "up",
        "upon", "us", "very", "was", "wasn", "we", "were", "weren", "what", "whatever", "when",
        "where", "whether", "which", "while", "who", "whom", "whose", "why", "will", "with",
        "within", "without", "won", "would", "wouldn", "yet", "you", "your", "yours",
        "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Whether `word` (already lowercased) is in the stop-word list.
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

/// The set of normalized tokens derived from a piece of text.
///
/// Backed by an ordered set so iteration (and anything rendered from it,
/// such as suggestion reasons) is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet(BTreeSet<String>);

impl TokenSet {
    /// Create an empty token set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn insert(&mut self, token: impl Into<String>) -> bool {
        self.0.insert(token.into())
    }

    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.0.iter()
    }

    /// Number of tokens present in both sets.
    pub fn intersection_count(&self, other: &TokenSet) -> usize {
        self.0.intersection(&other.0).count()
    }

    /// Number of distinct tokens across both sets.
    pub fn union_count(&self, other: &TokenSet) -> usize {
        self.0.len() + other.0.len() - self.intersection_count(other)
    }

    /// Tokens present in both sets, in sorted order.
    pub fn shared<'a>(&'a self, other: &'a TokenSet) -> Vec<&'a str> {
        self.0.intersection(&other.0).map(String::as_str).collect()
    }
}

impl FromIterator<String> for TokenSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for TokenSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}

impl<'a> IntoIterator for &'a TokenSet {
    type Item = &'a String;
    type IntoIter = btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Lowercase, then drop everything that is not alphanumeric or whitespace.
///
/// Combining marks produced by lowercasing (`İ` becomes `i` + U+0307) are
/// stripped too.
fn clean(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

/// Significant words of `text` in order of appearance (duplicates kept).
fn significant_words(text: &str, min_length: usize) -> Vec<String> {
    clean(text)
        .split_whitespace()
        .filter(|w| w.chars().count() >= min_length && !is_stop_word(w))
        .map(str::to_string)
        .collect()
}

/// Tokenize with the default minimum length.
pub fn tokenize(text: &str) -> TokenSet {
    tokenize_with_min(text, TOKEN_MIN_LENGTH)
}

/// Tokenize `text`, discarding tokens shorter than `min_length` characters.
pub fn tokenize_with_min(text: &str, min_length: usize) -> TokenSet {
    significant_words(text, min_length).into_iter().collect()
}

/// Extract at most `top_k` distinct keywords ranked by frequency.
///
/// Ties on frequency are broken by first occurrence in the text, so the
/// output does not depend on hash or sort-stability details.
pub fn extract_keywords(text: &str, top_k: usize) -> Vec<String> {
    // word -> (count, first position)
    let mut stats: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, word) in significant_words(text, TOKEN_MIN_LENGTH)
        .into_iter()
        .enumerate()
    {
        stats.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = stats
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.into_iter().take(top_k).map(|(w, _, _)| w).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_collapses_duplicates_and_stop_words() {
        let tokens = tokenize_with_min("The Quick, quick FOX jumps.", 3);
        let expected: TokenSet = ["quick", "fox", "jumps"].into_iter().collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_tokenize_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \n\t ").is_empty());
        assert!(tokenize("!!! ??? ...").is_empty());
    }

    #[test]
    fn test_tokenize_respects_min_length() {
        let tokens = tokenize_with_min("go to rust ab abc abcd", 4);
        let expected: TokenSet = ["rust", "abcd"].into_iter().collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_tokenize_strips_punctuation_inside_words() {
        let tokens = tokenize("state-machine e.g. don't");
        assert!(tokens.contains("statemachine"));
        assert!(tokens.contains("dont"));
        assert!(!tokens.contains("eg"));
    }

    #[test]
    fn test_tokenize_keeps_digits_and_unicode_letters() {
        let tokens = tokenize("Café 2024 notes über");
        assert!(tokens.contains("café"));
        assert!(tokens.contains("2024"));
        assert!(tokens.contains("über"));
    }

    #[test]
    fn test_tokenize_lowercases_before_stripping() {
        // `İ` lowercases to `i` plus a combining dot that must not survive.
        let tokens = tokenize("İstanbul trip");
        assert!(tokens.contains("istanbul"));
        assert!(tokens.iter().all(|t| t.chars().all(char::is_alphanumeric)));
    }

    #[test]
    fn test_tokenize_never_emits_stop_words_or_short_tokens() {
        let samples = [
            "This is what they would have said about the other one",
            "An ode to the joy of Rust and its borrow checker",
            "If you can, you should; if not, then why?",
        ];
        for sample in samples {
            for min in 1..6 {
                for token in &tokenize_with_min(sample, min) {
                    assert!(!is_stop_word(token), "{token} is a stop word");
                    assert!(token.chars().count() >= min, "{token} shorter than {min}");
                }
            }
        }
    }

    #[test]
    fn test_stop_word_list_size() {
        assert!(STOP_WORDS.len() >= 140, "stop-word list is unexpectedly small");
        assert!(!is_stop_word("quick"));
        assert!(is_stop_word("the"));
    }

    #[test]
    fn test_extract_keywords_ranks_by_frequency() {
        let text = "raft log raft consensus log raft leader";
        let keywords = extract_keywords(text, 20);
        assert_eq!(keywords, vec!["raft", "log", "consensus", "leader"]);
    }

    #[test]
    fn test_extract_keywords_ties_follow_first_occurrence() {
        let text = "zebra apple mango apple zebra mango";
        assert_eq!(extract_keywords(text, 3), vec!["zebra", "apple", "mango"]);
    }

    #[test]
    fn test_extract_keywords_truncates_to_top_k() {
        let text = "alpha beta gamma delta epsilon";
        assert_eq!(extract_keywords(text, 2), vec!["alpha", "beta"]);
        assert!(extract_keywords(text, 0).is_empty());
    }

    #[test]
    fn test_token_set_counts() {
        let a: TokenSet = ["raft", "consensus", "log"].into_iter().collect();
        let b: TokenSet = ["raft", "paxos", "log"].into_iter().collect();
        assert_eq!(a.intersection_count(&b), 2);
        assert_eq!(a.union_count(&b), 4);
        assert_eq!(a.shared(&b), vec!["log", "raft"]);
    }
}
