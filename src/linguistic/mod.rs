//! Query feature extraction.
//!
//! The full POS/NER machinery stays outside this crate; the query pipeline
//! only needs candidate label tokens for a prompt. The bundled heuristic
//! treats every non-stop-word as a noun candidate (unknown words default
//! to nouns) and emits a `person` feature when the prompt refers to
//! people, either through a person word or a mid-sentence capitalized
//! name.

use ahash::AHashSet;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinguisticError {
    #[error("Feature extraction failed: {0}")]
    Extraction(String),
}

/// Candidate label tokens for one query, ordered and deduplicated.
/// Ephemeral; lives only for the duration of a single query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFeatures {
    pub terms: Vec<String>,
}

impl QueryFeatures {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Trait for linguistic feature extraction backends.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Result<QueryFeatures, LinguisticError>;
}

const PERSON_FEATURE: &str = "person";

/// Words that directly refer to people.
const PERSON_WORDS: &[&str] = &[
    "person", "people", "man", "men", "woman", "women", "boy", "boys", "girl", "girls", "child",
    "children", "kid", "kids", "guy", "guys", "lady", "ladies", "baby", "babies", "player",
    "players", "crowd", "family", "couple",
];

/// Function words filtered out before treating tokens as noun candidates.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "this", "that", "these", "those", "some", "any", "each", "every", "no",
    "i", "me", "my", "mine", "we", "us", "our", "ours", "you", "your", "yours", "he", "him",
    "his", "she", "her", "hers", "it", "its", "they", "them", "their", "theirs", "who", "whom",
    "whose", "which", "what", "where", "when", "why", "how", "and", "or", "but", "nor", "so",
    "yet", "if", "then", "than", "because", "while", "of", "in", "on", "at", "to", "from", "by",
    "with", "without", "about", "above", "below", "under", "over", "into", "onto", "through",
    "between", "among", "against", "during", "before", "after", "behind", "beside", "near",
    "up", "down", "out", "off", "is", "am", "are", "was", "were", "be", "been", "being", "do",
    "does", "did", "doing", "have", "has", "had", "having", "will", "would", "shall", "should",
    "can", "could", "may", "might", "must", "not", "very", "too", "also", "just", "there",
    "here", "all", "both", "few", "more", "most", "other", "such", "only", "own", "same",
    "show", "find", "get", "give", "want", "like", "looking", "image", "images", "picture",
    "pictures", "photo", "photos",
];

/// Heuristic extractor approximating noun + person-entity extraction
/// without a trained pipeline.
pub struct HeuristicExtractor {
    token_pattern: Regex,
    stop_words: AHashSet<&'static str>,
    person_words: AHashSet<&'static str>,
}

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self {
            token_pattern: Regex::new(r"[A-Za-z][A-Za-z'-]*")
                .expect("token pattern is a valid regex"),
            stop_words: STOP_WORDS.iter().copied().collect(),
            person_words: PERSON_WORDS.iter().copied().collect(),
        }
    }
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor for HeuristicExtractor {
    fn extract(&self, text: &str) -> Result<QueryFeatures, LinguisticError> {
        let mut terms = Vec::new();
        let mut seen: AHashSet<String> = AHashSet::new();
        let mut has_person = false;

        for token in self.token_pattern.find_iter(text) {
            let word = token.as_str();
            let lowered = word.to_lowercase();

            if self.person_words.contains(lowered.as_str()) {
                has_person = true;
            }

            // A capitalized token after the start of a sentence reads as a
            // proper name; it contributes the person feature but is not a
            // usable label candidate itself.
            if is_capitalized(word) && !at_sentence_start(text, token.start()) {
                has_person = true;
                continue;
            }

            if self.stop_words.contains(lowered.as_str()) || lowered.len() < 2 {
                continue;
            }

            if seen.insert(lowered.clone()) {
                terms.push(lowered);
            }
        }

        if has_person && !seen.contains(PERSON_FEATURE) {
            terms.insert(0, PERSON_FEATURE.to_string());
        }

        Ok(QueryFeatures { terms })
    }
}

fn is_capitalized(word: &str) -> bool {
    word.chars()
        .next()
        .map(|c| c.is_uppercase())
        .unwrap_or(false)
}

fn at_sentence_start(text: &str, offset: usize) -> bool {
    text[..offset]
        .chars()
        .rev()
        .find(|c| !c.is_whitespace())
        .map(|c| matches!(c, '.' | '!' | '?'))
        .unwrap_or(true)
}
