//! Label resolution: mapping free-text tokens onto the detector
//! vocabulary.
//!
//! An exact (case-normalized) match wins outright. Otherwise the token is
//! scored against every vocabulary entry by semantic similarity and the
//! top-N labels are returned, so loosely phrased queries ("puppy") still
//! reach the right keyword buckets ("dog").

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use ahash::AHashMap;
use thiserror::Error;

use crate::embedding::TextEncoder;
use crate::index::LabelVocabulary;
use crate::vector::cosine_distance;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Similarity resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Similarity scoring failed: {0}")]
    Scoring(String),
}

/// Trait for word-level semantic similarity backends.
pub trait WordSimilarity: Send + Sync {
    /// Similarity scores between `word` and every entry of `labels`, in
    /// the same order. Higher is more similar.
    fn scores(&self, word: &str, labels: &[String]) -> Result<Vec<f32>, ResolveError>;
}

/// Word similarity backed by the sentence encoder.
///
/// Every vocabulary label is embedded once at construction; scoring a
/// token costs one further embedding plus a scan over the cached label
/// vectors.
pub struct EncoderSimilarity {
    encoder: Arc<dyn TextEncoder>,
    label_vectors: AHashMap<String, Vec<f32>>,
}

impl EncoderSimilarity {
    pub fn new(
        encoder: Arc<dyn TextEncoder>,
        vocabulary: &LabelVocabulary,
    ) -> Result<Self, ResolveError> {
        let labels = vocabulary.labels().to_vec();
        let vectors = if labels.is_empty() {
            Vec::new()
        } else {
            encoder
                .embed_batch(&labels)
                .map_err(|e| ResolveError::ResourceUnavailable(e.to_string()))?
        };

        let label_vectors = labels.into_iter().zip(vectors).collect();

        Ok(Self {
            encoder,
            label_vectors,
        })
    }
}

impl WordSimilarity for EncoderSimilarity {
    fn scores(&self, word: &str, labels: &[String]) -> Result<Vec<f32>, ResolveError> {
        let word_vector = self
            .encoder
            .embed(word)
            .map_err(|e| ResolveError::ResourceUnavailable(e.to_string()))?;

        let mut scores = Vec::with_capacity(labels.len());
        for label in labels {
            let label_vector = match self.label_vectors.get(label) {
                Some(v) => v,
                None => {
                    scores.push(f32::NEG_INFINITY);
                    continue;
                }
            };

            let distance = cosine_distance(&word_vector, label_vector)
                .map_err(|e| ResolveError::Scoring(e.to_string()))?;
            scores.push(1.0 - distance);
        }

        Ok(scores)
    }
}

struct Candidate {
    score: f32,
    position: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // Max-heap keyed by score; on equal scores the earlier vocabulary
    // position wins.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.position.cmp(&self.position))
    }
}

/// Resolves free-text tokens to vocabulary labels.
pub struct LabelResolver {
    vocabulary: Arc<LabelVocabulary>,
    similarity: Arc<dyn WordSimilarity>,
    expansion_limit: usize,
}

impl LabelResolver {
    /// `expansion_limit` is the number of similar labels returned when no
    /// exact match exists; zero disables the similarity fallback.
    pub fn new(
        vocabulary: Arc<LabelVocabulary>,
        similarity: Arc<dyn WordSimilarity>,
        expansion_limit: usize,
    ) -> Self {
        Self {
            vocabulary,
            similarity,
            expansion_limit,
        }
    }

    /// Resolve `token` to zero or more vocabulary labels.
    ///
    /// An exact case-normalized match returns that label alone without
    /// touching the similarity backend. Otherwise the top
    /// `expansion_limit` labels by similarity are returned, ties broken
    /// by vocabulary order.
    pub fn resolve(&self, token: &str) -> Result<Vec<String>, ResolveError> {
        if let Some(label) = self.vocabulary.canonical(token) {
            return Ok(vec![label.to_string()]);
        }

        if self.expansion_limit == 0 || self.vocabulary.is_empty() {
            return Ok(Vec::new());
        }

        let labels = self.vocabulary.labels();
        let scores = self.similarity.scores(token, labels)?;

        let mut heap = BinaryHeap::with_capacity(labels.len());
        for (position, score) in scores.into_iter().enumerate() {
            if !score.is_finite() {
                continue;
            }
            heap.push(Candidate { score, position });
        }

        let mut resolved = Vec::with_capacity(self.expansion_limit);
        while resolved.len() < self.expansion_limit {
            match heap.pop() {
                Some(candidate) => resolved.push(labels[candidate.position].clone()),
                None => break,
            }
        }

        Ok(resolved)
    }

    pub fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }
}
