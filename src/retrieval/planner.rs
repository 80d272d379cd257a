//! Query planning and ranking.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashSet;
use thiserror::Error;

use crate::detect::ObjectDetector;
use crate::embedding::{EmbeddingIndex, TextEncoder};
use crate::index::KeywordIndex;
use crate::linguistic::FeatureExtractor;
use crate::resolve::LabelResolver;
use crate::vector::cosine_distance;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Retrieval unavailable: {0}")]
    Unavailable(String),

    #[error("Encoder dimension {encoder} does not match index dimension {index}")]
    DimensionMismatch { encoder: usize, index: usize },
}

/// The central query orchestrator.
///
/// Owns immutable handles to every collaborator and both indexes; nothing
/// here mutates after construction, so one planner can serve any number
/// of sequential queries (and be shared across threads behind an `Arc`).
pub struct QueryPlanner {
    encoder: Arc<dyn TextEncoder>,
    extractor: Arc<dyn FeatureExtractor>,
    detector: Arc<dyn ObjectDetector>,
    resolver: LabelResolver,
    keyword_index: KeywordIndex,
    embedding_index: EmbeddingIndex,
    /// Image identifier -> pixel path, derived from the keyword index.
    /// Used to return paths for candidates reached through the
    /// rank-only degrade path.
    known_paths: ahash::AHashMap<String, PathBuf>,
}

impl QueryPlanner {
    pub fn new(
        encoder: Arc<dyn TextEncoder>,
        extractor: Arc<dyn FeatureExtractor>,
        detector: Arc<dyn ObjectDetector>,
        resolver: LabelResolver,
        keyword_index: KeywordIndex,
        embedding_index: EmbeddingIndex,
    ) -> Result<Self, RetrievalError> {
        if encoder.dimension() != embedding_index.dimension() {
            return Err(RetrievalError::DimensionMismatch {
                encoder: encoder.dimension(),
                index: embedding_index.dimension(),
            });
        }

        let mut known_paths = ahash::AHashMap::new();
        for label in keyword_index.labels() {
            for path in keyword_index.lookup(label) {
                if let Some(id) = image_id(path) {
                    known_paths.entry(id).or_insert_with(|| path.clone());
                }
            }
        }

        Ok(Self {
            encoder,
            extractor,
            detector,
            resolver,
            keyword_index,
            embedding_index,
            known_paths,
        })
    }

    /// Answer a text prompt with the `top_k` best-matching image paths.
    ///
    /// Pipeline: extract candidate tokens, resolve them onto the label
    /// vocabulary, filter candidates through the keyword index (or fall
    /// back to the whole embedded corpus when nothing resolves), then
    /// rank by minimum cosine distance between the prompt embedding and
    /// each candidate's caption vectors.
    ///
    /// The result never contains the same image twice. An empty result is
    /// a valid outcome, not an error.
    pub fn query_by_text(
        &self,
        prompt: &str,
        top_k: usize,
    ) -> Result<Vec<PathBuf>, RetrievalError> {
        if prompt.trim().is_empty() {
            return Err(RetrievalError::InvalidQuery(
                "Prompt cannot be empty".to_string(),
            ));
        }

        if top_k == 0 {
            return Ok(Vec::new());
        }

        let features = self
            .extractor
            .extract(prompt)
            .map_err(|e| RetrievalError::Unavailable(e.to_string()))?;

        let labels = self.resolve_labels(&features.terms);
        tracing::debug!(?labels, "Resolved query labels");

        let candidates = if labels.is_empty() {
            // Degrade from filter-then-rank to rank-only over every
            // embedded image with a known pixel path.
            self.embedding_index
                .ids()
                .iter()
                .filter_map(|id| self.known_paths.get(id).cloned())
                .collect()
        } else {
            self.keyword_index
                .lookup_any(labels.iter().map(String::as_str))
        };

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .encoder
            .embed(prompt)
            .map_err(|e| RetrievalError::Unavailable(e.to_string()))?;

        Ok(self.rank(candidates, &query_vector, top_k))
    }

    /// Answer a reverse-image query: find images sharing detected objects
    /// with the one at `image`.
    ///
    /// There is no caption to embed for an upload, so no vector ranking
    /// applies; the result is the deduplicated union of keyword lookups
    /// for the detected labels, in index order, truncated to `top_k`.
    pub fn query_by_image_objects(
        &self,
        image: &Path,
        confidence_threshold: f32,
        top_k: usize,
    ) -> Result<Vec<PathBuf>, RetrievalError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let detected = self
            .detector
            .detect(image, confidence_threshold)
            .map_err(|e| RetrievalError::Unavailable(e.to_string()))?;

        if detected.is_empty() {
            tracing::debug!("No objects detected in {}", image.display());
            return Ok(Vec::new());
        }

        // The detector hands back an unordered set; vocabulary order
        // keeps the union deterministic.
        let vocabulary = self.resolver.vocabulary();
        let mut labels: Vec<String> = detected.into_iter().collect();
        labels.sort_by_key(|label| (vocabulary.position(label).unwrap_or(usize::MAX), label.clone()));

        let mut results = self
            .keyword_index
            .lookup_any(labels.iter().map(String::as_str));
        results.truncate(top_k);

        Ok(results)
    }

    /// Resolve feature terms to an ordered, deduplicated label union.
    /// Resolution failures degrade to "this term contributes nothing"
    /// rather than aborting the query.
    fn resolve_labels(&self, terms: &[String]) -> Vec<String> {
        let mut labels = Vec::new();
        let mut seen: AHashSet<String> = AHashSet::new();

        for term in terms {
            match self.resolver.resolve(term) {
                Ok(resolved) => {
                    for label in resolved {
                        if seen.insert(label.clone()) {
                            labels.push(label);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Could not resolve term {:?}: {}", term, e);
                }
            }
        }

        labels
    }

    /// Rank candidates ascending by the minimum cosine distance between
    /// the query vector and each candidate's caption vectors. Candidates
    /// without usable vectors are excluded; the sort is stable, so ties
    /// keep candidate order.
    fn rank(&self, candidates: Vec<PathBuf>, query_vector: &[f32], top_k: usize) -> Vec<PathBuf> {
        let mut scored: Vec<(PathBuf, f32)> = Vec::with_capacity(candidates.len());
        let mut seen: AHashSet<String> = AHashSet::new();

        for candidate in candidates {
            let id = match image_id(&candidate) {
                Some(id) => id,
                None => {
                    tracing::warn!(
                        "Candidate path {} has no usable file stem",
                        candidate.display()
                    );
                    continue;
                }
            };

            if !seen.insert(id.clone()) {
                continue;
            }

            let vectors = self.embedding_index.vectors_for(&id);
            if vectors.is_empty() {
                tracing::debug!("No caption vectors for {:?}; excluded from ranking", id);
                continue;
            }

            let mut best = f32::INFINITY;
            for vector in vectors {
                match cosine_distance(query_vector, vector) {
                    Ok(distance) => best = best.min(distance),
                    Err(e) => {
                        tracing::warn!("Skipping caption vector for {:?}: {}", id, e);
                    }
                }
            }

            if best.is_finite() {
                scored.push((candidate, best));
            }
        }

        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(top_k);
        scored.into_iter().map(|(path, _)| path).collect()
    }

    pub fn keyword_index(&self) -> &KeywordIndex {
        &self.keyword_index
    }

    pub fn embedding_index(&self) -> &EmbeddingIndex {
        &self.embedding_index
    }
}

/// Image identifier for a pixel path: the filename stem.
fn image_id(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}
