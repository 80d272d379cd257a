//! Precomputed caption-embedding store.
//!
//! The embedding index file maps each image identifier (filename stem) to
//! the `.npy` vector files of its captions. All vectors are loaded into
//! memory here, before any ranking begins, because ranking scans every
//! candidate.

use std::path::Path;

use ahash::AHashMap;
use ndarray::Array1;
use ndarray_npy::read_npy;
use thiserror::Error;

use crate::index::{read_index_object, IndexError};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Embedding index error: {0}")]
    Index(#[from] IndexError),

    #[error("Invalid dimension: {0}")]
    InvalidDimension(usize),
}

/// Mapping from image identifier to that image's caption vectors.
///
/// An image may have several captions and therefore several vectors; an
/// identifier absent from the store simply has no vectors. A vector file
/// that is missing or malformed on disk is logged and skipped at load
/// time so one bad entry never poisons the rest of the corpus.
pub struct EmbeddingIndex {
    vectors: AHashMap<String, Vec<Vec<f32>>>,
    ids: Vec<String>,
    dimension: usize,
}

impl EmbeddingIndex {
    /// Load an embedding index from a JSON object file mapping image
    /// identifiers to arrays of `.npy` vector file paths. `dimension` is
    /// the expected width of every vector; entries of any other width are
    /// dropped with a warning.
    pub fn load(path: &Path, dimension: usize) -> Result<Self, StoreError> {
        if dimension == 0 {
            return Err(StoreError::InvalidDimension(dimension));
        }

        let raw_entries = read_index_object(path)?;

        let mut vectors: AHashMap<String, Vec<Vec<f32>>> =
            AHashMap::with_capacity(raw_entries.len());
        let mut skipped = 0usize;
        let mut loaded = 0usize;

        for (id, vector_paths) in raw_entries {
            let entry = vectors.entry(id).or_default();
            for vector_path in vector_paths {
                match load_vector(Path::new(&vector_path), dimension) {
                    Ok(vector) => {
                        loaded += 1;
                        entry.push(vector);
                    }
                    Err(message) => {
                        skipped += 1;
                        tracing::warn!("Skipping caption vector {}: {}", vector_path, message);
                    }
                }
            }
        }

        let mut ids: Vec<String> = vectors.keys().cloned().collect();
        ids.sort_unstable();

        tracing::debug!(
            "Loaded embedding index from {} ({} images, {} vectors, {} skipped)",
            path.display(),
            ids.len(),
            loaded,
            skipped
        );

        Ok(Self {
            vectors,
            ids,
            dimension,
        })
    }

    /// Build a store from in-memory vectors.
    pub fn from_vectors<I, S>(entries: I, dimension: usize) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = (S, Vec<Vec<f32>>)>,
        S: Into<String>,
    {
        if dimension == 0 {
            return Err(StoreError::InvalidDimension(dimension));
        }

        let mut vectors: AHashMap<String, Vec<Vec<f32>>> = AHashMap::new();
        for (id, entry) in entries {
            let id = id.into();
            for vector in &entry {
                if vector.len() != dimension {
                    tracing::warn!(
                        "Dropping vector of width {} for {:?} (expected {})",
                        vector.len(),
                        id,
                        dimension
                    );
                }
            }
            vectors
                .entry(id)
                .or_default()
                .extend(entry.into_iter().filter(|v| v.len() == dimension));
        }

        let mut ids: Vec<String> = vectors.keys().cloned().collect();
        ids.sort_unstable();

        Ok(Self {
            vectors,
            ids,
            dimension,
        })
    }

    /// Caption vectors for `id`; empty if the image has no captions or
    /// none of its vector files survived loading.
    pub fn vectors_for(&self, id: &str) -> &[Vec<f32>] {
        self.vectors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All image identifiers in the store, in a deterministic (sorted)
    /// order. This is the candidate set when a query resolves no labels.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of images in the store.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn load_vector(path: &Path, dimension: usize) -> Result<Vec<f32>, String> {
    if !path.exists() {
        return Err("file not found".to_string());
    }

    let array: Array1<f32> = read_npy(path).map_err(|e| e.to_string())?;

    if array.len() != dimension {
        return Err(format!(
            "expected {} dimensions, got {}",
            dimension,
            array.len()
        ));
    }

    Ok(array.to_vec())
}
