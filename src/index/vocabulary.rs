//! The fixed, ordered label vocabulary the object detector recognizes.

use std::path::Path;

use ahash::AHashMap;

use super::IndexError;

/// Ordered sequence of object labels, loaded once per process.
///
/// File order defines vocabulary order, which in turn defines tie-break
/// precedence during label resolution. Lookups are case-normalized.
#[derive(Debug)]
pub struct LabelVocabulary {
    labels: Vec<String>,
    positions: AHashMap<String, usize>,
}

fn normalize(token: &str) -> String {
    token.trim().to_lowercase()
}

impl LabelVocabulary {
    /// Load a vocabulary from a newline-delimited text file, one label per
    /// line. Blank lines are skipped; the first occurrence of a duplicate
    /// label wins.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        if !path.exists() {
            return Err(IndexError::NotFound(path.to_path_buf()));
        }

        let raw = std::fs::read_to_string(path).map_err(|e| IndexError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let vocabulary = Self::from_labels(raw.lines());

        if vocabulary.is_empty() {
            tracing::warn!("Vocabulary file {} contains no labels", path.display());
        }

        Ok(vocabulary)
    }

    /// Build a vocabulary from an in-memory label sequence.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stored = Vec::new();
        let mut positions = AHashMap::new();

        for label in labels {
            let trimmed = label.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }

            let normalized = normalize(trimmed);
            if positions.contains_key(&normalized) {
                tracing::debug!("Skipping duplicate vocabulary label {:?}", trimmed);
                continue;
            }

            positions.insert(normalized, stored.len());
            stored.push(trimmed.to_string());
        }

        Self {
            labels: stored,
            positions,
        }
    }

    /// The canonical vocabulary label matching `token` (case-insensitive),
    /// if any.
    pub fn canonical(&self, token: &str) -> Option<&str> {
        self.positions
            .get(&normalize(token))
            .map(|&idx| self.labels[idx].as_str())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.positions.contains_key(&normalize(token))
    }

    /// Position of `label` in vocabulary order; tie-break precedence.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.positions.get(&normalize(label)).copied()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
