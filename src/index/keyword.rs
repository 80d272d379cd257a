//! Inverted keyword index mapping object labels to image paths.

use std::path::{Path, PathBuf};

use ahash::{AHashMap, AHashSet};

use super::{read_index_object, IndexError, LabelVocabulary};

/// Mapping from object label to the images known to contain that object.
///
/// Loaded once from its persisted JSON form and held immutable for the
/// process lifetime; the order of paths under a label is insertion order
/// from index construction and carries no ranking meaning.
pub struct KeywordIndex {
    entries: AHashMap<String, Vec<PathBuf>>,
}

impl KeywordIndex {
    /// Load a keyword index from a JSON object file mapping label strings
    /// to arrays of image path strings. The file shape is validated here;
    /// a malformed entry fails the load rather than a later query.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let raw_entries = read_index_object(path)?;

        let mut entries: AHashMap<String, Vec<PathBuf>> =
            AHashMap::with_capacity(raw_entries.len());
        for (label, paths) in raw_entries {
            let normalized = label.trim().to_lowercase();
            let images = entries.entry(normalized.clone()).or_default();
            if !images.is_empty() {
                tracing::warn!(
                    "Keyword index {} has colliding label {:?}; merging entries",
                    path.display(),
                    normalized
                );
            }
            images.extend(paths.into_iter().map(PathBuf::from));
        }

        tracing::debug!(
            "Loaded keyword index from {} ({} labels)",
            path.display(),
            entries.len()
        );

        Ok(Self { entries })
    }

    /// Build an index from in-memory entries.
    pub fn from_entries<L, P>(entries: impl IntoIterator<Item = (L, Vec<P>)>) -> Self
    where
        L: AsRef<str>,
        P: Into<PathBuf>,
    {
        let mut map: AHashMap<String, Vec<PathBuf>> = AHashMap::new();
        for (label, paths) in entries {
            map.entry(label.as_ref().trim().to_lowercase())
                .or_default()
                .extend(paths.into_iter().map(Into::into));
        }
        Self { entries: map }
    }

    /// Images containing `label`; empty for an unknown label.
    pub fn lookup(&self, label: &str) -> &[PathBuf] {
        self.entries
            .get(&label.trim().to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Deduplicated union of `lookup` over the given label sequence.
    /// Order is first-seen across the iteration of `labels`.
    pub fn lookup_any<'a, I>(&self, labels: I) -> Vec<PathBuf>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen: AHashSet<&Path> = AHashSet::new();
        let mut union = Vec::new();

        for label in labels {
            for image in self.lookup(label) {
                if seen.insert(image.as_path()) {
                    union.push(image.clone());
                }
            }
        }

        union
    }

    /// Warn about index keys outside the detector vocabulary. Returns the
    /// number of unknown labels; the index stays usable either way.
    pub fn validate_against(&self, vocabulary: &LabelVocabulary) -> usize {
        let mut unknown = 0;
        for label in self.entries.keys() {
            if !vocabulary.contains(label) {
                tracing::warn!("Keyword index label {:?} is not in the vocabulary", label);
                unknown += 1;
            }
        }
        unknown
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of labels present in the index file.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_index() -> KeywordIndex {
        KeywordIndex::from_entries([
            ("dog", vec!["img/a.jpg", "img/b.jpg"]),
            ("cat", vec!["img/b.jpg", "img/c.jpg"]),
            ("person", vec![]),
        ])
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.json");
        std::fs::write(
            &path,
            r#"{"dog": ["img/001.jpg", "img/045.jpg"], "person": []}"#,
        )
        .unwrap();

        let index = KeywordIndex::load(&path).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.lookup("dog"),
            &[PathBuf::from("img/001.jpg"), PathBuf::from("img/045.jpg")]
        );
        assert!(index.lookup("person").is_empty());
    }

    #[test]
    fn test_unknown_label_is_empty() {
        let index = sample_index();
        assert!(index.lookup("bird").is_empty());
    }

    #[test]
    fn test_lookup_is_case_normalized() {
        let index = sample_index();
        assert_eq!(index.lookup("Dog").len(), 2);
    }

    #[test]
    fn test_lookup_any_union_dedup() {
        let index = sample_index();

        let union = index.lookup_any(["dog", "cat"]);
        assert_eq!(
            union,
            vec![
                PathBuf::from("img/a.jpg"),
                PathBuf::from("img/b.jpg"),
                PathBuf::from("img/c.jpg"),
            ]
        );
    }

    #[test]
    fn test_lookup_any_order_follows_label_sequence() {
        let index = sample_index();

        let union = index.lookup_any(["cat", "dog"]);
        assert_eq!(
            union,
            vec![
                PathBuf::from("img/b.jpg"),
                PathBuf::from("img/c.jpg"),
                PathBuf::from("img/a.jpg"),
            ]
        );
    }

    #[test]
    fn test_validate_against_vocabulary() {
        let index = sample_index();
        let vocab = LabelVocabulary::from_labels(["dog", "person"]);

        assert_eq!(index.validate_against(&vocab), 1);
    }
}
