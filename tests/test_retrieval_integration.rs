//! Integration test: full query pipeline over on-disk indexes
//!
//! Exercises text and reverse-image queries end to end with a
//! deterministic fake encoder substituted at the trait seam.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::Array1;
use ndarray_npy::write_npy;
use tempfile::TempDir;

use imago::detect::PrecomputedDetector;
use imago::embedding::{EmbeddingError, EmbeddingIndex, TextEncoder};
use imago::index::{KeywordIndex, LabelVocabulary};
use imago::linguistic::HeuristicExtractor;
use imago::resolve::{EncoderSimilarity, LabelResolver};
use imago::retrieval::QueryPlanner;

const DIMENSION: usize = 3;

/// Deterministic encoder for tests: known strings map to fixed vectors,
/// unknown strings embed to zero (maximum cosine distance everywhere).
struct TableEncoder {
    table: ahash::AHashMap<String, Vec<f32>>,
}

impl TableEncoder {
    fn new(entries: &[(&str, [f32; DIMENSION])]) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_vec()))
                .collect(),
        }
    }
}

impl TextEncoder for TableEncoder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self
            .table
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0; DIMENSION]))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "table"
    }
}

struct Fixture {
    _temp: TempDir,
    planner: QueryPlanner,
}

fn write_vector(dir: &Path, name: &str, values: [f32; DIMENSION]) -> PathBuf {
    let path = dir.join(name);
    write_npy(&path, &Array1::from_vec(values.to_vec())).unwrap();
    path
}

fn json_index(entries: &[(&str, Vec<String>)]) -> String {
    let mut object = serde_json::Map::new();
    for (key, values) in entries {
        object.insert(
            key.to_string(),
            serde_json::Value::Array(
                values
                    .iter()
                    .map(|v| serde_json::Value::String(v.clone()))
                    .collect(),
            ),
        );
    }
    serde_json::to_string_pretty(&serde_json::Value::Object(object)).unwrap()
}

/// Corpus: a.jpg (dog), b.jpg (dog+cat), c.jpg (cat), d.jpg (person).
/// Caption vectors line up with the encoder table so "dog"-flavored
/// prompts land nearest a, then b.
fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    let vocabulary_path = root.join("coco.names");
    std::fs::write(&vocabulary_path, "person\ndog\ncat\nbicycle\n").unwrap();

    let vec_a = write_vector(root, "a_1.npy", [1.0, 0.0, 0.0]);
    let vec_b1 = write_vector(root, "b_1.npy", [0.6, 0.4, 0.0]);
    let vec_b2 = write_vector(root, "b_2.npy", [0.4, 0.6, 0.0]);
    let vec_c = write_vector(root, "c_1.npy", [0.0, 1.0, 0.0]);
    let vec_d = write_vector(root, "d_1.npy", [0.0, 0.0, 1.0]);

    let keyword_path = root.join("index.json");
    std::fs::write(
        &keyword_path,
        json_index(&[
            (
                "dog",
                vec!["img/a.jpg".to_string(), "img/b.jpg".to_string()],
            ),
            (
                "cat",
                vec!["img/b.jpg".to_string(), "img/c.jpg".to_string()],
            ),
            ("person", vec!["img/d.jpg".to_string()]),
            ("bicycle", vec![]),
        ]),
    )
    .unwrap();

    let embedding_path = root.join("embedding_index.json");
    std::fs::write(
        &embedding_path,
        json_index(&[
            ("a", vec![vec_a.to_string_lossy().into_owned()]),
            (
                "b",
                vec![
                    vec_b1.to_string_lossy().into_owned(),
                    vec_b2.to_string_lossy().into_owned(),
                ],
            ),
            ("c", vec![vec_c.to_string_lossy().into_owned()]),
            ("d", vec![vec_d.to_string_lossy().into_owned()]),
        ]),
    )
    .unwrap();

    let detections_path = root.join("detections.json");
    std::fs::write(
        &detections_path,
        r#"{"upload.jpg": {"dog": 0.93, "person": 0.71, "cat": 0.2}}"#,
    )
    .unwrap();

    let encoder: Arc<dyn TextEncoder> = Arc::new(TableEncoder::new(&[
        ("person", [0.0, 0.0, 1.0]),
        ("dog", [1.0, 0.0, 0.0]),
        ("cat", [0.0, 1.0, 0.0]),
        ("bicycle", [0.5, 0.5, 0.0]),
        ("puppy", [0.9, 0.1, 0.0]),
        ("a dog", [1.0, 0.1, 0.0]),
        ("a cat sleeping", [0.1, 1.0, 0.0]),
    ]));

    let vocabulary = Arc::new(LabelVocabulary::load(&vocabulary_path).unwrap());
    let similarity = Arc::new(EncoderSimilarity::new(encoder.clone(), &vocabulary).unwrap());
    let resolver = LabelResolver::new(vocabulary, similarity, 3);

    let keyword_index = KeywordIndex::load(&keyword_path).unwrap();
    let embedding_index = EmbeddingIndex::load(&embedding_path, DIMENSION).unwrap();
    let detector = Arc::new(PrecomputedDetector::load(&detections_path).unwrap());

    let planner = QueryPlanner::new(
        encoder,
        Arc::new(HeuristicExtractor::new()),
        detector,
        resolver,
        keyword_index,
        embedding_index,
    )
    .unwrap();

    Fixture {
        _temp: temp,
        planner,
    }
}

fn as_paths(values: &[&str]) -> Vec<PathBuf> {
    values.iter().map(PathBuf::from).collect()
}

#[test]
fn text_query_filters_then_ranks() {
    let fixture = fixture();

    let results = fixture.planner.query_by_text("a dog", 5).unwrap();
    // "dog" filters to {a, b}; a's caption vector is closest.
    assert_eq!(results, as_paths(&["img/a.jpg", "img/b.jpg"]));
}

#[test]
fn text_query_is_deterministic() {
    let fixture = fixture();

    let first = fixture.planner.query_by_text("a cat sleeping", 5).unwrap();
    let second = fixture.planner.query_by_text("a cat sleeping", 5).unwrap();
    assert_eq!(first, second);
}

#[test]
fn text_query_has_no_duplicates() {
    let fixture = fixture();

    // "dog" and "cat" both match b.jpg.
    let results = fixture.planner.query_by_text("a dog in the park", 5).unwrap();
    let mut unique: Vec<&PathBuf> = results.iter().collect();
    unique.dedup();
    assert_eq!(unique.len(), results.len());
}

#[test]
fn text_query_respects_top_k() {
    let fixture = fixture();

    let results = fixture.planner.query_by_text("a dog in the park", 1).unwrap();
    assert_eq!(results.len(), 1);

    let results = fixture.planner.query_by_text("a dog in the park", 0).unwrap();
    assert!(results.is_empty());
}

#[test]
fn text_query_expands_unknown_token() {
    let fixture = fixture();

    // "puppy" is not in the vocabulary; similarity expansion reaches the
    // dog bucket (and through it, images a and b).
    let results = fixture.planner.query_by_text("puppy", 5).unwrap();
    assert!(results.contains(&PathBuf::from("img/a.jpg")));
    assert!(results.contains(&PathBuf::from("img/b.jpg")));
}

#[test]
fn text_query_degrades_to_rank_only() {
    let fixture = fixture();

    // Every token is a stop word, so no labels resolve and the whole
    // embedded corpus is ranked. The corpus is non-empty, so the result
    // must be too.
    let results = fixture.planner.query_by_text("the of an", 10).unwrap();
    assert!(!results.is_empty());
    assert!(results.len() <= 10);
}

#[test]
fn missing_vector_file_does_not_abort_query() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    let vocabulary_path = root.join("coco.names");
    std::fs::write(&vocabulary_path, "dog\n").unwrap();

    let vec_a = write_vector(root, "a_1.npy", [1.0, 0.0, 0.0]);

    let keyword_path = root.join("index.json");
    std::fs::write(
        &keyword_path,
        json_index(&[(
            "dog",
            vec!["img/a.jpg".to_string(), "img/b.jpg".to_string()],
        )]),
    )
    .unwrap();

    // b's only vector file does not exist on disk.
    let embedding_path = root.join("embedding_index.json");
    std::fs::write(
        &embedding_path,
        json_index(&[
            ("a", vec![vec_a.to_string_lossy().into_owned()]),
            (
                "b",
                vec![root.join("gone.npy").to_string_lossy().into_owned()],
            ),
        ]),
    )
    .unwrap();

    let encoder: Arc<dyn TextEncoder> =
        Arc::new(TableEncoder::new(&[("dog", [1.0, 0.0, 0.0])]));
    let vocabulary = Arc::new(LabelVocabulary::load(&vocabulary_path).unwrap());
    let similarity = Arc::new(EncoderSimilarity::new(encoder.clone(), &vocabulary).unwrap());
    let resolver = LabelResolver::new(vocabulary, similarity, 3);

    let planner = QueryPlanner::new(
        encoder,
        Arc::new(HeuristicExtractor::new()),
        Arc::new(PrecomputedDetector::from_entries(Vec::<(
            String,
            Vec<(String, f32)>,
        )>::new())),
        resolver,
        KeywordIndex::load(&keyword_path).unwrap(),
        EmbeddingIndex::load(&embedding_path, DIMENSION).unwrap(),
    )
    .unwrap();

    let results = planner.query_by_text("dog", 5).unwrap();
    assert_eq!(results, as_paths(&["img/a.jpg"]));
}

#[test]
fn reverse_query_returns_union_without_ranking() {
    let fixture = fixture();

    // Recorded detections above the threshold: dog and person. Person
    // precedes dog in the vocabulary, so its bucket leads the union.
    let results = fixture
        .planner
        .query_by_image_objects(Path::new("upload.jpg"), 0.5, 5)
        .unwrap();
    assert_eq!(
        results,
        as_paths(&["img/d.jpg", "img/a.jpg", "img/b.jpg"])
    );
}

#[test]
fn reverse_query_respects_top_k() {
    let fixture = fixture();

    let results = fixture
        .planner
        .query_by_image_objects(Path::new("upload.jpg"), 0.5, 2)
        .unwrap();
    assert_eq!(results, as_paths(&["img/d.jpg", "img/a.jpg"]));
}

#[test]
fn reverse_query_with_no_detections_is_empty() {
    let fixture = fixture();

    // Unknown image: the replay detector reports nothing.
    let results = fixture
        .planner
        .query_by_image_objects(Path::new("other.jpg"), 0.5, 5)
        .unwrap();
    assert!(results.is_empty());

    // Known image, but the threshold filters every detection out.
    let results = fixture
        .planner
        .query_by_image_objects(Path::new("upload.jpg"), 0.99, 5)
        .unwrap();
    assert!(results.is_empty());
}
