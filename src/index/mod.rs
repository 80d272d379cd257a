//! Persisted flat-file indexes consumed at query time.
//!
//! Both index files are JSON objects whose values are arrays of path
//! strings; they are built by out-of-scope batch tooling, loaded once at
//! process start and never mutated afterwards.

mod keyword;
mod vocabulary;

pub use keyword::KeywordIndex;
pub use vocabulary::LabelVocabulary;

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Index file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Malformed index file {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

/// Reads a JSON index file into its generic object-of-path-arrays shape,
/// validating the structure eagerly so malformed entries are rejected at
/// load time rather than mid-query.
pub(crate) fn read_index_object(
    path: &Path,
) -> Result<Vec<(String, Vec<String>)>, IndexError> {
    if !path.exists() {
        return Err(IndexError::NotFound(path.to_path_buf()));
    }

    let raw = std::fs::read_to_string(path).map_err(|e| IndexError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let value: Value = serde_json::from_str(&raw).map_err(|e| IndexError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;

    let object = value.as_object().ok_or_else(|| IndexError::Malformed {
        path: path.to_path_buf(),
        message: "root must be a JSON object".to_string(),
    })?;

    let mut entries = Vec::with_capacity(object.len());
    for (key, value) in object {
        let array = value.as_array().ok_or_else(|| IndexError::Malformed {
            path: path.to_path_buf(),
            message: format!("value for key {:?} must be an array", key),
        })?;

        let mut paths = Vec::with_capacity(array.len());
        for item in array {
            let s = item.as_str().ok_or_else(|| IndexError::Malformed {
                path: path.to_path_buf(),
                message: format!("entry under key {:?} must be a string", key),
            })?;
            paths.push(s.to_string());
        }
        entries.push((key.clone(), paths));
    }

    Ok(entries)
}

/// Rewrites every path in an index file so that entries rooted under
/// `from` are re-rooted under `to`. Paths outside `from` are left alone.
///
/// Index files built on one machine carry that machine's paths; this is
/// the repair step that makes them usable after the corpus directory
/// moves. Returns the number of rewritten paths.
pub fn fix_paths(path: &Path, from: &Path, to: &Path) -> Result<usize, IndexError> {
    let entries = read_index_object(path)?;

    let mut rewritten = 0usize;
    let mut fixed = serde_json::Map::new();
    for (key, paths) in entries {
        let new_paths: Vec<Value> = paths
            .into_iter()
            .map(|p| {
                let original = PathBuf::from(&p);
                match original.strip_prefix(from) {
                    Ok(suffix) => {
                        rewritten += 1;
                        Value::String(to.join(suffix).to_string_lossy().into_owned())
                    }
                    Err(_) => Value::String(p),
                }
            })
            .collect();
        fixed.insert(key, Value::Array(new_paths));
    }

    let serialized = serde_json::to_string_pretty(&Value::Object(fixed)).map_err(|e| {
        IndexError::Json {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    std::fs::write(path, serialized).map_err(|e| IndexError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(rewritten)
}
