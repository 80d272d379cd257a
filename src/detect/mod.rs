//! Object detection seam.
//!
//! The detection network itself lives outside this crate; queries only
//! need the set of labels present in an image above a confidence
//! threshold. `PrecomputedDetector` replays detections recorded by the
//! index-construction tooling so the reverse-image path works without the
//! network loaded.

use std::path::{Path, PathBuf};

use ahash::AHashSet;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Detector unavailable: {0}")]
    Unavailable(String),

    #[error("Unsupported image type: {0}")]
    UnsupportedImage(PathBuf),
}

/// Trait for object detection backends.
pub trait ObjectDetector: Send + Sync {
    /// Labels detected in `image` with confidence above
    /// `confidence_threshold`. May be empty.
    fn detect(
        &self,
        image: &Path,
        confidence_threshold: f32,
    ) -> Result<AHashSet<String>, DetectError>;
}

/// Image extensions accepted for reverse search uploads.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Whether `path` has an accepted image extension (case-insensitive).
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Detector replaying recorded detections from a JSON sidecar file.
///
/// The file maps image file names to objects of label → confidence:
/// `{"photo.jpg": {"dog": 0.93, "person": 0.71}}`. Lookups fall back from
/// the full path string to the bare file name, so the sidecar stays valid
/// when the corpus directory moves.
#[derive(Debug)]
pub struct PrecomputedDetector {
    detections: ahash::AHashMap<String, Vec<(String, f32)>>,
}

impl PrecomputedDetector {
    pub fn load(path: &Path) -> Result<Self, DetectError> {
        if !path.exists() {
            return Err(DetectError::Unavailable(format!(
                "detections file not found: {}",
                path.display()
            )));
        }

        let raw = std::fs::read_to_string(path).map_err(|e| DetectError::Unavailable(format!(
            "failed to read detections file {}: {}",
            path.display(),
            e
        )))?;

        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            DetectError::Unavailable(format!(
                "failed to parse detections file {}: {}",
                path.display(),
                e
            ))
        })?;

        let object = value.as_object().ok_or_else(|| {
            DetectError::Unavailable(format!(
                "detections file {} must be a JSON object",
                path.display()
            ))
        })?;

        let mut detections = ahash::AHashMap::with_capacity(object.len());
        for (image, labels) in object {
            let labels_object = labels.as_object().ok_or_else(|| {
                DetectError::Unavailable(format!(
                    "detections for {:?} must be an object of label -> confidence",
                    image
                ))
            })?;

            let mut entries = Vec::with_capacity(labels_object.len());
            for (label, confidence) in labels_object {
                let confidence = confidence.as_f64().ok_or_else(|| {
                    DetectError::Unavailable(format!(
                        "confidence for label {:?} of {:?} must be a number",
                        label, image
                    ))
                })?;
                entries.push((label.to_lowercase(), confidence as f32));
            }
            detections.insert(image.clone(), entries);
        }

        Ok(Self { detections })
    }

    /// Build a detector from in-memory detections.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<(S, f32)>)>,
        S: Into<String>,
    {
        let detections = entries
            .into_iter()
            .map(|(image, labels)| {
                (
                    image.into(),
                    labels
                        .into_iter()
                        .map(|(label, confidence)| {
                            let label: String = label.into();
                            (label.to_lowercase(), confidence)
                        })
                        .collect(),
                )
            })
            .collect();
        Self { detections }
    }

    fn entry_for(&self, image: &Path) -> Option<&[(String, f32)]> {
        if let Some(entry) = self.detections.get(&image.to_string_lossy().into_owned()) {
            return Some(entry);
        }
        image
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| self.detections.get(name))
            .map(Vec::as_slice)
    }
}

impl ObjectDetector for PrecomputedDetector {
    fn detect(
        &self,
        image: &Path,
        confidence_threshold: f32,
    ) -> Result<AHashSet<String>, DetectError> {
        let entry = match self.entry_for(image) {
            Some(entry) => entry,
            None => {
                tracing::debug!("No recorded detections for {}", image.display());
                return Ok(AHashSet::new());
            }
        };

        Ok(entry
            .iter()
            .filter(|(_, confidence)| *confidence > confidence_threshold)
            .map(|(label, _)| label.clone())
            .collect())
    }
}
