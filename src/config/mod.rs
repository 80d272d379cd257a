//! Configuration management for Imago
//!
//! Index file locations, model choice and query defaults live in one TOML
//! file; everything is validated up front so a bad value fails at startup
//! instead of mid-query.

use crate::error::{ImagoError, Result, ValidationError};
use crate::retrieval::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_TOP_K};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub resolver: ResolverConfig,
    pub detector: DetectorConfig,
    pub retrieval: RetrievalConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Locations of the persisted index files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Newline-delimited label vocabulary (detector names file)
    pub vocabulary: PathBuf,
    /// JSON keyword index: label -> image paths
    pub keyword_index: PathBuf,
    /// JSON embedding index: image id -> caption vector files
    pub embedding_index: PathBuf,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "clip-vit-b-32")
    pub model: String,
    /// Caption vector dimension; must match the encoder's output width
    pub dimension: usize,
    /// Batch size used when embedding the vocabulary
    pub batch_size: usize,
}

/// Label resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Similar labels returned when a token has no exact match
    pub expansion_limit: usize,
}

/// Object detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum confidence for a detection to count
    pub confidence_threshold: f32,
    /// JSON sidecar of recorded detections for the reverse-image path
    pub detections_file: PathBuf,
}

/// Query defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of results returned when the caller does not override it
    pub top_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            index: IndexConfig {
                vocabulary: PathBuf::from("assets/coco.names"),
                keyword_index: PathBuf::from("assets/index.json"),
                embedding_index: PathBuf::from("assets/embedding_index.json"),
            },
            embedding: EmbeddingConfig {
                model: "clip-vit-b-32".to_string(),
                dimension: 512,
                batch_size: 32,
            },
            resolver: ResolverConfig { expansion_limit: 3 },
            detector: DetectorConfig {
                confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
                detections_file: PathBuf::from("assets/detections.json"),
            },
            retrieval: RetrievalConfig { top_k: DEFAULT_TOP_K },
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ImagoError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ImagoError::Io {
            source: e,
            context: format!("Failed to read config file: {}", path.display()),
        })?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Load from an explicit path if given, from the default location if
    /// it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Self::default_path()?;
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    tracing::debug!("No config file found; using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ImagoError::Io {
                source: e,
                context: format!("Failed to create config directory: {}", parent.display()),
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ImagoError::Io {
            source: e,
            context: format!("Failed to write config file: {}", path.display()),
        })?;

        Ok(())
    }

    /// Default config file location (~/.config/imago/config.toml)
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ImagoError::Config("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("imago").join("config.toml"))
    }

    /// Validate every section, collecting all failures instead of
    /// stopping at the first.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "model name must not be empty",
            ));
        }
        if self.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "dimension must be greater than zero",
            ));
        }
        if self.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "batch size must be greater than zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            errors.push(ValidationError::new(
                "detector.confidence_threshold",
                "confidence threshold must be within [0.0, 1.0]",
            ));
        }
        if self.retrieval.top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "top_k must be greater than zero",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ImagoError::ConfigValidation { errors })
        }
    }
}
