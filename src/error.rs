use std::path::PathBuf;
use thiserror::Error;

use crate::detect::DetectError;
use crate::embedding::{EmbeddingError, StoreError};
use crate::index::IndexError;
use crate::resolve::ResolveError;
use crate::retrieval::RetrievalError;

/// Main error type for the Imago application
#[derive(Error, Debug)]
pub enum ImagoError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Index loading/validation errors
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Embedding store errors
    #[error("Embedding store error: {0}")]
    Store(#[from] StoreError),

    /// Embedding model errors
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Label resolution errors
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Object detection errors
    #[error("Detection error: {0}")]
    Detect(#[from] DetectError),

    /// Query-time retrieval errors
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for Imago operations
pub type Result<T> = std::result::Result<T, ImagoError>;
