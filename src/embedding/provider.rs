/// Text encoder trait and FastEmbed implementation
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    Initialization(String),

    #[error("Embedding generation failed: {0}")]
    Generation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for sentence encoders.
///
/// The query pipeline only ever needs text embeddings; abstracting the
/// backend lets tests substitute a deterministic fake and keeps the model
/// choice a configuration concern.
pub trait TextEncoder: Send + Sync {
    /// Generate an embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Generate embeddings for multiple texts (batched for efficiency)
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// FastEmbed-backed encoder for local embedding generation.
///
/// The default model is the CLIP ViT-B/32 text tower (512 dimensions),
/// matching the width of the caption vectors in the embedding index.
/// Models are downloaded on demand to `~/.cache/huggingface/` on first
/// use.
pub struct FastEmbedEncoder {
    model: TextEmbedding,
    model_name: String,
    dimension: usize,
}

impl FastEmbedEncoder {
    /// Create a new encoder with the specified model.
    ///
    /// Supported models:
    /// - clip-vit-b-32: 512 dims - matches the 512-d caption index
    /// - all-MiniLM-L6-v2: 384 dims - smaller download, text-only corpora
    /// - bge-small-en-v1.5: 384 dims - better accuracy at the same width
    pub fn new(model_name: &str) -> Result<Self, EmbeddingError> {
        let embedding_model = match model_name {
            "clip-vit-b-32" | "clip-ViT-B-32" => EmbeddingModel::ClipVitB32,
            "all-MiniLM-L6-v2" | "all-minilm-l6-v2" => EmbeddingModel::AllMiniLML6V2,
            "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            _ => {
                return Err(EmbeddingError::Initialization(format!(
                    "Unsupported model: {}. Supported: clip-vit-b-32, all-MiniLM-L6-v2, bge-small-en-v1.5",
                    model_name
                )));
            }
        };

        let dimension = match embedding_model {
            EmbeddingModel::ClipVitB32 => 512,
            EmbeddingModel::AllMiniLML6V2 => 384,
            EmbeddingModel::BGESmallENV15 => 384,
            _ => 512,
        };

        tracing::info!(
            "Initializing embedding model: {} ({}D, downloaded if not cached)",
            model_name,
            dimension
        );

        let init_options = InitOptions::new(embedding_model).with_show_download_progress(true);

        let model = TextEmbedding::try_new(init_options)
            .map_err(|e| EmbeddingError::Initialization(e.to_string()))?;

        Ok(Self {
            model,
            model_name: model_name.to_string(),
            dimension,
        })
    }

    /// Create an encoder with the default model (clip-vit-b-32).
    pub fn with_default_model() -> Result<Self, EmbeddingError> {
        Self::new("clip-vit-b-32")
    }
}

impl TextEncoder for FastEmbedEncoder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let embeddings = self
            .model
            .embed(vec![text.to_string()], None)
            .map_err(|e| EmbeddingError::Generation(e.to_string()))?;

        let embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Generation("No embeddings generated".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if texts.iter().any(|t| t.is_empty()) {
            return Err(EmbeddingError::InvalidInput(
                "Batch contains empty text".to_string(),
            ));
        }

        let embeddings = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Generation(e.to_string()))?;

        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
