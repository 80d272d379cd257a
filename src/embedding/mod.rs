//! Caption embeddings: the text-encoder seam and the precomputed
//! caption-vector store consumed at ranking time.

mod provider;
mod store;

pub use provider::{EmbeddingError, FastEmbedEncoder, TextEncoder};
pub use store::{EmbeddingIndex, StoreError};
