//! Query-time retrieval pipeline.
//!
//! Combines the keyword index (object-label filtering), the embedding
//! index (caption vectors) and the sentence encoder into ranked text and
//! reverse-image queries.

mod planner;

pub use planner::{QueryPlanner, RetrievalError};

/// Default number of results returned to the caller.
pub const DEFAULT_TOP_K: usize = 5;

/// Default detector confidence threshold for reverse-image queries.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
