// Text embedder trait — the swap-ready abstraction.
//
// A stored embedding (and any classifier trained on embeddings) is only
// meaningful under the embedder that produced it, so every embedder reports
// an identity that gets recorded in the classifier artifact and checked again
// when the predictor loads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Dense vector produced for one input text.
pub type Embedding = Vec<f64>;

/// Which model produced a set of embeddings, and their width.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmbedderIdentity {
    pub model: String,
    pub dimension: usize,
}

impl std::fmt::Display for EmbedderIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}-dim)", self.model, self.dimension)
    }
}

/// Maps raw text to fixed-width vectors.
///
/// Implementations are frozen: `embed` is deterministic for a fixed model and
/// never adapts to the data it sees. Output order matches input order, one
/// vector per input, and the empty string is valid input.
pub trait TextEmbedder: Send + Sync {
    fn identity(&self) -> EmbedderIdentity;

    fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>>;
}
