// Predictor — loads the persisted artifacts once and labels new articles.
//
// Construction either reaches Ready (classifier, label space and embedder all
// loaded and consistent with each other) or stays NotReady for the lifetime of
// the instance; there is no retry. The predictor is an ordinary value owned by
// whoever serves requests, and is read-only after construction, so it can be
// shared by reference across concurrent readers. A retrain does not affect a
// live predictor until a new one is constructed.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::artifacts::ArtifactStore;
use crate::classifier::{ClassifierError, TrainedModel};
use crate::config::Config;
use crate::corpus::article_text;
use crate::embedding::traits::TextEmbedder;
use crate::labels::LabelSpace;

/// Probability band flagged for human review, exclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceBand {
    pub fn contains(&self, p: f64) -> bool {
        p > self.lower && p < self.upper
    }
}

impl Default for ConfidenceBand {
    fn default() -> Self {
        Self {
            lower: 0.3,
            upper: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictorSettings {
    /// A label is returned when its probability is strictly above this.
    pub threshold: f64,
    pub low_confidence: ConfidenceBand,
}

impl Default for PredictorSettings {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            low_confidence: ConfidenceBand::default(),
        }
    }
}

impl From<&Config> for PredictorSettings {
    fn from(config: &Config) -> Self {
        Self {
            threshold: config.prediction_threshold,
            ..Self::default()
        }
    }
}

/// Labels selected for one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub labels: Vec<String>,
    /// Probability of each returned label, aligned with `labels`.
    pub confidences: Vec<f64>,
    /// Some class probability fell inside the low-confidence band.
    pub is_low_confidence: bool,
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Predictor not initialized: {reason}")]
    NotReady { reason: String },

    #[error("failed to embed article")]
    Embedding(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// Select labels from a probability vector aligned with `label_space`.
///
/// Labels come out in label-space order. An empty selection is a valid
/// result, not an error.
pub fn select_labels(
    probabilities: &[f64],
    label_space: &LabelSpace,
    settings: &PredictorSettings,
) -> PredictionResult {
    let is_low_confidence = probabilities
        .iter()
        .any(|&p| settings.low_confidence.contains(p));

    let (labels, confidences) = label_space
        .classes()
        .iter()
        .zip(probabilities)
        .filter(|(_, &p)| p > settings.threshold)
        .map(|(label, &p)| (label.clone(), p))
        .unzip();

    PredictionResult {
        labels,
        confidences,
        is_low_confidence,
    }
}

struct ReadyState {
    model: TrainedModel,
    label_space: LabelSpace,
    embedder: Box<dyn TextEmbedder>,
}

enum State {
    NotReady { reason: String },
    Ready(ReadyState),
}

pub struct Predictor {
    state: State,
    settings: PredictorSettings,
}

impl Predictor {
    /// Load the classifier and label space from `store`, then the embedder.
    ///
    /// The embedder is only loaded once both artifacts are present. Never
    /// fails: any problem leaves the predictor NotReady with the reason kept
    /// for `not_ready_reason`.
    pub fn load<F>(store: &ArtifactStore, settings: PredictorSettings, load_embedder: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<Box<dyn TextEmbedder>>,
    {
        let state = match Self::try_load(store, load_embedder) {
            Ok(ready) => {
                info!(
                    classes = ready.label_space.len(),
                    embedder = %ready.model.embedder,
                    "Predictor initialized"
                );
                State::Ready(ready)
            }
            Err(reason) => {
                warn!(%reason, "Predictor not initialized");
                State::NotReady { reason }
            }
        };
        Self { state, settings }
    }

    fn try_load<F>(store: &ArtifactStore, load_embedder: F) -> Result<ReadyState, String>
    where
        F: FnOnce() -> anyhow::Result<Box<dyn TextEmbedder>>,
    {
        let model = store.load_classifier().map_err(|e| e.to_string())?.value;
        let label_space = store.load_label_space().map_err(|e| e.to_string())?.value;

        if model.classifier.num_classes() != label_space.len() {
            return Err(format!(
                "classifier has {} classes but the label space has {}; retrain to regenerate both",
                model.classifier.num_classes(),
                label_space.len()
            ));
        }
        if model.class_names.as_slice() != label_space.classes() {
            return Err(format!(
                "classifier was fitted on labels [{}] but the label space holds [{}]; \
                 the artifacts come from different training runs, retrain to regenerate both",
                model.class_names.join(", "),
                label_space.classes().join(", ")
            ));
        }

        let embedder = load_embedder().map_err(|e| format!("embedding model unavailable: {e:#}"))?;
        let identity = embedder.identity();
        if identity != model.embedder {
            return Err(format!(
                "classifier was trained on {} but the loaded embedder is {}",
                model.embedder, identity
            ));
        }

        Ok(ReadyState {
            model,
            label_space,
            embedder,
        })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    pub fn not_ready_reason(&self) -> Option<&str> {
        match &self.state {
            State::NotReady { reason } => Some(reason),
            State::Ready(_) => None,
        }
    }

    pub fn settings(&self) -> &PredictorSettings {
        &self.settings
    }

    pub fn label_space(&self) -> Option<&LabelSpace> {
        match &self.state {
            State::Ready(ready) => Some(&ready.label_space),
            State::NotReady { .. } => None,
        }
    }

    /// Full per-class probability vector for an article.
    pub fn probabilities(&self, title: &str, abstract_text: &str) -> Result<Vec<f64>, PredictError> {
        let ready = match &self.state {
            State::Ready(ready) => ready,
            State::NotReady { reason } => {
                return Err(PredictError::NotReady {
                    reason: reason.clone(),
                })
            }
        };

        let text = article_text(title, abstract_text);
        let embedding = ready
            .embedder
            .embed(&[text])
            .map_err(|e| PredictError::Embedding(e.into()))?;
        let mut rows = ready.model.classifier.predict_proba(&embedding)?;
        rows.pop()
            .ok_or_else(|| PredictError::Embedding("embedder returned no vector".into()))
    }

    /// Label an article. Returns `PredictError::NotReady` rather than a
    /// fabricated result when the artifacts could not be loaded.
    pub fn predict(&self, title: &str, abstract_text: &str) -> Result<PredictionResult, PredictError> {
        let probabilities = self.probabilities(title, abstract_text)?;
        let label_space = self.label_space().ok_or_else(|| PredictError::NotReady {
            reason: "label space unavailable".to_string(),
        })?;
        Ok(select_labels(&probabilities, label_space, &self.settings))
    }
}
