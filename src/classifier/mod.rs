// Multi-label classifier — one independent binary model per label class.
//
// Every sub-model sees the same embeddings and its own column of the
// multi-hot target. Probabilities are independent per class and do not sum
// to one. A column that is constant in the training data yields a
// `BinaryModel::Constant` for that class (logged as a warning) instead of
// failing the whole fit.

pub mod sgd;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::embedding::traits::{EmbedderIdentity, Embedding};
use crate::labels::MultiHotLabelVector;

pub use sgd::{BinaryModel, SgdParams};

/// Cutoff used by `predict` for training-time reports. Serving applies its
/// own configurable threshold to `predict_proba`.
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("cannot fit a classifier on an empty training set")]
    EmptyTrainingSet,

    #[error("got {inputs} embeddings but {targets} label vectors")]
    LengthMismatch { inputs: usize, targets: usize },

    #[error("embedding {row} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("label vector {row} has {found} classes, expected {expected}")]
    ClassCountMismatch {
        row: usize,
        found: usize,
        expected: usize,
    },
}

/// N binary models keyed by label-space index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneVsRestClassifier {
    dimension: usize,
    params: SgdParams,
    models: Vec<BinaryModel>,
}

impl OneVsRestClassifier {
    /// Train one binary model per column of `y`.
    pub fn fit(
        x: &[Embedding],
        y: &[MultiHotLabelVector],
        params: &SgdParams,
    ) -> Result<Self, ClassifierError> {
        if x.is_empty() {
            return Err(ClassifierError::EmptyTrainingSet);
        }
        if x.len() != y.len() {
            return Err(ClassifierError::LengthMismatch {
                inputs: x.len(),
                targets: y.len(),
            });
        }

        let dimension = x[0].len();
        check_dimensions(x, dimension)?;

        let n_classes = y[0].len();
        for (row, labels) in y.iter().enumerate() {
            if labels.len() != n_classes {
                return Err(ClassifierError::ClassCountMismatch {
                    row,
                    found: labels.len(),
                    expected: n_classes,
                });
            }
        }

        let models = (0..n_classes)
            .map(|class| {
                let column: Vec<bool> = y.iter().map(|labels| labels[class]).collect();
                let model = sgd::fit_binary(x, &column, params);
                match &model {
                    BinaryModel::Constant { probability } => warn!(
                        class,
                        probability, "Label column is constant; using a constant predictor"
                    ),
                    BinaryModel::Linear { epochs, .. } => {
                        debug!(class, epochs, "Fitted binary model")
                    }
                }
                model
            })
            .collect();

        Ok(Self {
            dimension,
            params: params.clone(),
            models,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.models.len()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn models(&self) -> &[BinaryModel] {
        &self.models
    }

    pub fn params(&self) -> &SgdParams {
        &self.params
    }

    /// Per-class probabilities in [0, 1], one row per input.
    pub fn predict_proba(&self, x: &[Embedding]) -> Result<Vec<Vec<f64>>, ClassifierError> {
        check_dimensions(x, self.dimension)?;
        Ok(x
            .iter()
            .map(|row| self.models.iter().map(|m| m.probability(row)).collect())
            .collect())
    }

    /// `predict_proba` thresholded at `DEFAULT_DECISION_THRESHOLD`.
    pub fn predict(&self, x: &[Embedding]) -> Result<Vec<MultiHotLabelVector>, ClassifierError> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|probs| {
                probs
                    .into_iter()
                    .map(|p| p > DEFAULT_DECISION_THRESHOLD)
                    .collect()
            })
            .collect())
    }
}

fn check_dimensions(x: &[Embedding], expected: usize) -> Result<(), ClassifierError> {
    for (row, embedding) in x.iter().enumerate() {
        if embedding.len() != expected {
            return Err(ClassifierError::DimensionMismatch {
                row,
                found: embedding.len(),
                expected,
            });
        }
    }
    Ok(())
}

/// The persisted classifier: the fitted models plus the embedder they were
/// trained against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub embedder: EmbedderIdentity,
    /// Label ordering the model columns were fitted against. Must equal the
    /// persisted label space for the pair to be usable.
    pub class_names: Vec<String>,
    pub classifier: OneVsRestClassifier,
}
