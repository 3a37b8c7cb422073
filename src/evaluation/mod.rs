// Evaluation artifacts for a training run.
//
// Train and test reports are both kept so overfitting is visible; confusion
// matrices and curves are computed on the held-out split only. Problems local
// to one label (no positives in the test split) are recorded on that label
// and never abort the evaluation of the others.

pub mod confusion;
pub mod curves;
pub mod report;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::labels::MultiHotLabelVector;

pub use confusion::BinaryConfusion;
pub use curves::{DegenerateLabel, LabelCurves};
pub use report::{ClassMetrics, ClassificationReport};

/// Rows in each partition of the split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSizes {
    pub train: usize,
    pub test: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationArtifacts {
    pub train_report: ClassificationReport,
    pub test_report: ClassificationReport,
    /// One matrix per label, aligned with `class_names`.
    pub confusion_matrices: Vec<BinaryConfusion>,
    /// One entry per label, aligned with `class_names`.
    pub curves_data: Vec<LabelCurves>,
    pub class_names: Vec<String>,
    pub split: SplitSizes,
}

/// Predictions and truth for one partition.
pub struct SplitOutcome<'a> {
    pub truth: &'a [MultiHotLabelVector],
    pub predicted: &'a [MultiHotLabelVector],
}

impl EvaluationArtifacts {
    /// Build every evaluation artifact from the fitted classifier's outputs.
    ///
    /// `test_probabilities` holds one N-length probability row per test example.
    pub fn compute(
        class_names: &[String],
        train: SplitOutcome<'_>,
        test: SplitOutcome<'_>,
        test_probabilities: &[Vec<f64>],
    ) -> Self {
        let train_report = ClassificationReport::from_predictions(class_names, train.truth, train.predicted);
        let test_report = ClassificationReport::from_predictions(class_names, test.truth, test.predicted);
        let confusion_matrices = confusion::multilabel_confusion(test.truth, test.predicted, class_names.len());

        let curves_data = class_names
            .iter()
            .enumerate()
            .map(|(class, label)| {
                let truth: Vec<bool> = test.truth.iter().map(|row| row[class]).collect();
                let scores: Vec<f64> = test_probabilities.iter().map(|row| row[class]).collect();
                let curves = curves::label_curves(label, &truth, &scores);
                if let Some(reason) = curves.undefined {
                    warn!(label = %label, %reason, "Curves undefined for label");
                }
                curves
            })
            .collect();

        Self {
            train_report,
            test_report,
            confusion_matrices,
            curves_data,
            class_names: class_names.to_vec(),
            split: SplitSizes {
                train: train.truth.len(),
                test: test.truth.len(),
            },
        }
    }

    fn index_of(&self, label: &str) -> Option<usize> {
        self.class_names.iter().position(|c| c == label)
    }

    pub fn confusion_for(&self, label: &str) -> Option<&BinaryConfusion> {
        self.index_of(label).and_then(|i| self.confusion_matrices.get(i))
    }

    pub fn curves_for(&self, label: &str) -> Option<&LabelCurves> {
        self.index_of(label).and_then(|i| self.curves_data.get(i))
    }

    /// Train F1 minus test F1 per label; large positive gaps suggest overfitting.
    pub fn f1_gaps(&self) -> Vec<(String, f64)> {
        self.class_names
            .iter()
            .filter_map(|label| {
                let train = self.train_report.get(label)?;
                let test = self.test_report.get(label)?;
                Some((label.clone(), train.f1_score - test.f1_score))
            })
            .collect()
    }
}
