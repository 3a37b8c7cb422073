// Multi-label classification report.
//
// Per-class precision, recall, F1 and support from thresholded predictions,
// plus the four usual averages:
//   micro:    counts pooled across classes
//   macro:    unweighted mean of per-class scores
//   weighted: per-class scores weighted by support
//   samples:  scores computed per example, then averaged
// Any 0/0 ratio is reported as 0.0.

use serde::{Deserialize, Serialize};

use super::confusion::{multilabel_confusion, BinaryConfusion};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

impl ClassMetrics {
    fn from_counts(tp: usize, fp: usize, fn_: usize) -> Self {
        Self {
            precision: ratio(tp, tp + fp),
            recall: ratio(tp, tp + fn_),
            f1_score: ratio(2 * tp, 2 * tp + fp + fn_),
            support: tp + fn_,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMetrics {
    pub label: String,
    #[serde(flatten)]
    pub metrics: ClassMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub per_class: Vec<LabelMetrics>,
    pub micro_avg: ClassMetrics,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub samples_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Build a report for `predicted` against `truth`, both aligned to
    /// `class_names`.
    pub fn from_predictions(class_names: &[String], truth: &[Vec<bool>], predicted: &[Vec<bool>]) -> Self {
        let confusions = multilabel_confusion(truth, predicted, class_names.len());
        Self::from_parts(class_names, &confusions, truth, predicted)
    }

    fn from_parts(
        class_names: &[String],
        confusions: &[BinaryConfusion],
        truth: &[Vec<bool>],
        predicted: &[Vec<bool>],
    ) -> Self {
        let per_class: Vec<LabelMetrics> = class_names
            .iter()
            .zip(confusions)
            .map(|(label, cm)| LabelMetrics {
                label: label.clone(),
                metrics: ClassMetrics::from_counts(cm.tp, cm.fp, cm.fn_),
            })
            .collect();

        let total_support: usize = per_class.iter().map(|m| m.metrics.support).sum();

        let (tp, fp, fn_) = confusions
            .iter()
            .fold((0, 0, 0), |(tp, fp, fn_), cm| (tp + cm.tp, fp + cm.fp, fn_ + cm.fn_));
        let micro_avg = ClassMetrics::from_counts(tp, fp, fn_);

        let n = per_class.len() as f64;
        let mean = |f: fn(&ClassMetrics) -> f64| {
            if per_class.is_empty() {
                0.0
            } else {
                per_class.iter().map(|m| f(&m.metrics)).sum::<f64>() / n
            }
        };
        let macro_avg = ClassMetrics {
            precision: mean(|m| m.precision),
            recall: mean(|m| m.recall),
            f1_score: mean(|m| m.f1_score),
            support: total_support,
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| {
            if total_support == 0 {
                0.0
            } else {
                per_class
                    .iter()
                    .map(|m| f(&m.metrics) * m.metrics.support as f64)
                    .sum::<f64>()
                    / total_support as f64
            }
        };
        let weighted_avg = ClassMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1_score: weighted(|m| m.f1_score),
            support: total_support,
        };

        let samples_avg = samples_average(truth, predicted, total_support);

        Self {
            per_class,
            micro_avg,
            macro_avg,
            weighted_avg,
            samples_avg,
        }
    }

    /// Metrics for a single label.
    pub fn get(&self, label: &str) -> Option<&ClassMetrics> {
        self.per_class
            .iter()
            .find(|m| m.label == label)
            .map(|m| &m.metrics)
    }
}

fn samples_average(truth: &[Vec<bool>], predicted: &[Vec<bool>], total_support: usize) -> ClassMetrics {
    if truth.is_empty() {
        return ClassMetrics {
            support: total_support,
            ..ClassMetrics::default()
        };
    }

    let (mut precision, mut recall, mut f1) = (0.0, 0.0, 0.0);
    for (t, p) in truth.iter().zip(predicted) {
        let n_true = t.iter().filter(|&&v| v).count();
        let n_pred = p.iter().filter(|&&v| v).count();
        let overlap = t.iter().zip(p).filter(|(a, b)| **a && **b).count();
        precision += ratio(overlap, n_pred);
        recall += ratio(overlap, n_true);
        f1 += ratio(2 * overlap, n_true + n_pred);
    }

    let n = truth.len() as f64;
    ClassMetrics {
        precision: precision / n,
        recall: recall / n,
        f1_score: f1 / n,
        support: total_support,
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}
