// Per-label 2x2 confusion counts.

use serde::{Deserialize, Serialize};

/// Confusion counts for one label treated as a binary problem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryConfusion {
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tp: usize,
}

impl BinaryConfusion {
    pub fn from_column(truth: impl IntoIterator<Item = bool>, predicted: impl IntoIterator<Item = bool>) -> Self {
        let mut cm = Self::default();
        for (t, p) in truth.into_iter().zip(predicted) {
            match (t, p) {
                (true, true) => cm.tp += 1,
                (false, false) => cm.tn += 1,
                (false, true) => cm.fp += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        cm
    }

    /// `[[tn, fp], [fn, tp]]`: rows are the true class, columns the prediction.
    pub fn as_matrix(&self) -> [[usize; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }

    /// Number of truly positive examples.
    pub fn support(&self) -> usize {
        self.tp + self.fn_
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }
}

/// One confusion matrix per label, in label-space order.
pub fn multilabel_confusion(truth: &[Vec<bool>], predicted: &[Vec<bool>], n_classes: usize) -> Vec<BinaryConfusion> {
    (0..n_classes)
        .map(|class| {
            BinaryConfusion::from_column(
                truth.iter().map(|row| row[class]),
                predicted.iter().map(|row| row[class]),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_each_cell() {
        let cm = BinaryConfusion::from_column(
            [true, true, false, false, true],
            [true, false, true, false, true],
        );
        assert_eq!(cm.as_matrix(), [[1, 1], [1, 2]]);
        assert_eq!(cm.support(), 3);
        assert_eq!(cm.total(), 5);
    }

    #[test]
    fn test_multilabel_one_matrix_per_class() {
        let truth = vec![vec![true, false], vec![false, true]];
        let predicted = vec![vec![true, true], vec![false, false]];
        let cms = multilabel_confusion(&truth, &predicted, 2);
        assert_eq!(cms[0].as_matrix(), [[1, 0], [0, 1]]);
        assert_eq!(cms[1].as_matrix(), [[0, 1], [1, 0]]);
    }

    #[test]
    fn test_serializes_fn_field() {
        let json = serde_json::to_string(&BinaryConfusion::default()).unwrap();
        assert_eq!(json, r#"{"tn":0,"fp":0,"fn":0,"tp":0}"#);
    }
}
