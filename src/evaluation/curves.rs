// Precision-recall and ROC curves, computed independently per label.
//
// Both curves come from the same sweep: sort scores descending and, at every
// distinct score, count the true and false positives ranked at or above it.
// A label whose test split has no positives (or, for ROC, no negatives) has
// no meaningful curve; its fields are left as `None` with the reason
// recorded, and the other labels are unaffected.

use serde::{Deserialize, Serialize};

/// Why a label's curves could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateLabel {
    /// Recall and TPR are 0/0.
    NoPositives,
    /// FPR is 0/0. The precision-recall curve is still defined.
    NoNegatives,
}

impl std::fmt::Display for DegenerateLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegenerateLabel::NoPositives => write!(f, "no positive examples in the test split"),
            DegenerateLabel::NoNegatives => write!(f, "no negative examples in the test split"),
        }
    }
}

/// Points ordered by increasing threshold, ending at (recall 0, precision 1)
/// which has no threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionRecallCurve {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub thresholds: Vec<f64>,
}

/// Points ordered by decreasing threshold, starting at (0, 0). The first
/// threshold is one above the highest score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    pub thresholds: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCurves {
    pub label: String,
    pub precision_recall: Option<PrecisionRecallCurve>,
    pub roc: Option<RocCurve>,
    pub auc: Option<f64>,
    pub undefined: Option<DegenerateLabel>,
}

/// Cumulative counts at each distinct score, highest score first.
struct ThresholdSweep {
    fps: Vec<f64>,
    tps: Vec<f64>,
    thresholds: Vec<f64>,
}

fn sweep(truth: &[bool], scores: &[f64]) -> ThresholdSweep {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut fps = Vec::new();
    let mut tps = Vec::new();
    let mut thresholds = Vec::new();
    let (mut tp, mut fp) = (0.0, 0.0);

    for (rank, &i) in order.iter().enumerate() {
        if truth[i] {
            tp += 1.0;
        } else {
            fp += 1.0;
        }
        // Emit a point at the last occurrence of each distinct score.
        let is_last_of_run = order
            .get(rank + 1)
            .is_none_or(|&next| scores[next] != scores[i]);
        if is_last_of_run {
            fps.push(fp);
            tps.push(tp);
            thresholds.push(scores[i]);
        }
    }

    ThresholdSweep {
        fps,
        tps,
        thresholds,
    }
}

fn precision_recall(sweep: &ThresholdSweep) -> PrecisionRecallCurve {
    let total_pos = sweep.tps.last().copied().unwrap_or(0.0);
    let mut precision: Vec<f64> = sweep
        .tps
        .iter()
        .zip(&sweep.fps)
        .map(|(tp, fp)| if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 })
        .collect();
    let mut recall: Vec<f64> = sweep.tps.iter().map(|tp| tp / total_pos).collect();
    let mut thresholds = sweep.thresholds.clone();

    precision.reverse();
    recall.reverse();
    thresholds.reverse();
    precision.push(1.0);
    recall.push(0.0);

    PrecisionRecallCurve {
        precision,
        recall,
        thresholds,
    }
}

fn roc(sweep: &ThresholdSweep) -> RocCurve {
    let n = sweep.tps.len();
    // Keep the endpoints plus every point where the slope changes.
    let keep: Vec<usize> = (0..n)
        .filter(|&i| {
            i == 0
                || i == n - 1
                || sweep.fps[i - 1] - 2.0 * sweep.fps[i] + sweep.fps[i + 1] != 0.0
                || sweep.tps[i - 1] - 2.0 * sweep.tps[i] + sweep.tps[i + 1] != 0.0
        })
        .collect();

    let total_neg = sweep.fps.last().copied().unwrap_or(0.0);
    let total_pos = sweep.tps.last().copied().unwrap_or(0.0);

    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    let mut thresholds = vec![sweep.thresholds.first().copied().unwrap_or(0.0) + 1.0];
    for i in keep {
        fpr.push(sweep.fps[i] / total_neg);
        tpr.push(sweep.tps[i] / total_pos);
        thresholds.push(sweep.thresholds[i]);
    }

    RocCurve {
        fpr,
        tpr,
        thresholds,
    }
}

/// Area under a curve by the trapezoidal rule.
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}

/// Curves and ROC AUC for one label's test column.
pub fn label_curves(label: &str, truth: &[bool], scores: &[f64]) -> LabelCurves {
    let n_pos = truth.iter().filter(|&&t| t).count();
    let n_neg = truth.len() - n_pos;

    if n_pos == 0 {
        return LabelCurves {
            label: label.to_string(),
            precision_recall: None,
            roc: None,
            auc: None,
            undefined: Some(DegenerateLabel::NoPositives),
        };
    }
    let undefined = (n_neg == 0).then_some(DegenerateLabel::NoNegatives);

    let points = sweep(truth, scores);
    let roc_curve = undefined.is_none().then(|| roc(&points));
    let auc = roc_curve
        .as_ref()
        .map(|curve| trapezoid(&curve.fpr, &curve.tpr));

    LabelCurves {
        label: label.to_string(),
        precision_recall: Some(precision_recall(&points)),
        roc: roc_curve,
        auc,
        undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_ranking_auc_one() {
        let curves = label_curves("a", &[false, false, true, true], &[0.1, 0.2, 0.8, 0.9]);
        assert_eq!(curves.auc, Some(1.0));
        assert!(curves.undefined.is_none());
    }

    #[test]
    fn test_inverted_ranking_auc_zero() {
        let curves = label_curves("a", &[true, true, false, false], &[0.1, 0.2, 0.8, 0.9]);
        assert_eq!(curves.auc, Some(0.0));
    }

    #[test]
    fn test_known_auc() {
        // Classic example: AUC 0.75.
        let curves = label_curves("a", &[false, false, true, true], &[0.1, 0.4, 0.35, 0.8]);
        assert!((curves.auc.unwrap() - 0.75).abs() < 1e-12);
        let roc = curves.roc.unwrap();
        assert_eq!(roc.fpr, vec![0.0, 0.0, 0.5, 0.5, 1.0]);
        assert_eq!(roc.tpr, vec![0.0, 0.5, 0.5, 1.0, 1.0]);
        assert!((roc.thresholds[0] - 1.8).abs() < 1e-12);
    }

    #[test]
    fn test_known_precision_recall() {
        let curves = label_curves("a", &[false, false, true, true], &[0.1, 0.4, 0.35, 0.8]);
        let pr = curves.precision_recall.unwrap();
        assert_eq!(pr.thresholds, vec![0.1, 0.35, 0.4, 0.8]);
        assert_eq!(pr.recall, vec![1.0, 1.0, 0.5, 0.5, 0.0]);
        let expected_precision = [0.5, 2.0 / 3.0, 0.5, 1.0, 1.0];
        for (p, e) in pr.precision.iter().zip(expected_precision) {
            assert!((p - e).abs() < 1e-12);
        }
    }

    #[test]
    fn test_ties_collapse_to_one_point() {
        let curves = label_curves("a", &[true, false, true, false], &[0.5, 0.5, 0.5, 0.5]);
        let roc = curves.roc.unwrap();
        assert_eq!(roc.fpr, vec![0.0, 1.0]);
        assert_eq!(roc.tpr, vec![0.0, 1.0]);
        assert!((curves.auc.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_collinear_points_dropped() {
        let curves = label_curves(
            "a",
            &[true, true, true, false, false],
            &[0.9, 0.8, 0.7, 0.2, 0.1],
        );
        let roc = curves.roc.unwrap();
        // The middle positive is on the vertical segment and is dropped.
        assert_eq!(roc.tpr, vec![0.0, 1.0 / 3.0, 1.0, 1.0]);
        assert_eq!(roc.fpr, vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_no_positives_is_undefined() {
        let curves = label_curves("rare", &[false, false, false], &[0.2, 0.4, 0.1]);
        assert_eq!(curves.undefined, Some(DegenerateLabel::NoPositives));
        assert!(curves.auc.is_none());
        assert!(curves.roc.is_none());
        assert!(curves.precision_recall.is_none());
    }

    #[test]
    fn test_no_negatives_keeps_precision_recall() {
        let curves = label_curves("common", &[true, true], &[0.2, 0.9]);
        assert_eq!(curves.undefined, Some(DegenerateLabel::NoNegatives));
        assert!(curves.auc.is_none());
        let pr = curves.precision_recall.unwrap();
        assert!(pr.precision.iter().all(|&p| p == 1.0));
    }

    #[test]
    fn test_empty_split_is_undefined() {
        let curves = label_curves("a", &[], &[]);
        assert_eq!(curves.undefined, Some(DegenerateLabel::NoPositives));
    }

    #[test]
    fn test_undefined_serializes_as_null() {
        let curves = label_curves("rare", &[false], &[0.3]);
        let json = serde_json::to_value(&curves).unwrap();
        assert!(json["auc"].is_null());
        assert_eq!(json["undefined"], "no_positives");
    }
}
