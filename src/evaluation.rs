//! Binary classification metrics for a trained fraud model.
//!
//! Probabilities are binarized at [`DECISION_THRESHOLD`] (strictly greater
//! means fraud) for accuracy, precision, recall and F1. ROC-AUC uses the raw
//! probabilities.

use crate::error::{Error, Result};
use crate::models::Classifier;
use crate::types::FeatureVector;
use serde::Serialize;
use tracing::info;

/// Probability above which a prediction counts as the positive class.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Scores of one evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    /// `0.0` when nothing was predicted positive
    pub precision: f64,
    /// `0.0` when there are no positive labels
    pub recall: f64,
    /// `0.0` when precision and recall are both zero
    pub f1: f64,
    /// `None` when the labels contain a single class
    pub roc_auc: Option<f64>,
}

/// Confusion counts for the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Confusion {
    tp: usize,
    fp: usize,
    tn: usize,
    fn_: usize,
}

impl Confusion {
    fn from_predictions(y_pred: &[bool], y_true: &[bool]) -> Self {
        y_pred
            .iter()
            .zip(y_true)
            .fold(Self::default(), |mut c, (&p, &t)| {
                match (p, t) {
                    (true, true) => c.tp += 1,
                    (true, false) => c.fp += 1,
                    (false, false) => c.tn += 1,
                    (false, true) => c.fn_ += 1,
                }
                c
            })
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Area under the ROC curve via the rank-sum statistic.
///
/// Ties receive their average rank, which equals the trapezoidal area under
/// the curve traced over every distinct threshold. `None` when one class is
/// absent or the slices differ in length.
pub fn roc_auc(scores: &[f64], y_true: &[bool]) -> Option<f64> {
    if scores.len() != y_true.len() {
        return None;
    }
    let n_pos = y_true.iter().filter(|&&t| t).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut pos_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based
        let avg_rank = (start + end) as f64 / 2.0 + 1.0;
        let positives = order[start..=end].iter().filter(|&&i| y_true[i]).count();
        pos_rank_sum += avg_rank * positives as f64;
        start = end + 1;
    }

    let n_pos = n_pos as f64;
    let u = pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0;
    Some(u / (n_pos * n_neg as f64))
}

/// Evaluate predicted fraud probabilities against 0/1 labels.
pub fn evaluate(probabilities: &[f64], labels: &[u8]) -> Result<EvaluationReport> {
    if probabilities.len() != labels.len() {
        return Err(Error::DimensionMismatch {
            predictions: probabilities.len(),
            labels: labels.len(),
        });
    }
    if labels.is_empty() {
        return Err(Error::invalid_input("cannot evaluate an empty prediction set"));
    }
    if let Some(bad) = labels.iter().find(|&&l| l > 1) {
        return Err(Error::invalid_input(format!(
            "labels must be 0 or 1, found {bad}"
        )));
    }
    if let Some(bad) = probabilities.iter().find(|p| p.is_nan()) {
        return Err(Error::invalid_input(format!("probability {bad} is not a number")));
    }

    let y_true: Vec<bool> = labels.iter().map(|&l| l == 1).collect();
    let y_pred: Vec<bool> = probabilities
        .iter()
        .map(|&p| p > DECISION_THRESHOLD)
        .collect();

    let c = Confusion::from_predictions(&y_pred, &y_true);
    let precision = ratio(c.tp, c.tp + c.fp);
    let recall = ratio(c.tp, c.tp + c.fn_);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    Ok(EvaluationReport {
        accuracy: ratio(c.tp + c.tn, labels.len()),
        precision,
        recall,
        f1,
        roc_auc: roc_auc(probabilities, &y_true),
    })
}

/// Score a held-out set with `model` and evaluate the predictions.
pub fn evaluate_classifier(
    model: &dyn Classifier,
    features: &[FeatureVector],
    labels: &[u8],
) -> anyhow::Result<EvaluationReport> {
    if features.len() != labels.len() {
        return Err(Error::DimensionMismatch {
            predictions: features.len(),
            labels: labels.len(),
        }
        .into());
    }

    let probabilities = model.predict_proba_batch(features)?;
    let report = evaluate(&probabilities, labels)?;

    info!(
        model = %model.name(),
        samples = labels.len(),
        accuracy = report.accuracy,
        precision = report.precision,
        recall = report.recall,
        f1 = report.f1,
        roc_auc = ?report.roc_auc,
        "Model evaluation complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FEATURE_COUNT;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn test_perfect_separation() {
        let report = evaluate(&[0.9, 0.2, 0.6, 0.4], &[1, 0, 1, 0]).unwrap();
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.precision, 1.0);
        assert_eq!(report.recall, 1.0);
        assert_eq!(report.f1, 1.0);
        assert_eq!(report.roc_auc, Some(1.0));
    }

    #[test]
    fn test_threshold_is_strict() {
        // 0.5 is not positive
        let report = evaluate(&[0.5, 0.51], &[1, 1]).unwrap();
        assert_eq!(report.accuracy, 0.5);
        assert_eq!(report.recall, 0.5);
        assert_eq!(report.precision, 1.0);
    }

    #[test]
    fn test_mixed_predictions() {
        // tp=2 fp=1 tn=2 fn=1
        let probs = [0.9, 0.8, 0.7, 0.3, 0.2, 0.1];
        let labels = [1, 1, 0, 1, 0, 0];
        let report = evaluate(&probs, &labels).unwrap();

        assert_close(report.accuracy, 4.0 / 6.0);
        assert_close(report.precision, 2.0 / 3.0);
        assert_close(report.recall, 2.0 / 3.0);
        assert_close(report.f1, 2.0 / 3.0);
        // 8 of 9 positive/negative pairs ordered correctly
        assert_close(report.roc_auc.unwrap(), 8.0 / 9.0);
    }

    #[test]
    fn test_roc_auc_with_ties() {
        let auc = roc_auc(&[0.5, 0.5, 0.5, 0.5], &[true, false, true, false]).unwrap();
        assert_close(auc, 0.5);

        let auc = roc_auc(&[0.1, 0.4, 0.35, 0.8], &[false, false, true, true]).unwrap();
        assert_close(auc, 0.75);
    }

    #[test]
    fn test_roc_auc_length_mismatch() {
        assert_eq!(roc_auc(&[0.1, 0.2, 0.3], &[true, false]), None);
        assert_eq!(roc_auc(&[0.1], &[true, false]), None);
    }

    #[test]
    fn test_degenerate_single_class() {
        let report = evaluate(&[0.1, 0.2], &[0, 0]).unwrap();
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.precision, 0.0);
        assert_eq!(report.recall, 0.0);
        assert_eq!(report.f1, 0.0);
        assert_eq!(report.roc_auc, None);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = evaluate(&[0.1, 0.2, 0.3], &[0, 1]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                predictions: 3,
                labels: 2
            }
        ));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(evaluate(&[], &[]), Err(Error::InvalidInput(_))));
        assert!(matches!(evaluate(&[0.3], &[2]), Err(Error::InvalidInput(_))));
        assert!(matches!(evaluate(&[f64::NAN], &[1]), Err(Error::InvalidInput(_))));
    }

    struct FirstFeature;

    impl Classifier for FirstFeature {
        fn name(&self) -> &str {
            "first_feature"
        }

        fn predict_proba(&self, features: &FeatureVector) -> anyhow::Result<f64> {
            Ok(features.as_slice()[0])
        }
    }

    #[test]
    fn test_evaluate_classifier() {
        let vector = |v: f64| {
            let mut values = [0.0; FEATURE_COUNT];
            values[0] = v;
            FeatureVector::new(values)
        };
        let features = vec![vector(0.9), vector(0.1), vector(0.7)];

        let report = evaluate_classifier(&FirstFeature, &features, &[1, 0, 1]).unwrap();
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.roc_auc, Some(1.0));

        assert!(evaluate_classifier(&FirstFeature, &features, &[1, 0]).is_err());
    }
}
