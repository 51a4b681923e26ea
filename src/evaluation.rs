//! Detector evaluation against hand-labelled ground truth
//!
//! Predictions are paired with ground-truth boxes of the same label by
//! overlap, each pairing is scored as a binary outcome, and the outcomes are
//! thresholded into precision and recall.

use crate::detection::Detection;
use crate::geometry::overlap_ratio;
use serde::Serialize;

/// Minimum overlap for a prediction to count as finding its ground truth
pub const DEFAULT_MIN_IOU: f64 = 0.75;

/// Default confidence threshold for a positive prediction
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// A ground truth, a prediction, or both with their overlap
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapPair<'a> {
    pub truth: Option<&'a Detection>,
    pub prediction: Option<&'a Detection>,
    pub overlap: Option<f64>,
}

/// Pair same-label ground truths and predictions with positive overlap.
///
/// Yields every overlapping pair first (a detection may appear in several),
/// then each ground truth with no pair, then each prediction with no pair.
pub fn pair_by_overlap<'a>(truth: &'a [Detection], predictions: &'a [Detection]) -> Vec<OverlapPair<'a>> {
    let mut pairs = Vec::new();
    let mut paired_truth = vec![false; truth.len()];
    let mut paired_pred = vec![false; predictions.len()];

    for (t, gt) in truth.iter().enumerate() {
        for (p, pred) in predictions.iter().enumerate() {
            if gt.name != pred.name {
                continue;
            }
            let overlap = overlap_ratio(&gt.bbox(), &pred.bbox());
            if overlap > 0.0 {
                paired_truth[t] = true;
                paired_pred[p] = true;
                pairs.push(OverlapPair {
                    truth: Some(gt),
                    prediction: Some(pred),
                    overlap: Some(overlap),
                });
            }
        }
    }

    for (gt, _) in truth.iter().zip(&paired_truth).filter(|(_, paired)| !**paired) {
        pairs.push(OverlapPair {
            truth: Some(gt),
            prediction: None,
            overlap: None,
        });
    }
    for (pred, _) in predictions.iter().zip(&paired_pred).filter(|(_, paired)| !**paired) {
        pairs.push(OverlapPair {
            truth: None,
            prediction: Some(pred),
            overlap: None,
        });
    }

    pairs
}

/// Binary outcome of one pair: whether a card was really there, and the detector's score for it
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredLabel {
    pub name: String,
    pub positive: bool,
    pub score: f64,
}

/// Turn pairs into scored outcomes.
///
/// Unpaired predictions and pairs overlapping less than `min_iou` are
/// negatives scored by the prediction's confidence; unpaired ground truths
/// are positives scored 0.
pub fn score_pairs(pairs: &[OverlapPair<'_>], min_iou: f64) -> Vec<ScoredLabel> {
    pairs
        .iter()
        .filter_map(|pair| match (pair.truth, pair.prediction) {
            (None, Some(pred)) => Some(ScoredLabel {
                name: pred.name.clone(),
                positive: false,
                score: pred.score(),
            }),
            (Some(gt), None) => Some(ScoredLabel {
                name: gt.name.clone(),
                positive: true,
                score: 0.0,
            }),
            (Some(gt), Some(pred)) => Some(ScoredLabel {
                name: gt.name.clone(),
                positive: pair.overlap.unwrap_or(0.0) >= min_iou,
                score: pred.score(),
            }),
            (None, None) => None,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationMetrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    /// 0 when nothing is predicted positive
    pub precision: f64,
    /// 0 when there is nothing to find
    pub recall: f64,
}

/// Precision and recall of predictions scoring at least `threshold`
pub fn classification_metrics(pairs: &[OverlapPair<'_>], threshold: f64, min_iou: f64) -> ClassificationMetrics {
    let mut tp = 0;
    let mut fp = 0;
    let mut fn_ = 0;
    for label in score_pairs(pairs, min_iou) {
        match (label.positive, label.score >= threshold) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    ClassificationMetrics {
        true_positives: tp,
        false_positives: fp,
        false_negatives: fn_,
        precision: ratio(tp, tp + fp),
        recall: ratio(tp, tp + fn_),
    }
}
