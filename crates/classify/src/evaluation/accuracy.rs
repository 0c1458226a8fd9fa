//! Accuracy, precision, recall and F1 over (expected, predicted) pairs.

use media_butler_core::error::MediaButlerError;
use media_butler_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-class counting and derived ratios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    /// Number of test cases whose expected class is this one
    pub support: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Dataset-level accuracy metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub total: usize,
    pub correct: usize,
    pub overall_accuracy: f64,
    pub per_class: BTreeMap<String, ClassMetrics>,
    /// Unweighted means over classes
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    /// Support-weighted means over classes
    pub weighted_precision: f64,
    pub weighted_recall: f64,
    pub weighted_f1: f64,
}

/// Ratio that reports 0 instead of dividing by zero
fn safe_ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Compute accuracy metrics over (expected, predicted) label pairs
pub fn compute_accuracy(pairs: &[(String, String)]) -> Result<AccuracyMetrics> {
    if pairs.is_empty() {
        return Err(MediaButlerError::EmptyDataset);
    }

    let mut counts: BTreeMap<String, (usize, usize, usize, usize)> = BTreeMap::new();
    let mut correct = 0usize;

    for (expected, predicted) in pairs {
        if expected == predicted {
            correct += 1;
            let entry = counts.entry(expected.clone()).or_default();
            entry.0 += 1; // TP
            entry.3 += 1; // support
        } else {
            let expected_entry = counts.entry(expected.clone()).or_default();
            expected_entry.2 += 1; // FN
            expected_entry.3 += 1; // support
            counts.entry(predicted.clone()).or_default().1 += 1; // FP
        }
    }

    let mut per_class = BTreeMap::new();
    for (class, (tp, fp, fn_count, support)) in counts {
        let precision = safe_ratio(tp, tp + fp);
        let recall = safe_ratio(tp, tp + fn_count);
        per_class.insert(
            class,
            ClassMetrics {
                true_positives: tp,
                false_positives: fp,
                false_negatives: fn_count,
                support,
                precision,
                recall,
                f1: f1_score(precision, recall),
            },
        );
    }

    let class_count = per_class.len() as f64;
    let macro_precision = per_class.values().map(|m| m.precision).sum::<f64>() / class_count;
    let macro_recall = per_class.values().map(|m| m.recall).sum::<f64>() / class_count;
    let macro_f1 = per_class.values().map(|m| m.f1).sum::<f64>() / class_count;

    let total_support: usize = per_class.values().map(|m| m.support).sum();
    let weight = |value: f64, support: usize| value * support as f64 / total_support.max(1) as f64;
    let weighted_precision = per_class
        .values()
        .map(|m| weight(m.precision, m.support))
        .sum();
    let weighted_recall = per_class
        .values()
        .map(|m| weight(m.recall, m.support))
        .sum();
    let weighted_f1 = per_class.values().map(|m| weight(m.f1, m.support)).sum();

    Ok(AccuracyMetrics {
        total: pairs.len(),
        correct,
        overall_accuracy: correct as f64 / pairs.len() as f64,
        per_class,
        macro_precision,
        macro_recall,
        macro_f1,
        weighted_precision,
        weighted_recall,
        weighted_f1,
    })
}
