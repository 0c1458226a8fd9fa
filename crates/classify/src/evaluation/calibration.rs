//! Confidence calibration: reliability buckets, ECE and Brier score.

use media_butler_core::error::MediaButlerError;
use media_butler_core::Result;
use serde::{Deserialize, Serialize};

/// Bucket boundaries: a wide low bucket then deciles up to 1.0
const BUCKET_BOUNDS: [(f64, f64); 6] = [
    (0.0, 0.5),
    (0.5, 0.6),
    (0.6, 0.7),
    (0.7, 0.8),
    (0.8, 0.9),
    (0.9, 1.0),
];

/// Calibration verdict for a prediction set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationBias {
    WellCalibrated,
    OverConfident,
    UnderConfident,
    SignificantlyOverConfident,
    SignificantlyUnderConfident,
}

/// One confidence bucket with its empirical accuracy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBucket {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub mean_confidence: f64,
    pub accuracy: f64,
}

/// Calibration analysis over (confidence, correct) records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceAnalysis {
    pub buckets: Vec<ConfidenceBucket>,
    /// Expected Calibration Error
    pub ece: f64,
    pub brier_score: f64,
    /// 1 - ECE
    pub reliability_index: f64,
    /// Mean of (confidence - accuracy) over all records
    pub mean_gap: f64,
    pub bias: CalibrationBias,
}

/// Partition predictions into fixed buckets and measure calibration
pub fn analyze_confidence(records: &[(f64, bool)]) -> Result<ConfidenceAnalysis> {
    if records.is_empty() {
        return Err(MediaButlerError::EmptyDataset);
    }
    let total = records.len() as f64;

    let mut buckets = Vec::with_capacity(BUCKET_BOUNDS.len());
    let mut ece = 0.0f64;
    for (idx, (lower, upper)) in BUCKET_BOUNDS.iter().enumerate() {
        let last = idx == BUCKET_BOUNDS.len() - 1;
        let members: Vec<&(f64, bool)> = records
            .iter()
            .filter(|(confidence, _)| {
                *confidence >= *lower && (*confidence < *upper || (last && *confidence <= *upper))
            })
            .collect();
        let count = members.len();
        let mean_confidence = if count == 0 {
            0.0
        } else {
            members.iter().map(|(c, _)| c).sum::<f64>() / count as f64
        };
        let accuracy = if count == 0 {
            0.0
        } else {
            members.iter().filter(|(_, correct)| *correct).count() as f64 / count as f64
        };
        if count > 0 {
            ece += (count as f64 / total) * (mean_confidence - accuracy).abs();
        }
        buckets.push(ConfidenceBucket {
            lower: *lower,
            upper: *upper,
            count,
            mean_confidence,
            accuracy,
        });
    }

    let brier_score = records
        .iter()
        .map(|(confidence, correct)| {
            let target = f64::from(u8::from(*correct));
            (confidence - target).powi(2)
        })
        .sum::<f64>()
        / total;

    let overall_accuracy = records.iter().filter(|(_, correct)| *correct).count() as f64 / total;
    let mean_confidence = records.iter().map(|(c, _)| c).sum::<f64>() / total;
    let mean_gap = mean_confidence - overall_accuracy;

    let bias = classify_bias(ece, mean_gap);

    Ok(ConfidenceAnalysis {
        buckets,
        ece,
        brier_score,
        reliability_index: 1.0 - ece,
        mean_gap,
        bias,
    })
}

fn classify_bias(ece: f64, gap: f64) -> CalibrationBias {
    if ece <= 0.05 {
        CalibrationBias::WellCalibrated
    } else if gap > 0.15 {
        CalibrationBias::SignificantlyOverConfident
    } else if gap > 0.05 {
        CalibrationBias::OverConfident
    } else if gap < -0.15 {
        CalibrationBias::SignificantlyUnderConfident
    } else if gap < -0.05 {
        CalibrationBias::UnderConfident
    } else {
        CalibrationBias::WellCalibrated
    }
}
