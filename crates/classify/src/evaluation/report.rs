//! Composite model quality report.

use crate::evaluation::accuracy::AccuracyMetrics;
use crate::evaluation::benchmark::PerformanceBenchmark;
use crate::evaluation::calibration::ConfidenceAnalysis;
use crate::evaluation::confusion::ConfusionMatrix;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deployment verdict derived from the overall quality score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductionReadiness {
    ExceedsRequirements,
    ProductionReady,
    StagingReady,
    DevelopmentOnly,
    NotReady,
}

impl ProductionReadiness {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.90 {
            Self::ExceedsRequirements
        } else if score >= 0.80 {
            Self::ProductionReady
        } else if score >= 0.70 {
            Self::StagingReady
        } else if score >= 0.55 {
            Self::DevelopmentOnly
        } else {
            Self::NotReady
        }
    }
}

/// Everything the quality gate needs in one record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelQualityReport {
    pub accuracy: AccuracyMetrics,
    pub confusion: ConfusionMatrix,
    pub confidence: ConfidenceAnalysis,
    pub benchmark: Option<PerformanceBenchmark>,
    /// Weighted blend: accuracy 0.4, macro F1 0.3, calibration
    /// reliability 0.15, performance compliance 0.15
    pub overall_score: f64,
    pub readiness: ProductionReadiness,
    pub generated_at: DateTime<Utc>,
}

impl ModelQualityReport {
    pub fn compose(
        accuracy: AccuracyMetrics,
        confusion: ConfusionMatrix,
        confidence: ConfidenceAnalysis,
        benchmark: Option<PerformanceBenchmark>,
    ) -> Self {
        let performance_compliance = match &benchmark {
            Some(b) if b.passed => 1.0,
            Some(b) => {
                // Partial credit for the thresholds that held.
                let checks = b.violations.len() as f64;
                (1.0 - checks / (checks + 1.0)).max(0.0)
            }
            None => 1.0,
        };

        let overall_score = 0.40 * accuracy.overall_accuracy
            + 0.30 * accuracy.macro_f1
            + 0.15 * confidence.reliability_index.max(0.0)
            + 0.15 * performance_compliance;

        Self {
            readiness: ProductionReadiness::from_score(overall_score),
            accuracy,
            confusion,
            confidence,
            benchmark,
            overall_score,
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::accuracy::compute_accuracy;
    use crate::evaluation::calibration::analyze_confidence;

    fn pairs(data: &[(&str, &str)]) -> Vec<(String, String)> {
        data.iter()
            .map(|(e, p)| (e.to_string(), p.to_string()))
            .collect()
    }

    #[test]
    fn test_readiness_bands() {
        assert_eq!(
            ProductionReadiness::from_score(0.95),
            ProductionReadiness::ExceedsRequirements
        );
        assert_eq!(
            ProductionReadiness::from_score(0.85),
            ProductionReadiness::ProductionReady
        );
        assert_eq!(
            ProductionReadiness::from_score(0.75),
            ProductionReadiness::StagingReady
        );
        assert_eq!(
            ProductionReadiness::from_score(0.60),
            ProductionReadiness::DevelopmentOnly
        );
        assert_eq!(
            ProductionReadiness::from_score(0.40),
            ProductionReadiness::NotReady
        );
    }

    #[test]
    fn test_perfect_inputs_score_high() {
        let data = pairs(&[("A", "A"), ("B", "B"), ("A", "A"), ("B", "B")]);
        let accuracy = compute_accuracy(&data).unwrap();
        let confusion = ConfusionMatrix::from_pairs(&data).unwrap();
        let confidence =
            analyze_confidence(&[(1.0, true), (1.0, true), (1.0, true), (1.0, true)]).unwrap();

        let report = ModelQualityReport::compose(accuracy, confusion, confidence, None);
        assert!(report.overall_score > 0.99);
        assert_eq!(report.readiness, ProductionReadiness::ExceedsRequirements);
    }

    #[test]
    fn test_poor_inputs_score_low() {
        let data = pairs(&[("A", "B"), ("B", "A"), ("A", "B"), ("B", "A")]);
        let accuracy = compute_accuracy(&data).unwrap();
        let confusion = ConfusionMatrix::from_pairs(&data).unwrap();
        let confidence =
            analyze_confidence(&[(0.99, false), (0.99, false), (0.99, false), (0.99, false)])
                .unwrap();

        let report = ModelQualityReport::compose(accuracy, confusion, confidence, None);
        assert!(report.overall_score < 0.55);
        assert_eq!(report.readiness, ProductionReadiness::NotReady);
    }
}
