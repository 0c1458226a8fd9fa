//! Model evaluation: accuracy metrics, confusion matrices, calibration
//! analysis, cross-validation, benchmarking and the composite quality
//! report.

pub mod accuracy;
pub mod benchmark;
pub mod calibration;
pub mod confusion;
pub mod cross_validation;
pub mod report;

pub use accuracy::{compute_accuracy, AccuracyMetrics, ClassMetrics};
pub use benchmark::{run_benchmark, BenchmarkConfig, MemoryStats, PerformanceBenchmark};
pub use calibration::{
    analyze_confidence, CalibrationBias, ConfidenceAnalysis, ConfidenceBucket,
};
pub use confusion::ConfusionMatrix;
pub use cross_validation::{
    cross_validate, CrossValidationResults, FoldMetrics, StabilityBand,
};
pub use report::{ModelQualityReport, ProductionReadiness};

use crate::service::{Decision, PredictionService};
use crate::training::TrainingSample;
use media_butler_core::cancellation::CancellationSignal;
use media_butler_core::error::MediaButlerError;
use media_butler_core::Result;
use serde::{Deserialize, Serialize};

/// A labeled evaluation case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub filename: String,
    pub expected_category: String,
}

impl TestCase {
    pub fn new(filename: impl Into<String>, expected_category: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            expected_category: expected_category.into(),
        }
    }
}

/// Inputs for a full quality report
#[derive(Debug, Clone, Default)]
pub struct QualityReportConfig {
    pub test_cases: Vec<TestCase>,
    pub benchmark: Option<BenchmarkConfig>,
}

/// Drives a [`PredictionService`] over labeled datasets and computes
/// quality metrics.
pub struct Evaluator {
    service: PredictionService,
}

impl Evaluator {
    pub fn new(service: PredictionService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &PredictionService {
        &self.service
    }

    /// Run every test case and collect (expected, predicted, confidence,
    /// correct) records. Failed classifications predict the reserved label
    /// `UNKNOWN` so they count against accuracy without raising.
    fn run_cases(&self, test_cases: &[TestCase]) -> Result<Vec<(String, String, f64, bool)>> {
        if test_cases.is_empty() {
            return Err(MediaButlerError::EmptyDataset);
        }
        let mut records = Vec::with_capacity(test_cases.len());
        for case in test_cases {
            let result = self.service.predict(&case.filename)?;
            let predicted = match result.decision {
                Decision::Failed => "UNKNOWN".to_string(),
                _ => result
                    .predicted_category
                    .unwrap_or_else(|| "UNKNOWN".to_string()),
            };
            let correct = predicted == case.expected_category;
            records.push((
                case.expected_category.clone(),
                predicted,
                result.confidence,
                correct,
            ));
        }
        Ok(records)
    }

    /// Precision, recall, F1 and accuracy over a labeled set
    pub fn evaluate_accuracy(&self, test_cases: &[TestCase]) -> Result<AccuracyMetrics> {
        let records = self.run_cases(test_cases)?;
        let pairs: Vec<(String, String)> = records
            .into_iter()
            .map(|(expected, predicted, _, _)| (expected, predicted))
            .collect();
        compute_accuracy(&pairs)
    }

    /// Square confusion matrix over a labeled set
    pub fn confusion_matrix(&self, test_cases: &[TestCase]) -> Result<ConfusionMatrix> {
        let records = self.run_cases(test_cases)?;
        let pairs: Vec<(String, String)> = records
            .into_iter()
            .map(|(expected, predicted, _, _)| (expected, predicted))
            .collect();
        ConfusionMatrix::from_pairs(&pairs)
    }

    /// Calibration analysis over a labeled set
    pub fn analyze_confidence(&self, test_cases: &[TestCase]) -> Result<ConfidenceAnalysis> {
        let records = self.run_cases(test_cases)?;
        let confidences: Vec<(f64, bool)> = records
            .into_iter()
            .map(|(_, _, confidence, correct)| (confidence, correct))
            .collect();
        analyze_confidence(&confidences)
    }

    /// Stratified k-fold cross-validation; trains a fresh model per fold
    /// with the service's configuration.
    pub fn cross_validate(
        &self,
        samples: &[TrainingSample],
        k: usize,
    ) -> Result<CrossValidationResults> {
        cross_validate(samples, k, self.service.config())
    }

    /// Latency/throughput/memory benchmark against the live service
    pub async fn benchmark(
        &self,
        config: &BenchmarkConfig,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<PerformanceBenchmark> {
        run_benchmark(&self.service, config, cancellation).await
    }

    /// Compose accuracy, confusion, calibration and an optional benchmark
    /// into one scored report.
    pub async fn generate_quality_report(
        &self,
        config: &QualityReportConfig,
    ) -> Result<ModelQualityReport> {
        let records = self.run_cases(&config.test_cases)?;

        let pairs: Vec<(String, String)> = records
            .iter()
            .map(|(expected, predicted, _, _)| (expected.clone(), predicted.clone()))
            .collect();
        let confidences: Vec<(f64, bool)> = records
            .iter()
            .map(|(_, _, confidence, correct)| (*confidence, *correct))
            .collect();

        let accuracy = compute_accuracy(&pairs)?;
        let confusion = ConfusionMatrix::from_pairs(&pairs)?;
        let confidence = analyze_confidence(&confidences)?;
        let benchmark = match &config.benchmark {
            Some(bench_config) => Some(run_benchmark(&self.service, bench_config, None).await?),
            None => None,
        };

        Ok(ModelQualityReport::compose(
            accuracy, confusion, confidence, benchmark,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::train_model;
    use crate::registry::CategoryRegistry;
    use crate::training::SampleSource;
    use media_butler_core::config::ClassifierConfig;
    use std::sync::Arc;

    fn sample(filename: &str, category: &str) -> TrainingSample {
        TrainingSample::new(filename, category, 1.0, SampleSource::ManuallyCurated)
    }

    fn evaluator() -> Evaluator {
        let samples = vec![
            sample("Il.Trono.Di.Spade.8x04.ITA.WEBMux.x264-UBi.mkv", "IL TRONO DI SPADE"),
            sample("Il.Trono.Di.Spade.8x05.ITA.WEBMux.x264-UBi.mkv", "IL TRONO DI SPADE"),
            sample("One.Piece.1089.Sub.ITA.720p.WEB-DLMux.x264-UBi.mkv", "ONE PIECE"),
            sample("One.Piece.1090.Sub.ITA.720p.WEB-DLMux.x264-UBi.mkv", "ONE PIECE"),
        ];
        let config = ClassifierConfig::default();
        let model = train_model(&samples, &config, "1.0.0").unwrap();
        let service = PredictionService::new(config, Arc::new(CategoryRegistry::new()));
        service.load_model(model).unwrap();
        Evaluator::new(service)
    }

    fn test_cases() -> Vec<TestCase> {
        vec![
            TestCase::new(
                "Il.Trono.Di.Spade.8x06.ITA.WEBMux.x264-UBi.mkv",
                "IL TRONO DI SPADE",
            ),
            TestCase::new(
                "One.Piece.1095.Sub.ITA.720p.WEB-DLMux.x264-UBi.mkv",
                "ONE PIECE",
            ),
        ]
    }

    #[test]
    fn test_evaluate_accuracy() {
        let evaluator = evaluator();
        let metrics = evaluator.evaluate_accuracy(&test_cases()).unwrap();
        assert_eq!(metrics.total, 2);
        assert!((0.0..=1.0).contains(&metrics.overall_accuracy));
        assert!(!metrics.per_class.is_empty());
    }

    #[test]
    fn test_empty_test_cases_rejected() {
        let evaluator = evaluator();
        assert!(matches!(
            evaluator.evaluate_accuracy(&[]),
            Err(MediaButlerError::EmptyDataset)
        ));
    }

    #[test]
    fn test_confusion_matrix_total() {
        let evaluator = evaluator();
        let matrix = evaluator.confusion_matrix(&test_cases()).unwrap();
        assert_eq!(matrix.total, 2);
        assert_eq!(matrix.row_sums().iter().sum::<usize>(), 2);
    }

    #[test]
    fn test_failed_predictions_count_as_unknown() {
        let evaluator = evaluator();
        let cases = vec![TestCase::new("", "IL TRONO DI SPADE")];
        let matrix = evaluator.confusion_matrix(&cases).unwrap();
        assert!(matrix.labels.contains(&"UNKNOWN".to_string()));
    }

    #[test]
    fn test_analyze_confidence_shape() {
        let evaluator = evaluator();
        let analysis = evaluator.analyze_confidence(&test_cases()).unwrap();
        assert_eq!(analysis.buckets.len(), 6);
        assert!((0.0..=1.0).contains(&analysis.ece));
    }

    #[tokio::test]
    async fn test_quality_report_without_benchmark() {
        let evaluator = evaluator();
        let report = evaluator
            .generate_quality_report(&QualityReportConfig {
                test_cases: test_cases(),
                benchmark: None,
            })
            .await
            .unwrap();
        assert!((0.0..=1.0).contains(&report.overall_score));
        assert!(report.benchmark.is_none());
    }

    #[tokio::test]
    async fn test_quality_report_with_benchmark() {
        let evaluator = evaluator();
        let report = evaluator
            .generate_quality_report(&QualityReportConfig {
                test_cases: test_cases(),
                benchmark: Some(BenchmarkConfig {
                    warmup_count: 1,
                    prediction_count: 5,
                    benchmark_filenames: vec![
                        "One.Piece.1089.Sub.ITA.720p.WEB-DLMux.x264-UBi.mkv".to_string()
                    ],
                    ..Default::default()
                }),
            })
            .await
            .unwrap();
        assert!(report.benchmark.is_some());
    }
}
