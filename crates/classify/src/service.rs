//! Prediction service: tokenize, extract features, predict, decide.
//!
//! The service owns the loaded predictor behind a swap lock, the bounded
//! prediction cache and the statistics counters. It is cheap to clone;
//! clones share all state, so batch chunks can run on blocking tasks.

use crate::cache::{canonical_fingerprint, PredictionCache, DEFAULT_CACHE_CAPACITY};
use crate::features::{is_italian_group, FeatureEngineer};
use crate::model::Model;
use crate::model_store::ModelStore;
use crate::predictor::{Predictor, RankedLabel};
use crate::registry::{CategoryDefinition, CategoryRegistry, CategoryType};
use crate::stats::{PerformanceStats, StatsSnapshot};
use crate::tokenizer::Tokenizer;
use chrono::{DateTime, Utc};
use media_butler_core::cancellation::CancellationSignal;
use media_butler_core::config::ClassifierConfig;
use media_butler_core::error::MediaButlerError;
use media_butler_core::Result;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Italian words that frequently appear in local series titles
static ITALIAN_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "il", "lo", "la", "le", "gli", "di", "della", "dei", "delle", "un", "una", "serie",
        "stagione", "puntata", "episodio",
    ]
    .into_iter()
    .collect()
});

/// Routing outcome of a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    AutoClassify,
    SuggestWithAlternatives,
    RequestManualCategorization,
    Unreliable,
    Failed,
}

/// Final classification output for one filename
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub filename: String,
    pub predicted_category: Option<String>,
    pub confidence: f64,
    pub alternatives: Vec<RankedLabel>,
    pub decision: Decision,
    /// Strongest feature signals behind the prediction
    pub feature_highlights: Vec<(String, f32)>,
    pub model_version: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub processing_time_ms: f64,
    pub cached: bool,
    pub error: Option<String>,
}

/// Options for a batch call
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Soft wall-clock budget, checked between chunks
    pub timeout: Option<Duration>,
    pub cancellation: Option<CancellationSignal>,
}

/// Aggregate outcome of a batch call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchClassificationResult {
    /// Per-item results in input order
    pub results: Vec<ClassificationResult>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub elapsed_ms: f64,
    /// The soft timeout expired before all chunks ran
    pub partially_completed: bool,
}

/// Italian-content signals found in a filename
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItalianIndicators {
    pub has_italian_language: bool,
    pub known_italian_group: Option<String>,
    pub italian_keywords: Vec<String>,
}

/// Pre-classification assessment of a filename
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilenameValidation {
    pub complexity: f32,
    pub detected_patterns: Vec<String>,
    pub italian: ItalianIndicators,
    /// Heuristic likelihood that classification will go well
    pub processing_confidence: f64,
    /// At most five short suggestions
    pub recommendations: Vec<String>,
}

/// Orchestrates the classification pipeline end to end
#[derive(Clone)]
pub struct PredictionService {
    config: Arc<ClassifierConfig>,
    registry: Arc<CategoryRegistry>,
    tokenizer: Arc<Tokenizer>,
    engineer: Arc<FeatureEngineer>,
    predictor: Arc<RwLock<Option<Arc<Predictor>>>>,
    cache: Arc<PredictionCache<ClassificationResult>>,
    stats: Arc<PerformanceStats>,
}

impl PredictionService {
    pub fn new(config: ClassifierConfig, registry: Arc<CategoryRegistry>) -> Self {
        let tokenizer = Tokenizer::new(config.tokenization.clone());
        let engineer = FeatureEngineer::new(config.features.clone());
        Self {
            config: Arc::new(config),
            registry,
            tokenizer: Arc::new(tokenizer),
            engineer: Arc::new(engineer),
            predictor: Arc::new(RwLock::new(None)),
            cache: Arc::new(PredictionCache::new(DEFAULT_CACHE_CAPACITY)),
            stats: Arc::new(PerformanceStats::new()),
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CategoryRegistry> {
        &self.registry
    }

    /// True when a model is loaded and predictions are possible
    pub fn is_ready(&self) -> bool {
        self.predictor.read().is_some()
    }

    /// Load a model, making the service ready. Model labels are registered
    /// as categories so threshold lookups always resolve.
    pub fn load_model(&self, model: Model) -> Result<()> {
        let predictor = Predictor::new(model)?;
        for label in predictor.labels() {
            if !self.registry.exists(label) {
                let definition = CategoryDefinition::new(label.clone(), CategoryType::TVSeries)
                    .with_threshold(self.config.auto_classify_threshold);
                self.registry.register(definition)?;
            }
        }
        tracing::info!(
            version = %predictor.model_version(),
            labels = predictor.labels().len(),
            "Model loaded"
        );
        *self.predictor.write() = Some(Arc::new(predictor));
        Ok(())
    }

    /// Load a model from disk. On failure the service keeps its previous
    /// state (Uninitialized stays Uninitialized).
    pub async fn load_model_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let (model, _info) = ModelStore::default().load(path, None).await?;
        self.load_model(model)
    }

    /// Drop the loaded model, returning to Uninitialized
    pub fn unload(&self) {
        *self.predictor.write() = None;
        tracing::info!("Model unloaded");
    }

    pub fn model_version(&self) -> Option<String> {
        self.predictor
            .read()
            .as_ref()
            .map(|p| p.model_version().to_string())
    }

    /// Classify one filename.
    ///
    /// Parse and inference problems surface as a result with
    /// `Decision::Failed`; only the missing-model state is an error.
    pub fn predict(&self, filename: &str) -> Result<ClassificationResult> {
        let predictor = self
            .predictor
            .read()
            .clone()
            .ok_or(MediaButlerError::ModelNotLoaded)?;

        let started = Instant::now();

        if filename.trim().is_empty() {
            self.stats.record_failure();
            return Ok(self.failed_result(filename, "filename is empty", started));
        }

        let cache_enabled = self.config.features.enable_prediction_cache;
        let fingerprint = canonical_fingerprint(filename, predictor.model_version());
        if cache_enabled {
            if let Some(mut hit) = self.cache.get(&fingerprint) {
                self.stats.record_cache_hit();
                hit.cached = true;
                tracing::debug!(filename, "Prediction cache hit");
                return Ok(hit);
            }
        }

        let tokenization = match self.tokenizer.tokenize(filename) {
            Ok(t) => t,
            Err(e) => {
                self.stats.record_failure();
                return Ok(self.failed_result(filename, &e.to_string(), started));
            }
        };
        let features = self.engineer.extract(&tokenization);

        let prediction = match predictor.predict(&features, self.config.max_alternative_predictions)
        {
            Ok(p) => p,
            Err(e) => {
                self.stats.record_failure();
                return Ok(self.failed_result(filename, &e.to_string(), started));
            }
        };

        let decision = self.decide(prediction.confidence, &prediction.label);
        let elapsed = started.elapsed();
        let processing_time_ms = elapsed.as_secs_f64() * 1000.0;
        if processing_time_ms > self.config.max_classification_time_ms as f64 {
            tracing::warn!(
                filename,
                elapsed_ms = processing_time_ms,
                budget_ms = self.config.max_classification_time_ms,
                "Classification exceeded time budget"
            );
        }

        let result = ClassificationResult {
            filename: filename.to_string(),
            predicted_category: Some(prediction.label),
            confidence: prediction.confidence,
            alternatives: prediction.alternatives,
            decision,
            feature_highlights: features.highlights(5),
            model_version: Some(predictor.model_version().to_string()),
            timestamp: Utc::now(),
            processing_time_ms,
            cached: false,
            error: None,
        };

        self.stats.record_success(result.confidence, elapsed);
        if cache_enabled {
            self.cache.insert(fingerprint, result.clone());
        }
        Ok(result)
    }

    /// Classify many filenames, preserving input order
    pub async fn predict_batch(&self, filenames: &[String]) -> Result<BatchClassificationResult> {
        self.predict_batch_with(filenames, BatchOptions::default())
            .await
    }

    /// Batch classification with a soft timeout and cooperative
    /// cancellation. Chunks run as blocking sub-tasks; both signals are
    /// checked between chunks, never mid-item.
    pub async fn predict_batch_with(
        &self,
        filenames: &[String],
        options: BatchOptions,
    ) -> Result<BatchClassificationResult> {
        if !self.config.enable_batch_processing {
            return Err(MediaButlerError::ConfigurationError {
                message: "Batch processing is disabled".to_string(),
                key: Some("enable_batch_processing".to_string()),
            });
        }
        if !self.is_ready() {
            return Err(MediaButlerError::ModelNotLoaded);
        }

        let started = Instant::now();
        let mut results: Vec<ClassificationResult> = Vec::with_capacity(filenames.len());
        let mut partially_completed = false;

        for chunk in filenames.chunks(self.config.max_batch_size.max(1)) {
            if let Some(ref signal) = options.cancellation {
                if signal.is_cancelled() {
                    tracing::info!(
                        completed = results.len(),
                        total = filenames.len(),
                        "Batch cancelled"
                    );
                    return Err(MediaButlerError::Cancelled);
                }
            }
            if let Some(timeout) = options.timeout {
                if started.elapsed() >= timeout {
                    partially_completed = true;
                    tracing::warn!(
                        completed = results.len(),
                        total = filenames.len(),
                        "Batch soft timeout expired"
                    );
                    break;
                }
            }

            let service = self.clone();
            let chunk_names: Vec<String> = chunk.to_vec();
            let chunk_results = tokio::task::spawn_blocking(move || {
                chunk_names
                    .iter()
                    .map(|filename| {
                        service.predict(filename).unwrap_or_else(|e| {
                            service.failed_result(filename, &e.to_string(), Instant::now())
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .await
            .map_err(|e| MediaButlerError::InferenceFailed(format!("batch task: {e}")))?;
            results.extend(chunk_results);
        }

        let successful = results
            .iter()
            .filter(|r| r.decision != Decision::Failed)
            .count();
        let failed = results.len() - successful;
        Ok(BatchClassificationResult {
            total: results.len(),
            successful,
            failed,
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
            partially_completed,
            results,
        })
    }

    /// Snapshot of the live prediction statistics
    pub fn performance_stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Assess a filename before classification: structure, Italian-content
    /// signals and short recommendations.
    pub fn validate(&self, filename: &str) -> FilenameValidation {
        let tokenization = match self.tokenizer.tokenize(filename) {
            Ok(t) => t,
            Err(e) => {
                return FilenameValidation {
                    complexity: 0.0,
                    detected_patterns: Vec::new(),
                    italian: ItalianIndicators {
                        has_italian_language: false,
                        known_italian_group: None,
                        italian_keywords: Vec::new(),
                    },
                    processing_confidence: 0.0,
                    recommendations: vec![format!("Not classifiable: {e}")],
                }
            }
        };
        let features = self.engineer.extract(&tokenization);

        let mut detected_patterns = Vec::new();
        if let Some(ref episode) = tokenization.episode {
            detected_patterns.push(format!("episode:{:?}", episode.pattern));
        }
        if let Some(ref quality) = tokenization.quality {
            if quality.resolution.is_some() {
                detected_patterns.push("resolution".to_string());
            }
            if quality.source.is_some() {
                detected_patterns.push("source".to_string());
            }
            if quality.video_codec.is_some() {
                detected_patterns.push("video_codec".to_string());
            }
            if !quality.language_codes.is_empty() {
                detected_patterns.push("language".to_string());
            }
        }
        if tokenization.release_group.is_some() {
            detected_patterns.push("release_group".to_string());
        }

        let has_italian_language = tokenization
            .quality
            .as_ref()
            .map(|q| {
                q.language_codes
                    .iter()
                    .any(|c| c == "ITA" || c == "ITALIAN")
            })
            .unwrap_or(false);
        let known_italian_group = tokenization
            .release_group
            .as_ref()
            .filter(|g| is_italian_group(g))
            .cloned();
        let italian_keywords: Vec<String> = tokenization
            .series_tokens
            .iter()
            .filter(|t| ITALIAN_KEYWORDS.contains(t.as_str()))
            .cloned()
            .collect();

        let complexity = features.patterns.complexity;
        let mut confidence: f64 = 0.4;
        if tokenization.episode.is_some() {
            confidence += 0.2;
        }
        if features.patterns.has_quality {
            confidence += 0.15;
        }
        if tokenization.release_group.is_some() {
            confidence += 0.1;
        }
        if !tokenization.series_tokens.is_empty() {
            confidence += 0.1;
        }
        if complexity > 8.0 {
            confidence -= 0.2;
        }
        let processing_confidence = confidence.clamp(0.0, 1.0);

        let mut recommendations = Vec::new();
        if tokenization.series_tokens.is_empty() {
            recommendations.push("No series tokens found".to_string());
        }
        if tokenization.episode.is_none() {
            recommendations.push("No episode designator detected".to_string());
        }
        if !features.patterns.has_quality {
            recommendations.push("No quality markers found".to_string());
        }
        if tokenization.extension.is_empty() {
            recommendations.push("Unrecognized file extension".to_string());
        }
        if tokenization.release_group.is_none() {
            recommendations.push("No release group suffix".to_string());
        }
        if complexity > 8.0 {
            recommendations.push("Highly irregular filename structure".to_string());
        }
        recommendations.truncate(5);

        FilenameValidation {
            complexity,
            detected_patterns,
            italian: ItalianIndicators {
                has_italian_language,
                known_italian_group,
                italian_keywords,
            },
            processing_confidence,
            recommendations,
        }
    }

    /// Map a confidence to a routing decision. A category-specific
    /// registry threshold overrides the global auto-classify boundary.
    fn decide(&self, confidence: f64, category: &str) -> Decision {
        let auto_threshold = self
            .registry
            .threshold(category)
            .unwrap_or(self.config.auto_classify_threshold);
        if confidence >= auto_threshold {
            Decision::AutoClassify
        } else if confidence >= self.config.suggestion_threshold {
            Decision::SuggestWithAlternatives
        } else if confidence >= self.config.manual_categorization_threshold {
            Decision::RequestManualCategorization
        } else {
            Decision::Unreliable
        }
    }

    fn failed_result(&self, filename: &str, error: &str, started: Instant) -> ClassificationResult {
        ClassificationResult {
            filename: filename.to_string(),
            predicted_category: None,
            confidence: 0.0,
            alternatives: Vec::new(),
            decision: Decision::Failed,
            feature_highlights: Vec::new(),
            model_version: self.model_version(),
            timestamp: Utc::now(),
            processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            cached: false,
            error: Some(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::train_model;
    use crate::training::{SampleSource, TrainingSample};

    fn sample(filename: &str, category: &str) -> TrainingSample {
        TrainingSample::new(filename, category, 1.0, SampleSource::ManuallyCurated)
    }

    fn training_set() -> Vec<TrainingSample> {
        let mut samples = Vec::new();
        for (series, category) in [
            ("Il.Trono.Di.Spade", "IL TRONO DI SPADE"),
            ("One.Piece", "ONE PIECE"),
            ("Breaking.Bad", "BREAKING BAD"),
        ] {
            for episode in 1..=4 {
                samples.push(sample(
                    &format!("{series}.S02E0{episode}.ITA.1080p.WEB-DL.x264-UBi.mkv"),
                    category,
                ));
            }
        }
        samples
    }

    fn ready_service() -> PredictionService {
        let config = ClassifierConfig::default();
        let model = train_model(&training_set(), &config, "1.0.0").unwrap();
        let service = PredictionService::new(config, Arc::new(CategoryRegistry::new()));
        service.load_model(model).unwrap();
        service
    }

    #[test]
    fn test_uninitialized_service_rejects_predict() {
        let service = PredictionService::new(
            ClassifierConfig::default(),
            Arc::new(CategoryRegistry::new()),
        );
        assert!(!service.is_ready());
        assert!(matches!(
            service.predict("Show.S01E01.mkv"),
            Err(MediaButlerError::ModelNotLoaded)
        ));
    }

    #[test]
    fn test_load_unload_state_machine() {
        let service = ready_service();
        assert!(service.is_ready());
        assert!(service.predict("Breaking.Bad.S02E01.mkv").is_ok());

        service.unload();
        assert!(!service.is_ready());
        assert!(matches!(
            service.predict("Breaking.Bad.S02E01.mkv"),
            Err(MediaButlerError::ModelNotLoaded)
        ));
    }

    #[test]
    fn test_model_labels_registered() {
        let service = ready_service();
        assert!(service.registry().exists("IL TRONO DI SPADE"));
        assert!(service.registry().exists("ONE PIECE"));
        assert!(service.registry().exists("BREAKING BAD"));
    }

    #[test]
    fn test_empty_filename_is_failed_result() {
        let service = ready_service();
        let result = service.predict("").unwrap();
        assert_eq!(result.decision, Decision::Failed);
        assert!(result.predicted_category.is_none());
        assert!(result.error.is_some());
    }

    #[test]
    fn test_successful_prediction_shape() {
        let service = ready_service();
        let result = service
            .predict("Il.Trono.Di.Spade.S02E05.ITA.1080p.WEB-DL.x264-UBi.mkv")
            .unwrap();

        assert!(result.predicted_category.is_some());
        assert!((0.0..=1.0).contains(&result.confidence));
        assert!(result.alternatives.len() <= 3);
        assert_eq!(result.model_version.as_deref(), Some("1.0.0"));
        assert!(!result.cached);
        assert!(!result.feature_highlights.is_empty());
        assert_ne!(result.decision, Decision::Failed);
    }

    #[test]
    fn test_cache_hit_annotated() {
        let service = ready_service();
        let filename = "One.Piece.1089.Sub.ITA.720p.WEB-DLMux.x264-UBi.mkv";

        let first = service.predict(filename).unwrap();
        assert!(!first.cached);

        let second = service.predict(filename).unwrap();
        assert!(second.cached);
        assert_eq!(second.predicted_category, first.predicted_category);

        let stats = service.performance_stats();
        assert_eq!(stats.cache_hits, 1);
        // Cache key is case-insensitive.
        let third = service.predict(&filename.to_uppercase()).unwrap();
        assert!(third.cached);
    }

    #[test]
    fn test_decision_thresholds() {
        let service = ready_service();
        assert_eq!(service.decide(0.9, "IL TRONO DI SPADE"), Decision::AutoClassify);
        assert_eq!(
            service.decide(0.6, "IL TRONO DI SPADE"),
            Decision::SuggestWithAlternatives
        );
        assert_eq!(
            service.decide(0.3, "IL TRONO DI SPADE"),
            Decision::RequestManualCategorization
        );
        assert_eq!(service.decide(0.1, "IL TRONO DI SPADE"), Decision::Unreliable);
    }

    #[test]
    fn test_category_threshold_override() {
        let service = ready_service();
        service
            .registry()
            .update(
                "ONE PIECE",
                crate::registry::CategoryPatch {
                    confidence_threshold: Some(0.6),
                    ..Default::default()
                },
            )
            .unwrap();
        // 0.7 is below the global 0.85 but above the category's 0.6.
        assert_eq!(service.decide(0.7, "ONE PIECE"), Decision::AutoClassify);
        assert_eq!(
            service.decide(0.7, "BREAKING BAD"),
            Decision::SuggestWithAlternatives
        );
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_counts() {
        let service = ready_service();
        let filenames: Vec<String> = vec![
            "Il.Trono.Di.Spade.S02E05.ITA.1080p.WEB-DL.x264-UBi.mkv".to_string(),
            "".to_string(),
            "One.Piece.1089.Sub.ITA.720p.WEB-DLMux.x264-UBi.mkv".to_string(),
        ];

        let batch = service.predict_batch(&filenames).await.unwrap();
        assert_eq!(batch.total, 3);
        assert_eq!(batch.failed, 1);
        assert_eq!(batch.successful, 2);
        assert_eq!(batch.results.len(), 3);
        assert_eq!(batch.results[0].filename, filenames[0]);
        assert_eq!(batch.results[1].decision, Decision::Failed);
        assert_eq!(batch.results[2].filename, filenames[2]);
        assert!(!batch.partially_completed);
    }

    #[tokio::test]
    async fn test_batch_cancellation() {
        let service = ready_service();
        let signal = CancellationSignal::new();
        signal.cancel();

        let filenames = vec!["Show.S01E01.mkv".to_string()];
        let result = service
            .predict_batch_with(
                &filenames,
                BatchOptions {
                    cancellation: Some(signal),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(MediaButlerError::Cancelled)));
    }

    #[tokio::test]
    async fn test_batch_soft_timeout_partial() {
        let service = ready_service();
        let filenames: Vec<String> = (0..200)
            .map(|i| format!("Some.Show.S01E{:02}.1080p.WEB-DL.x264-UBi.mkv", i % 99))
            .collect();

        let result = service
            .predict_batch_with(
                &filenames,
                BatchOptions {
                    timeout: Some(Duration::ZERO),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(result.partially_completed);
        assert!(result.results.len() < filenames.len());
    }

    #[tokio::test]
    async fn test_batch_disabled_by_config() {
        let mut config = ClassifierConfig::default();
        config.enable_batch_processing = false;
        let model = train_model(&training_set(), &config, "1.0.0").unwrap();
        let service = PredictionService::new(config, Arc::new(CategoryRegistry::new()));
        service.load_model(model).unwrap();

        let result = service.predict_batch(&["Show.S01E01.mkv".to_string()]).await;
        assert!(matches!(
            result,
            Err(MediaButlerError::ConfigurationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_batch_requires_model() {
        let service = PredictionService::new(
            ClassifierConfig::default(),
            Arc::new(CategoryRegistry::new()),
        );
        let result = service.predict_batch(&["Show.S01E01.mkv".to_string()]).await;
        assert!(matches!(result, Err(MediaButlerError::ModelNotLoaded)));
    }

    #[test]
    fn test_stats_recording() {
        let service = ready_service();
        service.predict("Breaking.Bad.S02E02.ITA.1080p.WEB-DL.x264-UBi.mkv").unwrap();
        service.predict("").unwrap();

        let stats = service.performance_stats();
        assert_eq!(stats.total_predictions, 2);
        assert_eq!(stats.successful_predictions, 1);
        assert_eq!(stats.failed_predictions, 1);
    }

    #[test]
    fn test_validate_italian_content() {
        let service = ready_service();
        let validation =
            service.validate("Il.Trono.Di.Spade.8x04.L.Ultimo.Degli.Stark.ITA.WEBMux.x264-UBi.mkv");

        assert!(validation.italian.has_italian_language);
        assert_eq!(validation.italian.known_italian_group.as_deref(), Some("UBi"));
        assert!(validation
            .italian
            .italian_keywords
            .contains(&"il".to_string()));
        assert!(validation.processing_confidence > 0.5);
        assert!(validation.recommendations.len() <= 5);
        assert!(validation
            .detected_patterns
            .iter()
            .any(|p| p.starts_with("episode:")));
    }

    #[test]
    fn test_validate_plain_filename() {
        let service = ready_service();
        let validation = service.validate("somevideo.mkv");
        assert!(!validation.italian.has_italian_language);
        assert!(validation.recommendations.iter().any(|r| r.contains("episode")));
        assert!(validation.processing_confidence < 0.7);
    }
}
