//! # MediaButler Classify
//!
//! Classification core for media filenames: parses a release filename
//! (predominantly Italian TV and anime releases) and emits a normalized
//! series category, a calibrated confidence, a routing decision and ranked
//! alternatives.
//!
//! ## Modules
//!
//! - `registry`: Canonical categories, aliases and thresholds
//! - `tokenizer`: Structural filename parsing
//! - `features`: Tokenization to dense feature vector
//! - `model`: Model record, inference boundary, training
//! - `predictor`: Schema-checked prediction with ranked alternatives
//! - `service`: End-to-end prediction pipeline with caching and batching
//! - `cache`: Bounded LRU prediction cache
//! - `stats`: Atomic prediction statistics
//! - `evaluation`: Accuracy, calibration, cross-validation, benchmarking
//! - `training`: Training data store, splits, validation, CSV
//! - `model_store`: Checksum-verified model persistence

pub mod cache;
pub mod evaluation;
pub mod features;
pub mod model;
pub mod model_store;
pub mod predictor;
pub mod registry;
pub mod service;
pub mod stats;
pub mod tokenizer;
pub mod training;

pub use cache::{canonical_fingerprint, PredictionCache};
pub use evaluation::{
    AccuracyMetrics, BenchmarkConfig, CalibrationBias, ConfidenceAnalysis, ConfusionMatrix,
    CrossValidationResults, Evaluator, ModelQualityReport, PerformanceBenchmark,
    ProductionReadiness, QualityReportConfig, StabilityBand, TestCase,
};
pub use features::{FeatureEngineer, FeatureVector};
pub use model::{train_model, FeatureProjector, InferenceBackend, LogisticBackend, Model};
pub use model_store::{ModelMetadata, ModelPersistenceInfo, ModelStore, ModelValidationConfig};
pub use predictor::{Prediction, Predictor, RankedLabel};
pub use registry::{
    CategoryDefinition, CategoryPatch, CategoryRegistry, CategorySuggestion, CategoryType,
    MergeResult, NameValidation,
};
pub use service::{
    BatchClassificationResult, BatchOptions, ClassificationResult, Decision, FilenameValidation,
    PredictionService,
};
pub use stats::{PerformanceStats, StatsSnapshot};
pub use tokenizer::{EpisodeInfo, EpisodePattern, QualityInfo, QualityTier, Tokenization, Tokenizer};
pub use training::{
    AddOutcome, CsvImportResult, SampleSource, TrainingDataSplit, TrainingDataStore,
    TrainingDataValidationReport, TrainingSample, ValidationRules,
};

// Re-export the shared foundation so downstream crates need one import.
pub use media_butler_core::{
    CancellationSignal, ClassifierConfig, ConfigLoader, MediaButlerError, Result,
};
