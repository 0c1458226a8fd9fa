//! Configuration for the MediaButler classification core.
//!
//! Unified configuration loading with environment variable parsing,
//! validation and `.env` file support. All environment variables use the
//! `MEDIA_BUTLER_` prefix. Override hierarchy: defaults < .env < environment.

use crate::error::MediaButlerError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Configuration loader trait
///
/// Standardized methods for loading and validating configuration from
/// environment variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables with defaults for
    /// missing optional values.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if an environment variable value
    /// cannot be parsed.
    fn from_env() -> Result<Self, MediaButlerError>;

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` if any validation check fails.
    fn validate(&self) -> Result<(), MediaButlerError>;
}

/// Load a `.env` file if present. Missing files are not an error.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Parse an optional environment variable, falling back to a default
pub fn parse_env_var<T: FromStr>(key: &str, default: T) -> Result<T, MediaButlerError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse::<T>().map_err(|_| {
            MediaButlerError::configuration(format!("Cannot parse value '{raw}'"), key)
        }),
        Err(_) => Ok(default),
    }
}

/// Top-level configuration for the classification core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Directory where model files live
    pub model_path: PathBuf,
    /// Version tag of the model the service should load
    pub active_model_version: String,
    /// Confidence at or above which a prediction is auto-classified
    pub auto_classify_threshold: f64,
    /// Confidence at or above which alternatives are suggested
    pub suggestion_threshold: f64,
    /// Confidence at or above which manual categorization is requested
    pub manual_categorization_threshold: f64,
    /// Soft time budget for a batch classification call
    pub max_classification_time_ms: u64,
    /// Maximum number of alternative predictions returned
    pub max_alternative_predictions: usize,
    /// Whether batch prediction is enabled
    pub enable_batch_processing: bool,
    /// Chunk size for batch prediction
    pub max_batch_size: usize,
    /// Whether automatic retraining is enabled
    pub enable_auto_retraining: bool,
    /// Number of new samples that triggers retraining
    pub retraining_threshold: usize,
    pub tokenization: TokenizationConfig,
    pub training: TrainingConfig,
    pub features: FeatureConfig,
    pub csv: CsvConfig,
}

/// Tokenizer behavior switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizationConfig {
    pub normalize_separators: bool,
    pub remove_quality: bool,
    pub remove_language: bool,
    pub remove_release_tags: bool,
    pub min_token_length: usize,
}

/// Training pipeline parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub train_ratio: f64,
    pub validation_ratio: f64,
    pub max_iterations: usize,
    pub learning_rate: f64,
    pub use_early_stopping: bool,
    pub minimum_accuracy: f64,
}

/// Feature engineering switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub enable_episode: bool,
    pub enable_quality: bool,
    pub enable_extension: bool,
    pub enable_prediction_cache: bool,
}

/// CSV import options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvConfig {
    pub separator: char,
    pub normalize_category_names: bool,
    pub skip_duplicates: bool,
    pub validate_extensions: bool,
    /// Maximum number of samples to import; 0 means unlimited
    pub max_samples: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models"),
            active_model_version: "1.0.0".to_string(),
            auto_classify_threshold: 0.85,
            suggestion_threshold: 0.50,
            manual_categorization_threshold: 0.25,
            max_classification_time_ms: 500,
            max_alternative_predictions: 3,
            enable_batch_processing: true,
            max_batch_size: 50,
            enable_auto_retraining: true,
            retraining_threshold: 100,
            tokenization: TokenizationConfig::default(),
            training: TrainingConfig::default(),
            features: FeatureConfig::default(),
            csv: CsvConfig::default(),
        }
    }
}

impl Default for TokenizationConfig {
    fn default() -> Self {
        Self {
            normalize_separators: true,
            remove_quality: true,
            remove_language: true,
            remove_release_tags: true,
            min_token_length: 2,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            train_ratio: 0.70,
            validation_ratio: 0.20,
            max_iterations: 100,
            learning_rate: 0.10,
            use_early_stopping: true,
            minimum_accuracy: 0.75,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            enable_episode: true,
            enable_quality: true,
            enable_extension: true,
            enable_prediction_cache: true,
        }
    }
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            separator: ';',
            normalize_category_names: true,
            skip_duplicates: true,
            validate_extensions: true,
            max_samples: 0,
        }
    }
}

impl ConfigLoader for ClassifierConfig {
    fn from_env() -> Result<Self, MediaButlerError> {
        let defaults = ClassifierConfig::default();

        let model_path = std::env::var("MEDIA_BUTLER_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);
        let active_model_version = std::env::var("MEDIA_BUTLER_ACTIVE_MODEL_VERSION")
            .unwrap_or(defaults.active_model_version);

        Ok(Self {
            model_path,
            active_model_version,
            auto_classify_threshold: parse_env_var(
                "MEDIA_BUTLER_AUTO_CLASSIFY_THRESHOLD",
                defaults.auto_classify_threshold,
            )?,
            suggestion_threshold: parse_env_var(
                "MEDIA_BUTLER_SUGGESTION_THRESHOLD",
                defaults.suggestion_threshold,
            )?,
            manual_categorization_threshold: parse_env_var(
                "MEDIA_BUTLER_MANUAL_CATEGORIZATION_THRESHOLD",
                defaults.manual_categorization_threshold,
            )?,
            max_classification_time_ms: parse_env_var(
                "MEDIA_BUTLER_MAX_CLASSIFICATION_TIME_MS",
                defaults.max_classification_time_ms,
            )?,
            max_alternative_predictions: parse_env_var(
                "MEDIA_BUTLER_MAX_ALTERNATIVE_PREDICTIONS",
                defaults.max_alternative_predictions,
            )?,
            enable_batch_processing: parse_env_var(
                "MEDIA_BUTLER_ENABLE_BATCH_PROCESSING",
                defaults.enable_batch_processing,
            )?,
            max_batch_size: parse_env_var("MEDIA_BUTLER_MAX_BATCH_SIZE", defaults.max_batch_size)?,
            enable_auto_retraining: parse_env_var(
                "MEDIA_BUTLER_ENABLE_AUTO_RETRAINING",
                defaults.enable_auto_retraining,
            )?,
            retraining_threshold: parse_env_var(
                "MEDIA_BUTLER_RETRAINING_THRESHOLD",
                defaults.retraining_threshold,
            )?,
            tokenization: TokenizationConfig::from_env()?,
            training: TrainingConfig::from_env()?,
            features: FeatureConfig::from_env()?,
            csv: CsvConfig::from_env()?,
        })
    }

    fn validate(&self) -> Result<(), MediaButlerError> {
        for (key, value) in [
            ("auto_classify_threshold", self.auto_classify_threshold),
            ("suggestion_threshold", self.suggestion_threshold),
            (
                "manual_categorization_threshold",
                self.manual_categorization_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MediaButlerError::configuration(
                    format!("Threshold must be in [0, 1], got {value}"),
                    key,
                ));
            }
        }
        if self.auto_classify_threshold < self.suggestion_threshold
            || self.suggestion_threshold < self.manual_categorization_threshold
        {
            return Err(MediaButlerError::configuration(
                "Decision thresholds must be ordered: auto >= suggestion >= manual",
                "auto_classify_threshold",
            ));
        }
        if self.max_batch_size == 0 {
            return Err(MediaButlerError::configuration(
                "Batch size must be positive",
                "max_batch_size",
            ));
        }
        if self.max_alternative_predictions == 0 {
            return Err(MediaButlerError::configuration(
                "Alternative prediction count must be positive",
                "max_alternative_predictions",
            ));
        }
        self.tokenization.validate()?;
        self.training.validate()?;
        self.features.validate()?;
        self.csv.validate()?;
        Ok(())
    }
}

impl ConfigLoader for TokenizationConfig {
    fn from_env() -> Result<Self, MediaButlerError> {
        let defaults = TokenizationConfig::default();
        Ok(Self {
            normalize_separators: parse_env_var(
                "MEDIA_BUTLER_TOKENIZATION_NORMALIZE_SEPARATORS",
                defaults.normalize_separators,
            )?,
            remove_quality: parse_env_var(
                "MEDIA_BUTLER_TOKENIZATION_REMOVE_QUALITY",
                defaults.remove_quality,
            )?,
            remove_language: parse_env_var(
                "MEDIA_BUTLER_TOKENIZATION_REMOVE_LANGUAGE",
                defaults.remove_language,
            )?,
            remove_release_tags: parse_env_var(
                "MEDIA_BUTLER_TOKENIZATION_REMOVE_RELEASE_TAGS",
                defaults.remove_release_tags,
            )?,
            min_token_length: parse_env_var(
                "MEDIA_BUTLER_TOKENIZATION_MIN_TOKEN_LENGTH",
                defaults.min_token_length,
            )?,
        })
    }

    fn validate(&self) -> Result<(), MediaButlerError> {
        if self.min_token_length == 0 {
            return Err(MediaButlerError::configuration(
                "Minimum token length must be at least 1",
                "tokenization.min_token_length",
            ));
        }
        Ok(())
    }
}

impl ConfigLoader for TrainingConfig {
    fn from_env() -> Result<Self, MediaButlerError> {
        let defaults = TrainingConfig::default();
        Ok(Self {
            train_ratio: parse_env_var("MEDIA_BUTLER_TRAINING_TRAIN_RATIO", defaults.train_ratio)?,
            validation_ratio: parse_env_var(
                "MEDIA_BUTLER_TRAINING_VALIDATION_RATIO",
                defaults.validation_ratio,
            )?,
            max_iterations: parse_env_var(
                "MEDIA_BUTLER_TRAINING_MAX_ITERATIONS",
                defaults.max_iterations,
            )?,
            learning_rate: parse_env_var(
                "MEDIA_BUTLER_TRAINING_LEARNING_RATE",
                defaults.learning_rate,
            )?,
            use_early_stopping: parse_env_var(
                "MEDIA_BUTLER_TRAINING_USE_EARLY_STOPPING",
                defaults.use_early_stopping,
            )?,
            minimum_accuracy: parse_env_var(
                "MEDIA_BUTLER_TRAINING_MINIMUM_ACCURACY",
                defaults.minimum_accuracy,
            )?,
        })
    }

    fn validate(&self) -> Result<(), MediaButlerError> {
        if self.train_ratio <= 0.0
            || self.validation_ratio <= 0.0
            || self.train_ratio + self.validation_ratio >= 1.0
        {
            return Err(MediaButlerError::InvalidRatios {
                train: self.train_ratio,
                validation: self.validation_ratio,
            });
        }
        if self.learning_rate <= 0.0 {
            return Err(MediaButlerError::configuration(
                "Learning rate must be positive",
                "training.learning_rate",
            ));
        }
        if self.max_iterations == 0 {
            return Err(MediaButlerError::configuration(
                "Iteration count must be positive",
                "training.max_iterations",
            ));
        }
        if !(0.0..=1.0).contains(&self.minimum_accuracy) {
            return Err(MediaButlerError::configuration(
                "Minimum accuracy must be in [0, 1]",
                "training.minimum_accuracy",
            ));
        }
        Ok(())
    }
}

impl ConfigLoader for FeatureConfig {
    fn from_env() -> Result<Self, MediaButlerError> {
        let defaults = FeatureConfig::default();
        Ok(Self {
            enable_episode: parse_env_var(
                "MEDIA_BUTLER_FEATURES_ENABLE_EPISODE",
                defaults.enable_episode,
            )?,
            enable_quality: parse_env_var(
                "MEDIA_BUTLER_FEATURES_ENABLE_QUALITY",
                defaults.enable_quality,
            )?,
            enable_extension: parse_env_var(
                "MEDIA_BUTLER_FEATURES_ENABLE_EXTENSION",
                defaults.enable_extension,
            )?,
            enable_prediction_cache: parse_env_var(
                "MEDIA_BUTLER_FEATURES_ENABLE_PREDICTION_CACHE",
                defaults.enable_prediction_cache,
            )?,
        })
    }

    fn validate(&self) -> Result<(), MediaButlerError> {
        Ok(())
    }
}

impl ConfigLoader for CsvConfig {
    fn from_env() -> Result<Self, MediaButlerError> {
        let defaults = CsvConfig::default();
        Ok(Self {
            separator: parse_env_var("MEDIA_BUTLER_CSV_SEPARATOR", defaults.separator)?,
            normalize_category_names: parse_env_var(
                "MEDIA_BUTLER_CSV_NORMALIZE_CATEGORY_NAMES",
                defaults.normalize_category_names,
            )?,
            skip_duplicates: parse_env_var(
                "MEDIA_BUTLER_CSV_SKIP_DUPLICATES",
                defaults.skip_duplicates,
            )?,
            validate_extensions: parse_env_var(
                "MEDIA_BUTLER_CSV_VALIDATE_EXTENSIONS",
                defaults.validate_extensions,
            )?,
            max_samples: parse_env_var("MEDIA_BUTLER_CSV_MAX_SAMPLES", defaults.max_samples)?,
        })
    }

    fn validate(&self) -> Result<(), MediaButlerError> {
        if self.separator.is_alphanumeric() {
            return Err(MediaButlerError::configuration(
                "CSV separator must not be alphanumeric",
                "csv.separator",
            ));
        }
        Ok(())
    }
}
