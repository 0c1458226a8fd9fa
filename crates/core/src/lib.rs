//! # MediaButler Core
//!
//! Shared building blocks for the MediaButler classification core.
//!
//! This crate provides the error type, configuration loading, logging
//! initialization, validation utilities, math helpers and cooperative
//! cancellation used across the workspace.
//!
//! ## Modules
//!
//! - `error`: Unified error type and result alias
//! - `config`: Configuration loading and validation
//! - `observability`: Structured logging initialization
//! - `validation`: Validation utilities and shared regex patterns
//! - `math`: Vector operations and summary statistics
//! - `cancellation`: Cooperative cancellation signal

pub mod cancellation;
pub mod config;
pub mod error;
pub mod math;
pub mod observability;
pub mod validation;

pub use cancellation::CancellationSignal;
pub use config::{
    ClassifierConfig, ConfigLoader, CsvConfig, FeatureConfig, TokenizationConfig, TrainingConfig,
    load_dotenv, parse_env_var,
};
pub use error::MediaButlerError;
pub use math::{
    clamp01, cosine_similarity, dot_product, mean, normalize_vector, percentile_sorted, std_dev,
};
pub use observability::{init_logging, LogConfig, LogFormat};
pub use validation::{
    is_known_media_extension, validate_confidence, validate_filename, validate_not_empty,
    validate_split_ratios, validate_string_length, KNOWN_MEDIA_EXTENSIONS,
};

/// Result type alias for MediaButler operations
pub type Result<T> = std::result::Result<T, MediaButlerError>;
