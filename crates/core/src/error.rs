//! Error types for the MediaButler classification core.
//!
//! Every fallible operation in the workspace returns [`MediaButlerError`];
//! there is no exceptional control flow and no panics outside of tests.

/// Result type alias for MediaButler operations
pub type Result<T> = std::result::Result<T, MediaButlerError>;

/// Unified error type for the classification core
#[derive(Debug, thiserror::Error)]
pub enum MediaButlerError {
    // ---- input errors -------------------------------------------------
    #[error("Invalid filename: {reason}")]
    InvalidFilename { reason: String },

    #[error("Dataset is empty")]
    EmptyDataset,

    #[error("Invalid split ratios: train={train}, validation={validation} (need 0 < train, 0 < validation, train + validation < 1)")]
    InvalidRatios { train: f64, validation: f64 },

    // ---- parse errors -------------------------------------------------
    #[error("Filename '{filename}' is not tokenizable: {reason}")]
    Unparseable { filename: String, reason: String },

    // ---- schema errors ------------------------------------------------
    #[error("Feature schema mismatch: model expects {expected}, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("Label vocabulary mismatch: model has {actual} labels, expected {expected}")]
    LabelVocabularyMismatch { expected: usize, actual: usize },

    // ---- model errors -------------------------------------------------
    #[error("No model loaded")]
    ModelNotLoaded,

    #[error("Incompatible model format: {0}")]
    IncompatibleFormat(String),

    #[error("Corrupt model file: {0}")]
    CorruptModel(String),

    #[error("Model validation failed: {0}")]
    ModelValidationFailed(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    // ---- registry errors ----------------------------------------------
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Category already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid category definition: {0}")]
    InvalidDefinition(String),

    #[error("Category not found: {0}")]
    NotFound(String),

    #[error("Source and target category are the same: {0}")]
    SameCategory(String),

    #[error("Invalid category name: {0}")]
    InvalidName(String),

    // ---- cooperative control ------------------------------------------
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    // ---- ambient ------------------------------------------------------
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        key: Option<String>,
    },

    #[error("Validation error on '{field}': {message}")]
    ValidationError { message: String, field: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl MediaButlerError {
    /// Construct a validation error bound to a specific field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: field.into(),
        }
    }

    /// Construct a configuration error bound to a specific env key
    pub fn configuration(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// True when the error represents a caller-side input problem rather
    /// than an internal failure
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFilename { .. }
                | Self::EmptyDataset
                | Self::InvalidRatios { .. }
                | Self::InvalidName(_)
        )
    }
}

impl From<serde_json::Error> for MediaButlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
