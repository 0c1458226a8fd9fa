//! Model representation, the swappable inference boundary and training.
//!
//! A [`Model`] is the persisted artifact: label vocabulary, opaque weight
//! bytes and metadata. Inference happens behind [`InferenceBackend`] so a
//! rule-based and a learned implementation are interchangeable; the shipped
//! backend is a multinomial logistic regression over a deterministic
//! feature-hashing projection.

use crate::features::FeatureVector;
use crate::training::TrainingSample;
use chrono::{DateTime, Utc};
use media_butler_core::config::ClassifierConfig;
use media_butler_core::error::MediaButlerError;
use media_butler_core::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Default hashed feature dimension
pub const DEFAULT_FEATURE_DIM: usize = 256;

/// Architecture identifier of the shipped backend; must fit the 16-byte
/// header field of the model file format.
pub const ARCHITECTURE_ID: &str = "mb-logreg-v1";

/// A trained model, immutable once constructed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub architecture_id: String,
    pub version: String,
    pub algorithm: String,
    pub hyperparameters: HashMap<String, String>,
    /// Ordered label vocabulary; at least two labels
    pub labels: Vec<String>,
    /// Opaque serialized weights
    pub weights: Vec<u8>,
    pub training_metrics: HashMap<String, f64>,
    pub validation_metrics: HashMap<String, f64>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// Structural sanity check
    pub fn validate(&self) -> Result<()> {
        if self.labels.len() < 2 {
            return Err(MediaButlerError::ModelValidationFailed(format!(
                "label vocabulary has {} labels, need at least 2",
                self.labels.len()
            )));
        }
        if self.architecture_id.len() > 16 {
            return Err(MediaButlerError::ModelValidationFailed(format!(
                "architecture id '{}' exceeds 16 bytes",
                self.architecture_id
            )));
        }
        if self.version.len() > 16 {
            return Err(MediaButlerError::ModelValidationFailed(format!(
                "model version '{}' exceeds 16 bytes",
                self.version
            )));
        }
        Ok(())
    }

    /// Deserialize the weight blob into the shipped backend
    pub fn backend(&self) -> Result<LogisticBackend> {
        LogisticBackend::from_bytes(&self.weights)
    }
}

/// Deterministic projection of named features into a fixed-size vector.
///
/// Feature hashing: each feature name maps to a bucket through sha256, and
/// the bucket accumulates the feature value. The projected vector is
/// L2-normalized so magnitudes stay comparable across filenames.
#[derive(Debug, Clone)]
pub struct FeatureProjector {
    dim: usize,
}

impl Default for FeatureProjector {
    fn default() -> Self {
        Self::new(DEFAULT_FEATURE_DIM)
    }
}

impl FeatureProjector {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn project(&self, features: &FeatureVector) -> Result<Array1<f32>> {
        let names = features.feature_names();
        let values = features.to_array();
        let mut projected = vec![0.0f32; self.dim];
        for (name, value) in names.iter().zip(values) {
            if !value.is_finite() {
                return Err(MediaButlerError::InferenceFailed(format!(
                    "feature '{name}' is not finite"
                )));
            }
            projected[hash_bucket(name, self.dim)] += value;
        }
        media_butler_core::math::normalize_vector(&mut projected);
        Ok(Array1::from_vec(projected))
    }
}

/// Stable bucket index for a feature name
fn hash_bucket(name: &str, dim: usize) -> usize {
    let digest = Sha256::digest(name.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (u64::from_le_bytes(bytes) % dim as u64) as usize
}

/// Swappable inference boundary: label vocabulary plus class probabilities
pub trait InferenceBackend: Send + Sync + std::fmt::Debug {
    fn labels(&self) -> &[String];

    fn feature_dim(&self) -> usize;

    /// Class probabilities aligned with [`Self::labels`]; sums to 1
    fn predict_probabilities(&self, features: &Array1<f32>) -> Result<Array1<f32>>;
}

/// Multinomial logistic regression over hashed features
#[derive(Debug, Clone)]
pub struct LogisticBackend {
    labels: Vec<String>,
    /// [num_labels x feature_dim]
    weights: Array2<f32>,
    bias: Array1<f32>,
}

/// Bincode mirror of [`LogisticBackend`] for the opaque weight blob
#[derive(Debug, Serialize, Deserialize)]
struct SerializableWeights {
    dim: usize,
    labels: Vec<String>,
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl LogisticBackend {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mirror = SerializableWeights {
            dim: self.weights.ncols(),
            labels: self.labels.clone(),
            weights: self.weights.iter().copied().collect(),
            bias: self.bias.to_vec(),
        };
        bincode::serialize(&mirror).map_err(|e| MediaButlerError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mirror: SerializableWeights = bincode::deserialize(bytes)
            .map_err(|e| MediaButlerError::CorruptModel(format!("weight blob: {e}")))?;
        let rows = mirror.labels.len();
        let weights = Array2::from_shape_vec((rows, mirror.dim), mirror.weights)
            .map_err(|e| MediaButlerError::CorruptModel(format!("weight shape: {e}")))?;
        if mirror.bias.len() != rows {
            return Err(MediaButlerError::CorruptModel(format!(
                "bias length {} does not match {} labels",
                mirror.bias.len(),
                rows
            )));
        }
        Ok(Self {
            labels: mirror.labels,
            weights,
            bias: Array1::from_vec(mirror.bias),
        })
    }
}

impl InferenceBackend for LogisticBackend {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn feature_dim(&self) -> usize {
        self.weights.ncols()
    }

    fn predict_probabilities(&self, features: &Array1<f32>) -> Result<Array1<f32>> {
        if features.len() != self.feature_dim() {
            return Err(MediaButlerError::SchemaMismatch {
                expected: self.feature_dim(),
                actual: features.len(),
            });
        }
        let logits = self.weights.dot(features) + &self.bias;
        Ok(softmax(&logits))
    }
}

/// Numerically stable softmax
fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Array1<f32> = logits.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    if sum > 0.0 {
        exp / sum
    } else {
        Array1::from_elem(logits.len(), 1.0 / logits.len() as f32)
    }
}

/// Train a model over labeled samples using full-batch gradient descent.
///
/// Deterministic: weights start at zero and samples are visited in input
/// order, so identical inputs produce identical models.
pub fn train_model(
    samples: &[TrainingSample],
    config: &ClassifierConfig,
    version: &str,
) -> Result<Model> {
    if samples.is_empty() {
        return Err(MediaButlerError::EmptyDataset);
    }

    let mut labels: Vec<String> = samples.iter().map(|s| s.category.clone()).collect();
    labels.sort();
    labels.dedup();
    if labels.len() < 2 {
        return Err(MediaButlerError::ModelValidationFailed(format!(
            "training data has {} distinct labels, need at least 2",
            labels.len()
        )));
    }

    let tokenizer = crate::tokenizer::Tokenizer::new(config.tokenization.clone());
    let engineer = crate::features::FeatureEngineer::new(config.features.clone());
    let projector = FeatureProjector::default();

    let mut xs: Vec<Array1<f32>> = Vec::with_capacity(samples.len());
    let mut ys: Vec<usize> = Vec::with_capacity(samples.len());
    for sample in samples {
        let tokenization = tokenizer.tokenize(&sample.filename)?;
        let features = engineer.extract(&tokenization);
        xs.push(projector.project(&features)?);
        let label_idx = labels
            .binary_search(&sample.category)
            .map_err(|_| MediaButlerError::UnknownCategory(sample.category.clone()))?;
        ys.push(label_idx);
    }

    let num_labels = labels.len();
    let dim = projector.dim();
    let lr = config.training.learning_rate as f32;
    let n = xs.len() as f32;

    let mut weights = Array2::<f32>::zeros((num_labels, dim));
    let mut bias = Array1::<f32>::zeros(num_labels);

    let mut best_accuracy = 0.0f64;
    let mut stale_iterations = 0usize;
    let mut final_loss = 0.0f64;
    let mut iterations_run = 0usize;

    for iteration in 0..config.training.max_iterations {
        let mut grad_w = Array2::<f32>::zeros((num_labels, dim));
        let mut grad_b = Array1::<f32>::zeros(num_labels);
        let mut loss = 0.0f64;
        let mut correct = 0usize;

        for (x, &y) in xs.iter().zip(&ys) {
            let logits = weights.dot(x) + &bias;
            let probs = softmax(&logits);

            let predicted = argmax(&probs);
            if predicted == y {
                correct += 1;
            }
            loss -= f64::from(probs[y].max(1e-12).ln());

            for label in 0..num_labels {
                let error = probs[label] - f32::from(u8::from(label == y));
                grad_b[label] += error / n;
                let mut row = grad_w.row_mut(label);
                row.scaled_add(error / n, x);
            }
        }

        weights.scaled_add(-lr, &grad_w);
        bias.scaled_add(-lr, &grad_b);

        let accuracy = correct as f64 / xs.len() as f64;
        final_loss = loss / f64::from(n);
        iterations_run = iteration + 1;

        if iteration % 10 == 0 {
            tracing::debug!(
                iteration,
                loss = final_loss,
                accuracy,
                "Training iteration"
            );
        }

        if accuracy > best_accuracy + 1e-4 {
            best_accuracy = accuracy;
            stale_iterations = 0;
        } else {
            stale_iterations += 1;
        }
        if config.training.use_early_stopping
            && best_accuracy >= config.training.minimum_accuracy
            && stale_iterations >= 5
        {
            tracing::debug!(iteration, accuracy = best_accuracy, "Early stopping");
            break;
        }
    }

    let backend = LogisticBackend {
        labels: labels.clone(),
        weights,
        bias,
    };

    let mut hyperparameters = HashMap::new();
    hyperparameters.insert("feature_dim".to_string(), dim.to_string());
    hyperparameters.insert(
        "learning_rate".to_string(),
        config.training.learning_rate.to_string(),
    );
    hyperparameters.insert(
        "max_iterations".to_string(),
        config.training.max_iterations.to_string(),
    );

    let mut training_metrics = HashMap::new();
    training_metrics.insert("accuracy".to_string(), best_accuracy);
    training_metrics.insert("loss".to_string(), final_loss);
    training_metrics.insert("iterations".to_string(), iterations_run as f64);
    training_metrics.insert("samples".to_string(), f64::from(n));

    let model = Model {
        architecture_id: ARCHITECTURE_ID.to_string(),
        version: version.to_string(),
        algorithm: "logistic_regression".to_string(),
        hyperparameters,
        labels,
        weights: backend.to_bytes()?,
        training_metrics,
        validation_metrics: HashMap::new(),
        created_at: Utc::now(),
    };
    model.validate()?;

    tracing::info!(
        version = %model.version,
        labels = model.labels.len(),
        accuracy = best_accuracy,
        iterations = iterations_run,
        "Trained model"
    );
    Ok(model)
}

fn argmax(values: &Array1<f32>) -> usize {
    let mut best = 0;
    for (idx, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = idx;
        }
    }
    best
}
