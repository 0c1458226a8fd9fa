//! Model persistence: binary serialization with a trailing sha256
//! checksum, verified on load.
//!
//! File layout (little-endian):
//!
//! ```text
//! offset  0   8   magic           "MBMODEL\0"
//! offset  8   4   format version  u32 (current: 1)
//! offset 12   16  architecture id UTF-8, NUL right-padded
//! offset 28   16  model version   UTF-8, NUL right-padded
//! offset 44   8   created_at      i64 Unix millis
//! offset 52   4   metadata_len    u32
//! offset 56   ..  metadata        UTF-8 JSON
//! next        4   label_count     u32
//!             ..  labels          repeat: u16 len + UTF-8 bytes
//!             4   weights_len     u32
//!             ..  weights blob    opaque
//! tail        32  sha256          over all preceding bytes
//! ```

use crate::features::FeatureEngineer;
use crate::model::Model;
use crate::predictor::Predictor;
use crate::tokenizer::Tokenizer;
use chrono::{TimeZone, Utc};
use media_butler_core::error::MediaButlerError;
use media_butler_core::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 8] = b"MBMODEL\0";
const FORMAT_VERSION: u32 = 1;
const FIXED_FIELD_LEN: usize = 16;
const CHECKSUM_LEN: usize = 32;
/// Every field before the first variable-length block plus the checksum
const MIN_FILE_LEN: usize = 8 + 4 + 16 + 16 + 8 + 4 + 4 + 4 + CHECKSUM_LEN;

/// Metadata block embedded in the model file (and the optional sidecar)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub algorithm: String,
    pub hyperparameters: HashMap<String, String>,
    pub training_metrics: HashMap<String, f64>,
    pub validation_metrics: HashMap<String, f64>,
}

/// Information about a persisted model file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPersistenceInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Hex sha256 over everything before the checksum itself
    pub checksum: String,
    pub version: String,
    pub metadata: ModelMetadata,
}

/// Post-load validation checks beyond the always-on checksum
#[derive(Debug, Clone, Default)]
pub struct ModelValidationConfig {
    /// Expected label vocabulary size
    pub expected_label_count: Option<usize>,
    /// Filenames the loaded model must classify without error
    pub sample_filenames: Vec<String>,
    pub max_model_age_days: Option<i64>,
    /// Lower bound on the training accuracy recorded at save time
    pub minimum_accuracy: Option<f64>,
}

/// Saves and rehydrates trained models
#[derive(Debug, Clone, Default)]
pub struct ModelStore {
    /// Also write a sidecar `.json` with the embedded metadata
    write_sidecar: bool,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sidecar(mut self, write_sidecar: bool) -> Self {
        self.write_sidecar = write_sidecar;
        self
    }

    /// Serialize a model to disk and return its persistence info
    pub async fn save(&self, model: &Model, path: impl AsRef<Path>) -> Result<ModelPersistenceInfo> {
        model.validate()?;
        let path = path.as_ref();

        let metadata = ModelMetadata {
            algorithm: model.algorithm.clone(),
            hyperparameters: model.hyperparameters.clone(),
            training_metrics: model.training_metrics.clone(),
            validation_metrics: model.validation_metrics.clone(),
        };
        let metadata_json = serde_json::to_vec(&metadata)?;

        let mut buffer = Vec::with_capacity(
            MIN_FILE_LEN + metadata_json.len() + model.weights.len() + 64 * model.labels.len(),
        );
        buffer.extend_from_slice(MAGIC);
        buffer.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buffer.extend_from_slice(&fixed_field(&model.architecture_id)?);
        buffer.extend_from_slice(&fixed_field(&model.version)?);
        buffer.extend_from_slice(&model.created_at.timestamp_millis().to_le_bytes());
        buffer.extend_from_slice(&(metadata_json.len() as u32).to_le_bytes());
        buffer.extend_from_slice(&metadata_json);
        buffer.extend_from_slice(&(model.labels.len() as u32).to_le_bytes());
        for label in &model.labels {
            let bytes = label.as_bytes();
            if bytes.len() > u16::MAX as usize {
                return Err(MediaButlerError::ModelValidationFailed(format!(
                    "label '{label}' is too long to serialize"
                )));
            }
            buffer.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
            buffer.extend_from_slice(bytes);
        }
        buffer.extend_from_slice(&(model.weights.len() as u32).to_le_bytes());
        buffer.extend_from_slice(&model.weights);

        let checksum = Sha256::digest(&buffer);
        buffer.extend_from_slice(&checksum);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, &buffer).await?;

        if self.write_sidecar {
            let sidecar = sidecar_path(path);
            tokio::fs::write(&sidecar, serde_json::to_vec_pretty(&metadata)?).await?;
            tracing::debug!(path = %sidecar.display(), "Wrote metadata sidecar");
        }

        let info = ModelPersistenceInfo {
            path: path.to_path_buf(),
            size_bytes: buffer.len() as u64,
            checksum: hex::encode(checksum),
            version: model.version.clone(),
            metadata,
        };
        tracing::info!(
            path = %path.display(),
            bytes = info.size_bytes,
            version = %info.version,
            "Saved model"
        );
        Ok(info)
    }

    /// Load a model, verifying magic, format version and checksum, then
    /// apply any extra validation checks.
    pub async fn load(
        &self,
        path: impl AsRef<Path>,
        validation: Option<&ModelValidationConfig>,
    ) -> Result<(Model, ModelPersistenceInfo)> {
        let path = path.as_ref();
        let buffer = tokio::fs::read(path).await?;

        if buffer.len() < MIN_FILE_LEN {
            return Err(MediaButlerError::CorruptModel(format!(
                "file is {} bytes, smaller than the minimum {MIN_FILE_LEN}",
                buffer.len()
            )));
        }
        if &buffer[..8] != MAGIC {
            return Err(MediaButlerError::IncompatibleFormat(
                "bad magic bytes".to_string(),
            ));
        }

        let payload_len = buffer.len() - CHECKSUM_LEN;
        let expected = &buffer[payload_len..];
        let actual = Sha256::digest(&buffer[..payload_len]);
        if expected != actual.as_slice() {
            return Err(MediaButlerError::CorruptModel(
                "checksum mismatch".to_string(),
            ));
        }

        let mut reader = Reader::new(&buffer[8..payload_len]);
        let format_version = reader.u32()?;
        if format_version != FORMAT_VERSION {
            return Err(MediaButlerError::IncompatibleFormat(format!(
                "format version {format_version}, expected {FORMAT_VERSION}"
            )));
        }
        let architecture_id = reader.fixed_string()?;
        let version = reader.fixed_string()?;
        let created_at_millis = reader.i64()?;
        let created_at = Utc
            .timestamp_millis_opt(created_at_millis)
            .single()
            .ok_or_else(|| {
                MediaButlerError::CorruptModel(format!(
                    "invalid created_at timestamp {created_at_millis}"
                ))
            })?;

        let metadata_len = reader.u32()? as usize;
        let metadata_bytes = reader.bytes(metadata_len)?;
        let metadata: ModelMetadata = serde_json::from_slice(metadata_bytes)
            .map_err(|e| MediaButlerError::CorruptModel(format!("metadata block: {e}")))?;

        let label_count = reader.u32()? as usize;
        let mut labels = Vec::with_capacity(label_count.min(1024));
        for _ in 0..label_count {
            let len = reader.u16()? as usize;
            let bytes = reader.bytes(len)?;
            let label = std::str::from_utf8(bytes)
                .map_err(|e| MediaButlerError::CorruptModel(format!("label encoding: {e}")))?;
            labels.push(label.to_string());
        }

        let weights_len = reader.u32()? as usize;
        let weights = reader.bytes(weights_len)?.to_vec();
        reader.expect_exhausted()?;

        let model = Model {
            architecture_id,
            version: version.clone(),
            algorithm: metadata.algorithm.clone(),
            hyperparameters: metadata.hyperparameters.clone(),
            labels,
            weights,
            training_metrics: metadata.training_metrics.clone(),
            validation_metrics: metadata.validation_metrics.clone(),
            created_at,
        };
        model.validate()?;

        if let Some(validation) = validation {
            self.apply_validation(&model, validation)?;
        }

        let info = ModelPersistenceInfo {
            path: path.to_path_buf(),
            size_bytes: buffer.len() as u64,
            checksum: hex::encode(actual),
            version,
            metadata,
        };
        tracing::info!(
            path = %path.display(),
            version = %info.version,
            labels = model.labels.len(),
            "Loaded model"
        );
        Ok((model, info))
    }

    fn apply_validation(&self, model: &Model, config: &ModelValidationConfig) -> Result<()> {
        if let Some(expected) = config.expected_label_count {
            if model.labels.len() != expected {
                return Err(MediaButlerError::LabelVocabularyMismatch {
                    expected,
                    actual: model.labels.len(),
                });
            }
        }

        if let Some(max_age_days) = config.max_model_age_days {
            let age_days = (Utc::now() - model.created_at).num_days();
            if age_days > max_age_days {
                return Err(MediaButlerError::ModelValidationFailed(format!(
                    "model is {age_days} days old, maximum is {max_age_days}"
                )));
            }
        }

        if let Some(minimum) = config.minimum_accuracy {
            let recorded = model
                .training_metrics
                .get("accuracy")
                .copied()
                .unwrap_or(0.0);
            if recorded < minimum {
                return Err(MediaButlerError::ModelValidationFailed(format!(
                    "recorded accuracy {recorded:.3} below minimum {minimum:.3}"
                )));
            }
        }

        if !config.sample_filenames.is_empty() {
            let predictor = Predictor::new(model.clone())?;
            let tokenizer = Tokenizer::default();
            let engineer = FeatureEngineer::default();
            for filename in &config.sample_filenames {
                let tokenization = tokenizer.tokenize(filename).map_err(|e| {
                    MediaButlerError::ModelValidationFailed(format!(
                        "test filename '{filename}': {e}"
                    ))
                })?;
                let features = engineer.extract(&tokenization);
                predictor.predict(&features, 1).map_err(|e| {
                    MediaButlerError::ModelValidationFailed(format!(
                        "test prediction for '{filename}': {e}"
                    ))
                })?;
            }
        }

        Ok(())
    }
}

/// Path of the metadata sidecar next to a model file
pub fn sidecar_path(model_path: &Path) -> PathBuf {
    let mut name = model_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".meta.json");
    model_path.with_file_name(name)
}

/// NUL-padded fixed-width field
fn fixed_field(value: &str) -> Result<[u8; FIXED_FIELD_LEN]> {
    let bytes = value.as_bytes();
    if bytes.len() > FIXED_FIELD_LEN {
        return Err(MediaButlerError::ModelValidationFailed(format!(
            "'{value}' exceeds {FIXED_FIELD_LEN} bytes"
        )));
    }
    let mut field = [0u8; FIXED_FIELD_LEN];
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(field)
}

/// Bounds-checked cursor over the decoded payload
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.offset.checked_add(len).ok_or_else(|| {
            MediaButlerError::CorruptModel("length overflow".to_string())
        })?;
        if end > self.data.len() {
            return Err(MediaButlerError::CorruptModel(format!(
                "truncated file: wanted {len} bytes at offset {}",
                self.offset
            )));
        }
        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16> {
        let bytes = self.bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn i64(&mut self) -> Result<i64> {
        let bytes = self.bytes(8)?;
        let mut array = [0u8; 8];
        array.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(array))
    }

    fn fixed_string(&mut self) -> Result<String> {
        let bytes = self.bytes(FIXED_FIELD_LEN)?;
        let trimmed: &[u8] = match bytes.iter().position(|b| *b == 0) {
            Some(pos) => &bytes[..pos],
            None => bytes,
        };
        std::str::from_utf8(trimmed)
            .map(|s| s.to_string())
            .map_err(|e| MediaButlerError::CorruptModel(format!("fixed field encoding: {e}")))
    }

    fn expect_exhausted(&self) -> Result<()> {
        if self.offset != self.data.len() {
            return Err(MediaButlerError::CorruptModel(format!(
                "{} trailing bytes after weights block",
                self.data.len() - self.offset
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::train_model;
    use crate::training::{SampleSource, TrainingSample};
    use media_butler_core::config::ClassifierConfig;

    fn sample(filename: &str, category: &str) -> TrainingSample {
        TrainingSample::new(filename, category, 1.0, SampleSource::ManuallyCurated)
    }

    fn trained_model() -> Model {
        let samples = vec![
            sample("Il.Trono.Di.Spade.8x04.ITA.WEBMux.x264-UBi.mkv", "IL TRONO DI SPADE"),
            sample("Il.Trono.Di.Spade.8x05.ITA.WEBMux.x264-UBi.mkv", "IL TRONO DI SPADE"),
            sample("One.Piece.1089.Sub.ITA.720p.WEB-DLMux.x264-UBi.mkv", "ONE PIECE"),
            sample("One.Piece.1090.Sub.ITA.720p.WEB-DLMux.x264-UBi.mkv", "ONE PIECE"),
        ];
        train_model(&samples, &ClassifierConfig::default(), "1.0.0").unwrap()
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mbm");
        let model = trained_model();

        let saved = ModelStore::new().save(&model, &path).await.unwrap();
        assert_eq!(saved.version, "1.0.0");
        assert!(saved.size_bytes > MIN_FILE_LEN as u64);

        let (loaded, info) = ModelStore::new().load(&path, None).await.unwrap();
        assert_eq!(loaded.architecture_id, model.architecture_id);
        assert_eq!(loaded.version, model.version);
        assert_eq!(loaded.labels, model.labels);
        assert_eq!(loaded.weights, model.weights);
        assert_eq!(loaded.algorithm, model.algorithm);
        assert_eq!(
            loaded.created_at.timestamp_millis(),
            model.created_at.timestamp_millis()
        );
        assert_eq!(info.checksum, saved.checksum);
    }

    #[tokio::test]
    async fn test_tampered_byte_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mbm");
        ModelStore::new().save(&trained_model(), &path).await.unwrap();

        let mut bytes = tokio::fs::read(&path).await.unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xFF;
        tokio::fs::write(&path, &bytes).await.unwrap();

        let result = ModelStore::new().load(&path, None).await;
        assert!(matches!(result, Err(MediaButlerError::CorruptModel(_))));
    }

    #[tokio::test]
    async fn test_bad_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mbm");
        ModelStore::new().save(&trained_model(), &path).await.unwrap();

        let mut bytes = tokio::fs::read(&path).await.unwrap();
        bytes[0] = b'X';
        tokio::fs::write(&path, &bytes).await.unwrap();

        let result = ModelStore::new().load(&path, None).await;
        assert!(matches!(
            result,
            Err(MediaButlerError::IncompatibleFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_format_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mbm");
        ModelStore::new().save(&trained_model(), &path).await.unwrap();

        let mut bytes = tokio::fs::read(&path).await.unwrap();
        bytes[8] = 9;
        // Recompute the checksum so only the version is wrong.
        let payload_len = bytes.len() - CHECKSUM_LEN;
        let checksum = Sha256::digest(&bytes[..payload_len]);
        bytes[payload_len..].copy_from_slice(&checksum);
        tokio::fs::write(&path, &bytes).await.unwrap();

        let result = ModelStore::new().load(&path, None).await;
        assert!(matches!(
            result,
            Err(MediaButlerError::IncompatibleFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_truncated_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mbm");
        tokio::fs::write(&path, b"MBMODEL\0tiny").await.unwrap();

        let result = ModelStore::new().load(&path, None).await;
        assert!(matches!(result, Err(MediaButlerError::CorruptModel(_))));
    }

    #[tokio::test]
    async fn test_validation_label_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mbm");
        ModelStore::new().save(&trained_model(), &path).await.unwrap();

        let validation = ModelValidationConfig {
            expected_label_count: Some(5),
            ..Default::default()
        };
        let result = ModelStore::new().load(&path, Some(&validation)).await;
        assert!(matches!(
            result,
            Err(MediaButlerError::LabelVocabularyMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_validation_minimum_accuracy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mbm");
        ModelStore::new().save(&trained_model(), &path).await.unwrap();

        let validation = ModelValidationConfig {
            minimum_accuracy: Some(1.1),
            ..Default::default()
        };
        let result = ModelStore::new().load(&path, Some(&validation)).await;
        assert!(matches!(
            result,
            Err(MediaButlerError::ModelValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_validation_sample_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mbm");
        ModelStore::new().save(&trained_model(), &path).await.unwrap();

        let validation = ModelValidationConfig {
            sample_filenames: vec!["One.Piece.1095.Sub.ITA.720p.mkv".to_string()],
            ..Default::default()
        };
        assert!(ModelStore::new()
            .load(&path, Some(&validation))
            .await
            .is_ok());

        let bad = ModelValidationConfig {
            sample_filenames: vec!["...".to_string()],
            ..Default::default()
        };
        let result = ModelStore::new().load(&path, Some(&bad)).await;
        assert!(matches!(
            result,
            Err(MediaButlerError::ModelValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_validation_model_age() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mbm");
        let mut model = trained_model();
        model.created_at = Utc::now() - chrono::Duration::days(100);
        ModelStore::new().save(&model, &path).await.unwrap();

        let validation = ModelValidationConfig {
            max_model_age_days: Some(30),
            ..Default::default()
        };
        let result = ModelStore::new().load(&path, Some(&validation)).await;
        assert!(matches!(
            result,
            Err(MediaButlerError::ModelValidationFailed(_))
        ));

        let relaxed = ModelValidationConfig {
            max_model_age_days: Some(365),
            ..Default::default()
        };
        assert!(ModelStore::new()
            .load(&path, Some(&relaxed))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_sidecar_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mbm");
        ModelStore::new()
            .with_sidecar(true)
            .save(&trained_model(), &path)
            .await
            .unwrap();

        let sidecar = sidecar_path(&path);
        let content = tokio::fs::read_to_string(&sidecar).await.unwrap();
        let metadata: ModelMetadata = serde_json::from_str(&content).unwrap();
        assert_eq!(metadata.algorithm, "logistic_regression");
    }

    #[tokio::test]
    async fn test_oversized_header_field_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mbm");
        let mut model = trained_model();
        model.version = "a-version-name-way-too-long".to_string();
        let result = ModelStore::new().save(&model, &path).await;
        assert!(matches!(
            result,
            Err(MediaButlerError::ModelValidationFailed(_))
        ));
    }
}
