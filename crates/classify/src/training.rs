//! Training data management: labeled samples, stratified splits,
//! validation rules and CSV import/export.

use crate::registry::{CategoryDefinition, CategoryRegistry, CategoryType};
use chrono::{DateTime, Utc};
use media_butler_core::config::CsvConfig;
use media_butler_core::error::MediaButlerError;
use media_butler_core::validation::{is_known_media_extension, validate_confidence, validate_filename, validate_split_ratios};
use media_butler_core::Result;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Fixed seed so splits are reproducible across runs
const DEFAULT_SPLIT_SEED: u64 = 42;

/// Where a training sample came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleSource {
    UserFeedback,
    AutomatedAnalysis,
    Imported,
    ManuallyCurated,
    Synthetic,
}

/// A labeled filename
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub id: uuid::Uuid,
    pub filename: String,
    /// Canonical category name
    pub category: String,
    /// Label confidence in [0, 1]
    pub confidence: f64,
    pub source: SampleSource,
    pub created_at: DateTime<Utc>,
    pub verified: bool,
}

impl TrainingSample {
    pub fn new(
        filename: impl Into<String>,
        category: impl Into<String>,
        confidence: f64,
        source: SampleSource,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            filename: filename.into(),
            category: category.into(),
            confidence: confidence.clamp(0.0, 1.0),
            source,
            created_at: Utc::now(),
            verified: matches!(source, SampleSource::ManuallyCurated),
        }
    }
}

/// Outcome of adding one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    SkippedDuplicate,
}

/// Stratified train/validation/test partition
#[derive(Debug, Clone)]
pub struct TrainingDataSplit {
    pub train: Vec<TrainingSample>,
    pub validation: Vec<TrainingSample>,
    pub test: Vec<TrainingSample>,
    /// Categories too small to stratify; their validation slice is empty
    pub minority_categories: Vec<String>,
}

/// Validation thresholds for a training dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRules {
    pub min_total_samples: usize,
    pub min_samples_per_category: usize,
    /// max(category count) / min(category count)
    pub max_imbalance_ratio: f64,
    pub min_filename_length: usize,
    /// Case-insensitive duplicate filenames over total
    pub max_duplicate_fraction: f64,
    pub min_sample_confidence: f64,
    /// Empty list disables the extension check
    pub allowed_extensions: Vec<String>,
    /// Case-insensitive substrings that disqualify a filename
    pub forbidden_patterns: Vec<String>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_total_samples: 10,
            min_samples_per_category: 2,
            max_imbalance_ratio: 20.0,
            min_filename_length: 5,
            max_duplicate_fraction: 0.1,
            min_sample_confidence: 0.5,
            allowed_extensions: Vec::new(),
            forbidden_patterns: Vec::new(),
        }
    }
}

/// How bad a validation finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IssueSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl IssueSeverity {
    fn weight(self) -> f64 {
        match self {
            Self::Info => 0.0,
            Self::Warning => 1.0,
            Self::Error => 3.0,
            Self::Critical => 10.0,
        }
    }
}

/// One validation finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: String,
    pub message: String,
    pub category: Option<String>,
}

/// Overall dataset verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    Valid,
    Invalid,
}

/// Result of validating the dataset against a rule set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingDataValidationReport {
    pub status: ValidationStatus,
    pub issues: Vec<ValidationIssue>,
    /// 1.0 minus the severity-weighted issue budget, clamped to [0, 1]
    pub quality_score: f64,
    pub is_training_ready: bool,
    pub total_samples: usize,
    pub category_counts: BTreeMap<String, usize>,
}

/// Result of a CSV import; row problems are collected, never thrown
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CsvImportResult {
    pub total_rows: usize,
    pub imported: usize,
    pub skipped_duplicates: usize,
    pub invalid_rows: usize,
    pub errors: Vec<String>,
}

/// Owns labeled samples; mutation is exclusive, reads take snapshots
pub struct TrainingDataStore {
    registry: Arc<CategoryRegistry>,
    samples: RwLock<Vec<TrainingSample>>,
    /// Register unknown categories on first use instead of failing
    auto_register: bool,
    skip_duplicates: bool,
    split_seed: u64,
}

impl TrainingDataStore {
    pub fn new(registry: Arc<CategoryRegistry>) -> Self {
        Self {
            registry,
            samples: RwLock::new(Vec::new()),
            auto_register: true,
            skip_duplicates: true,
            split_seed: DEFAULT_SPLIT_SEED,
        }
    }

    pub fn with_auto_register(mut self, auto_register: bool) -> Self {
        self.auto_register = auto_register;
        self
    }

    pub fn with_skip_duplicates(mut self, skip_duplicates: bool) -> Self {
        self.skip_duplicates = skip_duplicates;
        self
    }

    pub fn with_split_seed(mut self, seed: u64) -> Self {
        self.split_seed = seed;
        self
    }

    /// Add one labeled sample.
    ///
    /// The category is normalized through the registry; unknown categories
    /// are auto-registered or rejected depending on policy. A
    /// case-insensitive duplicate filename is skipped when configured.
    pub fn add_sample(
        &self,
        filename: &str,
        category: &str,
        confidence: Option<f64>,
        source: Option<SampleSource>,
    ) -> Result<AddOutcome> {
        validate_filename(filename)?;
        let canonical = CategoryRegistry::normalize(category)?;
        let confidence = confidence.unwrap_or(1.0);
        validate_confidence(confidence)?;

        if !self.registry.exists(&canonical) {
            if self.auto_register {
                self.registry
                    .register(CategoryDefinition::new(&canonical, CategoryType::TVSeries))?;
            } else {
                return Err(MediaButlerError::UnknownCategory(canonical));
            }
        }

        let mut samples = self.samples.write();
        let lower = filename.to_lowercase();
        if samples.iter().any(|s| s.filename.to_lowercase() == lower) {
            if self.skip_duplicates {
                tracing::debug!(filename, "Skipped duplicate training sample");
                return Ok(AddOutcome::SkippedDuplicate);
            }
        }

        samples.push(TrainingSample::new(
            filename,
            canonical,
            confidence,
            source.unwrap_or(SampleSource::UserFeedback),
        ));
        Ok(AddOutcome::Added)
    }

    pub fn len(&self) -> usize {
        self.samples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.read().is_empty()
    }

    /// Snapshot of all samples
    pub fn samples(&self) -> Vec<TrainingSample> {
        self.samples.read().clone()
    }

    pub fn clear(&self) {
        self.samples.write().clear();
    }

    /// Sample counts per category, deterministically ordered
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for sample in self.samples.read().iter() {
            *counts.entry(sample.category.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Stratified split by category with a fixed shuffle seed.
    ///
    /// Categories with fewer than 3 samples cannot be stratified three
    /// ways: training takes `ceil(n * train_ratio)`, the remainder goes to
    /// test, and the category is recorded as a minority.
    pub fn get_split(&self, train_ratio: f64, validation_ratio: f64) -> Result<TrainingDataSplit> {
        validate_split_ratios(train_ratio, validation_ratio)?;
        let samples = self.samples.read();
        if samples.is_empty() {
            return Err(MediaButlerError::EmptyDataset);
        }

        let mut by_category: BTreeMap<&str, Vec<&TrainingSample>> = BTreeMap::new();
        for sample in samples.iter() {
            by_category
                .entry(sample.category.as_str())
                .or_default()
                .push(sample);
        }

        let mut rng = StdRng::seed_from_u64(self.split_seed);
        let mut split = TrainingDataSplit {
            train: Vec::new(),
            validation: Vec::new(),
            test: Vec::new(),
            minority_categories: Vec::new(),
        };

        for (category, mut group) in by_category {
            group.shuffle(&mut rng);
            let n = group.len();

            if n < 3 {
                let train_count = (n as f64 * train_ratio).ceil() as usize;
                for (idx, sample) in group.into_iter().enumerate() {
                    if idx < train_count {
                        split.train.push(sample.clone());
                    } else {
                        split.test.push(sample.clone());
                    }
                }
                split.minority_categories.push(category.to_string());
                continue;
            }

            let train_count = ((n as f64 * train_ratio).round() as usize).clamp(1, n - 2);
            let validation_count =
                ((n as f64 * validation_ratio).round() as usize).clamp(1, n - train_count - 1);
            for (idx, sample) in group.into_iter().enumerate() {
                if idx < train_count {
                    split.train.push(sample.clone());
                } else if idx < train_count + validation_count {
                    split.validation.push(sample.clone());
                } else {
                    split.test.push(sample.clone());
                }
            }
        }

        tracing::debug!(
            train = split.train.len(),
            validation = split.validation.len(),
            test = split.test.len(),
            minorities = split.minority_categories.len(),
            "Produced stratified split"
        );
        Ok(split)
    }

    /// Validate the dataset against a rule set. Findings are collected into
    /// the report; this never fails.
    pub fn validate(&self, rules: &ValidationRules) -> TrainingDataValidationReport {
        let samples = self.samples.read();
        let mut issues = Vec::new();
        let total = samples.len();

        let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();
        for sample in samples.iter() {
            *category_counts.entry(sample.category.clone()).or_insert(0) += 1;
        }

        if total == 0 {
            issues.push(ValidationIssue {
                severity: IssueSeverity::Critical,
                code: "empty_dataset".to_string(),
                message: "No training samples".to_string(),
                category: None,
            });
        } else if total < rules.min_total_samples {
            issues.push(ValidationIssue {
                severity: IssueSeverity::Error,
                code: "too_few_samples".to_string(),
                message: format!(
                    "{total} samples, need at least {}",
                    rules.min_total_samples
                ),
                category: None,
            });
        }

        for (category, count) in &category_counts {
            if *count < rules.min_samples_per_category {
                issues.push(ValidationIssue {
                    severity: IssueSeverity::Warning,
                    code: "underrepresented_category".to_string(),
                    message: format!(
                        "Category '{category}' has {count} samples, need {}",
                        rules.min_samples_per_category
                    ),
                    category: Some(category.clone()),
                });
            }
        }

        if let (Some(max), Some(min)) = (
            category_counts.values().max(),
            category_counts.values().min(),
        ) {
            if *min > 0 {
                let imbalance = *max as f64 / *min as f64;
                if imbalance > rules.max_imbalance_ratio {
                    issues.push(ValidationIssue {
                        severity: IssueSeverity::Error,
                        code: "class_imbalance".to_string(),
                        message: format!(
                            "Imbalance ratio {imbalance:.1} exceeds {:.1}",
                            rules.max_imbalance_ratio
                        ),
                        category: None,
                    });
                }
            }
        }

        let short_names = samples
            .iter()
            .filter(|s| s.filename.chars().count() < rules.min_filename_length)
            .count();
        if short_names > 0 {
            issues.push(ValidationIssue {
                severity: IssueSeverity::Warning,
                code: "short_filenames".to_string(),
                message: format!(
                    "{short_names} filenames shorter than {} characters",
                    rules.min_filename_length
                ),
                category: None,
            });
        }

        if total > 0 {
            let mut seen = HashSet::new();
            let mut duplicates = 0usize;
            for sample in samples.iter() {
                if !seen.insert(sample.filename.to_lowercase()) {
                    duplicates += 1;
                }
            }
            let fraction = duplicates as f64 / total as f64;
            if fraction > rules.max_duplicate_fraction {
                issues.push(ValidationIssue {
                    severity: IssueSeverity::Error,
                    code: "duplicate_filenames".to_string(),
                    message: format!(
                        "Duplicate fraction {fraction:.2} exceeds {:.2}",
                        rules.max_duplicate_fraction
                    ),
                    category: None,
                });
            }
        }

        let low_confidence = samples
            .iter()
            .filter(|s| s.confidence < rules.min_sample_confidence)
            .count();
        if low_confidence > 0 {
            issues.push(ValidationIssue {
                severity: IssueSeverity::Warning,
                code: "low_confidence_samples".to_string(),
                message: format!(
                    "{low_confidence} samples below confidence {:.2}",
                    rules.min_sample_confidence
                ),
                category: None,
            });
        }

        if !rules.allowed_extensions.is_empty() {
            let bad_extensions = samples
                .iter()
                .filter(|s| {
                    let ext = s
                        .filename
                        .rsplit_once('.')
                        .map(|(_, e)| e.to_lowercase())
                        .unwrap_or_default();
                    !rules
                        .allowed_extensions
                        .iter()
                        .any(|allowed| allowed.to_lowercase() == ext)
                })
                .count();
            if bad_extensions > 0 {
                issues.push(ValidationIssue {
                    severity: IssueSeverity::Warning,
                    code: "unexpected_extensions".to_string(),
                    message: format!("{bad_extensions} samples with unexpected extensions"),
                    category: None,
                });
            }
        }

        for pattern in &rules.forbidden_patterns {
            let lower = pattern.to_lowercase();
            let hits = samples
                .iter()
                .filter(|s| s.filename.to_lowercase().contains(&lower))
                .count();
            if hits > 0 {
                issues.push(ValidationIssue {
                    severity: IssueSeverity::Error,
                    code: "forbidden_pattern".to_string(),
                    message: format!("{hits} filenames contain forbidden pattern '{pattern}'"),
                    category: None,
                });
            }
        }

        let weighted: f64 = issues.iter().map(|i| i.severity.weight()).sum();
        let quality_score = (1.0 - weighted / 20.0).clamp(0.0, 1.0);
        let status = if issues
            .iter()
            .any(|i| i.severity >= IssueSeverity::Error)
        {
            ValidationStatus::Invalid
        } else {
            ValidationStatus::Valid
        };

        TrainingDataValidationReport {
            is_training_ready: status == ValidationStatus::Valid && quality_score >= 0.8,
            status,
            issues,
            quality_score,
            total_samples: total,
            category_counts,
        }
    }

    /// Import semicolon-separated rows `id;Category;FileName`.
    ///
    /// Row-level problems are collected into the result; only file-level
    /// I/O errors fail the call.
    pub async fn import_csv(
        &self,
        path: impl AsRef<Path>,
        config: &CsvConfig,
    ) -> Result<CsvImportResult> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let mut result = CsvImportResult::default();

        for (line_number, line) in content.lines().enumerate() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(config.separator).collect();
            // An optional header is recognized by its non-numeric id field.
            if line_number == 0 && fields.first().map(|f| f.trim().parse::<u64>().is_err()).unwrap_or(true)
            {
                continue;
            }
            result.total_rows += 1;

            if config.max_samples > 0 && result.imported >= config.max_samples {
                break;
            }

            match self.import_row(&fields, line_number + 1, config) {
                Ok(AddOutcome::Added) => result.imported += 1,
                Ok(AddOutcome::SkippedDuplicate) => result.skipped_duplicates += 1,
                Err(message) => {
                    result.invalid_rows += 1;
                    result.errors.push(message);
                }
            }
        }

        tracing::info!(
            imported = result.imported,
            skipped = result.skipped_duplicates,
            invalid = result.invalid_rows,
            "CSV import finished"
        );
        Ok(result)
    }

    fn import_row(
        &self,
        fields: &[&str],
        line_number: usize,
        config: &CsvConfig,
    ) -> std::result::Result<AddOutcome, String> {
        if fields.len() != 3 {
            return Err(format!(
                "line {line_number}: expected 3 fields, got {}",
                fields.len()
            ));
        }
        let id = fields[0].trim();
        let category = fields[1].trim();
        let filename = fields[2].trim();

        match id.parse::<i64>() {
            Ok(value) if value > 0 => {}
            _ => return Err(format!("line {line_number}: id '{id}' is not a positive integer")),
        }
        if category.is_empty() {
            return Err(format!("line {line_number}: empty category"));
        }
        if filename.is_empty() {
            return Err(format!("line {line_number}: empty filename"));
        }
        if config.validate_extensions {
            let extension = filename
                .rsplit_once('.')
                .map(|(_, ext)| ext)
                .unwrap_or_default();
            if !is_known_media_extension(extension) {
                return Err(format!(
                    "line {line_number}: unrecognized extension '{extension}'"
                ));
            }
        }

        let category = if config.normalize_category_names {
            CategoryRegistry::normalize(category)
                .map_err(|e| format!("line {line_number}: {e}"))?
        } else {
            category.to_string()
        };

        // Honor the CSV duplicate policy over the store default for this
        // import only.
        let outcome = if config.skip_duplicates == self.skip_duplicates {
            self.add_sample(filename, &category, Some(1.0), Some(SampleSource::Imported))
        } else {
            let lower = filename.to_lowercase();
            let exists = self
                .samples
                .read()
                .iter()
                .any(|s| s.filename.to_lowercase() == lower);
            if exists && config.skip_duplicates {
                Ok(AddOutcome::SkippedDuplicate)
            } else {
                self.add_sample(filename, &category, Some(1.0), Some(SampleSource::Imported))
            }
        };
        outcome.map_err(|e| format!("line {line_number}: {e}"))
    }

    /// Export samples as `id;Category;FileName`, ordered by creation time
    /// then filename. Returns the number of rows written.
    pub async fn export(&self, path: impl AsRef<Path>) -> Result<usize> {
        let mut samples = self.samples();
        samples.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.filename.cmp(&b.filename))
        });

        let mut content = String::new();
        for (idx, sample) in samples.iter().enumerate() {
            content.push_str(&format!(
                "{};{};{}\n",
                idx + 1,
                sample.category,
                sample.filename
            ));
        }
        tokio::fs::write(path.as_ref(), content).await?;
        Ok(samples.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TrainingDataStore {
        TrainingDataStore::new(Arc::new(CategoryRegistry::new()))
    }

    fn filled_store(per_category: &[(&str, usize)]) -> TrainingDataStore {
        let store = store();
        for (category, count) in per_category {
            for i in 0..*count {
                store
                    .add_sample(
                        &format!("{}.S01E{i:02}.1080p.WEB-DL.x264-NTb.mkv", category.replace(' ', ".")),
                        category,
                        Some(1.0),
                        None,
                    )
                    .unwrap();
            }
        }
        store
    }

    #[test]
    fn test_add_sample_normalizes_category() {
        let store = store();
        store
            .add_sample("Breaking.Bad.S05E16.mkv", "breaking bad", None, None)
            .unwrap();
        let samples = store.samples();
        assert_eq!(samples[0].category, "BREAKING BAD");
        assert_eq!(samples[0].confidence, 1.0);
    }

    #[test]
    fn test_duplicate_skipped_case_insensitive() {
        let store = store();
        assert_eq!(
            store
                .add_sample("Show.S01E01.mkv", "SHOW", None, None)
                .unwrap(),
            AddOutcome::Added
        );
        assert_eq!(
            store
                .add_sample("SHOW.s01e01.MKV", "SHOW", None, None)
                .unwrap(),
            AddOutcome::SkippedDuplicate
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_category_policy() {
        let registry = Arc::new(CategoryRegistry::new());
        let store = TrainingDataStore::new(Arc::clone(&registry)).with_auto_register(false);
        let result = store.add_sample("Show.S01E01.mkv", "NEW SHOW", None, None);
        assert!(matches!(result, Err(MediaButlerError::UnknownCategory(_))));

        let auto = TrainingDataStore::new(registry);
        auto.add_sample("Show.S01E01.mkv", "NEW SHOW", None, None)
            .unwrap();
        assert!(auto.registry.exists("NEW SHOW"));
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let store = store();
        assert!(store.add_sample("", "SHOW", None, None).is_err());
        assert!(store.add_sample("Show.mkv", "", None, None).is_err());
        assert!(store
            .add_sample("Show.mkv", "SHOW", Some(1.5), None)
            .is_err());
    }

    #[test]
    fn test_split_ratios_validated() {
        let store = filled_store(&[("SHOW A", 10)]);
        assert!(matches!(
            store.get_split(0.8, 0.3),
            Err(MediaButlerError::InvalidRatios { .. })
        ));
        assert!(matches!(
            store.get_split(0.0, 0.2),
            Err(MediaButlerError::InvalidRatios { .. })
        ));
    }

    #[test]
    fn test_stratified_split_proportions() {
        let store = filled_store(&[("SHOW A", 10), ("SHOW B", 10)]);
        let split = store.get_split(0.7, 0.2).unwrap();

        assert_eq!(split.train.len(), 14);
        assert_eq!(split.validation.len(), 4);
        assert_eq!(split.test.len(), 2);
        assert!(split.minority_categories.is_empty());

        // Each category contributes proportionally.
        let train_a = split
            .train
            .iter()
            .filter(|s| s.category == "SHOW A")
            .count();
        assert_eq!(train_a, 7);
    }

    #[test]
    fn test_split_is_deterministic() {
        let store = filled_store(&[("SHOW A", 7), ("SHOW B", 5)]);
        let first = store.get_split(0.7, 0.2).unwrap();
        let second = store.get_split(0.7, 0.2).unwrap();
        let ids = |samples: &[TrainingSample]| -> Vec<uuid::Uuid> {
            samples.iter().map(|s| s.id).collect()
        };
        assert_eq!(ids(&first.train), ids(&second.train));
        assert_eq!(ids(&first.validation), ids(&second.validation));
        assert_eq!(ids(&first.test), ids(&second.test));
    }

    #[test]
    fn test_minority_category_handling() {
        let store = filled_store(&[("SHOW A", 10), ("TINY", 2)]);
        let split = store.get_split(0.7, 0.2).unwrap();
        assert_eq!(split.minority_categories, vec!["TINY".to_string()]);

        // ceil(2 * 0.7) = 2 -> both tiny samples train, none in validation.
        let tiny_validation = split
            .validation
            .iter()
            .filter(|s| s.category == "TINY")
            .count();
        assert_eq!(tiny_validation, 0);
        let tiny_train = split.train.iter().filter(|s| s.category == "TINY").count();
        assert_eq!(tiny_train, 2);
    }

    #[test]
    fn test_validation_empty_dataset_critical() {
        let report = store().validate(&ValidationRules::default());
        assert_eq!(report.status, ValidationStatus::Invalid);
        assert!(!report.is_training_ready);
        assert!(report
            .issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Critical));
    }

    #[test]
    fn test_validation_healthy_dataset() {
        let store = filled_store(&[("SHOW A", 10), ("SHOW B", 8)]);
        let report = store.validate(&ValidationRules::default());
        assert_eq!(report.status, ValidationStatus::Valid);
        assert!(report.quality_score > 0.9);
        assert!(report.is_training_ready);
    }

    #[test]
    fn test_validation_imbalance_detected() {
        let store = filled_store(&[("BIG SHOW", 50), ("SMALL SHOW", 2)]);
        let report = store.validate(&ValidationRules {
            max_imbalance_ratio: 10.0,
            ..Default::default()
        });
        assert!(report
            .issues
            .iter()
            .any(|i| i.code == "class_imbalance" && i.severity == IssueSeverity::Error));
        assert_eq!(report.status, ValidationStatus::Invalid);
    }

    #[test]
    fn test_validation_forbidden_pattern() {
        let store = store();
        store
            .add_sample("Show.Sample.S01E01.mkv", "SHOW", None, None)
            .unwrap();
        let report = store.validate(&ValidationRules {
            forbidden_patterns: vec!["sample".to_string()],
            min_total_samples: 1,
            ..Default::default()
        });
        assert!(report.issues.iter().any(|i| i.code == "forbidden_pattern"));
    }

    #[tokio::test]
    async fn test_csv_import_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.csv");
        let content = "id;Category;FileName\n\
                       1;breaking bad;Breaking.Bad.S05E16.1080p.BluRay.x264-NovaRip.mkv\n\
                       2;breaking bad;Breaking.Bad.S05E16.1080p.BluRay.x264-NovaRip.mkv\n\
                       3;one piece;One.Piece.1089.Sub.ITA.720p.WEB-DLMux.x264-UBi.mkv\n";
        tokio::fs::write(&path, content).await.unwrap();

        let store = store();
        let result = store.import_csv(&path, &CsvConfig::default()).await.unwrap();

        assert_eq!(result.total_rows, 3);
        assert_eq!(result.imported, 2);
        assert_eq!(result.skipped_duplicates, 1);
        assert_eq!(result.invalid_rows, 0);

        let samples = store.samples();
        assert_eq!(samples[0].category, "BREAKING BAD");
        assert_eq!(samples[0].confidence, 1.0);
        assert_eq!(samples[0].source, SampleSource::Imported);
    }

    #[tokio::test]
    async fn test_csv_import_collects_row_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.csv");
        let content = "0;bad id;Show.S01E01.mkv\n\
                       2;;Empty.Category.S01E01.mkv\n\
                       3;ok show;Show.S01E01.txt\n\
                       4;ok show;Show.S01E01.mkv\n";
        tokio::fs::write(&path, content).await.unwrap();

        let store = store();
        let result = store.import_csv(&path, &CsvConfig::default()).await.unwrap();

        assert_eq!(result.imported, 1);
        assert_eq!(result.invalid_rows, 3);
        assert_eq!(result.errors.len(), 3);
    }

    #[tokio::test]
    async fn test_csv_import_missing_file_is_io_error() {
        let store = store();
        let result = store
            .import_csv("/definitely/not/here.csv", &CsvConfig::default())
            .await;
        assert!(matches!(result, Err(MediaButlerError::Io(_))));
    }

    #[tokio::test]
    async fn test_export_deterministic_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");

        let store = store();
        store
            .add_sample("Zeta.S01E01.mkv", "ZETA", None, None)
            .unwrap();
        store
            .add_sample("Alfa.S01E01.mkv", "ALFA", None, None)
            .unwrap();

        let written = store.export(&path).await.unwrap();
        assert_eq!(written, 2);

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1;"));
        assert!(lines[1].starts_with("2;"));
    }

    #[tokio::test]
    async fn test_csv_max_samples_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.csv");
        let mut content = String::new();
        for i in 1..=10 {
            content.push_str(&format!("{i};show {i};Show.{i}.S01E0{}.mkv\n", i % 9 + 1));
        }
        tokio::fs::write(&path, content).await.unwrap();

        let store = store();
        let config = CsvConfig {
            max_samples: 3,
            ..Default::default()
        };
        let result = store.import_csv(&path, &config).await.unwrap();
        assert_eq!(result.imported, 3);
    }
}
