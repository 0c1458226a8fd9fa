//! Stratified k-fold cross-validation.

use crate::evaluation::accuracy::compute_accuracy;
use crate::model::train_model;
use crate::registry::CategoryRegistry;
use crate::service::{Decision, PredictionService};
use crate::training::TrainingSample;
use media_butler_core::config::ClassifierConfig;
use media_butler_core::error::MediaButlerError;
use media_butler_core::math::{mean, std_dev};
use media_butler_core::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Fixed shuffle seed so folds are reproducible
const FOLD_SEED: u64 = 1337;

/// Metrics from one held-out fold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldMetrics {
    pub fold: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Stability band from the coefficient of variation of fold accuracies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StabilityBand {
    Excellent,
    Good,
    Average,
    BelowAverage,
    Poor,
}

impl StabilityBand {
    fn from_cv(cv: f64) -> Self {
        if cv <= 0.02 {
            Self::Excellent
        } else if cv <= 0.05 {
            Self::Good
        } else if cv <= 0.08 {
            Self::Average
        } else if cv <= 0.12 {
            Self::BelowAverage
        } else {
            Self::Poor
        }
    }
}

/// Aggregated k-fold results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResults {
    pub folds: Vec<FoldMetrics>,
    pub mean_accuracy: f64,
    pub std_dev_accuracy: f64,
    /// 95% confidence interval: mean +- 1.96 * sigma / sqrt(k)
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub coefficient_of_variation: f64,
    pub quality: StabilityBand,
    /// Classes with fewer than k samples, kept whole in a single fold
    pub whole_fold_categories: Vec<String>,
}

/// Run stratified k-fold cross-validation over labeled samples.
///
/// Per-class sample order is shuffled with a fixed seed, then samples are
/// dealt round-robin across folds so every fold preserves class
/// proportions. A class with fewer than k samples cannot be dealt across
/// all folds; it stays whole in one fold and is reported.
pub fn cross_validate(
    samples: &[TrainingSample],
    k: usize,
    config: &ClassifierConfig,
) -> Result<CrossValidationResults> {
    if samples.is_empty() {
        return Err(MediaButlerError::EmptyDataset);
    }
    if k < 2 || k > samples.len() {
        return Err(MediaButlerError::validation_field(
            format!("k must be in [2, {}], got {k}", samples.len()),
            "k",
        ));
    }

    let mut by_category: BTreeMap<&str, Vec<&TrainingSample>> = BTreeMap::new();
    for sample in samples {
        by_category
            .entry(sample.category.as_str())
            .or_default()
            .push(sample);
    }

    let mut rng = StdRng::seed_from_u64(FOLD_SEED);
    let mut folds: Vec<Vec<&TrainingSample>> = vec![Vec::new(); k];
    let mut whole_fold_categories = Vec::new();
    let mut whole_fold_cursor = 0usize;

    for (category, mut group) in by_category {
        group.shuffle(&mut rng);
        if group.len() < k {
            // Too small to stratify: the class stays together.
            folds[whole_fold_cursor % k].extend(group);
            whole_fold_cursor += 1;
            whole_fold_categories.push(category.to_string());
        } else {
            for (idx, sample) in group.into_iter().enumerate() {
                folds[idx % k].push(sample);
            }
        }
    }

    let mut fold_metrics = Vec::with_capacity(k);
    for held_out in 0..k {
        let test: Vec<&TrainingSample> = folds[held_out].clone();
        let train: Vec<TrainingSample> = folds
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != held_out)
            .flat_map(|(_, fold)| fold.iter().map(|s| (*s).clone()))
            .collect();

        if test.is_empty() {
            continue;
        }

        let model = train_model(&train, config, &format!("cv-{held_out}"))?;
        let service = PredictionService::new(config.clone(), Arc::new(CategoryRegistry::new()));
        service.load_model(model)?;

        let mut pairs = Vec::with_capacity(test.len());
        for sample in &test {
            let result = service.predict(&sample.filename)?;
            let predicted = match result.decision {
                Decision::Failed => "UNKNOWN".to_string(),
                _ => result
                    .predicted_category
                    .unwrap_or_else(|| "UNKNOWN".to_string()),
            };
            pairs.push((sample.category.clone(), predicted));
        }

        let metrics = compute_accuracy(&pairs)?;
        tracing::debug!(
            fold = held_out,
            accuracy = metrics.overall_accuracy,
            test_size = test.len(),
            "Cross-validation fold complete"
        );
        fold_metrics.push(FoldMetrics {
            fold: held_out,
            train_size: train.len(),
            test_size: test.len(),
            accuracy: metrics.overall_accuracy,
            precision: metrics.macro_precision,
            recall: metrics.macro_recall,
            f1: metrics.macro_f1,
        });
    }

    if fold_metrics.is_empty() {
        return Err(MediaButlerError::EmptyDataset);
    }

    let accuracies: Vec<f64> = fold_metrics.iter().map(|f| f.accuracy).collect();
    let mean_accuracy = mean(&accuracies);
    let std_dev_accuracy = std_dev(&accuracies);
    let margin = 1.96 * std_dev_accuracy / (fold_metrics.len() as f64).sqrt();
    let coefficient_of_variation = if mean_accuracy > 0.0 {
        std_dev_accuracy / mean_accuracy
    } else {
        0.0
    };

    Ok(CrossValidationResults {
        mean_accuracy,
        std_dev_accuracy,
        ci_lower: mean_accuracy - margin,
        ci_upper: mean_accuracy + margin,
        coefficient_of_variation,
        quality: StabilityBand::from_cv(coefficient_of_variation),
        whole_fold_categories,
        folds: fold_metrics,
    })
}
