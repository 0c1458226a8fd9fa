//! Feature engineering: deterministic projection of a [`Tokenization`]
//! into a dense numeric feature vector.
//!
//! The vector is assembled from tagged subparts concatenated in a fixed
//! order: token frequency, n-grams, quality, patterns, then the optional
//! episode and release-group blocks. An omitted optional block leaves no
//! gap; names and values always shrink together.

pub mod episode;
pub mod ngrams;
pub mod patterns;
pub mod quality;
pub mod release_group;
pub mod token_frequency;

pub use episode::{EpisodeFeatures, SeriesMaturity};
pub use ngrams::{Ngram, NgramFeatures};
pub use patterns::{FilenamePatternType, LengthCategory, PatternFeatures, SubPatternConfidence};
pub use quality::{QualityFeatures, SourceTier};
pub use release_group::{
    is_italian_group, GroupRegion, GroupReputation, GroupSpecialization, ReleaseGroupFeatures,
};
pub use token_frequency::{ScoredToken, TokenCategory, TokenFrequencyFeatures};

use crate::tokenizer::Tokenization;
use media_butler_core::config::FeatureConfig;
use serde::{Deserialize, Serialize};

/// Dense numeric features derived from one tokenized filename
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub original: String,
    pub token_frequency: TokenFrequencyFeatures,
    pub ngrams: NgramFeatures,
    pub quality: Option<QualityFeatures>,
    pub patterns: PatternFeatures,
    pub episode: Option<EpisodeFeatures>,
    pub release_group: Option<ReleaseGroupFeatures>,
}

impl FeatureVector {
    /// Concatenated numeric values in fixed subpart order
    pub fn to_array(&self) -> Vec<f32> {
        let mut values = self.token_frequency.values();
        values.extend(self.ngrams.values());
        if let Some(ref quality) = self.quality {
            values.extend(quality.values());
        }
        values.extend(self.patterns.values());
        if let Some(ref episode) = self.episode {
            values.extend(episode.values());
        }
        if let Some(ref group) = self.release_group {
            values.extend(group.values());
        }
        values
    }

    /// Feature names parallel to [`Self::to_array`]
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = TokenFrequencyFeatures::names();
        names.extend(NgramFeatures::names());
        if self.quality.is_some() {
            names.extend(QualityFeatures::names());
        }
        names.extend(PatternFeatures::names());
        if self.episode.is_some() {
            names.extend(EpisodeFeatures::names());
        }
        if self.release_group.is_some() {
            names.extend(ReleaseGroupFeatures::names());
        }
        names
    }

    /// Total number of features across all present subparts
    pub fn feature_count(&self) -> usize {
        self.to_array().len()
    }

    /// A compact name/value summary of the strongest signals, for result
    /// reporting.
    pub fn highlights(&self, limit: usize) -> Vec<(String, f32)> {
        let names = self.feature_names();
        let values = self.to_array();
        let mut pairs: Vec<(String, f32)> = names.into_iter().zip(values).collect();
        pairs.sort_by(|a, b| {
            b.1.abs()
                .partial_cmp(&a.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        pairs.truncate(limit);
        pairs
    }
}

/// Pure `Tokenization -> FeatureVector` projection
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    config: FeatureConfig,
}

impl FeatureEngineer {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Extract all enabled feature subparts. Never fails for a well-formed
    /// tokenization.
    pub fn extract(&self, tokenization: &Tokenization) -> FeatureVector {
        let quality = self
            .config
            .enable_quality
            .then(|| QualityFeatures::from_quality(tokenization.quality.as_ref()));
        let episode = if self.config.enable_episode {
            EpisodeFeatures::from_tokenization(tokenization)
        } else {
            None
        };
        let release_group = ReleaseGroupFeatures::from_tokenization(tokenization);

        FeatureVector {
            original: tokenization.original.clone(),
            token_frequency: TokenFrequencyFeatures::from_tokenization(tokenization),
            ngrams: NgramFeatures::from_tokenization(tokenization),
            quality,
            patterns: PatternFeatures::from_tokenization(tokenization),
            episode,
            release_group,
        }
    }
}
