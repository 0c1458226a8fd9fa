//! Filename-level structural pattern features.

use crate::tokenizer::{EpisodePattern, Tokenization};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static YEAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("Failed to compile year regex"));

/// Overall shape of the filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FilenamePatternType {
    Simple,
    TVShowBasic,
    TVShowComplete,
    Movie,
    Complex,
    #[default]
    Unknown,
}

/// Length bucket of the raw filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LengthCategory {
    Short,
    Medium,
    Long,
    VeryLong,
}

impl LengthCategory {
    fn from_len(len: usize) -> Self {
        match len {
            0..=19 => Self::Short,
            20..=49 => Self::Medium,
            50..=99 => Self::Long,
            _ => Self::VeryLong,
        }
    }
}

/// Confidence that a given sub-pattern was present and well-formed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPatternConfidence {
    pub name: String,
    pub confidence: f32,
}

/// Structural features of the filename as a whole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternFeatures {
    pub pattern_type: FilenamePatternType,
    /// Structural complexity in [0, 10]
    pub complexity: f32,
    pub separator_count: usize,
    /// Alphabetic characters per numeric character
    pub alpha_num_ratio: f32,
    pub has_year: bool,
    pub has_episode: bool,
    pub has_quality: bool,
    pub has_language: bool,
    pub has_release_group: bool,
    pub length_category: LengthCategory,
    /// Fixed set of five sub-pattern confidences
    pub sub_patterns: Vec<SubPatternConfidence>,
}

impl PatternFeatures {
    pub fn from_tokenization(tokenization: &Tokenization) -> Self {
        let name = &tokenization.original;

        let separator_count = name.chars().filter(|c| "._- ".contains(*c)).count();
        let alpha_chars = name.chars().filter(|c| c.is_ascii_alphabetic()).count();
        let digit_chars = name.chars().filter(|c| c.is_ascii_digit()).count();
        let alpha_num_ratio = alpha_chars as f32 / digit_chars.max(1) as f32;

        let has_year = YEAR_REGEX.is_match(name);
        let has_episode = tokenization.episode.is_some();
        let quality = tokenization.quality.as_ref();
        let has_quality = quality
            .map(|q| q.resolution.is_some() || q.source.is_some() || q.video_codec.is_some())
            .unwrap_or(false);
        let has_language = quality
            .map(|q| !q.language_codes.is_empty())
            .unwrap_or(false);
        let has_release_group = tokenization.release_group.is_some();

        let complexity = structural_complexity(name, separator_count, tokenization);
        let length_category = LengthCategory::from_len(name.chars().count());

        let episode_confidence = tokenization
            .episode
            .as_ref()
            .map(|e| extraction_confidence(e.pattern))
            .unwrap_or(0.0);
        let quality_confidence = quality
            .map(|q| {
                let present = [
                    q.resolution.is_some(),
                    q.source.is_some(),
                    q.video_codec.is_some(),
                    q.audio_codec.is_some(),
                ]
                .into_iter()
                .filter(|p| *p)
                .count();
                present as f32 / 4.0
            })
            .unwrap_or(0.0);
        let language_confidence = quality
            .map(|q| (q.language_codes.len() as f32 / 2.0).min(1.0))
            .unwrap_or(0.0);
        let sub_patterns = vec![
            SubPatternConfidence {
                name: "episode".to_string(),
                confidence: episode_confidence,
            },
            SubPatternConfidence {
                name: "quality".to_string(),
                confidence: quality_confidence,
            },
            SubPatternConfidence {
                name: "language".to_string(),
                confidence: language_confidence,
            },
            SubPatternConfidence {
                name: "year".to_string(),
                confidence: f32::from(u8::from(has_year)),
            },
            SubPatternConfidence {
                name: "release_group".to_string(),
                confidence: f32::from(u8::from(has_release_group)),
            },
        ];

        let episode_valid = tokenization
            .episode
            .as_ref()
            .map(|e| e.is_valid() || e.episode.is_some())
            .unwrap_or(false);
        let pattern_type = if episode_valid && has_quality && has_release_group {
            FilenamePatternType::TVShowComplete
        } else if has_episode {
            FilenamePatternType::TVShowBasic
        } else if has_year && has_quality {
            FilenamePatternType::Movie
        } else if tokenization.all_tokens.len() <= 3 && complexity < 3.0 {
            FilenamePatternType::Simple
        } else if complexity >= 7.0 {
            FilenamePatternType::Complex
        } else {
            FilenamePatternType::Unknown
        };

        Self {
            pattern_type,
            complexity,
            separator_count,
            alpha_num_ratio,
            has_year,
            has_episode,
            has_quality,
            has_language,
            has_release_group,
            length_category,
            sub_patterns,
        }
    }

    pub fn values(&self) -> Vec<f32> {
        let mut values = vec![
            self.pattern_type as u8 as f32,
            self.complexity,
            self.separator_count as f32,
            self.alpha_num_ratio,
            f32::from(u8::from(self.has_year)),
            f32::from(u8::from(self.has_episode)),
            f32::from(u8::from(self.has_quality)),
            f32::from(u8::from(self.has_language)),
            f32::from(u8::from(self.has_release_group)),
            self.length_category as u8 as f32,
        ];
        values.extend(self.sub_patterns.iter().map(|s| s.confidence));
        values
    }

    pub fn names() -> Vec<String> {
        let mut names: Vec<String> = [
            "pattern_type",
            "pattern_complexity",
            "pattern_separator_count",
            "pattern_alpha_num_ratio",
            "pattern_has_year",
            "pattern_has_episode",
            "pattern_has_quality",
            "pattern_has_language",
            "pattern_has_release_group",
            "pattern_length_category",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        for sub in ["episode", "quality", "language", "year", "release_group"] {
            names.push(format!("pattern_confidence_{sub}"));
        }
        names
    }
}

/// Extraction confidence by episode pattern kind
pub fn extraction_confidence(pattern: EpisodePattern) -> f32 {
    match pattern {
        EpisodePattern::Standard => 0.95,
        EpisodePattern::Alternative => 0.90,
        EpisodePattern::Verbose => 0.85,
        EpisodePattern::EpisodeOnly => 0.70,
        EpisodePattern::DateBased => 0.60,
        EpisodePattern::None => 0.0,
    }
}

/// Structural complexity: separators/3 + mixed case (2) + alphanumeric
/// interleave (2) + brackets (2) + long token runs (1), capped at 10.
fn structural_complexity(name: &str, separator_count: usize, tokenization: &Tokenization) -> f32 {
    let mut complexity = separator_count as f32 / 3.0;

    let has_lower = name.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = name.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        complexity += 2.0;
    }

    let interleave = name
        .as_bytes()
        .windows(2)
        .filter(|pair| {
            (pair[0].is_ascii_alphabetic() && pair[1].is_ascii_digit())
                || (pair[0].is_ascii_digit() && pair[1].is_ascii_alphabetic())
        })
        .count();
    if interleave >= 4 {
        complexity += 2.0;
    }

    if name.chars().any(|c| "[]()".contains(c)) {
        complexity += 2.0;
    }

    if tokenization.all_tokens.iter().any(|t| t.len() > 15) {
        complexity += 1.0;
    }

    complexity.min(10.0)
}
