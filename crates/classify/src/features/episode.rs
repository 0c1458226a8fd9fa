//! Episode designator features.

use crate::features::patterns::extraction_confidence;
use crate::tokenizer::{EpisodeInfo, Tokenization};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static MULTI_PART_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(pt|part|parte)\b").expect("Failed to compile multi-part regex")
});

static SPECIAL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(pilot|finale|special|ova|recap|bonus|director)\b")
        .expect("Failed to compile special episode regex")
});

/// How far along its run a series is, judged by season and episode numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeriesMaturity {
    New,
    Developing,
    Mature,
    Established,
    LongRunning,
    VeryLongRunning,
}

impl SeriesMaturity {
    fn from_numbers(season: Option<u32>, episode: Option<u32>) -> Self {
        if let Some(e) = episode {
            if e > 500 {
                return Self::VeryLongRunning;
            }
            if e > 100 {
                return Self::LongRunning;
            }
        }
        match season {
            Some(s) if s > 10 => Self::Established,
            Some(s) if s > 5 => Self::Mature,
            Some(s) if s > 2 => Self::Developing,
            _ => Self::New,
        }
    }
}

/// Numeric features derived from the episode designator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeFeatures {
    /// Season normalized by 20, clipped to [0, 1]
    pub season_norm: f32,
    /// Episode normalized by 200, clipped to [0, 1]
    pub episode_norm: f32,
    pub has_season: bool,
    pub has_episode: bool,
    pub multi_part: bool,
    pub special: bool,
    /// Episode number above 100
    pub long_running: bool,
    pub maturity: SeriesMaturity,
    pub extraction_confidence: f32,
}

impl EpisodeFeatures {
    pub fn from_tokenization(tokenization: &Tokenization) -> Option<Self> {
        let episode = tokenization.episode.as_ref()?;
        Some(Self::from_episode(episode, &tokenization.original))
    }

    fn from_episode(info: &EpisodeInfo, raw_filename: &str) -> Self {
        let season_norm = info
            .season
            .map(|s| (s as f32 / 20.0).min(1.0))
            .unwrap_or(0.0);
        let episode_norm = info
            .episode
            .map(|e| (e as f32 / 200.0).min(1.0))
            .unwrap_or(0.0);

        Self {
            season_norm,
            episode_norm,
            has_season: info.season.is_some(),
            has_episode: info.episode.is_some(),
            multi_part: MULTI_PART_REGEX.is_match(raw_filename),
            special: SPECIAL_REGEX.is_match(raw_filename),
            long_running: info.episode.map(|e| e > 100).unwrap_or(false),
            maturity: SeriesMaturity::from_numbers(info.season, info.episode),
            extraction_confidence: extraction_confidence(info.pattern),
        }
    }

    pub fn values(&self) -> Vec<f32> {
        vec![
            self.season_norm,
            self.episode_norm,
            f32::from(u8::from(self.has_season)),
            f32::from(u8::from(self.has_episode)),
            f32::from(u8::from(self.multi_part)),
            f32::from(u8::from(self.special)),
            f32::from(u8::from(self.long_running)),
            self.maturity as u8 as f32,
            self.extraction_confidence,
        ]
    }

    pub fn names() -> Vec<String> {
        [
            "episode_season_norm",
            "episode_number_norm",
            "episode_has_season",
            "episode_has_number",
            "episode_multi_part",
            "episode_special",
            "episode_long_running",
            "episode_series_maturity",
            "episode_extraction_confidence",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}
