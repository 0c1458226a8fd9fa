//! Quality descriptor features with the 0-100 quality score.

use crate::tokenizer::{QualityInfo, QualityTier};
use serde::{Deserialize, Serialize};

/// Release source bucket, ordered by fidelity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum SourceTier {
    #[default]
    Unknown,
    Dvd,
    Broadcast,
    Web,
    Disc,
}

impl SourceTier {
    fn from_source(source: &str) -> Self {
        let lower = source.to_lowercase();
        if lower.contains("bluray") || lower.contains("bdrip") {
            Self::Disc
        } else if lower.contains("web") || lower.contains("dlmux") {
            Self::Web
        } else if lower.contains("hdtv") {
            Self::Broadcast
        } else if lower.contains("dvd") {
            Self::Dvd
        } else {
            Self::Unknown
        }
    }
}

/// Numeric quality features derived from a [`QualityInfo`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityFeatures {
    pub resolution_tier: QualityTier,
    pub source_tier: SourceTier,
    pub hdr: bool,
    pub multi_audio: bool,
    /// Composite score in [0, 100]
    pub score: f32,
    pub is_high: bool,
    pub is_low: bool,
}

impl QualityFeatures {
    pub fn from_quality(quality: Option<&QualityInfo>) -> Self {
        let default = QualityInfo::default();
        let quality = quality.unwrap_or(&default);

        let source_tier = quality
            .source
            .as_deref()
            .map(SourceTier::from_source)
            .unwrap_or_default();

        let hdr = quality
            .additional_indicators
            .iter()
            .any(|tag| tag.contains("HDR") || tag == "DV" || tag == "DOVI")
            || quality
                .video_codec
                .as_deref()
                .map(|c| c.to_uppercase().contains("DOLBY"))
                .unwrap_or(false);

        let multi_audio = quality.language_codes.iter().any(|c| c == "MULTI")
            || matches!(quality.audio_codec.as_deref(), Some("TRUEHD") | Some("DTS"));

        let tier_points = match quality.tier {
            QualityTier::Premium => 40.0,
            QualityTier::UltraHigh => 35.0,
            QualityTier::High => 30.0,
            QualityTier::Standard => 20.0,
            QualityTier::Low => 10.0,
            QualityTier::Unknown => 0.0,
        };
        let source_points = match source_tier {
            SourceTier::Disc => 35.0,
            SourceTier::Web => 25.0,
            SourceTier::Broadcast => 20.0,
            SourceTier::Dvd => 15.0,
            SourceTier::Unknown => 10.0,
        };
        let codec_points = match quality.video_codec.as_deref() {
            Some("HEVC") | Some("H265") | Some("x265") => 25.0,
            Some("AVC") | Some("H264") | Some("x264") => 20.0,
            _ => 10.0,
        };
        let score = tier_points + source_points + codec_points;

        Self {
            resolution_tier: quality.tier,
            source_tier,
            hdr,
            multi_audio,
            score,
            is_high: score >= 75.0,
            is_low: score <= 25.0,
        }
    }

    pub fn values(&self) -> Vec<f32> {
        vec![
            self.resolution_tier as u8 as f32,
            self.source_tier as u8 as f32,
            f32::from(u8::from(self.hdr)),
            f32::from(u8::from(self.multi_audio)),
            self.score,
            f32::from(u8::from(self.is_high)),
            f32::from(u8::from(self.is_low)),
        ]
    }

    pub fn names() -> Vec<String> {
        [
            "quality_resolution_tier",
            "quality_source_tier",
            "quality_hdr",
            "quality_multi_audio",
            "quality_score",
            "quality_is_high",
            "quality_is_low",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}
