//! Structural filename parsing.
//!
//! Splits a release filename into series tokens, episode designator,
//! quality descriptor, language tags, release group and extension. Parsing
//! is fully deterministic: all patterns are compiled once, and no clock,
//! locale or randomness is consulted.

use media_butler_core::config::TokenizationConfig;
use media_butler_core::error::MediaButlerError;
use media_butler_core::validation::is_known_media_extension;
use media_butler_core::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

static TOKEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^._\-\s]+").expect("Failed to compile token regex"));

static STANDARD_EPISODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bS(\d{1,2})E(\d{1,2})\b").expect("Failed to compile standard episode regex")
});

static ALTERNATIVE_EPISODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})x(\d{1,2})\b").expect("Failed to compile alternative episode regex")
});

static VERBOSE_EPISODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bSeason[\s._\-]*(\d{1,2})[\s._\-]*Episode[\s._\-]*(\d{1,3})\b")
        .expect("Failed to compile verbose episode regex")
});

static EPISODE_ONLY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bEp?(\d{1,3})\b").expect("Failed to compile episode-only regex")
});

static DATE_BASED_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b((?:19|20)\d{2})[.\-](\d{2})[.\-](\d{2})\b")
        .expect("Failed to compile date-based episode regex")
});

/// Standalone episode number without an `E` prefix (long-running anime
/// numbering such as `One.Piece.1089`). Years and resolutions are excluded
/// by the caller.
static BARE_EPISODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{2,4})\b").expect("Failed to compile bare episode regex"));

static RESOLUTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(2160p|1080p|720p|480p|4K)\b").expect("Failed to compile resolution regex")
});

static SOURCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(Blu-?Ray|BDRip|WEB-?DLMux|WEB-?DL|WEBRip|WEBMux|DLMux|HDTVMux|HDTV|DVDRip|DVD)\b",
    )
    .expect("Failed to compile source regex")
});

static VIDEO_CODEC_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(x264|x265|H\.?264|H\.?265|HEVC|AVC|XviD|AV1)\b")
        .expect("Failed to compile video codec regex")
});

static AUDIO_CODEC_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(DDP5\.1|TrueHD|FLAC|AAC|AC3|DTS)\b")
        .expect("Failed to compile audio codec regex")
});

static LANGUAGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(SUB[._]ITA|ITA[._]ENG|iTALiAN|ITALIAN|ENGLISH|ITA|ENG|SUB|DUB|MULTI|FORCED)\b")
        .expect("Failed to compile language regex")
});

static EXTRA_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(HDR10\+|HDR10|HDR|DV|DoVi|REMUX|10bit|PROPER|REPACK)\b")
        .expect("Failed to compile extra tag regex")
});

static RELEASE_GROUP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]{3,15}$").expect("Failed to compile release group regex")
});

/// How the episode designator was written in the filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EpisodePattern {
    /// `S01E02`
    Standard,
    /// `1x02`
    Alternative,
    /// `Season 1 Episode 2`
    Verbose,
    /// `E02`, `Ep02` or a standalone episode number
    EpisodeOnly,
    /// `2023.10.05`
    DateBased,
    #[default]
    None,
}

/// Parsed episode designator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeInfo {
    pub season: Option<u32>,
    pub episode: Option<u32>,
    /// The matched text exactly as it appeared
    pub raw: String,
    pub pattern: EpisodePattern,
    /// Episode title found after the designator, if any
    pub additional_title: Option<String>,
}

impl EpisodeInfo {
    pub fn is_valid(&self) -> bool {
        matches!((self.season, self.episode), (Some(s), Some(e)) if s >= 1 && e >= 1)
    }
}

/// Ordered video fidelity bucket
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum QualityTier {
    #[default]
    Unknown,
    Low,
    Standard,
    High,
    UltraHigh,
    Premium,
}

impl QualityTier {
    /// Next tier up, saturating at `Premium`
    pub fn bumped(self) -> Self {
        match self {
            Self::Unknown => Self::Low,
            Self::Low => Self::Standard,
            Self::Standard => Self::High,
            Self::High => Self::UltraHigh,
            Self::UltraHigh | Self::Premium => Self::Premium,
        }
    }

    fn from_resolution(resolution: &str) -> Self {
        match resolution {
            "2160p" | "4K" => Self::UltraHigh,
            "1080p" => Self::High,
            "720p" => Self::Standard,
            "480p" => Self::Low,
            _ => Self::Unknown,
        }
    }
}

/// Parsed quality descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QualityInfo {
    pub resolution: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub source: Option<String>,
    pub tier: QualityTier,
    /// Extra indicators such as HDR, REMUX or PROPER
    pub additional_indicators: Vec<String>,
    pub language_codes: Vec<String>,
    pub subtitle_indicators: Vec<String>,
}

impl QualityInfo {
    fn is_empty(&self) -> bool {
        self.resolution.is_none()
            && self.video_codec.is_none()
            && self.audio_codec.is_none()
            && self.source.is_none()
            && self.additional_indicators.is_empty()
            && self.language_codes.is_empty()
            && self.subtitle_indicators.is_empty()
    }
}

/// Structural parse of a filename
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tokenization {
    pub original: String,
    /// Tokens belonging to the series title, lowercase, in order
    pub series_tokens: Vec<String>,
    /// Every token of the stem, lowercase, in order
    pub all_tokens: Vec<String>,
    /// Tokens removed from the series stream (quality, language, tags)
    pub filtered_tokens: Vec<String>,
    /// Extension without the dot; empty when unrecognized
    pub extension: String,
    pub episode: Option<EpisodeInfo>,
    pub quality: Option<QualityInfo>,
    /// Release group with original casing
    pub release_group: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl Tokenization {
    /// Series tokens joined by single spaces, title-cased per token
    pub fn normalized_series(&self) -> String {
        title_case_tokens(&self.series_tokens)
    }
}

/// Deterministic filename tokenizer
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    config: TokenizationConfig,
}

struct SpannedToken {
    text: String,
    start: usize,
    end: usize,
}

struct EpisodeMatch {
    start: usize,
    end: usize,
    info: EpisodeInfo,
}

impl Tokenizer {
    pub fn new(config: TokenizationConfig) -> Self {
        Self { config }
    }

    /// Parse a filename into its structural components.
    ///
    /// # Errors
    ///
    /// `InvalidFilename` for empty input, `Unparseable` when the stem
    /// yields no tokens at all.
    pub fn tokenize(&self, filename: &str) -> Result<Tokenization> {
        let trimmed = filename.trim();
        if trimmed.is_empty() {
            return Err(MediaButlerError::InvalidFilename {
                reason: "filename is empty".to_string(),
            });
        }

        let (stem, extension) = split_extension(trimmed);
        let tokens = self.spanned_tokens(stem);
        if tokens.is_empty() {
            return Err(MediaButlerError::Unparseable {
                filename: filename.to_string(),
                reason: "no tokens in stem".to_string(),
            });
        }

        let mut metadata = HashMap::new();
        let episode_match = detect_episode(stem, &tokens, &mut metadata);
        let quality = extract_quality(stem);
        let release_group = if self.config.remove_release_tags {
            detect_release_group(stem)
        } else {
            None
        };

        // Lowercased token strings that must not reach the series stream.
        fn track(set: &mut HashSet<String>, list: &mut Vec<String>, text: &str) {
            for part in TOKEN_REGEX.find_iter(text) {
                let lower = part.as_str().to_lowercase();
                if set.insert(lower.clone()) {
                    list.push(lower);
                }
            }
        }
        let mut removed: HashSet<String> = HashSet::new();
        let mut filtered_tokens: Vec<String> = Vec::new();

        if self.config.remove_quality {
            if let Some(ref q) = quality {
                for text in [&q.resolution, &q.source, &q.video_codec, &q.audio_codec]
                    .into_iter()
                    .flatten()
                {
                    track(&mut removed, &mut filtered_tokens, text);
                }
                for text in &q.additional_indicators {
                    track(&mut removed, &mut filtered_tokens, text);
                }
            }
        }
        if self.config.remove_language {
            for m in LANGUAGE_REGEX.find_iter(stem) {
                track(&mut removed, &mut filtered_tokens, m.as_str());
            }
        }
        if let Some(ref group) = release_group {
            track(&mut removed, &mut filtered_tokens, group);
        }

        let (series_tokens, additional_title) = self.partition_series_tokens(
            &tokens,
            episode_match.as_ref(),
            &removed,
        );

        let mut episode = episode_match.map(|m| m.info);
        if let Some(ref mut info) = episode {
            info.additional_title = additional_title;
        }

        let all_tokens: Vec<String> = tokens.iter().map(|t| t.text.to_lowercase()).collect();
        let tokenization = Tokenization {
            original: filename.to_string(),
            series_tokens,
            all_tokens,
            filtered_tokens,
            extension,
            episode,
            quality,
            release_group,
            metadata,
        };

        tracing::trace!(
            filename = %tokenization.original,
            series = %tokenization.normalized_series(),
            "Tokenized filename"
        );
        Ok(tokenization)
    }

    fn spanned_tokens(&self, stem: &str) -> Vec<SpannedToken> {
        if self.config.normalize_separators {
            TOKEN_REGEX
                .find_iter(stem)
                .map(|m| SpannedToken {
                    text: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                })
                .collect()
        } else {
            // Whitespace-only splitting keeps dotted names as single tokens.
            let mut tokens = Vec::new();
            let mut offset = 0;
            for part in stem.split_whitespace() {
                let start = stem[offset..].find(part).map(|p| p + offset).unwrap_or(offset);
                tokens.push(SpannedToken {
                    text: part.to_string(),
                    start,
                    end: start + part.len(),
                });
                offset = start + part.len();
            }
            tokens
        }
    }

    /// Split tokens into the series title (before the episode designator)
    /// and the episode title (after it), dropping removed and too-short
    /// tokens from the series stream.
    fn partition_series_tokens(
        &self,
        tokens: &[SpannedToken],
        episode: Option<&EpisodeMatch>,
        removed: &HashSet<String>,
    ) -> (Vec<String>, Option<String>) {
        let min_len = self.config.min_token_length;
        let mut series = Vec::new();
        let mut title = Vec::new();

        for token in tokens {
            let lower = token.text.to_lowercase();
            if removed.contains(&lower) {
                continue;
            }
            match episode {
                Some(m) if token.start >= m.start && token.end <= m.end => {
                    // Part of the episode designator itself.
                }
                Some(m) if token.start >= m.end => title.push(lower),
                _ => {
                    if lower.chars().count() >= min_len {
                        series.push(lower);
                    }
                }
            }
        }

        let additional_title = if title.is_empty() {
            None
        } else {
            Some(title_case_tokens(&title))
        };
        (series, additional_title)
    }
}

/// Extract the extension after the final dot when it belongs to the known
/// media set; otherwise the whole name is the stem.
fn split_extension(name: &str) -> (&str, String) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if is_known_media_extension(ext) => (stem, ext.to_lowercase()),
        _ => (name, String::new()),
    }
}

fn detect_episode(
    stem: &str,
    tokens: &[SpannedToken],
    metadata: &mut HashMap<String, String>,
) -> Option<EpisodeMatch> {
    if let Some(caps) = STANDARD_EPISODE_REGEX.captures(stem) {
        let m = caps.get(0)?;
        return Some(EpisodeMatch {
            start: m.start(),
            end: m.end(),
            info: EpisodeInfo {
                season: caps.get(1).and_then(|c| c.as_str().parse().ok()),
                episode: caps.get(2).and_then(|c| c.as_str().parse().ok()),
                raw: m.as_str().to_string(),
                pattern: EpisodePattern::Standard,
                additional_title: None,
            },
        });
    }

    if let Some(caps) = ALTERNATIVE_EPISODE_REGEX.captures(stem) {
        let m = caps.get(0)?;
        return Some(EpisodeMatch {
            start: m.start(),
            end: m.end(),
            info: EpisodeInfo {
                season: caps.get(1).and_then(|c| c.as_str().parse().ok()),
                episode: caps.get(2).and_then(|c| c.as_str().parse().ok()),
                raw: m.as_str().to_string(),
                pattern: EpisodePattern::Alternative,
                additional_title: None,
            },
        });
    }

    if let Some(caps) = VERBOSE_EPISODE_REGEX.captures(stem) {
        let m = caps.get(0)?;
        return Some(EpisodeMatch {
            start: m.start(),
            end: m.end(),
            info: EpisodeInfo {
                season: caps.get(1).and_then(|c| c.as_str().parse().ok()),
                episode: caps.get(2).and_then(|c| c.as_str().parse().ok()),
                raw: m.as_str().to_string(),
                pattern: EpisodePattern::Verbose,
                additional_title: None,
            },
        });
    }

    if let Some(caps) = EPISODE_ONLY_REGEX.captures(stem) {
        let m = caps.get(0)?;
        return Some(EpisodeMatch {
            start: m.start(),
            end: m.end(),
            info: EpisodeInfo {
                season: None,
                episode: caps.get(1).and_then(|c| c.as_str().parse().ok()),
                raw: m.as_str().to_string(),
                pattern: EpisodePattern::EpisodeOnly,
                additional_title: None,
            },
        });
    }

    if let Some(caps) = DATE_BASED_REGEX.captures(stem) {
        let m = caps.get(0)?;
        let (year, month, day) = (
            caps.get(1).map(|c| c.as_str()).unwrap_or_default(),
            caps.get(2).map(|c| c.as_str()).unwrap_or_default(),
            caps.get(3).map(|c| c.as_str()).unwrap_or_default(),
        );
        metadata.insert("air_date".to_string(), format!("{year}-{month}-{day}"));
        return Some(EpisodeMatch {
            start: m.start(),
            end: m.end(),
            info: EpisodeInfo {
                season: None,
                episode: None,
                raw: m.as_str().to_string(),
                pattern: EpisodePattern::DateBased,
                additional_title: None,
            },
        });
    }

    // Long-running shows number episodes without any marker. A standalone
    // 2-4 digit token counts, unless it reads as a year.
    for m in BARE_EPISODE_REGEX.find_iter(stem) {
        let value: u32 = match m.as_str().parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        if (1900..=2099).contains(&value) {
            continue;
        }
        // Only a full token qualifies; resolutions like 720p never split
        // into a bare number so positional containment is enough.
        if tokens
            .iter()
            .any(|t| t.start == m.start() && t.end == m.end())
        {
            return Some(EpisodeMatch {
                start: m.start(),
                end: m.end(),
                info: EpisodeInfo {
                    season: None,
                    episode: Some(value),
                    raw: m.as_str().to_string(),
                    pattern: EpisodePattern::EpisodeOnly,
                    additional_title: None,
                },
            });
        }
    }

    None
}

fn extract_quality(stem: &str) -> Option<QualityInfo> {
    let mut quality = QualityInfo::default();

    if let Some(m) = RESOLUTION_REGEX.find(stem) {
        quality.resolution = Some(canonical_resolution(m.as_str()));
    }
    if let Some(m) = SOURCE_REGEX.find(stem) {
        quality.source = Some(canonical_source(m.as_str()));
    }
    if let Some(m) = VIDEO_CODEC_REGEX.find(stem) {
        quality.video_codec = Some(canonical_video_codec(m.as_str()));
    }
    if let Some(m) = AUDIO_CODEC_REGEX.find(stem) {
        quality.audio_codec = Some(m.as_str().to_uppercase());
    }
    for m in EXTRA_TAG_REGEX.find_iter(stem) {
        let tag = m.as_str().to_uppercase();
        if !quality.additional_indicators.contains(&tag) {
            quality.additional_indicators.push(tag);
        }
    }

    for code in extract_language_codes(stem) {
        if code == "SUB" || code == "FORCED" {
            quality.subtitle_indicators.push(code.clone());
        }
        quality.language_codes.push(code);
    }

    let mut tier = quality
        .resolution
        .as_deref()
        .map(QualityTier::from_resolution)
        .unwrap_or_default();
    if matches!(quality.source.as_deref(), Some("BluRay") | Some("BDRip")) {
        tier = tier.bumped();
    }
    quality.tier = tier;

    if quality.is_empty() {
        None
    } else {
        Some(quality)
    }
}

/// Language codes in order of appearance, uppercased, compound tags split
/// into their component codes, deduplicated.
fn extract_language_codes(stem: &str) -> Vec<String> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();
    for m in LANGUAGE_REGEX.find_iter(stem) {
        let upper = m.as_str().to_uppercase();
        let parts: Vec<String> = if upper.contains('.') || upper.contains('_') {
            upper
                .split(['.', '_'])
                .map(|p| p.to_string())
                .collect()
        } else {
            vec![upper]
        };
        for part in parts {
            if seen.insert(part.clone()) {
                codes.push(part);
            }
        }
    }
    codes
}

fn detect_release_group(stem: &str) -> Option<String> {
    let (_, candidate) = stem.rsplit_once('-')?;
    if RELEASE_GROUP_REGEX.is_match(candidate) {
        Some(candidate.to_string())
    } else {
        None
    }
}

fn canonical_resolution(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower == "4k" {
        "4K".to_string()
    } else {
        lower
    }
}

fn canonical_source(raw: &str) -> String {
    match raw.to_lowercase().replace('-', "").as_str() {
        "bluray" => "BluRay",
        "bdrip" => "BDRip",
        "webdlmux" => "WEB-DLMux",
        "webdl" => "WEB-DL",
        "webrip" => "WEBRip",
        "webmux" => "WEBMux",
        "dlmux" => "DLMux",
        "hdtvmux" => "HDTVMux",
        "hdtv" => "HDTV",
        "dvdrip" => "DVDRip",
        "dvd" => "DVD",
        other => return other.to_uppercase(),
    }
    .to_string()
}

fn canonical_video_codec(raw: &str) -> String {
    match raw.to_lowercase().replace('.', "").as_str() {
        "x264" => "x264",
        "x265" => "x265",
        "h264" => "H264",
        "h265" => "H265",
        "hevc" => "HEVC",
        "avc" => "AVC",
        "xvid" => "XviD",
        "av1" => "AV1",
        other => return other.to_uppercase(),
    }
    .to_string()
}

fn title_case_tokens(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|token| {
            let mut chars = token.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
