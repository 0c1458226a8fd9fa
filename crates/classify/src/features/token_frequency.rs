//! Token frequency analysis over the series token stream.

use crate::tokenizer::Tokenization;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Discriminative weights for common tokens, seeded once at startup.
/// Stopwords carry little signal, media-generic words a bit more, and
/// everything else defaults to 1.0.
static TOKEN_WEIGHTS: Lazy<HashMap<&'static str, f32>> = Lazy::new(|| {
    let mut weights = HashMap::new();
    let stopwords = [
        // Italian articles and prepositions
        "il", "lo", "la", "le", "gli", "un", "una", "uno", "di", "del", "della", "dei", "delle",
        "da", "in", "con", "su", "per", "tra", "fra", "ed", "al", "ai", "alla",
        // English
        "the", "an", "of", "and", "on", "at", "to", "by",
    ];
    for word in stopwords {
        weights.insert(word, 0.3);
    }
    let generic = [
        "serie", "stagione", "episodio", "puntata", "season", "episode", "complete", "completa",
        "final", "finale", "show", "movie", "film",
    ];
    for word in generic {
        weights.insert(word, 0.6);
    }
    weights
});

static LANGUAGE_TOKENS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["ita", "eng", "sub", "dub", "multi", "italian", "english", "forced"]
        .into_iter()
        .collect()
});

static QUALITY_TOKENS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "2160p", "1080p", "720p", "480p", "4k", "bluray", "bdrip", "web", "dl", "webdl", "webrip",
        "webmux", "dlmux", "mux", "hdtv", "hdtvmux", "dvdrip", "dvd",
    ]
    .into_iter()
    .collect()
});

static TECHNICAL_TOKENS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "x264", "x265", "h264", "h265", "hevc", "avc", "xvid", "av1", "aac", "ac3", "dts", "ddp5",
        "truehd", "flac", "hdr", "hdr10", "remux", "10bit", "proper", "repack",
    ]
    .into_iter()
    .collect()
});

/// Role a token plays within a filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenCategory {
    SeriesName,
    Quality,
    Language,
    Technical,
    Episode,
}

/// Discriminative weight for a token; unknown tokens weigh 1.0
pub fn token_weight(token: &str) -> f32 {
    TOKEN_WEIGHTS.get(token).copied().unwrap_or(1.0)
}

/// Classify a token by the static dictionaries and the tokenization
/// context (episode designator tokens win over dictionary hits).
pub fn classify_token(token: &str, tokenization: &Tokenization) -> TokenCategory {
    if let Some(ref episode) = tokenization.episode {
        let raw_lower = episode.raw.to_lowercase();
        if raw_lower == token
            || raw_lower
                .split(|c: char| "._- ".contains(c))
                .any(|part| part == token)
        {
            return TokenCategory::Episode;
        }
    }
    if LANGUAGE_TOKENS.contains(token) {
        return TokenCategory::Language;
    }
    if QUALITY_TOKENS.contains(token) {
        return TokenCategory::Quality;
    }
    if TECHNICAL_TOKENS.contains(token) || token.chars().all(|c| c.is_ascii_digit()) {
        return TokenCategory::Technical;
    }
    TokenCategory::SeriesName
}

/// A token with its count and discriminative score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredToken {
    pub token: String,
    pub count: usize,
    pub score: f32,
}

/// Frequency analysis of the series token stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenFrequencyFeatures {
    pub total_tokens: usize,
    pub unique_tokens: usize,
    /// Top tokens by `tf * weight`, at most 10
    pub top_tokens: Vec<ScoredToken>,
    /// Rarest tokens by count, at most 5
    pub rare_tokens: Vec<ScoredToken>,
    pub avg_token_length: f32,
    /// Purely-alphabetic tokens per purely-numeric token
    pub alpha_digit_ratio: f32,
    /// unique / total
    pub diversity: f32,
    pub language_codes: Vec<String>,
    /// Token counts per category over the full token list
    pub category_counts: HashMap<TokenCategory, usize>,
}

impl TokenFrequencyFeatures {
    pub fn from_tokenization(tokenization: &Tokenization) -> Self {
        let series = &tokenization.series_tokens;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for token in series {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }

        let total_tokens = series.len();
        let unique_tokens = counts.len();

        let mut scored: Vec<ScoredToken> = counts
            .iter()
            .map(|(token, &count)| ScoredToken {
                token: (*token).to_string(),
                count,
                score: count as f32 * token_weight(token),
            })
            .collect();

        let mut top_tokens = scored.clone();
        top_tokens.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.token.cmp(&b.token))
        });
        top_tokens.truncate(10);

        scored.sort_by(|a, b| a.count.cmp(&b.count).then_with(|| a.token.cmp(&b.token)));
        scored.truncate(5);
        let rare_tokens = scored;

        let avg_token_length = if total_tokens == 0 {
            0.0
        } else {
            series.iter().map(|t| t.chars().count()).sum::<usize>() as f32 / total_tokens as f32
        };

        let alpha_count = series
            .iter()
            .filter(|t| t.chars().all(|c| c.is_ascii_alphabetic()))
            .count();
        let digit_count = series
            .iter()
            .filter(|t| t.chars().all(|c| c.is_ascii_digit()))
            .count();
        let alpha_digit_ratio = alpha_count as f32 / digit_count.max(1) as f32;

        let diversity = if total_tokens == 0 {
            0.0
        } else {
            unique_tokens as f32 / total_tokens as f32
        };

        let language_codes = tokenization
            .quality
            .as_ref()
            .map(|q| q.language_codes.clone())
            .unwrap_or_default();

        let mut category_counts: HashMap<TokenCategory, usize> = HashMap::new();
        for token in &tokenization.all_tokens {
            let category = classify_token(token, tokenization);
            *category_counts.entry(category).or_insert(0) += 1;
        }

        Self {
            total_tokens,
            unique_tokens,
            top_tokens,
            rare_tokens,
            avg_token_length,
            alpha_digit_ratio,
            diversity,
            language_codes,
            category_counts,
        }
    }

    fn category_count(&self, category: TokenCategory) -> f32 {
        self.category_counts.get(&category).copied().unwrap_or(0) as f32
    }

    pub fn values(&self) -> Vec<f32> {
        let top_score_mean = if self.top_tokens.is_empty() {
            0.0
        } else {
            self.top_tokens.iter().map(|t| t.score).sum::<f32>() / self.top_tokens.len() as f32
        };
        vec![
            self.total_tokens as f32,
            self.unique_tokens as f32,
            self.avg_token_length,
            self.alpha_digit_ratio,
            self.diversity,
            top_score_mean,
            self.category_count(TokenCategory::SeriesName),
            self.category_count(TokenCategory::Quality),
            self.category_count(TokenCategory::Language),
            self.category_count(TokenCategory::Technical),
            self.category_count(TokenCategory::Episode),
            self.language_codes.len() as f32,
        ]
    }

    pub fn names() -> Vec<String> {
        [
            "tf_total_tokens",
            "tf_unique_tokens",
            "tf_avg_token_length",
            "tf_alpha_digit_ratio",
            "tf_diversity",
            "tf_top_score_mean",
            "tf_series_name_count",
            "tf_quality_count",
            "tf_language_count",
            "tf_technical_count",
            "tf_episode_count",
            "tf_language_code_count",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}
