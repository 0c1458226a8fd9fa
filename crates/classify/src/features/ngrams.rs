//! N-gram extraction over the series token stream.

use crate::features::token_frequency::{classify_token, token_weight, TokenCategory};
use crate::tokenizer::Tokenization;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A contiguous token n-gram with its statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ngram {
    pub tokens: Vec<String>,
    pub n: usize,
    pub frequency: usize,
    /// Frequency relative to all distinct n-grams of the same n
    pub relative_frequency: f32,
    /// Mean discriminative weight of the constituent tokens
    pub discriminative_power: f32,
    /// Majority category among the constituents
    pub context: TokenCategory,
    /// Constituents span more than one token category
    pub cross_boundary: bool,
}

/// N-grams for n in {1, 2, 3}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NgramFeatures {
    pub ngrams: Vec<Ngram>,
}

impl NgramFeatures {
    pub fn from_tokenization(tokenization: &Tokenization) -> Self {
        let tokens = &tokenization.series_tokens;
        let mut ngrams = Vec::new();

        for n in 1..=3usize {
            if tokens.len() < n {
                continue;
            }
            let mut counts: HashMap<&[String], usize> = HashMap::new();
            for window in tokens.windows(n) {
                *counts.entry(window).or_insert(0) += 1;
            }
            let total: usize = counts.values().sum();

            let mut grams: Vec<Ngram> = counts
                .into_iter()
                .map(|(window, frequency)| {
                    let categories: Vec<TokenCategory> = window
                        .iter()
                        .map(|t| classify_token(t, tokenization))
                        .collect();
                    let context = majority_category(&categories);
                    let cross_boundary = categories.windows(2).any(|pair| pair[0] != pair[1]);
                    let discriminative_power = window
                        .iter()
                        .map(|t| token_weight(t))
                        .sum::<f32>()
                        / n as f32;
                    Ngram {
                        tokens: window.to_vec(),
                        n,
                        frequency,
                        relative_frequency: frequency as f32 / total as f32,
                        discriminative_power,
                        context,
                        cross_boundary,
                    }
                })
                .collect();
            grams.sort_by(|a, b| {
                b.frequency
                    .cmp(&a.frequency)
                    .then_with(|| a.tokens.cmp(&b.tokens))
            });
            ngrams.extend(grams);
        }

        Self { ngrams }
    }

    fn stats_for(&self, n: usize) -> (f32, f32, f32, f32) {
        let grams: Vec<&Ngram> = self.ngrams.iter().filter(|g| g.n == n).collect();
        if grams.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }
        let count = grams.len() as f32;
        let mean_rel = grams.iter().map(|g| g.relative_frequency).sum::<f32>() / count;
        let mean_power = grams.iter().map(|g| g.discriminative_power).sum::<f32>() / count;
        let cross_fraction = grams.iter().filter(|g| g.cross_boundary).count() as f32 / count;
        (count, mean_rel, mean_power, cross_fraction)
    }

    pub fn values(&self) -> Vec<f32> {
        let mut values = Vec::with_capacity(12);
        for n in 1..=3 {
            let (count, mean_rel, mean_power, cross_fraction) = self.stats_for(n);
            values.extend([count, mean_rel, mean_power, cross_fraction]);
        }
        values
    }

    pub fn names() -> Vec<String> {
        let mut names = Vec::with_capacity(12);
        for n in 1..=3 {
            names.push(format!("ngram{n}_count"));
            names.push(format!("ngram{n}_mean_relative_frequency"));
            names.push(format!("ngram{n}_mean_discriminative_power"));
            names.push(format!("ngram{n}_cross_boundary_fraction"));
        }
        names
    }
}

fn majority_category(categories: &[TokenCategory]) -> TokenCategory {
    let mut counts: HashMap<TokenCategory, usize> = HashMap::new();
    for category in categories {
        *counts.entry(*category).or_insert(0) += 1;
    }
    // Deterministic winner: highest count, ties resolved by the first
    // constituent holding that count.
    let best = counts.values().copied().max().unwrap_or(0);
    categories
        .iter()
        .copied()
        .find(|c| counts.get(c) == Some(&best))
        .unwrap_or(TokenCategory::SeriesName)
}
