//! Release-group reputation features from a static table of known groups.

use crate::tokenizer::{QualityTier, Tokenization};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reputation bucket for a release group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum GroupReputation {
    #[default]
    Unknown,
    Poor,
    Average,
    Good,
    Premium,
}

impl GroupReputation {
    /// Quality tier a group of this reputation typically releases
    pub fn typical_tier(self) -> QualityTier {
        match self {
            Self::Premium => QualityTier::UltraHigh,
            Self::Good => QualityTier::High,
            Self::Average => QualityTier::Standard,
            Self::Poor => QualityTier::Low,
            Self::Unknown => QualityTier::Unknown,
        }
    }
}

/// Region a release group primarily serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GroupRegion {
    #[default]
    Unknown,
    Italian,
    English,
    International,
}

/// Content a release group focuses on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GroupSpecialization {
    #[default]
    Unknown,
    TVShows,
    Movies,
    Anime,
    General,
}

type GroupProfile = (GroupReputation, GroupRegion, GroupSpecialization);

/// Known release groups, keyed by lowercase name. Seeded once at startup.
static KNOWN_GROUPS: Lazy<HashMap<&'static str, GroupProfile>> = Lazy::new(|| {
    use GroupRegion::*;
    use GroupReputation::*;
    use GroupSpecialization::*;

    let mut groups: HashMap<&'static str, GroupProfile> = HashMap::new();
    // Italian TV and anime scene
    groups.insert("ubi", (Good, Italian, TVShows));
    groups.insert("mem", (Average, Italian, TVShows));
    groups.insert("igm", (Average, Italian, Movies));
    groups.insert("bamax", (Average, Italian, TVShows));
    groups.insert("novarip", (Good, Italian, Movies));
    groups.insert("darksidemux", (Good, Italian, TVShows));
    groups.insert("pir8", (Average, Italian, General));
    groups.insert("morpheus", (Average, Italian, TVShows));
    // International anime fansub groups
    groups.insert("horriblesubs", (Premium, International, Anime));
    groups.insert("subsplease", (Premium, International, Anime));
    groups.insert("erairaws", (Good, International, Anime));
    // English-language scene
    groups.insert("ntb", (Good, English, TVShows));
    groups.insert("fov", (Good, English, TVShows));
    groups.insert("dimension", (Good, English, TVShows));
    groups.insert("sparks", (Good, English, Movies));
    groups.insert("rarbg", (Premium, English, General));
    groups.insert("yts", (Average, English, Movies));
    groups.insert("yify", (Average, English, Movies));
    groups.insert("ettv", (Poor, English, General));
    groups
});

/// True when the group name belongs to a known Italian release group
pub fn is_italian_group(name: &str) -> bool {
    KNOWN_GROUPS
        .get(name.to_lowercase().as_str())
        .map(|(_, region, _)| *region == GroupRegion::Italian)
        .unwrap_or(false)
}

/// Features describing the release group of a tokenized filename
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseGroupFeatures {
    pub name: String,
    pub reputation: GroupReputation,
    pub region: GroupRegion,
    pub specialization: GroupSpecialization,
    pub typical_tier: QualityTier,
    pub well_known: bool,
    pub identification_confidence: f32,
}

impl ReleaseGroupFeatures {
    pub fn from_tokenization(tokenization: &Tokenization) -> Option<Self> {
        let name = tokenization.release_group.as_ref()?;
        Some(Self::from_name(name))
    }

    pub fn from_name(name: &str) -> Self {
        let profile = KNOWN_GROUPS.get(name.to_lowercase().as_str());
        let (reputation, region, specialization) = profile.copied().unwrap_or_default();
        Self {
            name: name.to_string(),
            reputation,
            region,
            specialization,
            typical_tier: reputation.typical_tier(),
            well_known: profile.is_some(),
            identification_confidence: if profile.is_some() { 0.95 } else { 0.40 },
        }
    }

    pub fn values(&self) -> Vec<f32> {
        vec![
            self.reputation as u8 as f32,
            self.region as u8 as f32,
            self.specialization as u8 as f32,
            self.typical_tier as u8 as f32,
            f32::from(u8::from(self.well_known)),
            self.identification_confidence,
        ]
    }

    pub fn names() -> Vec<String> {
        [
            "group_reputation",
            "group_region",
            "group_specialization",
            "group_typical_tier",
            "group_well_known",
            "group_identification_confidence",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}
