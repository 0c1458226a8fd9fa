//! Category registry: canonical names, aliases, thresholds and suggestions.
//!
//! The registry is read-mostly. Readers take a cheap `Arc` snapshot of the
//! internal maps; writers clone the maps, mutate the clone and swap it in
//! behind a single writer lock, so readers never observe a half-applied
//! update.

use media_butler_core::error::MediaButlerError;
use media_butler_core::validation::SEPARATOR_REGEX;
use media_butler_core::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Reserved words that can never be category names
const RESERVED_NAMES: &[&str] = &["NEW", "UNKNOWN", "NONE"];

const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 100;

/// Kind of series a category represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryType {
    TVSeries,
    Movie,
    Anime,
    Documentary,
    MiniSeries,
    Other,
}

/// A registered category with aliases and routing threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDefinition {
    /// Uppercase, separator-normalized primary key
    pub canonical_name: String,
    /// Human-facing name
    pub display_name: String,
    pub category_type: CategoryType,
    /// Per-category auto-classify threshold, clamped to [0, 1]
    pub confidence_threshold: f64,
    pub aliases: Vec<String>,
    pub keywords: Vec<String>,
    pub active: bool,
    pub file_count: u64,
    pub avg_confidence: f64,
}

impl CategoryDefinition {
    /// Create a definition with sensible defaults for a TV series
    pub fn new(canonical_name: impl Into<String>, category_type: CategoryType) -> Self {
        let canonical_name = canonical_name.into();
        let display_name = title_case(&canonical_name);
        Self {
            canonical_name,
            display_name,
            category_type,
            confidence_threshold: 0.85,
            aliases: Vec::new(),
            keywords: Vec::new(),
            active: true,
            file_count: 0,
            avg_confidence: 0.0,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }
}

/// Partial update for an existing category
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub display_name: Option<String>,
    pub category_type: Option<CategoryType>,
    pub confidence_threshold: Option<f64>,
    pub add_aliases: Vec<String>,
    pub add_keywords: Vec<String>,
    pub active: Option<bool>,
    pub file_count: Option<u64>,
    pub avg_confidence: Option<f64>,
}

/// Outcome of merging one category into another
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResult {
    pub source: String,
    pub target: String,
    pub files_transferred: u64,
    pub aliases_transferred: usize,
    pub keywords_transferred: usize,
}

/// A ranked category suggestion for a filename
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub category: String,
    pub confidence: f64,
    /// An alias or the canonical name matched the filename exactly
    pub alias_match: bool,
    pub keyword_hits: usize,
    pub token_overlap: usize,
}

/// Result of validating a raw category name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameValidation {
    pub normalized: String,
    pub is_valid: bool,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct RegistryInner {
    /// canonical name -> definition
    categories: HashMap<String, CategoryDefinition>,
    /// normalized alias -> canonical name
    aliases: HashMap<String, String>,
}

/// Process-wide category registry
#[derive(Debug, Default)]
pub struct CategoryRegistry {
    inner: RwLock<Arc<RegistryInner>>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with a small set of well-known categories
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.seed_defaults();
        registry
    }

    /// Register a handful of well-known Italian TV and anime categories.
    /// Already-registered names are left untouched.
    pub fn seed_defaults(&self) {
        let defaults = [
            CategoryDefinition::new("IL TRONO DI SPADE", CategoryType::TVSeries)
                .with_aliases(vec!["GAME OF THRONES".to_string(), "GOT".to_string()])
                .with_keywords(vec!["trono".to_string(), "spade".to_string()]),
            CategoryDefinition::new("ONE PIECE", CategoryType::Anime)
                .with_keywords(vec!["piece".to_string()]),
            CategoryDefinition::new("BREAKING BAD", CategoryType::TVSeries)
                .with_keywords(vec!["breaking".to_string(), "bad".to_string()]),
        ];
        for def in defaults {
            if !self.exists(&def.canonical_name) {
                let _ = self.register(def);
            }
        }
    }

    /// Normalize a raw name to canonical form.
    ///
    /// Uppercases, collapses separator runs to single spaces, trims and
    /// strips a leading `THE ` article.
    pub fn normalize(raw: &str) -> Result<String> {
        let collapsed = SEPARATOR_REGEX.replace_all(raw, " ");
        let upper = collapsed.trim().to_uppercase();
        let stripped = upper.strip_prefix("THE ").unwrap_or(&upper).trim();
        if stripped.is_empty() {
            return Err(MediaButlerError::InvalidName(format!(
                "'{raw}' normalizes to an empty name"
            )));
        }
        if !stripped.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(MediaButlerError::InvalidName(format!(
                "'{raw}' contains no alphanumeric characters"
            )));
        }
        Ok(stripped.to_string())
    }

    /// Resolve a category by canonical name or alias
    pub fn get(&self, name: &str) -> Option<CategoryDefinition> {
        let normalized = Self::normalize(name).ok()?;
        let inner = self.snapshot();
        if let Some(def) = inner.categories.get(&normalized) {
            return Some(def.clone());
        }
        inner
            .aliases
            .get(&normalized)
            .and_then(|canonical| inner.categories.get(canonical))
            .cloned()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Per-category confidence threshold
    pub fn threshold(&self, name: &str) -> Result<f64> {
        self.get(name)
            .map(|def| def.confidence_threshold)
            .ok_or_else(|| MediaButlerError::UnknownCategory(name.to_string()))
    }

    /// Register a new category definition
    pub fn register(&self, mut def: CategoryDefinition) -> Result<()> {
        let canonical = Self::normalize(&def.canonical_name)
            .map_err(|e| MediaButlerError::InvalidDefinition(e.to_string()))?;
        let validation = Self::validate_name(&def.canonical_name);
        if !validation.is_valid {
            return Err(MediaButlerError::InvalidDefinition(
                validation.issues.join("; "),
            ));
        }
        def.canonical_name = canonical.clone();
        def.confidence_threshold = def.confidence_threshold.clamp(0.0, 1.0);

        let mut guard = self.inner.write();
        if guard.categories.contains_key(&canonical) || guard.aliases.contains_key(&canonical) {
            return Err(MediaButlerError::AlreadyExists(canonical));
        }

        let mut inner = (**guard).clone();
        for alias in &def.aliases {
            if let Ok(normalized_alias) = Self::normalize(alias) {
                if normalized_alias != canonical && !inner.categories.contains_key(&normalized_alias)
                {
                    inner.aliases.insert(normalized_alias, canonical.clone());
                }
            }
        }
        inner.categories.insert(canonical, def);
        *guard = Arc::new(inner);
        Ok(())
    }

    /// Apply a partial update to an existing category
    pub fn update(&self, name: &str, patch: CategoryPatch) -> Result<CategoryDefinition> {
        let canonical =
            Self::normalize(name).map_err(|_| MediaButlerError::NotFound(name.to_string()))?;
        let mut guard = self.inner.write();
        let resolved = if guard.categories.contains_key(&canonical) {
            canonical
        } else {
            guard
                .aliases
                .get(&canonical)
                .cloned()
                .ok_or_else(|| MediaButlerError::NotFound(name.to_string()))?
        };

        let mut inner = (**guard).clone();
        let canonical_names: Vec<String> = inner.categories.keys().cloned().collect();
        let def = inner
            .categories
            .get_mut(&resolved)
            .ok_or_else(|| MediaButlerError::NotFound(name.to_string()))?;

        if let Some(display_name) = patch.display_name {
            def.display_name = display_name;
        }
        if let Some(category_type) = patch.category_type {
            def.category_type = category_type;
        }
        if let Some(threshold) = patch.confidence_threshold {
            def.confidence_threshold = threshold.clamp(0.0, 1.0);
        }
        if let Some(active) = patch.active {
            def.active = active;
        }
        if let Some(file_count) = patch.file_count {
            def.file_count = file_count;
        }
        if let Some(avg_confidence) = patch.avg_confidence {
            def.avg_confidence = avg_confidence.clamp(0.0, 1.0);
        }
        for alias in patch.add_aliases {
            if let Ok(normalized_alias) = Self::normalize(&alias) {
                if normalized_alias != resolved
                    && !canonical_names.contains(&normalized_alias)
                    && !def.aliases.iter().any(|a| a == &alias)
                {
                    def.aliases.push(alias);
                    inner.aliases.insert(normalized_alias, resolved.clone());
                }
            }
        }
        for keyword in patch.add_keywords {
            let keyword = keyword.to_lowercase();
            if !def.keywords.contains(&keyword) {
                def.keywords.push(keyword);
            }
        }

        let updated = def.clone();
        *guard = Arc::new(inner);
        Ok(updated)
    }

    /// Merge `source` into `target`, transferring file count, aliases and
    /// keywords. The source is deactivated and its canonical name becomes
    /// an alias of the target.
    pub fn merge(&self, source: &str, target: &str) -> Result<MergeResult> {
        let source_name =
            Self::normalize(source).map_err(|_| MediaButlerError::NotFound(source.to_string()))?;
        let target_name =
            Self::normalize(target).map_err(|_| MediaButlerError::NotFound(target.to_string()))?;
        if source_name == target_name {
            return Err(MediaButlerError::SameCategory(source_name));
        }

        let mut guard = self.inner.write();
        if !guard.categories.contains_key(&source_name) {
            return Err(MediaButlerError::NotFound(source_name));
        }
        if !guard.categories.contains_key(&target_name) {
            return Err(MediaButlerError::NotFound(target_name));
        }

        let mut inner = (**guard).clone();
        let source_def = inner
            .categories
            .get(&source_name)
            .cloned()
            .ok_or_else(|| MediaButlerError::NotFound(source_name.clone()))?;

        let mut aliases_transferred = 0;
        let mut keywords_transferred = 0;
        if let Some(target_def) = inner.categories.get_mut(&target_name) {
            target_def.file_count += source_def.file_count;
            for alias in &source_def.aliases {
                if !target_def.aliases.contains(alias) {
                    target_def.aliases.push(alias.clone());
                    aliases_transferred += 1;
                }
            }
            target_def.aliases.push(source_def.canonical_name.clone());
            for keyword in &source_def.keywords {
                if !target_def.keywords.contains(keyword) {
                    target_def.keywords.push(keyword.clone());
                    keywords_transferred += 1;
                }
            }
        }

        // Repoint the source's aliases and its own name at the target.
        for canonical in inner.aliases.values_mut() {
            if *canonical == source_name {
                *canonical = target_name.clone();
            }
        }
        inner
            .aliases
            .insert(source_name.clone(), target_name.clone());
        if let Some(source_def) = inner.categories.get_mut(&source_name) {
            source_def.active = false;
        }

        let result = MergeResult {
            source: source_name,
            target: target_name,
            files_transferred: source_def.file_count,
            aliases_transferred,
            keywords_transferred,
        };
        *guard = Arc::new(inner);

        tracing::info!(
            source = %result.source,
            target = %result.target,
            files = result.files_transferred,
            "Merged categories"
        );
        Ok(result)
    }

    /// Suggest categories for a filename, ranked by a weighted blend of
    /// alias exact match, keyword hit density and series-token overlap.
    pub fn suggest(&self, filename: &str, k: usize) -> Vec<CategorySuggestion> {
        if k == 0 {
            return Vec::new();
        }
        let normalized_filename = match Self::normalize(filename) {
            Ok(n) => n,
            Err(_) => return Vec::new(),
        };
        let filename_tokens: Vec<String> = normalized_filename
            .split(' ')
            .map(|t| t.to_lowercase())
            .collect();

        let inner = self.snapshot();
        let mut suggestions: Vec<CategorySuggestion> = Vec::new();

        for def in inner.categories.values().filter(|d| d.active) {
            let alias_match = normalized_filename.contains(&def.canonical_name)
                || def.aliases.iter().any(|alias| {
                    Self::normalize(alias)
                        .map(|a| normalized_filename.contains(&a))
                        .unwrap_or(false)
                });

            let keyword_hits = def
                .keywords
                .iter()
                .filter(|kw| filename_tokens.iter().any(|t| t == &kw.to_lowercase()))
                .count();
            let keyword_density = if def.keywords.is_empty() {
                0.0
            } else {
                keyword_hits as f64 / def.keywords.len() as f64
            };

            let name_tokens: Vec<String> = def
                .canonical_name
                .split(' ')
                .map(|t| t.to_lowercase())
                .collect();
            let token_overlap = name_tokens
                .iter()
                .filter(|t| filename_tokens.contains(t))
                .count();
            let overlap_ratio = if name_tokens.is_empty() {
                0.0
            } else {
                token_overlap as f64 / name_tokens.len() as f64
            };

            let confidence = 0.60 * f64::from(u8::from(alias_match))
                + 0.25 * keyword_density
                + 0.15 * overlap_ratio;
            if confidence > 0.0 {
                suggestions.push(CategorySuggestion {
                    category: def.canonical_name.clone(),
                    confidence,
                    alias_match,
                    keyword_hits,
                    token_overlap,
                });
            }
        }

        suggestions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.alias_match.cmp(&a.alias_match))
                .then_with(|| b.keyword_hits.cmp(&a.keyword_hits))
                .then_with(|| b.token_overlap.cmp(&a.token_overlap))
                .then_with(|| a.category.cmp(&b.category))
        });
        suggestions.truncate(k);
        suggestions
    }

    /// Validate a raw category name, returning the normalized form and any
    /// issues found.
    pub fn validate_name(raw: &str) -> NameValidation {
        let mut issues = Vec::new();
        let normalized = match Self::normalize(raw) {
            Ok(n) => n,
            Err(e) => {
                return NameValidation {
                    normalized: String::new(),
                    is_valid: false,
                    issues: vec![e.to_string()],
                }
            }
        };

        if RESERVED_NAMES.contains(&normalized.as_str()) {
            issues.push(format!("'{normalized}' is a reserved word"));
        }
        let len = normalized.chars().count();
        if len < MIN_NAME_LENGTH {
            issues.push(format!("Name too short ({len} < {MIN_NAME_LENGTH})"));
        }
        if len > MAX_NAME_LENGTH {
            issues.push(format!("Name too long ({len} > {MAX_NAME_LENGTH})"));
        }
        let invalid_chars: Vec<char> = normalized
            .chars()
            .filter(|c| !c.is_ascii_alphanumeric() && !matches!(c, ' ' | '(' | ')' | '&' | '\''))
            .collect();
        if !invalid_chars.is_empty() {
            issues.push(format!("Invalid characters: {invalid_chars:?}"));
        }

        NameValidation {
            normalized,
            is_valid: issues.is_empty(),
            issues,
        }
    }

    /// All registered categories (including inactive ones)
    pub fn all(&self) -> Vec<CategoryDefinition> {
        let inner = self.snapshot();
        let mut defs: Vec<CategoryDefinition> = inner.categories.values().cloned().collect();
        defs.sort_by(|a, b| a.canonical_name.cmp(&b.canonical_name));
        defs
    }

    /// Per-category file counts, sorted by canonical name
    pub fn stats(&self) -> Vec<(String, u64)> {
        self.all()
            .into_iter()
            .map(|d| (d.canonical_name, d.file_count))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Arc<RegistryInner> {
        Arc::clone(&self.inner.read())
    }
}

/// Title-case a space-separated uppercase name for display
fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(names: &[&str]) -> CategoryRegistry {
        let registry = CategoryRegistry::new();
        for name in names {
            registry
                .register(CategoryDefinition::new(*name, CategoryType::TVSeries))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_normalize_collapses_separators() {
        assert_eq!(
            CategoryRegistry::normalize("breaking.bad").unwrap(),
            "BREAKING BAD"
        );
        assert_eq!(
            CategoryRegistry::normalize("il_trono-di  spade").unwrap(),
            "IL TRONO DI SPADE"
        );
    }

    #[test]
    fn test_normalize_strips_leading_article() {
        assert_eq!(CategoryRegistry::normalize("The Office").unwrap(), "OFFICE");
        // "THE" embedded elsewhere is preserved
        assert_eq!(
            CategoryRegistry::normalize("over the garden wall").unwrap(),
            "OVER THE GARDEN WALL"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = CategoryRegistry::normalize("breaking.bad").unwrap();
        let twice = CategoryRegistry::normalize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_rejects_empty_and_punctuation() {
        assert!(matches!(
            CategoryRegistry::normalize(""),
            Err(MediaButlerError::InvalidName(_))
        ));
        assert!(matches!(
            CategoryRegistry::normalize("..--.."),
            Err(MediaButlerError::InvalidName(_))
        ));
    }

    #[test]
    fn test_register_and_get_case_insensitive() {
        let registry = registry_with(&["BREAKING BAD"]);
        assert!(registry.get("breaking bad").is_some());
        assert!(registry.get("  Breaking.Bad  ").is_some());
        assert!(registry.get("MISSING SHOW").is_none());
    }

    #[test]
    fn test_register_duplicate_fails() {
        let registry = registry_with(&["BREAKING BAD"]);
        let result = registry.register(CategoryDefinition::new(
            "breaking.bad",
            CategoryType::TVSeries,
        ));
        assert!(matches!(result, Err(MediaButlerError::AlreadyExists(_))));
    }

    #[test]
    fn test_alias_resolution() {
        let registry = CategoryRegistry::new();
        registry
            .register(
                CategoryDefinition::new("IL TRONO DI SPADE", CategoryType::TVSeries)
                    .with_aliases(vec!["Game of Thrones".to_string()]),
            )
            .unwrap();

        let def = registry.get("game.of.thrones").unwrap();
        assert_eq!(def.canonical_name, "IL TRONO DI SPADE");
    }

    #[test]
    fn test_threshold_lookup() {
        let registry = CategoryRegistry::new();
        registry
            .register(
                CategoryDefinition::new("ONE PIECE", CategoryType::Anime).with_threshold(0.9),
            )
            .unwrap();
        assert_eq!(registry.threshold("one piece").unwrap(), 0.9);
        assert!(matches!(
            registry.threshold("nope"),
            Err(MediaButlerError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_threshold_clamped() {
        let registry = CategoryRegistry::new();
        registry
            .register(CategoryDefinition::new("SHOW A", CategoryType::TVSeries).with_threshold(1.5))
            .unwrap();
        assert_eq!(registry.threshold("show a").unwrap(), 1.0);
    }

    #[test]
    fn test_update_patch() {
        let registry = registry_with(&["BREAKING BAD"]);
        let updated = registry
            .update(
                "breaking bad",
                CategoryPatch {
                    confidence_threshold: Some(0.7),
                    add_keywords: vec!["Heisenberg".to_string()],
                    file_count: Some(12),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.confidence_threshold, 0.7);
        assert_eq!(updated.file_count, 12);
        assert!(updated.keywords.contains(&"heisenberg".to_string()));

        assert!(matches!(
            registry.update("missing", CategoryPatch::default()),
            Err(MediaButlerError::NotFound(_))
        ));
    }

    #[test]
    fn test_merge_transfers_everything() {
        let registry = CategoryRegistry::new();
        registry
            .register(
                CategoryDefinition::new("GOMORRA", CategoryType::TVSeries)
                    .with_aliases(vec!["Gomorrah".to_string()])
                    .with_keywords(vec!["napoli".to_string()]),
            )
            .unwrap();
        registry
            .register(CategoryDefinition::new("GOMORRA LA SERIE", CategoryType::TVSeries))
            .unwrap();
        registry
            .update(
                "GOMORRA",
                CategoryPatch {
                    file_count: Some(7),
                    ..Default::default()
                },
            )
            .unwrap();

        let result = registry.merge("GOMORRA", "GOMORRA LA SERIE").unwrap();
        assert_eq!(result.files_transferred, 7);
        assert_eq!(result.aliases_transferred, 1);
        assert_eq!(result.keywords_transferred, 1);

        let target = registry.get("GOMORRA LA SERIE").unwrap();
        assert_eq!(target.file_count, 7);
        assert!(target.aliases.contains(&"GOMORRA".to_string()));

        // Source now resolves to the target.
        let resolved = registry.get("GOMORRA").unwrap();
        assert!(!resolved.active || resolved.canonical_name == "GOMORRA LA SERIE");
    }

    #[test]
    fn test_merge_same_category_fails() {
        let registry = registry_with(&["SHOW A"]);
        assert!(matches!(
            registry.merge("SHOW A", "show.a"),
            Err(MediaButlerError::SameCategory(_))
        ));
    }

    #[test]
    fn test_merge_unknown_fails() {
        let registry = registry_with(&["SHOW A"]);
        assert!(matches!(
            registry.merge("SHOW A", "SHOW B"),
            Err(MediaButlerError::NotFound(_))
        ));
    }

    #[test]
    fn test_suggest_ranks_alias_match_first() {
        let registry = CategoryRegistry::new();
        registry
            .register(
                CategoryDefinition::new("ONE PIECE", CategoryType::Anime)
                    .with_keywords(vec!["piece".to_string()]),
            )
            .unwrap();
        registry
            .register(
                CategoryDefinition::new("ONE PUNCH MAN", CategoryType::Anime)
                    .with_keywords(vec!["punch".to_string()]),
            )
            .unwrap();

        let suggestions = registry.suggest("One.Piece.1089.Sub.ITA.720p.mkv", 3);
        assert!(!suggestions.is_empty());
        assert_eq!(suggestions[0].category, "ONE PIECE");
        assert!(suggestions[0].alias_match);
    }

    #[test]
    fn test_suggest_respects_k() {
        let registry = registry_with(&["SHOW AA", "SHOW AB", "SHOW AC"]);
        let suggestions = registry.suggest("show.aa.S01E01.mkv", 2);
        assert!(suggestions.len() <= 2);
    }

    #[test]
    fn test_suggest_tie_break_lexicographic() {
        let registry = registry_with(&["ZETA SHOW", "ALFA SHOW"]);
        // Both categories overlap on the "show" token only.
        let suggestions = registry.suggest("some.show.S01E01.mkv", 5);
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].category, "ALFA SHOW");
    }

    #[test]
    fn test_validate_name_reserved() {
        let validation = CategoryRegistry::validate_name("new");
        assert!(!validation.is_valid);
        assert!(validation.issues[0].contains("reserved"));
    }

    #[test]
    fn test_validate_name_length() {
        assert!(!CategoryRegistry::validate_name("a").is_valid);
        let long = "A".repeat(101);
        assert!(!CategoryRegistry::validate_name(&long).is_valid);
        assert!(CategoryRegistry::validate_name("Breaking Bad").is_valid);
    }

    #[test]
    fn test_validate_name_characters() {
        assert!(CategoryRegistry::validate_name("Mork & Mindy (1978)").is_valid);
        assert!(CategoryRegistry::validate_name("L'Amica Geniale").is_valid);
        assert!(!CategoryRegistry::validate_name("Show #1!").is_valid);
    }

    #[test]
    fn test_seed_defaults_idempotent() {
        let registry = CategoryRegistry::with_defaults();
        let before = registry.len();
        registry.seed_defaults();
        assert_eq!(registry.len(), before);
        assert!(registry.exists("ONE PIECE"));
    }
}
