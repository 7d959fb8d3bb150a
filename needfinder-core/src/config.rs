//! Static configuration for a needfinder run.
//!
//! Everything the pipeline needs (collections, lexicons, budgets, paths and
//! pacing) is read once from TOML and handed to the pipeline at construction.
//! Every field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{ConfigError, CoreError};
use crate::types::SourceKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub output_dir: PathBuf,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub ingestion: IngestionConfig,
    pub sources: SourcesConfig,
    pub collections: Vec<CollectionConfig>,
    pub lexicon: LexiconConfig,
    pub mining: MiningConfig,
    pub report: ReportConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/reddit_posts.db".to_string(),
            output_dir: PathBuf::from("reports"),
            user_agent: "NeedsDiscoveryBot/1.0".to_string(),
            request_timeout_secs: 30,
            ingestion: IngestionConfig::default(),
            sources: SourcesConfig::default(),
            collections: default_collections(),
            lexicon: LexiconConfig::default(),
            mining: MiningConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub max_pages_per_collection: u32,
    /// Upper bound on new items per run across all collections; 0 disables it.
    pub global_item_quota: usize,
    /// Comments fetched per newly stored item; 0 skips comment collection.
    pub comments_per_item: u32,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_pages_per_collection: 10,
            global_item_quota: 1000,
            comments_per_item: 0,
        }
    }
}

impl IngestionConfig {
    pub fn global_quota(&self) -> Option<usize> {
        (self.global_item_quota > 0).then_some(self.global_item_quota)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub reddit_json: RedditJsonConfig,
    pub pushshift: PushshiftConfig,
    pub synthetic: SyntheticConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditJsonConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Listing to page through: `new`, `hot`, `top`...
    pub listing: String,
    pub page_size: u32,
    pub delay_ms: Option<u64>,
}

impl Default for RedditJsonConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://old.reddit.com".to_string(),
            listing: "new".to_string(),
            page_size: 25,
            delay_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushshiftConfig {
    pub enabled: bool,
    pub base_url: String,
    pub page_size: u32,
    pub delay_ms: Option<u64>,
}

impl Default for PushshiftConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.pushshift.io".to_string(),
            page_size: 100,
            delay_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub enabled: bool,
    pub min_items: usize,
    pub max_items: usize,
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_items: 20,
            max_items: 50,
            seed: None,
        }
    }
}

/// A subreddit-equivalent bucket and how to fetch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    /// Template family for synthetic filler (`productivity`, `finance`...).
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default = "SourceKind::default_priority")]
    pub sources: Vec<SourceKind>,
    #[serde(default)]
    pub max_pages: Option<u32>,
    #[serde(default)]
    pub max_items: Option<usize>,
}

impl CollectionConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            theme: None,
            sources: SourceKind::default_priority(),
            max_pages: None,
            max_items: None,
        }
    }

    pub fn with_theme(mut self, theme: &str) -> Self {
        self.theme = Some(theme.to_string());
        self
    }

    pub fn with_sources(mut self, sources: Vec<SourceKind>) -> Self {
        self.sources = sources;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconConfig {
    pub pain_points: Vec<String>,
    pub categories: Vec<CategoryRule>,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        let pain_points = [
            "wish there was",
            "wish i had",
            "need an app",
            "looking for a tool",
            "missing feature",
            "frustrated with",
            "annoying with",
            "too complicated",
            "hate using",
            "can't find",
            "doesn't exist",
            "too slow",
            "wish app",
            "need tool",
            "anyone know",
            "how to",
            "too expensive",
            "waste of time",
            "broken",
            "doesn't work",
            "simple tool",
            "clean app",
            "minimal",
            "offline",
            "no ads",
            "dark mode",
            "sync issue",
            "data loss",
            "slow sync",
            "manual work",
            "repetitive task",
            "automate this",
        ];

        let categories: [(&str, &[&str]); 6] = [
            (
                "productivity",
                &[
                    "task", "todo", "schedule", "calendar", "reminder", "focus", "time track",
                    "habit", "goal", "project",
                ],
            ),
            (
                "finance",
                &[
                    "budget", "expense", "track", "invest", "portfolio", "save", "money",
                    "spending", "bank", "tax",
                ],
            ),
            (
                "health",
                &[
                    "workout", "exercise", "sleep", "diet", "weight", "run", "pace", "distance",
                    "calorie", "water",
                ],
            ),
            (
                "learning",
                &[
                    "note", "learn", "study", "flashcard", "memory", "review", "book", "course",
                    "knowledge",
                ],
            ),
            (
                "travel",
                &[
                    "flight", "hotel", "trip", "itinerary", "currency", "translate", "map",
                    "booking",
                ],
            ),
            (
                "social",
                &["share", "collaborate", "team", "family", "friend", "group"],
            ),
        ];

        Self {
            pain_points: pain_points.iter().map(|s| s.to_string()).collect(),
            categories: categories
                .iter()
                .map(|(name, keywords)| CategoryRule {
                    name: name.to_string(),
                    keywords: keywords.iter().map(|k| k.to_string()).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    pub top_keywords: usize,
    pub comment_top_words: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            top_keywords: 50,
            comment_top_words: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub markdown_file: String,
    pub snapshot_file: String,
    pub keyword_rows: usize,
    pub items_per_category: usize,
    pub pain_items: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            markdown_file: "needs_analysis_report.md".to_string(),
            snapshot_file: "analysis_results.json".to_string(),
            keyword_rows: 20,
            items_per_category: 5,
            pain_items: 20,
        }
    }
}

fn default_collections() -> Vec<CollectionConfig> {
    [
        ("iOSProgramming", "general"),
        ("productivity", "productivity"),
        ("investing", "finance"),
        ("FIREUK", "finance"),
        ("UKPersonalFinance", "finance"),
        ("Notion", "productivity"),
        ("bulletjournal", "productivity"),
        ("running", "health"),
        ("fitness", "health"),
        ("travelhacks", "travel"),
        ("Flights", "travel"),
        ("IWantToBuy", "general"),
        ("lifehacks", "general"),
        ("legaladviceUK", "general"),
    ]
    .iter()
    .map(|(name, theme)| CollectionConfig::new(*name).with_theme(theme))
    .collect()
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        tracing::info!(
            "Loaded configuration from {} ({} collections)",
            path.display(),
            config.collections.len()
        );
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CoreError> {
        let config: AppConfig = toml::from_str(raw).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collections.is_empty() {
            return Err(ConfigError::MissingField {
                field: "collections".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for collection in &self.collections {
            if collection.name.trim().is_empty() {
                return Err(ConfigError::ValidationFailed {
                    reason: "collection name must not be blank".to_string(),
                });
            }
            // Collection names are case-insensitive upstream.
            if !seen.insert(collection.name.to_lowercase()) {
                return Err(ConfigError::ValidationFailed {
                    reason: format!("duplicate collection '{}'", collection.name),
                });
            }
            if collection.sources.is_empty() {
                return Err(ConfigError::ValidationFailed {
                    reason: format!("collection '{}' has no sources", collection.name),
                });
            }
        }

        for (field, page_size) in [
            ("sources.reddit_json.page_size", self.sources.reddit_json.page_size),
            ("sources.pushshift.page_size", self.sources.pushshift.page_size),
        ] {
            if !(1..=100).contains(&page_size) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: page_size.to_string(),
                });
            }
        }

        for (field, base_url) in [
            ("sources.reddit_json.base_url", &self.sources.reddit_json.base_url),
            ("sources.pushshift.base_url", &self.sources.pushshift.base_url),
        ] {
            if Url::parse(base_url).is_err() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: base_url.clone(),
                });
            }
        }

        let synthetic = &self.sources.synthetic;
        if synthetic.min_items == 0 || synthetic.min_items > synthetic.max_items {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "synthetic item range {}..={} is empty",
                    synthetic.min_items, synthetic.max_items
                ),
            });
        }

        if self.lexicon.pain_points.is_empty() {
            return Err(ConfigError::MissingField {
                field: "lexicon.pain_points".to_string(),
            });
        }

        if self.mining.top_keywords == 0 {
            return Err(ConfigError::InvalidValue {
                field: "mining.top_keywords".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(())
    }

    pub fn markdown_path(&self) -> PathBuf {
        self.output_dir.join(&self.report.markdown_file)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.output_dir.join(&self.report.snapshot_file)
    }
}
