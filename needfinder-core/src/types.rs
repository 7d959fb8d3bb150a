use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Author recorded when a source omits it or the account is gone.
pub const DELETED_AUTHOR: &str = "[deleted]";

/// Bodies longer than this are cut before they reach the store.
pub const MAX_BODY_CHARS: usize = 5000;

/// Which adapter produced an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    RedditJson,
    Pushshift,
    Synthetic,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::RedditJson => "reddit_json",
            SourceKind::Pushshift => "pushshift",
            SourceKind::Synthetic => "synthetic",
        }
    }

    pub fn provenance(&self) -> Provenance {
        match self {
            SourceKind::Synthetic => Provenance::Synthetic,
            SourceKind::RedditJson | SourceKind::Pushshift => Provenance::Real,
        }
    }

    /// Default priority order: primary, secondary, then the synthetic fallback.
    pub fn default_priority() -> Vec<SourceKind> {
        vec![
            SourceKind::RedditJson,
            SourceKind::Pushshift,
            SourceKind::Synthetic,
        ]
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reddit_json" => Ok(SourceKind::RedditJson),
            "pushshift" => Ok(SourceKind::Pushshift),
            "synthetic" => Ok(SourceKind::Synthetic),
            other => Err(ConfigError::InvalidValue {
                field: "source".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Marks whether an item is real forum data or generated filler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Real,
    Synthetic,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Real => "real",
            Provenance::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ingested post.
///
/// `id` is the primary key and never changes once stored. `score` and
/// `num_comments` are the only fields a re-ingest overwrites; `collected_at`
/// keeps the time the item was first written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub collection: String,
    pub title: String,
    pub author: String,
    pub body: String,
    pub created_utc: i64,
    pub score: i64,
    pub num_comments: i64,
    pub url: String,
    pub source: SourceKind,
    pub collected_at: DateTime<Utc>,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        collection: impl Into<String>,
        title: impl Into<String>,
        source: SourceKind,
    ) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            title: title.into(),
            author: DELETED_AUTHOR.to_string(),
            body: String::new(),
            created_utc: 0,
            score: 0,
            num_comments: 0,
            url: String::new(),
            source,
            collected_at: Utc::now(),
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = truncate_chars(body, MAX_BODY_CHARS);
        self
    }

    pub fn with_author(mut self, author: Option<&str>) -> Self {
        self.author = normalize_author(author);
        self
    }

    pub fn provenance(&self) -> Provenance {
        self.source.provenance()
    }

    /// Title and body joined the way the miner reads them.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.body)
    }
}

/// A reply attached to an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub item_id: String,
    pub collection: String,
    pub author: String,
    pub body: String,
    pub score: i64,
    pub created_utc: i64,
    pub collected_at: DateTime<Utc>,
}

/// An item or comment the store refused to write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteFailure {
    pub id: String,
    pub reason: String,
}

/// Result of one batch upsert; failures never abort the batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertSummary {
    pub written: usize,
    pub failures: Vec<WriteFailure>,
}

impl UpsertSummary {
    pub fn record_failure(&mut self, id: &str, reason: impl Into<String>) {
        self.failures.push(WriteFailure {
            id: id.to_string(),
            reason: reason.into(),
        });
    }
}

pub fn normalize_author(author: Option<&str>) -> String {
    match author.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DELETED_AUTHOR.to_string(),
    }
}

/// Cuts `text` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
