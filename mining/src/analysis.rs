//! The mining pass: pain points, categories, keyword counts and per-collection
//! averages over the stored corpus.
//!
//! Everything here is pure. The caller passes the clock in as `as_of`, so the
//! same corpus always yields the same [`MiningResult`].

use chrono::{DateTime, Utc};
use needfinder_core::{
    truncate_chars, Comment, Item, LexiconConfig, MiningConfig, Provenance,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use tracing::{debug, info};

/// Category given to items that match no category keyword.
pub const OTHER_CATEGORY: &str = "other";

/// Comment bodies are cut to this many characters in the result.
pub const COMMENT_EXCERPT_CHARS: usize = 500;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z]{4,}\b").expect("valid regex"));

const STOP_WORDS: &[&str] = &[
    "this", "that", "with", "have", "from", "they", "would", "there", "what", "when", "make",
    "just", "over", "such", "into", "than", "them", "some", "could", "other", "more",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFinding {
    pub id: String,
    pub collection: String,
    pub title: String,
    pub url: String,
    pub score: i64,
    pub provenance: Provenance,
    /// Matched phrases, in lexicon order.
    pub pain_points: Vec<String>,
    /// Never empty; `["other"]` when nothing matched.
    pub categories: Vec<String>,
}

impl ItemFinding {
    pub fn has_pain_points(&self) -> bool {
        !self.pain_points.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub collection: String,
    pub item_count: usize,
    pub mean_score: f64,
    pub mean_comments: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub item_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentFinding {
    pub id: String,
    pub item_id: String,
    pub body: String,
    pub score: i64,
    pub pain_points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentAnalysis {
    pub total_comments: usize,
    pub pain_point_comments: Vec<CommentFinding>,
    pub top_words: Vec<KeywordCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningResult {
    pub generated_at: DateTime<Utc>,
    /// One entry per input item, in input order.
    pub items: Vec<ItemFinding>,
    /// Ordered by collection name; collections without items are absent.
    pub collections: Vec<CollectionStats>,
    /// Most frequent first; ties keep first-occurrence order.
    pub keywords: Vec<KeywordCount>,
    /// Largest first; ties keep lexicon order with `other` last.
    pub categories: Vec<CategoryCount>,
    pub comments: CommentAnalysis,
}

impl MiningResult {
    pub fn total_items(&self) -> usize {
        self.items.len()
    }

    pub fn synthetic_items(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.provenance == Provenance::Synthetic)
            .count()
    }

    pub fn pain_point_items(&self) -> usize {
        self.items.iter().filter(|i| i.has_pain_points()).count()
    }

    /// Items in `category`, highest score first; equal scores keep input order.
    pub fn top_in_category(&self, category: &str, limit: usize) -> Vec<&ItemFinding> {
        let mut members: Vec<&ItemFinding> = self
            .items
            .iter()
            .filter(|i| i.categories.iter().any(|c| c == category))
            .collect();
        members.sort_by(|a, b| b.score.cmp(&a.score));
        members.truncate(limit);
        members
    }

    pub fn top_pain_points(&self, limit: usize) -> Vec<&ItemFinding> {
        let mut hits: Vec<&ItemFinding> = self.items.iter().filter(|i| i.has_pain_points()).collect();
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(limit);
        hits
    }
}

/// A compiled, case-folded lexicon.
#[derive(Debug, Clone)]
pub struct Miner {
    pain_points: Vec<String>,
    categories: Vec<(String, Vec<String>)>,
    top_keywords: usize,
    comment_top_words: usize,
}

impl Miner {
    pub fn new(lexicon: &LexiconConfig, mining: &MiningConfig) -> Self {
        Self {
            pain_points: lexicon.pain_points.iter().map(|p| p.to_lowercase()).collect(),
            categories: lexicon
                .categories
                .iter()
                .map(|rule| {
                    (
                        rule.name.clone(),
                        rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
                    )
                })
                .collect(),
            top_keywords: mining.top_keywords,
            comment_top_words: mining.comment_top_words,
        }
    }

    pub fn pain_points_in(&self, text: &str) -> Vec<String> {
        let folded = text.to_lowercase();
        self.pain_points
            .iter()
            .filter(|phrase| folded.contains(phrase.as_str()))
            .cloned()
            .collect()
    }

    pub fn categories_of(&self, text: &str) -> Vec<String> {
        let folded = text.to_lowercase();
        let matched: Vec<String> = self
            .categories
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| folded.contains(k.as_str())))
            .map(|(name, _)| name.clone())
            .collect();

        if matched.is_empty() {
            vec![OTHER_CATEGORY.to_string()]
        } else {
            matched
        }
    }

    pub fn analyze(&self, items: &[Item], comments: &[Comment], as_of: DateTime<Utc>) -> MiningResult {
        let mut keywords = KeywordCounter::default();
        let mut findings = Vec::with_capacity(items.len());

        for item in items {
            let text = item.text();
            keywords.add_text(&text);
            findings.push(ItemFinding {
                id: item.id.clone(),
                collection: item.collection.clone(),
                title: item.title.clone(),
                url: item.url.clone(),
                score: item.score,
                provenance: item.provenance(),
                pain_points: self.pain_points_in(&text),
                categories: self.categories_of(&text),
            });
        }

        let result = MiningResult {
            generated_at: as_of,
            collections: collection_stats(items),
            keywords: keywords.top(self.top_keywords),
            categories: self.category_counts(&findings),
            comments: self.analyze_comments(comments),
            items: findings,
        };

        info!(
            "Mined {} items: {} with pain points, {} synthetic",
            result.total_items(),
            result.pain_point_items(),
            result.synthetic_items()
        );
        result
    }

    fn analyze_comments(&self, comments: &[Comment]) -> CommentAnalysis {
        let mut words = KeywordCounter::default();
        let mut pain_point_comments = Vec::new();

        for comment in comments.iter().filter(|c| !c.body.is_empty()) {
            words.add_text(&comment.body);
            let pain_points = self.pain_points_in(&comment.body);
            if !pain_points.is_empty() {
                pain_point_comments.push(CommentFinding {
                    id: comment.id.clone(),
                    item_id: comment.item_id.clone(),
                    body: truncate_chars(&comment.body, COMMENT_EXCERPT_CHARS),
                    score: comment.score,
                    pain_points,
                });
            }
        }

        debug!(
            "{} of {} comments mention a pain point",
            pain_point_comments.len(),
            comments.len()
        );
        CommentAnalysis {
            total_comments: comments.len(),
            pain_point_comments,
            top_words: words.top(self.comment_top_words),
        }
    }

    fn category_counts(&self, findings: &[ItemFinding]) -> Vec<CategoryCount> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for category in findings.iter().flat_map(|f| f.categories.iter()) {
            *counts.entry(category.as_str()).or_default() += 1;
        }

        let lexicon_order = self
            .categories
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(std::iter::once(OTHER_CATEGORY));

        let mut ordered: Vec<CategoryCount> = lexicon_order
            .filter_map(|name| {
                counts.get(name).map(|&item_count| CategoryCount {
                    name: name.to_string(),
                    item_count,
                })
            })
            .collect();
        ordered.sort_by(|a, b| b.item_count.cmp(&a.item_count));
        ordered
    }
}

/// Runs one mining pass with a freshly compiled lexicon.
pub fn analyze(
    items: &[Item],
    comments: &[Comment],
    lexicon: &LexiconConfig,
    mining: &MiningConfig,
    as_of: DateTime<Utc>,
) -> MiningResult {
    Miner::new(lexicon, mining).analyze(items, comments, as_of)
}

/// Lowercase words of four or more letters, minus stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    let folded = text.to_lowercase();
    WORD_RE
        .find_iter(&folded)
        .map(|m| m.as_str())
        .filter(|word| !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// Word counts that remember when each word was first seen.
#[derive(Debug, Default)]
struct KeywordCounter {
    counts: Vec<KeywordCount>,
    index: HashMap<String, usize>,
}

impl KeywordCounter {
    fn add_text(&mut self, text: &str) {
        for word in tokenize(text) {
            match self.index.get(&word) {
                Some(&slot) => self.counts[slot].count += 1,
                None => {
                    self.index.insert(word.clone(), self.counts.len());
                    self.counts.push(KeywordCount {
                        keyword: word,
                        count: 1,
                    });
                }
            }
        }
    }

    fn top(mut self, limit: usize) -> Vec<KeywordCount> {
        self.counts.sort_by(|a, b| b.count.cmp(&a.count));
        self.counts.truncate(limit);
        self.counts
    }
}

fn collection_stats(items: &[Item]) -> Vec<CollectionStats> {
    #[derive(Default)]
    struct Totals {
        count: usize,
        score: i64,
        comments: i64,
    }

    let mut totals: BTreeMap<&str, Totals> = BTreeMap::new();
    for item in items {
        let entry = totals.entry(item.collection.as_str()).or_default();
        entry.count += 1;
        entry.score += item.score;
        entry.comments += item.num_comments;
    }

    totals
        .into_iter()
        .map(|(collection, t)| CollectionStats {
            collection: collection.to_string(),
            item_count: t.count,
            mean_score: t.score as f64 / t.count as f64,
            mean_comments: t.comments as f64 / t.count as f64,
        })
        .collect()
}
