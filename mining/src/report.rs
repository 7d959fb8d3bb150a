use needfinder_core::{truncate_chars, Provenance, ReportConfig, ReportError};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::analysis::{CollectionStats, ItemFinding, KeywordCount, MiningResult};

const TITLE_CHARS: usize = 80;
const PAIN_POINTS_SHOWN: usize = 3;
const COMMENT_EXCERPT_SHOWN: usize = 200;

/// Both report artefacts, fully rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub markdown: String,
    pub snapshot_json: String,
}

/// The machine-readable side of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub generated_at: String,
    pub total_items: usize,
    pub synthetic_items: usize,
    pub pain_point_items: usize,
    pub collections: Vec<CollectionStats>,
    pub top_keywords: Vec<KeywordCount>,
    pub categories: Vec<CategoryEntry>,
    pub pain_points: Vec<PainPointEntry>,
    pub comments: CommentSnapshot,
}

/// A category with the same highest-scoring members the Markdown lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
    pub item_count: usize,
    pub top_items: Vec<CategoryItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryItem {
    pub id: String,
    pub title: String,
    pub score: i64,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PainPointEntry {
    pub id: String,
    pub collection: String,
    pub title: String,
    pub score: i64,
    pub provenance: Provenance,
    pub pain_points: Vec<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentSnapshot {
    pub total_comments: usize,
    pub pain_point_comments: usize,
    pub top_words: Vec<KeywordCount>,
}

impl ReportSnapshot {
    pub fn from_result(result: &MiningResult, config: &ReportConfig) -> Self {
        Self {
            generated_at: result.generated_at.to_rfc3339(),
            total_items: result.total_items(),
            synthetic_items: result.synthetic_items(),
            pain_point_items: result.pain_point_items(),
            collections: result.collections.clone(),
            top_keywords: result.keywords.clone(),
            categories: result
                .categories
                .iter()
                .map(|category| CategoryEntry {
                    name: category.name.clone(),
                    item_count: category.item_count,
                    top_items: result
                        .top_in_category(&category.name, config.items_per_category)
                        .into_iter()
                        .map(|item| CategoryItem {
                            id: item.id.clone(),
                            title: item.title.clone(),
                            score: item.score,
                            provenance: item.provenance,
                        })
                        .collect(),
                })
                .collect(),
            pain_points: result
                .top_pain_points(config.pain_items)
                .into_iter()
                .map(|item| PainPointEntry {
                    id: item.id.clone(),
                    collection: item.collection.clone(),
                    title: item.title.clone(),
                    score: item.score,
                    provenance: item.provenance,
                    pain_points: item.pain_points.clone(),
                    categories: item.categories.clone(),
                })
                .collect(),
            comments: CommentSnapshot {
                total_comments: result.comments.total_comments,
                pain_point_comments: result.comments.pain_point_comments.len(),
                top_words: result.comments.top_words.clone(),
            },
        }
    }
}

/// Turns a [`MiningResult`] into a Markdown document and a JSON snapshot.
///
/// Rendering reads nothing but its input: no clock, no store, no network.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    config: ReportConfig,
}

impl ReportGenerator {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn render(&self, result: &MiningResult) -> Result<RenderedReport, ReportError> {
        let markdown = self.render_markdown(result).map_err(|e| ReportError::RenderFailed {
            reason: e.to_string(),
        })?;
        let snapshot = ReportSnapshot::from_result(result, &self.config);
        let snapshot_json =
            serde_json::to_string_pretty(&snapshot).map_err(|e| ReportError::RenderFailed {
                reason: e.to_string(),
            })?;

        Ok(RenderedReport {
            markdown,
            snapshot_json,
        })
    }

    fn render_markdown(&self, result: &MiningResult) -> Result<String, std::fmt::Error> {
        let mut out = String::new();

        writeln!(out, "# Needs Analysis Report")?;
        writeln!(out)?;
        writeln!(out, "- Generated: {}", result.generated_at.format("%Y-%m-%d %H:%M UTC"))?;
        writeln!(out, "- Collections: {}", result.collections.len())?;
        writeln!(out, "- Items analyzed: {}", result.total_items())?;
        writeln!(out, "- Pain-point items: {}", result.pain_point_items())?;
        writeln!(out, "- Comments analyzed: {}", result.comments.total_comments)?;

        let synthetic = result.synthetic_items();
        if synthetic > 0 {
            writeln!(out)?;
            writeln!(
                out,
                "> **Warning:** {} of {} items are synthetic placeholders, not real posts. \
                 Treat their counts as illustrative only.",
                synthetic,
                result.total_items()
            )?;
        }

        writeln!(out)?;
        writeln!(out, "## Collection Overview")?;
        writeln!(out)?;
        writeln!(out, "| Collection | Items | Avg score | Avg comments |")?;
        writeln!(out, "|------------|-------|-----------|--------------|")?;
        for stats in &result.collections {
            writeln!(
                out,
                "| r/{} | {} | {:.1} | {:.1} |",
                stats.collection, stats.item_count, stats.mean_score, stats.mean_comments
            )?;
        }

        writeln!(out)?;
        writeln!(out, "## Top {} Keywords", self.config.keyword_rows)?;
        writeln!(out)?;
        writeln!(out, "| Rank | Keyword | Count |")?;
        writeln!(out, "|------|---------|-------|")?;
        for (rank, keyword) in result.keywords.iter().take(self.config.keyword_rows).enumerate() {
            writeln!(out, "| {} | {} | {} |", rank + 1, keyword.keyword, keyword.count)?;
        }

        writeln!(out)?;
        writeln!(out, "## Needs by Category")?;
        for category in &result.categories {
            writeln!(out)?;
            writeln!(out, "### {}", category.name.to_uppercase())?;
            writeln!(out)?;
            writeln!(out, "{} related items", category.item_count)?;
            writeln!(out)?;
            for item in result.top_in_category(&category.name, self.config.items_per_category) {
                writeln!(
                    out,
                    "- [{}]({}) (Score: {}){}",
                    link_text(&item.title),
                    item_link(item),
                    item.score,
                    synthetic_marker(item)
                )?;
            }
        }

        writeln!(out)?;
        writeln!(out, "## Top Pain-Point Items")?;
        for item in result.top_pain_points(self.config.pain_items) {
            writeln!(out)?;
            writeln!(
                out,
                "### [{}]({})",
                link_text(&shorten(&item.title, TITLE_CHARS)),
                item_link(item)
            )?;
            writeln!(out)?;
            writeln!(
                out,
                "Collection: r/{} | Score: {}{}",
                item.collection,
                item.score,
                synthetic_marker(item)
            )?;
            writeln!(out)?;
            let shown: Vec<&str> = item
                .pain_points
                .iter()
                .take(PAIN_POINTS_SHOWN)
                .map(String::as_str)
                .collect();
            writeln!(out, "Pain points: {}", shown.join(", "))?;
            writeln!(out)?;
            writeln!(out, "Categories: {}", item.categories.join(", "))?;
        }

        if result.comments.total_comments > 0 {
            self.render_comments(&mut out, result)?;
        }

        Ok(out)
    }

    fn render_comments(&self, out: &mut String, result: &MiningResult) -> std::fmt::Result {
        let comments = &result.comments;

        writeln!(out)?;
        writeln!(out, "## Comments")?;
        writeln!(out)?;
        writeln!(
            out,
            "{} of {} comments mention a pain point.",
            comments.pain_point_comments.len(),
            comments.total_comments
        )?;
        writeln!(out)?;
        writeln!(out, "| Rank | Word | Count |")?;
        writeln!(out, "|------|------|-------|")?;
        for (rank, word) in comments.top_words.iter().enumerate() {
            writeln!(out, "| {} | {} | {} |", rank + 1, word.keyword, word.count)?;
        }

        let mut ranked: Vec<_> = comments.pain_point_comments.iter().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        if !ranked.is_empty() {
            writeln!(out)?;
        }
        for comment in ranked.into_iter().take(self.config.pain_items) {
            writeln!(
                out,
                "- ({}) {} [{}]",
                comment.score,
                shorten(&comment.body, COMMENT_EXCERPT_SHOWN).replace('\n', " "),
                comment.pain_points.join(", ")
            )?;
        }
        Ok(())
    }
}

fn item_link(item: &ItemFinding) -> String {
    if item.url.is_empty() {
        format!("https://reddit.com/{}", item.id)
    } else {
        item.url.clone()
    }
}

fn synthetic_marker(item: &ItemFinding) -> &'static str {
    match item.provenance {
        Provenance::Synthetic => " _(synthetic)_",
        Provenance::Real => "",
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    let cut = truncate_chars(text, max_chars);
    if cut.len() < text.len() {
        format!("{}...", cut)
    } else {
        cut
    }
}

fn link_text(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}
