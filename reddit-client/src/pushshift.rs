use crate::adapter::{Page, PageCursor, SourceAdapter};
use crate::api::{endpoint_url, JsonFetcher, RedditCommentData, RedditPostData};
use crate::rate_limiter::RateLimitConfig;
use async_trait::async_trait;
use chrono::Utc;
use needfinder_core::{
    CollectionConfig, Comment, CoreError, Item, PushshiftConfig, SourceError, SourceKind,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushshiftResponse {
    #[serde(default)]
    pub data: Vec<RedditPostData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushshiftCommentResponse {
    #[serde(default)]
    pub data: Vec<RedditCommentData>,
}

/// Secondary source: the Pushshift submission search archive.
///
/// Results are sorted newest first. The cursor is one past the `created_utc`
/// of the oldest item on the page and goes back as the exclusive `before`
/// bound, so posts sharing that second are requested again and the
/// overlap is dropped by identity dedup.
#[derive(Debug)]
pub struct PushshiftClient {
    fetcher: JsonFetcher,
    config: PushshiftConfig,
}

impl PushshiftClient {
    pub fn new(
        config: &PushshiftConfig,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            fetcher: JsonFetcher::new(user_agent, timeout)?,
            config: config.clone(),
        })
    }

    fn search_url(&self, subreddit: &str, before: Option<&PageCursor>) -> Result<Url, SourceError> {
        let mut url = endpoint_url(&self.config.base_url, "reddit/search/submission/")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("subreddit", subreddit);
            query.append_pair("size", &self.config.page_size.to_string());
            query.append_pair("sort", "desc");
            query.append_pair("sort_type", "created_utc");
            if let Some(before) = before {
                query.append_pair("before", before.as_str());
            }
        }
        Ok(url)
    }

    fn comment_url(&self, post_id: &str, limit: u32) -> Result<Url, SourceError> {
        let mut url = endpoint_url(&self.config.base_url, "reddit/search/comment/")?;
        url.query_pairs_mut()
            .append_pair("link_id", post_id)
            .append_pair("size", &limit.to_string())
            .append_pair("sort", "desc")
            .append_pair("sort_type", "score");
        Ok(url)
    }

    pub async fn search_comments(
        &self,
        subreddit: &str,
        post_id: &str,
        limit: u32,
    ) -> Result<Vec<RedditCommentData>, SourceError> {
        let url = self.comment_url(post_id, limit)?;
        let response: PushshiftCommentResponse = self.fetcher.get_json(url, subreddit).await?;
        debug!("Retrieved {} archived comments for {}", response.data.len(), post_id);
        Ok(response.data)
    }

    pub async fn search_submissions(
        &self,
        subreddit: &str,
        before: Option<&PageCursor>,
    ) -> Result<PushshiftResponse, SourceError> {
        let url = self.search_url(subreddit, before)?;
        let response: PushshiftResponse = self.fetcher.get_json(url, subreddit).await?;
        info!(
            "Retrieved {} archived posts for r/{}",
            response.data.len(),
            subreddit
        );
        Ok(response)
    }
}

#[async_trait]
impl SourceAdapter for PushshiftClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Pushshift
    }

    fn pacing(&self) -> RateLimitConfig {
        RateLimitConfig::pushshift().with_delay_ms(self.config.delay_ms)
    }

    async fn fetch(&self, collection: &CollectionConfig, cursor: Option<&PageCursor>) -> Page {
        let response = match self.search_submissions(&collection.name, cursor).await {
            Ok(response) => response,
            Err(e) => return Page::failed(e),
        };

        let full_page = response.data.len() >= self.config.page_size as usize;
        let items: Vec<_> = response
            .data
            .into_iter()
            .filter_map(|post| post.into_item(&collection.name, SourceKind::Pushshift))
            .collect();

        // A short page is the last one; a zero timestamp would loop forever.
        let next_cursor = items
            .iter()
            .map(|item| item.created_utc)
            .filter(|ts| *ts > 0)
            .min()
            .filter(|_| full_page)
            .map(|oldest| next_before(oldest, cursor));

        Page::new(items, next_cursor)
    }

    async fn fetch_comments(&self, item: &Item, limit: u32) -> Result<Vec<Comment>, SourceError> {
        let collected_at = Utc::now();
        let comments = self
            .search_comments(&item.collection, &item.id, limit)
            .await?
            .into_iter()
            .filter(|c| !c.id.is_empty())
            .take(limit as usize)
            .map(|c| c.into_comment(item, collected_at))
            .collect();
        Ok(comments)
    }
}

/// `oldest + 1`, unless that repeats the cursor just sent: a full page of
/// posts from a single second must still move the window back.
fn next_before(oldest: i64, sent: Option<&PageCursor>) -> PageCursor {
    let inclusive = (oldest + 1).to_string();
    match sent {
        Some(sent) if sent.as_str() == inclusive => PageCursor::new(oldest.to_string()),
        _ => PageCursor::new(inclusive),
    }
}
