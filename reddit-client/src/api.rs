use crate::adapter::{Page, PageCursor, SourceAdapter};
use crate::rate_limiter::RateLimitConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use needfinder_core::{
    normalize_author, truncate_chars, CollectionConfig, Comment, CoreError, Item,
    RedditJsonConfig, SourceError, SourceKind,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

const REDDIT_WEB_BASE: &str = "https://www.reddit.com";

#[derive(Debug, Clone, Deserialize)]
pub struct RedditListing<T> {
    #[serde(default)]
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct RedditListingData<T> {
    #[serde(default)]
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditListingChild<T> {
    #[serde(default)]
    pub kind: String,
    pub data: T,
}

/// Post fields shared by the listing endpoint and the Pushshift archive.
///
/// Every field is optional on the wire; see [`RedditPostData::into_item`] for
/// the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    pub selftext: Option<String>,
    pub author: Option<String>,
    pub subreddit: Option<String>,
    pub url: Option<String>,
    pub permalink: Option<String>,
    pub created_utc: Option<f64>,
    pub score: Option<i64>,
    pub ups: Option<i64>,
    pub num_comments: Option<i64>,
    pub stickied: bool,
}

impl RedditPostData {
    /// Converts a raw post into an [`Item`]; posts without an id or title
    /// are dropped, as are pinned moderator posts.
    pub fn into_item(self, collection: &str, source: SourceKind) -> Option<Item> {
        if self.id.trim().is_empty() || self.title.trim().is_empty() {
            debug!("Skipping post without id/title in r/{}", collection);
            return None;
        }
        if self.stickied {
            debug!("Skipping pinned post {} in r/{}", self.id, collection);
            return None;
        }

        let url = match self.permalink.as_deref() {
            Some(permalink) if permalink.starts_with('/') => {
                format!("{}{}", REDDIT_WEB_BASE, permalink)
            }
            Some(permalink) if !permalink.is_empty() => permalink.to_string(),
            _ => self.url.clone().unwrap_or_default(),
        };

        let mut item = Item::new(self.id, collection, self.title, source)
            .with_body(self.selftext.as_deref().unwrap_or_default())
            .with_author(self.author.as_deref());
        item.created_utc = self.created_utc.unwrap_or_default() as i64;
        // `score` is canonical; older payloads only carry `ups`.
        item.score = self.score.or(self.ups).unwrap_or(0);
        item.num_comments = self.num_comments.unwrap_or(0);
        item.url = url;
        Some(item)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RedditCommentData {
    pub id: String,
    pub author: Option<String>,
    pub body: String,
    pub score: Option<i64>,
    pub created_utc: Option<f64>,
}

impl RedditCommentData {
    /// Attaches a raw comment to the item it was fetched for.
    pub fn into_comment(self, item: &Item, collected_at: DateTime<Utc>) -> Comment {
        Comment {
            id: self.id,
            item_id: item.id.clone(),
            collection: item.collection.clone(),
            author: normalize_author(self.author.as_deref()),
            body: truncate_chars(&self.body, MAX_COMMENT_CHARS),
            score: self.score.unwrap_or(0),
            created_utc: self.created_utc.unwrap_or_default() as i64,
            collected_at,
        }
    }
}

/// Upper bound on comment bodies kept in the store.
const MAX_COMMENT_CHARS: usize = 5000;

/// Shared GET-and-decode path for the HTTP adapters.
#[derive(Debug, Clone)]
pub(crate) struct JsonFetcher {
    http_client: Client,
}

impl JsonFetcher {
    pub(crate) fn new(user_agent: &str, timeout: Duration) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { http_client })
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        collection: &str,
    ) -> Result<T, SourceError> {
        let endpoint = url.path().to_string();
        debug!("GET {}", url);

        let response = match self.http_client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {}: {}", endpoint, e);
                return Err(if e.is_timeout() {
                    SourceError::RequestTimeout { endpoint }
                } else {
                    SourceError::Transport {
                        endpoint,
                        details: e.to_string(),
                    }
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Request failed with status: {} for {}", status, endpoint);
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(60);
                    SourceError::RateLimitExceeded {
                        endpoint,
                        retry_after,
                    }
                }
                StatusCode::NOT_FOUND => SourceError::CollectionNotFound {
                    collection: collection.to_string(),
                },
                _ => SourceError::HttpStatus {
                    endpoint,
                    status_code: status.as_u16(),
                },
            });
        }

        let body = response.bytes().await.map_err(|e| SourceError::Transport {
            endpoint: endpoint.clone(),
            details: e.to_string(),
        })?;

        serde_json::from_slice(&body).map_err(|e| {
            error!("Failed to parse response from {}: {}", endpoint, e);
            SourceError::InvalidResponse {
                endpoint,
                details: e.to_string(),
            }
        })
    }
}

/// Builds `{base}/{path}` and fails with a transport error when the result
/// is not a URL.
pub(crate) fn endpoint_url(base_url: &str, path: &str) -> Result<Url, SourceError> {
    let raw = format!("{}/{}", base_url.trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|e| SourceError::Transport {
        endpoint: raw.clone(),
        details: e.to_string(),
    })
}

/// Primary source: the public `/r/{name}/{listing}.json` endpoints.
#[derive(Debug)]
pub struct RedditJsonClient {
    fetcher: JsonFetcher,
    config: RedditJsonConfig,
}

impl RedditJsonClient {
    pub fn new(
        config: &RedditJsonConfig,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            fetcher: JsonFetcher::new(user_agent, timeout)?,
            config: config.clone(),
        })
    }

    fn listing_url(&self, subreddit: &str, after: Option<&PageCursor>) -> Result<Url, SourceError> {
        let mut url = endpoint_url(
            &self.config.base_url,
            &format!("r/{}/{}.json", subreddit, self.config.listing),
        )?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &self.config.page_size.to_string());
            query.append_pair("raw_json", "1");
            if let Some(after) = after {
                query.append_pair("after", after.as_str());
            }
        }
        Ok(url)
    }

    pub async fn get_subreddit_posts(
        &self,
        subreddit: &str,
        after: Option<&PageCursor>,
    ) -> Result<RedditListing<RedditPostData>, SourceError> {
        let url = self.listing_url(subreddit, after)?;
        let listing: RedditListing<RedditPostData> = self.fetcher.get_json(url, subreddit).await?;

        info!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }

    pub async fn get_post_comments(
        &self,
        subreddit: &str,
        post_id: &str,
        limit: u32,
    ) -> Result<Vec<RedditCommentData>, SourceError> {
        let mut url = endpoint_url(
            &self.config.base_url,
            &format!("r/{}/comments/{}.json", subreddit, post_id),
        )?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("depth", "1")
            .append_pair("raw_json", "1");

        // The thread endpoint returns [post listing, comment listing].
        let listings: Vec<RedditListing<RedditCommentData>> =
            self.fetcher.get_json(url, subreddit).await?;

        let comments: Vec<RedditCommentData> = listings
            .into_iter()
            .skip(1)
            .flat_map(|listing| listing.data.children)
            .filter(|child| child.kind == "t1")
            .map(|child| child.data)
            .take(limit as usize)
            .collect();

        debug!("Retrieved {} comments for {}", comments.len(), post_id);
        Ok(comments)
    }
}

#[async_trait]
impl SourceAdapter for RedditJsonClient {
    fn kind(&self) -> SourceKind {
        SourceKind::RedditJson
    }

    fn pacing(&self) -> RateLimitConfig {
        RateLimitConfig::reddit_json().with_delay_ms(self.config.delay_ms)
    }

    async fn fetch(&self, collection: &CollectionConfig, cursor: Option<&PageCursor>) -> Page {
        match self.get_subreddit_posts(&collection.name, cursor).await {
            Ok(listing) => {
                let next_cursor = listing
                    .data
                    .after
                    .filter(|after| !after.is_empty())
                    .map(PageCursor::new);
                let items = listing
                    .data
                    .children
                    .into_iter()
                    .filter_map(|child| child.data.into_item(&collection.name, SourceKind::RedditJson))
                    .collect();
                Page::new(items, next_cursor)
            }
            Err(e) => Page::failed(e),
        }
    }

    async fn fetch_comments(&self, item: &Item, limit: u32) -> Result<Vec<Comment>, SourceError> {
        let collected_at = Utc::now();
        let comments = self
            .get_post_comments(&item.collection, &item.id, limit)
            .await?
            .into_iter()
            .filter(|c| !c.id.is_empty())
            .map(|c| c.into_comment(item, collected_at))
            .collect();
        Ok(comments)
    }
}
