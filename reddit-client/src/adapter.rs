use async_trait::async_trait;
use needfinder_core::{
    AppConfig, CollectionConfig, Comment, CoreError, Item, SourceError, SourceKind,
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

use crate::api::RedditJsonClient;
use crate::paginator::Paginator;
use crate::pushshift::PushshiftClient;
use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use crate::synthetic::SyntheticGenerator;

/// Opaque continuation token handed back by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of items from a source.
///
/// A failed fetch is still a page: empty, without a cursor, and with the
/// failure attached for the caller to log.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Item>,
    pub next_cursor: Option<PageCursor>,
    pub soft_failure: Option<SourceError>,
}

impl Page {
    pub fn new(items: Vec<Item>, next_cursor: Option<PageCursor>) -> Self {
        Self {
            items,
            next_cursor,
            soft_failure: None,
        }
    }

    pub fn failed(error: SourceError) -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            soft_failure: Some(error),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A place items can be fetched from, one page at a time.
///
/// Implementations must not fail past this boundary: transport errors and
/// malformed payloads come back as [`Page::failed`].
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    fn pacing(&self) -> RateLimitConfig;

    async fn fetch(&self, collection: &CollectionConfig, cursor: Option<&PageCursor>) -> Page;

    async fn fetch_comments(&self, _item: &Item, _limit: u32) -> Result<Vec<Comment>, SourceError> {
        Ok(Vec::new())
    }
}

struct RegisteredSource {
    adapter: Box<dyn SourceAdapter>,
    limiter: RateLimiter,
}

/// The adapters available to a run, each with its own pacing state.
#[derive(Default)]
pub struct SourceRegistry {
    sources: HashMap<SourceKind, RegisteredSource>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every adapter the configuration enables.
    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let mut registry = Self::new();

        if config.sources.reddit_json.enabled {
            registry.register(Box::new(RedditJsonClient::new(
                &config.sources.reddit_json,
                &config.user_agent,
                timeout,
            )?));
        }
        if config.sources.pushshift.enabled {
            registry.register(Box::new(PushshiftClient::new(
                &config.sources.pushshift,
                &config.user_agent,
                timeout,
            )?));
        }
        if config.sources.synthetic.enabled {
            registry.register(Box::new(SyntheticGenerator::new(
                config.sources.synthetic.clone(),
            )));
        }

        info!("Registered sources: {:?}", registry.kinds());
        Ok(registry)
    }

    /// Adds an adapter, replacing any previous one of the same kind.
    pub fn register(&mut self, adapter: Box<dyn SourceAdapter>) -> &mut Self {
        let limiter = RateLimiter::new(adapter.pacing());
        self.sources
            .insert(adapter.kind(), RegisteredSource { adapter, limiter });
        self
    }

    pub fn with(mut self, adapter: Box<dyn SourceAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn contains(&self, kind: SourceKind) -> bool {
        self.sources.contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<SourceKind> {
        let mut kinds: Vec<SourceKind> = self.sources.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn adapter(&self, kind: SourceKind) -> Option<&dyn SourceAdapter> {
        self.sources.get(&kind).map(|s| s.adapter.as_ref())
    }

    pub fn limiter(&self, kind: SourceKind) -> Option<&RateLimiter> {
        self.sources.get(&kind).map(|s| &s.limiter)
    }

    /// Starts a fresh page sequence over `collection` using the `kind` adapter.
    pub fn paginator<'a>(
        &'a self,
        kind: SourceKind,
        collection: &'a CollectionConfig,
        max_pages: u32,
    ) -> Option<Paginator<'a>> {
        let source = self.sources.get(&kind)?;
        Some(Paginator::new(
            source.adapter.as_ref(),
            &source.limiter,
            collection,
            max_pages,
        ))
    }

    /// Fetches comments for `item` through the same pacing as its pages.
    pub async fn fetch_comments(
        &self,
        kind: SourceKind,
        item: &Item,
        limit: u32,
    ) -> Result<Vec<Comment>, SourceError> {
        let Some(source) = self.sources.get(&kind) else {
            return Ok(Vec::new());
        };
        source.limiter.acquire_permit().await;
        source.adapter.fetch_comments(item, limit).await
    }
}
