use needfinder_core::CollectionConfig;
use tracing::debug;

use crate::adapter::{Page, PageCursor, SourceAdapter};
use crate::rate_limiter::RateLimiter;

/// Walks one collection of one source, page by page.
///
/// The sequence is lazy and single-use: nothing is fetched until
/// [`Paginator::next_page`] is awaited, and once it returns `None` it stays
/// finished. It ends when the source hands back no cursor, after `max_pages`
/// pages, or when the caller calls [`Paginator::stop`].
pub struct Paginator<'a> {
    adapter: &'a dyn SourceAdapter,
    limiter: &'a RateLimiter,
    collection: &'a CollectionConfig,
    max_pages: u32,
    pages_fetched: u32,
    cursor: Option<PageCursor>,
    finished: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(
        adapter: &'a dyn SourceAdapter,
        limiter: &'a RateLimiter,
        collection: &'a CollectionConfig,
        max_pages: u32,
    ) -> Self {
        Self {
            adapter,
            limiter,
            collection,
            max_pages,
            pages_fetched: 0,
            cursor: None,
            finished: max_pages == 0,
        }
    }

    pub async fn next_page(&mut self) -> Option<Page> {
        if self.finished {
            return None;
        }

        self.limiter.acquire_permit().await;
        let page = self
            .adapter
            .fetch(self.collection, self.cursor.as_ref())
            .await;
        self.pages_fetched += 1;

        self.cursor = page.next_cursor.clone();
        if self.cursor.is_none() {
            debug!(
                "{} exhausted r/{} after {} page(s)",
                self.adapter.kind(),
                self.collection.name,
                self.pages_fetched
            );
            self.finished = true;
        } else if self.pages_fetched >= self.max_pages {
            debug!(
                "Page budget of {} reached for r/{}",
                self.max_pages, self.collection.name
            );
            self.finished = true;
        }

        Some(page)
    }

    /// Ends the sequence early, e.g. when the item quota runs out.
    pub fn stop(&mut self) {
        self.finished = true;
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
