use database::ItemStore;
use needfinder_core::{
    CollectionConfig, Comment, CoreError, ErrorExt, IngestionConfig, Item, SourceError,
    SourceKind, WriteFailure,
};
use reddit_client::SourceRegistry;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

use crate::identity::IdentitySet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionOptions {
    pub max_pages_per_collection: u32,
    /// `None` means unlimited.
    pub global_item_quota: Option<usize>,
    pub comments_per_item: u32,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self::from_config(&IngestionConfig::default())
    }
}

impl IngestionOptions {
    pub fn from_config(config: &IngestionConfig) -> Self {
        Self {
            max_pages_per_collection: config.max_pages_per_collection,
            global_item_quota: config.global_quota(),
            comments_per_item: config.comments_per_item,
        }
    }
}

/// What happened to one collection during a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionOutcome {
    pub collection: String,
    /// The source whose pages were used; `None` if every source came back empty.
    pub source: Option<SourceKind>,
    pub pages_fetched: u32,
    pub items_seen: usize,
    pub duplicates_skipped: usize,
    /// Items claimed for writing, whether or not the write succeeded.
    pub accepted: usize,
    pub new_items: usize,
    pub soft_failures: Vec<SourceError>,
    pub write_failures: Vec<WriteFailure>,
    pub comments_written: usize,
}

impl CollectionOutcome {
    fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionReport {
    pub collections: Vec<CollectionOutcome>,
    pub quota_reached: bool,
}

impl IngestionReport {
    pub fn new_items_by_collection(&self) -> BTreeMap<String, usize> {
        self.collections
            .iter()
            .map(|c| (c.collection.clone(), c.new_items))
            .collect()
    }

    pub fn total_new_items(&self) -> usize {
        self.collections.iter().map(|c| c.new_items).sum()
    }

    pub fn total_write_failures(&self) -> usize {
        self.collections.iter().map(|c| c.write_failures.len()).sum()
    }

    pub fn outcome(&self, collection: &str) -> Option<&CollectionOutcome> {
        self.collections.iter().find(|c| c.collection == collection)
    }
}

/// Drives every collection through its sources into the store, one page at a time.
pub struct IngestionCoordinator<'a> {
    store: &'a dyn ItemStore,
    sources: &'a SourceRegistry,
    options: IngestionOptions,
}

struct RunState {
    identities: IdentitySet,
    accepted_total: usize,
}

impl<'a> IngestionCoordinator<'a> {
    pub fn new(store: &'a dyn ItemStore, sources: &'a SourceRegistry, options: IngestionOptions) -> Self {
        Self {
            store,
            sources,
            options,
        }
    }

    pub async fn run(&self, collections: &[CollectionConfig]) -> Result<IngestionReport, CoreError> {
        let mut state = RunState {
            identities: IdentitySet::load(self.store).await?,
            accepted_total: 0,
        };
        let mut report = IngestionReport::default();

        for collection in collections {
            if self.global_remaining(&state) == Some(0) {
                info!(
                    "Global quota of {} items reached; skipping remaining collections",
                    state.accepted_total
                );
                report.quota_reached = true;
                break;
            }

            let outcome = self.ingest_collection(collection, &mut state).await?;
            info!(
                "r/{}: {} new, {} duplicates, {} pages via {}",
                outcome.collection,
                outcome.new_items,
                outcome.duplicates_skipped,
                outcome.pages_fetched,
                outcome.source.map(|s| s.as_str()).unwrap_or("no source")
            );
            report.collections.push(outcome);
        }

        if self.global_remaining(&state) == Some(0) {
            report.quota_reached = true;
        }
        info!(
            "Ingestion finished: {} new items across {} collections",
            report.total_new_items(),
            report.collections.len()
        );
        Ok(report)
    }

    async fn ingest_collection(
        &self,
        collection: &CollectionConfig,
        state: &mut RunState,
    ) -> Result<CollectionOutcome, CoreError> {
        let mut outcome = CollectionOutcome::new(&collection.name);
        let max_pages = collection
            .max_pages
            .unwrap_or(self.options.max_pages_per_collection);

        for &kind in &collection.sources {
            let Some(mut paginator) = self.sources.paginator(kind, collection, max_pages) else {
                debug!("{} is not enabled; skipping it for r/{}", kind, collection.name);
                continue;
            };

            let mut first_page = true;
            while let Some(page) = paginator.next_page().await {
                outcome.pages_fetched += 1;
                if let Some(failure) = &page.soft_failure {
                    failure.log_warn();
                    outcome.soft_failures.push(failure.clone());
                }

                if first_page && page.is_empty() {
                    debug!("{} returned nothing for r/{}; trying next source", kind, collection.name);
                    break;
                }
                first_page = false;
                outcome.source = Some(kind);
                outcome.items_seen += page.items.len();

                let accepted = self.accept(collection, page.items, state, &mut outcome);
                self.persist(kind, &accepted, &mut outcome).await?;

                if self.remaining(collection, state, &outcome) == Some(0) {
                    debug!("Quota reached while reading r/{}", collection.name);
                    paginator.stop();
                }
            }

            if outcome.source.is_some() {
                break;
            }
        }

        if outcome.source.is_none() {
            warn!("No source produced items for r/{}", collection.name);
        }
        Ok(outcome)
    }

    /// Drops known identifiers and anything past the quota. Survivors are
    /// claimed in the identity set before they are written.
    fn accept(
        &self,
        collection: &CollectionConfig,
        items: Vec<Item>,
        state: &mut RunState,
        outcome: &mut CollectionOutcome,
    ) -> Vec<Item> {
        let mut accepted = Vec::new();
        let mut claimed = 0;
        let remaining = self.remaining(collection, state, outcome);

        for item in items {
            if remaining.is_some_and(|r| claimed >= r) {
                break;
            }
            if state.identities.insert_if_new(&item.id) {
                claimed += 1;
                accepted.push(item);
            } else {
                outcome.duplicates_skipped += 1;
            }
        }

        state.accepted_total += claimed;
        outcome.accepted += claimed;
        accepted
    }

    async fn persist(
        &self,
        kind: SourceKind,
        items: &[Item],
        outcome: &mut CollectionOutcome,
    ) -> Result<(), CoreError> {
        if items.is_empty() {
            return Ok(());
        }

        let summary = match self.store.upsert_items(items).await {
            Ok(summary) => summary,
            Err(e) if !e.is_fatal() => {
                e.log_warn();
                outcome
                    .write_failures
                    .extend(batch_failures(items.iter().map(|i| i.id.as_str()), &e));
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        outcome.new_items += summary.written;
        for failure in &summary.failures {
            warn!("Skipped item {}: {}", failure.id, failure.reason);
        }

        if self.options.comments_per_item > 0 {
            let failed: HashSet<&str> = summary.failures.iter().map(|f| f.id.as_str()).collect();
            let written: Vec<&Item> = items
                .iter()
                .filter(|item| !failed.contains(item.id.as_str()))
                .collect();
            self.persist_comments(kind, &written, outcome).await?;
        }

        outcome.write_failures.extend(summary.failures);
        Ok(())
    }

    async fn persist_comments(
        &self,
        kind: SourceKind,
        items: &[&Item],
        outcome: &mut CollectionOutcome,
    ) -> Result<(), CoreError> {
        let mut comments: Vec<Comment> = Vec::new();
        for &item in items {
            match self
                .sources
                .fetch_comments(kind, item, self.options.comments_per_item)
                .await
            {
                Ok(fetched) => comments.extend(fetched),
                Err(e) => {
                    e.log_warn();
                    outcome.soft_failures.push(e);
                }
            }
        }

        let summary = match self.store.upsert_comments(&comments).await {
            Ok(summary) => summary,
            Err(e) if !e.is_fatal() => {
                e.log_warn();
                outcome
                    .write_failures
                    .extend(batch_failures(comments.iter().map(|c| c.id.as_str()), &e));
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        outcome.comments_written += summary.written;
        for failure in &summary.failures {
            warn!("Skipped comment {}: {}", failure.id, failure.reason);
        }
        outcome.write_failures.extend(summary.failures);
        Ok(())
    }

    fn global_remaining(&self, state: &RunState) -> Option<usize> {
        self.options
            .global_item_quota
            .map(|quota| quota.saturating_sub(state.accepted_total))
    }

    fn remaining(
        &self,
        collection: &CollectionConfig,
        state: &RunState,
        outcome: &CollectionOutcome,
    ) -> Option<usize> {
        let local = collection
            .max_items
            .map(|max| max.saturating_sub(outcome.accepted));
        match (self.global_remaining(state), local) {
            (Some(global), Some(local)) => Some(global.min(local)),
            (global, local) => global.or(local),
        }
    }
}

/// Charges a whole rejected batch to its records.
fn batch_failures<'i>(ids: impl Iterator<Item = &'i str>, error: &CoreError) -> Vec<WriteFailure> {
    let reason = error.to_string();
    ids.map(|id| WriteFailure {
        id: id.to_string(),
        reason: reason.clone(),
    })
    .collect()
}
