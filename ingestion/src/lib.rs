//! Moves posts from the configured sources into the store.
//!
//! One [`IngestionCoordinator::run`] walks the collections in order. For each
//! one it tries the collection's sources by priority, deduplicates every page
//! against the [`IdentitySet`], and writes the survivors as one batch.

pub mod coordinator;
pub mod identity;

pub use coordinator::{CollectionOutcome, IngestionCoordinator, IngestionOptions, IngestionReport};
pub use identity::IdentitySet;
