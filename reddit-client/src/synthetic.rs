//! Placeholder posts for when no real source answers.
//!
//! The generator exists so the miner always has something to chew on in a
//! demo or an offline run. Every item it produces is tagged
//! [`SourceKind::Synthetic`], which the store records as `provenance =
//! synthetic` and the report calls out explicitly.

use crate::adapter::{Page, PageCursor, SourceAdapter};
use crate::rate_limiter::RateLimitConfig;
use async_trait::async_trait;
use chrono::Utc;
use needfinder_core::{CollectionConfig, Item, SourceKind, SyntheticConfig};
use std::sync::Mutex;
use tracing::warn;

const SECONDS_PER_DAY: i64 = 86_400;

const PRODUCTIVITY: &[&str] = &[
    "I wish there was an app that could automatically track my screen time",
    "Looking for a simple habit tracker that works offline",
    "Does anyone know a good task manager with dark mode?",
    "Frustrated with complex project management tools",
    "Wish I had a clean note-taking app with sync",
    "Missing a simple way to organize daily tasks",
    "Too many apps, I wish there was an all-in-one solution",
];

const FINANCE: &[&str] = &[
    "Need an app to track investment portfolio automatically",
    "Looking for a budget tracker that works offline",
    "Does anyone know a good tax calculator for UK?",
    "Frustrated with complicated trading platforms",
    "Wish there was a simple expense splitter for friends",
    "Missing a clean way to track net worth over time",
    "Too much manual entry for expense tracking",
];

const HEALTH: &[&str] = &[
    "Looking for a running app that works without internet",
    "Does anyone know a good sleep tracker with offline mode?",
    "Wish there was a simple calorie counter without ads",
    "Frustrated with fitness apps that require subscription",
    "Need a workout planner that doesn't sync to cloud",
    "Missing a water intake tracker widget",
    "Too many steps to log my exercises",
];

const TRAVEL: &[&str] = &[
    "Does anyone know a good offline currency converter?",
    "Looking for a simple trip itinerary planner",
    "Wish there was an app to track flight prices automatically",
    "Frustrated with complicated booking platforms",
    "Need a packing list app that works offline",
    "Missing a simple travel journal with photos",
    "Too many apps to manage my trips",
];

const GENERAL: &[&str] = &[
    "I wish there was an app that could {x}",
    "Looking for a tool to help {y}",
    "Does anyone know a good way to {z}?",
    "Frustrated with complicated tools",
    "Wish I had something simpler",
    "Missing feature that would be perfect",
    "Too much friction in current solutions",
];

const FILL_X: &[&str] = &["sync notes", "track habits", "organize links"];
const FILL_Y: &[&str] = &["manage projects", "track time", "plan meals"];
const FILL_Z: &[&str] = &["split bills", "track goals", "record ideas"];

fn templates_for(theme: &str) -> &'static [&'static str] {
    match theme {
        "productivity" => PRODUCTIVITY,
        "finance" => FINANCE,
        "health" => HEALTH,
        "travel" => TRAVEL,
        _ => GENERAL,
    }
}

/// Last-resort source that fabricates plausible posts from a template lexicon.
///
/// Identifiers are `synthetic_{collection}_{n}` so a rerun overwrites the
/// same rows instead of growing the table.
#[derive(Debug)]
pub struct SyntheticGenerator {
    config: SyntheticConfig,
    rng: Mutex<fastrand::Rng>,
}

impl SyntheticGenerator {
    pub fn new(config: SyntheticConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn generate(&self, collection: &CollectionConfig) -> Vec<Item> {
        let theme = collection.theme.as_deref().unwrap_or("general");
        let templates = templates_for(theme);
        let now = Utc::now().timestamp();
        let key = collection.name.to_lowercase();

        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let count = rng.usize(self.config.min_items..=self.config.max_items);

        (1..=count)
            .map(|n| {
                let template = templates[rng.usize(..templates.len())];
                let text = template
                    .replace("{x}", FILL_X[rng.usize(..FILL_X.len())])
                    .replace("{y}", FILL_Y[rng.usize(..FILL_Y.len())])
                    .replace("{z}", FILL_Z[rng.usize(..FILL_Z.len())]);

                let body = format!(
                    "Here's more detail about my {} problem. I've been looking for solutions \
                     but nothing fits my needs perfectly. I'm looking for something that is \
                     simple, fast, and works offline.",
                    theme
                );

                let mut item = Item::new(
                    format!("synthetic_{}_{}", key, n),
                    &collection.name,
                    format!("{} (r/{})", text, collection.name),
                    SourceKind::Synthetic,
                )
                .with_body(&body);
                item.author = format!("user{}", rng.u32(1..=10_000));
                item.created_utc = now - rng.i64(1..=365) * SECONDS_PER_DAY;
                item.score = rng.i64(5..=500);
                item.num_comments = rng.i64(0..=100);
                item
            })
            .collect()
    }
}

#[async_trait]
impl SourceAdapter for SyntheticGenerator {
    fn kind(&self) -> SourceKind {
        SourceKind::Synthetic
    }

    fn pacing(&self) -> RateLimitConfig {
        RateLimitConfig::unpaced()
    }

    async fn fetch(&self, collection: &CollectionConfig, _cursor: Option<&PageCursor>) -> Page {
        let items = self.generate(collection);
        warn!(
            "Generated {} synthetic posts for r/{}; they are placeholders, not real signal",
            items.len(),
            collection.name
        );
        Page::new(items, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use needfinder_core::Provenance;

    fn seeded(min_items: usize, max_items: usize) -> SyntheticGenerator {
        SyntheticGenerator::new(SyntheticConfig {
            enabled: true,
            min_items,
            max_items,
            seed: Some(7),
        })
    }

    #[tokio::test]
    async fn test_single_tagged_page() {
        let generator = seeded(20, 50);
        let collection = CollectionConfig::new("running").with_theme("health");

        let page = generator.fetch(&collection, None).await;
        assert!(page.next_cursor.is_none());
        assert!((20..=50).contains(&page.items.len()));
        for item in &page.items {
            assert_eq!(item.provenance(), Provenance::Synthetic);
            assert_eq!(item.collection, "running");
            assert!(item.title.ends_with("(r/running)"));
            assert!((5..=500).contains(&item.score));
        }
    }

    #[test]
    fn test_ids_are_stable_across_runs() {
        let collection = CollectionConfig::new("Flights").with_theme("travel");
        let first = seeded(3, 3).generate(&collection);
        let second = SyntheticGenerator::new(SyntheticConfig {
            seed: Some(99),
            min_items: 3,
            max_items: 3,
            enabled: true,
        })
        .generate(&collection);

        let ids = |items: &[Item]| items.iter().map(|i| i.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), vec!["synthetic_flights_1", "synthetic_flights_2", "synthetic_flights_3"]);
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_placeholders_are_filled() {
        let generator = seeded(50, 50);
        let collection = CollectionConfig::new("lifehacks");

        for item in generator.generate(&collection) {
            assert!(!item.title.contains('{'), "unfilled template: {}", item.title);
            assert!(item.body.contains("general problem"));
        }
    }
}
