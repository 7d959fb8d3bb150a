use chrono::{TimeZone, Utc};
use mining::{analyze, Miner, OTHER_CATEGORY};
use needfinder_core::{
    CategoryRule, Comment, Item, LexiconConfig, MiningConfig, Provenance, SourceKind,
};

fn item(id: &str, collection: &str, title: &str, body: &str, score: i64) -> Item {
    let mut item = Item::new(id, collection, title, SourceKind::RedditJson).with_body(body);
    item.score = score;
    item.num_comments = 2;
    item
}

fn lexicon() -> LexiconConfig {
    LexiconConfig {
        pain_points: vec!["wish there was".to_string(), "too slow".to_string()],
        categories: vec![
            CategoryRule {
                name: "finance".to_string(),
                keywords: vec!["budget".to_string(), "expense".to_string()],
            },
            CategoryRule {
                name: "travel".to_string(),
                keywords: vec!["flight".to_string()],
            },
        ],
    }
}

#[test]
fn test_pain_points_match_case_insensitively() {
    let miner = Miner::new(&LexiconConfig::default(), &MiningConfig::default());
    let hits = miner.pain_points_in("I really WISH THERE WAS an app");
    assert!(hits.contains(&"wish there was".to_string()));
}

#[test]
fn test_uppercase_lexicon_entries_still_match() {
    let lexicon = LexiconConfig {
        pain_points: vec!["Wish I Had".to_string()],
        categories: Vec::new(),
    };
    let miner = Miner::new(&lexicon, &MiningConfig::default());
    assert_eq!(miner.pain_points_in("wish i had a better map"), vec!["wish i had"]);
}

#[test]
fn test_unmatched_item_is_other_only() {
    let miner = Miner::new(&lexicon(), &MiningConfig::default());
    assert_eq!(miner.categories_of("nothing relevant"), vec![OTHER_CATEGORY]);
    assert_eq!(
        miner.categories_of("Cheap FLIGHT and a budget"),
        vec!["finance", "travel"]
    );
}

#[test]
fn test_analyze_builds_every_section() {
    let items = vec![
        item("1", "travel", "Wish there was a flight tracker", "", 5),
        item("2", "personalfinance", "Budget sheet too slow", "expense tracking", 30),
        item("3", "personalfinance", "Random chatter", "", 10),
    ];
    let comments = vec![Comment {
        id: "c1".to_string(),
        item_id: "2".to_string(),
        collection: "personalfinance".to_string(),
        author: "bob".to_string(),
        body: format!("Sync is too slow {}", "x".repeat(600)),
        score: 3,
        created_utc: 0,
        collected_at: Utc::now(),
    }];
    let as_of = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

    let result = analyze(&items, &comments, &lexicon(), &MiningConfig::default(), as_of);

    assert_eq!(result.generated_at, as_of);
    assert_eq!(result.total_items(), 3);
    assert_eq!(result.pain_point_items(), 2);
    assert_eq!(result.synthetic_items(), 0);

    let names: Vec<&str> = result.collections.iter().map(|c| c.collection.as_str()).collect();
    assert_eq!(names, vec!["personalfinance", "travel"]);
    assert_eq!(result.collections[0].mean_score, 20.0);

    let categories: Vec<(&str, usize)> = result
        .categories
        .iter()
        .map(|c| (c.name.as_str(), c.item_count))
        .collect();
    assert_eq!(categories, vec![("finance", 1), ("travel", 1), ("other", 1)]);

    let finance = result.top_in_category("finance", 5);
    assert_eq!(finance[0].id, "2");

    assert_eq!(result.comments.total_comments, 1);
    let finding = &result.comments.pain_point_comments[0];
    assert_eq!(finding.pain_points, vec!["too slow"]);
    assert_eq!(finding.body.chars().count(), 500);
}

#[test]
fn test_keyword_table_is_capped() {
    let items = vec![item(
        "1",
        "apps",
        "alpha bravo charlie delta",
        "alpha bravo alpha",
        1,
    )];
    let mining = MiningConfig {
        top_keywords: 2,
        comment_top_words: 30,
    };

    let result = analyze(&items, &[], &lexicon(), &mining, Utc::now());
    let words: Vec<(&str, usize)> = result
        .keywords
        .iter()
        .map(|k| (k.keyword.as_str(), k.count))
        .collect();
    assert_eq!(words, vec![("alpha", 3), ("bravo", 2)]);
}

#[test]
fn test_empty_corpus_has_no_stats() {
    let result = analyze(&[], &[], &lexicon(), &MiningConfig::default(), Utc::now());
    assert!(result.collections.is_empty());
    assert!(result.keywords.is_empty());
    assert!(result.categories.is_empty());
}

#[test]
fn test_synthetic_items_are_counted() {
    let synthetic = Item::new(
        "synthetic_apps_1",
        "apps",
        "Wish there was a thing (r/apps)",
        SourceKind::Synthetic,
    );
    let result = analyze(&[synthetic], &[], &lexicon(), &MiningConfig::default(), Utc::now());
    assert_eq!(result.synthetic_items(), 1);
    assert_eq!(result.items[0].provenance, Provenance::Synthetic);
}
