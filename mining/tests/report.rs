use chrono::{TimeZone, Utc};
use mining::{analyze, ReportGenerator, ReportSnapshot, ReportWriter};
use needfinder_core::{
    Item, LexiconConfig, MiningConfig, ReportConfig, ReportError, SourceKind,
};

fn corpus() -> Vec<Item> {
    let rows = [
        ("1", "productivity", "I wish there was a habit tracker", 40),
        ("2", "productivity", "Calendar app too complicated", 40),
        ("3", "travel", "Need an app for flight prices", 12),
        ("4", "fitness", "Post-run stretching routine", 3),
    ];
    rows.iter()
        .map(|(id, collection, title, score)| {
            let mut item = Item::new(*id, *collection, *title, SourceKind::RedditJson);
            item.score = *score;
            item
        })
        .collect()
}

fn rendered_twice() -> (mining::RenderedReport, mining::RenderedReport) {
    let as_of = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
    let result = analyze(
        &corpus(),
        &[],
        &LexiconConfig::default(),
        &MiningConfig::default(),
        as_of,
    );
    let generator = ReportGenerator::new(ReportConfig::default());
    (generator.render(&result).unwrap(), generator.render(&result).unwrap())
}

#[test]
fn test_render_is_byte_identical() {
    let (first, second) = rendered_twice();
    assert_eq!(first.markdown, second.markdown);
    assert_eq!(first.snapshot_json, second.snapshot_json);
}

#[test]
fn test_markdown_sections() {
    let (report, _) = rendered_twice();
    let md = &report.markdown;

    assert!(md.starts_with("# Needs Analysis Report"));
    assert!(md.contains("- Generated: 2026-10-18 09:30 UTC"));
    assert!(md.contains("| r/fitness | 1 | 3.0 | 0.0 |"));
    assert!(md.contains("## Top 20 Keywords"));
    assert!(md.contains("### PRODUCTIVITY"));
    assert!(md.contains("## Top Pain-Point Items"));
    assert!(!md.contains("Warning"));
    assert!(!md.contains("## Comments"));

    // Equal scores keep corpus order.
    let first = md.find("[I wish there was a habit tracker]").unwrap();
    let second = md.find("[Calendar app too complicated]").unwrap();
    assert!(first < second);
}

#[test]
fn test_synthetic_data_is_flagged() {
    let mut items = corpus();
    items.push(Item::new(
        "synthetic_apps_1",
        "apps",
        "Wish I had something simpler (r/apps)",
        SourceKind::Synthetic,
    ));
    let result = analyze(
        &items,
        &[],
        &LexiconConfig::default(),
        &MiningConfig::default(),
        Utc::now(),
    );
    let report = ReportGenerator::new(ReportConfig::default())
        .render(&result)
        .unwrap();

    assert!(report.markdown.contains("1 of 5 items are synthetic"));
    assert!(report.markdown.contains("_(synthetic)_"));
}

#[test]
fn test_snapshot_parses_back() {
    let (report, _) = rendered_twice();
    let snapshot: ReportSnapshot = serde_json::from_str(&report.snapshot_json).unwrap();

    assert_eq!(snapshot.total_items, 4);
    assert_eq!(snapshot.generated_at, "2026-10-18T09:30:00+00:00");
    let collections: Vec<&str> = snapshot
        .collections
        .iter()
        .map(|c| c.collection.as_str())
        .collect();
    assert_eq!(collections, vec!["fitness", "productivity", "travel"]);
    assert_eq!(snapshot.pain_points[0].id, "1");

    // Same per-category lists as the Markdown, in the same order.
    let productivity = snapshot
        .categories
        .iter()
        .find(|c| c.name == "productivity")
        .unwrap();
    assert_eq!(productivity.item_count, 2);
    let listed: Vec<(&str, &str, i64)> = productivity
        .top_items
        .iter()
        .map(|i| (i.id.as_str(), i.title.as_str(), i.score))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("1", "I wish there was a habit tracker", 40),
            ("2", "Calendar app too complicated", 40),
        ]
    );
    for category in &snapshot.categories {
        assert!(category.top_items.len() <= ReportConfig::default().items_per_category);
    }
}

#[test]
fn test_writer_places_both_files() {
    let dir = tempfile::tempdir().unwrap();
    let markdown = dir.path().join("reports").join("needs.md");
    let snapshot = dir.path().join("reports").join("results.json");
    let (report, _) = rendered_twice();

    ReportWriter::new(&markdown, &snapshot).write(&report).unwrap();

    assert_eq!(std::fs::read_to_string(&markdown).unwrap(), report.markdown);
    assert_eq!(std::fs::read_to_string(&snapshot).unwrap(), report.snapshot_json);
    assert!(!dir.path().join("reports").join("needs.md.tmp").exists());
}

#[test]
fn test_writer_failure_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let markdown = dir.path().join("needs.md");
    // A regular file where the snapshot's directory should be.
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, "").unwrap();
    let snapshot = blocker.join("results.json");
    let (report, _) = rendered_twice();

    let err = ReportWriter::new(&markdown, &snapshot)
        .write(&report)
        .unwrap_err();

    assert!(matches!(err, ReportError::OutputDirectory { .. }));
    assert!(!markdown.exists());
    assert!(!dir.path().join("needs.md.tmp").exists());
}
