#[cfg(test)]
mod tests {
    use crate::{Database, ItemStore};
    use needfinder_core::{Comment, Item, Provenance, SourceKind};
    use chrono::{Duration, Utc};
    use std::env;

    async fn setup_test_db() -> Database {
        Database::in_memory()
            .await
            .expect("Failed to open in-memory database")
    }

    fn item(id: &str, score: i64) -> Item {
        let mut item = Item::new(id, "productivity", format!("Post {}", id), SourceKind::RedditJson)
            .with_body("I wish there was a better way");
        item.score = score;
        item.num_comments = 1;
        item
    }

    #[tokio::test]
    async fn test_file_database_is_created() {
        let dir = env::temp_dir().join(format!("needfinder_{}", uuid::Uuid::new_v4()));
        let db_path = dir.join("nested").join("posts.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let db = Database::connect(&db_url)
            .await
            .expect("Failed to connect to test database");
        db.upsert_items(&[item("a1", 1)]).await.unwrap();
        assert!(db_path.exists());

        drop(db);
        let reopened = Database::connect(&db_url).await.unwrap();
        assert_eq!(reopened.count_items().await.unwrap(), 1);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let db = setup_test_db().await;
        let batch = vec![item("a1", 10), item("a2", 20)];

        let first = db.upsert_items(&batch).await.unwrap();
        let snapshot = db.load_items().await.unwrap();
        let second = db.upsert_items(&batch).await.unwrap();

        assert_eq!(first.written, 2);
        assert_eq!(second.written, 2);
        assert!(second.failures.is_empty());
        assert_eq!(db.count_items().await.unwrap(), 2);
        assert_eq!(db.load_items().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_reupsert_overwrites_mutable_fields_only() {
        let db = setup_test_db().await;
        let original = item("a1", 10);
        db.upsert_items(&[original.clone()]).await.unwrap();
        let stored = db.get_item("a1").await.unwrap().unwrap();

        let mut refreshed = item("a1", 99);
        refreshed.num_comments = 42;
        refreshed.title = "Edited title".to_string();
        refreshed.collected_at = Utc::now() + Duration::days(3);
        db.upsert_items(&[refreshed]).await.unwrap();

        let updated = db.get_item("a1").await.unwrap().unwrap();
        assert_eq!(updated.score, 99);
        assert_eq!(updated.num_comments, 42);
        assert_eq!(updated.title, original.title);
        assert_eq!(updated.collected_at, stored.collected_at);
    }

    #[tokio::test]
    async fn test_bad_item_does_not_abort_batch() {
        let db = setup_test_db().await;
        let batch = vec![item("a1", 1), item("", 2), item("a3", 3)];

        let summary = db.upsert_items(&batch).await.unwrap();

        assert_eq!(summary.written, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].id, "");
        let ids = db.load_all_identifiers().await.unwrap();
        assert!(ids.contains("a1"));
        assert!(ids.contains("a3"));
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn test_provenance_is_stored() {
        let db = setup_test_db().await;
        let synthetic = Item::new(
            "synthetic_running_1",
            "running",
            "Looking for a running app (r/running)",
            SourceKind::Synthetic,
        );
        db.upsert_items(&[synthetic, item("a1", 1)]).await.unwrap();

        let provenance: String =
            sqlx::query_scalar("SELECT provenance FROM items WHERE id = 'synthetic_running_1'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(provenance, "synthetic");

        let loaded = db.get_item("synthetic_running_1").await.unwrap().unwrap();
        assert_eq!(loaded.source, SourceKind::Synthetic);
        assert_eq!(loaded.provenance(), Provenance::Synthetic);
    }

    #[tokio::test]
    async fn test_load_items_orders_by_collection_time() {
        let db = setup_test_db().await;
        db.upsert_items(&[item("b", 1)]).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        db.upsert_items(&[item("c", 1), item("a", 1)]).await.unwrap();

        let ids: Vec<String> = db
            .load_items()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_collected_at_is_stamped_on_write() {
        let db = setup_test_db().await;
        let mut stale = item("a1", 1);
        stale.collected_at = Utc::now() - Duration::days(30);

        let before = Utc::now();
        db.upsert_items(&[stale, item("a2", 1)]).await.unwrap();
        let after = Utc::now();

        let first = db.get_item("a1").await.unwrap().unwrap();
        let second = db.get_item("a2").await.unwrap().unwrap();
        assert!(first.collected_at >= before - Duration::milliseconds(1));
        assert!(first.collected_at <= after);
        assert_eq!(first.collected_at, second.collected_at);
    }

    #[tokio::test]
    async fn test_comments_require_parent_item() {
        let db = setup_test_db().await;
        db.upsert_items(&[item("a1", 1)]).await.unwrap();

        let comment = |id: &str, parent: &str| Comment {
            id: id.to_string(),
            item_id: parent.to_string(),
            collection: "productivity".to_string(),
            author: "bob".to_string(),
            body: "Too slow to sync".to_string(),
            score: 2,
            created_utc: 1_700_000_000,
            collected_at: Utc::now(),
        };

        let summary = db
            .upsert_comments(&[comment("c1", "a1"), comment("c2", "missing")])
            .await
            .unwrap();
        assert_eq!(summary.written, 1);
        assert_eq!(summary.failures[0].id, "c2");

        let comments = db.load_comments().await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].item_id, "a1");
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let db = setup_test_db().await;
        let summary = db.upsert_items(&[]).await.unwrap();
        assert_eq!(summary.written, 0);
        assert!(db.load_all_identifiers().await.unwrap().is_empty());
    }
}
