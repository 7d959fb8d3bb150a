use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use needfinder_core::{Comment, CoreError, DatabaseError, Item, SourceKind, UpsertSummary};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS items (
        id TEXT PRIMARY KEY CHECK (length(id) > 0),
        collection TEXT NOT NULL,
        title TEXT NOT NULL CHECK (length(title) > 0),
        author TEXT,
        body TEXT NOT NULL DEFAULT '',
        created_utc INTEGER NOT NULL DEFAULT 0,
        score INTEGER NOT NULL DEFAULT 0,
        num_comments INTEGER NOT NULL DEFAULT 0,
        url TEXT NOT NULL DEFAULT '',
        source TEXT NOT NULL,
        provenance TEXT NOT NULL CHECK (provenance IN ('real', 'synthetic')),
        collected_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_items_collection ON items(collection)",
    "CREATE INDEX IF NOT EXISTS idx_items_score ON items(score DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id TEXT PRIMARY KEY CHECK (length(id) > 0),
        item_id TEXT NOT NULL REFERENCES items(id),
        collection TEXT NOT NULL,
        author TEXT,
        body TEXT NOT NULL DEFAULT '',
        score INTEGER NOT NULL DEFAULT 0,
        created_utc INTEGER NOT NULL DEFAULT 0,
        collected_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_comments_item ON comments(item_id)",
];

// `collected_at` keeps the time of the first write.
const UPSERT_ITEM: &str = r#"
    INSERT INTO items
        (id, collection, title, author, body, created_utc, score, num_comments, url, source, provenance, collected_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        score = excluded.score,
        num_comments = excluded.num_comments
"#;

const UPSERT_COMMENT: &str = r#"
    INSERT INTO comments
        (id, item_id, collection, author, body, score, created_utc, collected_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        score = excluded.score
"#;

const SELECT_ITEMS: &str = r#"
    SELECT id, collection, title, author, body, created_utc, score, num_comments,
           url, source, provenance, collected_at
    FROM items
"#;

/// Write side of the pipeline, plus the one read ingestion needs.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Inserts or refreshes `items` in one batch. Per-item failures are
    /// reported in the summary and never abort the rest of the batch.
    async fn upsert_items(&self, items: &[Item]) -> Result<UpsertSummary, CoreError>;

    async fn upsert_comments(&self, comments: &[Comment]) -> Result<UpsertSummary, CoreError>;

    async fn load_all_identifiers(&self) -> Result<HashSet<String>, CoreError>;
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the SQLite database at `database_url` and
    /// applies the schema.
    pub async fn connect(database_url: &str) -> Result<Self, CoreError> {
        ensure_parent_dir(database_url)?;

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: e.to_string(),
            })?
            .create_if_missing(true);

        // One connection: a run has exactly one writer, and `:memory:`
        // databases are per connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: e.to_string(),
            })?;

        let db = Self { pool };
        db.run_migrations().await?;
        info!("Connected to {}", database_url);
        Ok(db)
    }

    pub async fn in_memory() -> Result<Self, CoreError> {
        Self::connect("sqlite::memory:").await
    }

    async fn run_migrations(&self) -> Result<(), CoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::MigrationFailed {
                    migration: format!("{}: {}", statement.trim().lines().next().unwrap_or(""), e),
                })?;
        }
        debug!("Schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The whole corpus, oldest first, ties broken by id.
    pub async fn load_items(&self) -> Result<Vec<Item>, CoreError> {
        let rows: Vec<ItemRow> =
            sqlx::query_as(&format!("{} ORDER BY collected_at, id", SELECT_ITEMS))
                .fetch_all(&self.pool)
                .await
                .map_err(DatabaseError::from)?;

        let items = rows
            .into_iter()
            .map(ItemRow::into_item)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub async fn get_item(&self, id: &str) -> Result<Option<Item>, CoreError> {
        let row: Option<ItemRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_ITEMS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        Ok(row.map(ItemRow::into_item).transpose()?)
    }

    pub async fn count_items(&self) -> Result<i64, CoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(count)
    }

    pub async fn load_comments(&self) -> Result<Vec<Comment>, CoreError> {
        let rows: Vec<CommentRow> = sqlx::query_as(
            r#"
            SELECT id, item_id, collection, author, body, score, created_utc, collected_at
            FROM comments
            ORDER BY collected_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        let comments = rows
            .into_iter()
            .map(CommentRow::into_comment)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }
}

#[async_trait]
impl ItemStore for Database {
    async fn upsert_items(&self, items: &[Item]) -> Result<UpsertSummary, CoreError> {
        let mut summary = UpsertSummary::default();
        if items.is_empty() {
            return Ok(summary);
        }

        // The store owns `collected_at`: one stamp per batch, taken at write time.
        let collected_at = format_timestamp(&Utc::now());
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        for item in items {
            let result = sqlx::query(UPSERT_ITEM)
                .bind(&item.id)
                .bind(&item.collection)
                .bind(&item.title)
                .bind(&item.author)
                .bind(&item.body)
                .bind(item.created_utc)
                .bind(item.score)
                .bind(item.num_comments)
                .bind(&item.url)
                .bind(item.source.as_str())
                .bind(item.provenance().as_str())
                .bind(&collected_at)
                .execute(&mut *tx)
                .await;

            match result {
                Ok(_) => summary.written += 1,
                Err(e) => {
                    warn!("Error saving item {}: {}", item.id, e);
                    summary.record_failure(&item.id, e.to_string());
                }
            }
        }
        tx.commit().await.map_err(DatabaseError::from)?;

        debug!(
            "Upserted {} items ({} failed)",
            summary.written,
            summary.failures.len()
        );
        Ok(summary)
    }

    async fn upsert_comments(&self, comments: &[Comment]) -> Result<UpsertSummary, CoreError> {
        let mut summary = UpsertSummary::default();
        if comments.is_empty() {
            return Ok(summary);
        }

        let collected_at = format_timestamp(&Utc::now());
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        for comment in comments {
            let result = sqlx::query(UPSERT_COMMENT)
                .bind(&comment.id)
                .bind(&comment.item_id)
                .bind(&comment.collection)
                .bind(&comment.author)
                .bind(&comment.body)
                .bind(comment.score)
                .bind(comment.created_utc)
                .bind(&collected_at)
                .execute(&mut *tx)
                .await;

            match result {
                Ok(_) => summary.written += 1,
                Err(e) => {
                    warn!("Error saving comment {}: {}", comment.id, e);
                    summary.record_failure(&comment.id, e.to_string());
                }
            }
        }
        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(summary)
    }

    async fn load_all_identifiers(&self) -> Result<HashSet<String>, CoreError> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM items")
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(ids.into_iter().collect())
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: String,
    collection: String,
    title: String,
    author: Option<String>,
    body: String,
    created_utc: i64,
    score: i64,
    num_comments: i64,
    url: String,
    source: String,
    provenance: String,
    collected_at: String,
}

impl ItemRow {
    fn into_item(self) -> Result<Item, DatabaseError> {
        let source = SourceKind::from_str(&self.source).map_err(|e| DatabaseError::InvalidRow {
            id: self.id.clone(),
            reason: e.to_string(),
        })?;
        if source.provenance().as_str() != self.provenance {
            return Err(DatabaseError::InvalidRow {
                id: self.id,
                reason: format!(
                    "provenance '{}' does not match source '{}'",
                    self.provenance, self.source
                ),
            });
        }
        let collected_at = parse_timestamp(&self.id, &self.collected_at)?;

        Ok(Item {
            id: self.id,
            collection: self.collection,
            title: self.title,
            author: needfinder_core::normalize_author(self.author.as_deref()),
            body: self.body,
            created_utc: self.created_utc,
            score: self.score,
            num_comments: self.num_comments,
            url: self.url,
            source,
            collected_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CommentRow {
    id: String,
    item_id: String,
    collection: String,
    author: Option<String>,
    body: String,
    score: i64,
    created_utc: i64,
    collected_at: String,
}

impl CommentRow {
    fn into_comment(self) -> Result<Comment, DatabaseError> {
        let collected_at = parse_timestamp(&self.id, &self.collected_at)?;
        Ok(Comment {
            id: self.id,
            item_id: self.item_id,
            collection: self.collection,
            author: needfinder_core::normalize_author(self.author.as_deref()),
            body: self.body,
            score: self.score,
            created_utc: self.created_utc,
            collected_at,
        })
    }
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(id: &str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DatabaseError::InvalidRow {
            id: id.to_string(),
            reason: format!("invalid collected_at '{}': {}", raw, e),
        })
}

/// Creates the directory holding a file-backed database.
fn ensure_parent_dir(database_url: &str) -> Result<(), CoreError> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            debug!("Created database directory {}", parent.display());
        }
    }
    Ok(())
}
