//! libSQL record store for scraped articles (offline mode).
//!
//! The [`Storage`] struct wraps a local libSQL database holding the
//! `articles` table: the seeded originals plus any enhancement results.
//!
//! **Access rules:**
//! - `seed` / `enhance` commands: read-write via [`Storage::open`]
//! - `list` / `show` commands: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use copyforge_shared::{Article, ArticleId, CopyforgeError, MAX_REFERENCES, Result};
use libsql::{Connection, Database, params};

/// Columns selected for every article query, in [`row_to_article`] order.
const ARTICLE_COLUMNS: &str =
    "id, title, original_content, original_url, updated_content, references_json, created_at";

/// Fields supplied when inserting an article; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub title: String,
    pub original_content: String,
    pub original_url: String,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CopyforgeError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CopyforgeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| CopyforgeError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CopyforgeError::Storage(format!(
                "database not found at {} (run `copyforge seed` first)",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CopyforgeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| CopyforgeError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        CopyforgeError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(CopyforgeError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert one article. Fails if `original_url` is already stored.
    pub async fn insert_article(&self, article: &NewArticle) -> Result<Article> {
        self.check_writable()?;
        insert_on(&self.conn, article).await
    }

    /// Atomically replace every stored article with `articles`, inserted in order.
    ///
    /// Insertion order defines `created_at` order, so callers pass the oldest first.
    pub async fn replace_all(&self, articles: &[NewArticle]) -> Result<Vec<Article>> {
        self.check_writable()?;

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| CopyforgeError::Storage(e.to_string()))?;

        tx.execute("DELETE FROM articles", params![])
            .await
            .map_err(|e| CopyforgeError::Storage(e.to_string()))?;

        let mut stored = Vec::with_capacity(articles.len());
        for article in articles {
            // Dropping `tx` on error rolls the batch back.
            stored.push(insert_on(&tx, article).await?);
        }

        tx.commit()
            .await
            .map_err(|e| CopyforgeError::Storage(e.to_string()))?;

        tracing::info!(count = stored.len(), "article store replaced");
        Ok(stored)
    }

    /// Record an enhancement result on an existing article.
    pub async fn update_enhancement(
        &self,
        id: &ArticleId,
        updated_content: &str,
        references: &[String],
    ) -> Result<()> {
        self.check_writable()?;

        if references.len() > MAX_REFERENCES {
            return Err(CopyforgeError::validation(format!(
                "{} references exceeds the maximum of {MAX_REFERENCES}",
                references.len()
            )));
        }

        let references_json = serde_json::to_string(references)
            .map_err(|e| CopyforgeError::Storage(e.to_string()))?;
        let id = id.to_string();

        let affected = self
            .conn
            .execute(
                "UPDATE articles SET updated_content = ?1, references_json = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![updated_content, references_json, timestamp(Utc::now()), id.as_str()],
            )
            .await
            .map_err(|e| CopyforgeError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(CopyforgeError::Storage(format!("article {id} not found")));
        }
        Ok(())
    }

    /// Delete every article. Returns the number removed.
    pub async fn delete_all(&self) -> Result<u64> {
        self.check_writable()?;
        self.conn
            .execute("DELETE FROM articles", params![])
            .await
            .map_err(|e| CopyforgeError::Storage(e.to_string()))
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The `limit` oldest articles, oldest first (insertion order breaks ties).
    pub async fn find_oldest(&self, limit: usize) -> Result<Vec<Article>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_articles(
            &format!(
                "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY created_at ASC, rowid ASC LIMIT ?1"
            ),
            params![limit],
        )
        .await
    }

    /// Every article, newest first.
    pub async fn list_articles(&self) -> Result<Vec<Article>> {
        self.query_articles(
            &format!(
                "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY created_at DESC, rowid DESC"
            ),
            params![],
        )
        .await
    }

    /// Look up one article by id.
    pub async fn get_article(&self, id: &ArticleId) -> Result<Option<Article>> {
        let id = id.to_string();
        let mut found = self
            .query_articles(
                &format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?1"),
                params![id.as_str()],
            )
            .await?;
        Ok(found.pop())
    }

    async fn query_articles(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Article>> {
        let mut rows = self
            .conn
            .query(sql, params)
            .await
            .map_err(|e| CopyforgeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| CopyforgeError::Storage(e.to_string()))?
        {
            results.push(row_to_article(&row)?);
        }
        Ok(results)
    }
}

/// Insert through `conn`, which may be the plain connection or a transaction.
async fn insert_on(conn: &Connection, article: &NewArticle) -> Result<Article> {
    let id = ArticleId::new();
    let now = Utc::now();
    let stamp = timestamp(now);
    let id_str = id.to_string();

    conn.execute(
        "INSERT INTO articles (id, title, original_content, original_url, updated_content,
                               references_json, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, NULL, '[]', ?5, ?6)",
        params![
            id_str.as_str(),
            article.title.as_str(),
            article.original_content.as_str(),
            article.original_url.as_str(),
            stamp.as_str(),
            stamp.as_str(),
        ],
    )
    .await
    .map_err(|e| CopyforgeError::Storage(format!("insert {}: {e}", article.original_url)))?;

    Ok(Article {
        id,
        title: article.title.clone(),
        original_content: article.original_content.clone(),
        original_url: article.original_url.clone(),
        updated_content: None,
        references: Vec::new(),
        created_at: now,
    })
}

/// Fixed-width RFC 3339 so lexical order matches chronological order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Convert a database row to an [`Article`].
fn row_to_article(row: &libsql::Row) -> Result<Article> {
    let id: String = row
        .get(0)
        .map_err(|e| CopyforgeError::Storage(e.to_string()))?;
    let references_json: String = row
        .get(5)
        .map_err(|e| CopyforgeError::Storage(e.to_string()))?;
    let created_at: String = row
        .get(6)
        .map_err(|e| CopyforgeError::Storage(e.to_string()))?;

    Ok(Article {
        id: id
            .parse()
            .map_err(|e| CopyforgeError::Storage(format!("invalid article id '{id}': {e}")))?,
        title: row
            .get::<String>(1)
            .map_err(|e| CopyforgeError::Storage(e.to_string()))?,
        original_content: row
            .get::<String>(2)
            .map_err(|e| CopyforgeError::Storage(e.to_string()))?,
        original_url: row
            .get::<String>(3)
            .map_err(|e| CopyforgeError::Storage(e.to_string()))?,
        updated_content: row.get::<String>(4).ok(),
        references: serde_json::from_str(&references_json)
            .map_err(|e| CopyforgeError::Storage(format!("invalid references: {e}")))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| CopyforgeError::Storage(format!("invalid date: {e}")))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_db_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("cf_test_{}.db", Uuid::now_v7()))
    }

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        Storage::open(&temp_db_path()).await.expect("open test db")
    }

    fn new_article(n: u32) -> NewArticle {
        NewArticle {
            title: format!("Article {n}"),
            original_content: format!("Body of article {n}."),
            original_url: format!("https://blog.example.com/blogs/article-{n}/"),
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = temp_db_path();
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn insert_and_get() {
        let storage = test_storage().await;
        let inserted = storage.insert_article(&new_article(1)).await.expect("insert");

        let found = storage
            .get_article(&inserted.id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(found.title, "Article 1");
        assert_eq!(found.original_url, "https://blog.example.com/blogs/article-1/");
        assert_eq!(found.updated_content, None);
        assert!(found.references.is_empty());

        assert!(storage.get_article(&ArticleId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_url_rejected() {
        let storage = test_storage().await;
        storage.insert_article(&new_article(1)).await.unwrap();
        let err = storage.insert_article(&new_article(1)).await.unwrap_err();
        assert!(matches!(err, CopyforgeError::Storage(_)));
    }

    #[tokio::test]
    async fn find_oldest_in_insertion_order() {
        let storage = test_storage().await;
        let batch: Vec<_> = (1..=6).map(new_article).collect();
        storage.replace_all(&batch).await.expect("replace");

        let oldest = storage.find_oldest(3).await.expect("find oldest");
        let titles: Vec<_> = oldest.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Article 1", "Article 2", "Article 3"]);

        assert_eq!(storage.find_oldest(50).await.unwrap().len(), 6);
        assert!(storage.find_oldest(0).await.unwrap().is_empty());

        let newest_first = storage.list_articles().await.unwrap();
        assert_eq!(newest_first[0].title, "Article 6");
        assert_eq!(newest_first[5].title, "Article 1");
    }

    #[tokio::test]
    async fn replace_all_clears_previous_rows() {
        let storage = test_storage().await;
        storage.replace_all(&[new_article(1), new_article(2)]).await.unwrap();
        storage.replace_all(&[new_article(2), new_article(3)]).await.unwrap();

        let titles: Vec<_> = storage
            .find_oldest(10)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["Article 2", "Article 3"]);
    }

    #[tokio::test]
    async fn replace_all_rolls_back_on_duplicate() {
        let storage = test_storage().await;
        storage.replace_all(&[new_article(1)]).await.unwrap();

        let result = storage
            .replace_all(&[new_article(2), new_article(2)])
            .await;
        assert!(result.is_err());

        let remaining = storage.find_oldest(10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title, "Article 1");
    }

    #[tokio::test]
    async fn update_enhancement_roundtrip() {
        let storage = test_storage().await;
        let article = storage.insert_article(&new_article(1)).await.unwrap();
        let refs = vec![
            "https://a.example.com/post".to_string(),
            "https://b.example.com/post".to_string(),
        ];

        storage
            .update_enhancement(&article.id, "## Rewritten\nKey Takeaways", &refs)
            .await
            .expect("update");

        let found = storage.get_article(&article.id).await.unwrap().unwrap();
        assert_eq!(found.updated_content.as_deref(), Some("## Rewritten\nKey Takeaways"));
        assert_eq!(found.references, refs);
        assert_eq!(found.original_content, "Body of article 1.");
    }

    #[tokio::test]
    async fn update_missing_article_fails() {
        let storage = test_storage().await;
        let err = storage
            .update_enhancement(&ArticleId::new(), "text", &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn update_rejects_too_many_references() {
        let storage = test_storage().await;
        let article = storage.insert_article(&new_article(1)).await.unwrap();
        let refs: Vec<String> = (0..=MAX_REFERENCES)
            .map(|i| format!("https://r{i}.example.com/"))
            .collect();

        let err = storage
            .update_enhancement(&article.id, "text", &refs)
            .await
            .unwrap_err();
        assert!(matches!(err, CopyforgeError::Validation { .. }));
    }

    #[tokio::test]
    async fn delete_all_empties_store() {
        let storage = test_storage().await;
        storage.replace_all(&[new_article(1), new_article(2)]).await.unwrap();
        assert_eq!(storage.delete_all().await.unwrap(), 2);
        assert!(storage.list_articles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = temp_db_path();
        let rw = Storage::open(&tmp).await.unwrap();
        rw.insert_article(&new_article(1)).await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.expect("open readonly");
        assert_eq!(ro.list_articles().await.unwrap().len(), 1);
        assert!(ro.insert_article(&new_article(2)).await.is_err());
        assert!(ro.delete_all().await.is_err());
    }

    #[tokio::test]
    async fn readonly_requires_existing_file() {
        let result = Storage::open_readonly(&temp_db_path()).await;
        assert!(result.is_err());
    }
}
