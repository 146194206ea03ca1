//! Database operations for MarketMate

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;

use crate::error::{DbError, Result};
use crate::types::{ContentCategory, ContentPost, ContentStatus, Platform};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `db_path` and run migrations
    pub async fn new(db_path: &str) -> Result<Self> {
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
        }

        // mode=rwc creates the file if it doesn't exist
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(DbError::SqlxError)?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database, single connection so every query sees the same data
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(DbError::SqlxError)?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::MigrationError)?;

        Ok(Self { pool })
    }

    /// Insert or replace a credential document, keeping the original `created_at`
    pub async fn upsert_credential_document(
        &self,
        user_id: &str,
        provider: &str,
        record: &str,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO credentials (user_id, provider, record, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (user_id, provider)
            DO UPDATE SET record = excluded.record, updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(provider)
        .bind(record)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    pub async fn get_credential_document(
        &self,
        user_id: &str,
        provider: &str,
    ) -> Result<Option<String>> {
        let row = sqlx::query("SELECT record FROM credentials WHERE user_id = ? AND provider = ?")
            .bind(user_id)
            .bind(provider)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(row.map(|r| r.get("record")))
    }

    /// All `(provider, record)` pairs stored for a user
    pub async fn list_credential_documents(&self, user_id: &str) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query(
            "SELECT provider, record FROM credentials WHERE user_id = ? ORDER BY provider",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(rows
            .into_iter()
            .map(|r| (r.get("provider"), r.get("record")))
            .collect())
    }

    /// Persist a content history entry
    pub async fn save_content_post(&self, post: &ContentPost) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO content_posts (
                id, user_id, platform, prompt, category, content, image_url,
                image_description, status, provider_post_id, error_message,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.user_id)
        .bind(post.platform.as_str())
        .bind(&post.prompt)
        .bind(post.category.label())
        .bind(&post.content)
        .bind(&post.image_url)
        .bind(&post.image_description)
        .bind(post.status.as_str())
        .bind(&post.provider_post_id)
        .bind(&post.error_message)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Record the publish outcome of a history entry
    pub async fn update_content_status(
        &self,
        post_id: &str,
        status: ContentStatus,
        provider_post_id: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE content_posts
            SET status = ?, provider_post_id = ?, error_message = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(provider_post_id)
        .bind(error_message)
        .bind(chrono::Utc::now().timestamp())
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    pub async fn get_content_post(&self, post_id: &str) -> Result<Option<ContentPost>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, platform, prompt, category, content, image_url,
                   image_description, status, provider_post_id, error_message,
                   created_at, updated_at
            FROM content_posts WHERE id = ?
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        row.map(|r| row_to_content_post(&r)).transpose()
    }

    /// Most recent history entries for a user, newest first
    pub async fn content_history(&self, user_id: &str, limit: usize) -> Result<Vec<ContentPost>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, platform, prompt, category, content, image_url,
                   image_description, status, provider_post_id, error_message,
                   created_at, updated_at
            FROM content_posts
            WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        rows.iter().map(row_to_content_post).collect()
    }
}

fn row_to_content_post(r: &sqlx::sqlite::SqliteRow) -> Result<ContentPost> {
    let platform: String = r.get("platform");
    let platform: Platform = platform
        .parse()
        .map_err(|e: String| DbError::Corrupt(format!("content_posts.platform: {}", e)))?;
    let category: String = r.get("category");

    Ok(ContentPost {
        id: r.get("id"),
        user_id: r.get("user_id"),
        platform,
        prompt: r.get("prompt"),
        category: category.parse().unwrap_or(ContentCategory::General),
        content: r.get("content"),
        image_url: r.get("image_url"),
        image_description: r.get("image_description"),
        status: ContentStatus::parse(&r.get::<String, _>("status")),
        provider_post_id: r.get("provider_post_id"),
        error_message: r.get("error_message"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarketMateError;
    use crate::types::GeneratedContent;
    use tempfile::TempDir;

    fn sample_post(user_id: &str, created_at: i64) -> ContentPost {
        let content = GeneratedContent {
            caption: format!("Caption at {}", created_at),
            image_description: "A cup of coffee".to_string(),
            image_url: "https://images.example/coffee.jpg".to_string(),
            ..Default::default()
        };
        let mut post = ContentPost::new(
            user_id,
            Platform::Facebook,
            "coffee shop launch",
            ContentCategory::FoodCooking,
            &content,
        );
        post.created_at = created_at;
        post.updated_at = created_at;
        post
    }

    #[tokio::test]
    async fn test_database_initialization_with_invalid_path() {
        #[cfg(unix)]
        let invalid_path = "/tmp/test\0invalid.db";

        #[cfg(windows)]
        let invalid_path = "C:\\invalid<>path\\test.db";

        let result = Database::new(invalid_path).await;
        assert!(matches!(result, Err(MarketMateError::Database(_))));
    }

    #[tokio::test]
    async fn test_database_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("dir").join("mm.db");

        Database::new(db_path.to_str().unwrap()).await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_credential_upsert_keeps_created_at() {
        let db = Database::in_memory().await.unwrap();

        db.upsert_credential_document("u1", "facebook", r#"{"type":"facebook"}"#)
            .await
            .unwrap();
        let created: i64 = sqlx::query("SELECT created_at FROM credentials")
            .fetch_one(&db.pool)
            .await
            .unwrap()
            .get("created_at");

        sqlx::query("UPDATE credentials SET created_at = created_at - 100")
            .execute(&db.pool)
            .await
            .unwrap();

        db.upsert_credential_document("u1", "facebook", r#"{"type":"facebook","pageId":"1"}"#)
            .await
            .unwrap();

        let row = sqlx::query("SELECT COUNT(*) AS n, MIN(created_at) AS c FROM credentials")
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(row.get::<i64, _>("n"), 1);
        assert_eq!(row.get::<i64, _>("c"), created - 100);

        let record = db.get_credential_document("u1", "facebook").await.unwrap();
        assert!(record.unwrap().contains("pageId"));
    }

    #[tokio::test]
    async fn test_get_missing_credential_returns_none() {
        let db = Database::in_memory().await.unwrap();
        assert!(db
            .get_credential_document("nobody", "linkedin")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_save_and_update_content_post() {
        let db = Database::in_memory().await.unwrap();
        let post = sample_post("u1", 1_700_000_000);
        db.save_content_post(&post).await.unwrap();

        db.update_content_status(&post.id, ContentStatus::Published, Some("123_456"), None)
            .await
            .unwrap();

        let loaded = db.get_content_post(&post.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ContentStatus::Published);
        assert_eq!(loaded.provider_post_id.as_deref(), Some("123_456"));
        assert_eq!(loaded.category, ContentCategory::FoodCooking);
        assert_eq!(loaded.platform, Platform::Facebook);
        assert_eq!(loaded.image_description.as_deref(), Some("A cup of coffee"));
    }

    #[tokio::test]
    async fn test_content_history_newest_first_with_limit() {
        let db = Database::in_memory().await.unwrap();
        for ts in [100, 300, 200] {
            db.save_content_post(&sample_post("u1", ts)).await.unwrap();
        }
        db.save_content_post(&sample_post("someone-else", 400))
            .await
            .unwrap();

        let history = db.content_history("u1", 2).await.unwrap();
        let stamps: Vec<i64> = history.iter().map(|p| p.created_at).collect();
        assert_eq!(stamps, vec![300, 200]);
    }

    #[tokio::test]
    async fn test_invalid_status_violates_check_constraint() {
        let db = Database::in_memory().await.unwrap();
        let result = sqlx::query(
            r#"
            INSERT INTO content_posts (id, user_id, platform, prompt, category, content, status, created_at, updated_at)
            VALUES ('x', 'u1', 'facebook', 'p', 'General', 'c', 'bogus', 0, 0)
            "#,
        )
        .execute(&db.pool)
        .await;
        assert!(result.is_err());
    }
}
