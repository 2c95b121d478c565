//! LinkedIn content storage repository.

use coldwire_llm::LinkedInKind;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{LinkedInItem, ReviewStatus};
use crate::{Error, Result};

/// Repository for generated LinkedIn content.
#[derive(Clone)]
pub struct LinkedInRepository {
    pool: SqlitePool,
}

impl LinkedInRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Self::with_pool(pool).await
    }

    /// Create a repository on an existing connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool).await
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS linkedin_content (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                content TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'draft',
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store a batch of generated items as drafts. Returns how many landed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_batch(&self, kind: LinkedInKind, items: &[String]) -> Result<u32> {
        let mut inserted = 0u32;

        for content in items {
            sqlx::query(
                r"
                INSERT INTO linkedin_content (kind, content, status)
                VALUES (?, ?, 'draft')
                ",
            )
            .bind(kind.as_str())
            .bind(content)
            .execute(&self.pool)
            .await?;
            inserted += 1;
        }

        Ok(inserted)
    }

    /// List items, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, status: Option<ReviewStatus>, limit: u32) -> Result<Vec<LinkedInItem>> {
        let rows = if let Some(status) = status {
            sqlx::query(
                r"
                SELECT id, kind, content, status
                FROM linkedin_content
                WHERE status = ?
                ORDER BY created_at DESC, id DESC
                LIMIT ?
                ",
            )
            .bind(status.as_str())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                r"
                SELECT id, kind, content, status
                FROM linkedin_content
                ORDER BY created_at DESC, id DESC
                LIMIT ?
                ",
            )
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows.iter().map(row_to_item).collect())
    }

    /// Move an item to a new review status, validating the transition.
    ///
    /// # Errors
    ///
    /// Returns an error when the item is missing, the move is illegal, or
    /// the database query fails.
    pub async fn update_status(&self, id: i64, to: ReviewStatus) -> Result<()> {
        let row = sqlx::query("SELECT status FROM linkedin_content WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(Error::ItemNotFound(id));
        };
        let current = ReviewStatus::parse(row.get("status"));
        if !current.can_transition(to) {
            return Err(Error::InvalidReviewTransition { from: current, to });
        }

        sqlx::query(
            r"
            UPDATE linkedin_content
            SET status = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            ",
        )
        .bind(to.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> LinkedInItem {
    LinkedInItem {
        id: Some(row.get("id")),
        kind: LinkedInKind::parse(row.get("kind")),
        content: row.get("content"),
        status: ReviewStatus::parse(row.get("status")),
    }
}
