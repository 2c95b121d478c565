//! Global sending switch, backed by a singleton settings row.
//!
//! Reads fail open: when the row is absent or the read errors out, the
//! switch reports `true`. For a human-supervised, low-volume pipeline a
//! transient storage hiccup must not silently freeze all sending; the
//! operator's explicit pause is the only thing that should.

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::warn;

use crate::Result;

/// The single row all reads and writes address.
const SETTINGS_ROW_ID: i64 = 1;

/// Repository for the global sending switch.
#[derive(Clone)]
pub struct ControlsRepository {
    pool: SqlitePool,
}

impl ControlsRepository {
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
            CREATE TABLE IF NOT EXISTS controls (
                id INTEGER PRIMARY KEY,
                sending_enabled INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Whether dispatch is allowed right now. Fails open.
    pub async fn sending_enabled(&self) -> bool {
        let result = sqlx::query("SELECT sending_enabled FROM controls WHERE id = ?")
            .bind(SETTINGS_ROW_ID)
            .fetch_optional(&self.pool)
            .await;

        match result {
            Ok(Some(row)) => row.get::<i64, _>("sending_enabled") != 0,
            Ok(None) => true,
            Err(e) => {
                warn!(error = %e, "Could not read sending switch, assuming enabled");
                true
            }
        }
    }

    /// Set the switch to an explicit value. Idempotent upsert; returns the
    /// value that is now stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn set_sending_enabled(&self, enabled: bool) -> Result<bool> {
        sqlx::query(
            r"
            INSERT INTO controls (id, sending_enabled, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                sending_enabled = excluded.sending_enabled,
                updated_at = excluded.updated_at
            ",
        )
        .bind(SETTINGS_ROW_ID)
        .bind(enabled)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(enabled)
    }

    /// Flip the switch; returns the new value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub async fn toggle_sending(&self) -> Result<bool> {
        let current = self.sending_enabled().await;
        self.set_sending_enabled(!current).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_row_reads_enabled() {
        let repo = ControlsRepository::in_memory().await.unwrap();
        assert!(repo.sending_enabled().await);
    }

    #[tokio::test]
    async fn test_set_and_read() {
        let repo = ControlsRepository::in_memory().await.unwrap();

        assert!(!repo.set_sending_enabled(false).await.unwrap());
        assert!(!repo.sending_enabled().await);

        // Idempotent under retry.
        assert!(!repo.set_sending_enabled(false).await.unwrap());
        assert!(!repo.sending_enabled().await);

        assert!(repo.set_sending_enabled(true).await.unwrap());
        assert!(repo.sending_enabled().await);
    }

    #[tokio::test]
    async fn test_toggle_twice_returns_to_original() {
        let repo = ControlsRepository::in_memory().await.unwrap();

        let original = repo.sending_enabled().await;
        let flipped = repo.toggle_sending().await.unwrap();
        assert_ne!(original, flipped);
        let restored = repo.toggle_sending().await.unwrap();
        assert_eq!(original, restored);
    }
}
