//! Lead storage repository.

use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{Lead, LeadId};
use crate::Result;

/// Outcome of a bulk lead import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Leads newly added.
    pub inserted: u32,
    /// Leads skipped because the address already existed.
    pub skipped: u32,
}

/// Repository for lead storage and retrieval.
#[derive(Clone)]
pub struct LeadRepository {
    pool: SqlitePool,
}

impl LeadRepository {
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
            CREATE TABLE IF NOT EXISTS leads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                name TEXT,
                company TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Save a single lead.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails (including a duplicate
    /// address).
    pub async fn insert(&self, lead: &mut Lead) -> Result<()> {
        let result = sqlx::query(
            r"
            INSERT INTO leads (email, name, company)
            VALUES (?, ?, ?)
            ",
        )
        .bind(&lead.email)
        .bind(&lead.name)
        .bind(&lead.company)
        .execute(&self.pool)
        .await?;

        lead.id = Some(LeadId::new(result.last_insert_rowid()));
        Ok(())
    }

    /// Import a batch of leads, skipping addresses already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn import(&self, leads: &[Lead]) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        for lead in leads {
            let result = sqlx::query(
                r"
                INSERT INTO leads (email, name, company)
                VALUES (?, ?, ?)
                ON CONFLICT(email) DO NOTHING
                ",
            )
            .bind(&lead.email)
            .bind(&lead.name)
            .bind(&lead.company)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                summary.inserted += 1;
            } else {
                summary.skipped += 1;
            }
        }

        Ok(summary)
    }

    /// Get lead by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: LeadId) -> Result<Option<Lead>> {
        let row = sqlx::query(
            r"
            SELECT id, email, name, company
            FROM leads
            WHERE id = ?
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_lead))
    }

    /// List leads, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, limit: u32) -> Result<Vec<Lead>> {
        let rows = sqlx::query(
            r"
            SELECT id, email, name, company
            FROM leads
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_lead).collect())
    }
}

fn row_to_lead(row: &sqlx::sqlite::SqliteRow) -> Lead {
    Lead {
        id: Some(LeadId::new(row.get("id"))),
        email: row.get("email"),
        name: row.get("name"),
        company: row.get("company"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = LeadRepository::in_memory().await.unwrap();

        let mut lead = Lead::new("jane@example.com");
        lead.name = Some("Jane".to_string());
        lead.company = Some("Acme".to_string());
        repo.insert(&mut lead).await.unwrap();

        let stored = repo.get(lead.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.email, "jane@example.com");
        assert_eq!(stored.name.as_deref(), Some("Jane"));
        assert_eq!(stored.company.as_deref(), Some("Acme"));
    }

    #[tokio::test]
    async fn test_import_skips_duplicates() {
        let repo = LeadRepository::in_memory().await.unwrap();

        let batch = vec![
            Lead::new("a@example.com"),
            Lead::new("b@example.com"),
            Lead::new("a@example.com"),
        ];

        let summary = repo.import(&batch).await.unwrap();
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.skipped, 1);

        // Re-importing the same batch adds nothing.
        let summary = repo.import(&batch).await.unwrap();
        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.skipped, 3);

        assert_eq!(repo.list(10).await.unwrap().len(), 2);
    }
}
