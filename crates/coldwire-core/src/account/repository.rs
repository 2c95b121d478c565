//! Sender account storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{AccountId, SenderAccount, SmtpOverride};
use crate::Result;

/// Repository for sender account storage and retrieval.
#[derive(Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
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
            CREATE TABLE IF NOT EXISTS sender_accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                display_name TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                warmup_start_date TEXT,
                max_per_day INTEGER,
                smtp_host TEXT,
                smtp_port INTEGER,
                smtp_username TEXT,
                smtp_password TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get all accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<SenderAccount>> {
        let rows = sqlx::query(
            r"
            SELECT id, email, display_name, is_active, warmup_start_date, max_per_day,
                   smtp_host, smtp_port, smtp_username, smtp_password
            FROM sender_accounts
            ORDER BY created_at ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_account).collect())
    }

    /// Get the accounts that may participate in dispatch.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_active(&self) -> Result<Vec<SenderAccount>> {
        let rows = sqlx::query(
            r"
            SELECT id, email, display_name, is_active, warmup_start_date, max_per_day,
                   smtp_host, smtp_port, smtp_username, smtp_password
            FROM sender_accounts
            WHERE is_active = 1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_account).collect())
    }

    /// Get account by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: AccountId) -> Result<Option<SenderAccount>> {
        let row = sqlx::query(
            r"
            SELECT id, email, display_name, is_active, warmup_start_date, max_per_day,
                   smtp_host, smtp_port, smtp_username, smtp_password
            FROM sender_accounts
            WHERE id = ?
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_account))
    }

    /// Save an account (insert or update).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn save(&self, account: &mut SenderAccount) -> Result<()> {
        let warmup = account.warmup_start_date.map(|d| d.to_rfc3339());

        if let Some(id) = account.id {
            sqlx::query(
                r"
                UPDATE sender_accounts SET
                    email = ?, display_name = ?, is_active = ?,
                    warmup_start_date = ?, max_per_day = ?,
                    smtp_host = ?, smtp_port = ?, smtp_username = ?, smtp_password = ?,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = ?
                ",
            )
            .bind(&account.email)
            .bind(&account.display_name)
            .bind(account.is_active)
            .bind(warmup)
            .bind(account.max_per_day.map(i64::from))
            .bind(&account.smtp.host)
            .bind(account.smtp.port.map(i64::from))
            .bind(&account.smtp.username)
            .bind(&account.smtp.password)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        } else {
            let result = sqlx::query(
                r"
                INSERT INTO sender_accounts (
                    email, display_name, is_active, warmup_start_date, max_per_day,
                    smtp_host, smtp_port, smtp_username, smtp_password
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(&account.email)
            .bind(&account.display_name)
            .bind(account.is_active)
            .bind(warmup)
            .bind(account.max_per_day.map(i64::from))
            .bind(&account.smtp.host)
            .bind(account.smtp.port.map(i64::from))
            .bind(&account.smtp.username)
            .bind(&account.smtp.password)
            .execute(&self.pool)
            .await?;

            account.id = Some(AccountId::new(result.last_insert_rowid()));
        }

        Ok(())
    }

    /// Flip the activation flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn set_active(&self, id: AccountId, active: bool) -> Result<()> {
        sqlx::query(
            r"
            UPDATE sender_accounts
            SET is_active = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            ",
        )
        .bind(active)
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Anchor the warmup ramp to `at`, once.
    ///
    /// The update is conditional on `warmup_start_date` still being unset,
    /// so concurrent dispatch runs cannot move an existing anchor. Returns
    /// `true` if this call set the date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn start_warmup(&self, id: AccountId, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE sender_accounts
            SET warmup_start_date = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND warmup_start_date IS NULL
            ",
        )
        .bind(at.to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: AccountId) -> Result<()> {
        sqlx::query("DELETE FROM sender_accounts WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Convert a database row to a `SenderAccount`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> SenderAccount {
    let warmup_start_date = row
        .get::<Option<String>, _>("warmup_start_date")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc));

    SenderAccount {
        id: Some(AccountId::new(row.get("id"))),
        email: row.get("email"),
        display_name: row.get("display_name"),
        is_active: row.get::<i64, _>("is_active") != 0,
        warmup_start_date,
        max_per_day: row.get::<Option<i64>, _>("max_per_day").map(|m| m as u32),
        smtp: SmtpOverride {
            host: row.get("smtp_host"),
            port: row.get::<Option<i64>, _>("smtp_port").map(|p| p as u16),
            username: row.get("smtp_username"),
            password: row.get("smtp_password"),
        },
    }
}
