//! Outbox storage repository.
//!
//! The queries here carry the dispatch engine's concurrency discipline:
//! eligibility is always `status = 'approved' AND sender_id IS NULL`, and
//! [`OutboxRepository::claim`] assigns a sender with a conditional update
//! so two overlapping runs can never both take the same row.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{MessageId, MessageStatus, NewOutboxMessage, OutboxMessage};
use crate::account::AccountId;
use crate::lead::LeadId;
use crate::{Error, Result};

/// Repository for outbox message storage and retrieval.
#[derive(Clone)]
pub struct OutboxRepository {
    pool: SqlitePool,
}

impl OutboxRepository {
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
            CREATE TABLE IF NOT EXISTS email_outbox (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                lead_id INTEGER,
                to_email TEXT NOT NULL,
                subject TEXT NOT NULL,
                body TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'draft',
                sender_id INTEGER,
                sent_at TEXT,
                error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Covers the eligibility scan and the per-day usage count.
        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_outbox_status_sender
            ON email_outbox(status, sender_id, created_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store a new message as `draft` (or `approved` when auto-approved).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert(&self, new: &NewOutboxMessage) -> Result<OutboxMessage> {
        let status = if new.approved {
            MessageStatus::Approved
        } else {
            MessageStatus::Draft
        };
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r"
            INSERT INTO email_outbox (lead_id, to_email, subject, body, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(new.lead_id.map(|l| l.0))
        .bind(&new.to_email)
        .bind(&new.subject)
        .bind(&new.body)
        .bind(status.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = MessageId::new(result.last_insert_rowid());
        self.get(id).await?.ok_or(Error::MessageNotFound(id.0))
    }

    /// Get message by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: MessageId) -> Result<Option<OutboxMessage>> {
        let row = sqlx::query(
            r"
            SELECT id, lead_id, to_email, subject, body, status, sender_id, sent_at, error, created_at
            FROM email_outbox
            WHERE id = ?
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_message))
    }

    /// List messages, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, status: Option<MessageStatus>, limit: u32) -> Result<Vec<OutboxMessage>> {
        let rows = if let Some(status) = status {
            sqlx::query(
                r"
                SELECT id, lead_id, to_email, subject, body, status, sender_id, sent_at, error, created_at
                FROM email_outbox
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
                SELECT id, lead_id, to_email, subject, body, status, sender_id, sent_at, error, created_at
                FROM email_outbox
                ORDER BY created_at DESC, id DESC
                LIMIT ?
                ",
            )
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows.iter().map(row_to_message).collect())
    }

    /// Move a message to a new review-lane status.
    ///
    /// Validates the transition against [`MessageStatus::can_transition`];
    /// dispatch outcomes (`sent`/`failed`) are normally written by the
    /// engine's mark operations instead. The update is conditional on the
    /// status the caller saw, so a concurrent change surfaces as
    /// [`Error::Conflict`] rather than a lost update.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageNotFound`], [`Error::InvalidTransition`],
    /// [`Error::Conflict`], or a database error.
    pub async fn update_status(&self, id: MessageId, to: MessageStatus) -> Result<OutboxMessage> {
        let current = self.get(id).await?.ok_or(Error::MessageNotFound(id.0))?;
        if !current.status.can_transition(to) {
            return Err(Error::InvalidTransition {
                from: current.status,
                to,
            });
        }

        let result = sqlx::query(
            r"
            UPDATE email_outbox
            SET status = ?, updated_at = ?
            WHERE id = ? AND status = ?
            ",
        )
        .bind(to.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .bind(current.status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(id));
        }

        self.get(id).await?.ok_or(Error::MessageNotFound(id.0))
    }

    /// Edit subject and body. Only allowed while the message is still in
    /// review (`draft` or `approved`, unclaimed).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageNotFound`], [`Error::NotEditable`], or a
    /// database error.
    pub async fn update_content(&self, id: MessageId, subject: &str, body: &str) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE email_outbox
            SET subject = ?, body = ?, updated_at = ?
            WHERE id = ? AND status IN ('draft', 'approved') AND sender_id IS NULL
            ",
        )
        .bind(subject)
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get(id).await?.ok_or(Error::MessageNotFound(id.0))?;
            return Err(Error::NotEditable {
                id,
                status: current.status,
            });
        }

        Ok(())
    }

    /// Fetch the oldest eligible messages, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn eligible_batch(&self, limit: u32) -> Result<Vec<OutboxMessage>> {
        let rows = sqlx::query(
            r"
            SELECT id, lead_id, to_email, subject, body, status, sender_id, sent_at, error, created_at
            FROM email_outbox
            WHERE status = 'approved' AND sender_id IS NULL
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_message).collect())
    }

    /// Number of messages currently eligible for dispatch.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_eligible(&self) -> Result<u32> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) as count
            FROM email_outbox
            WHERE status = 'approved' AND sender_id IS NULL
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::try_from(row.get::<i64, _>("count")).unwrap_or(u32::MAX))
    }

    /// Atomically assign `account` as the sender of an eligible message.
    ///
    /// Returns `false` when the row was already claimed or left the
    /// approved lane, meaning a concurrent run (or reviewer) got there
    /// first and this message must be skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn claim(&self, id: MessageId, account: AccountId) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE email_outbox
            SET sender_id = ?, updated_at = ?
            WHERE id = ? AND status = 'approved' AND sender_id IS NULL
            ",
        )
        .bind(account.0)
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Record a successful send for a claimed message.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_sent(&self, id: MessageId, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r"
            UPDATE email_outbox
            SET status = 'sent', sent_at = ?, error = NULL, updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a transport failure for a claimed message.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_failed(&self, id: MessageId, error: &str) -> Result<()> {
        sqlx::query(
            r"
            UPDATE email_outbox
            SET status = 'failed', error = ?, updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(error)
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count messages an account has sent since `since` (the usage counter).
    ///
    /// Attribution is by `sender_id` and counts only `sent` rows; a claimed
    /// row belongs to exactly one account for every subsequent count.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count_sent_since(&self, account: AccountId, since: DateTime<Utc>) -> Result<u32> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) as count
            FROM email_outbox
            WHERE sender_id = ? AND status = 'sent' AND sent_at >= ?
            ",
        )
        .bind(account.0)
        .bind(since.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        Ok(u32::try_from(row.get::<i64, _>("count")).unwrap_or(u32::MAX))
    }

    /// Park every approved, unclaimed message. Returns how many moved.
    ///
    /// Claimed rows are in flight and keep their lane.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn archive_approved(&self) -> Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE email_outbox
            SET status = 'archived', updated_at = ?
            WHERE status = 'approved' AND sender_id IS NULL
            ",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Convert a database row to an `OutboxMessage`.
fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> OutboxMessage {
    let sent_at = row
        .get::<Option<String>, _>("sent_at")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc));
    let created_at = DateTime::parse_from_rfc3339(row.get("created_at"))
        .map_or(DateTime::<Utc>::MIN_UTC, |d| d.with_timezone(&Utc));

    OutboxMessage {
        id: MessageId::new(row.get("id")),
        lead_id: row.get::<Option<i64>, _>("lead_id").map(LeadId::new),
        to_email: row.get("to_email"),
        subject: row.get("subject"),
        body: row.get("body"),
        status: MessageStatus::parse(row.get("status")),
        sender_id: row.get::<Option<i64>, _>("sender_id").map(AccountId::new),
        sent_at,
        error: row.get("error"),
        created_at,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft(to: &str) -> NewOutboxMessage {
        NewOutboxMessage {
            lead_id: None,
            to_email: to.to_string(),
            subject: "Hello".to_string(),
            body: "Quick question about your stack.".to_string(),
            approved: false,
        }
    }

    fn approved(to: &str) -> NewOutboxMessage {
        NewOutboxMessage {
            approved: true,
            ..draft(to)
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = OutboxRepository::in_memory().await.unwrap();

        let message = repo.insert(&draft("jane@example.com")).await.unwrap();
        assert_eq!(message.status, MessageStatus::Draft);
        assert!(message.sender_id.is_none());
        assert!(!message.is_eligible());

        let message = repo.insert(&approved("joe@example.com")).await.unwrap();
        assert!(message.is_eligible());
    }

    #[tokio::test]
    async fn test_update_status_validates_transitions() {
        let repo = OutboxRepository::in_memory().await.unwrap();
        let message = repo.insert(&draft("jane@example.com")).await.unwrap();

        let message = repo
            .update_status(message.id, MessageStatus::Approved)
            .await
            .unwrap();
        assert_eq!(message.status, MessageStatus::Approved);

        // Approved can go back to draft, to declined, or get archived.
        let message = repo
            .update_status(message.id, MessageStatus::Declined)
            .await
            .unwrap();
        assert_eq!(message.status, MessageStatus::Declined);

        // Declined straight to sent is illegal.
        let err = repo
            .update_status(message.id, MessageStatus::Sent)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_update_status_missing_message() {
        let repo = OutboxRepository::in_memory().await.unwrap();
        let err = repo
            .update_status(MessageId::new(42), MessageStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MessageNotFound(42)));
    }

    #[tokio::test]
    async fn test_claim_takes_a_row_exactly_once() {
        let repo = OutboxRepository::in_memory().await.unwrap();
        let message = repo.insert(&approved("jane@example.com")).await.unwrap();

        assert!(repo.claim(message.id, AccountId::new(1)).await.unwrap());
        // Second claim loses the race.
        assert!(!repo.claim(message.id, AccountId::new(2)).await.unwrap());

        let stored = repo.get(message.id).await.unwrap().unwrap();
        assert_eq!(stored.sender_id, Some(AccountId::new(1)));
        assert!(!stored.is_eligible());
    }

    #[tokio::test]
    async fn test_claim_requires_approved() {
        let repo = OutboxRepository::in_memory().await.unwrap();
        let message = repo.insert(&draft("jane@example.com")).await.unwrap();

        assert!(!repo.claim(message.id, AccountId::new(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_eligible_batch_is_oldest_first() {
        let repo = OutboxRepository::in_memory().await.unwrap();

        let first = repo.insert(&approved("a@example.com")).await.unwrap();
        let second = repo.insert(&approved("b@example.com")).await.unwrap();
        let _draft = repo.insert(&draft("c@example.com")).await.unwrap();

        let batch = repo.eligible_batch(10).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].id, first.id);
        assert_eq!(batch[1].id, second.id);

        assert_eq!(repo.count_eligible().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_mark_sent_and_usage_count() {
        let repo = OutboxRepository::in_memory().await.unwrap();
        let account = AccountId::new(1);
        let now = Utc::now();

        let message = repo.insert(&approved("a@example.com")).await.unwrap();
        assert!(repo.claim(message.id, account).await.unwrap());
        repo.mark_sent(message.id, now).await.unwrap();

        let stored = repo.get(message.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Sent);
        assert!(stored.sent_at.is_some());

        let midnight = now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc();
        assert_eq!(repo.count_sent_since(account, midnight).await.unwrap(), 1);
        // A different account sees nothing.
        assert_eq!(
            repo.count_sent_since(AccountId::new(2), midnight)
                .await
                .unwrap(),
            0
        );
        // Yesterday's cutoff still counts it; tomorrow's does not.
        assert_eq!(
            repo.count_sent_since(account, midnight - Duration::days(1))
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            repo.count_sent_since(account, midnight + Duration::days(1))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_mark_failed_keeps_attribution() {
        let repo = OutboxRepository::in_memory().await.unwrap();
        let account = AccountId::new(1);

        let message = repo.insert(&approved("a@example.com")).await.unwrap();
        assert!(repo.claim(message.id, account).await.unwrap());
        repo.mark_failed(message.id, "550 mailbox unavailable")
            .await
            .unwrap();

        let stored = repo.get(message.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Failed);
        assert_eq!(stored.sender_id, Some(account));
        assert_eq!(stored.error.as_deref(), Some("550 mailbox unavailable"));
        // Failed rows do not count against the sent quota.
        let midnight = Utc::now().date_naive().and_time(chrono::NaiveTime::MIN).and_utc();
        assert_eq!(repo.count_sent_since(account, midnight).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_content_only_in_review() {
        let repo = OutboxRepository::in_memory().await.unwrap();

        let message = repo.insert(&approved("a@example.com")).await.unwrap();
        repo.update_content(message.id, "New subject", "New body")
            .await
            .unwrap();
        let stored = repo.get(message.id).await.unwrap().unwrap();
        assert_eq!(stored.subject, "New subject");

        assert!(repo.claim(message.id, AccountId::new(1)).await.unwrap());
        repo.mark_sent(message.id, Utc::now()).await.unwrap();

        let err = repo
            .update_content(message.id, "Too late", "Too late")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotEditable { .. }));
    }

    #[tokio::test]
    async fn test_archive_approved_skips_claimed_rows() {
        let repo = OutboxRepository::in_memory().await.unwrap();

        let parked = repo.insert(&approved("a@example.com")).await.unwrap();
        let in_flight = repo.insert(&approved("b@example.com")).await.unwrap();
        assert!(repo.claim(in_flight.id, AccountId::new(1)).await.unwrap());

        let moved = repo.archive_approved().await.unwrap();
        assert_eq!(moved, 1);

        let parked = repo.get(parked.id).await.unwrap().unwrap();
        assert_eq!(parked.status, MessageStatus::Archived);
        let in_flight = repo.get(in_flight.id).await.unwrap().unwrap();
        assert_eq!(in_flight.status, MessageStatus::Approved);
    }
}
