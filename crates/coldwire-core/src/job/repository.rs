//! Job queue storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{Job, JobId, JobPayload, JobStatus, JobType};
use crate::lead::LeadId;
use crate::{Error, Result};

/// Repository for queued generation jobs.
#[derive(Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
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
            CREATE TABLE IF NOT EXISTS marketing_jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_type TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                lead_id INTEGER,
                payload TEXT NOT NULL DEFAULT '{}',
                attempts INTEGER NOT NULL DEFAULT 0,
                error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_jobs_status ON marketing_jobs(status, created_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Add a new pending job.
    ///
    /// # Errors
    ///
    /// Returns an error if payload serialization or the database query fails.
    pub async fn enqueue(
        &self,
        job_type: JobType,
        lead_id: Option<LeadId>,
        payload: &JobPayload,
    ) -> Result<Job> {
        let now = Utc::now().to_rfc3339();
        let payload_json = serde_json::to_string(payload)?;

        let result = sqlx::query(
            r"
            INSERT INTO marketing_jobs (job_type, status, lead_id, payload, created_at, updated_at)
            VALUES (?, 'pending', ?, ?, ?, ?)
            ",
        )
        .bind(job_type.as_str())
        .bind(lead_id.map(|l| l.0))
        .bind(payload_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = JobId::new(result.last_insert_rowid());
        self.get(id)
            .await?
            .ok_or(Error::MalformedJob(id.0, "vanished after insert".to_string()))
    }

    /// Get job by ID.
    ///
    /// Rows whose type is no longer recognized are reported as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: JobId) -> Result<Option<Job>> {
        let row = sqlx::query(
            r"
            SELECT id, job_type, status, lead_id, payload, attempts, error, created_at
            FROM marketing_jobs
            WHERE id = ?
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(row_to_job))
    }

    /// List recent jobs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, limit: u32) -> Result<Vec<Job>> {
        let rows = sqlx::query(
            r"
            SELECT id, job_type, status, lead_id, payload, attempts, error, created_at
            FROM marketing_jobs
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(row_to_job).collect())
    }

    /// Fetch the oldest pending jobs, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn pending_batch(&self, limit: u32) -> Result<Vec<Job>> {
        let rows = sqlx::query(
            r"
            SELECT id, job_type, status, lead_id, payload, attempts, error, created_at
            FROM marketing_jobs
            WHERE status = 'pending'
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(row_to_job).collect())
    }

    /// Mark a job as claimed by a processing tick.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_processing(&self, id: JobId) -> Result<()> {
        sqlx::query(
            r"
            UPDATE marketing_jobs
            SET status = 'processing', updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mark a job as finished successfully.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn complete(&self, id: JobId) -> Result<()> {
        sqlx::query(
            r"
            UPDATE marketing_jobs
            SET status = 'done', error = NULL, attempts = attempts + 1, updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a failed attempt.
    ///
    /// The job goes back to `pending` for another try until it has used
    /// `max_attempts`, after which it lands in `failed`. Returns the
    /// status the job ended up in.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn fail(&self, id: JobId, error: &str, max_attempts: u32) -> Result<JobStatus> {
        sqlx::query(
            r"
            UPDATE marketing_jobs
            SET attempts = attempts + 1,
                error = ?,
                status = CASE WHEN attempts + 1 >= ? THEN 'failed' ELSE 'pending' END,
                updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(error)
        .bind(i64::from(max_attempts))
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT status FROM marketing_jobs WHERE id = ?")
            .bind(id.0)
            .fetch_one(&self.pool)
            .await?;

        Ok(JobStatus::parse(row.get("status")))
    }
}

/// Convert a database row to a `Job`. Unknown job types map to `None`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> Option<Job> {
    let job_type = JobType::parse(row.get("job_type"))?;
    let payload: JobPayload =
        serde_json::from_str(row.get("payload")).unwrap_or_default();
    let created_at = DateTime::parse_from_rfc3339(row.get("created_at"))
        .map_or(DateTime::<Utc>::MIN_UTC, |d| d.with_timezone(&Utc));

    Some(Job {
        id: JobId::new(row.get("id")),
        job_type,
        status: JobStatus::parse(row.get("status")),
        lead_id: row.get::<Option<i64>, _>("lead_id").map(LeadId::new),
        payload,
        attempts: row.get::<i64, _>("attempts") as u32,
        error: row.get("error"),
        created_at,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_and_pick_up_fifo() {
        let repo = JobRepository::in_memory().await.unwrap();

        let first = repo
            .enqueue(JobType::GenerateEmail, Some(LeadId::new(1)), &JobPayload::default())
            .await
            .unwrap();
        let second = repo
            .enqueue(JobType::GenerateLinkedinPosts, None, &JobPayload::default())
            .await
            .unwrap();

        let batch = repo.pending_batch(10).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].id, first.id);
        assert_eq!(batch[1].id, second.id);
        assert_eq!(batch[0].status, JobStatus::Pending);
        assert_eq!(batch[0].attempts, 0);
    }

    #[tokio::test]
    async fn test_payload_roundtrip() {
        let repo = JobRepository::in_memory().await.unwrap();

        let payload = JobPayload {
            auto_approve: true,
            extra_context: Some("met at the conference".to_string()),
            count: Some(5),
            ..JobPayload::default()
        };
        let job = repo
            .enqueue(JobType::GenerateEmail, Some(LeadId::new(7)), &payload)
            .await
            .unwrap();

        let stored = repo.get(job.id).await.unwrap().unwrap();
        assert!(stored.payload.auto_approve);
        assert_eq!(
            stored.payload.extra_context.as_deref(),
            Some("met at the conference")
        );
        assert_eq!(stored.lead_id, Some(LeadId::new(7)));
    }

    #[tokio::test]
    async fn test_complete_leaves_the_queue() {
        let repo = JobRepository::in_memory().await.unwrap();
        let job = repo
            .enqueue(JobType::GenerateEmail, Some(LeadId::new(1)), &JobPayload::default())
            .await
            .unwrap();

        repo.mark_processing(job.id).await.unwrap();
        assert!(repo.pending_batch(10).await.unwrap().is_empty());

        repo.complete(job.id).await.unwrap();
        let stored = repo.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Done);
        assert_eq!(stored.attempts, 1);
    }

    #[tokio::test]
    async fn test_fail_requeues_until_attempt_ceiling() {
        let repo = JobRepository::in_memory().await.unwrap();
        let job = repo
            .enqueue(JobType::GenerateEmail, Some(LeadId::new(1)), &JobPayload::default())
            .await
            .unwrap();

        let status = repo.fail(job.id, "generator timeout", 3).await.unwrap();
        assert_eq!(status, JobStatus::Pending);
        let status = repo.fail(job.id, "generator timeout", 3).await.unwrap();
        assert_eq!(status, JobStatus::Pending);
        let status = repo.fail(job.id, "generator timeout", 3).await.unwrap();
        assert_eq!(status, JobStatus::Failed);

        let stored = repo.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.attempts, 3);
        assert_eq!(stored.error.as_deref(), Some("generator timeout"));
        assert!(repo.pending_batch(10).await.unwrap().is_empty());
    }
}
