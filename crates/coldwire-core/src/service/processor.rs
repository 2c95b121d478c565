//! Draft-generation job processing.
//!
//! Works through pending queue jobs: ask the generator for copy, file the
//! result in the outbox (or the LinkedIn drawer), and settle the job. A
//! failed job goes back to `pending` until its attempt ceiling.

use std::sync::Arc;

use async_trait::async_trait;
use coldwire_llm::{
    ChatClient, EmailDraft, EmailDraftRequest, GeneratorError, LinkedInDraftRequest, LinkedInKind,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::job::{Job, JobRepository, JobStatus, JobType};
use crate::lead::LeadRepository;
use crate::linkedin::LinkedInRepository;
use crate::outbox::{NewOutboxMessage, OutboxRepository};
use crate::{Error, Result};

/// Attempts a job gets before it is parked as `failed`.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Items generated per LinkedIn job when the payload does not say.
const DEFAULT_LINKEDIN_COUNT: u32 = 20;

/// Ceiling on items per LinkedIn job, whatever the payload says.
const MAX_LINKEDIN_COUNT: u32 = 100;

/// Source of generated outreach copy.
///
/// Implemented by the LLM client; tests substitute a scripted fake.
#[async_trait]
pub trait DraftGenerator: Send + Sync {
    /// Draft one cold email for a lead.
    async fn sales_email(
        &self,
        request: &EmailDraftRequest,
    ) -> std::result::Result<EmailDraft, GeneratorError>;

    /// Draft a batch of LinkedIn posts or DMs.
    async fn linkedin_items(
        &self,
        request: &LinkedInDraftRequest,
    ) -> std::result::Result<Vec<String>, GeneratorError>;
}

#[async_trait]
impl DraftGenerator for ChatClient {
    async fn sales_email(
        &self,
        request: &EmailDraftRequest,
    ) -> std::result::Result<EmailDraft, GeneratorError> {
        ChatClient::sales_email(self, request).await
    }

    async fn linkedin_items(
        &self,
        request: &LinkedInDraftRequest,
    ) -> std::result::Result<Vec<String>, GeneratorError> {
        ChatClient::linkedin_items(self, request).await
    }
}

/// Summary of one job-processing tick.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ProcessReport {
    /// Jobs picked up this tick.
    pub fetched: u32,
    /// Jobs that finished successfully.
    pub processed: u32,
    /// Jobs that failed this tick (they may retry later).
    pub failed: u32,
}

/// Works through pending generation jobs.
pub struct JobProcessor {
    jobs: JobRepository,
    leads: LeadRepository,
    outbox: OutboxRepository,
    linkedin: LinkedInRepository,
    generator: Arc<dyn DraftGenerator>,
    max_attempts: u32,
}

impl JobProcessor {
    /// Create a processor over the given storage and generator.
    #[must_use]
    pub fn new(
        jobs: JobRepository,
        leads: LeadRepository,
        outbox: OutboxRepository,
        linkedin: LinkedInRepository,
        generator: Arc<dyn DraftGenerator>,
        max_attempts: u32,
    ) -> Self {
        Self {
            jobs,
            leads,
            outbox,
            linkedin,
            generator,
            max_attempts,
        }
    }

    /// Pick up and process one batch of pending jobs, oldest first.
    ///
    /// One job's failure never stops the batch; it is recorded on the job
    /// row and the loop moves on.
    ///
    /// # Errors
    ///
    /// Returns an error only when the queue's own bookkeeping writes fail.
    pub async fn run_pending(&self, limit: u32) -> Result<ProcessReport> {
        let batch = self.jobs.pending_batch(limit).await?;
        let mut report = ProcessReport {
            fetched: u32::try_from(batch.len()).unwrap_or(u32::MAX),
            ..ProcessReport::default()
        };

        for job in batch {
            self.jobs.mark_processing(job.id).await?;

            match self.process(&job).await {
                Ok(()) => {
                    self.jobs.complete(job.id).await?;
                    report.processed += 1;
                }
                Err(e) => {
                    warn!(job = job.id.0, error = %e, "Job failed");
                    let status = self
                        .jobs
                        .fail(job.id, &e.to_string(), self.max_attempts)
                        .await?;
                    if status == JobStatus::Pending {
                        debug!(job = job.id.0, "Requeued for another attempt");
                    }
                    report.failed += 1;
                }
            }
        }

        if report.fetched > 0 {
            info!(
                fetched = report.fetched,
                processed = report.processed,
                failed = report.failed,
                "Job tick complete"
            );
        }
        Ok(report)
    }

    async fn process(&self, job: &Job) -> Result<()> {
        match job.job_type {
            JobType::GenerateEmail => self.generate_email(job).await,
            JobType::GenerateLinkedinPosts => self.generate_linkedin(job, LinkedInKind::Post).await,
            JobType::GenerateLinkedinDms => self.generate_linkedin(job, LinkedInKind::Dm).await,
        }
    }

    async fn generate_email(&self, job: &Job) -> Result<()> {
        let lead_id = job
            .lead_id
            .ok_or_else(|| Error::MalformedJob(job.id.0, "email job without a lead".to_string()))?;
        let lead = self
            .leads
            .get(lead_id)
            .await?
            .ok_or(Error::LeadNotFound(lead_id.0))?;

        let request = EmailDraftRequest {
            language: job.payload.language,
            lead_name: lead.name.clone(),
            company: lead.company.clone(),
            extra_context: job.payload.extra_context.clone(),
        };
        let draft = self.generator.sales_email(&request).await?;

        let message = self
            .outbox
            .insert(&NewOutboxMessage {
                lead_id: Some(lead_id),
                to_email: lead.email.clone(),
                subject: draft.subject,
                body: draft.body,
                approved: job.payload.auto_approve,
            })
            .await?;

        debug!(
            job = job.id.0,
            message = message.id.0,
            status = %message.status,
            "Email drafted"
        );
        Ok(())
    }

    async fn generate_linkedin(&self, job: &Job, kind: LinkedInKind) -> Result<()> {
        let count = job
            .payload
            .count
            .unwrap_or(DEFAULT_LINKEDIN_COUNT)
            .clamp(1, MAX_LINKEDIN_COUNT);
        let request = LinkedInDraftRequest {
            kind,
            count,
            tone: job.payload.tone.clone(),
        };

        let items = self.generator.linkedin_items(&request).await?;
        if items.is_empty() {
            return Err(GeneratorError::Empty.into());
        }

        let stored = self.linkedin.insert_batch(kind, &items).await?;
        debug!(job = job.id.0, stored, kind = kind.as_str(), "LinkedIn batch drafted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::job::JobPayload;
    use crate::lead::{Lead, LeadId};
    use crate::outbox::MessageStatus;
    use sqlx::sqlite::SqlitePoolOptions;

    /// Generator that answers from a script instead of a network.
    #[derive(Default)]
    struct FakeGenerator {
        fail_emails: bool,
    }

    #[async_trait]
    impl DraftGenerator for FakeGenerator {
        async fn sales_email(
            &self,
            request: &EmailDraftRequest,
        ) -> std::result::Result<EmailDraft, GeneratorError> {
            if self.fail_emails {
                return Err(GeneratorError::Empty);
            }
            Ok(EmailDraft {
                subject: format!(
                    "Hello {}",
                    request.lead_name.as_deref().unwrap_or("there")
                ),
                body: "Short and personal.".to_string(),
            })
        }

        async fn linkedin_items(
            &self,
            request: &LinkedInDraftRequest,
        ) -> std::result::Result<Vec<String>, GeneratorError> {
            Ok((0..request.count.min(3))
                .map(|i| format!("Item {i}"))
                .collect())
        }
    }

    async fn processor_with(generator: FakeGenerator) -> (JobProcessor, JobRepository, LeadRepository, OutboxRepository, LinkedInRepository) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let jobs = JobRepository::with_pool(pool.clone()).await.unwrap();
        let leads = LeadRepository::with_pool(pool.clone()).await.unwrap();
        let outbox = OutboxRepository::with_pool(pool.clone()).await.unwrap();
        let linkedin = LinkedInRepository::with_pool(pool).await.unwrap();

        let processor = JobProcessor::new(
            jobs.clone(),
            leads.clone(),
            outbox.clone(),
            linkedin.clone(),
            Arc::new(generator),
            DEFAULT_MAX_ATTEMPTS,
        );
        (processor, jobs, leads, outbox, linkedin)
    }

    async fn seed_lead(leads: &LeadRepository) -> LeadId {
        let mut lead = Lead::new("jane@example.com");
        lead.name = Some("Jane".to_string());
        leads.insert(&mut lead).await.unwrap();
        lead.id.unwrap()
    }

    #[tokio::test]
    async fn test_email_job_files_a_draft() {
        let (processor, jobs, leads, outbox, _) = processor_with(FakeGenerator::default()).await;
        let lead_id = seed_lead(&leads).await;
        jobs.enqueue(JobType::GenerateEmail, Some(lead_id), &JobPayload::default())
            .await
            .unwrap();

        let report = processor.run_pending(10).await.unwrap();
        assert_eq!(report.fetched, 1);
        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 0);

        let drafts = outbox.list(Some(MessageStatus::Draft), 10).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].to_email, "jane@example.com");
        assert_eq!(drafts[0].subject, "Hello Jane");
        assert_eq!(drafts[0].lead_id, Some(lead_id));
    }

    #[tokio::test]
    async fn test_auto_approve_lands_in_the_approved_lane() {
        let (processor, jobs, leads, outbox, _) = processor_with(FakeGenerator::default()).await;
        let lead_id = seed_lead(&leads).await;
        let payload = JobPayload {
            auto_approve: true,
            ..JobPayload::default()
        };
        jobs.enqueue(JobType::GenerateEmail, Some(lead_id), &payload)
            .await
            .unwrap();

        processor.run_pending(10).await.unwrap();

        assert_eq!(outbox.count_eligible().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_job_retries_until_the_ceiling() {
        let generator = FakeGenerator { fail_emails: true };
        let (processor, jobs, leads, _, _) = processor_with(generator).await;
        let lead_id = seed_lead(&leads).await;
        let job = jobs
            .enqueue(JobType::GenerateEmail, Some(lead_id), &JobPayload::default())
            .await
            .unwrap();

        // Two ticks requeue, the third parks it.
        for _ in 0..3 {
            let report = processor.run_pending(10).await.unwrap();
            assert_eq!(report.failed, 1);
        }

        let stored = jobs.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.attempts, 3);

        // Parked for good: nothing left to fetch.
        let report = processor.run_pending(10).await.unwrap();
        assert_eq!(report.fetched, 0);
    }

    #[tokio::test]
    async fn test_email_job_without_lead_fails() {
        let (processor, jobs, _, outbox, _) = processor_with(FakeGenerator::default()).await;
        jobs.enqueue(JobType::GenerateEmail, None, &JobPayload::default())
            .await
            .unwrap();

        let report = processor.run_pending(10).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(outbox.list(None, 10).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_linkedin_job_stores_drafts() {
        let (processor, jobs, _, _, linkedin) = processor_with(FakeGenerator::default()).await;
        let payload = JobPayload {
            count: Some(2),
            ..JobPayload::default()
        };
        jobs.enqueue(JobType::GenerateLinkedinDms, None, &payload)
            .await
            .unwrap();

        let report = processor.run_pending(10).await.unwrap();
        assert_eq!(report.processed, 1);

        let items = linkedin.list(None, 10).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, LinkedInKind::Dm);
    }
}
