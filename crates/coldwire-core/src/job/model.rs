//! Job queue model types.

use chrono::{DateTime, Utc};
use coldwire_llm::Language;
use serde::{Deserialize, Serialize};

use crate::lead::LeadId;

/// Unique identifier for a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub i64);

impl JobId {
    /// Create a new job ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a queued job asks the generator to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Draft one cold email for a lead.
    GenerateEmail,
    /// Draft a batch of LinkedIn posts.
    GenerateLinkedinPosts,
    /// Draft a batch of LinkedIn DMs.
    GenerateLinkedinDms,
}

impl JobType {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "generate_email" => Some(Self::GenerateEmail),
            "generate_linkedin_posts" => Some(Self::GenerateLinkedinPosts),
            "generate_linkedin_dms" => Some(Self::GenerateLinkedinDms),
            _ => None,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GenerateEmail => "generate_email",
            Self::GenerateLinkedinPosts => "generate_linkedin_posts",
            Self::GenerateLinkedinDms => "generate_linkedin_dms",
        }
    }
}

/// Processing state of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting to be picked up.
    #[default]
    Pending,
    /// Claimed by a processing tick.
    Processing,
    /// Finished successfully.
    Done,
    /// Gave up after exhausting its attempts.
    Failed,
}

impl JobStatus {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "processing" => Self::Processing,
            "done" => Self::Done,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Knobs the enqueuer can pass through to the generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPayload {
    /// Language for generated email copy.
    #[serde(default)]
    pub language: Language,
    /// File the generated email as `approved` instead of `draft`.
    #[serde(default)]
    pub auto_approve: bool,
    /// Extra context woven into the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_context: Option<String>,
    /// Item count for LinkedIn batches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Tone-of-voice hint for LinkedIn batches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

/// A queued generation job.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    /// Unique identifier.
    pub id: JobId,
    /// What to produce.
    pub job_type: JobType,
    /// Processing state.
    pub status: JobStatus,
    /// Lead this job is about (required for email jobs).
    pub lead_id: Option<LeadId>,
    /// Generator knobs.
    pub payload: JobPayload,
    /// Processing attempts so far.
    pub attempts: u32,
    /// Last failure reason, if any.
    pub error: Option<String>,
    /// When the job was enqueued.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_roundtrip() {
        for job_type in [
            JobType::GenerateEmail,
            JobType::GenerateLinkedinPosts,
            JobType::GenerateLinkedinDms,
        ] {
            assert_eq!(JobType::parse(job_type.as_str()), Some(job_type));
        }
        assert_eq!(JobType::parse("bogus"), None);
    }

    #[test]
    fn test_job_status_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Done,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_payload_defaults_survive_missing_fields() {
        let payload: JobPayload = serde_json::from_str("{}").unwrap_or_default();
        assert!(!payload.auto_approve);
        assert!(payload.extra_context.is_none());
        assert!(payload.count.is_none());
    }
}
