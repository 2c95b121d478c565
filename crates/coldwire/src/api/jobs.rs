//! Generation job queue endpoints.

use axum::Json;
use axum::extract::{Query, State};
use coldwire_core::{Job, JobPayload, JobType, LeadId, ProcessReport};
use serde::Deserialize;

use super::{ApiError, ApiResult};
use crate::state::AppState;

/// Body for `POST /api/jobs`.
#[derive(Deserialize)]
pub struct EnqueueRequest {
    /// Job type (`generate_email`, `generate_linkedin_posts`, `generate_linkedin_dms`).
    pub job_type: String,
    /// Lead the job is about (required for email jobs).
    pub lead_id: Option<i64>,
    /// Generator knobs.
    #[serde(default)]
    pub payload: JobPayload,
}

/// `POST /api/jobs` — enqueue a generation job.
pub async fn enqueue(
    State(state): State<AppState>,
    Json(request): Json<EnqueueRequest>,
) -> ApiResult<Job> {
    let Some(job_type) = JobType::parse(&request.job_type) else {
        return Err(ApiError::bad_request(format!(
            "unknown job type: {}",
            request.job_type
        )));
    };
    if job_type == JobType::GenerateEmail && request.lead_id.is_none() {
        return Err(ApiError::bad_request("email jobs need a lead_id"));
    }

    let job = state
        .jobs
        .enqueue(job_type, request.lead_id.map(LeadId::new), &request.payload)
        .await?;
    Ok(Json(job))
}

/// Query for `GET /api/jobs`.
#[derive(Deserialize, Default)]
pub struct ListQuery {
    /// Page size.
    pub limit: Option<u32>,
}

/// `GET /api/jobs` — recent jobs, newest first.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Job>> {
    Ok(Json(state.jobs.list(query.limit.unwrap_or(50)).await?))
}

/// Body for `POST /api/jobs/run`.
#[derive(Deserialize, Default)]
pub struct RunRequest {
    /// Jobs to pick up; falls back to the configured batch size.
    pub limit: Option<u32>,
}

/// `POST /api/jobs/run` — process a batch of pending jobs now.
pub async fn run(
    State(state): State<AppState>,
    body: Option<Json<RunRequest>>,
) -> ApiResult<ProcessReport> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let limit = request.limit.filter(|&l| l > 0).unwrap_or(state.job_batch);

    let report = state.processor.run_pending(limit).await?;
    Ok(Json(report))
}
