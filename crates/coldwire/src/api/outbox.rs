//! Outbox review endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use coldwire_core::{MessageId, MessageStatus, OutboxMessage};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult};
use crate::state::AppState;

/// Statuses a reviewer may set by hand; dispatch outcomes are the
/// engine's to write.
const REVIEW_LANES: [MessageStatus; 4] = [
    MessageStatus::Draft,
    MessageStatus::Approved,
    MessageStatus::Declined,
    MessageStatus::Archived,
];

/// Query for `GET /api/outbox`.
#[derive(Deserialize, Default)]
pub struct ListQuery {
    /// Filter by status.
    pub status: Option<String>,
    /// Page size.
    pub limit: Option<u32>,
}

/// `GET /api/outbox` — list messages, newest first.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<OutboxMessage>> {
    let status = match query.status.as_deref() {
        None => None,
        Some(s) => Some(parse_status(s)?),
    };
    let messages = state.outbox.list(status, query.limit.unwrap_or(100)).await?;
    Ok(Json(messages))
}

/// Body for `PATCH /api/outbox/{id}`.
#[derive(Deserialize)]
pub struct EditRequest {
    /// New subject line.
    pub subject: String,
    /// New body.
    pub body: String,
}

/// `PATCH /api/outbox/{id}` — edit a message still in review.
pub async fn edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<EditRequest>,
) -> ApiResult<OutboxMessage> {
    let id = MessageId::new(id);
    state
        .outbox
        .update_content(id, &request.subject, &request.body)
        .await?;
    let message = state
        .outbox
        .get(id)
        .await?
        .ok_or(coldwire_core::Error::MessageNotFound(id.0))?;
    Ok(Json(message))
}

/// Body for `POST /api/outbox/{id}/status`.
#[derive(Deserialize)]
pub struct StatusRequest {
    /// Target review lane.
    pub status: String,
}

/// `POST /api/outbox/{id}/status` — move a message between review lanes.
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<OutboxMessage> {
    let status = parse_status(&request.status)?;
    if !REVIEW_LANES.contains(&status) {
        return Err(ApiError::bad_request(format!(
            "status must be one of draft, approved, declined, archived (got {status})"
        )));
    }

    let message = state.outbox.update_status(MessageId::new(id), status).await?;
    Ok(Json(message))
}

/// Response for `POST /api/outbox/archive-approved`.
#[derive(Serialize)]
pub struct ArchiveSummary {
    /// How many messages were parked.
    pub archived: u64,
}

/// `POST /api/outbox/archive-approved` — park the whole approved lane.
pub async fn archive_approved(State(state): State<AppState>) -> ApiResult<ArchiveSummary> {
    let archived = state.outbox.archive_approved().await?;
    Ok(Json(ArchiveSummary { archived }))
}

/// Strict status parse: unknown strings are a client error, not `draft`.
fn parse_status(s: &str) -> Result<MessageStatus, ApiError> {
    let status = MessageStatus::parse(s);
    if status.as_str() == s.to_lowercase() {
        Ok(status)
    } else {
        Err(ApiError::bad_request(format!("unknown status: {s}")))
    }
}
