//! Dispatch trigger endpoints.

use axum::Json;
use axum::extract::State;
use coldwire_core::{DispatchReport, MessageId};
use serde::Deserialize;

use super::ApiResult;
use crate::state::AppState;

/// Body for `POST /api/dispatch/batch`.
#[derive(Deserialize, Default)]
pub struct BatchRequest {
    /// Batch ceiling for this run; falls back to the configured default.
    pub limit: Option<u32>,
}

/// `POST /api/dispatch/batch` — run one dispatch batch now.
pub async fn batch(
    State(state): State<AppState>,
    body: Option<Json<BatchRequest>>,
) -> ApiResult<DispatchReport> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let limit = request.limit.filter(|&l| l > 0);

    let report = state.dispatcher.dispatch_batch(limit).await?;
    Ok(Json(report))
}

/// Body for `POST /api/dispatch/send-now`.
#[derive(Deserialize)]
pub struct SendNowRequest {
    /// Message to send.
    pub id: i64,
}

/// `POST /api/dispatch/send-now` — send one approved message immediately.
pub async fn send_now(
    State(state): State<AppState>,
    Json(request): Json<SendNowRequest>,
) -> ApiResult<DispatchReport> {
    let report = state.dispatcher.send_single(MessageId::new(request.id)).await?;
    Ok(Json(report))
}
