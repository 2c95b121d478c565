//! Global sending switch endpoints.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use super::ApiResult;
use crate::state::AppState;

/// Current switch position.
#[derive(Serialize)]
pub struct SendingState {
    /// Whether dispatch is allowed.
    pub enabled: bool,
}

/// `GET /api/sending`
pub async fn current(State(state): State<AppState>) -> Json<SendingState> {
    Json(SendingState {
        enabled: state.controls.sending_enabled().await,
    })
}

/// Body for `POST /api/sending`.
#[derive(Deserialize, Default)]
pub struct SendingUpdate {
    /// Explicit value; omitted means "toggle whatever is there".
    pub enabled: Option<bool>,
}

/// `POST /api/sending` — set an explicit value or toggle.
pub async fn update(
    State(state): State<AppState>,
    body: Option<Json<SendingUpdate>>,
) -> ApiResult<SendingState> {
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let enabled = match request.enabled {
        Some(value) => state.controls.set_sending_enabled(value).await?,
        None => state.controls.toggle_sending().await?,
    };

    Ok(Json(SendingState { enabled }))
}
