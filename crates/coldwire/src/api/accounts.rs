//! Sender account management endpoints.

use axum::Json;
use axum::extract::{Path, State};
use coldwire_core::{AccountId, SenderAccount};
use serde::Deserialize;

use super::ApiResult;
use crate::state::AppState;

/// `GET /api/accounts` — every configured sending identity.
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<SenderAccount>> {
    Ok(Json(state.accounts.list().await?))
}

/// `POST /api/accounts` — create or update an account (id decides).
pub async fn save(
    State(state): State<AppState>,
    Json(mut account): Json<SenderAccount>,
) -> ApiResult<SenderAccount> {
    state.accounts.save(&mut account).await?;
    Ok(Json(account))
}

/// Body for `POST /api/accounts/{id}/active`.
#[derive(Deserialize)]
pub struct ActiveRequest {
    /// Whether the account participates in dispatch.
    pub active: bool,
}

/// `POST /api/accounts/{id}/active` — flip the activation flag.
pub async fn set_active(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ActiveRequest>,
) -> ApiResult<SenderAccount> {
    let id = AccountId::new(id);
    state
        .accounts
        .get(id)
        .await?
        .ok_or(coldwire_core::Error::AccountNotFound(id.0))?;
    state.accounts.set_active(id, request.active).await?;
    let account = state
        .accounts
        .get(id)
        .await?
        .ok_or(coldwire_core::Error::AccountNotFound(id.0))?;
    Ok(Json(account))
}
