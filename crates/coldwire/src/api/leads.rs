//! Lead book endpoints.

use axum::Json;
use axum::extract::{Query, State};
use coldwire_core::{ImportSummary, Lead};
use serde::Deserialize;

use super::{ApiError, ApiResult};
use crate::state::AppState;

/// One lead in a bulk import.
#[derive(Deserialize)]
pub struct LeadEntry {
    /// Contact address.
    pub email: String,
    /// Contact name, if known.
    pub name: Option<String>,
    /// Company, if known.
    pub company: Option<String>,
}

/// Body for `POST /api/leads/bulk`.
#[derive(Deserialize)]
pub struct BulkRequest {
    /// Leads to import.
    pub leads: Vec<LeadEntry>,
}

/// `POST /api/leads/bulk` — import leads, skipping known addresses.
pub async fn bulk(
    State(state): State<AppState>,
    Json(request): Json<BulkRequest>,
) -> ApiResult<ImportSummary> {
    if request.leads.is_empty() {
        return Err(ApiError::bad_request("leads must not be empty"));
    }
    if request.leads.iter().any(|entry| entry.email.trim().is_empty()) {
        return Err(ApiError::bad_request("every lead needs an email"));
    }

    let leads: Vec<Lead> = request
        .leads
        .into_iter()
        .map(|entry| {
            let mut lead = Lead::new(entry.email.trim());
            lead.name = entry.name;
            lead.company = entry.company;
            lead
        })
        .collect();

    let summary = state.leads.import(&leads).await?;
    Ok(Json(summary))
}

/// Query for `GET /api/leads`.
#[derive(Deserialize, Default)]
pub struct ListQuery {
    /// Page size.
    pub limit: Option<u32>,
}

/// `GET /api/leads` — list leads, oldest first.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Lead>> {
    Ok(Json(state.leads.list(query.limit.unwrap_or(100)).await?))
}
