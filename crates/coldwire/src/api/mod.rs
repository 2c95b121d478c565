//! Admin API surface.
//!
//! Thin JSON wrappers over the core. Batch/dispatch endpoints answer 200
//! with a summary even when nothing was sent for an operational reason;
//! only precondition violations and genuine failures become error
//! statuses.

mod accounts;
mod dispatch;
mod jobs;
mod leads;
mod outbox;
mod sending;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::state::AppState;

/// Build the admin router over the shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/sending", get(sending::current).post(sending::update))
        .route("/api/dispatch/batch", post(dispatch::batch))
        .route("/api/dispatch/send-now", post(dispatch::send_now))
        .route("/api/outbox", get(outbox::list))
        .route("/api/outbox/archive-approved", post(outbox::archive_approved))
        .route("/api/outbox/{id}", patch(outbox::edit))
        .route("/api/outbox/{id}/status", post(outbox::set_status))
        .route("/api/accounts", get(accounts::list).post(accounts::save))
        .route("/api/accounts/{id}/active", post(accounts::set_active))
        .route("/api/leads", get(leads::list))
        .route("/api/leads/bulk", post(leads::bulk))
        .route("/api/jobs", get(jobs::list).post(jobs::enqueue))
        .route("/api/jobs/run", post(jobs::run))
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Shared-bearer-token check for every admin route.
async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == &*state.admin_token);

    if authorized {
        next.run(request).await
    } else {
        ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
    }
}

/// JSON error envelope with the right status code.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<coldwire_core::Error> for ApiError {
    fn from(err: coldwire_core::Error) -> Self {
        use coldwire_core::Error as E;

        let status = match &err {
            E::AccountNotFound(_) | E::MessageNotFound(_) | E::LeadNotFound(_)
            | E::ItemNotFound(_) => StatusCode::NOT_FOUND,
            E::InvalidTransition { .. }
            | E::InvalidReviewTransition { .. }
            | E::NotEditable { .. }
            | E::MalformedJob(..) => StatusCode::UNPROCESSABLE_ENTITY,
            E::NotApproved { .. } | E::Conflict(_) => StatusCode::CONFLICT,
            _ => {
                error!(error = %err, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        Self::new(status, err.to_string())
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<Json<T>, ApiError>;
