//! Shared handles for API handlers and the scheduler.

use std::sync::Arc;

use coldwire_core::{
    AccountRepository, ControlsRepository, Dispatcher, JobProcessor, JobRepository,
    LeadRepository, LinkedInRepository, OutboxRepository,
};

/// Everything a request handler may need. Cheap to clone; repositories
/// share one connection pool underneath.
#[derive(Clone)]
pub struct AppState {
    /// Sender account registry.
    pub accounts: AccountRepository,
    /// Lead book.
    pub leads: LeadRepository,
    /// Outbox storage.
    pub outbox: OutboxRepository,
    /// Generation job queue.
    pub jobs: JobRepository,
    /// LinkedIn content drawer.
    pub linkedin: LinkedInRepository,
    /// Global sending switch.
    pub controls: ControlsRepository,
    /// The dispatch engine.
    pub dispatcher: Arc<Dispatcher>,
    /// The job processor.
    pub processor: Arc<JobProcessor>,
    /// Shared bearer token for the admin API.
    pub admin_token: Arc<str>,
    /// Jobs picked up per processing tick.
    pub job_batch: u32,
}
