//! Draft-generation job queue.
//!
//! A plain FIFO-with-status-column queue: jobs are enqueued `pending`,
//! picked up oldest first, and end `done` or `failed`. Failed processing
//! re-queues the job until its attempt ceiling is reached.

mod model;
mod repository;

pub use model::{Job, JobId, JobPayload, JobStatus, JobType};
pub use repository::JobRepository;
