//! # coldwire-core
//!
//! Core business logic for the coldwire outreach service.
//!
//! This crate provides:
//! - Sender account registry with warmup state
//! - Lead book and outbox storage (`SQLite`)
//! - Draft-generation job queue and processor
//! - The sender-quota / warmup / batch-dispatch engine
//! - Global sending switch (fail-open)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod controls;
mod error;
pub mod job;
pub mod lead;
pub mod linkedin;
pub mod outbox;
pub mod service;

pub use account::{AccountId, AccountRepository, SenderAccount, SmtpOverride};
pub use controls::ControlsRepository;
pub use error::{Error, Result};
pub use job::{Job, JobId, JobPayload, JobRepository, JobStatus, JobType};
pub use lead::{ImportSummary, Lead, LeadId, LeadRepository};
pub use linkedin::{LinkedInItem, LinkedInKind, LinkedInRepository, ReviewStatus};
pub use outbox::{MessageId, MessageStatus, NewOutboxMessage, OutboxMessage, OutboxRepository};
pub use service::{
    AccountBreakdown, CapacityPlan, CapacitySlot, DispatchConfig, DispatchReason, DispatchReport,
    Dispatcher, DraftGenerator, JobProcessor, MailTransport, OutgoingEmail, ProcessReport,
    SendWindow, SmtpDefaults, SmtpMailer, TransportError,
};
