//! Error types for the core library.

use thiserror::Error;

use crate::linkedin::ReviewStatus;
use crate::outbox::{MessageId, MessageStatus};

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Draft generation failed.
    #[error("Draft generation error: {0}")]
    Generator(#[from] coldwire_llm::GeneratorError),

    /// Sender account not found.
    #[error("Sender account not found: {0}")]
    AccountNotFound(i64),

    /// Outbox message not found.
    #[error("Outbox message not found: {0}")]
    MessageNotFound(i64),

    /// Lead not found.
    #[error("Lead not found: {0}")]
    LeadNotFound(i64),

    /// LinkedIn item not found.
    #[error("LinkedIn item not found: {0}")]
    ItemNotFound(i64),

    /// A status change that the lifecycle does not allow.
    #[error("Illegal status transition: {from} -> {to}")]
    InvalidTransition {
        /// Status the record currently has.
        from: MessageStatus,
        /// Status the caller asked for.
        to: MessageStatus,
    },

    /// A review-status change that the LinkedIn lifecycle does not allow.
    #[error("Illegal review transition: {from} -> {to}")]
    InvalidReviewTransition {
        /// Status the item currently has.
        from: ReviewStatus,
        /// Status the caller asked for.
        to: ReviewStatus,
    },

    /// A send was requested for a message that is not cleared for it.
    #[error("Message {id} is not approved for sending (status: {status})")]
    NotApproved {
        /// The message in question.
        id: MessageId,
        /// Its current status.
        status: MessageStatus,
    },

    /// Content edits are only allowed before dispatch.
    #[error("Message {id} can no longer be edited (status: {status})")]
    NotEditable {
        /// The message in question.
        id: MessageId,
        /// Its current status.
        status: MessageStatus,
    },

    /// The row changed under us between read and write.
    #[error("Message {0} was modified concurrently")]
    Conflict(MessageId),

    /// A queued job is missing a field its type requires.
    #[error("Malformed job {0}: {1}")]
    MalformedJob(i64, String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
