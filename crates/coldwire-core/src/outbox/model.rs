//! Outbox message model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::lead::LeadId;

/// Unique identifier for an outbox message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl MessageId {
    /// Create a new message ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Review/dispatch lifecycle of an outbox message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Waiting for human review.
    #[default]
    Draft,
    /// Cleared for sending; picked up by the next dispatch run.
    Approved,
    /// Rejected by a reviewer.
    Declined,
    /// Handed to the transport successfully.
    Sent,
    /// The transport rejected it; needs re-approval before another attempt.
    Failed,
    /// Parked out of every queue.
    Archived,
}

impl MessageStatus {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "approved" => Self::Approved,
            "declined" => Self::Declined,
            "sent" => Self::Sent,
            "failed" => Self::Failed,
            "archived" => Self::Archived,
            _ => Self::Draft,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Declined => "declined",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Archived => "archived",
        }
    }

    /// Whether a move from `self` to `to` is legal.
    ///
    /// `approved -> sent | failed` are the dispatch outcomes; everything
    /// else is a review-lane move. A `failed` message must be re-approved
    /// by a human before it can be attempted again.
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Draft, Self::Approved)
                | (Self::Approved, Self::Draft)
                | (Self::Approved, Self::Declined)
                | (Self::Declined, Self::Approved)
                | (Self::Approved, Self::Sent)
                | (Self::Approved, Self::Failed)
                | (Self::Failed, Self::Approved)
                | (Self::Draft, Self::Archived)
                | (Self::Approved, Self::Archived)
                | (Self::Sent, Self::Archived)
        )
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// A drafted outreach message in the outbox.
#[derive(Debug, Clone, Serialize)]
pub struct OutboxMessage {
    /// Unique identifier.
    pub id: MessageId,
    /// The lead this message was drafted for, if any.
    pub lead_id: Option<LeadId>,
    /// Recipient address.
    pub to_email: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Lifecycle status.
    pub status: MessageStatus,
    /// Account that sent (or tried to send) this message. Set exactly once.
    pub sender_id: Option<AccountId>,
    /// When the transport accepted it.
    pub sent_at: Option<DateTime<Utc>>,
    /// Last failure reason, if any.
    pub error: Option<String>,
    /// When the draft was stored.
    pub created_at: DateTime<Utc>,
}

impl OutboxMessage {
    /// Whether a dispatch run may pick this message up.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        matches!(self.status, MessageStatus::Approved) && self.sender_id.is_none()
    }
}

/// Fields required to store a new outbox message.
#[derive(Debug, Clone)]
pub struct NewOutboxMessage {
    /// The lead this message was drafted for, if any.
    pub lead_id: Option<LeadId>,
    /// Recipient address.
    pub to_email: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
    /// Store as `approved` instead of `draft` (auto-approve).
    pub approved: bool,
}
