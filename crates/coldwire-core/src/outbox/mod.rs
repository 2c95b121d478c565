//! Outbox: drafted outreach messages and their review/dispatch lifecycle.
//!
//! A message is *eligible* for dispatch iff it is `approved` and has no
//! sender assigned yet. Assigning a sender is an atomic claim; once a
//! sender is set the row is never picked up again.

mod model;
mod repository;

pub use model::{MessageId, MessageStatus, NewOutboxMessage, OutboxMessage};
pub use repository::OutboxRepository;
