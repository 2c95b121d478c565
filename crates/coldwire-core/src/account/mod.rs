//! Sender account registry.
//!
//! A sender account is a mailbox identity coldwire may send from. Accounts
//! carry an activation flag, per-day quota settings and the warmup state
//! that anchors the progressive daily-limit ramp.

mod model;
mod repository;

pub use model::{AccountId, SenderAccount, SmtpOverride};
pub use repository::AccountRepository;
