//! Generated LinkedIn content (posts and DMs) held for review.
//!
//! LinkedIn items share the outbox's review lanes but are never
//! dispatched; posting is a manual copy-paste step for the operator.

mod model;
mod repository;

pub use coldwire_llm::LinkedInKind;
pub use model::{LinkedInItem, ReviewStatus};
pub use repository::LinkedInRepository;
